//! Credential persistence trait.

use async_trait::async_trait;

use crate::record::CredentialRecord;
use crate::types::AccountId;
use crate::Result;

/// Persistent registry of credential records, keyed by account id.
///
/// The storage location is injected at construction, so tests can run
/// against an isolated directory. Implementations must write atomically: a
/// concurrent reader never observes a partially-written registry.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the record for an account, if one is stored.
    ///
    /// A corrupted registry reads as empty; it must not error here.
    async fn load(&self, account: &AccountId) -> Result<Option<CredentialRecord>>;

    /// Insert or replace the record for the record's account.
    async fn save(&self, record: &CredentialRecord) -> Result<()>;

    /// Remove an account's record. Removing an absent account is a no-op.
    async fn remove(&self, account: &AccountId) -> Result<()>;

    /// All account ids with stored records.
    async fn accounts(&self) -> Result<Vec<AccountId>>;

    /// The most recently used account, if any.
    async fn last_used(&self) -> Result<Option<AccountId>>;

    /// Record an account as most recently used.
    async fn set_last_used(&self, account: &AccountId) -> Result<()>;
}
