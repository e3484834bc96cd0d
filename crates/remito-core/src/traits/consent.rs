//! Interactive consent trait.

use async_trait::async_trait;

use crate::record::CredentialRecord;
use crate::types::AccountId;
use crate::Result;

/// The interactive browser-based authorization flow.
///
/// The auth manager falls back to this when no stored credentials work. The
/// trait seam keeps the manager testable without a browser or a network.
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    /// Run the full consent flow and return the freshly issued record.
    ///
    /// `hint` names the account the user is expected to pick, when known;
    /// implementations may pass it to the provider as a login hint. The
    /// returned record's account id comes from the provider, not the hint.
    async fn obtain_consent(&self, hint: Option<&AccountId>) -> Result<CredentialRecord>;
}
