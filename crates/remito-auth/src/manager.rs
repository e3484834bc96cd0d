//! Auth manager: token lifecycle and account switching.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use remito_core::error::{AuthError, Error};
use remito_core::{
    AccessToken, AccountId, ConsentFlow, CredentialRecord, CredentialStore, RefreshToken, Result,
};

use crate::config::OAuthConfig;
use crate::token::{TokenClient, TokenResponse};

/// Backoff before the single refresh retry after a transport failure.
const REFRESH_RETRY_BACKOFF_MS: u64 = 500;

/// Lifecycle state of one account's credentials.
///
/// Outbound API calls are only permitted from `Authenticated`; every other
/// state routes the caller through a refresh or the interactive flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    /// No usable credentials.
    Unauthenticated,
    /// Waiting on the browser consent flow.
    PendingConsent,
    /// Holds a non-expired access token.
    Authenticated,
    /// A refresh exchange is in flight.
    Refreshing,
}

/// Guarantees that any outbound call holds a non-expired access token,
/// transparently refreshing or re-consenting as needed, and switches
/// between previously-authorized accounts without restarting the process.
///
/// The manager owns the single active session; callers receive the record
/// for the current operation instead of reading ambient global state.
pub struct AuthManager {
    store: Arc<dyn CredentialStore>,
    consent: Arc<dyn ConsentFlow>,
    tokens: TokenClient,
    active: RwLock<Option<CredentialRecord>>,
    states: Mutex<HashMap<AccountId, AccountState>>,
}

impl AuthManager {
    /// Create a manager over an injected store and consent flow.
    pub fn new(
        config: OAuthConfig,
        store: Arc<dyn CredentialStore>,
        consent: Arc<dyn ConsentFlow>,
    ) -> Self {
        Self {
            store,
            consent,
            tokens: TokenClient::new(config),
            active: RwLock::new(None),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// The lifecycle state of an account.
    pub async fn state(&self, account: &AccountId) -> AccountState {
        self.states
            .lock()
            .await
            .get(account)
            .copied()
            .unwrap_or(AccountState::Unauthenticated)
    }

    /// The record currently authorizing outbound calls, if any.
    pub async fn active_session(&self) -> Option<CredentialRecord> {
        self.active.read().await.clone()
    }

    async fn set_state(&self, account: &AccountId, state: AccountState) {
        let mut states = self.states.lock().await;
        let previous = states.insert(account.clone(), state);
        debug!(account = %account, ?previous, ?state, "Account state transition");
    }

    async fn set_active(&self, record: CredentialRecord) {
        *self.active.write().await = Some(record);
    }

    /// Produce a valid credential record for `account`.
    ///
    /// A stored non-expired record is returned as-is, with no network
    /// traffic. An expired record with a refresh token goes through the
    /// refresh exchange; a denied refresh falls back to interactive
    /// consent. With no account named, the most recently used account is
    /// assumed, or consent starts from scratch.
    #[instrument(skip(self), fields(account = account.map(|a| a.as_str())))]
    pub async fn authenticate(&self, account: Option<&AccountId>) -> Result<CredentialRecord> {
        let target = match account {
            Some(id) => Some(id.clone()),
            None => self.store.last_used().await?,
        };

        let Some(account) = target else {
            debug!("No known account, starting consent");
            return self.consent_and_persist(None).await;
        };

        let Some(record) = self.store.load(&account).await? else {
            debug!(account = %account, "Account has no stored record, starting consent");
            return self.consent_and_persist(Some(&account)).await;
        };

        if !record.is_expired() {
            debug!(account = %account, "Stored token still valid");
            self.set_state(&account, AccountState::Authenticated).await;
            self.store.set_last_used(&account).await?;
            self.set_active(record.clone()).await;
            return Ok(record);
        }

        let Some(refresh_token) = record.refresh_token.clone() else {
            debug!(account = %account, "Token expired with no refresh token, starting consent");
            return self.consent_and_persist(Some(&account)).await;
        };

        self.set_state(&account, AccountState::Refreshing).await;
        info!(account = %account, "Access token expired, refreshing");

        match self.refresh_with_retry(refresh_token.as_str()).await {
            Ok(response) => {
                self.apply_refresh(&account, &record, refresh_token, response)
                    .await
            }
            Err(Error::Auth(AuthError::RefreshDenied { reason })) => {
                warn!(account = %account, %reason, "Refresh denied, falling back to consent");
                self.consent_and_persist(Some(&account)).await
            }
            Err(err) => {
                self.set_state(&account, AccountState::Unauthenticated).await;
                Err(err)
            }
        }
    }

    /// Force a refresh exchange for an account, regardless of expiry.
    ///
    /// Unlike [`AuthManager::authenticate`], a denied refresh surfaces
    /// instead of falling back to consent; the caller asked for a refresh
    /// specifically.
    #[instrument(skip(self), fields(account = %account))]
    pub async fn refresh(&self, account: &AccountId) -> Result<CredentialRecord> {
        let record = self
            .store
            .load(account)
            .await?
            .ok_or(Error::Auth(AuthError::NoSession))?;
        let refresh_token = record
            .refresh_token
            .clone()
            .ok_or(Error::Auth(AuthError::NoRefreshToken))?;

        self.set_state(account, AccountState::Refreshing).await;
        info!(account = %account, "Forcing token refresh");

        match self.refresh_with_retry(refresh_token.as_str()).await {
            Ok(response) => {
                self.apply_refresh(account, &record, refresh_token, response)
                    .await
            }
            Err(err) => {
                self.set_state(account, AccountState::Unauthenticated).await;
                Err(err)
            }
        }
    }

    /// Persist and activate the outcome of a successful refresh exchange.
    async fn apply_refresh(
        &self,
        account: &AccountId,
        previous: &CredentialRecord,
        old_refresh_token: RefreshToken,
        response: TokenResponse,
    ) -> Result<CredentialRecord> {
        let updated = CredentialRecord {
            account: account.clone(),
            access_token: AccessToken::new(response.access_token.clone()),
            // The provider may decline to rotate; keep the old one.
            refresh_token: response
                .refresh_token
                .clone()
                .map(RefreshToken::new)
                .or(Some(old_refresh_token)),
            expires_at: response.expires_at(),
            scopes: if response.scopes().is_empty() {
                previous.scopes.clone()
            } else {
                response.scopes()
            },
        };

        // Persist before handing the token out: a crash after this point
        // must not lose a rotated refresh token.
        self.store.save(&updated).await?;
        self.store.set_last_used(account).await?;
        self.set_state(account, AccountState::Authenticated).await;
        self.set_active(updated.clone()).await;
        Ok(updated)
    }

    /// Make the named account the active session.
    ///
    /// Unknown accounts go through consent; other accounts' stored records
    /// are never touched.
    #[instrument(skip(self), fields(account = %account))]
    pub async fn switch_account(&self, account: &AccountId) -> Result<CredentialRecord> {
        info!("Switching account");
        self.authenticate(Some(account)).await
    }

    /// Remove the account from the registry, revoking its refresh token
    /// server-side on a best-effort basis, and drop it as the active
    /// session if it was active.
    #[instrument(skip(self), fields(account = %account))]
    pub async fn sign_out(&self, account: &AccountId) -> Result<()> {
        info!("Signing out");

        if let Some(record) = self.store.load(account).await? {
            if let Some(refresh) = &record.refresh_token {
                self.tokens.revoke(refresh.as_str()).await;
            }
        }

        self.store.remove(account).await?;

        {
            let mut active = self.active.write().await;
            if active.as_ref().map(|r| &r.account) == Some(account) {
                *active = None;
            }
        }

        self.set_state(account, AccountState::Unauthenticated).await;
        Ok(())
    }

    /// One refresh attempt, retried once with backoff after a transport
    /// failure. Auth denials are not retried: a revoked token stays revoked.
    async fn refresh_with_retry(&self, refresh_token: &str) -> Result<TokenResponse> {
        match self.tokens.refresh(refresh_token).await {
            Err(Error::Transport(err)) => {
                warn!(error = %err, "Refresh transport failure, retrying once");
                tokio::time::sleep(std::time::Duration::from_millis(REFRESH_RETRY_BACKOFF_MS))
                    .await;
                self.tokens.refresh(refresh_token).await
            }
            other => other,
        }
    }

    async fn consent_and_persist(&self, hint: Option<&AccountId>) -> Result<CredentialRecord> {
        if let Some(hint) = hint {
            self.set_state(hint, AccountState::PendingConsent).await;
        }

        let record = match self.consent.obtain_consent(hint).await {
            Ok(record) => record,
            Err(err) => {
                if let Some(hint) = hint {
                    self.set_state(hint, AccountState::Unauthenticated).await;
                }
                return Err(err);
            }
        };

        self.store.save(&record).await?;
        self.store.set_last_used(&record.account).await?;
        self.set_state(&record.account, AccountState::Authenticated).await;
        self.set_active(record.clone()).await;
        info!(account = %record.account, "Account authenticated");
        Ok(record)
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("active", &"[REDACTED]")
            .finish()
    }
}
