//! Stored OAuth2 credential record.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::tokens::{AccessToken, RefreshToken};
use crate::types::AccountId;

/// Tokens issued less than this far before their expiry are treated as
/// already expired, so an outbound call never races the deadline.
const EXPIRY_SKEW_SECS: i64 = 60;

/// The credential state for one authorized account.
///
/// A record is created on first successful consent, replaced wholesale on
/// every token refresh (new access token and expiry, refresh token rotated
/// when the provider issues a new one), and removed from the registry only
/// on explicit sign-out.
#[derive(Clone)]
pub struct CredentialRecord {
    /// The account these tokens belong to.
    pub account: AccountId,
    /// Short-lived bearer credential for API calls.
    pub access_token: AccessToken,
    /// Long-lived credential for minting new access tokens. Absent when the
    /// provider declined to issue one.
    pub refresh_token: Option<RefreshToken>,
    /// When the access token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// Scopes granted at consent time.
    pub scopes: Vec<String>,
}

impl CredentialRecord {
    /// Whether the access token is expired (or within the skew margin of
    /// expiring).
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Expiry check against an explicit clock, for deterministic tests.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_SKEW_SECS) <= now
    }
}

// Token values never appear in Debug output.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("account", &self.account)
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}
