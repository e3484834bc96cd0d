//! Error types for the remito toolkit.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, credential storage, filtering, and upload
//! failures.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for remito operations.
///
/// Covers every failure mode in the toolkit, with explicit variants to let
/// callers handle specific cases (the CLI surfaces all of them as messages,
/// none aborts the process).
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (consent denied, refresh denied).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Credential store errors (unreadable or malformed on-disk records).
    #[error("credential store error: {0}")]
    CredentialStore(#[from] CredentialStoreError),

    /// Tabular filter errors (missing column, schema mismatch).
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// Upload errors reported by the spreadsheet/drive service.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    /// Input validation errors (invalid account id, malformed config).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// DNS resolution failed.
    #[error("DNS resolution failed: {host}")]
    Dns { host: String },

    /// Request timed out.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The user declined the interactive consent flow, or it failed before
    /// tokens were issued.
    #[error("consent not granted: {reason}")]
    ConsentDenied { reason: String },

    /// The token endpoint rejected the refresh exchange (revoked or expired
    /// refresh token).
    #[error("refresh denied: {reason}")]
    RefreshDenied { reason: String },

    /// No refresh token is available for a refresh exchange.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// No account is signed in.
    #[error("no active session")]
    NoSession,
}

/// Credential store errors.
///
/// Corruption is recovered locally (the registry is treated as empty and the
/// caller re-consents); IO failures on write are surfaced.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// The on-disk registry could not be parsed.
    #[error("corrupted credential file {path}: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    /// Reading or writing the registry failed.
    #[error("credential file IO: {message}")]
    Io { message: String },
}

/// Tabular filter errors.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A required input column is absent.
    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    /// A row's width does not match the header.
    #[error("row {row} has {found} cells, expected {expected}")]
    SchemaMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The input contains no data rows.
    #[error("input table is empty")]
    EmptyInput,
}

/// An error response from the spreadsheet/drive service.
#[derive(Debug)]
pub struct UploadError {
    /// HTTP status code.
    pub status: u16,
    /// Service error status string (if present, e.g. "PERMISSION_DENIED").
    pub code: Option<String>,
    /// Error message from the server.
    pub message: Option<String>,
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref code) = self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for UploadError {}

impl UploadError {
    /// Create a new upload error.
    pub fn new(status: u16, code: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            code,
            message,
        }
    }

    /// Check if the service rejected the call for quota reasons.
    pub fn is_quota(&self) -> bool {
        self.status == 429 || self.code.as_deref() == Some("RESOURCE_EXHAUSTED")
    }

    /// Check if the active credentials lack permission for the target.
    pub fn is_permission(&self) -> bool {
        self.status == 403 || self.code.as_deref() == Some("PERMISSION_DENIED")
    }

    /// Check if the target spreadsheet or folder does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status == 404 || self.code.as_deref() == Some("NOT_FOUND")
    }

    /// Check if the service rejected the access token.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401 || self.code.as_deref() == Some("UNAUTHENTICATED")
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid account identifier.
    #[error("invalid account id '{value}': {reason}")]
    AccountId { value: String, reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_error_display_includes_code_and_message() {
        let err = UploadError::new(
            403,
            Some("PERMISSION_DENIED".to_string()),
            Some("The caller does not have permission".to_string()),
        );
        let text = err.to_string();
        assert!(text.contains("403"));
        assert!(text.contains("PERMISSION_DENIED"));
        assert!(text.contains("does not have permission"));
    }

    #[test]
    fn upload_error_classification() {
        assert!(UploadError::new(429, None, None).is_quota());
        assert!(UploadError::new(403, None, None).is_permission());
        assert!(UploadError::new(404, None, None).is_not_found());
        assert!(
            UploadError::new(400, Some("RESOURCE_EXHAUSTED".to_string()), None).is_quota()
        );
    }
}
