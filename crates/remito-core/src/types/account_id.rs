//! Account identifier type.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// A validated Google account identifier (the account's email address).
///
/// The registry keys stored credential records by this identifier, and the
/// auth manager addresses accounts by it when switching or signing out.
///
/// # Example
///
/// ```
/// use remito_core::AccountId;
///
/// let id = AccountId::new("ventas@example.com").unwrap();
/// assert_eq!(id.as_str(), "ventas@example.com");
/// assert!(AccountId::new("not an email").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AccountId(String);

impl AccountId {
    /// Create a new account id from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is empty, contains whitespace, or is
    /// not addressable as an email.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();

        if s.is_empty() {
            return Err(invalid(s, "must not be empty"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(invalid(s, "must not contain whitespace"));
        }
        match s.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(invalid(s, "must be an email address")),
        }

        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn invalid(value: &str, reason: &str) -> Error {
    Error::InvalidInput(InvalidInputError::AccountId {
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_email() {
        let id = AccountId::new("Pedidos@Example.COM").unwrap();
        // Normalized to lowercase so registry lookups are case-insensitive.
        assert_eq!(id.as_str(), "pedidos@example.com");
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert!(AccountId::new("").is_err());
        assert!(AccountId::new("a b@example.com").is_err());
    }

    #[test]
    fn rejects_non_email() {
        assert!(AccountId::new("no-at-sign").is_err());
        assert!(AccountId::new("@example.com").is_err());
        assert!(AccountId::new("user@nodot").is_err());
    }
}
