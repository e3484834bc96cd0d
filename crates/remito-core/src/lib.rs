//! remito-core - Shared types and traits for the remito toolkit.

pub mod error;
pub mod record;
pub mod status;
pub mod table;
pub mod tokens;
pub mod traits;
pub mod types;

pub use error::Error;
pub use record::CredentialRecord;
pub use status::{FilterStats, StatusEvent, StatusSender, status_channel};
pub use table::{SortOrder, Table};
pub use tokens::{AccessToken, RefreshToken};
pub use traits::{ConsentFlow, CredentialStore};
pub use types::AccountId;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
