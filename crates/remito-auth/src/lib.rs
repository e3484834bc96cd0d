//! remito-auth - OAuth2 token lifecycle for the remito toolkit.
//!
//! This crate owns the credential side of the pipeline: the file-backed
//! account registry, the interactive consent flow, the refresh exchange, and
//! the [`AuthManager`] that guarantees every outbound call holds a
//! non-expired access token.

mod config;
mod flow;
mod manager;
mod pkce;
mod store;
mod token;

pub use config::OAuthConfig;
pub use flow::LoopbackConsentFlow;
pub use manager::{AccountState, AuthManager};
pub use store::FileCredentialStore;
pub use token::TokenClient;
