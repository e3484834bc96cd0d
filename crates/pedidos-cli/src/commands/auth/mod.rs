//! Auth subcommand implementations.

mod list;
mod login;
mod refresh_token;
mod sign_out;
mod switch;
mod whoami;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tokio::task::JoinHandle;

use remito_auth::{AuthManager, FileCredentialStore, LoopbackConsentFlow};
use remito_core::{status_channel, StatusEvent};

use crate::config::AppConfig;
use crate::output;

#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Authorize a Google account (opens a browser consent page)
    Login(login::LoginArgs),

    /// Display the most recently used account
    Whoami(whoami::WhoamiArgs),

    /// List authorized accounts
    List(list::ListArgs),

    /// Make another authorized account the active one
    Switch(switch::SwitchArgs),

    /// Force a token refresh for an account
    RefreshToken(refresh_token::RefreshTokenArgs),

    /// Remove an account's stored credentials
    SignOut(sign_out::SignOutArgs),
}

pub async fn handle(cmd: AuthCommand, config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    match cmd.command {
        AuthSubcommand::Login(args) => login::run(args, &config).await,
        AuthSubcommand::Whoami(args) => whoami::run(args, &config).await,
        AuthSubcommand::List(args) => list::run(args, &config).await,
        AuthSubcommand::Switch(args) => switch::run(args, &config).await,
        AuthSubcommand::RefreshToken(args) => refresh_token::run(args, &config).await,
        AuthSubcommand::SignOut(args) => sign_out::run(args, &config).await,
    }
}

/// The credential store at the configured location.
pub(crate) fn build_store(config: &AppConfig) -> Result<Arc<FileCredentialStore>> {
    let path = config.credentials_path()?;
    Ok(Arc::new(FileCredentialStore::new(path)))
}

/// An auth manager wired to a status renderer that prints progress lines.
///
/// The renderer task ends once the manager (and with it the status sender)
/// is dropped; await the handle to flush the last lines.
pub(crate) fn build_manager(config: &AppConfig) -> Result<(AuthManager, JoinHandle<()>)> {
    if config.client_id.is_empty() {
        anyhow::bail!(
            "No OAuth client configured. Set client_id/client_secret in the config file."
        );
    }

    let store = build_store(config)?;
    let (status, mut status_rx) = status_channel();

    let renderer = tokio::spawn(async move {
        while let Some(event) = status_rx.recv().await {
            match event {
                StatusEvent::Message(text) => output::note(&text),
                StatusEvent::Failed(text) => output::error(&text),
                _ => {}
            }
        }
    });

    let oauth = config.oauth();
    let consent = Arc::new(LoopbackConsentFlow::new(oauth.clone(), status));
    let manager = AuthManager::new(oauth, store, consent);
    Ok((manager, renderer))
}

/// Parse an optional `--account` flag.
pub(crate) fn parse_account(value: Option<&str>) -> Result<Option<remito_core::AccountId>> {
    value
        .map(|v| remito_core::AccountId::new(v).context("Invalid account email"))
        .transpose()
}
