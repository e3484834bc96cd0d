//! Whoami command implementation.

use anyhow::{Context, Result};
use clap::Args;

use remito_core::CredentialStore;

use crate::config::AppConfig;
use crate::output;

use super::build_store;

#[derive(Args, Debug)]
pub struct WhoamiArgs {}

pub async fn run(_args: WhoamiArgs, config: &AppConfig) -> Result<()> {
    let store = build_store(config)?;

    let account = store
        .last_used()
        .await?
        .context("No active account. Run 'pedidos auth login' first.")?;
    let record = store
        .load(&account)
        .await?
        .context("Stored account has no credentials. Run 'pedidos auth login' again.")?;

    output::field("Account", record.account.as_str());
    output::field(
        "Token expires",
        &record.expires_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    output::field(
        "Token state",
        if record.is_expired() { "expired" } else { "valid" },
    );

    Ok(())
}
