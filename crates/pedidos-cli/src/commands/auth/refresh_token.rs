//! Refresh token command implementation.

use anyhow::{Context, Result};
use clap::Args;

use remito_core::CredentialStore;

use crate::config::AppConfig;
use crate::output;

use super::{build_manager, build_store, parse_account};

#[derive(Args, Debug)]
pub struct RefreshTokenArgs {
    /// Account to refresh (defaults to the most recently used)
    #[arg(long)]
    pub account: Option<String>,
}

pub async fn run(args: RefreshTokenArgs, config: &AppConfig) -> Result<()> {
    let account = match parse_account(args.account.as_deref())? {
        Some(account) => account,
        None => build_store(config)?
            .last_used()
            .await?
            .context("No active account. Run 'pedidos auth login' first.")?,
    };

    let (manager, renderer) = build_manager(config)?;
    output::note("Refreshing token...");

    let record = manager
        .refresh(&account)
        .await
        .context("Failed to refresh token")?;

    drop(manager);
    let _ = renderer.await;

    output::success("Token refreshed");
    output::field("Account", record.account.as_str());
    output::field(
        "Token expires",
        &record.expires_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );

    Ok(())
}
