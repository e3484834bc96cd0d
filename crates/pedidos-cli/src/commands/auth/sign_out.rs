//! Sign out command implementation.

use anyhow::{Context, Result};
use clap::Args;

use remito_core::AccountId;

use crate::config::AppConfig;
use crate::output;

use super::build_manager;

#[derive(Args, Debug)]
pub struct SignOutArgs {
    /// Account email to sign out
    pub account: String,
}

pub async fn run(args: SignOutArgs, config: &AppConfig) -> Result<()> {
    let account = AccountId::new(&args.account).context("Invalid account email")?;
    let (manager, renderer) = build_manager(config)?;

    manager
        .sign_out(&account)
        .await
        .context("Failed to sign out")?;

    drop(manager);
    let _ = renderer.await;

    output::success("Account signed out; a new login will be required.");
    Ok(())
}
