//! Switch account command implementation.

use anyhow::{Context, Result};
use clap::Args;

use remito_core::AccountId;

use crate::config::AppConfig;
use crate::output;

use super::build_manager;

#[derive(Args, Debug)]
pub struct SwitchArgs {
    /// Account email to switch to
    pub account: String,
}

pub async fn run(args: SwitchArgs, config: &AppConfig) -> Result<()> {
    let account = AccountId::new(&args.account).context("Invalid account email")?;
    let (manager, renderer) = build_manager(config)?;

    let record = manager
        .switch_account(&account)
        .await
        .context("Failed to switch account")?;

    drop(manager);
    let _ = renderer.await;

    output::success("Active account switched");
    output::field("Account", record.account.as_str());

    Ok(())
}
