//! List accounts command implementation.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use remito_core::CredentialStore;

use crate::config::AppConfig;
use crate::output;

use super::build_store;

#[derive(Args, Debug)]
pub struct ListArgs {}

pub async fn run(_args: ListArgs, config: &AppConfig) -> Result<()> {
    let store = build_store(config)?;

    let mut accounts = store.accounts().await?;
    if accounts.is_empty() {
        output::note("No authorized accounts. Run 'pedidos auth login' first.");
        return Ok(());
    }
    accounts.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    let last_used = store.last_used().await?;
    for account in accounts {
        if Some(&account) == last_used.as_ref() {
            println!("{} {}", "*".green(), account.as_str());
        } else {
            println!("  {}", account.as_str());
        }
    }

    Ok(())
}
