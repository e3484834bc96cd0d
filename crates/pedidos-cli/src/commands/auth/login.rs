//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::config::AppConfig;
use crate::output;

use super::{build_manager, parse_account};

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email to authorize (hint for the consent screen)
    #[arg(long)]
    pub account: Option<String>,
}

pub async fn run(args: LoginArgs, config: &AppConfig) -> Result<()> {
    let account = parse_account(args.account.as_deref())?;
    let (manager, renderer) = build_manager(config)?;

    let record = manager
        .authenticate(account.as_ref())
        .await
        .context("Failed to authorize account")?;

    drop(manager);
    let _ = renderer.await;

    output::success("Account authorized");
    println!();
    output::field("Account", record.account.as_str());
    output::field(
        "Token expires",
        &record.expires_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    output::field("Scopes", &record.scopes.join(" "));

    Ok(())
}
