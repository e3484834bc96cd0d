//! Process command: the full filter-and-upload pipeline.
//!
//! The pipeline runs on a worker task while this task drains the status
//! channel and renders progress, so a slow consent flow or upload never
//! blocks the output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use remito_core::{status_channel, FilterStats, StatusEvent, StatusSender};
use remito_filter::{andreani_filter, argentina_filter, concat_tables, export_csv, read_csv_file};
use remito_gdrive::{SheetsClient, Uploader};

use crate::config::AppConfig;
use crate::output;

use super::auth::{build_store, parse_account};

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// CSV export files to process
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Skip the Google upload; only write local exports
    #[arg(long)]
    pub no_upload: bool,

    /// Directory for local CSV exports (defaults to the desktop)
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Google account to upload as (defaults to the most recently used)
    #[arg(long)]
    pub account: Option<String>,
}

pub async fn run(args: ProcessArgs, config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let (status, mut status_rx) = status_channel();

    let worker = tokio::spawn(pipeline(args, config, status));

    while let Some(event) = status_rx.recv().await {
        render(event);
    }

    worker.await.context("Pipeline task panicked")??;
    output::success("Processing finished");
    Ok(())
}

fn render(event: StatusEvent) {
    match event {
        StatusEvent::Progress { percent, stage } => {
            output::note(&format!("[{:>3}%] {}", percent, stage));
        }
        StatusEvent::Message(text) => output::note(&text),
        StatusEvent::Stats(stats) => render_stats(&stats),
        StatusEvent::Failed(text) => output::error(&text),
    }
}

fn render_stats(stats: &FilterStats) {
    println!("{}", "Order classification".bold());
    output::field("  CABA", &stats.caba.to_string());
    output::field("  Falta pagar", &stats.pending_payment.to_string());
    output::field("  Vencido", &stats.expired.to_string());
    output::field("  Reembolsado", &stats.refunded.to_string());
    output::field("  Revisar notas", &stats.review_notes.to_string());
    output::field("  Revisar DNI", &stats.review_dni.to_string());
    output::field("  Sin clasificar", &stats.unclassified.to_string());
}

async fn pipeline(args: ProcessArgs, config: AppConfig, status: StatusSender) -> Result<()> {
    tracing::debug!(files = args.files.len(), no_upload = args.no_upload, "Starting pipeline");

    status.progress(10, "Loading CSV files");
    let mut tables = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let table =
            read_csv_file(file).with_context(|| format!("Failed to read {}", file.display()))?;
        status.message(format!(
            "Loaded {} ({} rows)",
            file.display(),
            table.len()
        ));
        tables.push(table);
    }

    status.progress(30, "Combining inputs");
    let combined = concat_tables(tables).context("Failed to combine input files")?;

    status.progress(45, "Applying Argentina filter");
    let argentina = argentina_filter(&combined).context("Argentina filter failed")?;
    status.stats(argentina.stats.clone());

    status.progress(60, "Applying Andreani filter");
    let andreani = andreani_filter(&combined).context("Andreani filter failed")?;

    status.progress(70, "Writing local exports");
    let export_dir = match &args.export_dir {
        Some(dir) => dir.clone(),
        None => config.export_dir()?,
    };
    let argentina_path = export_csv(
        &argentina.table,
        &export_dir,
        &argentina.file_date,
        "Argentina",
    )
    .context("Failed to export the Argentina table")?;
    let andreani_path = export_csv(&andreani, &export_dir, &argentina.file_date, "Andreani")
        .context("Failed to export the Andreani table")?;
    status.message(format!("Exports written to {}", export_dir.display()));

    if args.no_upload {
        status.progress(100, "Done (upload skipped)");
        return Ok(());
    }

    status.progress(80, "Authorizing Google account");
    let record = authorize(&args, &config, status.clone()).await?;

    status.progress(85, "Uploading to Google Sheets");
    let client = SheetsClient::new();
    let uploader = Uploader::new(&client, &record.access_token, status.clone());
    let outcome = uploader
        .upload_tables(&argentina.table, &andreani, &argentina.file_date)
        .await
        .context("Spreadsheet upload failed")?;
    if let Some(url) = &outcome.spreadsheet_url {
        status.message(format!("Spreadsheet ready: {}", url));
    }

    if let Some(folder_id) = &config.drive_folder_id {
        status.progress(95, "Uploading exports to Drive");
        uploader
            .upload_derived_file(folder_id, &argentina_path)
            .await
            .context("Drive upload failed")?;
        uploader
            .upload_derived_file(folder_id, &andreani_path)
            .await
            .context("Drive upload failed")?;
    }

    status.progress(100, "Done");
    Ok(())
}

/// Obtain a valid credential record for the upload.
async fn authorize(
    args: &ProcessArgs,
    config: &AppConfig,
    status: StatusSender,
) -> Result<remito_core::CredentialRecord> {
    use remito_auth::{AuthManager, LoopbackConsentFlow};
    use std::sync::Arc;

    if config.client_id.is_empty() {
        anyhow::bail!(
            "No OAuth client configured. Set client_id/client_secret in the config file, \
             or pass --no-upload."
        );
    }

    let store = build_store(config)?;
    let oauth = config.oauth();
    let consent = Arc::new(LoopbackConsentFlow::new(oauth.clone(), status));
    let manager = AuthManager::new(oauth, store, consent);

    let account = parse_account(args.account.as_deref())?;
    manager
        .authenticate(account.as_ref())
        .await
        .context("Failed to authorize the Google account")
}
