//! remito-gdrive - Google Sheets and Drive upload for the remito toolkit.

mod a1;
mod client;
mod uploader;

pub use a1::{column_letter, data_range};
pub use client::{SheetsClient, Spreadsheet};
pub use uploader::{UploadOutcome, Uploader};
