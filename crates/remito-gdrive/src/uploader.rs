//! Spreadsheet and Drive upload orchestration.

use std::path::Path;

use tracing::{info, instrument};

use remito_core::error::{Error, InvalidInputError};
use remito_core::{AccessToken, Result, StatusSender, Table};

use crate::a1::data_range;
use crate::client::SheetsClient;

/// Title of the spreadsheet's first sheet, holding the Argentina table.
const MAIN_SHEET_TITLE: &str = "Hoja 1";
/// Title of the sheet holding the Andreani manifest.
const ANDREANI_SHEET_TITLE: &str = "Andreani";

/// What a finished upload produced.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Id of the created spreadsheet.
    pub spreadsheet_id: String,
    /// Browser URL of the created spreadsheet, when the API returned one.
    pub spreadsheet_url: Option<String>,
    /// Id of the derived file pushed to Drive, when one was requested.
    pub drive_file_id: Option<String>,
}

/// Pushes finished tables to a new spreadsheet and, optionally, a derived
/// file into a Drive folder, reporting progress along the way.
pub struct Uploader<'a> {
    client: &'a SheetsClient,
    token: &'a AccessToken,
    status: StatusSender,
}

impl<'a> Uploader<'a> {
    pub fn new(client: &'a SheetsClient, token: &'a AccessToken, status: StatusSender) -> Self {
        Self {
            client,
            token,
            status,
        }
    }

    /// Create `Archivo {date} ARG` with the Argentina table on the first
    /// sheet and the Andreani manifest on a second one, both formatted.
    #[instrument(skip(self, argentina, andreani))]
    pub async fn upload_tables(
        &self,
        argentina: &Table,
        andreani: &Table,
        file_date: &str,
    ) -> Result<UploadOutcome> {
        let title = format!("Archivo {} ARG", file_date);
        info!(%title, "Uploading tables to a new spreadsheet");

        self.status.message(format!("Creating spreadsheet '{}'...", title));
        let spreadsheet = self
            .client
            .create_spreadsheet(self.token, &title, MAIN_SHEET_TITLE)
            .await?;

        self.status.message("Uploading Argentina sheet...");
        let (rows, cols) = with_header_dims(argentina);
        let range = data_range(MAIN_SHEET_TITLE, rows, cols);
        self.client
            .update_values(self.token, &spreadsheet.id, &range, &sheet_values(argentina))
            .await?;

        self.status.message("Uploading Andreani sheet...");
        let (rows2, cols2) = with_header_dims(andreani);
        let sheet_id = self
            .client
            .add_sheet(self.token, &spreadsheet.id, ANDREANI_SHEET_TITLE, rows2, cols2)
            .await?;
        let range2 = data_range(ANDREANI_SHEET_TITLE, rows2, cols2);
        self.client
            .update_values(self.token, &spreadsheet.id, &range2, &sheet_values(andreani))
            .await?;

        self.status.message("Applying formatting...");
        // Sheet id 0 is the spreadsheet's first sheet.
        self.client
            .format_range(self.token, &spreadsheet.id, 0, rows, cols)
            .await?;
        self.client
            .format_range(self.token, &spreadsheet.id, sheet_id, rows2, cols2)
            .await?;

        info!(spreadsheet_id = %spreadsheet.id, "Spreadsheet upload finished");
        Ok(UploadOutcome {
            spreadsheet_id: spreadsheet.id,
            spreadsheet_url: spreadsheet.url,
            drive_file_id: None,
        })
    }

    /// Push a local export into the configured Drive folder.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn upload_derived_file(&self, folder_id: &str, path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(InvalidInputError::Other {
                    message: format!("export path {} has no file name", path.display()),
                })
            })?;

        let content = std::fs::read(path).map_err(|e| {
            Error::InvalidInput(InvalidInputError::Other {
                message: format!("cannot read {}: {}", path.display(), e),
            })
        })?;

        self.status
            .message(format!("Uploading {} to Drive...", name));
        let file_id = self
            .client
            .upload_file(self.token, folder_id, name, "text/csv", content)
            .await?;

        info!(%file_id, "Drive upload finished");
        Ok(file_id)
    }
}

/// Header plus data rows, with spreadsheet `nan` artifacts blanked.
fn sheet_values(table: &Table) -> Vec<Vec<String>> {
    let mut values = Vec::with_capacity(table.len() + 1);
    values.push(table.columns().to_vec());
    for row in table.rows() {
        values.push(
            row.iter()
                .map(|cell| {
                    if cell == "nan" || cell == "n" {
                        String::new()
                    } else {
                        cell.clone()
                    }
                })
                .collect(),
        );
    }
    values
}

/// Grid dimensions including the header row.
fn with_header_dims(table: &Table) -> (usize, usize) {
    (table.len() + 1, table.width())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn table() -> Table {
        Table::from_parts(
            vec!["Name".into(), "Total".into()],
            vec![
                vec!["#1".into(), "100".into()],
                vec!["#2".into(), "nan".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn sheet_values_include_header_and_blank_artifacts() {
        let values = sheet_values(&table());
        assert_eq!(values[0], vec!["Name".to_string(), "Total".to_string()]);
        assert_eq!(values[2], vec!["#2".to_string(), String::new()]);
    }

    #[tokio::test]
    async fn upload_creates_both_sheets_and_formats() {
        let server = MockServer::start().await;
        let client = SheetsClient::with_base_urls(server.uri(), server.uri());
        let token = AccessToken::new("token");

        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets"))
            .and(body_partial_json(serde_json::json!({
                "properties": { "title": "Archivo 09-03-2024 ARG" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "spreadsheetId": "sheet-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        // Two value uploads: main sheet and Andreani sheet.
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(2)
            .mount(&server)
            .await;

        // Three batchUpdates: addSheet plus two format passes.
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/sheet-1:batchUpdate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "replies": [ { "addSheet": { "properties": { "sheetId": 5 } } } ]
            })))
            .expect(3)
            .mount(&server)
            .await;

        let uploader = Uploader::new(&client, &token, StatusSender::sink());
        let outcome = uploader
            .upload_tables(&table(), &table(), "09-03-2024")
            .await
            .unwrap();

        assert_eq!(outcome.spreadsheet_id, "sheet-1");
        assert!(outcome.drive_file_id.is_none());
    }
}
