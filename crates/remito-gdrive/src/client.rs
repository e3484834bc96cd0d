//! HTTP client for the Sheets v4 and Drive v3 APIs.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, trace};

use remito_core::error::{Error, TransportError, UploadError};
use remito_core::{AccessToken, Result};

/// Network timeout for API calls.
const API_TIMEOUT_SECS: u64 = 60;

/// Error envelope the Google APIs return.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSpreadsheetResponse {
    spreadsheet_id: String,
    #[serde(default)]
    spreadsheet_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileResponse {
    id: String,
}

/// A created spreadsheet's id and URL.
#[derive(Debug, Clone)]
pub struct Spreadsheet {
    pub id: String,
    pub url: Option<String>,
}

/// HTTP client for spreadsheet and drive calls.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    client: reqwest::Client,
    sheets_base: String,
    drive_base: String,
}

impl SheetsClient {
    /// Client against the production Google endpoints.
    pub fn new() -> Self {
        Self::with_base_urls(
            "https://sheets.googleapis.com",
            "https://www.googleapis.com",
        )
    }

    /// Client against injected base URLs, for tests.
    pub fn with_base_urls(sheets_base: impl Into<String>, drive_base: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("remito/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(API_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            sheets_base: sheets_base.into(),
            drive_base: drive_base.into(),
        }
    }

    /// Create a spreadsheet whose first sheet carries the given title.
    #[instrument(skip(self, token))]
    pub async fn create_spreadsheet(
        &self,
        token: &AccessToken,
        title: &str,
        first_sheet_title: &str,
    ) -> Result<Spreadsheet> {
        debug!("Creating spreadsheet");

        let url = format!("{}/v4/spreadsheets", self.sheets_base);
        let body = json!({
            "properties": { "title": title },
            "sheets": [ { "properties": { "title": first_sheet_title } } ],
        });

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers(token))
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        let created: CreateSpreadsheetResponse = self.handle_response(response).await?;
        Ok(Spreadsheet {
            id: created.spreadsheet_id,
            url: created.spreadsheet_url,
        })
    }

    /// Overwrite a cell range with raw (unparsed) string values.
    #[instrument(skip(self, token, values), fields(rows = values.len()))]
    pub async fn update_values(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> Result<()> {
        debug!(range, "Updating values");

        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.sheets_base,
            spreadsheet_id,
            urlencode(range)
        );
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });

        let response = self
            .client
            .put(&url)
            .query(&[("valueInputOption", "RAW")])
            .headers(self.auth_headers(token))
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        self.handle_response::<serde_json::Value>(response).await?;
        Ok(())
    }

    /// Add a sheet sized to the coming data, returning its sheet id.
    #[instrument(skip(self, token))]
    pub async fn add_sheet(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        title: &str,
        rows: usize,
        cols: usize,
    ) -> Result<i64> {
        debug!("Adding sheet");

        let body = json!({
            "requests": [ {
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": {
                            "rowCount": rows.max(1),
                            "columnCount": cols.max(1),
                        },
                    },
                },
            } ],
        });

        let response: BatchUpdateResponse =
            self.batch_update(token, spreadsheet_id, &body).await?;

        response
            .replies
            .first()
            .and_then(|r| r["addSheet"]["properties"]["sheetId"].as_i64())
            .ok_or_else(|| {
                Error::Upload(UploadError::new(
                    200,
                    None,
                    Some("addSheet reply missing sheetId".to_string()),
                ))
            })
    }

    /// Apply bold text and solid borders over a data range.
    #[instrument(skip(self, token))]
    pub async fn format_range(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        sheet_id: i64,
        rows: usize,
        cols: usize,
    ) -> Result<()> {
        debug!("Formatting range");

        let border = json!({ "style": "SOLID" });
        let body = json!({
            "requests": [ {
                "repeatCell": {
                    "range": {
                        "sheetId": sheet_id,
                        "startRowIndex": 0,
                        "endRowIndex": rows.max(1),
                        "startColumnIndex": 0,
                        "endColumnIndex": cols.max(1),
                    },
                    "cell": {
                        "userEnteredFormat": {
                            "textFormat": { "bold": true },
                            "borders": {
                                "top": border,
                                "bottom": border,
                                "left": border,
                                "right": border,
                            },
                        },
                    },
                    "fields": "userEnteredFormat(textFormat.bold,borders)",
                },
            } ],
        });

        self.batch_update::<BatchUpdateResponse>(token, spreadsheet_id, &body)
            .await?;
        Ok(())
    }

    /// Create a file entry in a Drive folder and upload its content.
    ///
    /// Two calls: metadata first (name, parent folder, MIME type), then the
    /// bytes against the upload endpoint.
    #[instrument(skip(self, token, content), fields(bytes = content.len()))]
    pub async fn upload_file(
        &self,
        token: &AccessToken,
        folder_id: &str,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> Result<String> {
        debug!("Creating drive file");

        let url = format!("{}/drive/v3/files", self.drive_base);
        let body = json!({
            "name": name,
            "parents": [folder_id],
            "mimeType": mime_type,
        });

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers(token))
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;
        let file: DriveFileResponse = self.handle_response(response).await?;

        debug!(file_id = %file.id, "Uploading drive file content");
        let upload_url = format!("{}/upload/drive/v3/files/{}", self.drive_base, file.id);
        let response = self
            .client
            .patch(&upload_url)
            .query(&[("uploadType", "media")])
            .headers(self.auth_headers(token))
            .header("Content-Type", mime_type)
            .body(content)
            .send()
            .await
            .map_err(map_transport)?;
        self.handle_response::<serde_json::Value>(response).await?;

        Ok(file.id)
    }

    async fn batch_update<R: DeserializeOwned>(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        body: &serde_json::Value,
    ) -> Result<R> {
        let url = format!(
            "{}/v4/spreadsheets/{}:batchUpdate",
            self.sheets_base, spreadsheet_id
        );

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers(token))
            .json(body)
            .send()
            .await
            .map_err(map_transport)?;

        self.handle_response(response).await
    }

    fn auth_headers(&self, token: &AccessToken) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", token.as_str());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).expect("invalid token characters"),
        );
        headers
    }

    /// Parse the body on success, or map the Google error envelope.
    async fn handle_response<R: DeserializeOwned>(&self, response: reqwest::Response) -> Result<R> {
        let status = response.status();
        trace!(status = %status, "API response");

        if status.is_success() {
            let body = response.json::<R>().await.map_err(map_transport)?;
            Ok(body)
        } else {
            let status = status.as_u16();
            let error = match response.json::<ApiErrorResponse>().await {
                Ok(body) => UploadError::new(status, body.error.status, body.error.message),
                Err(_) => UploadError::new(status, None, None),
            };
            Err(Error::Upload(error))
        }
    }
}

impl Default for SheetsClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a reqwest failure onto the transport taxonomy.
fn map_transport(err: reqwest::Error) -> Error {
    let transport = if err.is_timeout() {
        TransportError::Timeout {
            duration_ms: API_TIMEOUT_SECS * 1000,
        }
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(transport)
}

/// Percent-encode the path segment of a range.
fn urlencode(range: &str) -> String {
    let mut out = String::with_capacity(range.len());
    for byte in range.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'!' | b':' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SheetsClient {
        SheetsClient::with_base_urls(server.uri(), server.uri())
    }

    fn token() -> AccessToken {
        AccessToken::new("test-access-token")
    }

    #[tokio::test]
    async fn create_spreadsheet_sends_bearer_and_parses_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets"))
            .and(header("authorization", "Bearer test-access-token"))
            .and(body_partial_json(serde_json::json!({
                "properties": { "title": "Archivo 09-03-2024 ARG" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "spreadsheetId": "sheet-123",
                "spreadsheetUrl": "https://docs.google.com/spreadsheets/d/sheet-123"
            })))
            .mount(&server)
            .await;

        let created = client(&server)
            .create_spreadsheet(&token(), "Archivo 09-03-2024 ARG", "Hoja 1")
            .await
            .unwrap();

        assert_eq!(created.id, "sheet-123");
        assert!(created.url.unwrap().contains("sheet-123"));
    }

    #[tokio::test]
    async fn update_values_hits_encoded_range() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/v4/spreadsheets/sheet-123/values/%27Hoja%201%27!A1:B2"))
            .and(query_param("valueInputOption", "RAW"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "updatedCells": 4
            })))
            .mount(&server)
            .await;

        let values = vec![
            vec!["Name".to_string(), "Total".to_string()],
            vec!["#1".to_string(), "100".to_string()],
        ];
        client(&server)
            .update_values(&token(), "sheet-123", "'Hoja 1'!A1:B2", &values)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn add_sheet_returns_sheet_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/sheet-123:batchUpdate"))
            .and(body_partial_json(serde_json::json!({
                "requests": [ { "addSheet": { "properties": { "title": "Andreani" } } } ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "replies": [ { "addSheet": { "properties": { "sheetId": 77 } } } ]
            })))
            .mount(&server)
            .await;

        let sheet_id = client(&server)
            .add_sheet(&token(), "sheet-123", "Andreani", 10, 19)
            .await
            .unwrap();
        assert_eq!(sheet_id, 77);
    }

    #[tokio::test]
    async fn permission_error_maps_to_upload_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {
                    "code": 403,
                    "message": "The caller does not have permission",
                    "status": "PERMISSION_DENIED"
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_spreadsheet(&token(), "x", "Hoja 1")
            .await
            .unwrap_err();

        match err {
            Error::Upload(upload) => {
                assert!(upload.is_permission());
                assert_eq!(upload.status, 403);
            }
            other => panic!("expected UploadError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_file_creates_then_patches_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/drive/v3/files"))
            .and(body_partial_json(serde_json::json!({
                "name": "Archivo_Completo_09-03-2024_Argentina.csv",
                "parents": ["folder-9"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "file-1"
            })))
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/upload/drive/v3/files/file-1"))
            .and(query_param("uploadType", "media"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "file-1"
            })))
            .mount(&server)
            .await;

        let id = client(&server)
            .upload_file(
                &token(),
                "folder-9",
                "Archivo_Completo_09-03-2024_Argentina.csv",
                "text/csv",
                b"Name,Total\n#1,100\n".to_vec(),
            )
            .await
            .unwrap();
        assert_eq!(id, "file-1");
    }
}
