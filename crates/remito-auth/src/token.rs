//! Token endpoint client: code exchange, refresh, revocation.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use remito_core::error::{AuthError, Error, TransportError};
use remito_core::Result;

use crate::config::OAuthConfig;

/// Network timeout for token endpoint calls. There is no mid-refresh
/// cancellation; a timeout aborts the exchange.
const TOKEN_TIMEOUT_SECS: u64 = 30;

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    /// Absent when the provider chose not to rotate the refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Space-separated granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Absolute expiry computed from `expires_in`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(self.expires_in)
    }

    /// Granted scopes as a list.
    pub fn scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// Error body returned by the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// HTTP client for the OAuth2 token and revocation endpoints.
#[derive(Debug, Clone)]
pub struct TokenClient {
    client: reqwest::Client,
    config: OAuthConfig,
}

impl TokenClient {
    /// Create a token client for the configured endpoints.
    pub fn new(config: OAuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("remito/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(TOKEN_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self { client, config }
    }

    /// Exchange an authorization code for tokens.
    #[instrument(skip(self, code, verifier))]
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse> {
        debug!("Exchanging authorization code");

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code_verifier", verifier),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(map_transport)?;

        self.handle_token_response(response, TokenOp::Exchange).await
    }

    /// Mint a new access token from a refresh token.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        debug!("Refreshing access token");

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(map_transport)?;

        self.handle_token_response(response, TokenOp::Refresh).await
    }

    /// Revoke a refresh token server-side. Best-effort: failures are logged
    /// and swallowed, since sign-out must succeed regardless.
    #[instrument(skip(self, token))]
    pub async fn revoke(&self, token: &str) {
        let result = self
            .client
            .post(&self.config.revoke_url)
            .form(&[("token", token)])
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Token revoked");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Token revocation rejected");
            }
            Err(err) => {
                warn!(error = %err, "Token revocation request failed");
            }
        }
    }

    async fn handle_token_response(
        &self,
        response: reqwest::Response,
        op: TokenOp,
    ) -> Result<TokenResponse> {
        let status = response.status();

        if status.is_success() {
            let body = response.json::<TokenResponse>().await.map_err(map_transport)?;
            return Ok(body);
        }

        if status.is_server_error() {
            return Err(Error::Transport(TransportError::Http {
                message: format!("token endpoint returned {}", status),
            }));
        }

        // 4xx: the grant itself was rejected.
        let reason = match response.json::<TokenErrorResponse>().await {
            Ok(body) => {
                let code = body.error.unwrap_or_else(|| status.to_string());
                match body.error_description {
                    Some(desc) => format!("{}: {}", code, desc),
                    None => code,
                }
            }
            Err(_) => status.to_string(),
        };

        Err(Error::Auth(match op {
            TokenOp::Exchange => AuthError::ConsentDenied { reason },
            TokenOp::Refresh => AuthError::RefreshDenied { reason },
        }))
    }
}

#[derive(Debug, Clone, Copy)]
enum TokenOp {
    Exchange,
    Refresh,
}

/// Map a reqwest failure onto the transport taxonomy.
pub(crate) fn map_transport(err: reqwest::Error) -> Error {
    let transport = if err.is_timeout() {
        TransportError::Timeout {
            duration_ms: TOKEN_TIMEOUT_SECS * 1000,
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

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> OAuthConfig {
        let mut config = OAuthConfig::google("client-id", "client-secret");
        config.token_url = format!("{}/token", server.uri());
        config.revoke_url = format!("{}/revoke", server.uri());
        config
    }

    #[tokio::test]
    async fn refresh_parses_success_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-access",
                "expires_in": 3599,
                "scope": "https://www.googleapis.com/auth/spreadsheets",
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let client = TokenClient::new(test_config(&server));
        let response = client.refresh("old-refresh").await.unwrap();

        assert_eq!(response.access_token, "new-access");
        assert!(response.refresh_token.is_none());
        assert_eq!(response.scopes().len(), 1);
        assert!(response.expires_at() > Utc::now());
    }

    #[tokio::test]
    async fn refresh_denied_maps_to_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Token has been revoked."
            })))
            .mount(&server)
            .await;

        let client = TokenClient::new(test_config(&server));
        let err = client.refresh("revoked").await.unwrap_err();

        match err {
            Error::Auth(AuthError::RefreshDenied { reason }) => {
                assert!(reason.contains("invalid_grant"));
                assert!(reason.contains("revoked"));
            }
            other => panic!("expected RefreshDenied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_maps_to_transport() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = TokenClient::new(test_config(&server));
        let err = client.refresh("anything").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn revoke_swallows_failures() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/revoke"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let client = TokenClient::new(test_config(&server));
        // Must not panic or error.
        client.revoke("whatever").await;
    }
}
