//! Interactive authorization-code consent flow with a loopback redirect.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, instrument, warn};
use url::Url;

use remito_core::error::{AuthError, Error};
use remito_core::{
    AccessToken, AccountId, ConsentFlow, CredentialRecord, RefreshToken, Result, StatusSender,
};

use crate::config::OAuthConfig;
use crate::pkce::{generate_pkce, generate_state};
use crate::token::{map_transport, TokenClient};

/// How long to wait for the user to complete consent in the browser.
const CONSENT_TIMEOUT_SECS: u64 = 300;

/// Page shown in the browser once the redirect has been captured.
const CONSENT_DONE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>remito</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
<h2>Authentication successful!</h2>
<p>You can close this tab and return to the terminal.</p>
</body>
</html>"#;

/// Page shown when the provider reports an authorization error.
const CONSENT_FAILED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>remito</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
<h2>Authorization was not completed</h2>
<p>You can close this tab and return to the terminal.</p>
</body>
</html>"#;

/// Query parameters Google appends to the loopback redirect.
struct CallbackData {
    code: String,
    state: String,
}

/// What one loopback connection turned out to be.
enum Connection {
    /// The OAuth redirect, carrying code and state.
    Redirect(CallbackData),
    /// The provider redirected with an error (consent denied).
    Denied(String),
    /// Favicon fetch or other unrelated request.
    Unrelated,
}

/// Browser-based consent flow listening on a loopback redirect.
///
/// The flow prints the authorization URL through the status channel, waits
/// for the provider to redirect the browser back to `127.0.0.1`, exchanges
/// the authorization code, and resolves the account's email via the
/// userinfo endpoint.
pub struct LoopbackConsentFlow {
    config: OAuthConfig,
    tokens: TokenClient,
    http: reqwest::Client,
    status: StatusSender,
}

impl LoopbackConsentFlow {
    pub fn new(config: OAuthConfig, status: StatusSender) -> Self {
        let tokens = TokenClient::new(config.clone());
        let http = reqwest::Client::builder()
            .user_agent(concat!("remito/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");
        Self {
            config,
            tokens,
            http,
            status,
        }
    }

    fn build_auth_url(
        &self,
        redirect_uri: &str,
        challenge: &str,
        state: &str,
        hint: Option<&AccountId>,
    ) -> Result<String> {
        let mut url = Url::parse(&self.config.auth_url).map_err(|e| {
            Error::InvalidInput(remito_core::error::InvalidInputError::Other {
                message: format!("invalid auth_url '{}': {}", self.config.auth_url, e),
            })
        })?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", &self.config.scope_param())
                .append_pair("code_challenge", challenge)
                .append_pair("code_challenge_method", "S256")
                .append_pair("state", state)
                // Offline access plus forced consent so Google always issues
                // a refresh token, also when the account was authorized before.
                .append_pair("access_type", "offline")
                .append_pair("prompt", "consent");
            if let Some(hint) = hint {
                query.append_pair("login_hint", hint.as_str());
            }
        }
        Ok(url.into())
    }

    /// Accept loopback connections until the OAuth redirect arrives.
    ///
    /// Browsers fetch favicons and may retry; anything that is not the
    /// redirect gets a 404 and the loop keeps waiting.
    async fn wait_for_redirect(&self, listener: &TcpListener) -> Result<CallbackData> {
        loop {
            let (stream, addr) = listener.accept().await.map_err(|e| {
                Error::Auth(AuthError::ConsentDenied {
                    reason: format!("loopback accept failed: {}", e),
                })
            })?;
            debug!(%addr, "Loopback connection");

            match handle_connection(stream).await {
                Ok(Connection::Redirect(callback)) => return Ok(callback),
                Ok(Connection::Denied(reason)) => {
                    return Err(Error::Auth(AuthError::ConsentDenied { reason }));
                }
                Ok(Connection::Unrelated) => continue,
                Err(err) => warn!(error = %err, "Ignoring malformed loopback request"),
            }
        }
    }
}

/// Read one HTTP request from the loopback socket and answer it.
async fn handle_connection(mut stream: TcpStream) -> std::io::Result<Connection> {
    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let Some(target) = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
    else {
        respond(&mut stream, "400 Bad Request", "").await?;
        return Ok(Connection::Unrelated);
    };

    let Ok(url) = Url::parse(&format!("http://localhost{}", target)) else {
        respond(&mut stream, "400 Bad Request", "").await?;
        return Ok(Connection::Unrelated);
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        respond(&mut stream, "200 OK", CONSENT_FAILED_PAGE).await?;
        return Ok(Connection::Denied(format!("authorization error: {}", error)));
    }

    match (code, state) {
        (Some(code), Some(state)) => {
            respond(&mut stream, "200 OK", CONSENT_DONE_PAGE).await?;
            Ok(Connection::Redirect(CallbackData { code, state }))
        }
        _ => {
            respond(&mut stream, "404 Not Found", "").await?;
            Ok(Connection::Unrelated)
        }
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Userinfo response; only the email is needed.
#[derive(Debug, Deserialize)]
struct UserinfoResponse {
    #[serde(default)]
    email: Option<String>,
}

#[async_trait]
impl ConsentFlow for LoopbackConsentFlow {
    #[instrument(skip(self), fields(hint = hint.map(|h| h.as_str())))]
    async fn obtain_consent(&self, hint: Option<&AccountId>) -> Result<CredentialRecord> {
        info!("Starting interactive consent flow");

        let listener = TcpListener::bind(("127.0.0.1", self.config.redirect_port))
            .await
            .map_err(|e| {
                Error::Auth(AuthError::ConsentDenied {
                    reason: format!("could not bind loopback port: {}", e),
                })
            })?;
        let port = listener
            .local_addr()
            .map_err(|e| {
                Error::Auth(AuthError::ConsentDenied {
                    reason: format!("loopback address unavailable: {}", e),
                })
            })?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{}", port);

        let pkce = generate_pkce();
        let state = generate_state();
        let auth_url = self.build_auth_url(&redirect_uri, &pkce.challenge, &state, hint)?;

        self.status.message("A browser window is required to continue.");
        self.status
            .message(format!("Open this URL to authorize access:\n  {}", auth_url));

        let callback = tokio::time::timeout(
            std::time::Duration::from_secs(CONSENT_TIMEOUT_SECS),
            self.wait_for_redirect(&listener),
        )
        .await
        .map_err(|_| {
            Error::Auth(AuthError::ConsentDenied {
                reason: "timed out waiting for browser authorization".to_string(),
            })
        })??;

        if callback.state != state {
            return Err(Error::Auth(AuthError::ConsentDenied {
                reason: "state mismatch on redirect".to_string(),
            }));
        }

        self.status.message("Authorization received, exchanging code...");
        let response = self
            .tokens
            .exchange_code(&callback.code, &pkce.verifier, &redirect_uri)
            .await?;

        let access_token = AccessToken::new(response.access_token.clone());
        let account = self.fetch_account_id(&access_token).await?;

        info!(account = %account, "Consent granted");

        Ok(CredentialRecord {
            account,
            expires_at: response.expires_at(),
            scopes: if response.scopes().is_empty() {
                self.config.scopes.clone()
            } else {
                response.scopes()
            },
            refresh_token: response.refresh_token.map(RefreshToken::new),
            access_token,
        })
    }
}

impl LoopbackConsentFlow {
    /// Resolve the freshly authorized account's email address.
    async fn fetch_account_id(&self, access_token: &AccessToken) -> Result<AccountId> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token.as_str())
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(Error::Auth(AuthError::ConsentDenied {
                reason: format!("userinfo lookup failed with {}", response.status()),
            }));
        }

        let userinfo = response
            .json::<UserinfoResponse>()
            .await
            .map_err(map_transport)?;

        let email = userinfo.email.ok_or_else(|| {
            Error::Auth(AuthError::ConsentDenied {
                reason: "provider returned no account email".to_string(),
            })
        })?;

        AccountId::new(email)
    }
}
