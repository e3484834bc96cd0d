//! OAuth2 client configuration.

use std::fmt;

/// Static OAuth2 client configuration.
///
/// Endpoint URLs are injectable so tests can point the flow at a mock
/// server; [`OAuthConfig::google`] fills in the production Google endpoints
/// and the Sheets/Drive scope set.
#[derive(Clone)]
pub struct OAuthConfig {
    /// OAuth client id from the provider console.
    pub client_id: String,
    /// OAuth client secret. Installed-app secrets are not confidential, but
    /// they are still kept out of Debug output.
    pub client_secret: String,
    /// Authorization endpoint.
    pub auth_url: String,
    /// Token exchange endpoint.
    pub token_url: String,
    /// Token revocation endpoint.
    pub revoke_url: String,
    /// Userinfo endpoint used to resolve the account's email address.
    pub userinfo_url: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
    /// Loopback redirect port. `0` binds an ephemeral port.
    pub redirect_port: u16,
}

impl OAuthConfig {
    /// Configuration for Google's OAuth2 endpoints with the Sheets/Drive
    /// scope set this tool needs.
    pub fn google(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            revoke_url: "https://oauth2.googleapis.com/revoke".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
            scopes: vec![
                "https://www.googleapis.com/auth/spreadsheets".to_string(),
                "https://www.googleapis.com/auth/drive.file".to_string(),
                "https://www.googleapis.com/auth/userinfo.email".to_string(),
            ],
            redirect_port: 8080,
        }
    }

    /// The scope list in the space-separated wire format.
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("scopes", &self.scopes)
            .field("redirect_port", &self.redirect_port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_defaults_cover_sheets_and_drive() {
        let config = OAuthConfig::google("id", "secret");
        assert!(config.scope_param().contains("spreadsheets"));
        assert!(config.scope_param().contains("drive.file"));
        assert!(config.auth_url.starts_with("https://accounts.google.com"));
    }

    #[test]
    fn debug_hides_client_secret() {
        let config = OAuthConfig::google("id", "super-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
    }
}
