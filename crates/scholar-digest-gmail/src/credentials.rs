use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::GmailError;
use crate::flow;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// OAuth client registration, as downloaded from the Google Cloud console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parse a console download, which nests the client under `installed`
    /// (desktop apps) or `web`.
    pub fn from_json(json: &str) -> Result<Self, GmailError> {
        let file: ClientSecretsFile = serde_json::from_str(json)?;
        file.installed.or(file.web).ok_or_else(|| {
            GmailError::InvalidClientSecrets("expected an \"installed\" or \"web\" client".into())
        })
    }

    pub fn load(path: &Path) -> Result<Self, GmailError> {
        let json = std::fs::read_to_string(path).map_err(|source| GmailError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// A persisted OAuth token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

impl OAuthToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_SKEW_SECS) > now
    }
}

/// Body of a token endpoint response (code exchange or refresh).
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
    token_type: Option<String>,
}

impl TokenResponse {
    /// Refresh responses omit the refresh token; the previous one stays valid.
    pub(crate) fn into_token(self, now: DateTime<Utc>, previous_refresh: Option<String>) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: now + Duration::seconds(self.expires_in.unwrap_or(3600)),
            scope: self.scope,
            token_type: self.token_type.unwrap_or_else(default_token_type),
        }
    }
}

/// POST a form to the token endpoint and parse the response.
pub(crate) async fn request_token(
    client: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, GmailError> {
    let resp = client.post(token_uri).form(form).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GmailError::TokenEndpoint {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json().await?)
}

/// Read a stored token. A missing file is `Ok(None)`; an unreadable or
/// unparseable one is logged and also treated as absent.
pub fn load_token(path: &Path) -> Result<Option<OAuthToken>, GmailError> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(GmailError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    match serde_json::from_str(&json) {
        Ok(token) => Ok(Some(token)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable token file");
            Ok(None)
        }
    }
}

pub fn save_token(path: &Path, token: &OAuthToken) -> Result<(), GmailError> {
    let json = serde_json::to_string_pretty(token)?;
    std::fs::write(path, json).map_err(|source| GmailError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// An authorized Gmail credential bound to its on-disk token file.
#[derive(Debug, Clone)]
pub struct Credential {
    secrets: ClientSecrets,
    token: OAuthToken,
    token_path: PathBuf,
}

impl Credential {
    /// Obtain a usable credential.
    ///
    /// A stored, unexpired token is used as is. An expired token with a
    /// refresh token is refreshed. Otherwise the interactive consent flow
    /// runs; `prompt` receives the consent URL to show the user. Any new
    /// token is persisted to `token_path` before returning.
    pub async fn acquire(
        client: &reqwest::Client,
        secrets: ClientSecrets,
        token_path: &Path,
        prompt: impl Fn(&str),
    ) -> Result<Self, GmailError> {
        let stored = load_token(token_path)?;
        let mut credential = match stored {
            Some(token) if token.is_valid_at(Utc::now()) => {
                tracing::debug!(path = %token_path.display(), "using stored token");
                return Ok(Self {
                    secrets,
                    token,
                    token_path: token_path.to_path_buf(),
                });
            }
            Some(token) if token.refresh_token.is_some() => {
                let mut credential = Self {
                    secrets,
                    token,
                    token_path: token_path.to_path_buf(),
                };
                credential.refresh(client).await?;
                credential
            }
            _ => {
                let token = flow::run_consent_flow(client, &secrets, prompt).await?;
                Self {
                    secrets,
                    token,
                    token_path: token_path.to_path_buf(),
                }
            }
        };
        credential.persist()?;
        Ok(credential)
    }

    /// Exchange the refresh token for a new access token.
    pub async fn refresh(&mut self, client: &reqwest::Client) -> Result<(), GmailError> {
        let Some(refresh_token) = self.token.refresh_token.clone() else {
            return Err(GmailError::Consent("no refresh token stored".into()));
        };
        tracing::info!("refreshing Gmail access token");
        let resp = request_token(
            client,
            &self.secrets.token_uri,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.secrets.client_id.as_str()),
                ("client_secret", self.secrets.client_secret.as_str()),
            ],
        )
        .await?;
        self.token = resp.into_token(Utc::now(), Some(refresh_token));
        Ok(())
    }

    pub fn persist(&self) -> Result<(), GmailError> {
        save_token(&self.token_path, &self.token)
    }

    pub fn access_token(&self) -> &str {
        &self.token.access_token
    }

    pub fn token(&self) -> &OAuthToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_secrets_installed() {
        let json = r#"{"installed":{"client_id":"id.apps.googleusercontent.com","project_id":"p","auth_uri":"https://accounts.google.com/o/oauth2/auth","token_uri":"https://oauth2.googleapis.com/token","client_secret":"shh","redirect_uris":["http://localhost"]}}"#;
        let secrets = ClientSecrets::from_json(json).unwrap();
        assert_eq!(secrets.client_id, "id.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret, "shh");
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_client_secrets_web_with_defaults() {
        let json = r#"{"web":{"client_id":"w","client_secret":"s"}}"#;
        let secrets = ClientSecrets::from_json(json).unwrap();
        assert_eq!(secrets.auth_uri, DEFAULT_AUTH_URI);
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_client_secrets_wrong_shape() {
        let err = ClientSecrets::from_json(r#"{"other":{}}"#).unwrap_err();
        assert!(matches!(err, GmailError::InvalidClientSecrets(_)));
    }

    #[test]
    fn test_token_validity_uses_skew() {
        let now = Utc::now();
        let token = OAuthToken {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: now + Duration::seconds(30),
            scope: None,
            token_type: "Bearer".into(),
        };
        assert!(!token.is_valid_at(now));
        let later = OAuthToken {
            expires_at: now + Duration::seconds(600),
            ..token
        };
        assert!(later.is_valid_at(now));
    }

    #[test]
    fn test_refresh_response_keeps_previous_refresh_token() {
        let now = Utc::now();
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"new","expires_in":3599,"token_type":"Bearer"}"#)
                .unwrap();
        let token = resp.into_token(now, Some("old-refresh".into()));
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(token.expires_at, now + Duration::seconds(3599));
    }

    #[test]
    fn test_token_file_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_token(&dir.path().join("token.json")).unwrap(), None);
    }

    #[test]
    fn test_token_file_garbage_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(load_token(&path).unwrap(), None);
    }

    #[test]
    fn test_token_file_saved_and_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let token = OAuthToken {
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            expires_at: DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            scope: Some(crate::GMAIL_READONLY_SCOPE.into()),
            token_type: "Bearer".into(),
        };
        save_token(&path, &token).unwrap();
        assert_eq!(load_token(&path).unwrap(), Some(token));
    }
}
