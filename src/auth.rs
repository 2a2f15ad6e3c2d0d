// OAuth for an installed app: read the client secrets, reuse a stored token,
// refresh it when it has expired, or walk the user through the consent page
// and exchange the code they paste back.

use crate::api::send;
use crate::config::Config;
use crate::error::{Error, Result};
use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

pub const SCOPES: [&str; 5] = [
    "https://www.googleapis.com/auth/classroom.courses.readonly",
    "https://www.googleapis.com/auth/classroom.coursework.me",
    "https://www.googleapis.com/auth/classroom.courseworkmaterials.readonly",
    "https://www.googleapis.com/auth/classroom.announcements.readonly",
    "https://www.googleapis.com/auth/drive",
];

/// Tokens this close to their expiry are refreshed up front.
const EXPIRY_SLACK_MS: i64 = 60_000;

#[derive(Deserialize, Debug, Clone)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(alias = "web")]
    installed: ClientSecrets,
}

/// Token as kept on disk between runs. `expiry_date` is in epoch millis.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String {
    "Bearer".into()
}

impl StoredToken {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        match self.expiry_date {
            Some(expiry) => expiry <= now_ms + EXPIRY_SLACK_MS,
            None => false,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default = "bearer")]
    token_type: String,
}

impl TokenResponse {
    fn into_stored(self, previous_refresh: Option<String>, now_ms: i64) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expiry_date: self.expires_in.map(|secs| now_ms + secs * 1000),
            scope: self.scope,
            token_type: self.token_type,
        }
    }
}

pub fn load_credentials(path: &Path) -> Result<ClientSecrets> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        Error::Auth(format!(
            "cannot read OAuth client credentials at {}: {e}",
            path.display()
        ))
    })?;
    let file: CredentialsFile = serde_json::from_str(&data)?;
    Ok(file.installed)
}

/// Load a stored token. A missing file is not an error, it just means the
/// user has not authorized this client yet.
pub fn load_token(path: &Path) -> Result<Option<StoredToken>> {
    match std::fs::read_to_string(path) {
        Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn persist_token(path: &Path, token: &StoredToken) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, serde_json::to_vec(token)?)?;
    info!(path = %path.display(), "token stored");
    Ok(())
}

/// Consent page the user has to visit to authorize this client.
pub fn authorization_url(secrets: &ClientSecrets) -> Result<String> {
    let redirect = redirect_uri(secrets)?;
    let scope = SCOPES.join(" ");
    let url = Url::parse_with_params(
        AUTH_URL,
        &[
            ("access_type", "offline"),
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect),
            ("scope", scope.as_str()),
        ],
    )
    .map_err(|e| Error::Auth(format!("cannot build consent URL: {e}")))?;
    Ok(url.into())
}

fn redirect_uri(secrets: &ClientSecrets) -> Result<&str> {
    secrets
        .redirect_uris
        .first()
        .map(String::as_str)
        .ok_or_else(|| Error::Auth("client credentials list no redirect URI".into()))
}

/// Talks to the OAuth token endpoint.
pub struct OAuthClient {
    client: Client,
    token_url: String,
    secrets: ClientSecrets,
}

impl OAuthClient {
    pub fn new(oauth_url: &str, secrets: ClientSecrets) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::remote("build HTTP client", e))?;
        Ok(OAuthClient {
            client,
            token_url: format!("{}/token", oauth_url.trim_end_matches('/')),
            secrets,
        })
    }

    pub fn secrets(&self) -> &ClientSecrets {
        &self.secrets
    }

    /// Trade the code from the consent page for a token.
    pub fn exchange_code(&self, code: &str) -> Result<StoredToken> {
        let redirect = redirect_uri(&self.secrets)?;
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code.trim()),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
            ("redirect_uri", redirect),
        ];
        let token = self.request_token("exchange authorization code", &params)?;
        Ok(token.into_stored(None, Utc::now().timestamp_millis()))
    }

    pub fn refresh(&self, token: &StoredToken) -> Result<StoredToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| Error::Auth("token expired and cannot be refreshed".into()))?;
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
        ];
        let fresh = self.request_token("refresh token", &params)?;
        Ok(fresh.into_stored(token.refresh_token.clone(), Utc::now().timestamp_millis()))
    }

    fn request_token(&self, operation: &str, params: &[(&str, &str)]) -> Result<TokenResponse> {
        debug!(url = %self.token_url, operation, "POST");
        let res = send(operation, self.client.post(&self.token_url).form(params))
            .map_err(into_auth_error)?;
        res.json()
            .map_err(|e| Error::Auth(format!("{operation}: unexpected response: {e}")))
    }
}

// The token endpoint answers 400 for a bad code or a revoked refresh token.
fn into_auth_error(err: Error) -> Error {
    match err {
        Error::RemoteFetch { operation, message } => {
            Error::Auth(format!("{operation} failed: {message}"))
        }
        other => other,
    }
}

/// Produce a usable access token: the stored one if still valid, a refreshed
/// one if it expired, or a new one from the consent flow. `ask_code` shows
/// the consent URL and returns the code the user pastes back.
pub fn ensure_token(
    config: &Config,
    ask_code: impl FnOnce(&str) -> Result<String>,
) -> Result<StoredToken> {
    let stored = load_token(&config.token)?;
    let now = Utc::now().timestamp_millis();

    if let Some(token) = &stored {
        if !token.is_expired(now) {
            debug!("using stored token");
            return Ok(token.clone());
        }
    }

    let oauth = OAuthClient::new(&config.oauth_url, load_credentials(&config.credentials)?)?;
    let token = match stored {
        Some(token) if token.refresh_token.is_some() => {
            info!("stored token expired, refreshing");
            oauth.refresh(&token)?
        }
        _ => {
            let url = authorization_url(oauth.secrets())?;
            let code = ask_code(&url)?;
            oauth.exchange_code(&code)?
        }
    };
    persist_token(&config.token, &token)?;
    Ok(token)
}
