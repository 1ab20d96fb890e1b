//! Credential store for Google APIs
//!
//! Owns the persisted token record and the in-memory credential. Every tool
//! invocation calls [`CredentialStore::acquire`], which loads, validates,
//! refreshes, and persists the record as needed. Acquisition order:
//!
//! 1. load the persisted token record, if present and parseable
//! 2. return it unchanged while the access token is unexpired
//! 3. refresh against the token endpoint when the record carries a refresh
//!    token and client credentials, persisting the refreshed record
//! 4. otherwise assemble a fresh record from bootstrap secrets supplied via
//!    the environment and refresh that
//! 5. otherwise fail with `NoValidCredentials`
//!
//! The whole check-refresh-persist sequence runs under one lock so two
//! concurrent invocations never race overlapping refreshes; callers get an
//! owned clone and never hold the lock across their own service calls.

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::{endpoints, Config};
use crate::error::{AuthError, Result, ToolboxError};

/// Seconds before nominal expiry at which a token is treated as expired
const EXPIRY_SKEW_SECS: i64 = 60;

/// The OAuth token bundle for the single authenticated principal.
///
/// Serialized verbatim as the persisted token file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Short-lived bearer token; absent until the first refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Long-lived refresh token
    pub refresh_token: String,

    /// OAuth client id
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Token endpoint used for refresh
    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    /// Scopes granted to this credential
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Access token expiry (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
}

fn default_token_uri() -> String {
    endpoints::TOKEN_URI.to_string()
}

impl CredentialRecord {
    /// Whether the access token can be used as-is at `now`
    pub fn is_valid(&self, now: i64) -> bool {
        match &self.access_token {
            Some(token) if !token.is_empty() => self
                .expiry
                .map(|expiry| expiry - now > EXPIRY_SKEW_SECS)
                .unwrap_or(true),
            _ => false,
        }
    }

    /// Whether the record carries everything a refresh call needs
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
            && !self.client_id.is_empty()
            && !self.client_secret.is_empty()
    }

    /// Bearer token for request authorization
    pub fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or("")
    }
}

/// Token endpoint response (refresh and authorization-code grants)
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// Credential store: token file plus in-memory record
pub struct CredentialStore {
    token_path: PathBuf,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    scopes: Vec<String>,
    oauth_callback_port: u16,
    http: reqwest::Client,
    record: Mutex<Option<CredentialRecord>>,
}

impl CredentialStore {
    /// Create a store from configuration
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            token_path: config.token_path.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            scopes: config.scopes.clone(),
            oauth_callback_port: config.oauth_callback_port,
            http,
            record: Mutex::new(None),
        }
    }

    /// Acquire a usable credential, refreshing and persisting when required.
    ///
    /// Cheap when the in-memory record is still valid: no file or network I/O.
    pub async fn acquire(&self) -> std::result::Result<CredentialRecord, AuthError> {
        let mut slot = self.record.lock().await;

        if slot.is_none() {
            *slot = self.load_record();
        }

        let now = Utc::now().timestamp();
        if let Some(record) = slot.as_ref() {
            if record.is_valid(now) {
                return Ok(record.clone());
            }
        }

        if let Some(record) = slot.as_mut() {
            if record.can_refresh() {
                return match self.refresh(record).await {
                    Ok(()) => {
                        self.persist(record).await;
                        tracing::info!("refreshed Google credentials");
                        Ok(record.clone())
                    }
                    Err(err) => {
                        tracing::error!("token refresh failed: {}", err);
                        Err(AuthError::NoValidCredentials)
                    }
                };
            }
        }

        match self.bootstrap_record() {
            Some(mut record) => match self.refresh(&mut record).await {
                Ok(()) => {
                    self.persist(&record).await;
                    tracing::info!("obtained Google credentials from bootstrap refresh token");
                    let fresh = record.clone();
                    *slot = Some(record);
                    Ok(fresh)
                }
                Err(err) => {
                    tracing::error!("bootstrap token refresh failed: {}", err);
                    Err(AuthError::NoValidCredentials)
                }
            },
            None => Err(AuthError::NoValidCredentials),
        }
    }

    /// Load the persisted record; an unreadable or unparseable file counts
    /// as absent so acquisition falls through to refresh or bootstrap.
    fn load_record(&self) -> Option<CredentialRecord> {
        if !self.token_path.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(&self.token_path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("failed to read token file: {}", err);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!("token file did not parse, ignoring it: {}", err);
                None
            }
        }
    }

    /// Persist the record. A failed write is logged and tolerated; the next
    /// acquisition simply refreshes again.
    async fn persist(&self, record: &CredentialRecord) {
        let content = match serde_json::to_string_pretty(record) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("failed to serialize token record: {}", err);
                return;
            }
        };
        if let Err(err) = tokio::fs::write(&self.token_path, content).await {
            tracing::warn!(
                "failed to persist token record to {}: {}",
                self.token_path.display(),
                err
            );
        }
    }

    /// Record assembled from environment-supplied bootstrap secrets
    fn bootstrap_record(&self) -> Option<CredentialRecord> {
        match (&self.client_id, &self.client_secret, &self.refresh_token) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                Some(CredentialRecord {
                    access_token: None,
                    refresh_token: refresh_token.clone(),
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    token_uri: endpoints::TOKEN_URI.to_string(),
                    scopes: self.scopes.clone(),
                    expiry: None,
                })
            }
            _ => None,
        }
    }

    /// Exchange the refresh token for a new access token, updating the
    /// record in place.
    async fn refresh(&self, record: &mut CredentialRecord) -> std::result::Result<(), AuthError> {
        let params = [
            ("client_id", record.client_id.as_str()),
            ("client_secret", record.client_secret.as_str()),
            ("refresh_token", record.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&record.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshFailed { message });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| AuthError::RefreshFailed {
                    message: e.to_string(),
                })?;

        let now = Utc::now().timestamp();
        record.access_token = Some(token.access_token);
        record.expiry = token.expires_in.map(|secs| now + secs);
        if let Some(refresh_token) = token.refresh_token {
            record.refresh_token = refresh_token;
        }

        Ok(())
    }

    /// Run the interactive bootstrap flow: open the consent page, catch the
    /// redirect on a local listener, exchange the code, persist the record,
    /// and print the refresh token for `.env` use.
    pub async fn authenticate_interactive(&self) -> Result<()> {
        use axum::{extract::Query, response::Html, routing::get, Router};
        use std::collections::HashMap;
        use std::sync::Arc;
        use tokio::sync::oneshot;

        let client_id = self.require_secret(&self.client_id, "GOOGLE_CLIENT_ID")?;
        let client_secret = self.require_secret(&self.client_secret, "GOOGLE_CLIENT_SECRET")?;

        let redirect_uri = format!(
            "http://localhost:{}/oauth2callback",
            self.oauth_callback_port
        );
        let scopes = self.scopes.join(" ");
        let auth_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            endpoints::AUTH_URI,
            urlencoding::encode(&client_id),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(&scopes)
        );

        eprintln!("\nPlease visit this URL to authorize access:");
        eprintln!("{}\n", auth_url);
        if let Err(err) = open::that(&auth_url) {
            eprintln!("Could not open browser automatically: {}", err);
            eprintln!("Please open the URL manually.");
        }

        let (tx, rx) = oneshot::channel::<String>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        let tx_clone = tx.clone();
        let callback = move |Query(params): Query<HashMap<String, String>>| async move {
            if let Some(code) = params.get("code") {
                if let Ok(mut guard) = tx_clone.lock() {
                    if let Some(tx) = guard.take() {
                        let _ = tx.send(code.clone());
                    }
                }
                Html("<html><body><h1>Authorization complete</h1><p>You can close this window.</p></body></html>")
            } else {
                Html("<html><body><h1>Authorization failed</h1><p>No authorization code received.</p></body></html>")
            }
        };

        let app = Router::new().route("/oauth2callback", get(callback));
        let addr = std::net::SocketAddr::from(([127, 0, 0, 1], self.oauth_callback_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        eprintln!(
            "Waiting for authorization callback on port {}...",
            self.oauth_callback_port
        );

        let server = axum::serve(listener, app);

        let code = tokio::select! {
            result = server => {
                let message = match result {
                    Ok(()) => "callback server stopped early".to_string(),
                    Err(err) => err.to_string(),
                };
                return Err(ToolboxError::Auth(AuthError::CallbackError { message }));
            }
            code = rx => code.map_err(|_| ToolboxError::Auth(AuthError::NoAuthCode))?,
        };

        eprintln!("Received authorization code, exchanging for tokens...");
        let record = self
            .exchange_code(&client_id, &client_secret, &code, &redirect_uri)
            .await?;

        let content = serde_json::to_string_pretty(&record)?;
        tokio::fs::write(&self.token_path, content).await?;
        *self.record.lock().await = Some(record.clone());

        eprintln!("Credentials saved to {}", self.token_path.display());
        eprintln!("\nRefresh token (for GOOGLE_REFRESH_TOKEN in .env):");
        eprintln!("{}", record.refresh_token);

        Ok(())
    }

    /// Exchange an authorization code for a full credential record
    async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<CredentialRecord> {
        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http
            .post(endpoints::TOKEN_URI)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ToolboxError::Auth(AuthError::ExchangeFailed {
                    message: e.to_string(),
                })
            })?;

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ToolboxError::Auth(AuthError::ExchangeFailed { message }));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ToolboxError::Auth(AuthError::ExchangeFailed {
                message: e.to_string(),
            })
        })?;

        let refresh_token = token.refresh_token.ok_or_else(|| {
            ToolboxError::Auth(AuthError::ExchangeFailed {
                message: "response carried no refresh token; revoke access for this app and retry"
                    .to_string(),
            })
        })?;

        let now = Utc::now().timestamp();
        Ok(CredentialRecord {
            access_token: Some(token.access_token),
            refresh_token,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_uri: endpoints::TOKEN_URI.to_string(),
            scopes: self.scopes.clone(),
            expiry: token.expires_in.map(|secs| now + secs),
        })
    }

    fn require_secret(&self, value: &Option<String>, var: &str) -> Result<String> {
        value.clone().ok_or_else(|| {
            ToolboxError::Config(crate::error::ConfigError::MissingEnvVar {
                var: var.to_string(),
            })
        })
    }
}
