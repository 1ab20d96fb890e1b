//! Configuration management for the Google Toolbox MCP Server
//!
//! All settings come from the environment (optionally via a `.env` file
//! loaded in `main`) and are read once at startup; the resulting `Config` is
//! passed by reference, never consulted as a global.

use std::path::PathBuf;

use crate::error::{ConfigError, Result, ToolboxError};

/// Configuration for the Google Toolbox MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the persisted token record
    pub token_path: PathBuf,

    /// OAuth client id (bootstrap secret)
    pub client_id: Option<String>,

    /// OAuth client secret (bootstrap secret)
    pub client_secret: Option<String>,

    /// Long-lived refresh token (bootstrap secret)
    pub refresh_token: Option<String>,

    /// Custom Search API key
    pub api_key: Option<String>,

    /// Custom Search engine id
    pub cse_id: Option<String>,

    /// OAuth scopes requested for every credential
    pub scopes: Vec<String>,

    /// Port for the local OAuth callback listener
    pub oauth_callback_port: u16,

    /// Time zone applied to calendar event start/end times
    pub time_zone: String,

    /// Log level when RUST_LOG is not set
    pub log_level: String,

    /// Whether to log to a rolling file in addition to stderr
    pub log_to_file: bool,

    /// Directory for log files
    pub log_dir: PathBuf,
}

impl Config {
    /// Build configuration from the environment
    pub fn new() -> Result<Self> {
        let config_dir = Self::config_dir()?;

        let token_path = env_var("GOOGLE_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join("token.json"));

        let oauth_callback_port = env_var("GOOGLE_OAUTH_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let log_dir = env_var("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join("logs"));

        Ok(Self {
            token_path,
            client_id: env_var("GOOGLE_CLIENT_ID"),
            client_secret: env_var("GOOGLE_CLIENT_SECRET"),
            refresh_token: env_var("GOOGLE_REFRESH_TOKEN"),
            api_key: env_var("GOOGLE_API_KEY"),
            cse_id: env_var("GOOGLE_CSE_ID"),
            scopes: default_scopes(),
            oauth_callback_port,
            time_zone: env_var("CALENDAR_TIME_ZONE").unwrap_or_else(|| "UTC".to_string()),
            log_level: env_var("LOG_LEVEL")
                .map(|l| l.to_lowercase())
                .unwrap_or_else(|| "info".to_string()),
            log_to_file: env_var("LOG_TO_FILE")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            log_dir,
        })
    }

    /// Resolve the configuration directory, creating it if necessary
    fn config_dir() -> Result<PathBuf> {
        let dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".google-toolbox-mcp");

        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|_| {
                ToolboxError::Config(ConfigError::DirCreationFailed {
                    path: dir.display().to_string(),
                })
            })?;
        }

        Ok(dir)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn default_scopes() -> Vec<String> {
    [
        "https://www.googleapis.com/auth/gmail.readonly",
        "https://www.googleapis.com/auth/gmail.send",
        "https://www.googleapis.com/auth/gmail.modify",
        "https://www.googleapis.com/auth/calendar",
        "https://www.googleapis.com/auth/drive.file",
        "https://www.googleapis.com/auth/drive.readonly",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Google API endpoints and fixed identifiers
pub mod endpoints {
    /// Base URL for the Gmail API
    pub const GMAIL_API: &str = "https://gmail.googleapis.com/gmail/v1";

    /// Base URL for the Calendar API
    pub const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

    /// Base URL for the Drive API
    pub const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";

    /// Custom Search endpoint
    pub const CUSTOM_SEARCH_API: &str = "https://customsearch.googleapis.com/customsearch/v1";

    /// OAuth token endpoint
    pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

    /// OAuth consent endpoint
    pub const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

    /// Mailbox of the authenticated principal
    pub const USER_ID: &str = "me";

    /// Calendar of the authenticated principal
    pub const CALENDAR_ID: &str = "primary";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = Config::new();
        assert!(config.is_ok());
    }

    #[test]
    fn test_default_scopes() {
        let config = Config::new().unwrap();
        assert_eq!(config.scopes.len(), 6);
        assert!(config.scopes.iter().any(|s| s.contains("gmail.send")));
        assert!(config.scopes.iter().any(|s| s.contains("calendar")));
    }

}
