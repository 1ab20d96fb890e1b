//! Error types for the Google Toolbox MCP Server
//!
//! Every tool handler returns `Result<_, ToolboxError>`; the dispatch layer
//! converts the error into a failure envelope. Faults from underlying crates
//! are classified here, at one seam, so raw errors never reach a caller.

use thiserror::Error;

/// Main error type for the Google Toolbox MCP Server
#[derive(Error, Debug)]
pub enum ToolboxError {
    /// Credential acquisition or refresh failures
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Tool name not present in the registry
    #[error("unknown tool: {name}")]
    ToolNotFound { name: String },

    /// Argument missing, malformed, or of the wrong type
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The provider rejected the request; status and body verbatim
    #[error("external service error ({status}): {body}")]
    ExternalService { status: u16, body: String },

    /// The provider reported a missing entity
    #[error("{message}")]
    NotFound { message: String },

    /// Service name not known to the client factory
    #[error("unknown service: {name}")]
    UnknownService { name: String },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unexpected fault caught at the handler boundary
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ToolboxError {
    /// Stable kind tag carried in failure envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolboxError::Auth(_) => "auth",
            ToolboxError::ToolNotFound { .. } => "tool_not_found",
            ToolboxError::InvalidArgument { .. } => "invalid_argument",
            ToolboxError::ExternalService { .. } => "external_service",
            ToolboxError::NotFound { .. } => "not_found",
            ToolboxError::UnknownService { .. } => "unknown_service",
            ToolboxError::Config(_) => "config",
            ToolboxError::Internal { .. } => "internal",
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ToolboxError::Internal {
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ToolboxError::InvalidArgument {
            message: message.into(),
        }
    }
}

/// Credential store errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("no valid credentials; set GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REFRESH_TOKEN or run the auth flow")]
    NoValidCredentials,

    #[error("failed to refresh access token: {message}")]
    RefreshFailed { message: String },

    #[error("token exchange failed: {message}")]
    ExchangeFailed { message: String },

    #[error("OAuth callback error: {message}")]
    CallbackError { message: String },

    #[error("no authorization code received")]
    NoAuthCode,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {var}")]
    MissingEnvVar { var: String },

    #[error("failed to create directory: {path}")]
    DirCreationFailed { path: String },
}

/// Result type alias for toolbox operations
pub type Result<T> = std::result::Result<T, ToolboxError>;

/// Transport and HTTP-level faults become external service errors; a response
/// that carried an error status keeps it, pure transport failures carry 0.
impl From<reqwest::Error> for ToolboxError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
        ToolboxError::ExternalService {
            status,
            body: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ToolboxError {
    fn from(err: serde_json::Error) -> Self {
        ToolboxError::Internal {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<std::io::Error> for ToolboxError {
    fn from(err: std::io::Error) -> Self {
        ToolboxError::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
