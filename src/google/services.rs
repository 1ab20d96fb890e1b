//! Service client factory
//!
//! Maps a logical service name plus a credential onto a typed client handle.
//! Construction is pure; the handles borrow the shared HTTP client and carry
//! the bearer token for their requests. Binding an unrecognized name is a
//! programming error and fails fast with `UnknownService`.

use serde::de::DeserializeOwned;

use crate::error::{Result, ToolboxError};
use crate::google::auth::CredentialRecord;
use crate::google::calendar::CalendarService;
use crate::google::drive::DriveService;
use crate::google::mail::MailService;
use crate::google::search::SearchService;

/// Logical external services this server talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Mail,
    Calendar,
    Drive,
    Search,
}

impl ServiceKind {
    /// Resolve a service name; unknown names are rejected
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "mail" => Ok(ServiceKind::Mail),
            "calendar" => Ok(ServiceKind::Calendar),
            "drive" => Ok(ServiceKind::Drive),
            "search" => Ok(ServiceKind::Search),
            _ => Err(ToolboxError::UnknownService {
                name: name.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::Mail => "mail",
            ServiceKind::Calendar => "calendar",
            ServiceKind::Drive => "drive",
            ServiceKind::Search => "search",
        }
    }
}

/// Factory producing bound service handles
pub struct ServiceFactory {
    http: reqwest::Client,
    api_key: Option<String>,
    cse_id: Option<String>,
}

impl ServiceFactory {
    pub fn new(http: reqwest::Client, api_key: Option<String>, cse_id: Option<String>) -> Self {
        Self {
            http,
            api_key,
            cse_id,
        }
    }

    /// Bind a service by name, scoped to the given credential
    pub fn bind<'a>(
        &'a self,
        name: &str,
        credentials: &'a CredentialRecord,
    ) -> Result<ServiceHandle<'a>> {
        let handle = match ServiceKind::from_name(name)? {
            ServiceKind::Mail => {
                ServiceHandle::Mail(MailService::new(&self.http, credentials.bearer()))
            }
            ServiceKind::Calendar => {
                ServiceHandle::Calendar(CalendarService::new(&self.http, credentials.bearer()))
            }
            ServiceKind::Drive => {
                ServiceHandle::Drive(DriveService::new(&self.http, credentials.bearer()))
            }
            ServiceKind::Search => ServiceHandle::Search(self.search()?),
        };
        Ok(handle)
    }

    /// The keyed web-search client; does not need OAuth credentials
    pub fn search(&self) -> Result<SearchService<'_>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ToolboxError::Config(crate::error::ConfigError::MissingEnvVar {
                var: "GOOGLE_API_KEY".to_string(),
            })
        })?;
        let cse_id = self.cse_id.as_deref().ok_or_else(|| {
            ToolboxError::Config(crate::error::ConfigError::MissingEnvVar {
                var: "GOOGLE_CSE_ID".to_string(),
            })
        })?;
        Ok(SearchService::new(&self.http, api_key, cse_id))
    }
}

/// A client handle bound to one service
pub enum ServiceHandle<'a> {
    Mail(MailService<'a>),
    Calendar(CalendarService<'a>),
    Drive(DriveService<'a>),
    Search(SearchService<'a>),
}

impl<'a> ServiceHandle<'a> {
    pub fn kind(&self) -> ServiceKind {
        match self {
            ServiceHandle::Mail(_) => ServiceKind::Mail,
            ServiceHandle::Calendar(_) => ServiceKind::Calendar,
            ServiceHandle::Drive(_) => ServiceKind::Drive,
            ServiceHandle::Search(_) => ServiceKind::Search,
        }
    }

    pub fn into_mail(self) -> Result<MailService<'a>> {
        match self {
            ServiceHandle::Mail(service) => Ok(service),
            other => Err(bound_wrong_kind(other.kind(), ServiceKind::Mail)),
        }
    }

    pub fn into_calendar(self) -> Result<CalendarService<'a>> {
        match self {
            ServiceHandle::Calendar(service) => Ok(service),
            other => Err(bound_wrong_kind(other.kind(), ServiceKind::Calendar)),
        }
    }

    pub fn into_drive(self) -> Result<DriveService<'a>> {
        match self {
            ServiceHandle::Drive(service) => Ok(service),
            other => Err(bound_wrong_kind(other.kind(), ServiceKind::Drive)),
        }
    }

    pub fn into_search(self) -> Result<SearchService<'a>> {
        match self {
            ServiceHandle::Search(service) => Ok(service),
            other => Err(bound_wrong_kind(other.kind(), ServiceKind::Search)),
        }
    }
}

fn bound_wrong_kind(bound: ServiceKind, wanted: ServiceKind) -> ToolboxError {
    ToolboxError::internal(format!(
        "bound {} service where {} was expected",
        bound.name(),
        wanted.name()
    ))
}

/// Check a provider response status, mapping 404 to `NotFound` for the named
/// entity and any other failure status to `ExternalService` with the body
/// verbatim.
pub(crate) async fn check_status(response: reqwest::Response, entity: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status.as_u16() == 404 {
        Err(ToolboxError::NotFound {
            message: format!("{} not found", entity),
        })
    } else {
        Err(ToolboxError::ExternalService {
            status: status.as_u16(),
            body,
        })
    }
}

/// Decode a checked response body as JSON
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    entity: &str,
) -> Result<T> {
    let response = check_status(response, entity).await?;
    response.json().await.map_err(|e| {
        ToolboxError::internal(format!("failed to decode {} response: {}", entity, e))
    })
}
