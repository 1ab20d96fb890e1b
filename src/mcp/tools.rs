//! Tool handlers
//!
//! One handler per registered tool. Every handler follows the same shape:
//! validate what can be validated without I/O, acquire credentials, bind the
//! service it needs, call out, and shape the provider response into the
//! result payload. All faults are classified `ToolboxError`s; the dispatch
//! seam converts them into failure envelopes.

use std::sync::Arc;

use base64::Engine;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Result, ToolboxError};
use crate::google::auth::{CredentialRecord, CredentialStore};
use crate::google::calendar::{apply_patch, Attendee, Event, EventPatch, EventTime};
use crate::google::drive::{
    build_search_query, clamp_page_size, export_mime_type, is_text_mime, NATIVE_DOC_PREFIX,
};
use crate::google::mail::{
    build_rfc822, extract_plain_text, find_header, OutgoingEmail, BODY_EMPTY,
};
use crate::google::services::ServiceFactory;
use crate::mcp::registry;
use crate::mcp::types::{CallToolResult, Tool};

/// What a successful handler hands back to the dispatch layer
pub enum ToolOutput {
    /// A plain diagnostic string
    Text(String),
    /// A structured payload, serialized into the envelope as pretty JSON
    Json(Value),
}

impl ToolOutput {
    fn into_envelope(self) -> CallToolResult {
        match self {
            ToolOutput::Text(text) => CallToolResult::text(text),
            ToolOutput::Json(value) => match serde_json::to_string_pretty(&value) {
                Ok(text) => CallToolResult::text(text),
                Err(err) => CallToolResult::failure(
                    "internal",
                    format!("failed to serialize payload: {}", err),
                ),
            },
        }
    }
}

/// Tool handler: owns the credential store and service factory
pub struct ToolHandler {
    credentials: Arc<CredentialStore>,
    services: ServiceFactory,
    time_zone: String,
}

impl ToolHandler {
    pub fn new(
        credentials: Arc<CredentialStore>,
        services: ServiceFactory,
        time_zone: String,
    ) -> Self {
        Self {
            credentials,
            services,
            time_zone,
        }
    }

    /// All registered tools with their advertised schemas
    pub fn list_tools(&self) -> Vec<Tool> {
        registry::TOOLS
            .iter()
            .map(|spec| Tool {
                name: spec.name.to_string(),
                description: spec.description.to_string(),
                input_schema: registry::input_schema(spec),
            })
            .collect()
    }

    /// Dispatch one tool call and wrap the outcome in the response envelope
    pub async fn call_tool(&self, name: &str, arguments: Value) -> CallToolResult {
        match self.dispatch(name, arguments).await {
            Ok(output) => output.into_envelope(),
            Err(err) => {
                tracing::error!("tool '{}' failed: {}", name, err);
                CallToolResult::failure(err.kind(), err.to_string())
            }
        }
    }

    async fn dispatch(&self, name: &str, arguments: Value) -> Result<ToolOutput> {
        let spec = registry::find(name).ok_or_else(|| ToolboxError::ToolNotFound {
            name: name.to_string(),
        })?;

        let args = Value::Object(registry::coerce_arguments(spec, arguments)?);

        match spec.name {
            "list_emails" => self.list_emails(args).await,
            "search_emails" => self.search_emails(args).await,
            "send_email" => self.send_email(args).await,
            "modify_email" => self.modify_email(args).await,
            "list_events" => self.list_events(args).await,
            "create_event" => self.create_event(args).await,
            "update_event" => self.update_event(args).await,
            "delete_event" => self.delete_event(args).await,
            "search_google" => self.search_google(args).await,
            "read_gdrive_file" => self.read_gdrive_file(args).await,
            "search_gdrive" => self.search_gdrive(args).await,
            _ => Err(ToolboxError::ToolNotFound {
                name: name.to_string(),
            }),
        }
    }

    async fn acquire(&self) -> Result<CredentialRecord> {
        self.credentials
            .acquire()
            .await
            .map_err(ToolboxError::Auth)
    }

    // ==================== Email handlers ====================

    async fn list_emails(&self, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            max_results: i64,
        }
        let args: Args = parse_args("list_emails", args)?;

        let credentials = self.acquire().await?;
        let mail = self.services.bind("mail", &credentials)?.into_mail()?;

        let listing = mail.list(&args.query, args.max_results).await?;

        let mut emails = Vec::with_capacity(listing.messages.len());
        for msg_ref in listing.messages {
            let message = mail.get_metadata(&msg_ref.id).await?;
            let payload = message.payload.as_ref();
            emails.push(json!({
                "id": message.id,
                "thread_id": msg_ref.thread_id,
                "subject": payload
                    .and_then(|p| find_header(p, "subject"))
                    .unwrap_or("(No Subject)"),
                "from": payload.and_then(|p| find_header(p, "from")),
                "date": payload.and_then(|p| find_header(p, "date")),
                "snippet": message.snippet,
            }));
        }

        Ok(ToolOutput::Json(Value::Array(emails)))
    }

    async fn search_emails(&self, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            max_results: i64,
        }
        let args: Args = parse_args("search_emails", args)?;

        let credentials = self.acquire().await?;
        let mail = self.services.bind("mail", &credentials)?.into_mail()?;

        let listing = mail.list(&args.query, args.max_results).await?;

        let mut emails = Vec::with_capacity(listing.messages.len());
        for msg_ref in listing.messages {
            let message = mail.get_full(&msg_ref.id).await?;
            let payload = message.payload.as_ref();
            let body = match payload {
                Some(payload) => extract_plain_text(payload),
                None => BODY_EMPTY.to_string(),
            };
            emails.push(json!({
                "id": message.id,
                "thread_id": message.thread_id,
                "subject": payload
                    .and_then(|p| find_header(p, "subject"))
                    .unwrap_or("(No Subject)"),
                "from": payload.and_then(|p| find_header(p, "from")),
                "to": payload.and_then(|p| find_header(p, "to")),
                "date": payload.and_then(|p| find_header(p, "date")),
                "body": body,
                "labels": message.label_ids,
                "snippet": message.snippet,
            }));
        }

        Ok(ToolOutput::Json(Value::Array(emails)))
    }

    async fn send_email(&self, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            to: String,
            subject: String,
            body: String,
            cc: Option<String>,
            bcc: Option<String>,
        }
        let args: Args = parse_args("send_email", args)?;

        let email = OutgoingEmail {
            to: args.to,
            subject: args.subject,
            body: args.body,
            cc: args.cc,
            bcc: args.bcc,
        };
        let rfc822 = build_rfc822(&email)?;

        let credentials = self.acquire().await?;
        let mail = self.services.bind("mail", &credentials)?.into_mail()?;

        let sent = mail.send(&rfc822).await?;
        tracing::info!("sent message {}", sent.id);

        Ok(ToolOutput::Text(format!(
            "Email sent successfully. Message ID: {}",
            sent.id
        )))
    }

    async fn modify_email(&self, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            id: String,
            add_labels: Option<Vec<String>>,
            remove_labels: Option<Vec<String>>,
        }
        let args: Args = parse_args("modify_email", args)?;

        // Empty lists mean "no change"; with no change on either side there
        // is nothing to do and no reason to touch credentials or the network.
        let add = args.add_labels.filter(|labels| !labels.is_empty());
        let remove = args.remove_labels.filter(|labels| !labels.is_empty());
        if add.is_none() && remove.is_none() {
            return Err(ToolboxError::invalid_argument(
                "one of add_labels or remove_labels must be provided",
            ));
        }

        let credentials = self.acquire().await?;
        let mail = self.services.bind("mail", &credentials)?.into_mail()?;

        let modified = mail.modify(&args.id, add, remove).await?;

        Ok(ToolOutput::Text(format!(
            "Email modified successfully. Labels updated for message ID {}.",
            modified.id
        )))
    }

    // ==================== Calendar handlers ====================

    async fn list_events(&self, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            time_min: Option<String>,
            time_max: Option<String>,
            max_results: i64,
        }
        let args: Args = parse_args("list_events", args)?;

        let credentials = self.acquire().await?;
        let calendar = self
            .services
            .bind("calendar", &credentials)?
            .into_calendar()?;

        let now = Utc::now().to_rfc3339();
        let time_min = args.time_min.unwrap_or_else(|| now.clone());
        let time_max = args.time_max.unwrap_or(now);

        let listing = calendar
            .list(&time_min, &time_max, args.max_results)
            .await?;

        let events: Vec<Value> = listing
            .items
            .iter()
            .map(|event| {
                json!({
                    "id": event.id,
                    "summary": event.summary,
                    "start": event.start.as_ref().and_then(EventTime::display),
                    "end": event.end.as_ref().and_then(EventTime::display),
                    "location": event.location,
                    "description": event.description,
                })
            })
            .collect();

        Ok(ToolOutput::Json(Value::Array(events)))
    }

    async fn create_event(&self, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            summary: String,
            start: String,
            end: String,
            location: Option<String>,
            description: Option<String>,
            attendees: Option<Vec<String>>,
        }
        let args: Args = parse_args("create_event", args)?;

        let credentials = self.acquire().await?;
        let calendar = self
            .services
            .bind("calendar", &credentials)?
            .into_calendar()?;

        let event = Event {
            summary: Some(args.summary),
            location: Some(args.location.unwrap_or_default()),
            description: Some(args.description.unwrap_or_default()),
            start: Some(EventTime::timed(&args.start, &self.time_zone)),
            end: Some(EventTime::timed(&args.end, &self.time_zone)),
            attendees: args
                .attendees
                .filter(|attendees| !attendees.is_empty())
                .map(|attendees| attendees.into_iter().map(|email| Attendee { email }).collect()),
            ..Default::default()
        };

        let created = calendar.insert(&event).await?;
        tracing::info!("created event: {:?}", created.html_link);

        Ok(ToolOutput::Text(format!(
            "Event created successfully. Event ID: {}",
            created.id.unwrap_or_default()
        )))
    }

    async fn update_event(&self, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            event_id: String,
            summary: Option<String>,
            start: Option<String>,
            end: Option<String>,
            location: Option<String>,
            description: Option<String>,
            attendees: Option<Vec<String>>,
        }
        let args: Args = parse_args("update_event", args)?;

        let patch = EventPatch {
            summary: args.summary,
            start: args.start,
            end: args.end,
            location: args.location,
            description: args.description,
            attendees: args.attendees.filter(|attendees| !attendees.is_empty()),
        };

        let credentials = self.acquire().await?;
        let calendar = self
            .services
            .bind("calendar", &credentials)?
            .into_calendar()?;

        // Read-merge-write: fields not present in the request stay untouched.
        let mut event = calendar.get(&args.event_id).await?;
        apply_patch(&mut event, &patch, &self.time_zone);
        let updated = calendar.update(&args.event_id, &event).await?;

        Ok(ToolOutput::Text(format!(
            "Event updated successfully. Event ID: {}",
            updated.id.unwrap_or(args.event_id)
        )))
    }

    async fn delete_event(&self, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            event_id: String,
        }
        let args: Args = parse_args("delete_event", args)?;

        let credentials = self.acquire().await?;
        let calendar = self
            .services
            .bind("calendar", &credentials)?
            .into_calendar()?;

        calendar.delete(&args.event_id).await?;

        Ok(ToolOutput::Text(format!(
            "Event deleted successfully. Event ID: {}",
            args.event_id
        )))
    }

    // ==================== Search handler ====================

    async fn search_google(&self, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            num_results: i64,
        }
        let args: Args = parse_args("search_google", args)?;

        // Web search authenticates with the API key, not the OAuth credential.
        let search = self.services.search()?;
        let response = search.query(&args.query, args.num_results).await?;

        let results: Vec<Value> = response
            .items
            .iter()
            .map(|item| {
                json!({
                    "title": item.title.as_deref().unwrap_or(""),
                    "link": item.link.as_deref().unwrap_or(""),
                    "snippet": item.snippet.as_deref().unwrap_or(""),
                })
            })
            .collect();

        let total_results = response
            .search_information
            .and_then(|info| info.total_results)
            .unwrap_or_else(|| "0".to_string());

        Ok(ToolOutput::Json(json!({
            "results": results,
            "total_results": total_results,
        })))
    }

    // ==================== Drive handlers ====================

    async fn read_gdrive_file(&self, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
        }
        let args: Args = parse_args("read_gdrive_file", args)?;

        let credentials = self.acquire().await?;
        let drive = self.services.bind("drive", &credentials)?.into_drive()?;

        let file = drive.metadata(&args.file_id).await?;
        let name = file.name.unwrap_or_else(|| args.file_id.clone());
        let source_mime = file
            .mime_type
            .unwrap_or_else(|| "application/octet-stream".to_string());

        // Native workspace documents need a server-side export to a concrete
        // format; everything else downloads as-is.
        let (mime_type, content_bytes) = if source_mime.starts_with(NATIVE_DOC_PREFIX) {
            let export_mime = export_mime_type(&source_mime);
            let bytes = drive.export(&args.file_id, export_mime).await?;
            (export_mime.to_string(), bytes)
        } else {
            let bytes = drive.download(&args.file_id).await?;
            (source_mime, bytes)
        };

        let is_text = is_text_mime(&mime_type);
        let content = if is_text {
            String::from_utf8_lossy(&content_bytes).into_owned()
        } else {
            base64::engine::general_purpose::STANDARD.encode(&content_bytes)
        };

        tracing::info!(
            "read file {} ({}), {} bytes",
            name,
            mime_type,
            content_bytes.len()
        );

        Ok(ToolOutput::Json(json!({
            "name": name,
            "mime_type": mime_type,
            "content": content,
            "is_text": is_text,
        })))
    }

    async fn search_gdrive(&self, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            page_token: Option<String>,
            page_size: Option<i64>,
        }
        let args: Args = parse_args("search_gdrive", args)?;

        let credentials = self.acquire().await?;
        let drive = self.services.bind("drive", &credentials)?.into_drive()?;

        let predicate = build_search_query(&args.query);
        let page_size = clamp_page_size(args.page_size);

        let listing = drive
            .list(&predicate, page_size, args.page_token.as_deref())
            .await?;

        let files: Vec<Value> = listing
            .files
            .iter()
            .map(|file| {
                json!({
                    "id": file.id.as_deref().unwrap_or(""),
                    "name": file.name.as_deref().unwrap_or(""),
                    "mime_type": file.mime_type.as_deref().unwrap_or(""),
                    "modified_time": file.modified_time.as_deref().unwrap_or(""),
                    "size": file.size.as_deref().unwrap_or("N/A"),
                })
            })
            .collect();

        tracing::info!("drive search matched {} files", files.len());

        Ok(ToolOutput::Json(json!({
            "files": files,
            "total_files": files.len(),
            "next_page_token": listing.next_page_token,
        })))
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|err| {
        ToolboxError::invalid_argument(format!("invalid arguments for tool '{}': {}", tool, err))
    })
}
