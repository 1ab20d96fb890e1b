//! Gmail API surface
//!
//! REST client for the message operations the toolbox exposes, the response
//! types they decode into, and the MIME helpers for composing outgoing mail
//! and extracting plain-text bodies from nested part trees.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::config::endpoints::{GMAIL_API, USER_ID};
use crate::error::{Result, ToolboxError};
use crate::google::services::read_json;

/// Sentinel returned when a message has no payload at all
pub const BODY_EMPTY: &str = "(No body content)";

/// Sentinel returned when no plain-text leaf exists anywhere in the payload
pub const BODY_UNAVAILABLE: &str = "(Could not extract plain text body)";

// ==================== API types ====================

/// A Gmail message
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,

    #[serde(default)]
    pub thread_id: Option<String>,

    #[serde(default)]
    pub label_ids: Vec<String>,

    #[serde(default)]
    pub snippet: Option<String>,

    #[serde(default)]
    pub payload: Option<MessagePart>,
}

/// One MIME part of a message
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: Option<String>,

    #[serde(default)]
    pub headers: Vec<Header>,

    #[serde(default)]
    pub body: Option<MessagePartBody>,

    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePartBody {
    #[serde(default)]
    pub data: Option<String>,
}

/// messages.list response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,

    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    raw: String,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct ModifyMessageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    add_label_ids: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    remove_label_ids: Option<Vec<String>>,
}

// ==================== Client ====================

/// Gmail client bound to one credential
pub struct MailService<'a> {
    client: &'a reqwest::Client,
    access_token: &'a str,
}

impl<'a> MailService<'a> {
    pub fn new(client: &'a reqwest::Client, access_token: &'a str) -> Self {
        Self {
            client,
            access_token,
        }
    }

    fn messages_url() -> String {
        format!("{}/users/{}/messages", GMAIL_API, USER_ID)
    }

    /// List message ids matching a Gmail search query
    pub async fn list(&self, query: &str, max_results: i64) -> Result<MessageList> {
        let max_results = max_results.to_string();
        let response = self
            .client
            .get(Self::messages_url())
            .bearer_auth(self.access_token)
            .query(&[("q", query), ("maxResults", max_results.as_str())])
            .send()
            .await?;

        read_json(response, "message list").await
    }

    /// Fetch Subject/From/To/Date headers and snippet for one message
    pub async fn get_metadata(&self, message_id: &str) -> Result<Message> {
        let url = format!("{}/{}", Self::messages_url(), message_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.access_token)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "To"),
                ("metadataHeaders", "Date"),
            ])
            .send()
            .await?;

        read_json(response, &format!("message '{}'", message_id)).await
    }

    /// Fetch one message with its full MIME payload
    pub async fn get_full(&self, message_id: &str) -> Result<Message> {
        let url = format!("{}/{}", Self::messages_url(), message_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.access_token)
            .query(&[("format", "full")])
            .send()
            .await?;

        read_json(response, &format!("message '{}'", message_id)).await
    }

    /// Send a raw RFC822 message (base64url encoded by this call)
    pub async fn send(&self, rfc822: &str) -> Result<Message> {
        let request = SendMessageRequest {
            raw: encode_raw_message(rfc822),
        };

        let url = format!("{}/send", Self::messages_url());
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.access_token)
            .json(&request)
            .send()
            .await?;

        read_json(response, "outgoing message").await
    }

    /// Add and/or remove labels on a message
    pub async fn modify(
        &self,
        message_id: &str,
        add_label_ids: Option<Vec<String>>,
        remove_label_ids: Option<Vec<String>>,
    ) -> Result<Message> {
        let request = ModifyMessageRequest {
            add_label_ids,
            remove_label_ids,
        };

        let url = format!("{}/{}/modify", Self::messages_url(), message_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.access_token)
            .json(&request)
            .send()
            .await?;

        read_json(response, &format!("message '{}'", message_id)).await
    }
}

// ==================== MIME helpers ====================

/// Find a header value by name (case-insensitive)
pub fn find_header<'p>(part: &'p MessagePart, name: &str) -> Option<&'p str> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Extract the plain-text body from a message payload.
///
/// Depth-first over the part tree, preferring the first `text/plain` leaf;
/// this descends through `multipart/alternative` (and any other container)
/// sub-parts. Yields an explicit sentinel when nothing plain-text exists.
pub fn extract_plain_text(payload: &MessagePart) -> String {
    find_plain_text(payload).unwrap_or_else(|| BODY_UNAVAILABLE.to_string())
}

fn find_plain_text(part: &MessagePart) -> Option<String> {
    if part.mime_type.as_deref() == Some("text/plain") {
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
            if let Ok(text) = decode_base64url_string(data) {
                return Some(text);
            }
        }
    }

    part.parts.iter().find_map(find_plain_text)
}

/// Encode a raw RFC822 message for the Gmail API (base64url, no padding)
pub fn encode_raw_message(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Decode base64url data from the Gmail API, tolerating padded variants
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(data))
        .or_else(|_| base64::engine::general_purpose::STANDARD.decode(data))
        .map_err(|e| ToolboxError::internal(format!("invalid base64 body data: {}", e)))
}

fn decode_base64url_string(data: &str) -> Result<String> {
    let bytes = decode_base64url(data)?;
    String::from_utf8(bytes)
        .map_err(|e| ToolboxError::internal(format!("body data is not UTF-8: {}", e)))
}

/// Parameters for composing an outgoing email
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
}

/// Simple structural check for an email address
pub fn validate_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    let (local, domain) = (parts[0], parts[1]);

    !local.is_empty()
        && !domain.is_empty()
        && !local.contains(' ')
        && !domain.contains(' ')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Encode text for a MIME header (RFC 2047) when it carries non-ASCII
pub fn encode_mime_header(text: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && c != '\r' && c != '\n') {
        return text.to_string();
    }

    format!(
        "=?UTF-8?B?{}?=",
        base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
    )
}

/// Compose a plain-text RFC822 message
pub fn build_rfc822(email: &OutgoingEmail) -> Result<String> {
    if !validate_email(&email.to) {
        return Err(ToolboxError::invalid_argument(format!(
            "invalid recipient address: {}",
            email.to
        )));
    }

    let mut lines = Vec::new();
    lines.push(format!("To: {}", email.to));
    if let Some(cc) = email.cc.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("Cc: {}", cc));
    }
    if let Some(bcc) = email.bcc.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("Bcc: {}", bcc));
    }
    lines.push(format!("Subject: {}", encode_mime_header(&email.subject)));
    lines.push("MIME-Version: 1.0".to_string());
    lines.push("Content-Type: text/plain; charset=UTF-8".to_string());
    lines.push("Content-Transfer-Encoding: 7bit".to_string());
    lines.push(String::new());
    lines.push(email.body.clone());

    Ok(lines.join("\r\n"))
}
