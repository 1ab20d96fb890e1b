//! Google Drive API surface
//!
//! File metadata, export of native workspace documents, chunked media
//! download, and the search-query builder with its escaping and MIME
//! heuristics.

use serde::Deserialize;

use crate::config::endpoints::DRIVE_API;
use crate::error::Result;
use crate::google::services::{check_status, read_json};

/// MIME prefix shared by native workspace documents
pub const NATIVE_DOC_PREFIX: &str = "application/vnd.google-apps";

/// File metadata needed to decide between export and download
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub mime_type: Option<String>,
}

/// One entry of a files.list response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFileSummary {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub mime_type: Option<String>,

    #[serde(default)]
    pub modified_time: Option<String>,

    #[serde(default)]
    pub size: Option<String>,
}

/// files.list response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFileSummary>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Drive client bound to one credential
pub struct DriveService<'a> {
    client: &'a reqwest::Client,
    access_token: &'a str,
}

impl<'a> DriveService<'a> {
    pub fn new(client: &'a reqwest::Client, access_token: &'a str) -> Self {
        Self {
            client,
            access_token,
        }
    }

    fn files_url() -> String {
        format!("{}/files", DRIVE_API)
    }

    /// Fetch name and MIME type for one file
    pub async fn metadata(&self, file_id: &str) -> Result<DriveFile> {
        let url = format!("{}/{}", Self::files_url(), file_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.access_token)
            .query(&[("fields", "mimeType,name")])
            .send()
            .await?;

        read_json(response, &format!("file '{}'", file_id)).await
    }

    /// Export a native workspace document to a concrete MIME type
    pub async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}/export", Self::files_url(), file_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.access_token)
            .query(&[("mimeType", mime_type)])
            .send()
            .await?;

        let response = check_status(response, &format!("file '{}'", file_id)).await?;
        Self::collect_body(response).await
    }

    /// Download a regular file's content in chunks until complete
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", Self::files_url(), file_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.access_token)
            .query(&[("alt", "media")])
            .send()
            .await?;

        let response = check_status(response, &format!("file '{}'", file_id)).await?;
        Self::collect_body(response).await
    }

    async fn collect_body(mut response: reqwest::Response) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            content.extend_from_slice(&chunk);
        }
        Ok(content)
    }

    /// Search files with a prebuilt query predicate
    pub async fn list(
        &self,
        query: &str,
        page_size: i64,
        page_token: Option<&str>,
    ) -> Result<FileList> {
        let page_size = page_size.to_string();
        let mut request = self
            .client
            .get(Self::files_url())
            .bearer_auth(self.access_token)
            .query(&[
                ("q", query),
                ("pageSize", page_size.as_str()),
                ("orderBy", "modifiedTime desc"),
                (
                    "fields",
                    "nextPageToken, files(id, name, mimeType, modifiedTime, size)",
                ),
            ]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await?;
        read_json(response, "file list").await
    }
}

/// Export target for a native workspace document, by source MIME type
pub fn export_mime_type(native_mime: &str) -> &'static str {
    match native_mime {
        "application/vnd.google-apps.document" => "text/markdown",
        "application/vnd.google-apps.spreadsheet" => "text/csv",
        "application/vnd.google-apps.presentation" => "text/plain",
        "application/vnd.google-apps.drawing" => "image/png",
        _ => "text/plain",
    }
}

/// Whether content of this MIME type is returned as decoded text
pub fn is_text_mime(mime_type: &str) -> bool {
    mime_type.starts_with("text/") || mime_type == "application/json"
}

/// Clamp a requested page size into the API's accepted range
pub fn clamp_page_size(requested: Option<i64>) -> i64 {
    requested.unwrap_or(10).clamp(1, 100)
}

/// Build the files.list query predicate for a free-text phrase.
///
/// The phrase is escaped (`\` and `'`), matched against file names, widened
/// with a MIME-type filter when the phrase hints at a document kind, and
/// always restricted to non-trashed files. An empty phrase lists everything
/// not in the trash.
pub fn build_search_query(raw: &str) -> String {
    let phrase = raw.trim();
    if phrase.is_empty() {
        return "trashed = false".to_string();
    }

    let escaped = phrase.replace('\\', "\\\\").replace('\'', "\\'");
    let mut conditions = vec![format!("name contains '{}'", escaped)];

    let lowered = phrase.to_lowercase();
    if lowered.contains("sheet") {
        conditions.push("mimeType = 'application/vnd.google-apps.spreadsheet'".to_string());
    } else if lowered.contains("doc") {
        conditions.push("mimeType = 'application/vnd.google-apps.document'".to_string());
    } else if lowered.contains("presentation") || lowered.contains("slide") {
        conditions.push("mimeType = 'application/vnd.google-apps.presentation'".to_string());
    }

    format!("({}) and trashed = false", conditions.join(" or "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_mime_mapping() {
        assert_eq!(
            export_mime_type("application/vnd.google-apps.document"),
            "text/markdown"
        );
        assert_eq!(
            export_mime_type("application/vnd.google-apps.spreadsheet"),
            "text/csv"
        );
        assert_eq!(
            export_mime_type("application/vnd.google-apps.presentation"),
            "text/plain"
        );
        assert_eq!(
            export_mime_type("application/vnd.google-apps.drawing"),
            "image/png"
        );
        assert_eq!(
            export_mime_type("application/vnd.google-apps.form"),
            "text/plain"
        );
    }

    #[test]
    fn test_is_text_mime() {
        assert!(is_text_mime("text/plain"));
        assert!(is_text_mime("text/csv"));
        assert!(is_text_mime("application/json"));
        assert!(!is_text_mime("image/png"));
        assert!(!is_text_mime("application/pdf"));
    }

    #[test]
    fn test_clamp_page_size() {
        assert_eq!(clamp_page_size(None), 10);
        assert_eq!(clamp_page_size(Some(500)), 100);
        assert_eq!(clamp_page_size(Some(0)), 1);
        assert_eq!(clamp_page_size(Some(-5)), 1);
        assert_eq!(clamp_page_size(Some(25)), 25);
    }

    #[test]
    fn test_empty_query_lists_non_trashed() {
        assert_eq!(build_search_query(""), "trashed = false");
        assert_eq!(build_search_query("   "), "trashed = false");
    }

    #[test]
    fn test_query_escaping() {
        let query = build_search_query("O'Brien");
        assert!(query.contains("name contains 'O\\'Brien'"));
        assert!(query.ends_with("and trashed = false"));

        let query = build_search_query("back\\slash");
        assert!(query.contains("name contains 'back\\\\slash'"));
    }

    #[test]
    fn test_query_mime_heuristics() {
        let query = build_search_query("budget sheet");
        assert!(query.contains("application/vnd.google-apps.spreadsheet"));

        let query = build_search_query("design doc");
        assert!(query.contains("application/vnd.google-apps.document"));

        let query = build_search_query("kickoff slides");
        assert!(query.contains("application/vnd.google-apps.presentation"));

        let query = build_search_query("notes");
        assert!(!query.contains("mimeType"));
    }

    #[test]
    fn test_sheet_heuristic_wins_over_doc() {
        let query = build_search_query("sheet of docs");
        assert!(query.contains("spreadsheet"));
        assert!(!query.contains("vnd.google-apps.document"));
    }
}
