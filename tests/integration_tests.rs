//! Integration tests for the Google Toolbox MCP Server
//!
//! These tests drive the MCP protocol path and the pure domain laws. No real
//! Google API calls are made; credential failures are part of what is being
//! tested.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use google_toolbox_mcp::config::Config;
use google_toolbox_mcp::google::auth::CredentialStore;
use google_toolbox_mcp::google::services::ServiceFactory;
use google_toolbox_mcp::mcp::server::{McpServer, TOOL_LIST_RESOURCE_URI};
use google_toolbox_mcp::mcp::tools::ToolHandler;

fn test_config(dir: &tempfile::TempDir) -> Config {
    Config {
        token_path: dir.path().join("token.json"),
        client_id: None,
        client_secret: None,
        refresh_token: None,
        api_key: None,
        cse_id: None,
        scopes: vec![],
        oauth_callback_port: 3000,
        time_zone: "UTC".to_string(),
        log_level: "info".to_string(),
        log_to_file: false,
        log_dir: PathBuf::from("logs"),
    }
}

fn test_server(dir: &tempfile::TempDir) -> McpServer {
    let config = test_config(dir);
    let http = reqwest::Client::new();
    let credentials = Arc::new(CredentialStore::new(&config, http.clone()));
    let services = ServiceFactory::new(http, None, None);
    McpServer::new(ToolHandler::new(credentials, services, config.time_zone))
}

async fn call_tool(server: &mut McpServer, name: &str, arguments: Value) -> Value {
    let message = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments},
    });
    let response = server
        .handle_message(&message.to_string())
        .await
        .expect("tools/call always answers");
    serde_json::to_value(&response)
        .expect("response serializes")
        .get("result")
        .cloned()
        .expect("tool call outcomes ride the result envelope")
}

fn envelope_text(envelope: &Value) -> &str {
    envelope["content"][0]["text"]
        .as_str()
        .expect("envelope carries one text item")
}

fn is_failure(envelope: &Value) -> bool {
    envelope["isError"].as_bool().unwrap_or(false)
}

mod mcp_protocol_tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_handshake() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["result"]["protocolVersion"], "2024-11-05");
        assert!(value.get("error").is_none());
    }

    #[tokio::test]
    async fn test_ping() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#)
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], 7);
        assert!(value["result"].is_object());
    }

    #[tokio::test]
    async fn test_tools_list_schemas() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        let tools = value["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 11);

        let send_email = tools
            .iter()
            .find(|tool| tool["name"] == "send_email")
            .unwrap();
        assert_eq!(send_email["inputSchema"]["type"], "object");
        assert!(send_email["inputSchema"]["required"]
            .as_array()
            .unwrap()
            .contains(&json!("to")));
    }

    #[tokio::test]
    async fn test_unknown_method_is_rpc_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":3,"method":"prompts/list"}"#)
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"]["code"], -32601);
        assert!(value.get("result").is_none());
    }

    #[tokio::test]
    async fn test_discovery_resource_lists_tool_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let message = json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "resources/read",
            "params": {"uri": TOOL_LIST_RESOURCE_URI},
        });
        let response = server.handle_message(&message.to_string()).await.unwrap();
        let value = serde_json::to_value(&response).unwrap();
        let text = value["result"]["contents"][0]["text"].as_str().unwrap();
        let names: Vec<String> = serde_json::from_str(text).unwrap();
        assert_eq!(names.len(), 11);
        assert_eq!(names[0], "list_emails");
        assert_eq!(names[10], "search_gdrive");
    }
}

mod dispatch_tests {
    use super::*;

    #[tokio::test]
    async fn test_every_outcome_is_exactly_one_variant() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        // A failing call and a validation failure both produce exactly one
        // envelope with content and a definite error flag.
        for (name, args) in [
            ("list_emails", json!({})),
            ("no_such_tool", json!({})),
            ("modify_email", json!({"id": "m1"})),
        ] {
            let envelope = call_tool(&mut server, name, args).await;
            assert!(envelope["content"].is_array());
            assert_eq!(envelope["content"].as_array().unwrap().len(), 1);
            assert!(envelope["isError"].is_boolean() || envelope.get("isError").is_none());
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let envelope = call_tool(&mut server, "read_email", json!({"id": "x"})).await;
        assert!(is_failure(&envelope));
        // A tool_not_found kind proves neither the handler nor credential
        // acquisition ran; an auth failure would be tagged (auth).
        assert!(envelope_text(&envelope).contains("tool_not_found"));
        assert!(!envelope_text(&envelope).contains("(auth)"));
    }

    #[tokio::test]
    async fn test_coercion_failure_precedes_handler() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let envelope = call_tool(
            &mut server,
            "search_emails",
            json!({"query": "q", "max_results": "many"}),
        )
        .await;
        assert!(is_failure(&envelope));
        assert!(envelope_text(&envelope).contains("invalid_argument"));
    }

    #[tokio::test]
    async fn test_missing_credentials_surface_as_auth_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let envelope = call_tool(&mut server, "list_emails", json!({"query": ""})).await;
        assert!(is_failure(&envelope));
        assert!(envelope_text(&envelope).contains("(auth)"));
    }

    #[tokio::test]
    async fn test_modify_email_without_labels_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let envelope = call_tool(
            &mut server,
            "modify_email",
            json!({"id": "m1", "add_labels": [], "remove_labels": []}),
        )
        .await;
        assert!(is_failure(&envelope));
        let text = envelope_text(&envelope);
        assert!(text.contains("invalid_argument"));
        assert!(text.contains("add_labels or remove_labels"));
    }

    #[tokio::test]
    async fn test_camel_case_arguments_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        // maxResults coerces; the call then proceeds to credential
        // acquisition, so the failure is auth, not invalid_argument.
        let envelope = call_tool(
            &mut server,
            "search_emails",
            json!({"query": "is:unread", "maxResults": 5}),
        )
        .await;
        assert!(is_failure(&envelope));
        assert!(envelope_text(&envelope).contains("(auth)"));
    }
}

mod credential_tests {
    use super::*;
    use chrono::Utc;
    use google_toolbox_mcp::google::auth::CredentialRecord;

    fn record(expiry_offset: i64) -> CredentialRecord {
        CredentialRecord {
            access_token: Some("token-a".to_string()),
            refresh_token: "refresh".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            token_uri: "http://127.0.0.1:9/token".to_string(),
            scopes: vec![],
            expiry: Some(Utc::now().timestamp() + expiry_offset),
        }
    }

    #[tokio::test]
    async fn test_acquire_is_idempotent_within_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        std::fs::write(
            &config.token_path,
            serde_json::to_string(&record(3600)).unwrap(),
        )
        .unwrap();

        let store = CredentialStore::new(&config, reqwest::Client::new());
        let first = store.acquire().await.unwrap();
        let second = store.acquire().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.bearer(), "token-a");
    }

    #[tokio::test]
    async fn test_failed_refresh_is_terminal_and_preserves_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let original = serde_json::to_string(&record(-100)).unwrap();
        std::fs::write(&config.token_path, &original).unwrap();

        let store = CredentialStore::new(&config, reqwest::Client::new());
        assert!(store.acquire().await.is_err());
        assert_eq!(
            std::fs::read_to_string(&config.token_path).unwrap(),
            original
        );
    }
}

mod mail_extraction_tests {
    use google_toolbox_mcp::google::mail::{
        extract_plain_text, MessagePart, BODY_UNAVAILABLE,
    };

    #[test]
    fn test_plain_part_decodes() {
        // base64url("hello")
        let payload: MessagePart = serde_json::from_value(serde_json::json!({
            "mimeType": "multipart/mixed",
            "parts": [
                {"mimeType": "text/plain", "body": {"data": "aGVsbG8"}}
            ]
        }))
        .unwrap();
        assert_eq!(extract_plain_text(&payload), "hello");
    }

    #[test]
    fn test_no_plain_leaf_yields_sentinel() {
        let payload: MessagePart = serde_json::from_value(serde_json::json!({
            "mimeType": "multipart/alternative",
            "parts": [
                {"mimeType": "text/html", "body": {"data": "PGI+aGk8L2I+"}},
                {"mimeType": "image/png", "body": {}}
            ]
        }))
        .unwrap();
        assert_eq!(extract_plain_text(&payload), BODY_UNAVAILABLE);
    }

    #[test]
    fn test_alternative_nesting_is_searched() {
        let payload: MessagePart = serde_json::from_value(serde_json::json!({
            "mimeType": "multipart/mixed",
            "parts": [
                {
                    "mimeType": "multipart/alternative",
                    "parts": [
                        {"mimeType": "text/html", "body": {"data": "PGI+aGk8L2I+"}},
                        {"mimeType": "text/plain", "body": {"data": "aGVsbG8"}}
                    ]
                }
            ]
        }))
        .unwrap();
        assert_eq!(extract_plain_text(&payload), "hello");
    }
}

mod drive_query_tests {
    use google_toolbox_mcp::google::drive::{build_search_query, clamp_page_size};

    #[test]
    fn test_empty_query_is_trashed_filter_only() {
        assert_eq!(build_search_query(""), "trashed = false");
    }

    #[test]
    fn test_apostrophe_escaping() {
        let query = build_search_query("O'Brien");
        assert_eq!(
            query,
            "(name contains 'O\\'Brien') and trashed = false"
        );
    }

    #[test]
    fn test_page_size_clamping() {
        assert_eq!(clamp_page_size(Some(500)), 100);
        assert_eq!(clamp_page_size(Some(0)), 1);
        assert_eq!(clamp_page_size(None), 10);
    }

    #[test]
    fn test_keyword_widens_to_mime_filter() {
        let query = build_search_query("quarterly sheet");
        assert!(query.contains("name contains 'quarterly sheet'"));
        assert!(query.contains("or mimeType = 'application/vnd.google-apps.spreadsheet'"));
        assert!(query.ends_with("and trashed = false"));
    }
}

mod calendar_merge_tests {
    use google_toolbox_mcp::google::calendar::{
        apply_patch, Attendee, Event, EventPatch, EventTime,
    };

    #[test]
    fn test_summary_only_patch_preserves_rest() {
        let mut event = Event {
            id: Some("evt".to_string()),
            summary: Some("Old".to_string()),
            location: Some("HQ".to_string()),
            attendees: Some(vec![Attendee {
                email: "a@example.com".to_string(),
            }]),
            start: Some(EventTime::timed("2026-08-04T09:00:00Z", "UTC")),
            ..Default::default()
        };

        apply_patch(
            &mut event,
            &EventPatch {
                summary: Some("New".to_string()),
                ..Default::default()
            },
            "UTC",
        );

        assert_eq!(event.summary.as_deref(), Some("New"));
        assert_eq!(event.location.as_deref(), Some("HQ"));
        assert_eq!(event.attendees.as_ref().unwrap()[0].email, "a@example.com");
        assert_eq!(
            event.start.as_ref().unwrap().display(),
            Some("2026-08-04T09:00:00Z")
        );
    }
}
