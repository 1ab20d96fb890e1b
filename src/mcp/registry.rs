//! Tool registry
//!
//! The static table of every tool this server exposes: name, description,
//! and argument schema. The dispatch layer consults it to resolve handlers,
//! generate `tools/list` schemas, and coerce raw argument bags into typed
//! ones before a handler runs.

use serde_json::{json, Map, Value};

use crate::error::{Result, ToolboxError};

/// Declared type of one argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Str,
    Int,
    Bool,
    StrList,
}

/// One argument of a tool
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    pub default: Option<&'static str>,
    pub description: &'static str,
}

/// One registered tool
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub args: &'static [ArgSpec],
}

/// Every tool, in discovery order
pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "list_emails",
        description: "List recent emails from Gmail inbox",
        args: &[
            ArgSpec {
                name: "query",
                kind: ArgKind::Str,
                required: false,
                default: Some(""),
                description: "Search query to filter emails",
            },
            ArgSpec {
                name: "max_results",
                kind: ArgKind::Int,
                required: false,
                default: Some("10"),
                description: "Maximum number of emails to return",
            },
        ],
    },
    ToolSpec {
        name: "search_emails",
        description: "Search emails with advanced query",
        args: &[
            ArgSpec {
                name: "query",
                kind: ArgKind::Str,
                required: true,
                default: None,
                description: "Gmail search query (e.g., \"from:example@gmail.com has:attachment\")",
            },
            ArgSpec {
                name: "max_results",
                kind: ArgKind::Int,
                required: false,
                default: Some("10"),
                description: "Maximum number of emails to return",
            },
        ],
    },
    ToolSpec {
        name: "send_email",
        description: "Send a new email",
        args: &[
            ArgSpec {
                name: "to",
                kind: ArgKind::Str,
                required: true,
                default: None,
                description: "Recipient email address",
            },
            ArgSpec {
                name: "subject",
                kind: ArgKind::Str,
                required: true,
                default: None,
                description: "Email subject",
            },
            ArgSpec {
                name: "body",
                kind: ArgKind::Str,
                required: true,
                default: None,
                description: "Email body text",
            },
            ArgSpec {
                name: "cc",
                kind: ArgKind::Str,
                required: false,
                default: None,
                description: "CC recipients (comma-separated)",
            },
            ArgSpec {
                name: "bcc",
                kind: ArgKind::Str,
                required: false,
                default: None,
                description: "BCC recipients (comma-separated)",
            },
        ],
    },
    ToolSpec {
        name: "modify_email",
        description: "Modify email labels (archive, trash, mark read/unread, etc.)",
        args: &[
            ArgSpec {
                name: "id",
                kind: ArgKind::Str,
                required: true,
                default: None,
                description: "Email message ID",
            },
            ArgSpec {
                name: "add_labels",
                kind: ArgKind::StrList,
                required: false,
                default: None,
                description: "Labels to add (e.g., ['INBOX', 'UNREAD'])",
            },
            ArgSpec {
                name: "remove_labels",
                kind: ArgKind::StrList,
                required: false,
                default: None,
                description: "Labels to remove (e.g., ['INBOX', 'SPAM'])",
            },
        ],
    },
    ToolSpec {
        name: "list_events",
        description: "List upcoming calendar events",
        args: &[
            ArgSpec {
                name: "time_min",
                kind: ArgKind::Str,
                required: false,
                default: None,
                description: "Start time in ISO format (default: now)",
            },
            ArgSpec {
                name: "time_max",
                kind: ArgKind::Str,
                required: false,
                default: None,
                description: "End time in ISO format (default: now)",
            },
            ArgSpec {
                name: "max_results",
                kind: ArgKind::Int,
                required: false,
                default: Some("10"),
                description: "Maximum number of events to return",
            },
        ],
    },
    ToolSpec {
        name: "create_event",
        description: "Create a new calendar event",
        args: &[
            ArgSpec {
                name: "summary",
                kind: ArgKind::Str,
                required: true,
                default: None,
                description: "Event title",
            },
            ArgSpec {
                name: "start",
                kind: ArgKind::Str,
                required: true,
                default: None,
                description: "Start datetime in ISO format",
            },
            ArgSpec {
                name: "end",
                kind: ArgKind::Str,
                required: true,
                default: None,
                description: "End datetime in ISO format",
            },
            ArgSpec {
                name: "location",
                kind: ArgKind::Str,
                required: false,
                default: None,
                description: "Event location",
            },
            ArgSpec {
                name: "description",
                kind: ArgKind::Str,
                required: false,
                default: None,
                description: "Event description",
            },
            ArgSpec {
                name: "attendees",
                kind: ArgKind::StrList,
                required: false,
                default: None,
                description: "Attendee email addresses",
            },
        ],
    },
    ToolSpec {
        name: "update_event",
        description: "Update an existing calendar event",
        args: &[
            ArgSpec {
                name: "event_id",
                kind: ArgKind::Str,
                required: true,
                default: None,
                description: "Event ID to update",
            },
            ArgSpec {
                name: "summary",
                kind: ArgKind::Str,
                required: false,
                default: None,
                description: "New event title",
            },
            ArgSpec {
                name: "start",
                kind: ArgKind::Str,
                required: false,
                default: None,
                description: "New start datetime in ISO format",
            },
            ArgSpec {
                name: "end",
                kind: ArgKind::Str,
                required: false,
                default: None,
                description: "New end datetime in ISO format",
            },
            ArgSpec {
                name: "location",
                kind: ArgKind::Str,
                required: false,
                default: None,
                description: "New event location",
            },
            ArgSpec {
                name: "description",
                kind: ArgKind::Str,
                required: false,
                default: None,
                description: "New event description",
            },
            ArgSpec {
                name: "attendees",
                kind: ArgKind::StrList,
                required: false,
                default: None,
                description: "New list of attendee email addresses",
            },
        ],
    },
    ToolSpec {
        name: "delete_event",
        description: "Delete a calendar event",
        args: &[ArgSpec {
            name: "event_id",
            kind: ArgKind::Str,
            required: true,
            default: None,
            description: "Event ID to delete",
        }],
    },
    ToolSpec {
        name: "search_google",
        description: "Perform a Google search and return formatted results",
        args: &[
            ArgSpec {
                name: "query",
                kind: ArgKind::Str,
                required: true,
                default: None,
                description: "The search query string",
            },
            ArgSpec {
                name: "num_results",
                kind: ArgKind::Int,
                required: false,
                default: Some("5"),
                description: "Number of search results to return",
            },
        ],
    },
    ToolSpec {
        name: "read_gdrive_file",
        description: "Read contents of a file from Google Drive",
        args: &[ArgSpec {
            name: "file_id",
            kind: ArgKind::Str,
            required: true,
            default: None,
            description: "ID of the file to read",
        }],
    },
    ToolSpec {
        name: "search_gdrive",
        description: "Search for files in Google Drive",
        args: &[
            ArgSpec {
                name: "query",
                kind: ArgKind::Str,
                required: false,
                default: Some(""),
                description: "Name of the file to search for",
            },
            ArgSpec {
                name: "page_token",
                kind: ArgKind::Str,
                required: false,
                default: None,
                description: "Token for the next page of results",
            },
            ArgSpec {
                name: "page_size",
                kind: ArgKind::Int,
                required: false,
                default: Some("10"),
                description: "Number of results per page (max 100)",
            },
        ],
    },
];

/// Look up a tool by name
pub fn find(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|spec| spec.name == name)
}

/// Registered tool names, in discovery order
pub fn tool_names() -> Vec<&'static str> {
    TOOLS.iter().map(|spec| spec.name).collect()
}

/// Build the JSON schema advertised for a tool's arguments
pub fn input_schema(spec: &ToolSpec) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for arg in spec.args {
        let mut property = match arg.kind {
            ArgKind::Str => json!({"type": "string"}),
            ArgKind::Int => json!({"type": "integer"}),
            ArgKind::Bool => json!({"type": "boolean"}),
            ArgKind::StrList => json!({"type": "array", "items": {"type": "string"}}),
        };
        property["description"] = json!(arg.description);
        if let Some(default) = default_value(arg) {
            property["default"] = default;
        }
        properties.insert(arg.name.to_string(), property);
        if arg.required {
            required.push(arg.name);
        }
    }

    let mut schema = json!({
        "type": "object",
        "properties": Value::Object(properties),
    });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

/// Coerce a raw argument bag against a tool's schema.
///
/// Declared arguments are matched by their snake_case name or its camelCase
/// rendering and converted to the declared kind; absent optional arguments
/// take their default; unrecognized keys pass through untouched. Any
/// mismatch is an `InvalidArgument` and the handler is never invoked.
pub fn coerce_arguments(spec: &ToolSpec, raw: Value) -> Result<Map<String, Value>> {
    let mut bag = match raw {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => {
            return Err(ToolboxError::invalid_argument(format!(
                "arguments for tool '{}' must be an object",
                spec.name
            )))
        }
    };

    let mut out = Map::new();
    for arg in spec.args {
        let value = bag
            .remove(arg.name)
            .or_else(|| bag.remove(&camel_case(arg.name)));

        match value {
            Some(Value::Null) | None => {
                if arg.required {
                    return Err(ToolboxError::invalid_argument(format!(
                        "missing required argument '{}' for tool '{}'",
                        arg.name, spec.name
                    )));
                }
                if let Some(default) = default_value(arg) {
                    out.insert(arg.name.to_string(), default);
                }
            }
            Some(value) => {
                out.insert(arg.name.to_string(), coerce_value(spec.name, arg, value)?);
            }
        }
    }

    for (key, value) in bag {
        out.insert(key, value);
    }

    Ok(out)
}

fn coerce_value(tool: &str, arg: &ArgSpec, value: Value) -> Result<Value> {
    let mismatch = |expected: &str| {
        ToolboxError::invalid_argument(format!(
            "argument '{}' for tool '{}' must be {}",
            arg.name, tool, expected
        ))
    };

    match arg.kind {
        ArgKind::Str => match value {
            Value::String(s) => Ok(Value::String(s)),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(mismatch("a string")),
        },
        ArgKind::Int => match value {
            Value::Number(n) => n
                .as_i64()
                .map(Value::from)
                .ok_or_else(|| mismatch("an integer")),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| mismatch("an integer")),
            _ => Err(mismatch("an integer")),
        },
        ArgKind::Bool => match value {
            Value::Bool(b) => Ok(Value::Bool(b)),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(mismatch("a boolean")),
            },
            _ => Err(mismatch("a boolean")),
        },
        ArgKind::StrList => match value {
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => out.push(Value::String(s)),
                        _ => return Err(mismatch("a list of strings")),
                    }
                }
                Ok(Value::Array(out))
            }
            Value::String(s) => Ok(Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            )),
            _ => Err(mismatch("a list of strings")),
        },
    }
}

fn default_value(arg: &ArgSpec) -> Option<Value> {
    let default = arg.default?;
    match arg.kind {
        ArgKind::Str => Some(Value::String(default.to_string())),
        ArgKind::Int => default.parse::<i64>().ok().map(Value::from),
        ArgKind::Bool => default.parse::<bool>().ok().map(Value::Bool),
        ArgKind::StrList => None,
    }
}

/// Render a snake_case name as camelCase
fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_are_unique() {
        let names = tool_names();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
        assert_eq!(names.len(), 11);
    }

    #[test]
    fn test_arg_names_unique_per_tool() {
        for spec in TOOLS {
            let mut names: Vec<_> = spec.args.iter().map(|a| a.name).collect();
            let total = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), total, "duplicate arg in {}", spec.name);
        }
    }

    #[test]
    fn test_discovery_order() {
        let names = tool_names();
        assert_eq!(names.first(), Some(&"list_emails"));
        assert_eq!(names.last(), Some(&"search_gdrive"));
    }

    #[test]
    fn test_find_unknown_tool() {
        assert!(find("read_email").is_none());
        assert!(find("list_emails").is_some());
    }

    #[test]
    fn test_schema_shape() {
        let spec = find("search_emails").unwrap();
        let schema = input_schema(spec);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["properties"]["max_results"]["default"], 10);
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[test]
    fn test_coerce_fills_defaults() {
        let spec = find("list_emails").unwrap();
        let out = coerce_arguments(spec, Value::Null).unwrap();
        assert_eq!(out["query"], "");
        assert_eq!(out["max_results"], 10);
    }

    #[test]
    fn test_coerce_accepts_camel_case_keys() {
        let spec = find("search_emails").unwrap();
        let out = coerce_arguments(spec, json!({"query": "is:unread", "maxResults": 25})).unwrap();
        assert_eq!(out["max_results"], 25);
        assert!(!out.contains_key("maxResults"));
    }

    #[test]
    fn test_coerce_parses_numeric_strings() {
        let spec = find("search_emails").unwrap();
        let out = coerce_arguments(spec, json!({"query": "q", "max_results": "25"})).unwrap();
        assert_eq!(out["max_results"], 25);

        let err =
            coerce_arguments(spec, json!({"query": "q", "max_results": "lots"})).unwrap_err();
        assert!(matches!(err, ToolboxError::InvalidArgument { .. }));
    }

    #[test]
    fn test_coerce_splits_comma_lists() {
        let spec = find("modify_email").unwrap();
        let out = coerce_arguments(
            spec,
            json!({"id": "m1", "add_labels": "INBOX, STARRED", "removeLabels": ["UNREAD"]}),
        )
        .unwrap();
        assert_eq!(out["add_labels"], json!(["INBOX", "STARRED"]));
        assert_eq!(out["remove_labels"], json!(["UNREAD"]));
    }

    #[test]
    fn test_coerce_empty_list_string() {
        let spec = find("modify_email").unwrap();
        let out = coerce_arguments(spec, json!({"id": "m1", "add_labels": ""})).unwrap();
        assert_eq!(out["add_labels"], json!([]));
    }

    #[test]
    fn test_coerce_missing_required() {
        let spec = find("send_email").unwrap();
        let err = coerce_arguments(spec, json!({"subject": "s", "body": "b"})).unwrap_err();
        assert!(matches!(err, ToolboxError::InvalidArgument { .. }));
        assert!(err.to_string().contains("'to'"));
    }

    #[test]
    fn test_coerce_passes_unknown_keys_through() {
        let spec = find("delete_event").unwrap();
        let out =
            coerce_arguments(spec, json!({"event_id": "e1", "sendUpdates": "all"})).unwrap();
        assert_eq!(out["sendUpdates"], "all");
    }

    #[test]
    fn test_coerce_bool_kind() {
        let arg = ArgSpec {
            name: "flag",
            kind: ArgKind::Bool,
            required: true,
            default: None,
            description: "test flag",
        };
        let spec = ToolSpec {
            name: "synthetic",
            description: "synthetic",
            args: &[],
        };
        assert_eq!(
            coerce_value(spec.name, &arg, json!("true")).unwrap(),
            Value::Bool(true)
        );
        assert!(coerce_value(spec.name, &arg, json!("maybe")).is_err());
    }
}
