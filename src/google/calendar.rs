//! Google Calendar API surface
//!
//! Event CRUD against the primary calendar. Events round-trip through
//! [`Event`], which keeps unmodeled provider fields in a flattened map so a
//! read-merge-write update never drops anything the server sent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::endpoints::{CALENDAR_API, CALENDAR_ID};
use crate::error::Result;
use crate::google::services::{check_status, read_json};

/// A calendar event
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<Attendee>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,

    /// Provider fields this server does not model, preserved across updates
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Start or end of an event: either a timed instant or an all-day date
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    pub fn timed(date_time: &str, time_zone: &str) -> Self {
        Self {
            date_time: Some(date_time.to_string()),
            date: None,
            time_zone: Some(time_zone.to_string()),
        }
    }

    /// The display value: dateTime for timed events, date for all-day ones
    pub fn display(&self) -> Option<&str> {
        self.date_time.as_deref().or(self.date.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
}

/// events.list response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<Event>,
}

/// Fields of an update request that were explicitly provided.
///
/// Absent fields leave the stored event untouched.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub summary: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub attendees: Option<Vec<String>>,
}

/// Overlay the provided fields onto a fetched event
pub fn apply_patch(event: &mut Event, patch: &EventPatch, time_zone: &str) {
    if let Some(summary) = &patch.summary {
        event.summary = Some(summary.clone());
    }
    if let Some(location) = &patch.location {
        event.location = Some(location.clone());
    }
    if let Some(description) = &patch.description {
        event.description = Some(description.clone());
    }
    if let Some(start) = &patch.start {
        event.start = Some(EventTime::timed(start, time_zone));
    }
    if let Some(end) = &patch.end {
        event.end = Some(EventTime::timed(end, time_zone));
    }
    if let Some(attendees) = &patch.attendees {
        event.attendees = Some(
            attendees
                .iter()
                .map(|email| Attendee {
                    email: email.clone(),
                })
                .collect(),
        );
    }
}

/// Calendar client bound to one credential
pub struct CalendarService<'a> {
    client: &'a reqwest::Client,
    access_token: &'a str,
}

impl<'a> CalendarService<'a> {
    pub fn new(client: &'a reqwest::Client, access_token: &'a str) -> Self {
        Self {
            client,
            access_token,
        }
    }

    fn events_url() -> String {
        format!("{}/calendars/{}/events", CALENDAR_API, CALENDAR_ID)
    }

    /// List events within a time window, expanded and ordered by start time
    pub async fn list(
        &self,
        time_min: &str,
        time_max: &str,
        max_results: i64,
    ) -> Result<EventList> {
        let max_results = max_results.to_string();
        let response = self
            .client
            .get(Self::events_url())
            .bearer_auth(self.access_token)
            .query(&[
                ("timeMin", time_min),
                ("timeMax", time_max),
                ("maxResults", max_results.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?;

        read_json(response, "event list").await
    }

    /// Fetch one event
    pub async fn get(&self, event_id: &str) -> Result<Event> {
        let url = format!("{}/{}", Self::events_url(), event_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.access_token)
            .send()
            .await?;

        read_json(response, &format!("event '{}'", event_id)).await
    }

    /// Create a new event
    pub async fn insert(&self, event: &Event) -> Result<Event> {
        let response = self
            .client
            .post(Self::events_url())
            .bearer_auth(self.access_token)
            .json(event)
            .send()
            .await?;

        read_json(response, "new event").await
    }

    /// Replace a stored event; callers fetch and merge first
    pub async fn update(&self, event_id: &str, event: &Event) -> Result<Event> {
        let url = format!("{}/{}", Self::events_url(), event_id);
        let response = self
            .client
            .put(&url)
            .bearer_auth(self.access_token)
            .json(event)
            .send()
            .await?;

        read_json(response, &format!("event '{}'", event_id)).await
    }

    /// Delete an event
    pub async fn delete(&self, event_id: &str) -> Result<()> {
        let url = format!("{}/{}", Self::events_url(), event_id);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(self.access_token)
            .send()
            .await?;

        check_status(response, &format!("event '{}'", event_id)).await?;
        Ok(())
    }
}
