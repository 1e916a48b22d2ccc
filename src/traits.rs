use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConsoleError;
use crate::event::{Event, EventId, EventPatch, NewEvent};
use crate::session::AdminToken;


/// Where a notification of an event is (or would be) posted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatTarget {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub thread_id: Option<i64>,
}


/// A backend that owns events.
///
/// This is usually a [`Client`](crate::client::Client) talking to the REST backend.
/// Views only rely on this trait, so that they can be driven by a mocked source as well.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Every event between `start` and `end` (both inclusive)
    async fn calendar(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Event>, ConsoleError>;
    /// A human-usable link to the raw data of [`EventSource::calendar`], for troubleshooting
    fn calendar_link(&self, start: NaiveDate, end: NaiveDate) -> String;
    /// Every event, dated or not
    async fn events(&self) -> Result<Vec<Event>, ConsoleError>;

    async fn create_event(&self, event: &NewEvent) -> Result<Event, ConsoleError>;
    /// Create an event and dispatch its notification right away
    async fn create_and_send(&self, event: &NewEvent) -> Result<Event, ConsoleError>;
    /// Partially update an event, and every event of its series if `apply_to_series` is set
    async fn update_event(&self, id: &EventId, patch: &EventPatch, apply_to_series: bool) -> Result<Event, ConsoleError>;

    /// Delete a single event. Returns the number of deleted events
    async fn delete_event(&self, id: &EventId) -> Result<u64, ConsoleError>;
    /// Delete every event of a day. Returns the number of deleted events
    async fn delete_day(&self, date: NaiveDate) -> Result<u64, ConsoleError>;
    /// Delete every event of a month (`month` is 1-based). Returns the number of deleted events
    async fn delete_month(&self, year: i32, month: u32) -> Result<u64, ConsoleError>;

    /// Dispatch the notification of an existing event right now
    async fn send_now(&self, id: &EventId) -> Result<(), ConsoleError>;
    /// Where the notifications of this event go
    async fn resolve_chat(&self, id: &EventId) -> Result<ChatTarget, ConsoleError>;

    /// Succeeds if and only if the backend accepts this admin token
    async fn validate_token(&self, token: &AdminToken) -> Result<(), ConsoleError>;
}
