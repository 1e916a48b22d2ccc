//! This module provides a client to connect to the events backend

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, Response};
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::config::Settings;
use crate::error::ConsoleError;
use crate::event::{Event, EventId, EventPatch, NewEvent};
use crate::session::{AdminSession, AdminToken};
use crate::traits::{ChatTarget, EventSource};

/// Error bodies longer than this are cut when reported
const MAX_DETAIL_LEN: usize = 300;

/// The body of bulk deletion replies
#[derive(Debug, Deserialize)]
struct DeleteCount {
    #[serde(default)]
    deleted: Option<u64>,
}


/// An [`EventSource`] that talks to the REST backend.
///
/// Every request carries the admin token of the session (if any) at the time it is sent.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    session: AdminSession,
    http: reqwest::Client,
}

impl Client {
    /// Create a client. This does not start a connection
    pub fn new<S: AsRef<str>>(url: S, session: AdminSession) -> Result<Self, ConsoleError> {
        let base_url = crate::config::parse_backend_url(url.as_ref())?;
        Ok(Self {
            base_url,
            session,
            http: reqwest::Client::new(),
        })
    }

    pub fn from_settings(settings: &Settings, session: AdminSession) -> Result<Self, ConsoleError> {
        Self::new(settings.backend_url.as_str(), session)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &AdminSession {
        &self.session
    }

    /// Build the URL of an endpoint from its path segments. Segments are percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ConsoleError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConsoleError::validation(format!("{} cannot be used as a backend URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request, with the admin token of the session
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let token = self.session.token();
        self.request_with_token(method, url, token.as_ref())
    }

    fn request_with_token(&self, method: Method, url: Url, token: Option<&AdminToken>) -> RequestBuilder {
        log::debug!("{} {}", method, url);
        let user_agent = crate::config::USER_AGENT.lock().unwrap().clone();
        let builder = self.http
            .request(method, url)
            .header(USER_AGENT, user_agent);

        match token {
            None => builder,
            Some(token) => {
                let header_name = crate::config::ADMIN_HEADER.lock().unwrap().clone();
                builder.header(header_name, token.as_str())
            },
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ConsoleError> {
        let response = send(builder).await?;
        Ok(response.json().await?)
    }
}

/// Send a request, and turn non-success statuses into [`ConsoleError::Status`]
async fn send(builder: RequestBuilder) -> Result<Response, ConsoleError> {
    let response = builder.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = error_detail(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
    log::warn!("Request failed with {}: {}", status, detail);
    Err(ConsoleError::Status { status, detail })
}

/// The most useful part of an error body: its `detail` field if it has one, the raw body otherwise
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let detail = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Ok(Value::String(s)) => s,
        _ => body.to_string(),
    };
    Some(detail.chars().take(MAX_DETAIL_LEN).collect())
}

#[async_trait]
impl EventSource for Client {
    async fn calendar(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Event>, ConsoleError> {
        let url = self.endpoint(&["calendar"])?;
        let builder = self.request(Method::GET, url)
            .query(&[("start", start.to_string()), ("end", end.to_string())]);
        let events: Vec<Event> = self.get_json(builder).await?;
        log::debug!("Got {} events between {} and {}", events.len(), start, end);
        Ok(events)
    }

    fn calendar_link(&self, start: NaiveDate, end: NaiveDate) -> String {
        match self.endpoint(&["calendar"]) {
            Err(_) => self.base_url.to_string(),
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("start", &start.to_string())
                    .append_pair("end", &end.to_string());
                url.to_string()
            },
        }
    }

    async fn events(&self) -> Result<Vec<Event>, ConsoleError> {
        let url = self.endpoint(&["events"])?;
        self.get_json(self.request(Method::GET, url)).await
    }

    async fn create_event(&self, event: &NewEvent) -> Result<Event, ConsoleError> {
        let url = self.endpoint(&["events"])?;
        let created: Event = self.get_json(self.request(Method::POST, url).json(event)).await?;
        log::info!("Created event {}", created.id());
        Ok(created)
    }

    async fn create_and_send(&self, event: &NewEvent) -> Result<Event, ConsoleError> {
        let url = self.endpoint(&["events", "send"])?;
        let created: Event = self.get_json(self.request(Method::POST, url).json(event)).await?;
        log::info!("Created and sent event {}", created.id());
        Ok(created)
    }

    async fn update_event(&self, id: &EventId, patch: &EventPatch, apply_to_series: bool) -> Result<Event, ConsoleError> {
        let url = self.endpoint(&["events", id.as_str()])?;
        let mut builder = self.request(Method::PUT, url).json(patch);
        if apply_to_series {
            builder = builder.query(&[("apply_to_series", "true")]);
        }
        let updated: Event = self.get_json(builder).await?;
        log::info!("Updated event {}{}", id, if apply_to_series { " and its series" } else { "" });
        Ok(updated)
    }

    async fn delete_event(&self, id: &EventId) -> Result<u64, ConsoleError> {
        let url = self.endpoint(&["events", id.as_str()])?;
        let response = send(self.request(Method::DELETE, url)).await?;
        // Single deletions may reply with an empty body
        let count = response.json::<DeleteCount>().await.ok()
            .and_then(|c| c.deleted)
            .unwrap_or(1);
        log::info!("Deleted event {}", id);
        Ok(count)
    }

    async fn delete_day(&self, date: NaiveDate) -> Result<u64, ConsoleError> {
        let url = self.endpoint(&["events", "day"])?;
        let builder = self.request(Method::DELETE, url)
            .query(&[("date", date.to_string())]);
        let count: DeleteCount = self.get_json(builder).await?;
        let deleted = count.deleted.unwrap_or(0);
        log::info!("Deleted {} events on {}", deleted, date);
        Ok(deleted)
    }

    async fn delete_month(&self, year: i32, month: u32) -> Result<u64, ConsoleError> {
        let url = self.endpoint(&["events", "month"])?;
        let builder = self.request(Method::DELETE, url)
            .query(&[("year", year.to_string()), ("month", month.to_string())]);
        let count: DeleteCount = self.get_json(builder).await?;
        let deleted = count.deleted.unwrap_or(0);
        log::info!("Deleted {} events in {:04}-{:02}", deleted, year, month);
        Ok(deleted)
    }

    async fn send_now(&self, id: &EventId) -> Result<(), ConsoleError> {
        let url = self.endpoint(&["events", id.as_str(), "send_now"])?;
        send(self.request(Method::POST, url)).await?;
        log::info!("Sent event {}", id);
        Ok(())
    }

    async fn resolve_chat(&self, id: &EventId) -> Result<ChatTarget, ConsoleError> {
        let url = self.endpoint(&["events", id.as_str(), "resolve_chat"])?;
        self.get_json(self.request(Method::GET, url)).await
    }

    async fn validate_token(&self, token: &AdminToken) -> Result<(), ConsoleError> {
        let url = self.endpoint(&["admin", "validate"])?;
        send(self.request_with_token(Method::GET, url, Some(token))).await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_joined_and_escaped() {
        let client = Client::new("http://localhost:8000/api", AdminSession::in_memory()).unwrap();
        assert_eq!(client.endpoint(&["events", "day"]).unwrap().as_str(), "http://localhost:8000/api/events/day");
        assert_eq!(client.endpoint(&["events", "a/b"]).unwrap().as_str(), "http://localhost:8000/api/events/a%2Fb");

        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(client.calendar_link(start, end), "http://localhost:8000/api/calendar?start=2025-01-01&end=2025-01-31");
    }

    #[test]
    fn error_details() {
        assert_eq!(error_detail(r#"{"detail": "event not found"}"#).as_deref(), Some("event not found"));
        assert_eq!(error_detail(r#"{"detail": [{"loc": ["body"]}]}"#).as_deref(), Some(r#"[{"loc":["body"]}]"#));
        assert_eq!(error_detail("Internal Server Error").as_deref(), Some("Internal Server Error"));
        assert_eq!(error_detail("  "), None);
        assert_eq!(error_detail(&"x".repeat(1000)).map(|d| d.len()), Some(MAX_DETAIL_LEN));
    }
}
