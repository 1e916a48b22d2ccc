//! An in-memory backend, with ways to tweak it so that it returns errors on some tests
#![cfg(any(test, feature = "mock_backend"))]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest::StatusCode;

use crate::error::ConsoleError;
use crate::event::{Event, EventId, EventPatch, NewEvent};
use crate::session::AdminToken;
use crate::traits::{ChatTarget, EventSource};

/// This stores some behaviour tweaks, that describe how a mocked backend will behave during a given test
///
/// So that a functions fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,

    pub calendar_behaviour: (u32, u32),
    pub create_behaviour: (u32, u32),
    pub update_behaviour: (u32, u32),
    pub delete_behaviour: (u32, u32),
    pub send_now_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All actions will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            calendar_behaviour: (0, n_fails),
            create_behaviour: (0, n_fails),
            update_behaviour: (0, n_fails),
            delete_behaviour: (0, n_fails),
            send_now_behaviour: (0, n_fails),
        }
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_get_calendar(&mut self) -> Result<(), ConsoleError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.calendar_behaviour, "get_calendar")
    }
    pub fn can_create(&mut self) -> Result<(), ConsoleError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.create_behaviour, "create")
    }
    pub fn can_update(&mut self) -> Result<(), ConsoleError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.update_behaviour, "update")
    }
    pub fn can_delete(&mut self) -> Result<(), ConsoleError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.delete_behaviour, "delete")
    }
    pub fn can_send_now(&mut self) -> Result<(), ConsoleError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.send_now_behaviour, "send_now")
    }
}


/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str) -> Result<(), ConsoleError> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 = value.0 - 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else {
        if remaining_failures > 0 {
            value.1 = value.1 - 1;
            log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
            Err(ConsoleError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                detail: format!("Mocked behaviour requires this {} to fail this time. ({:?})", descr, value),
            })
        } else {
            log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
            Ok(())
        }
    }
}


#[derive(Default, Debug)]
struct MockState {
    events: Vec<Event>,
    next_id: u64,
    behaviour: MockBehaviour,
    /// Every call this backend has received, e.g. `calendar 2025-01-01 2025-01-31`
    calls: Vec<String>,
    /// Events that have been sent, in order
    sent: Vec<EventId>,
}

/// An [`EventSource`] that keeps its events in memory
#[derive(Debug)]
pub struct MockBackend {
    state: Mutex<MockState>,
    admin_token: Option<String>,
}

impl MockBackend {
    /// A backend that accepts `admin_token` (if any) as the only valid admin token
    pub fn new(admin_token: Option<&str>) -> Self {
        Self {
            state: Mutex::new(MockState { next_id: 1, ..MockState::default() }),
            admin_token: admin_token.map(String::from),
        }
    }

    /// Add events as if they had been created by someone else
    pub fn with_events(self, events: Vec<Event>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_id += events.len() as u64;
            state.events.extend(events);
        }
        self
    }

    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        self.state.lock().unwrap().behaviour = behaviour;
    }

    pub fn events_snapshot(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// How many times the calendar has been fetched
    pub fn calendar_fetches(&self) -> usize {
        self.calls().iter().filter(|c| c.starts_with("calendar ")).count()
    }

    pub fn sent(&self) -> Vec<EventId> {
        self.state.lock().unwrap().sent.clone()
    }

    fn record(state: &mut MockState, call: String) {
        log::debug!("Mock backend: {}", call);
        state.calls.push(call);
    }

    fn not_found(id: &EventId) -> ConsoleError {
        ConsoleError::Status { status: StatusCode::NOT_FOUND, detail: format!("event {} not found", id) }
    }

    fn insert(&self, new: &NewEvent, call: &str) -> Result<Event, ConsoleError> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, call.to_string());
        state.behaviour.can_create()?;
        let id = EventId::from(state.next_id);
        state.next_id += 1;
        let event = Event::from_new(id, new);
        state.events.push(event.clone());
        Ok(event)
    }

    fn delete_where<F: Fn(&Event) -> bool>(&self, call: String, predicate: F) -> Result<u64, ConsoleError> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, call);
        state.behaviour.can_delete()?;
        let before = state.events.len();
        state.events.retain(|ev| predicate(ev) == false);
        Ok((before - state.events.len()) as u64)
    }
}

#[async_trait]
impl EventSource for MockBackend {
    async fn calendar(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Event>, ConsoleError> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, format!("calendar {} {}", start, end));
        state.behaviour.can_get_calendar()?;
        // Undated events are part of every calendar query
        Ok(state.events.iter()
            .filter(|ev| ev.date().map(|d| d >= start && d <= end).unwrap_or(true))
            .cloned()
            .collect())
    }

    fn calendar_link(&self, start: NaiveDate, end: NaiveDate) -> String {
        format!("mock://calendar?start={}&end={}", start, end)
    }

    async fn events(&self) -> Result<Vec<Event>, ConsoleError> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "events".to_string());
        state.behaviour.can_get_calendar()?;
        Ok(state.events.clone())
    }

    async fn create_event(&self, event: &NewEvent) -> Result<Event, ConsoleError> {
        self.insert(event, "create")
    }

    async fn create_and_send(&self, event: &NewEvent) -> Result<Event, ConsoleError> {
        let created = self.insert(event, "create_and_send")?;
        self.state.lock().unwrap().sent.push(created.id().clone());
        Ok(created)
    }

    async fn update_event(&self, id: &EventId, patch: &EventPatch, apply_to_series: bool) -> Result<Event, ConsoleError> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, format!("update {} series={}", id, apply_to_series));
        state.behaviour.can_update()?;

        let target = state.events.iter().find(|ev| ev.id() == id).cloned().ok_or_else(|| Self::not_found(id))?;
        let series = if apply_to_series { target.series_id().map(String::from) } else { None };
        let mut updated = None;
        for ev in state.events.iter_mut() {
            let in_series = series.is_some() && ev.series_id() == series.as_deref();
            if ev.id() == id || in_series {
                ev.apply(patch);
                if ev.id() == id {
                    updated = Some(ev.clone());
                }
            }
        }
        updated.ok_or_else(|| Self::not_found(id))
    }

    async fn delete_event(&self, id: &EventId) -> Result<u64, ConsoleError> {
        let deleted = self.delete_where(format!("delete {}", id), |ev| ev.id() == id)?;
        if deleted == 0 {
            return Err(Self::not_found(id));
        }
        Ok(deleted)
    }

    async fn delete_day(&self, date: NaiveDate) -> Result<u64, ConsoleError> {
        self.delete_where(format!("delete_day {}", date), |ev| ev.date() == Some(date))
    }

    async fn delete_month(&self, year: i32, month: u32) -> Result<u64, ConsoleError> {
        self.delete_where(format!("delete_month {} {}", year, month), |ev| {
            ev.date().map(|d| d.year() == year && d.month() == month).unwrap_or(false)
        })
    }

    async fn send_now(&self, id: &EventId) -> Result<(), ConsoleError> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, format!("send_now {}", id));
        state.behaviour.can_send_now()?;
        if state.events.iter().any(|ev| ev.id() == id) == false {
            return Err(Self::not_found(id));
        }
        state.sent.push(id.clone());
        Ok(())
    }

    async fn resolve_chat(&self, id: &EventId) -> Result<ChatTarget, ConsoleError> {
        let state = self.state.lock().unwrap();
        let event = state.events.iter().find(|ev| ev.id() == id).ok_or_else(|| Self::not_found(id))?;
        Ok(ChatTarget {
            kind: Some(event.event_type().to_string()),
            chat_id: event.chat_id(),
            thread_id: event.topic_thread_id(),
        })
    }

    async fn validate_token(&self, token: &AdminToken) -> Result<(), ConsoleError> {
        match &self.admin_token {
            Some(valid) if valid == token.as_str() => Ok(()),
            _ => Err(ConsoleError::Status { status: StatusCode::UNAUTHORIZED, detail: "invalid admin token".to_string() }),
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mock_behaviour() {
        let mut ok = MockBehaviour::new();
        assert!(ok.can_get_calendar().is_ok());
        assert!(ok.can_get_calendar().is_ok());
        assert!(ok.can_get_calendar().is_ok());

        let mut now = MockBehaviour::fail_now(2);
        assert!(now.can_get_calendar().is_err());
        assert!(now.can_create().is_err());
        assert!(now.can_create().is_err());
        assert!(now.can_get_calendar().is_err());
        assert!(now.can_get_calendar().is_ok());
        assert!(now.can_create().is_ok());

        let mut custom = MockBehaviour{
            calendar_behaviour: (0,1),
            delete_behaviour: (1,2),
            ..MockBehaviour::default()
        };
        assert!(custom.can_get_calendar().is_err());
        assert!(custom.can_get_calendar().is_ok());
        assert!(custom.can_delete().is_ok());
        assert!(custom.can_delete().is_err());
        assert!(custom.can_delete().is_err());
        assert!(custom.can_delete().is_ok());

        custom.delete_behaviour = (0, 1);
        custom.suspend();
        assert!(custom.can_delete().is_ok());
        custom.resume();
        assert!(custom.can_delete().is_err());
    }
}
