//! The flat list of events, as opposed to the calendar grid
//!
//! Events created from the calendar UI are hidden here: they are managed from the calendar itself.

use std::sync::Arc;

use crate::error::ConsoleError;
use crate::event::{Event, EventId};
use crate::session::{AdminSession, Privileges};
use crate::traits::{ChatTarget, EventSource};

pub struct EventsList<S: EventSource + ?Sized> {
    source: Arc<S>,
    session: AdminSession,
    events: Vec<Event>,
    error: Option<String>,
}

impl<S: EventSource + ?Sized> EventsList<S> {
    pub fn new(source: Arc<S>, session: AdminSession) -> Self {
        Self { source, session, events: Vec::new(), error: None }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The reason the last load failed, if it did
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn load(&mut self) -> Result<(), ConsoleError> {
        match self.source.events().await {
            Ok(events) => {
                self.events = events.into_iter().filter(|ev| ev.is_manual() == false).collect();
                self.error = None;
                Ok(())
            },
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            },
        }
    }

    /// Reload after a change. A failure here is kept in [`EventsList::error`], the change itself went through
    async fn refresh(&mut self) {
        if let Err(err) = self.load().await {
            log::warn!("Unable to refresh the events list after a change: {}", err);
        }
    }

    pub async fn send_now(&mut self, id: &EventId) -> Result<(), ConsoleError> {
        self.session.require(Privileges::SEND_NOW)?;
        self.source.send_now(id).await?;
        self.refresh().await;
        Ok(())
    }

    pub async fn delete(&mut self, id: &EventId) -> Result<u64, ConsoleError> {
        self.session.require(Privileges::DELETE)?;
        let deleted = self.source.delete_event(id).await?;
        self.refresh().await;
        Ok(deleted)
    }

    /// Where the notifications of an event go. This is a diagnostic, and needs no privilege
    pub async fn resolve_chat(&self, id: &EventId) -> Result<ChatTarget, ConsoleError> {
        self.source.resolve_chat(id).await
    }
}
