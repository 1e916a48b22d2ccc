//! The calendar view model: one month of events, and the operations staff can run on it
//!
//! A [`CalendarView`] never owns any event: after every change, it fetches the month again from its [`EventSource`].
//! Fetches are stamped with a generation number, so that a slow response for a month the user already left is discarded
//! instead of being painted over the current month.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::aggregate::{aggregate, Agenda};
use crate::error::ConsoleError;
use crate::event::{Event, EventId};
use crate::form::{AddEventForm, EditForm, TransferForm};
use crate::month::MonthWindow;
use crate::session::{AdminSession, Privileges, SessionWatcher};
use crate::traits::EventSource;


/// Why the month could not be displayed
#[derive(Clone, Debug, PartialEq)]
pub struct LoadFailure {
    pub reason: String,
    /// A link to the raw backend data, so that staff can check it by hand
    pub raw_link: String,
}

/// What the calendar grid currently shows
#[derive(Clone, Debug, PartialEq)]
pub enum LoadState {
    /// Nothing has been loaded yet
    Idle,
    Loading,
    Ready(Agenda),
    /// The last fetch failed. No stale data is kept around
    Failed(LoadFailure),
}


/// A fetch that has been started for a given month. See [`CalendarView::begin_load`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    window: MonthWindow,
}

impl FetchTicket {
    pub fn window(&self) -> MonthWindow {
        self.window
    }

    /// Run the fetch this ticket stands for. This does not need to borrow the view
    pub async fn fetch<S: EventSource + ?Sized>(self, source: &S) -> FetchOutcome {
        let (start, end) = self.window.bounds();
        let result = source.calendar(start, end).await;
        FetchOutcome {
            ticket: self,
            raw_link: source.calendar_link(start, end),
            result,
        }
    }
}

/// The result of a [`FetchTicket`], to be handed back to [`CalendarView::finish_load`]
#[derive(Debug)]
pub struct FetchOutcome {
    ticket: FetchTicket,
    raw_link: String,
    result: Result<Vec<Event>, ConsoleError>,
}


/// A day of the grid, with its ordered events
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    pub events: &'a [Event],
}


/// The month calendar
pub struct CalendarView<S: EventSource + ?Sized> {
    source: Arc<S>,
    session: AdminSession,
    window: MonthWindow,
    state: LoadState,
    generation: u64,
    open_day: Option<NaiveDate>,
}

impl<S: EventSource + ?Sized> CalendarView<S> {
    /// Create a view on `window`. Nothing is fetched until [`CalendarView::load`] is called
    pub fn new(source: Arc<S>, session: AdminSession, window: MonthWindow) -> Self {
        Self {
            source,
            session,
            window,
            state: LoadState::Idle,
            generation: 0,
            open_day: None,
        }
    }

    pub fn source(&self) -> &Arc<S> { &self.source }
    pub fn session(&self) -> &AdminSession { &self.session }
    pub fn window(&self) -> MonthWindow { self.window }
    pub fn state(&self) -> &LoadState { &self.state }

    /// The events of the current month, if they are loaded
    pub fn agenda(&self) -> Option<&Agenda> {
        match &self.state {
            LoadState::Ready(agenda) => Some(agenda),
            _ => None,
        }
    }

    /// Whether controls that need `privileges` should be shown
    pub fn can(&self, privileges: Privileges) -> bool {
        self.session.privileges().contains(privileges)
    }

    /// Get notified when the admin token changes, e.g. to show or hide privileged controls
    pub fn watch_session(&self) -> SessionWatcher {
        self.session.subscribe()
    }

    /// The Monday-first grid of the current month. Padding cells are `None`
    pub fn cells(&self) -> Vec<Option<DayCell<'_>>> {
        self.window.cells().into_iter()
            .map(|cell| cell.map(|date| DayCell { date, events: self.events_on(date) }))
            .collect()
    }

    pub fn events_on(&self, date: NaiveDate) -> &[Event] {
        self.agenda().map(|a| a.events_on(date)).unwrap_or(&[])
    }

    pub fn undated(&self) -> &[Event] {
        self.agenda().map(|a| a.undated()).unwrap_or(&[])
    }

    /// Show the details of a day
    pub fn open_day(&mut self, date: NaiveDate) {
        self.open_day = Some(date);
    }

    pub fn close_day(&mut self) {
        self.open_day = None;
    }

    pub fn opened_day(&self) -> Option<NaiveDate> {
        self.open_day
    }

    /// Start fetching the current month. Any fetch started before is now stale
    pub fn begin_load(&mut self) -> FetchTicket {
        self.generation += 1;
        self.state = LoadState::Loading;
        log::debug!("Loading {} (generation {})", self.window, self.generation);
        FetchTicket { generation: self.generation, window: self.window }
    }

    /// Apply the result of a fetch.
    ///
    /// Returns `Ok(false)` if the fetch is stale (another one has been started since) and has been discarded.
    /// A failed fetch replaces the displayed month with a [`LoadFailure`], and its error is returned.
    pub fn finish_load(&mut self, outcome: FetchOutcome) -> Result<bool, ConsoleError> {
        if outcome.ticket.generation != self.generation {
            log::warn!("Discarding a stale response for {} (generation {}, current is {})",
                outcome.ticket.window, outcome.ticket.generation, self.generation);
            return Ok(false);
        }

        match outcome.result {
            Ok(events) => {
                self.state = LoadState::Ready(aggregate(events));
                Ok(true)
            },
            Err(err) => {
                log::warn!("Unable to load {}: {}", outcome.ticket.window, err);
                self.state = LoadState::Failed(LoadFailure {
                    reason: err.to_string(),
                    raw_link: outcome.raw_link,
                });
                Err(err)
            },
        }
    }

    /// Fetch the current month from the backend
    pub async fn load(&mut self) -> Result<(), ConsoleError> {
        let ticket = self.begin_load();
        let source = Arc::clone(&self.source);
        let outcome = ticket.fetch(source.as_ref()).await;
        self.finish_load(outcome).map(|_| ())
    }

    /// Same as `load`, for the "retry" button of a failed month
    pub async fn retry(&mut self) -> Result<(), ConsoleError> {
        self.load().await
    }

    pub async fn go_to(&mut self, window: MonthWindow) -> Result<(), ConsoleError> {
        self.window = window;
        self.open_day = None;
        self.load().await
    }

    pub async fn prev(&mut self) -> Result<(), ConsoleError> {
        self.go_to(self.window.prev()).await
    }

    pub async fn next(&mut self) -> Result<(), ConsoleError> {
        self.go_to(self.window.next()).await
    }

    pub async fn today(&mut self) -> Result<(), ConsoleError> {
        self.go_to(MonthWindow::today()).await
    }

    /// Refetch after a change. A failure here is already visible in the load state
    async fn refresh(&mut self) {
        if let Err(err) = self.load().await {
            log::warn!("Unable to refresh the calendar after a change: {}", err);
        }
    }

    /// Create one event, or a whole series. Returns the created events
    pub async fn create(&mut self, form: &AddEventForm) -> Result<Vec<Event>, ConsoleError> {
        let payloads = form.to_payloads()?;
        let mut created = Vec::with_capacity(payloads.len());
        let mut failure = None;
        for payload in &payloads {
            match self.source.create_event(payload).await {
                Ok(ev) => created.push(ev),
                Err(err) => {
                    failure = Some(err);
                    break;
                },
            }
        }
        log::info!("Created {} of {} events", created.len(), payloads.len());
        self.refresh().await;

        match failure {
            Some(err) => Err(err),
            None => Ok(created),
        }
    }

    pub async fn edit(&mut self, id: &EventId, form: &EditForm) -> Result<Event, ConsoleError> {
        self.session.require(Privileges::EDIT)?;
        let patch = form.to_patch()?;
        let result = self.source.update_event(id, &patch, form.apply_to_series).await;
        self.refresh().await;
        result
    }

    pub async fn transfer(&mut self, id: &EventId, form: &TransferForm) -> Result<Event, ConsoleError> {
        self.session.require(Privileges::EDIT)?;
        let patch = form.to_patch()?;
        let result = self.source.update_event(id, &patch, form.apply_to_series).await;
        self.refresh().await;
        result
    }

    /// Delete one event. The opened day is closed if it has no events left
    pub async fn delete_event(&mut self, id: &EventId) -> Result<u64, ConsoleError> {
        self.session.require(Privileges::DELETE)?;
        let deleted = self.source.delete_event(id).await?;
        self.refresh().await;
        if let Some(day) = self.open_day {
            if self.events_on(day).is_empty() {
                self.open_day = None;
            }
        }
        Ok(deleted)
    }

    /// Delete every event of a day
    pub async fn delete_day(&mut self, date: NaiveDate) -> Result<u64, ConsoleError> {
        self.session.require(Privileges::BULK_DELETE)?;
        let deleted = self.source.delete_day(date).await?;
        if self.open_day == Some(date) {
            self.open_day = None;
        }
        self.refresh().await;
        Ok(deleted)
    }

    /// Delete every event of the displayed month
    pub async fn delete_month(&mut self) -> Result<u64, ConsoleError> {
        self.session.require(Privileges::BULK_DELETE)?;
        let deleted = self.source.delete_month(self.window.year(), self.window.month()).await?;
        self.open_day = None;
        self.refresh().await;
        Ok(deleted)
    }

    /// Dispatch the notification of an event right now
    pub async fn send_now(&mut self, id: &EventId) -> Result<(), ConsoleError> {
        self.session.require(Privileges::SEND_NOW)?;
        self.source.send_now(id).await?;
        self.refresh().await;
        Ok(())
    }
}
