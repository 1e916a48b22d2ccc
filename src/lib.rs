//! This crate provides the building blocks of an admin console for a university event-notification backend.
//!
//! It provides a REST client in the [`client`] module, that implements the [`EventSource`](traits::EventSource) trait and can be used as a stand-alone module.
//!
//! On top of any `EventSource`, the [`CalendarView`](view::CalendarView) shows a month of events as a Monday-first grid,
//! and the [`EventsList`](list::EventsList) shows the flat list of events. \
//! Both are driven by an [`AdminSession`](session::AdminSession), that holds the admin token and decides which actions are allowed. \
//! Events are grouped by day in the [`aggregate`] module, colored by the [`classify`] module, and repeated by the [`recurrence`] module.

pub mod traits;

pub mod event;
pub use event::{Event, EventId, EventPatch, EventType, LessonType, NewEvent};
pub mod month;
pub use month::MonthWindow;
pub mod aggregate;
pub mod classify;
pub mod recurrence;
pub mod form;

pub mod session;
pub use session::AdminSession;
pub mod client;
pub use client::Client;
pub mod view;
pub use view::CalendarView;
pub mod list;
pub use list::EventsList;

pub mod config;
pub mod error;
pub use error::ConsoleError;
pub mod utils;

pub mod mock_backend;
