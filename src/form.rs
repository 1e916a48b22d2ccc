//! What staff fill in to create, edit or transfer events, and how it turns into backend payloads
//!
//! Every form validates its input before anything is sent, and reports problems as [`ConsoleError::Validation`].

use chrono::{NaiveDate, NaiveTime};

use crate::error::ConsoleError;
use crate::event::{Event, EventPatch, EventType, LessonType, NewEvent, DEFAULT_REMINDER_HOURS, MANUAL_SOURCE};
use crate::recurrence::{self, Repeat};

/// Blank strings mean "no value"
fn non_blank(s: &Option<String>) -> Option<String> {
    s.as_ref()
        .map(|s| s.trim())
        .filter(|s| s.is_empty() == false)
        .map(|s| s.to_string())
}


/// Create an event and dispatch its notification right away (`POST /events/send`)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SendForm {
    pub event_type: EventType,
    pub subject: Option<String>,
    pub title: Option<String>,
    pub message: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub reminder_offset_hours: Option<i64>,
}

impl SendForm {
    pub fn to_payload(&self) -> Result<NewEvent, ConsoleError> {
        if self.message.trim().is_empty() {
            return Err(ConsoleError::validation("the message text is required"));
        }
        if self.time.is_some() && self.date.is_none() {
            return Err(ConsoleError::validation("a time was given without a date"));
        }
        let homework = self.event_type.is_homework();

        Ok(NewEvent {
            event_type: self.event_type.clone(),
            subject: non_blank(&self.subject),
            title: non_blank(&self.title),
            body: self.message.clone(),
            date: self.date,
            time: if homework { None } else { self.time },
            end_time: None,
            room: None,
            teacher: None,
            lesson_type: None,
            series_id: None,
            source: None,
            reminder_offset_hours: self.reminder_offset_hours.unwrap_or(DEFAULT_REMINDER_HOURS),
        })
    }
}


/// Create one event, or a series of events, from a day of the calendar (`POST /events`)
#[derive(Clone, Debug, PartialEq)]
pub struct AddEventForm {
    pub date: NaiveDate,
    pub event_type: EventType,
    pub title: Option<String>,
    pub body: Option<String>,
    pub time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub repeat: Repeat,
    pub repeat_until: Option<NaiveDate>,
}

impl AddEventForm {
    /// An empty form for a given day, with the defaults of the calendar
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            event_type: EventType::Schedule,
            title: None,
            body: None,
            time: None,
            end_time: None,
            repeat: Repeat::None,
            repeat_until: None,
        }
    }

    /// One payload per occurrence. Occurrences of a repeating event share a series ID
    pub fn to_payloads(&self) -> Result<Vec<NewEvent>, ConsoleError> {
        let occurrences = recurrence::expand(self.date, self.repeat, self.repeat_until)?;
        if occurrences.dates.is_empty() {
            return Err(ConsoleError::validation("the repeat end date is before the first occurrence"));
        }

        let homework = self.event_type.is_homework();
        let payloads = occurrences.dates.iter()
            .map(|date| NewEvent {
                event_type: self.event_type.clone(),
                subject: None,
                title: non_blank(&self.title),
                body: non_blank(&self.body).unwrap_or_default(),
                date: Some(*date),
                time: if homework { None } else { self.time },
                end_time: if homework { None } else { self.end_time },
                room: None,
                teacher: None,
                lesson_type: None,
                series_id: occurrences.series_id.clone(),
                source: Some(MANUAL_SOURCE.to_string()),
                reminder_offset_hours: DEFAULT_REMINDER_HOURS,
            })
            .collect();
        Ok(payloads)
    }
}


/// Edit an existing event (`PUT /events/{id}`)
#[derive(Clone, Debug, PartialEq)]
pub struct EditForm {
    pub event_type: EventType,
    pub title: Option<String>,
    pub body: Option<String>,
    pub time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub room: Option<String>,
    pub teacher: Option<String>,
    pub lesson_type: LessonType,
    /// Apply the changes to every event of the same series
    pub apply_to_series: bool,
}

impl EditForm {
    /// A form pre-filled with the current values of `event`
    pub fn from_event(event: &Event) -> Self {
        Self {
            event_type: event.event_type().clone(),
            title: event.title().map(String::from),
            body: event.body().map(String::from),
            time: event.time(),
            end_time: event.end_time(),
            room: event.room().map(String::from),
            teacher: event.teacher().map(String::from),
            lesson_type: event.lesson_type().unwrap_or_default(),
            apply_to_series: false,
        }
    }

    pub fn to_patch(&self) -> Result<EventPatch, ConsoleError> {
        let homework = self.event_type.is_homework();
        let (time, end_time) = if homework { (None, None) } else { (self.time, self.end_time) };
        Ok(EventPatch {
            event_type: Some(self.event_type.clone()),
            date: None,
            time: Some(time),
            end_time: Some(end_time),
            title: Some(non_blank(&self.title)),
            body: Some(non_blank(&self.body)),
            room: Some(non_blank(&self.room)),
            teacher: Some(non_blank(&self.teacher)),
            lesson_type: if self.event_type == EventType::Schedule { Some(self.lesson_type) } else { None },
        })
    }
}


/// Move an event to another date and time (`PUT /events/{id}`)
#[derive(Clone, Debug, PartialEq)]
pub struct TransferForm {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub apply_to_series: bool,
}

impl TransferForm {
    /// A form pre-filled with the current date and times of `event`
    pub fn from_event(event: &Event) -> Self {
        Self {
            date: event.date(),
            time: event.time(),
            end_time: event.end_time(),
            apply_to_series: false,
        }
    }

    pub fn to_patch(&self) -> Result<EventPatch, ConsoleError> {
        let date = self.date.ok_or_else(|| ConsoleError::validation("a target date is required"))?;
        Ok(EventPatch {
            date: Some(Some(date)),
            // The time is always sent, so that transferring to an untimed slot clears it
            time: Some(self.time),
            // ...but the end time is only changed when one is given
            end_time: self.end_time.map(Some),
            ..EventPatch::default()
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }
    fn at(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    #[test]
    fn send_form_validation() {
        let mut form = SendForm { message: "   ".to_string(), ..SendForm::default() };
        assert!(matches!(form.to_payload(), Err(ConsoleError::Validation(_))));

        form.message = "Собрание в 12:00".to_string();
        form.time = at(12, 0);
        assert!(matches!(form.to_payload(), Err(ConsoleError::Validation(_))));

        form.date = Some(date("2025-02-03"));
        form.title = Some("  ".to_string());
        let payload = form.to_payload().unwrap();
        assert_eq!(payload.title, None);
        assert_eq!(payload.time, at(12, 0));
        assert_eq!(payload.reminder_offset_hours, 24);
    }

    #[test]
    fn add_form_expands_series() {
        let mut form = AddEventForm::new(date("2025-01-01"));
        form.title = Some("Матанализ".to_string());
        form.time = at(9, 0);
        form.end_time = at(10, 30);
        form.repeat = Repeat::Weekly;
        form.repeat_until = Some(date("2025-01-22"));

        let payloads = form.to_payloads().unwrap();
        assert_eq!(payloads.len(), 4);
        let series = payloads[0].series_id.clone();
        assert!(series.is_some());
        assert!(payloads.iter().all(|p| p.series_id == series));
        assert!(payloads.iter().all(|p| p.source.as_deref() == Some(MANUAL_SOURCE)));
        assert_eq!(payloads[3].date, Some(date("2025-01-22")));
        assert_eq!(payloads[0].time, at(9, 0));
    }

    #[test]
    fn add_form_requires_an_end_date_when_repeating() {
        let mut form = AddEventForm::new(date("2025-01-01"));
        form.repeat = Repeat::Daily;
        assert!(matches!(form.to_payloads(), Err(ConsoleError::Validation(_))));

        form.repeat_until = Some(date("2024-12-31"));
        assert!(matches!(form.to_payloads(), Err(ConsoleError::Validation(_))));
    }

    #[test]
    fn homework_never_has_times() {
        let mut form = AddEventForm::new(date("2025-01-01"));
        form.event_type = EventType::Homework;
        form.time = at(9, 0);
        form.end_time = at(10, 0);
        let payloads = form.to_payloads().unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].time, None);
        assert_eq!(payloads[0].end_time, None);
        assert_eq!(payloads[0].series_id, None);

        let ev = Event::new(3u64, "schedule").with_time(at(9, 0));
        let mut edit = EditForm::from_event(&ev);
        edit.event_type = EventType::Homework;
        let patch = edit.to_patch().unwrap();
        assert_eq!(patch.time, Some(None));
        assert_eq!(patch.end_time, Some(None));
        assert_eq!(patch.lesson_type, None);
    }

    #[test]
    fn edit_form_clears_blank_text() {
        let ev = Event::new(3u64, "schedule").with_title("Old").with_body("text");
        let mut edit = EditForm::from_event(&ev);
        edit.title = Some(String::new());
        edit.lesson_type = LessonType::Practice;
        let patch = edit.to_patch().unwrap();
        assert_eq!(patch.title, Some(None));
        assert_eq!(patch.body, Some(Some("text".to_string())));
        assert_eq!(patch.lesson_type, Some(LessonType::Practice));
    }

    #[test]
    fn overnight_slots_stay_editable() {
        let ev = Event::new(4u64, "schedule")
            .with_date(Some(date("2025-01-10")))
            .with_time(at(23, 0))
            .with_end_time(at(1, 0))
            .with_title("Ночная смена");
        let mut edit = EditForm::from_event(&ev);
        edit.title = Some("Дежурство".to_string());
        let patch = edit.to_patch().unwrap();
        assert_eq!(patch.title, Some(Some("Дежурство".to_string())));
        assert_eq!(patch.time, Some(at(23, 0)));
        assert_eq!(patch.end_time, Some(at(1, 0)));

        let mut add = AddEventForm::new(date("2025-01-10"));
        add.time = at(23, 0);
        add.end_time = at(1, 0);
        let payloads = add.to_payloads().unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].end_time, at(1, 0));
    }

    #[test]
    fn transfer_form() {
        let ev = Event::new(3u64, "schedule")
            .with_date(Some(date("2025-01-01")))
            .with_time(at(9, 0))
            .with_end_time(at(10, 0));
        let mut transfer = TransferForm::from_event(&ev);
        transfer.date = Some(date("2025-01-03"));
        transfer.time = None;
        transfer.end_time = None;
        let patch = transfer.to_patch().unwrap();
        assert_eq!(patch.date, Some(Some(date("2025-01-03"))));
        assert_eq!(patch.time, Some(None));
        assert_eq!(patch.end_time, None);

        transfer.date = None;
        assert!(matches!(transfer.to_patch(), Err(ConsoleError::Validation(_))));
    }
}
