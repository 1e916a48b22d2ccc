//! Calendar events, as exchanged with the backend

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use chrono::{NaiveDate, NaiveTime};

/// The `source` tag of events created straight from the calendar UI
pub const MANUAL_SOURCE: &str = "manual";

/// Reminder offset the backend uses when none is given
pub const DEFAULT_REMINDER_HOURS: i64 = 24;


/// The identifier of an event.
///
/// The backend hands out integers, but this is treated as an opaque string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    content: String,
}

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.content
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self { content: s.to_string() }
    }
}
impl From<String> for EventId {
    fn from(content: String) -> Self {
        Self { content }
    }
}
impl From<u64> for EventId {
    fn from(n: u64) -> Self {
        Self { content: n.to_string() }
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}

/// Used to support serde
impl Serialize for EventId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.content.parse::<i64>() {
            Ok(n) => serializer.serialize_i64(n),
            Err(_) => serializer.serialize_str(&self.content),
        }
    }
}
/// Used to support serde
impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D>(deserializer: D) -> Result<EventId, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
            Other(serde::de::IgnoredAny),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => EventId { content: n.to_string() },
            RawId::Text(content) => EventId { content },
            RawId::Other(_) => EventId::default(),
        })
    }
}


/// The kind of an event.
///
/// The vocabulary is open-ended: tags this crate does not know about are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Schedule,
    Homework,
    Transfer,
    Announcement,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Schedule => "schedule",
            EventType::Homework => "homework",
            EventType::Transfer => "transfer",
            EventType::Announcement => "announcement",
            EventType::Other(s) => s,
        }
    }

    pub fn is_homework(&self) -> bool {
        *self == EventType::Homework
    }
}

impl Default for EventType {
    fn default() -> Self {
        EventType::Other(String::new())
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "schedule" => EventType::Schedule,
            "homework" => EventType::Homework,
            "transfer" => EventType::Transfer,
            "announcement" => EventType::Announcement,
            _ => EventType::Other(s),
        }
    }
}
impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}
impl From<EventType> for String {
    fn from(t: EventType) -> String {
        t.as_str().to_string()
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.as_str())
    }
}


/// The kind of a `schedule` event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonType {
    Lecture,
    Practice,
}

impl Default for LessonType {
    fn default() -> Self {
        LessonType::Lecture
    }
}

impl std::str::FromStr for LessonType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lecture" => Ok(LessonType::Lecture),
            "practice" => Ok(LessonType::Practice),
            other => Err(format!("unknown lesson type {:?}", other)),
        }
    }
}


/// A calendar event, as returned by the backend.
///
/// This is a read-only copy: the backend owns every event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    id: EventId,
    #[serde(rename = "type", deserialize_with = "lenient::event_type")]
    event_type: EventType,

    #[serde(deserialize_with = "lenient::date")]
    date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::time", serialize_with = "wire_time::serialize")]
    time: Option<NaiveTime>,
    #[serde(deserialize_with = "lenient::time", serialize_with = "wire_time::serialize")]
    end_time: Option<NaiveTime>,

    #[serde(deserialize_with = "lenient::string")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    subject: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    body: Option<String>,

    #[serde(deserialize_with = "lenient::string")]
    room: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    teacher: Option<String>,
    #[serde(deserialize_with = "lenient::lesson_type")]
    lesson_type: Option<LessonType>,

    #[serde(deserialize_with = "lenient::string")]
    series_id: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    source: Option<String>,

    #[serde(deserialize_with = "lenient::integer")]
    chat_id: Option<i64>,
    #[serde(deserialize_with = "lenient::integer")]
    topic_thread_id: Option<i64>,
    #[serde(deserialize_with = "lenient::integer")]
    sent_message_id: Option<i64>,
    #[serde(deserialize_with = "lenient::integer")]
    reminder_offset_hours: Option<i64>,
}

impl Event {
    /// Create an event with only an ID and a type. Use the `with_*` methods to fill it
    pub fn new<I: Into<EventId>, T: Into<EventType>>(id: I, event_type: T) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            ..Self::default()
        }
    }

    pub fn with_date(mut self, date: Option<NaiveDate>) -> Self { self.date = date; self }
    pub fn with_time(mut self, time: Option<NaiveTime>) -> Self { self.time = time; self }
    pub fn with_end_time(mut self, end_time: Option<NaiveTime>) -> Self { self.end_time = end_time; self }
    pub fn with_title<S: ToString>(mut self, title: S) -> Self { self.title = Some(title.to_string()); self }
    pub fn with_body<S: ToString>(mut self, body: S) -> Self { self.body = Some(body.to_string()); self }
    pub fn with_source<S: ToString>(mut self, source: S) -> Self { self.source = Some(source.to_string()); self }
    pub fn with_series_id(mut self, series_id: Option<String>) -> Self { self.series_id = series_id; self }

    pub fn id(&self) -> &EventId { &self.id }
    pub fn event_type(&self) -> &EventType { &self.event_type }
    pub fn date(&self) -> Option<NaiveDate> { self.date }
    pub fn time(&self) -> Option<NaiveTime> { self.time }
    pub fn end_time(&self) -> Option<NaiveTime> { self.end_time }
    pub fn title(&self) -> Option<&str> { self.title.as_deref() }
    pub fn subject(&self) -> Option<&str> { self.subject.as_deref() }
    pub fn body(&self) -> Option<&str> { self.body.as_deref() }
    pub fn room(&self) -> Option<&str> { self.room.as_deref() }
    pub fn teacher(&self) -> Option<&str> { self.teacher.as_deref() }
    pub fn lesson_type(&self) -> Option<LessonType> { self.lesson_type }
    pub fn series_id(&self) -> Option<&str> { self.series_id.as_deref() }
    pub fn source(&self) -> Option<&str> { self.source.as_deref() }
    pub fn chat_id(&self) -> Option<i64> { self.chat_id }
    pub fn topic_thread_id(&self) -> Option<i64> { self.topic_thread_id }
    pub fn sent_message_id(&self) -> Option<i64> { self.sent_message_id }
    pub fn reminder_offset_hours(&self) -> i64 {
        self.reminder_offset_hours.unwrap_or(DEFAULT_REMINDER_HOURS)
    }

    pub fn is_homework(&self) -> bool {
        self.event_type.is_homework()
    }

    /// Whether this event has been created from the calendar UI
    pub fn is_manual(&self) -> bool {
        self.source.as_deref() == Some(MANUAL_SOURCE)
    }

    /// The text that best describes this event in a single line
    pub fn display_name(&self) -> &str {
        self.title.as_deref().filter(|t| t.is_empty() == false)
            .or_else(|| self.subject.as_deref().filter(|s| s.is_empty() == false))
            .unwrap_or_else(|| self.event_type.as_str())
    }

    /// Build an event out of a creation payload, the way the backend does when it stores it
    pub fn from_new(id: EventId, new: &NewEvent) -> Self {
        Self {
            id,
            event_type: new.event_type.clone(),
            date: new.date,
            time: new.time,
            end_time: new.end_time,
            title: new.title.clone(),
            subject: new.subject.clone(),
            body: Some(new.body.clone()),
            room: new.room.clone(),
            teacher: new.teacher.clone(),
            lesson_type: new.lesson_type,
            series_id: new.series_id.clone(),
            source: new.source.clone(),
            chat_id: None,
            topic_thread_id: None,
            sent_message_id: None,
            reminder_offset_hours: Some(new.reminder_offset_hours),
        }
    }

    /// Apply a partial update, the way the backend does
    pub fn apply(&mut self, patch: &EventPatch) {
        if let Some(t) = &patch.event_type { self.event_type = t.clone(); }
        if let Some(d) = patch.date { self.date = d; }
        if let Some(t) = patch.time { self.time = t; }
        if let Some(t) = patch.end_time { self.end_time = t; }
        if let Some(t) = &patch.title { self.title = t.clone(); }
        if let Some(b) = &patch.body { self.body = b.clone(); }
        if let Some(r) = &patch.room { self.room = r.clone(); }
        if let Some(t) = &patch.teacher { self.teacher = t.clone(); }
        if let Some(l) = patch.lesson_type { self.lesson_type = Some(l); }
    }
}


/// The payload of `POST /events` and `POST /events/send`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub subject: Option<String>,
    pub title: Option<String>,
    pub body: String,
    pub date: Option<NaiveDate>,
    #[serde(serialize_with = "wire_time::serialize")]
    pub time: Option<NaiveTime>,
    #[serde(serialize_with = "wire_time::serialize")]
    pub end_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_type: Option<LessonType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub reminder_offset_hours: i64,
}


/// The payload of `PUT /events/{id}`.
///
/// For every field, `None` means "leave untouched" and `Some(None)` means "clear it".
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EventPatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "wire_time::serialize_patch")]
    pub time: Option<Option<NaiveTime>>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "wire_time::serialize_patch")]
    pub end_time: Option<Option<NaiveTime>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_type: Option<LessonType>,
}


/// Parses `HH:MM`, `HH:MM:SS` and `HH:MM:SS.ffffff`
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Parses an ISO `YYYY-MM-DD` date. A full ISO timestamp is accepted, and only its date part is kept
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let date_part = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}


/// Times are sent as `HH:MM:SS`
mod wire_time {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => serializer.serialize_str(&t.format("%H:%M:%S").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn serialize_patch<S: Serializer>(time: &Option<Option<NaiveTime>>, serializer: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(inner) => serialize(inner, serializer),
            None => serializer.serialize_none(),
        }
    }
}

/// Deserializers that turn malformed values into `None` instead of failing the whole event
mod lenient {
    use chrono::{NaiveDate, NaiveTime};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::{EventType, LessonType};

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Some(s),
            None | Some(Value::Null) => None,
            Some(other) => {
                log::warn!("Ignoring a non-text event field {}", other);
                None
            },
        })
    }

    /// Integers, or strings that hold one
    pub fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// Anything that is not a string is an unknown type
    pub fn event_type<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EventType, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => EventType::from(s),
            _ => EventType::default(),
        })
    }

    pub fn date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = string(deserializer)?;
        let parsed = raw.as_deref().and_then(super::parse_date);
        if raw.is_some() && parsed.is_none() {
            log::warn!("Ignoring malformed event date {:?}", raw);
        }
        Ok(parsed)
    }

    pub fn time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw = string(deserializer)?;
        let parsed = raw.as_deref().and_then(super::parse_time);
        if raw.is_some() && parsed.is_none() {
            log::warn!("Ignoring malformed event time {:?}", raw);
        }
        Ok(parsed)
    }

    pub fn lesson_type<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<LessonType>, D::Error> {
        Ok(string(deserializer)?.and_then(|s| s.parse().ok()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_backend_event() {
        let json = r#"{
            "id": 42, "type": "schedule", "subject": "Физика", "title": "Лекция", "body": "",
            "date": "2025-03-04", "time": "09:30:00", "end_time": "11:05",
            "room": "101", "teacher": "Иванов", "lesson_type": "practice",
            "series_id": "abc", "source": "manual", "chat_id": -100, "sent_message_id": null
        }"#;
        let ev: Event = serde_json::from_str(json).unwrap();
        assert_eq!(ev.id().as_str(), "42");
        assert_eq!(ev.event_type(), &EventType::Schedule);
        assert_eq!(ev.date(), NaiveDate::from_ymd_opt(2025, 3, 4));
        assert_eq!(ev.time(), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(ev.end_time(), NaiveTime::from_hms_opt(11, 5, 0));
        assert_eq!(ev.lesson_type(), Some(LessonType::Practice));
        assert_eq!(ev.series_id(), Some("abc"));
        assert!(ev.is_manual());
        assert_eq!(ev.chat_id(), Some(-100));
        assert_eq!(ev.reminder_offset_hours(), DEFAULT_REMINDER_HOURS);
        assert_eq!(ev.display_name(), "Лекция");
    }

    #[test]
    fn malformed_fields_become_absent() {
        let json = r#"{"id": "x1", "type": "exam", "date": "next tuesday", "time": 930, "end_time": "25:99"}"#;
        let ev: Event = serde_json::from_str(json).unwrap();
        assert_eq!(ev.event_type(), &EventType::Other("exam".to_string()));
        assert_eq!(ev.date(), None);
        assert_eq!(ev.time(), None);
        assert_eq!(ev.end_time(), None);
        assert_eq!(ev.display_name(), "exam");
    }

    #[test]
    fn wrong_typed_fields_do_not_fail_the_list() {
        let json = r#"[
            {"id": 1, "type": "schedule", "title": "Лекция"},
            {"id": 2, "type": null, "title": 5, "body": ["a"], "chat_id": "-100", "topic_thread_id": "abc", "source": 3}
        ]"#;
        let events: Vec<Event> = serde_json::from_str(json).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].display_name(), "Лекция");
        assert_eq!(events[1].event_type(), &EventType::default());
        assert_eq!(events[1].title(), None);
        assert_eq!(events[1].body(), None);
        assert_eq!(events[1].chat_id(), Some(-100));
        assert_eq!(events[1].topic_thread_id(), None);
        assert!(events[1].is_manual() == false);
    }

    #[test]
    fn type_tags_are_normalized() {
        assert_eq!(EventType::from(" Homework "), EventType::Homework);
        assert!(EventType::from("HOMEWORK").is_homework());
        assert_eq!(EventType::from("Exam"), EventType::Other("Exam".to_string()));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let ev: Event = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(ev.event_type(), &EventType::default());
        assert_eq!(ev.date(), None);
        assert!(ev.is_manual() == false);
    }

    #[test]
    fn patch_distinguishes_clear_from_keep() {
        let patch = EventPatch {
            time: Some(None),
            end_time: Some(NaiveTime::from_hms_opt(10, 0, 0)),
            title: Some(Some("Новое".to_string())),
            ..EventPatch::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, serde_json::json!({"time": null, "end_time": "10:00:00", "title": "Новое"}));
    }

    #[test]
    fn apply_patch() {
        let mut ev = Event::new(1u64, "schedule")
            .with_date(NaiveDate::from_ymd_opt(2025, 1, 1))
            .with_time(NaiveTime::from_hms_opt(9, 0, 0))
            .with_title("Old");
        ev.apply(&EventPatch {
            date: Some(NaiveDate::from_ymd_opt(2025, 1, 2)),
            time: Some(None),
            ..EventPatch::default()
        });
        assert_eq!(ev.date(), NaiveDate::from_ymd_opt(2025, 1, 2));
        assert_eq!(ev.time(), None);
        assert_eq!(ev.title(), Some("Old"));
    }
}
