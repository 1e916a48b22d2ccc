//! Colors and labels of events, for calendar chips and list rows
//!
//! This is a heuristic: it looks for keywords in the type tag, and the free text of an event may override its declared type.
//! It is not an authoritative classification of events.

use csscolorparser::Color;

use crate::event::Event;

/// Words in a title or a body that make an event look like a transfer, whatever its declared type
const TRANSFER_TEXT_KEYWORDS: [&str; 2] = ["перенос", "перенес"];

/// Color of events that have no type at all
const MISSING_TYPE_COLOR: &str = "#6b7280";
/// Color of events whose type is unknown
const UNKNOWN_TYPE_COLOR: &str = "#9ca3af";

/// A display category, and the substrings of a type tag that select it
struct Category {
    kind: Kind,
    keywords: &'static [&'static str],
    /// Only matched at the start of the type tag
    prefixes: &'static [&'static str],
    color: &'static str,
    label: &'static str,
}

impl Category {
    fn matches(&self, normalized: &str) -> bool {
        self.keywords.iter().any(|kw| normalized.contains(kw))
            || self.prefixes.iter().any(|p| normalized.starts_with(p))
    }
}

/// The known display categories
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Transfer,
    Homework,
    Schedule,
    Announcement,
    Exam,
}

/// Categories are tried in order, the first match wins
static CATEGORIES: [Category; 5] = [
    Category { kind: Kind::Transfer,     keywords: &["transfer", "перенос"],               prefixes: &[],       color: "#ef4444", label: "Перенос" },
    Category { kind: Kind::Homework,     keywords: &["homework", "домаш"],                 prefixes: &["home"], color: "#a78bfa", label: "Домашняя работа" },
    Category { kind: Kind::Schedule,     keywords: &["schedule", "расписание"],            prefixes: &[],       color: "#60a5fa", label: "Расписание" },
    Category { kind: Kind::Announcement, keywords: &["announcement", "объявлен"],          prefixes: &[],       color: "#34d399", label: "Объявление" },
    Category { kind: Kind::Exam,         keywords: &["exam", "экзамен", "зачет", "зачёт"], prefixes: &[],       color: "#f59e0b", label: "Экзамен" },
];


/// How an event should be displayed
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    /// `None` when the type did not match any known category
    pub kind: Option<Kind>,
    pub color: Color,
    pub label: String,
}

impl Classification {
    /// The color as a `#rrggbb` string
    pub fn hex_color(&self) -> String {
        self.color.to_hex_string()
    }

    /// The color as 8-bit RGB components
    pub fn rgb(&self) -> (u8, u8, u8) {
        let to_u8 = |c: f64| (c.max(0.0).min(1.0) * 255.0).round() as u8;
        (to_u8(self.color.r), to_u8(self.color.g), to_u8(self.color.b))
    }
}


/// Decide how an event is displayed.
///
/// A transfer keyword in the title or the body wins over the declared type. Otherwise, the normalized type is matched against known keywords.
pub fn classify(event: &Event) -> Classification {
    if mentions_transfer(event) {
        return from_category(&CATEGORIES[0]);
    }
    classify_type(event.event_type().as_str())
}

/// Decide how a bare type tag is displayed, without looking at the event text
pub fn classify_type(type_tag: &str) -> Classification {
    let normalized = type_tag.trim().to_lowercase();
    if normalized.is_empty() {
        return Classification { kind: None, color: color(MISSING_TYPE_COLOR), label: String::new() };
    }

    match CATEGORIES.iter().find(|cat| cat.matches(&normalized)) {
        Some(cat) => from_category(cat),
        None => Classification { kind: None, color: color(UNKNOWN_TYPE_COLOR), label: type_tag.to_string() },
    }
}

/// The legend shown next to the calendar: every known category with its color and label
pub fn legend() -> Vec<Classification> {
    CATEGORIES.iter().map(from_category).collect()
}

fn mentions_transfer(event: &Event) -> bool {
    [event.title(), event.body()].iter()
        .flatten()
        .map(|text| text.to_lowercase())
        .any(|text| TRANSFER_TEXT_KEYWORDS.iter().any(|kw| text.contains(kw)))
}

fn from_category(cat: &Category) -> Classification {
    Classification { kind: Some(cat.kind), color: color(cat.color), label: cat.label.to_string() }
}

fn color(hex: &str) -> Color {
    csscolorparser::parse(hex).unwrap_or_else(|err| {
        log::warn!("Invalid color {:?}: {}", hex, err);
        Color { r: 0.5, g: 0.5, b: 0.5, a: 1.0 }
    })
}
