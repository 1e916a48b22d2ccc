//! Expansion of repeat rules into concrete dates

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::error::ConsoleError;

/// No repeat rule may produce more occurrences than this
pub const MAX_OCCURRENCES: usize = 500;


/// How often an event repeats
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    None,
    Daily,
    Weekly,
    Biweekly,
}

impl Repeat {
    /// The number of days between two occurrences
    pub fn step_days(&self) -> Option<i64> {
        match self {
            Repeat::None => None,
            Repeat::Daily => Some(1),
            Repeat::Weekly => Some(7),
            Repeat::Biweekly => Some(14),
        }
    }
}

impl Default for Repeat {
    fn default() -> Self {
        Repeat::None
    }
}

impl FromStr for Repeat {
    type Err = ConsoleError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Repeat::None),
            "daily" => Ok(Repeat::Daily),
            "weekly" => Ok(Repeat::Weekly),
            "biweekly" => Ok(Repeat::Biweekly),
            other => Err(ConsoleError::validation(format!("unknown repeat rule {:?}", other))),
        }
    }
}

impl Display for Repeat {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Repeat::None => write!(f, "none"),
            Repeat::Daily => write!(f, "daily"),
            Repeat::Weekly => write!(f, "weekly"),
            Repeat::Biweekly => write!(f, "biweekly"),
        }
    }
}


/// The dates produced by a repeat rule
#[derive(Clone, Debug, PartialEq)]
pub struct Occurrences {
    /// Shared by every occurrence of a repeating rule. `None` for a single event
    pub series_id: Option<String>,
    pub dates: Vec<NaiveDate>,
}

/// Expand a repeat rule starting at `start` (inclusive) and ending at `until` (inclusive).
///
/// `until` is required for repeating rules, and ignored for `Repeat::None`.
/// When `until` is before `start`, the returned list is empty.
pub fn expand(start: NaiveDate, repeat: Repeat, until: Option<NaiveDate>) -> Result<Occurrences, ConsoleError> {
    let step = match repeat.step_days() {
        None => return Ok(Occurrences { series_id: None, dates: vec![start] }),
        Some(step) => Duration::days(step),
    };
    let until = until.ok_or_else(|| ConsoleError::validation("a repeating event needs an end date"))?;

    let mut dates = Vec::new();
    let mut current = start;
    while current <= until && dates.len() < MAX_OCCURRENCES {
        dates.push(current);
        current = match current.checked_add_signed(step) {
            Some(next) => next,
            None => break,
        };
    }
    if dates.len() == MAX_OCCURRENCES && current <= until {
        log::warn!("Repeat rule from {} to {} truncated to {} occurrences", start, until, MAX_OCCURRENCES);
    }

    Ok(Occurrences {
        series_id: Some(new_series_id()),
        dates,
    })
}

/// A fresh, random series identifier
pub fn new_series_id() -> String {
    Uuid::new_v4().to_hyphenated().to_string()
}


#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }
    fn strings(occ: &Occurrences) -> Vec<String> {
        occ.dates.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn weekly() {
        let occ = expand(date("2025-01-01"), Repeat::Weekly, Some(date("2025-01-22"))).unwrap();
        assert_eq!(strings(&occ), vec!["2025-01-01", "2025-01-08", "2025-01-15", "2025-01-22"]);
        assert!(occ.series_id.is_some());
    }

    #[test]
    fn daily_and_biweekly() {
        let occ = expand(date("2024-02-27"), Repeat::Daily, Some(date("2024-03-01"))).unwrap();
        assert_eq!(strings(&occ), vec!["2024-02-27", "2024-02-28", "2024-02-29", "2024-03-01"]);

        let occ = expand(date("2025-01-01"), Repeat::Biweekly, Some(date("2025-01-28"))).unwrap();
        assert_eq!(strings(&occ), vec!["2025-01-01", "2025-01-15"]);
    }

    #[test]
    fn no_repeat_is_a_single_date() {
        let occ = expand(date("2025-05-05"), Repeat::None, None).unwrap();
        assert_eq!(strings(&occ), vec!["2025-05-05"]);
        assert_eq!(occ.series_id, None);

        // The end date is ignored
        let occ = expand(date("2025-05-05"), Repeat::None, Some(date("2025-01-01"))).unwrap();
        assert_eq!(occ.dates.len(), 1);
    }

    #[test]
    fn repeating_without_end_date_fails() {
        let err = expand(date("2025-05-05"), Repeat::Weekly, None).unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
    }

    #[test]
    fn end_before_start_is_empty() {
        let occ = expand(date("2025-05-05"), Repeat::Daily, Some(date("2025-05-04"))).unwrap();
        assert!(occ.dates.is_empty());

        // Same day is a single occurrence
        let occ = expand(date("2025-05-05"), Repeat::Daily, Some(date("2025-05-05"))).unwrap();
        assert_eq!(occ.dates.len(), 1);
    }

    #[test]
    fn runaway_rules_are_capped() {
        let occ = expand(date("2000-01-01"), Repeat::Daily, Some(date("2099-12-31"))).unwrap();
        assert_eq!(occ.dates.len(), MAX_OCCURRENCES);
        assert_eq!(occ.dates[MAX_OCCURRENCES - 1], date("2000-01-01") + Duration::days(MAX_OCCURRENCES as i64 - 1));
    }

    #[test]
    fn series_ids_are_unique() {
        let a = expand(date("2025-01-01"), Repeat::Weekly, Some(date("2025-02-01"))).unwrap();
        let b = expand(date("2025-01-01"), Repeat::Weekly, Some(date("2025-02-01"))).unwrap();
        assert_ne!(a.series_id, b.series_id);
    }

    #[test]
    fn parse_rules() {
        assert_eq!("Weekly".parse::<Repeat>().unwrap(), Repeat::Weekly);
        assert_eq!("".parse::<Repeat>().unwrap(), Repeat::None);
        assert!("monthly".parse::<Repeat>().is_err());
    }
}
