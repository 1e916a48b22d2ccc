//! Partition a flat list of events into per-day buckets

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::event::Event;


/// Events grouped by day, plus the events that have no date at all
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Agenda {
    by_date: BTreeMap<NaiveDate, Vec<Event>>,
    undated: Vec<Event>,
}

impl Agenda {
    /// Every date that has at least one event, with its ordered events
    pub fn by_date(&self) -> &BTreeMap<NaiveDate, Vec<Event>> {
        &self.by_date
    }

    /// The ordered events of a given day (an empty slice if there are none)
    pub fn events_on(&self, date: NaiveDate) -> &[Event] {
        self.by_date.get(&date).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Events that have no date. They are never shown on the grid
    pub fn undated(&self) -> &[Event] {
        &self.undated
    }

    /// Total number of events, dated or not
    pub fn len(&self) -> usize {
        self.by_date.values().map(|v| v.len()).sum::<usize>() + self.undated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


/// Group events by date.
///
/// Within a day, homework comes first, then the other events by ascending time, events without a time last.
/// The sort is stable, so that events that compare equal keep the order the backend sent them in.
pub fn aggregate<I>(events: I) -> Agenda
where
    I: IntoIterator<Item = Event>,
{
    let mut agenda = Agenda::default();
    for event in events {
        match event.date() {
            None => agenda.undated.push(event),
            Some(date) => agenda.by_date.entry(date).or_insert_with(Vec::new).push(event),
        }
    }

    for day in agenda.by_date.values_mut() {
        day.sort_by(day_order);
    }
    log::debug!("Aggregated {} events over {} days ({} undated)", agenda.len(), agenda.by_date.len(), agenda.undated.len());
    agenda
}

/// The order of events within a single day
pub fn day_order(a: &Event, b: &Event) -> Ordering {
    match (a.is_homework(), b.is_homework()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (true, true) => return Ordering::Equal,
        (false, false) => {},
    }

    match (a.time(), b.time()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(ta), Some(tb)) => ta.cmp(&tb),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 1, d)
    }
    fn at(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.id().as_str()).collect()
    }

    #[test]
    fn partition_is_exhaustive_and_disjoint() {
        let events = vec![
            Event::new("a", "schedule").with_date(day(1)),
            Event::new("b", "announcement"),
            Event::new("c", "homework").with_date(day(2)),
            Event::new("d", "schedule").with_date(day(1)),
            Event::new("e", "transfer"),
        ];
        let agenda = aggregate(events);

        assert_eq!(agenda.len(), 5);
        assert_eq!(ids(agenda.undated()), vec!["b", "e"]);
        assert!(agenda.undated().iter().all(|e| e.date().is_none()));
        for (date, evs) in agenda.by_date() {
            assert!(evs.iter().all(|e| e.date() == Some(*date)));
        }
        assert_eq!(ids(agenda.events_on(day(1).unwrap())), vec!["a", "d"]);
        assert!(agenda.events_on(day(3).unwrap()).is_empty());
    }

    #[test]
    fn homework_first_then_time_then_untimed() {
        let events = vec![
            Event::new("late", "schedule").with_date(day(5)).with_time(at(15, 0)),
            Event::new("untimed", "announcement").with_date(day(5)),
            Event::new("hw1", "homework").with_date(day(5)),
            Event::new("early", "schedule").with_date(day(5)).with_time(at(8, 30)),
            Event::new("hw2", "homework").with_date(day(5)).with_time(at(7, 0)),
            Event::new("untimed2", "transfer").with_date(day(5)),
            Event::new("noon", "transfer").with_date(day(5)).with_time(at(12, 0)),
        ];
        let agenda = aggregate(events);
        assert_eq!(
            ids(agenda.events_on(day(5).unwrap())),
            vec!["hw1", "hw2", "early", "noon", "late", "untimed", "untimed2"]
        );
    }

    #[test]
    fn equal_keys_keep_backend_order() {
        let events = vec![
            Event::new("x", "schedule").with_date(day(9)).with_time(at(10, 0)),
            Event::new("y", "announcement").with_date(day(9)).with_time(at(10, 0)),
            Event::new("z", "schedule").with_date(day(9)).with_time(at(10, 0)),
        ];
        let agenda = aggregate(events);
        assert_eq!(ids(agenda.events_on(day(9).unwrap())), vec!["x", "y", "z"]);
    }

    #[test]
    fn empty_input() {
        let agenda = aggregate(Vec::new());
        assert!(agenda.is_empty());
        assert!(agenda.by_date().is_empty());
    }
}
