///! Some utility functions to display calendars in a terminal

use chrono::{Datelike, NaiveDate};
use colored::Colorize;

use crate::classify::{classify, legend, Classification};
use crate::event::Event;
use crate::month::WEEKDAY_HEADERS;
use crate::traits::EventSource;
use crate::view::{CalendarView, LoadFailure, LoadState};

/// Width of a day column, in characters
const CELL_WIDTH: usize = 16;
/// How many events a day cell shows before summarizing the rest
pub const CHIP_LIMIT: usize = 3;


/// Cut `text` to `width` characters (adding an ellipsis when it is too long), then pad it to exactly `width`
fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        format!("{}{}", text, " ".repeat(width - count))
    }
}

fn paint(text: &str, class: &Classification, color: bool) -> String {
    if color {
        let (r, g, b) = class.rgb();
        text.white().on_truecolor(r, g, b).to_string()
    } else {
        text.to_string()
    }
}

/// A one-line summary of an event for a day cell, e.g. `09:30 Лекция`
fn chip_text(event: &Event) -> String {
    match event.time() {
        Some(t) => format!("{} {}", t.format("%H:%M"), event.display_name()),
        None => event.display_name().to_string(),
    }
}

/// The color legend
pub fn render_legend(color: bool) -> String {
    legend().iter()
        .map(|class| format!("{} {}", paint("  ", class, color), class.label))
        .collect::<Vec<_>>()
        .join("   ")
}

/// The whole month grid, with a header, the legend and the undated events
pub fn render_month<S: EventSource + ?Sized>(view: &CalendarView<S>, color: bool) -> String {
    let mut out = String::new();
    out.push_str(&view.window().label());
    out.push('\n');
    out.push_str(&render_legend(color));
    out.push_str("\n\n");

    match view.state() {
        LoadState::Failed(failure) => {
            out.push_str(&render_failure(failure));
            return out;
        },
        LoadState::Idle | LoadState::Loading => {
            out.push_str("Загрузка...\n");
            return out;
        },
        LoadState::Ready(_) => {},
    }

    let header: Vec<String> = WEEKDAY_HEADERS.iter().map(|d| fit(d, CELL_WIDTH)).collect();
    out.push_str(header.join("|").trim_end());
    out.push('\n');

    let mut cells = view.cells();
    while cells.len() % 7 != 0 {
        cells.push(None);
    }

    for week in cells.chunks(7) {
        out.push_str(&"-".repeat(7 * CELL_WIDTH + 6));
        out.push('\n');

        let numbers: Vec<String> = week.iter()
            .map(|cell| match cell {
                Some(day) => fit(&day.date.day().to_string(), CELL_WIDTH),
                None => fit("", CELL_WIDTH),
            })
            .collect();
        out.push_str(numbers.join("|").trim_end());
        out.push('\n');

        for line in 0..=CHIP_LIMIT {
            let texts: Vec<String> = week.iter()
                .map(|cell| {
                    let events = cell.map(|day| day.events).unwrap_or(&[]);
                    if line < CHIP_LIMIT {
                        match events.get(line) {
                            Some(ev) => paint(&fit(&chip_text(ev), CELL_WIDTH), &classify(ev), color),
                            None => fit("", CELL_WIDTH),
                        }
                    } else if events.len() > CHIP_LIMIT {
                        fit(&format!("+{} ещё", events.len() - CHIP_LIMIT), CELL_WIDTH)
                    } else {
                        fit("", CELL_WIDTH)
                    }
                })
                .collect();
            let joined = texts.join("|");
            if joined.trim().replace('|', "").is_empty() == false {
                out.push_str(joined.trim_end());
                out.push('\n');
            }
        }
    }

    let undated = view.undated();
    if undated.is_empty() == false {
        out.push_str("\nБез даты:\n");
        for ev in undated {
            out.push_str(&render_event_line(ev, color));
            out.push('\n');
        }
    }
    out
}

/// The details of a day
pub fn render_day(date: NaiveDate, events: &[Event], color: bool) -> String {
    let mut out = format!("События за {}\n", date);
    if events.is_empty() {
        out.push_str("Событий нет.\n");
    }
    for ev in events {
        out.push_str(&render_event_line(ev, color));
        out.push('\n');
        if let Some(body) = ev.body().filter(|b| b.trim().is_empty() == false) {
            out.push_str(&format!("        {}\n", body.trim()));
        }
    }
    out
}

/// A single event: its ID, its category, its time and its name
pub fn render_event_line(event: &Event, color: bool) -> String {
    let class = classify(event);
    let label = if class.label.is_empty() { "?".to_string() } else { class.label.clone() };
    let time = match (event.time(), event.end_time()) {
        (Some(start), Some(end)) => format!("{}-{}", start.format("%H:%M"), end.format("%H:%M")),
        (Some(start), None) => start.format("%H:%M").to_string(),
        _ => String::new(),
    };
    let mut line = format!("  #{:<5} {} {:<11} {}", event.id(), paint(&format!(" {} ", label), &class, color), time, event.display_name());
    if let Some(room) = event.room() {
        line.push_str(&format!(" ({})", room));
    }
    line.trim_end().to_string()
}

/// The error panel shown instead of a month that could not be loaded
pub fn render_failure(failure: &LoadFailure) -> String {
    format!(
        "Не удалось загрузить события\nПричина: {}\nПроверьте доступность бэкенда и повторите попытку.\nДанные: {}\n",
        failure.reason, failure.raw_link
    )
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use chrono::NaiveTime;

    use crate::mock_backend::{MockBackend, MockBehaviour};
    use crate::month::MonthWindow;
    use crate::session::AdminSession;

    #[test]
    fn fit_cuts_and_pads() {
        assert_eq!(fit("abc", 5), "abc  ");
        assert_eq!(fit("Домашняя работа", 5), "Дома…");
        assert_eq!(fit("", 2), "  ");
    }

    #[test]
    fn event_lines() {
        let ev = Event::new(7u64, "schedule")
            .with_time(NaiveTime::from_hms_opt(9, 30, 0))
            .with_end_time(NaiveTime::from_hms_opt(11, 5, 0))
            .with_title("Лекция");
        let line = render_event_line(&ev, false);
        assert!(line.contains("#7"));
        assert!(line.contains("Расписание"));
        assert!(line.contains("09:30-11:05"));
        assert!(line.ends_with("Лекция"));
    }

    #[tokio::test]
    async fn month_grid() {
        let day = |d| NaiveDate::from_ymd_opt(2025, 1, d);
        let events = (0..5)
            .map(|i| Event::new(i as u64 + 1, "schedule").with_date(day(15)).with_title(format!("Пара {}", i + 1)))
            .chain(std::iter::once(Event::new(9u64, "announcement").with_title("Без даты")))
            .collect();
        let backend = Arc::new(MockBackend::new(None).with_events(events));
        let mut view = CalendarView::new(backend, AdminSession::in_memory(), MonthWindow::new(2025, 0));
        view.load().await.unwrap();

        let text = render_month(&view, false);
        assert!(text.starts_with("январь 2025 г."));
        assert!(text.contains("Пн"));
        assert!(text.contains("Пара 3"));
        assert!(text.contains("Пара 4") == false);
        assert!(text.contains("+2 ещё"));
        assert!(text.contains("Без даты:"));
    }

    #[tokio::test]
    async fn failed_month() {
        let backend = Arc::new(MockBackend::new(None));
        backend.set_behaviour(MockBehaviour::fail_now(1));
        let mut view = CalendarView::new(backend, AdminSession::in_memory(), MonthWindow::new(2025, 0));
        assert!(view.load().await.is_err());

        let text = render_month(&view, false);
        assert!(text.contains("Не удалось загрузить события"));
        assert!(text.contains("mock://calendar?start=2025-01-01&end=2025-01-31"));
    }

    #[test]
    fn empty_day() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(render_day(date, &[], false).contains("Событий нет."));
    }
}
