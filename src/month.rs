//! Month windows: the range of dates shown by the calendar grid

use std::fmt::{Display, Formatter};

use chrono::{Datelike, Duration, NaiveDate, Utc};

/// Month names, as used in calendar headers
const MONTH_NAMES: [&str; 12] = [
    "январь", "февраль", "март", "апрель", "май", "июнь",
    "июль", "август", "сентябрь", "октябрь", "ноябрь", "декабрь",
];

/// Column headers of a Monday-first week
pub const WEEKDAY_HEADERS: [&str; 7] = ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Вс"];


/// A calendar month.
///
/// `month0` is zero-based (0 is January). Any `(year, month)` pair can be given to [`MonthWindow::new`],
/// out-of-range months carry over to the neighbouring years.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthWindow {
    year: i32,
    month0: u32,
}

impl MonthWindow {
    /// Build a normalized window. `month` 12 is January of `year + 1`, `month` -1 is December of `year - 1`
    pub fn new(year: i32, month: i32) -> Self {
        let carry = month.div_euclid(12);
        let month0 = month.rem_euclid(12) as u32;
        Self { year: year + carry, month0 }
    }

    /// The month that contains the current UTC date
    pub fn today() -> Self {
        Self::containing(Utc::now().date_naive())
    }

    /// The month that contains `date`
    pub fn containing(date: NaiveDate) -> Self {
        Self { year: date.year(), month0: date.month0() }
    }

    pub fn year(&self) -> i32 { self.year }
    /// Zero-based month (0 = January)
    pub fn month0(&self) -> u32 { self.month0 }
    /// One-based month (1 = January), as the backend expects it
    pub fn month(&self) -> u32 { self.month0 + 1 }

    pub fn prev(&self) -> Self {
        Self::new(self.year, self.month0 as i32 - 1)
    }

    pub fn next(&self) -> Self {
        Self::new(self.year, self.month0 as i32 + 1)
    }

    /// The first day of this month
    pub fn first(&self) -> NaiveDate {
        // A normalized window always has a valid first day, except for years outside of chrono's range
        NaiveDate::from_ymd_opt(self.year, self.month(), 1).unwrap_or(NaiveDate::MIN)
    }

    /// The last day of this month
    pub fn last(&self) -> NaiveDate {
        self.next().first().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    /// Inclusive first and last days of this month
    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        (self.first(), self.last())
    }

    pub fn days_in_month(&self) -> u32 {
        self.last().day()
    }

    /// Number of empty cells before day 1 in a Monday-first grid (0 when the month starts on a Monday)
    pub fn offset(&self) -> u32 {
        // num_days_from_sunday is 0 for Sunday, hence the +6
        (self.first().weekday().num_days_from_sunday() + 6) % 7
    }

    /// The cells of a Monday-first grid: `offset()` padding cells, then every day of the month
    pub fn cells(&self) -> Vec<Option<NaiveDate>> {
        let first = self.first();
        let mut cells: Vec<Option<NaiveDate>> = (0..self.offset()).map(|_| None).collect();
        cells.extend((0..self.days_in_month()).map(|d| Some(first + Duration::days(d as i64))));
        cells
    }

    /// Whether `date` is in this month
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month0() == self.month0
    }

    /// A header such as `январь 2025 г.`
    pub fn label(&self) -> String {
        format!("{} {} г.", MONTH_NAMES[self.month0 as usize], self.year)
    }
}

impl Default for MonthWindow {
    fn default() -> Self {
        Self::today()
    }
}

impl Display for MonthWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{:04}-{:02}", self.year, self.month())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn normalization_carries_over_years() {
        assert_eq!(MonthWindow::new(2024, 12), MonthWindow::new(2025, 0));
        assert_eq!(MonthWindow::new(2025, -1), MonthWindow::new(2024, 11));
        assert_eq!(MonthWindow::new(2025, 25), MonthWindow::new(2027, 1));
        assert_eq!(MonthWindow::new(2025, -13), MonthWindow::new(2023, 11));
        assert_eq!(MonthWindow::new(2025, 0).prev(), MonthWindow::new(2024, 11));
        assert_eq!(MonthWindow::new(2024, 11).next(), MonthWindow::new(2025, 0));
    }

    #[test]
    fn bounds() {
        assert_eq!(MonthWindow::new(2024, 1).bounds(), (ymd(2024, 2, 1), ymd(2024, 2, 29)));
        assert_eq!(MonthWindow::new(2023, 1).bounds(), (ymd(2023, 2, 1), ymd(2023, 2, 28)));
        assert_eq!(MonthWindow::new(2025, 11).bounds(), (ymd(2025, 12, 1), ymd(2025, 12, 31)));
        assert_eq!(MonthWindow::new(2025, 3).days_in_month(), 30);
    }

    #[test]
    fn known_offsets() {
        // September 2025 starts on a Monday, June 2025 on a Sunday
        assert_eq!(MonthWindow::new(2025, 8).offset(), 0);
        assert_eq!(MonthWindow::new(2025, 5).offset(), 6);
        // January 2025 starts on a Wednesday
        let jan = MonthWindow::new(2025, 0);
        assert_eq!(jan.offset(), 2);
        let cells = jan.cells();
        assert_eq!(cells.len(), 33);
        assert_eq!(&cells[..3], &[None, None, Some(ymd(2025, 1, 1))]);
        assert_eq!(cells.last(), Some(&Some(ymd(2025, 1, 31))));
    }

    #[test]
    fn grid_properties_hold_for_every_month() {
        for year in 1990..2040 {
            for month in 0..12 {
                let window = MonthWindow::new(year, month);
                let cells = window.cells();
                let offset = window.offset();
                assert!(offset <= 6);
                assert_eq!(cells.len() as u32, offset + window.days_in_month());
                assert!(cells[..offset as usize].iter().all(|c| c.is_none()));

                let first = cells[offset as usize].unwrap();
                assert_eq!(first.day(), 1);
                // The cell index modulo 7 is the Monday-first column
                assert_eq!(first.weekday().num_days_from_monday(), offset);
                for (idx, cell) in cells.iter().enumerate() {
                    if let Some(date) = cell {
                        assert_eq!(date.weekday().num_days_from_monday(), (idx % 7) as u32);
                    }
                }
                if offset == 0 {
                    assert_eq!(first.weekday(), Weekday::Mon);
                }
            }
        }
    }

    #[test]
    fn labels() {
        assert_eq!(MonthWindow::new(2025, 0).label(), "январь 2025 г.");
        assert_eq!(MonthWindow::new(2025, 11).to_string(), "2025-12");
        assert!(MonthWindow::new(2025, 2).contains(ymd(2025, 3, 31)));
        assert!(MonthWindow::new(2025, 2).contains(ymd(2025, 4, 1)) == false);
    }
}
