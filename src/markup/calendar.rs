use crate::errors::{JournalError, JournalResult};
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// False for padding days borrowed from the neighbouring months.
    pub in_month: bool,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u32,
}

impl CalendarDay {
    pub fn day_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

pub type Week = [CalendarDay; 7];

/// Map a Sunday-based day number (0 = Sunday) to a Monday-based one.
#[inline]
pub fn monday_index(from_sunday: u32) -> u32 {
    (from_sunday + 6) % 7
}

pub fn first_of_month(year: i32, month: u32) -> JournalResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| JournalError::Validation(format!("invalid month: {year}-{month}")))
}

pub fn last_of_month(year: i32, month: u32) -> JournalResult<NaiveDate> {
    let first = first_of_month(year, month)?;
    let next = if month == 12 {
        first_of_month(year + 1, 1)?
    } else {
        first_of_month(year, month + 1)?
    };
    next.pred_opt()
        .ok_or_else(|| JournalError::Validation(format!("invalid month: {year}-{month}")))
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = monday_index(date.weekday().num_days_from_sunday());
    date - Days::new(u64::from(back))
}

/// Monday-to-Sunday rows covering the whole month, padded with days of the
/// previous and next month.
pub fn build_month_weeks(year: i32, month: u32) -> JournalResult<Vec<Week>> {
    let first = first_of_month(year, month)?;
    let last = last_of_month(year, month)?;

    let start = week_start(first);
    let forward = 6 - monday_index(last.weekday().num_days_from_sunday());
    let end = last + Days::new(u64::from(forward));

    let mut weeks = Vec::with_capacity(6);
    let mut cursor = start;
    while cursor <= end {
        let mut row = [CalendarDay {
            date: cursor,
            in_month: false,
            weekday: 0,
        }; 7];
        for (i, slot) in row.iter_mut().enumerate() {
            *slot = CalendarDay {
                date: cursor,
                in_month: cursor.month() == month && cursor.year() == year,
                weekday: i as u32,
            };
            cursor = cursor + Days::new(1);
        }
        weeks.push(row);
    }
    Ok(weeks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn check_grid(year: i32, month: u32) {
        let weeks = build_month_weeks(year, month).unwrap();
        let days: Vec<CalendarDay> = weeks.iter().flatten().copied().collect();
        assert_eq!(days.len() % 7, 0);
        assert!(weeks.len() >= 4 && weeks.len() <= 6, "{year}-{month}: {} rows", weeks.len());

        for row in &weeks {
            assert_eq!(row[0].date.weekday(), Weekday::Mon);
            assert_eq!(row[6].date.weekday(), Weekday::Sun);
        }

        let last = last_of_month(year, month).unwrap().day();
        for d in 1..=last {
            let hits = days
                .iter()
                .filter(|c| c.in_month && c.date.day() == d)
                .count();
            assert_eq!(hits, 1, "{year}-{month}-{d} must appear once");
        }
        assert_eq!(days.iter().filter(|c| c.in_month).count() as u32, last);
        assert!(days.windows(2).all(|w| w[1].date == w[0].date + Days::new(1)));
    }

    #[test]
    fn test_every_month_of_several_years() {
        for year in [2015, 2020, 2023, 2024, 2026] {
            for month in 1..=12 {
                check_grid(year, month);
            }
        }
    }

    #[test]
    fn test_february_2021_fits_four_rows() {
        // starts on a Monday, 28 days
        let weeks = build_month_weeks(2021, 2).unwrap();
        assert_eq!(weeks.len(), 4);
        assert!(weeks.iter().flatten().all(|d| d.in_month));
    }

    #[test]
    fn test_padding_days_are_flagged() {
        // March 2023 starts on a Wednesday
        let weeks = build_month_weeks(2023, 3).unwrap();
        assert_eq!(weeks[0][0].day_key(), "2023-02-27");
        assert!(!weeks[0][0].in_month);
        assert!(weeks[0][2].in_month);
        assert_eq!(weeks[0][2].weekday, 2);
    }

    #[test]
    fn test_invalid_month() {
        assert!(matches!(build_month_weeks(2024, 13), Err(JournalError::Validation(_))));
        assert!(build_month_weeks(2024, 0).is_err());
    }

    #[test]
    fn test_monday_index() {
        assert_eq!(monday_index(0), 6);
        assert_eq!(monday_index(1), 0);
        assert_eq!(week_start(NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()), NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
    }
}
