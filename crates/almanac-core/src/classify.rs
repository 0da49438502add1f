use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::datetime::{end_of_day, same_month};
use crate::grid::DAYS_PER_WEEK;

/// Styling flags for one day cell. Flags are independent except that
/// `today` and `past` never hold together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayClass {
    pub out_of_month: bool,
    pub past: bool,
    pub today: bool,
}

pub fn is_out_of_month(day: NaiveDate, selected_month: NaiveDate) -> bool {
    !same_month(day, selected_month)
}

pub fn is_past_day(day: NaiveDate, now: NaiveDateTime) -> bool {
    end_of_day(day) < now
}

pub fn is_current_day(day: NaiveDate, now: NaiveDateTime) -> bool {
    day == now.date()
}

pub fn is_week_header_row(cell_index: usize) -> bool {
    cell_index < DAYS_PER_WEEK
}

pub fn classify_day(day: NaiveDate, selected_month: NaiveDate, now: NaiveDateTime) -> DayClass {
    DayClass {
        out_of_month: is_out_of_month(day, selected_month),
        past: is_past_day(day, now),
        today: is_current_day(day, now),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn at(day: NaiveDate, h: u32, m: u32, s: u32) -> NaiveDateTime {
        day.and_hms_opt(h, m, s).expect("valid time")
    }

    #[test]
    fn today_is_never_past_at_any_time_of_day() {
        let today = date(2024, 3, 12);
        for now in [
            at(today, 0, 0, 0),
            at(today, 12, 30, 0),
            at(today, 23, 59, 59),
            today
                .and_hms_milli_opt(23, 59, 59, 999)
                .expect("valid time"),
        ] {
            assert!(!is_past_day(today, now), "{now} flagged today as past");
            assert!(is_current_day(today, now));
        }
    }

    #[test]
    fn yesterday_is_past_from_midnight() {
        let today = date(2024, 3, 12);
        let yesterday = date(2024, 3, 11);
        assert!(is_past_day(yesterday, at(today, 0, 0, 0)));
        assert!(!is_current_day(yesterday, at(today, 0, 0, 0)));
        assert!(!is_past_day(date(2024, 3, 13), at(today, 23, 0, 0)));
    }

    #[test]
    fn out_of_month_compares_year_and_month() {
        let selected = date(2024, 3, 15);
        assert!(!is_out_of_month(date(2024, 3, 1), selected));
        assert!(is_out_of_month(date(2024, 2, 29), selected));
        assert!(is_out_of_month(date(2023, 3, 15), selected));
    }

    #[test]
    fn only_first_seven_cells_carry_week_names() {
        assert!(is_week_header_row(0));
        assert!(is_week_header_row(6));
        assert!(!is_week_header_row(7));
        assert!(!is_week_header_row(41));
    }

    #[test]
    fn filler_day_can_be_out_of_month_and_past() {
        let class = classify_day(
            date(2024, 2, 25),
            date(2024, 3, 1),
            at(date(2024, 3, 20), 8, 0, 0),
        );
        assert_eq!(
            class,
            DayClass {
                out_of_month: true,
                past: true,
                today: false,
            }
        );
    }
}
