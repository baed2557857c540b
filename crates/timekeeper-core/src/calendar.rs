//! Day classification: weekday, weekend or holiday.
//!
//! Weekends win over holidays: a national holiday falling on a Saturday
//! classifies as `Weekend`. Learning and detection only care about the
//! weekday vs. day-off split, which `DayType::is_off` exposes.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::providers::CalendarClassifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Weekday,
    Weekend,
    Holiday,
}

impl DayType {
    /// Weekend-or-holiday: the partition key for learning and detection.
    pub fn is_off(self) -> bool {
        matches!(self, DayType::Weekend | DayType::Holiday)
    }
}

/// Whether `date` is a holiday: the local calendar says so, or it falls
/// in one of the two fixed windows that count regardless of calendar
/// availability (8/13-8/16 and 12/29-1/3).
pub fn is_holiday(date: NaiveDate, calendar: &dyn CalendarClassifier) -> bool {
    if calendar.is_holiday(date) {
        return true;
    }

    // Mid-August break: 8/13-8/16
    if date.month() == 8 && (13..=16).contains(&date.day()) {
        return true;
    }

    // Year-end break: 12/29-1/3
    if (date.month() == 12 && date.day() >= 29) || (date.month() == 1 && date.day() <= 3) {
        return true;
    }

    false
}

/// Classify `date` as weekday, weekend or holiday.
pub fn categorize(date: NaiveDate, calendar: &dyn CalendarClassifier) -> DayType {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return DayType::Weekend;
    }
    if is_holiday(date, calendar) {
        return DayType::Holiday;
    }
    DayType::Weekday
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::NoCalendar;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    struct EveryDayHoliday;
    impl CalendarClassifier for EveryDayHoliday {
        fn is_holiday(&self, _date: NaiveDate) -> bool {
            true
        }
    }

    #[test]
    fn plain_weekday() {
        // 2026-08-05 is a Wednesday.
        assert_eq!(categorize(d(2026, 8, 5), &NoCalendar), DayType::Weekday);
        assert!(!DayType::Weekday.is_off());
    }

    #[test]
    fn saturday_beats_holiday() {
        // 2026-08-15 is a Saturday inside the fixed mid-August window.
        assert_eq!(categorize(d(2026, 8, 15), &NoCalendar), DayType::Weekend);
        assert_eq!(
            categorize(d(2026, 8, 15), &EveryDayHoliday),
            DayType::Weekend
        );
    }

    #[test]
    fn fixed_windows_apply_without_calendar() {
        // 2026-08-13 (Thursday) and 2026-12-30 (Wednesday), 2026-01-02 (Friday).
        assert_eq!(categorize(d(2026, 8, 13), &NoCalendar), DayType::Holiday);
        assert_eq!(categorize(d(2026, 12, 30), &NoCalendar), DayType::Holiday);
        assert_eq!(categorize(d(2026, 1, 2), &NoCalendar), DayType::Holiday);
    }

    #[test]
    fn window_edges() {
        assert!(!is_holiday(d(2026, 8, 12), &NoCalendar));
        assert!(is_holiday(d(2026, 8, 16), &NoCalendar));
        assert!(!is_holiday(d(2026, 8, 17), &NoCalendar));
        assert!(!is_holiday(d(2026, 12, 28), &NoCalendar));
        assert!(is_holiday(d(2026, 12, 29), &NoCalendar));
        assert!(is_holiday(d(2026, 1, 3), &NoCalendar));
        assert!(!is_holiday(d(2026, 1, 4), &NoCalendar));
    }

    #[test]
    fn calendar_classifier_is_consulted() {
        // A plain Tuesday becomes a holiday when the calendar says so.
        assert_eq!(
            categorize(d(2026, 8, 4), &EveryDayHoliday),
            DayType::Holiday
        );
        assert_eq!(categorize(d(2026, 8, 4), &NoCalendar), DayType::Weekday);
    }
}
