use time::macros::time;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::AppError;
use crate::normalize::timestamps::format_window_bound;

const NIGHT_BEGIN: Time = time!(20:00:00);
const NIGHT_END: Time = time!(07:59:59);
const DAY_BEGIN: Time = time!(08:00:00);
const DAY_END: Time = time!(19:59:59);

/// Reports run before noon cover the night that just ended.
const NOON_HOUR: u8 = 12;

/// Closed interval `[begin, end]` of one duty shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyWindow {
    pub begin: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl DutyWindow {
    pub fn new(begin: OffsetDateTime, end: OffsetDateTime) -> Self {
        Self { begin, end }
    }

    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        ts >= self.begin && ts <= self.end
    }
}

/// The two shifts adjoining one calendar day: the night ending that morning and the day after it.
///
/// Every bound uses the one fixed `offset`. On a night when the local clock changes
/// for daylight saving, the bounds after the change are an hour off wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutySchedule {
    offset: UtcOffset,
    previous_night: DutyWindow,
    current_day: DutyWindow,
}

fn at(date: Date, t: Time, offset: UtcOffset) -> OffsetDateTime {
    PrimitiveDateTime::new(date, t).assume_offset(offset)
}

impl DutySchedule {
    pub fn for_date(date: Date, offset: UtcOffset) -> Result<Self, AppError> {
        let yesterday = date.previous_day().ok_or_else(|| {
            AppError::new("DUTY_DATE_OUT_OF_RANGE", "No calendar day before the report date")
                .with_details(format!("date={date}"))
        })?;
        Ok(Self {
            offset,
            previous_night: DutyWindow::new(
                at(yesterday, NIGHT_BEGIN, offset),
                at(date, NIGHT_END, offset),
            ),
            current_day: DutyWindow::new(at(date, DAY_BEGIN, offset), at(date, DAY_END, offset)),
        })
    }

    /// Schedule for the local calendar day `now` falls on.
    pub fn for_instant(now: OffsetDateTime, offset: UtcOffset) -> Result<Self, AppError> {
        let local = now.checked_to_offset(offset).ok_or_else(|| {
            AppError::new("DUTY_DATE_OUT_OF_RANGE", "Report time is outside the calendar")
                .with_details(format!("now={now}"))
        })?;
        Self::for_date(local.date(), offset)
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    pub fn previous_night(&self) -> DutyWindow {
        self.previous_night
    }

    pub fn current_day(&self) -> DutyWindow {
        self.current_day
    }

    /// Shift a report generated at `now` describes.
    pub fn active(&self, now: OffsetDateTime) -> DutyWindow {
        if now.checked_to_offset(self.offset).unwrap_or(now).hour() < NOON_HOUR {
            self.previous_night
        } else {
            self.current_day
        }
    }

    /// Span of alerts worth fetching: both shifts, so late mail for either is aggregated.
    pub fn retrieval_window(&self) -> DutyWindow {
        DutyWindow::new(self.previous_night.begin, self.current_day.end)
    }
}

pub fn report_subject(window: &DutyWindow) -> String {
    format!(
        "Автоматизований звіт за період з {} по {}",
        format_window_bound(window.begin),
        format_window_bound(window.end)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset};

    #[test]
    fn night_crosses_midnight() {
        let schedule = DutySchedule::for_date(date!(2026 - 10 - 16), offset!(+3)).unwrap();
        assert_eq!(
            schedule.previous_night(),
            DutyWindow::new(
                datetime!(2026-10-15 20:00:00 +3),
                datetime!(2026-10-16 07:59:59 +3)
            )
        );
        assert_eq!(
            schedule.retrieval_window(),
            DutyWindow::new(
                datetime!(2026-10-15 20:00:00 +3),
                datetime!(2026-10-16 19:59:59 +3)
            )
        );
    }

    #[test]
    fn noon_switches_active_shift() {
        let schedule = DutySchedule::for_date(date!(2026 - 10 - 16), offset!(+3)).unwrap();
        assert_eq!(
            schedule.active(datetime!(2026-10-16 11:59:59 +3)),
            schedule.previous_night()
        );
        assert_eq!(
            schedule.active(datetime!(2026-10-16 12:00:00 +3)),
            schedule.current_day()
        );
        // 09:30 UTC is 12:30 local.
        assert_eq!(
            schedule.active(datetime!(2026-10-16 09:30:00 UTC)),
            schedule.current_day()
        );
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let window = DutyWindow::new(
            datetime!(2026-10-16 08:00:00 +3),
            datetime!(2026-10-16 19:59:59 +3),
        );
        assert!(window.contains(datetime!(2026-10-16 08:00:00 +3)));
        assert!(window.contains(datetime!(2026-10-16 19:59:59 +3)));
        assert!(!window.contains(datetime!(2026-10-16 07:59:59 +3)));
        assert!(!window.contains(datetime!(2026-10-16 20:00:00 +3)));
    }

    #[test]
    fn report_time_at_the_calendar_edge_is_an_error() {
        let err = DutySchedule::for_instant(datetime!(9999-12-31 23:00:00 UTC), offset!(+3))
            .unwrap_err();
        assert_eq!(err.code, "DUTY_DATE_OUT_OF_RANGE");
    }

    #[test]
    fn daylight_saving_night_keeps_one_offset() {
        // Clocks go back at 04:00 on 2026-10-25 in Kyiv; both bounds stay at +03:00.
        let schedule = DutySchedule::for_date(date!(2026 - 10 - 25), offset!(+3)).unwrap();
        let night = schedule.previous_night();
        assert_eq!(night.begin.offset(), offset!(+3));
        assert_eq!(night.end.offset(), offset!(+3));
        assert_eq!(night.end - night.begin, time::Duration::seconds(12 * 3600 - 1));
    }

    #[test]
    fn subject_names_the_window() {
        let schedule = DutySchedule::for_date(date!(2026 - 10 - 16), offset!(+3)).unwrap();
        assert_eq!(
            report_subject(&schedule.current_day()),
            "Автоматизований звіт за період з 2026-10-16 08:00:00 по 2026-10-16 19:59:59"
        );
    }
}
