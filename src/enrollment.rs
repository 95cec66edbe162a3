use chrono::NaiveDate;

use crate::calendar::ReportingCalendar;
use crate::error::EngineResult;
use crate::models::Student;

/// Inclusive span of days that count for one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnrollmentWindow {
    pub join: Option<NaiveDate>,
    pub leave: Option<NaiveDate>,
}

impl EnrollmentWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.join.map_or(true, |join| date >= join) && self.leave.map_or(true, |leave| date <= leave)
    }

    /// Still on the roster as of `today`.
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.leave.map_or(true, |leave| leave >= today)
    }
}

/// Explicit `join_date`/`leave_date` win over the enrollment and archive
/// timestamps. A non-empty explicit date that does not parse is an error and
/// never falls through to the timestamp.
pub fn resolve_enrollment_window(
    student: &Student,
    calendar: &ReportingCalendar,
) -> EngineResult<EnrollmentWindow> {
    let join = explicit_date(student.join_date.as_deref(), calendar)?
        .or_else(|| student.enrolled_at.map(|at| calendar.date_of(at)));
    let leave = explicit_date(student.leave_date.as_deref(), calendar)?
        .or_else(|| student.archived_at.map(|at| calendar.date_of(at)));

    Ok(EnrollmentWindow { join, leave })
}

fn explicit_date(raw: Option<&str>, calendar: &ReportingCalendar) -> EngineResult<Option<NaiveDate>> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => calendar.parse_date(raw).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_offset;
    use crate::error::EngineError;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn student() -> Student {
        Student {
            id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            group_name: "7A".to_string(),
            full_name: "Avery Lee".to_string(),
            enrolled_at: None,
            join_date: None,
            leave_date: None,
            archived_at: None,
        }
    }

    fn calendar() -> ReportingCalendar {
        ReportingCalendar::new(parse_offset("+05:00").unwrap())
    }

    #[test]
    fn explicit_dates_win_over_timestamps() {
        let mut s = student();
        s.enrolled_at = Some(Utc.with_ymd_and_hms(2023, 9, 1, 8, 0, 0).unwrap());
        s.join_date = Some("2023-09-15".to_string());
        s.archived_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        s.leave_date = Some("2024-04-20".to_string());

        let window = resolve_enrollment_window(&s, &calendar()).unwrap();
        assert_eq!(window.join, Some(date(2023, 9, 15)));
        assert_eq!(window.leave, Some(date(2024, 4, 20)));
    }

    #[test]
    fn timestamps_are_fallbacks_in_reporting_zone() {
        let mut s = student();
        s.enrolled_at = Some(Utc.with_ymd_and_hms(2023, 8, 31, 21, 0, 0).unwrap());
        s.archived_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap());

        let window = resolve_enrollment_window(&s, &calendar()).unwrap();
        assert_eq!(window.join, Some(date(2023, 9, 1)));
        assert_eq!(window.leave, Some(date(2024, 5, 1)));
    }

    #[test]
    fn missing_bounds_are_unbounded() {
        let window = resolve_enrollment_window(&student(), &calendar()).unwrap();
        assert_eq!(window, EnrollmentWindow::default());
        assert!(window.contains(date(1990, 1, 1)));
        assert!(window.is_active_on(date(2030, 1, 1)));
    }

    #[test]
    fn malformed_explicit_date_is_rejected() {
        let mut s = student();
        s.join_date = Some("15/09/2023".to_string());
        s.enrolled_at = Some(Utc.with_ymd_and_hms(2023, 9, 1, 8, 0, 0).unwrap());
        assert!(matches!(
            resolve_enrollment_window(&s, &calendar()),
            Err(EngineError::MalformedDate(_))
        ));

        let mut s = student();
        s.leave_date = Some("15.02.2024".to_string());
        s.archived_at = Some(Utc.with_ymd_and_hms(2024, 2, 15, 8, 0, 0).unwrap());
        assert!(resolve_enrollment_window(&s, &calendar()).is_err());
    }

    #[test]
    fn blank_explicit_date_uses_timestamp() {
        let mut s = student();
        s.join_date = Some("  ".to_string());
        s.enrolled_at = Some(Utc.with_ymd_and_hms(2023, 9, 1, 8, 0, 0).unwrap());
        let window = resolve_enrollment_window(&s, &calendar()).unwrap();
        assert_eq!(window.join, Some(date(2023, 9, 1)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let window = EnrollmentWindow {
            join: Some(date(2024, 1, 10)),
            leave: Some(date(2024, 1, 20)),
        };
        assert!(!window.contains(date(2024, 1, 9)));
        assert!(window.contains(date(2024, 1, 10)));
        assert!(window.contains(date(2024, 1, 20)));
        assert!(!window.contains(date(2024, 1, 21)));
        assert!(window.is_active_on(date(2024, 1, 20)));
        assert!(!window.is_active_on(date(2024, 1, 21)));
    }
}
