use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, ScoreWeights};
use crate::enrollment::resolve_enrollment_window;
use crate::error::{EngineError, EngineResult};
use crate::filter::{Dated, EventFilter};
use crate::models::{AttendanceRecord, AttendanceStatus, MeritKind, MeritRecord, ScoreBundle, Student};
use crate::period::{resolve_period_cutoff, Period};

/// Rounded share of `part` in `whole`, as a whole percentage.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}

/// One status per (student, date). A later mark for the same day replaces
/// the earlier one.
pub fn latest_marks(
    events: &[Dated<'_, AttendanceRecord>],
) -> BTreeMap<(Uuid, NaiveDate), AttendanceStatus> {
    let mut marks = BTreeMap::new();
    for event in events {
        marks.insert((event.record.student_id, event.date), event.record.status);
    }
    marks
}

/// Filters one student's records by period and enrollment, then scores them.
/// Records belonging to other students are ignored.
pub fn compute_student_score(
    student: &Student,
    attendance: &[AttendanceRecord],
    merits: &[MeritRecord],
    period: Period,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> EngineResult<ScoreBundle> {
    let filter = student_filter(student, period, now, config)?;
    let own_attendance = attendance.iter().filter(|r| r.student_id == student.id);
    let own_merits = merits.iter().filter(|r| r.student_id == student.id);

    let attendance = filter.apply(own_attendance, &config.calendar);
    let merits = filter.apply(own_merits, &config.calendar);
    Ok(aggregate_score(student.id, &attendance, &merits, &config.weights))
}

pub fn student_filter(
    student: &Student,
    period: Period,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> EngineResult<EventFilter> {
    Ok(EventFilter::new(
        resolve_period_cutoff(period, now, &config.calendar),
        resolve_enrollment_window(student, &config.calendar)?,
    ))
}

/// Folds already-filtered events into a bundle. `rank` is left unset.
pub fn aggregate_score(
    student_id: Uuid,
    attendance: &[Dated<'_, AttendanceRecord>],
    merits: &[Dated<'_, MeritRecord>],
    weights: &ScoreWeights,
) -> ScoreBundle {
    let marks = latest_marks(attendance);
    let total_classes = marks.len();
    let mut present_count = 0;
    let mut late_count = 0;
    let mut absent_count = 0;
    for status in marks.values() {
        match status {
            AttendanceStatus::Present => present_count += 1,
            AttendanceStatus::Late => late_count += 1,
            AttendanceStatus::AbsentWithReason | AttendanceStatus::AbsentWithoutReason => {
                absent_count += 1
            }
        }
    }

    // no applicable lessons is not held against the student
    let attendance_percentage = if total_classes == 0 {
        100
    } else {
        percent(present_count + late_count, total_classes)
    };
    let attendance_points =
        present_count as f64 * weights.present() + late_count as f64 * weights.late();

    let mut reward_points = 0.0;
    let mut penalty_points = 0.0;
    let mut grade_total = 0.0;
    let mut grade_count = 0usize;
    for merit in merits {
        let points = merit.record.points;
        if !points.is_finite() || points < 0.0 {
            warn!(
                %student_id,
                error = %EngineError::NegativePoints(points),
                "skipping merit record"
            );
            continue;
        }
        match merit.record.kind {
            MeritKind::Reward => reward_points += points,
            MeritKind::Penalty => penalty_points += points,
            MeritKind::Grade => {
                grade_total += points;
                grade_count += 1;
            }
        }
    }

    let net_merit_points = reward_points - penalty_points;
    let grade_average = if grade_count == 0 {
        0.0
    } else {
        grade_total / grade_count as f64
    };

    debug!(%student_id, total_classes, merits = merits.len(), "scored student");

    ScoreBundle {
        student_id,
        total_classes,
        present_count,
        late_count,
        absent_count,
        attendance_percentage,
        attendance_points,
        reward_points,
        penalty_points,
        net_merit_points,
        grade_average,
        total_score: attendance_points + net_merit_points,
        rank: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn student(id: Uuid) -> Student {
        Student {
            id,
            teacher_id: Uuid::nil(),
            group_name: "7A".to_string(),
            full_name: "Avery Lee".to_string(),
            enrolled_at: None,
            join_date: None,
            leave_date: None,
            archived_at: None,
        }
    }

    fn mark(student_id: Uuid, day: u32, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            student_id,
            teacher_id: Uuid::nil(),
            date: format!("2024-03-{day:02}"),
            status,
        }
    }

    fn merit(student_id: Uuid, kind: MeritKind, points: f64) -> MeritRecord {
        MeritRecord {
            student_id,
            teacher_id: Uuid::nil(),
            date: "2024-03-15".to_string(),
            kind,
            points,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 6, 0, 0).unwrap()
    }

    #[test]
    fn worked_example_scores_eleven() {
        let id = Uuid::new_v4();
        let mut attendance: Vec<_> = (1..=7)
            .map(|d| mark(id, d, AttendanceStatus::Present))
            .collect();
        attendance.push(mark(id, 8, AttendanceStatus::Late));
        attendance.push(mark(id, 9, AttendanceStatus::Late));
        attendance.push(mark(id, 10, AttendanceStatus::AbsentWithoutReason));
        let merits = vec![
            merit(id, MeritKind::Reward, 5.0),
            merit(id, MeritKind::Penalty, 2.0),
        ];

        let bundle = compute_student_score(
            &student(id),
            &attendance,
            &merits,
            Period::All,
            now(),
            &EngineConfig::default(),
        )
        .unwrap();

        assert_eq!(bundle.total_classes, 10);
        assert_eq!(bundle.attendance_percentage, 90);
        assert_eq!(bundle.attendance_points, 8.0);
        assert_eq!(bundle.net_merit_points, 3.0);
        assert_eq!(bundle.total_score, 11.0);
        assert_eq!(bundle.rank, None);
    }

    #[test]
    fn no_lessons_means_full_attendance() {
        let id = Uuid::new_v4();
        let bundle = compute_student_score(
            &student(id),
            &[],
            &[],
            Period::All,
            now(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(bundle.total_classes, 0);
        assert_eq!(bundle.attendance_percentage, 100);
        assert_eq!(bundle.total_score, 0.0);
    }

    #[test]
    fn grades_are_averaged_but_never_scored() {
        let id = Uuid::new_v4();
        let merits = vec![
            merit(id, MeritKind::Grade, 4.0),
            merit(id, MeritKind::Grade, 5.0),
            merit(id, MeritKind::Reward, 1.0),
        ];
        let bundle = compute_student_score(
            &student(id),
            &[],
            &merits,
            Period::All,
            now(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(bundle.grade_average, 4.5);
        assert_eq!(bundle.total_score, 1.0);
    }

    #[test]
    fn same_day_marks_collapse_to_the_last_one() {
        let id = Uuid::new_v4();
        let attendance = vec![
            mark(id, 4, AttendanceStatus::AbsentWithoutReason),
            mark(id, 4, AttendanceStatus::Late),
        ];
        let bundle = compute_student_score(
            &student(id),
            &attendance,
            &[],
            Period::All,
            now(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(bundle.total_classes, 1);
        assert_eq!(bundle.late_count, 1);
        assert_eq!(bundle.absent_count, 0);
    }

    #[test]
    fn other_students_and_bad_points_are_ignored() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let attendance = vec![
            mark(id, 2, AttendanceStatus::Present),
            mark(other, 2, AttendanceStatus::Present),
        ];
        let merits = vec![
            merit(id, MeritKind::Penalty, -3.0),
            merit(other, MeritKind::Reward, 10.0),
        ];
        let bundle = compute_student_score(
            &student(id),
            &attendance,
            &merits,
            Period::All,
            now(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(bundle.total_classes, 1);
        assert_eq!(bundle.penalty_points, 0.0);
        assert_eq!(bundle.total_score, 1.0);
    }

    #[test]
    fn malformed_leave_date_fails_the_score() {
        let id = Uuid::new_v4();
        let mut s = student(id);
        s.leave_date = Some("15.02.2024".to_string());
        let result = compute_student_score(
            &s,
            &[mark(id, 4, AttendanceStatus::Present)],
            &[],
            Period::All,
            now(),
            &EngineConfig::default(),
        );
        assert_eq!(result, Err(EngineError::MalformedDate("15.02.2024".to_string())));
    }

    #[test]
    fn period_and_enrollment_bound_both_record_kinds() {
        let id = Uuid::new_v4();
        let mut s = student(id);
        s.join_date = Some("2024-03-10".to_string());
        let attendance = vec![
            mark(id, 5, AttendanceStatus::Present),
            mark(id, 12, AttendanceStatus::Present),
            mark(id, 28, AttendanceStatus::Late),
        ];
        let mut early_reward = merit(id, MeritKind::Reward, 7.0);
        early_reward.date = "2024-03-09".to_string();
        let merits = vec![early_reward, merit(id, MeritKind::Reward, 2.0)];

        // 1_week from 2024-04-01 cuts at 2024-03-25
        let week = compute_student_score(
            &s,
            &attendance,
            &merits,
            Period::OneWeek,
            now(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(week.total_classes, 1);
        assert_eq!(week.late_count, 1);
        assert_eq!(week.reward_points, 0.0);

        let all = compute_student_score(&s, &attendance, &merits, Period::All, now(), &EngineConfig::default())
            .unwrap();
        assert_eq!(all.total_classes, 2);
        assert_eq!(all.reward_points, 2.0);
    }

    fn status_from(index: u8) -> AttendanceStatus {
        let raw = ["present", "late", "absent_with_reason", "absent_without_reason", "absent"]
            [index as usize % 5];
        raw.parse().unwrap()
    }

    proptest! {
        #[test]
        fn counts_and_score_identities_hold(
            marks in prop::collection::vec((1u32..=31, 0u8..5), 0..40),
            merits in prop::collection::vec((0u8..3, 0u32..20), 0..20),
        ) {
            let id = Uuid::from_u128(7);
            let attendance: Vec<_> = marks
                .iter()
                .map(|(day, status)| mark(id, *day, status_from(*status)))
                .collect();
            let merit_records: Vec<_> = merits
                .iter()
                .map(|(kind, points)| {
                    let kind = [MeritKind::Reward, MeritKind::Penalty, MeritKind::Grade][*kind as usize];
                    merit(id, kind, *points as f64)
                })
                .collect();

            let bundle = compute_student_score(
                &student(id),
                &attendance,
                &merit_records,
                Period::All,
                now(),
                &EngineConfig::default(),
            )
            .unwrap();

            prop_assert_eq!(
                bundle.present_count + bundle.late_count + bundle.absent_count,
                bundle.total_classes
            );
            prop_assert_eq!(
                bundle.total_score,
                bundle.attendance_points + bundle.reward_points - bundle.penalty_points
            );
            prop_assert!(bundle.attendance_percentage <= 100);
        }

        #[test]
        fn legacy_absent_counts_like_unexcused(days in prop::collection::btree_set(1u32..=31, 1..20)) {
            let id = Uuid::from_u128(9);
            let legacy: Vec<_> = days.iter().map(|d| AttendanceRecord {
                student_id: id,
                teacher_id: Uuid::nil(),
                date: format!("2024-03-{d:02}"),
                status: "absent".parse().unwrap(),
            }).collect();
            let modern: Vec<_> = days
                .iter()
                .map(|d| mark(id, *d, AttendanceStatus::AbsentWithoutReason))
                .collect();
            let config = EngineConfig::default();
            let a = compute_student_score(&student(id), &legacy, &[], Period::All, now(), &config).unwrap();
            let b = compute_student_score(&student(id), &modern, &[], Period::All, now(), &config).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
