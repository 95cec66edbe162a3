use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::enrollment::resolve_enrollment_window;
use crate::error::EngineResult;
use crate::filter::{Dated, EventFilter};
use crate::group::{compute_group_summary, compute_monthly_summaries};
use crate::models::{
    AttendanceRecord, Dashboard, MeritRecord, RankedStudent, ScoreBundle, Student, StudentProfile,
    TopStudent,
};
use crate::period::{resolve_period_cutoff, Period};
use crate::rank::{assign_ranks, compute_rank, rank_groups};
use crate::score::{aggregate_score, compute_student_score, student_filter};

struct Scored<'a> {
    student: &'a Student,
    attendance: Vec<Dated<'a, AttendanceRecord>>,
    bundle: ScoreBundle,
}

fn by_student<T, F>(records: &[T], key: F) -> HashMap<Uuid, Vec<&T>>
where
    F: Fn(&T) -> Uuid,
{
    let mut index: HashMap<Uuid, Vec<&T>> = HashMap::new();
    for record in records {
        index.entry(key(record)).or_default().push(record);
    }
    index
}

/// Scores every selected student. Selection is the same for every report:
/// optional group match, then still active as of today in the reporting zone.
fn score_roster<'a>(
    students: &'a [Student],
    attendance: &'a [AttendanceRecord],
    merits: &'a [MeritRecord],
    period: Period,
    group_filter: Option<&str>,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Vec<Scored<'a>> {
    let calendar = &config.calendar;
    let today = calendar.date_of(now);
    let cutoff = resolve_period_cutoff(period, now, calendar);
    let attendance_by_student = by_student(attendance, |r| r.student_id);
    let merits_by_student = by_student(merits, |r| r.student_id);

    students
        .iter()
        .filter(|s| group_filter.map_or(true, |group| s.group_name == group))
        .filter_map(|student| {
            let window = match resolve_enrollment_window(student, calendar) {
                Ok(window) => window,
                Err(err) => {
                    warn!(
                        student_id = %student.id,
                        error = %err,
                        "skipping student with unreadable enrollment"
                    );
                    return None;
                }
            };
            if !window.is_active_on(today) {
                return None;
            }
            let filter = EventFilter::new(cutoff, window);
            let own_attendance = filter.apply(
                attendance_by_student.get(&student.id).into_iter().flatten().copied(),
                calendar,
            );
            let own_merits = filter.apply(
                merits_by_student.get(&student.id).into_iter().flatten().copied(),
                calendar,
            );
            let bundle = aggregate_score(student.id, &own_attendance, &own_merits, &config.weights);
            Some(Scored {
                student,
                attendance: own_attendance,
                bundle,
            })
        })
        .collect()
}

fn ranked_students(scored: &[Scored<'_>]) -> Vec<RankedStudent> {
    let mut bundles: Vec<_> = scored.iter().map(|s| s.bundle.clone()).collect();
    assign_ranks(&mut bundles);
    let names: HashMap<Uuid, &Student> = scored.iter().map(|s| (s.student.id, s.student)).collect();

    bundles
        .into_iter()
        .filter_map(|score| {
            let student = names.get(&score.student_id)?;
            Some(RankedStudent {
                full_name: student.full_name.clone(),
                group_name: student.group_name.clone(),
                score,
            })
        })
        .collect()
}

pub fn compute_dashboard(
    students: &[Student],
    attendance: &[AttendanceRecord],
    merits: &[MeritRecord],
    period: Period,
    group_filter: Option<&str>,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Dashboard {
    let scored = score_roster(students, attendance, merits, period, group_filter, now, config);

    let mut pooled = Vec::new();
    let mut per_group: BTreeMap<&str, (Vec<Dated<'_, AttendanceRecord>>, usize)> = BTreeMap::new();
    for entry in &scored {
        pooled.extend(entry.attendance.iter().copied());
        let slot = per_group.entry(entry.student.group_name.as_str()).or_default();
        slot.0.extend(entry.attendance.iter().copied());
        slot.1 += 1;
    }

    let mut overall = compute_group_summary(&pooled, scored.len(), config);
    overall.group_name = group_filter.map(str::to_string);

    let mut groups: Vec<_> = per_group
        .into_iter()
        .map(|(name, (events, count))| {
            let mut summary = compute_group_summary(&events, count, config);
            summary.group_name = Some(name.to_string());
            summary
        })
        .collect();
    rank_groups(&mut groups);

    let students = ranked_students(&scored);
    let top_student = students.first().map(|top| TopStudent {
        student_id: top.score.student_id,
        full_name: top.full_name.clone(),
        total_score: top.score.total_score,
    });

    debug!(
        students = scored.len(),
        lessons = overall.total_classes,
        period = %period,
        "built dashboard"
    );

    Dashboard {
        overall,
        top_student,
        months: compute_monthly_summaries(&pooled, config),
        groups,
        students,
    }
}

/// One student's bundle, ranked against the active students of their group,
/// with a month-by-month breakdown of their own attendance.
///
/// A student who has left keeps their bundle but gets no rank. An unknown id
/// is `Ok(None)`; an unreadable enrollment date is an error.
pub fn compute_student_profile(
    student_id: Uuid,
    students: &[Student],
    attendance: &[AttendanceRecord],
    merits: &[MeritRecord],
    period: Period,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> EngineResult<Option<StudentProfile>> {
    let Some(student) = students.iter().find(|s| s.id == student_id) else {
        return Ok(None);
    };
    let filter = student_filter(student, period, now, config)?;
    let cohort = score_roster(
        students,
        attendance,
        merits,
        period,
        Some(student.group_name.as_str()),
        now,
        config,
    );

    let bundles: Vec<ScoreBundle> = cohort.iter().map(|s| s.bundle.clone()).collect();
    let (mut score, own_attendance) = match cohort.iter().find(|s| s.student.id == student_id) {
        Some(entry) => (entry.bundle.clone(), entry.attendance.clone()),
        None => {
            let own = filter.apply(
                attendance.iter().filter(|r| r.student_id == student_id),
                &config.calendar,
            );
            (
                compute_student_score(student, attendance, merits, period, now, config)?,
                own,
            )
        }
    };
    score.rank = compute_rank(student_id, &bundles);

    Ok(Some(StudentProfile {
        student_id,
        full_name: student.full_name.clone(),
        group_name: student.group_name.clone(),
        months: compute_monthly_summaries(&own_attendance, config),
        score,
    }))
}
