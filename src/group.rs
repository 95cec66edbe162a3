use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::filter::Dated;
use crate::models::{AttendanceRecord, AttendanceStatus, GroupSummary, MonthSummary};
use crate::score::{latest_marks, percent};

/// Pooled counts over (student, date) lesson slots.
#[derive(Debug, Default)]
struct Tally {
    slots: usize,
    attended: usize,
    late: usize,
    absent: usize,
    dates: BTreeSet<NaiveDate>,
    students: BTreeSet<Uuid>,
}

impl Tally {
    fn add(&mut self, student_id: Uuid, date: NaiveDate, status: AttendanceStatus) {
        self.slots += 1;
        if status.is_attended() {
            self.attended += 1;
        }
        if status == AttendanceStatus::Late {
            self.late += 1;
        }
        if status.is_absent() {
            self.absent += 1;
        }
        self.dates.insert(date);
        self.students.insert(student_id);
    }

    fn attendance_percentage(&self) -> u32 {
        percent(self.attended, self.slots)
    }

    fn late_percentage(&self) -> u32 {
        percent(self.late, self.slots)
    }

    fn absent_percentage(&self) -> u32 {
        percent(self.absent, self.slots)
    }
}

pub fn efficiency(attendance_percentage: u32, late_percentage: u32, late_discount: f64) -> u32 {
    let blended = attendance_percentage as f64 - late_discount * late_percentage as f64;
    blended.max(0.0).round() as u32
}

/// Pools every student's marks and divides by lesson slots, so a student with
/// no lessons adds nothing to either side of the ratio.
pub fn compute_group_summary(
    events: &[Dated<'_, AttendanceRecord>],
    student_count: usize,
    config: &EngineConfig,
) -> GroupSummary {
    let mut tally = Tally::default();
    for ((student_id, date), status) in latest_marks(events) {
        tally.add(student_id, date, status);
    }
    debug!(slots = tally.slots, student_count, "pooled group attendance");

    let attendance_percentage = tally.attendance_percentage();
    let late_percentage = tally.late_percentage();
    GroupSummary {
        group_name: None,
        total_students: student_count,
        total_classes: tally.dates.len(),
        attendance_percentage,
        late_percentage,
        absent_percentage: tally.absent_percentage(),
        efficiency: efficiency(attendance_percentage, late_percentage, config.efficiency_late_discount),
    }
}

/// One summary per calendar month that has at least one mark, oldest first.
pub fn compute_monthly_summaries(
    events: &[Dated<'_, AttendanceRecord>],
    config: &EngineConfig,
) -> Vec<MonthSummary> {
    let mut buckets: BTreeMap<(i32, u32), Tally> = BTreeMap::new();
    for ((student_id, date), status) in latest_marks(events) {
        buckets
            .entry((date.year(), date.month()))
            .or_default()
            .add(student_id, date, status);
    }

    buckets
        .into_iter()
        .map(|((year, month), tally)| {
            let attendance_percentage = tally.attendance_percentage();
            let late_percentage = tally.late_percentage();
            MonthSummary {
                year,
                month,
                total_students: tally.students.len(),
                total_classes: tally.dates.len(),
                attendance_percentage,
                late_percentage,
                absent_percentage: tally.absent_percentage(),
                efficiency: efficiency(
                    attendance_percentage,
                    late_percentage,
                    config.efficiency_late_discount,
                ),
            }
        })
        .collect()
}
