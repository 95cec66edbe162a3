use std::cmp::Ordering;

use uuid::Uuid;

use crate::models::{GroupSummary, ScoreBundle};

/// Highest score first; equal scores fall back to ascending student id so
/// the order never depends on input order.
pub fn score_order(a: &ScoreBundle, b: &ScoreBundle) -> Ordering {
    b.total_score
        .total_cmp(&a.total_score)
        .then_with(|| a.student_id.cmp(&b.student_id))
}

/// Sorts the cohort and fills `rank` with 1-based positions.
pub fn assign_ranks(cohort: &mut [ScoreBundle]) {
    cohort.sort_by(score_order);
    for (index, bundle) in cohort.iter_mut().enumerate() {
        bundle.rank = Some(index + 1);
    }
}

pub fn compute_rank(student_id: Uuid, cohort: &[ScoreBundle]) -> Option<usize> {
    let target = cohort.iter().find(|b| b.student_id == student_id)?;
    let ahead = cohort
        .iter()
        .filter(|other| score_order(other, target) == Ordering::Less)
        .count();
    Some(ahead + 1)
}

pub fn group_order(a: &GroupSummary, b: &GroupSummary) -> Ordering {
    b.efficiency
        .cmp(&a.efficiency)
        .then_with(|| b.attendance_percentage.cmp(&a.attendance_percentage))
        .then_with(|| a.group_name.cmp(&b.group_name))
}

pub fn rank_groups(groups: &mut [GroupSummary]) {
    groups.sort_by(group_order);
}
