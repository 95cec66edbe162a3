use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{Dashboard, MonthSummary};
use crate::period::Period;

fn month_label(month: &MonthSummary) -> String {
    month
        .first_day()
        .map(|day| day.format("%B %Y").to_string())
        .unwrap_or_else(|| format!("{}-{:02}", month.year, month.month))
}

pub fn build_report(
    group: Option<&str>,
    period: Period,
    cutoff: Option<NaiveDate>,
    dashboard: &Dashboard,
) -> String {
    let mut output = String::new();
    let group_label = group.unwrap_or("all groups");
    let window_label = match cutoff {
        Some(date) => format!("since {date}"),
        None => "all time".to_string(),
    };

    let _ = writeln!(output, "# Roster Performance Report");
    let _ = writeln!(
        output,
        "Generated for {} (period {}, {})",
        group_label, period, window_label
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");

    let overall = &dashboard.overall;
    if overall.total_students == 0 {
        let _ = writeln!(output, "No active students in this selection.");
    } else {
        let _ = writeln!(output, "- Students: {}", overall.total_students);
        let _ = writeln!(output, "- Lesson days: {}", overall.total_classes);
        let _ = writeln!(
            output,
            "- Attendance: {}% (late {}%, absent {}%)",
            overall.attendance_percentage, overall.late_percentage, overall.absent_percentage
        );
        let _ = writeln!(output, "- Efficiency: {}", overall.efficiency);
        if let Some(top) = &dashboard.top_student {
            let _ = writeln!(
                output,
                "- Top student: {} (score {:.1})",
                top.full_name, top.total_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Group Ranking");

    if dashboard.groups.is_empty() {
        let _ = writeln!(output, "No groups in this selection.");
    } else {
        for (position, summary) in dashboard.groups.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {}: efficiency {}, attendance {}% across {} students",
                position + 1,
                summary.group_name.as_deref().unwrap_or("-"),
                summary.efficiency,
                summary.attendance_percentage,
                summary.total_students
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Students");

    if dashboard.students.is_empty() {
        let _ = writeln!(output, "No students scored for this window.");
    } else {
        for student in dashboard.students.iter().take(10) {
            let score = &student.score;
            let _ = writeln!(
                output,
                "{}. {} ({}) score {:.1}: attendance {}% over {} lessons, merit {:+.1}",
                score.rank.unwrap_or_default(),
                student.full_name,
                student.group_name,
                score.total_score,
                score.attendance_percentage,
                score.total_classes,
                score.net_merit_points
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Attendance");

    if dashboard.months.is_empty() {
        let _ = writeln!(output, "No lessons recorded for this window.");
    } else {
        // newest month first
        for month in dashboard.months.iter().rev() {
            let _ = writeln!(
                output,
                "- {}: {}% attendance, {}% late, {}% absent over {} lesson days",
                month_label(month),
                month.attendance_percentage,
                month.late_percentage,
                month.absent_percentage,
                month.total_classes
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::dashboard::compute_dashboard;
    use crate::models::{AttendanceRecord, AttendanceStatus, Student};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn empty_dashboard_renders_zero_state() {
        let dashboard = compute_dashboard(
            &[],
            &[],
            &[],
            Period::All,
            None,
            Utc::now(),
            &EngineConfig::default(),
        );
        let report = build_report(None, Period::All, None, &dashboard);
        assert!(report.contains("Generated for all groups (period all, all time)"));
        assert!(report.contains("No active students in this selection."));
        assert!(report.contains("No lessons recorded for this window."));
    }

    #[test]
    fn months_are_listed_newest_first() {
        let id = Uuid::from_u128(1);
        let students = vec![Student {
            id,
            teacher_id: Uuid::nil(),
            group_name: "7A".to_string(),
            full_name: "Avery Lee".to_string(),
            enrolled_at: None,
            join_date: None,
            leave_date: None,
            archived_at: None,
        }];
        let attendance: Vec<_> = ["2024-01-15", "2024-02-15"]
            .iter()
            .map(|date| AttendanceRecord {
                student_id: id,
                teacher_id: Uuid::nil(),
                date: date.to_string(),
                status: AttendanceStatus::Present,
            })
            .collect();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let dashboard = compute_dashboard(
            &students,
            &attendance,
            &[],
            Period::All,
            Some("7A"),
            now,
            &EngineConfig::default(),
        );
        let report = build_report(Some("7A"), Period::All, None, &dashboard);

        let february = report.find("February 2024").unwrap();
        let january = report.find("January 2024").unwrap();
        assert!(february < january);
        assert!(report.contains("- Top student: Avery Lee (score 2.0)"));
        assert!(report.contains("1. 7A: efficiency 100, attendance 100% across 1 students"));
    }
}
