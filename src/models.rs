use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub group_name: String,
    pub full_name: String,
    #[serde(default)]
    pub enrolled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub join_date: Option<String>,
    #[serde(default)]
    pub leave_date: Option<String>,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    AbsentWithReason,
    #[serde(alias = "absent")]
    AbsentWithoutReason,
}

impl AttendanceStatus {
    pub fn is_attended(self) -> bool {
        matches!(self, Self::Present | Self::Late)
    }

    pub fn is_absent(self) -> bool {
        matches!(self, Self::AbsentWithReason | Self::AbsentWithoutReason)
    }
}

impl FromStr for AttendanceStatus {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "present" => Ok(Self::Present),
            "late" => Ok(Self::Late),
            "absent_with_reason" => Ok(Self::AbsentWithReason),
            // legacy marks predate the reason split
            "absent" | "absent_without_reason" => Ok(Self::AbsentWithoutReason),
            other => Err(EngineError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeritKind {
    Reward,
    Penalty,
    Grade,
}

impl FromStr for MeritKind {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Reward" => Ok(Self::Reward),
            "Penalty" => Ok(Self::Penalty),
            "Grade" => Ok(Self::Grade),
            other => Err(EngineError::UnknownMeritKind(other.to_string())),
        }
    }
}

/// One attendance mark as stored. `date` stays raw until the event filter
/// parses it, so a single bad value only drops its own record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub date: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeritRecord {
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: MeritKind,
    pub points: f64,
}

/// Everything the engine needs for one teacher, already fetched.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub students: Vec<Student>,
    pub attendance: Vec<AttendanceRecord>,
    pub merits: Vec<MeritRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBundle {
    pub student_id: Uuid,
    pub total_classes: usize,
    pub present_count: usize,
    pub late_count: usize,
    pub absent_count: usize,
    pub attendance_percentage: u32,
    pub attendance_points: f64,
    pub reward_points: f64,
    pub penalty_points: f64,
    pub net_merit_points: f64,
    pub grade_average: f64,
    pub total_score: f64,
    pub rank: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group_name: Option<String>,
    pub total_students: usize,
    pub total_classes: usize,
    pub attendance_percentage: u32,
    pub late_percentage: u32,
    pub absent_percentage: u32,
    pub efficiency: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub total_students: usize,
    pub total_classes: usize,
    pub attendance_percentage: u32,
    pub late_percentage: u32,
    pub absent_percentage: u32,
    pub efficiency: u32,
}

impl MonthSummary {
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopStudent {
    pub student_id: Uuid,
    pub full_name: String,
    pub total_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedStudent {
    pub full_name: String,
    pub group_name: String,
    pub score: ScoreBundle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProfile {
    pub student_id: Uuid,
    pub full_name: String,
    pub group_name: String,
    pub score: ScoreBundle,
    pub months: Vec<MonthSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub overall: GroupSummary,
    pub top_student: Option<TopStudent>,
    pub months: Vec<MonthSummary>,
    pub groups: Vec<GroupSummary>,
    pub students: Vec<RankedStudent>,
}
