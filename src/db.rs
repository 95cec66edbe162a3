use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{AttendanceRecord, AttendanceStatus, MeritKind, MeritRecord, RecordSet, Student};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Loads one teacher's roster and event log. Records are handed to the
/// engine unscored and untouched apart from status/type decoding.
pub async fn fetch_records(pool: &PgPool, teacher_id: Uuid) -> anyhow::Result<RecordSet> {
    let student_rows = sqlx::query(
        r#"
        SELECT id, teacher_id, group_name, full_name, enrolled_at, join_date, leave_date, archived_at
        FROM roster.students
        WHERE teacher_id = $1
        ORDER BY group_name, full_name
        "#,
    )
    .bind(teacher_id)
    .fetch_all(pool)
    .await
    .context("failed to load students")?;

    let students = student_rows
        .into_iter()
        .map(|row| Student {
            id: row.get("id"),
            teacher_id: row.get("teacher_id"),
            group_name: row.get("group_name"),
            full_name: row.get("full_name"),
            enrolled_at: row.get("enrolled_at"),
            join_date: row.get("join_date"),
            leave_date: row.get("leave_date"),
            archived_at: row.get("archived_at"),
        })
        .collect();

    let attendance_rows = sqlx::query(
        r#"
        SELECT student_id, teacher_id, lesson_date, status
        FROM roster.attendance
        WHERE teacher_id = $1
        ORDER BY recorded_at
        "#,
    )
    .bind(teacher_id)
    .fetch_all(pool)
    .await
    .context("failed to load attendance")?;

    let mut attendance = Vec::with_capacity(attendance_rows.len());
    for row in attendance_rows {
        let student_id: Uuid = row.get("student_id");
        let raw_status: String = row.get("status");
        match raw_status.parse::<AttendanceStatus>() {
            Ok(status) => attendance.push(AttendanceRecord {
                student_id,
                teacher_id: row.get("teacher_id"),
                date: row.get("lesson_date"),
                status,
            }),
            Err(err) => warn!(%student_id, error = %err, "skipping attendance row"),
        }
    }

    let merit_rows = sqlx::query(
        r#"
        SELECT student_id, teacher_id, merit_date, merit_type, points
        FROM roster.merits
        WHERE teacher_id = $1
        ORDER BY recorded_at
        "#,
    )
    .bind(teacher_id)
    .fetch_all(pool)
    .await
    .context("failed to load merits")?;

    let mut merits = Vec::with_capacity(merit_rows.len());
    for row in merit_rows {
        let student_id: Uuid = row.get("student_id");
        let raw_kind: String = row.get("merit_type");
        match raw_kind.parse::<MeritKind>() {
            Ok(kind) => merits.push(MeritRecord {
                student_id,
                teacher_id: row.get("teacher_id"),
                date: row.get("merit_date"),
                kind,
                points: row.get("points"),
            }),
            Err(err) => warn!(%student_id, error = %err, "skipping merit row"),
        }
    }

    let records = RecordSet {
        students,
        attendance,
        merits,
    };
    info!(
        %teacher_id,
        students = records.students.len(),
        attendance = records.attendance.len(),
        merits = records.merits.len(),
        "loaded records from postgres"
    );
    Ok(records)
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            // header is line 1
            Err(err) => warn!(file = %path.display(), line = index + 2, error = %err, "skipping csv row"),
        }
    }

    Ok(rows)
}

/// Reads `students.csv`, `attendance.csv` and `merits.csv` from `dir`,
/// keeping only `teacher_id`'s records.
pub fn load_csv_dir(dir: &Path, teacher_id: Uuid) -> anyhow::Result<RecordSet> {
    let students: Vec<Student> = read_csv(&dir.join("students.csv"))?;
    let attendance: Vec<AttendanceRecord> = read_csv(&dir.join("attendance.csv"))?;
    let merits: Vec<MeritRecord> = read_csv(&dir.join("merits.csv"))?;

    let records = RecordSet {
        students: students.into_iter().filter(|s| s.teacher_id == teacher_id).collect(),
        attendance: attendance.into_iter().filter(|r| r.teacher_id == teacher_id).collect(),
        merits: merits.into_iter().filter(|r| r.teacher_id == teacher_id).collect(),
    };
    info!(
        %teacher_id,
        dir = %dir.display(),
        students = records.students.len(),
        attendance = records.attendance.len(),
        merits = records.merits.len(),
        "loaded records from csv"
    );
    Ok(records)
}
