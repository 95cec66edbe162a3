use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

mod calendar;
mod config;
mod dashboard;
mod db;
mod enrollment;
mod error;
mod filter;
mod group;
mod models;
mod period;
mod rank;
mod report;
mod score;
mod telemetry;

use config::AppConfig;
use models::RecordSet;
use period::Period;

#[derive(Parser)]
#[command(name = "roster-performance")]
#[command(about = "Attendance and merit scoring for a teacher's roster", long_about = None)]
struct Cli {
    /// Read students.csv, attendance.csv and merits.csv from this directory
    /// instead of Postgres
    #[arg(long, global = true)]
    csv_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Score one student against their group
    Student {
        #[arg(long)]
        teacher: Uuid,
        #[arg(long)]
        id: Uuid,
        #[arg(long, default_value = "all")]
        period: Period,
        #[arg(long)]
        json: bool,
    },
    /// Rank students by total score
    Rankings {
        #[arg(long)]
        teacher: Uuid,
        #[arg(long)]
        group: Option<String>,
        #[arg(long, default_value = "all")]
        period: Period,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Rank groups by efficiency
    Groups {
        #[arg(long)]
        teacher: Uuid,
        #[arg(long, default_value = "all")]
        period: Period,
        #[arg(long)]
        json: bool,
    },
    /// Roster overview with monthly breakdown
    Dashboard {
        #[arg(long)]
        teacher: Uuid,
        #[arg(long)]
        group: Option<String>,
        #[arg(long, default_value = "all")]
        period: Period,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        teacher: Uuid,
        #[arg(long)]
        group: Option<String>,
        #[arg(long, default_value = "all")]
        period: Period,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set unless --csv-dir is given")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_records(csv_dir: Option<&PathBuf>, teacher: Uuid) -> anyhow::Result<RecordSet> {
    match csv_dir {
        Some(dir) => db::load_csv_dir(dir, teacher),
        None => {
            let pool = connect().await?;
            db::fetch_records(&pool, teacher).await
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app = AppConfig::load().context("invalid configuration")?;
    telemetry::init(&app.telemetry)?;
    let config = app.engine;
    let now = Utc::now();
    info!(
        offset = %config.calendar.offset(),
        present_weight = config.weights.present(),
        late_weight = config.weights.late(),
        "engine configured"
    );

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Student {
            teacher,
            id,
            period,
            json,
        } => {
            let records = load_records(cli.csv_dir.as_ref(), teacher).await?;
            let profile = dashboard::compute_student_profile(
                id,
                &records.students,
                &records.attendance,
                &records.merits,
                period,
                now,
                &config,
            )?
            .with_context(|| format!("student {id} not found for teacher {teacher}"))?;

            if json {
                return print_json(&profile);
            }

            let score = &profile.score;
            println!("{} ({})", profile.full_name, profile.group_name);
            match score.rank {
                Some(rank) => println!("- rank {rank} in group"),
                None => println!("- not ranked (no longer enrolled)"),
            }
            println!(
                "- score {:.1} = attendance {:.1} + merit {:+.1}",
                score.total_score, score.attendance_points, score.net_merit_points
            );
            println!(
                "- attendance {}% over {} lessons ({} present, {} late, {} absent)",
                score.attendance_percentage,
                score.total_classes,
                score.present_count,
                score.late_count,
                score.absent_count
            );
            println!(
                "- rewards {:.1}, penalties {:.1}, grade average {:.2}",
                score.reward_points, score.penalty_points, score.grade_average
            );
            for month in profile.months.iter().rev() {
                println!(
                    "  {}-{:02}: {}% attendance over {} lessons",
                    month.year, month.month, month.attendance_percentage, month.total_classes
                );
            }
        }
        Commands::Rankings {
            teacher,
            group,
            period,
            limit,
            json,
        } => {
            let records = load_records(cli.csv_dir.as_ref(), teacher).await?;
            let dashboard = dashboard::compute_dashboard(
                &records.students,
                &records.attendance,
                &records.merits,
                period,
                group.as_deref(),
                now,
                &config,
            );
            let top: Vec<_> = dashboard.students.into_iter().take(limit).collect();

            if json {
                return print_json(&top);
            }
            if top.is_empty() {
                println!("No students found for this window.");
                return Ok(());
            }

            println!("Top students by total score:");
            for student in &top {
                println!(
                    "{}. {} ({}) score {:.1}, attendance {}%",
                    student.score.rank.unwrap_or_default(),
                    student.full_name,
                    student.group_name,
                    student.score.total_score,
                    student.score.attendance_percentage
                );
            }
        }
        Commands::Groups {
            teacher,
            period,
            json,
        } => {
            let records = load_records(cli.csv_dir.as_ref(), teacher).await?;
            let dashboard = dashboard::compute_dashboard(
                &records.students,
                &records.attendance,
                &records.merits,
                period,
                None,
                now,
                &config,
            );

            if json {
                return print_json(&dashboard.groups);
            }
            if dashboard.groups.is_empty() {
                println!("No groups found for this window.");
                return Ok(());
            }

            println!("Groups by efficiency:");
            for (position, summary) in dashboard.groups.iter().enumerate() {
                println!(
                    "{}. {} efficiency {}, attendance {}%, late {}%, absent {}% ({} students, {} lessons)",
                    position + 1,
                    summary.group_name.as_deref().unwrap_or("-"),
                    summary.efficiency,
                    summary.attendance_percentage,
                    summary.late_percentage,
                    summary.absent_percentage,
                    summary.total_students,
                    summary.total_classes
                );
            }
        }
        Commands::Dashboard {
            teacher,
            group,
            period,
            json,
        } => {
            let records = load_records(cli.csv_dir.as_ref(), teacher).await?;
            let dashboard = dashboard::compute_dashboard(
                &records.students,
                &records.attendance,
                &records.merits,
                period,
                group.as_deref(),
                now,
                &config,
            );

            if json {
                return print_json(&dashboard);
            }

            let overall = &dashboard.overall;
            println!(
                "{} students, {} lesson days, attendance {}%, efficiency {}",
                overall.total_students,
                overall.total_classes,
                overall.attendance_percentage,
                overall.efficiency
            );
            if let Some(top) = &dashboard.top_student {
                println!("Top student: {} ({:.1})", top.full_name, top.total_score);
            }
            for month in dashboard.months.iter().rev() {
                println!(
                    "  {}-{:02}: {}% attendance, {}% late, {}% absent",
                    month.year,
                    month.month,
                    month.attendance_percentage,
                    month.late_percentage,
                    month.absent_percentage
                );
            }
        }
        Commands::Report {
            teacher,
            group,
            period,
            out,
        } => {
            let records = load_records(cli.csv_dir.as_ref(), teacher).await?;
            let dashboard = dashboard::compute_dashboard(
                &records.students,
                &records.attendance,
                &records.merits,
                period,
                group.as_deref(),
                now,
                &config,
            );
            let cutoff = period::resolve_period_cutoff(period, now, &config.calendar);
            let report = report::build_report(group.as_deref(), period, cutoff, &dashboard);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
