use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{info, instrument};

use crate::attendance::parse_date;
use crate::db::{find_attendance, list_active_students, summarize_attendance};
use crate::error::AppError;
use crate::models::{ReportRow, Student, StudentSummary};

/// Inclusive date range and optional student. Any unset part matches
/// everything.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub student_id: Option<i64>,
}

impl ReportFilter {
    /// Parses raw query or form values. Blank values are treated as absent.
    pub fn from_params(
        start: Option<&str>,
        end: Option<&str>,
        student: Option<&str>,
    ) -> Result<Self, AppError> {
        let start = match start {
            Some(value) => parse_date(value)?,
            None => None,
        };
        let end = match end {
            Some(value) => parse_date(value)?,
            None => None,
        };

        let student_id = match student.map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => Some(value.parse::<i64>().map_err(|_| {
                AppError::Validation(format!("Invalid student id '{}'", value))
            })?),
            None => None,
        };

        Ok(Self {
            start,
            end,
            student_id,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Report {
    pub filter: ReportFilter,
    pub records: Vec<ReportRow>,
    /// Active roster, for the filter controls.
    pub students: Vec<Student>,
    pub summary: Vec<StudentSummary>,
}

#[instrument(skip(conn))]
pub async fn generate_report(
    conn: &mut SqliteConnection,
    filter: &ReportFilter,
) -> Result<Report, AppError> {
    let records = find_attendance(conn, filter).await?;
    let students = list_active_students(conn).await?;
    let summary = summarize_attendance(conn, filter).await?;

    info!(records = records.len(), "Report generated");

    Ok(Report {
        filter: *filter,
        records,
        students,
        summary,
    })
}
