use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{Connection, SqliteConnection};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::db::{insert_attendance, student_exists};
use crate::error::AppError;

pub const DATE_FIELD: &str = "date";
pub const BLANKET_NOTE_FIELD: &str = "note";

static NOTE_FIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^note_(\d+)$").unwrap());
static STUDENT_FIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct AttendanceEntry {
    #[validate(range(min = 1, message = "Student id must be positive"))]
    pub student_id: i64,
    #[validate(length(min = 1, max = 50, message = "Status is required"))]
    pub status: String,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// One batch of statuses for a single date. A missing date means today.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Default)]
pub struct AttendanceSubmission {
    pub date: Option<NaiveDate>,
    #[validate(nested)]
    pub entries: Vec<AttendanceEntry>,
}

pub fn parse_date(value: &str) -> Result<Option<NaiveDate>, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", value)))
}

/// Only plain digit strings name a student; signs and whitespace do not.
fn parse_student_id(key: &str) -> Option<i64> {
    if !STUDENT_FIELD.is_match(key) {
        return None;
    }
    key.parse::<i64>().ok().filter(|id| *id > 0)
}

impl AttendanceSubmission {
    /// Builds a submission from the flat marking form: `date`, one
    /// `<student_id>=<status>` per student and optional `note_<student_id>`
    /// fields. The blanket `note` field and any other key that is not a
    /// student id are ignored, as are entries with a blank status.
    pub fn from_form_fields(
        fields: &HashMap<String, String>,
        today: NaiveDate,
    ) -> Result<Self, AppError> {
        let date = match fields.get(DATE_FIELD) {
            Some(value) => parse_date(value)?.unwrap_or(today),
            None => today,
        };

        let mut notes: HashMap<i64, String> = HashMap::new();
        let mut statuses: BTreeMap<i64, String> = BTreeMap::new();

        for (key, value) in fields {
            if key == DATE_FIELD || key == BLANKET_NOTE_FIELD {
                continue;
            }

            if let Some(captures) = NOTE_FIELD.captures(key) {
                if let Some(id) = parse_student_id(&captures[1]) {
                    let note = value.trim();
                    if !note.is_empty() {
                        notes.insert(id, note.to_string());
                    }
                }
                continue;
            }

            let Some(student_id) = parse_student_id(key) else {
                continue;
            };

            let status = value.trim();
            if status.is_empty() {
                continue;
            }
            statuses.insert(student_id, status.to_string());
        }

        let entries = statuses
            .into_iter()
            .map(|(student_id, status)| AttendanceEntry {
                student_id,
                status,
                note: notes.remove(&student_id),
            })
            .collect();

        Ok(Self {
            date: Some(date),
            entries,
        })
    }
}

/// Inserts one record per entry in a single transaction and returns how many
/// rows were written. Entries for unknown students are skipped.
#[instrument(skip(conn, submission), fields(entries = submission.entries.len()))]
pub async fn record_attendance(
    conn: &mut SqliteConnection,
    submission: &AttendanceSubmission,
    today: NaiveDate,
) -> Result<usize, AppError> {
    submission
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let date = submission.date.unwrap_or(today);

    let mut tx = conn.begin().await?;
    let mut inserted = 0;

    for entry in &submission.entries {
        if !student_exists(&mut *tx, entry.student_id).await? {
            warn!(student_id = entry.student_id, "Skipping attendance for unknown student");
            continue;
        }

        insert_attendance(
            &mut *tx,
            entry.student_id,
            date,
            &entry.status,
            entry.note.as_deref(),
        )
        .await?;
        inserted += 1;
    }

    tx.commit().await?;

    info!(%date, inserted, "Attendance recorded");
    Ok(inserted)
}

/// Marks a single student for today.
pub async fn mark_single(
    conn: &mut SqliteConnection,
    student_id: i64,
    status: &str,
    today: NaiveDate,
) -> Result<usize, AppError> {
    let submission = AttendanceSubmission {
        date: Some(today),
        entries: vec![AttendanceEntry {
            student_id,
            status: status.trim().to_string(),
            note: None,
        }],
    };

    record_attendance(conn, &submission, today).await
}
