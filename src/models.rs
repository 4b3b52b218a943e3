use chrono::NaiveDate;
#[cfg(test)]
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const STATUS_PRESENT: &str = "present";
pub const STATUS_ABSENT: &str = "absent";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub class_name: Option<String>,
    pub student_number: Option<String>,
    pub active: bool,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbStudent {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub class_name: Option<String>,
    pub student_number: Option<String>,
    pub active: Option<bool>,
}

impl From<DbStudent> for Student {
    fn from(student: DbStudent) -> Self {
        Self {
            id: student.id.unwrap_or_default(),
            name: student.name.unwrap_or_default(),
            class_name: student.class_name,
            student_number: student.student_number,
            active: student.active.unwrap_or(true),
        }
    }
}

#[derive(Debug, Deserialize, Validate, Clone, Default)]
pub struct NewStudent {
    #[validate(length(min = 1, max = 200, message = "Student name is required"))]
    pub name: String,
    #[validate(length(max = 100))]
    pub class_name: Option<String>,
    #[validate(length(max = 50))]
    pub student_number: Option<String>,
}

impl NewStudent {
    /// Trims every field and turns blank optional fields into `None`, so an
    /// empty student number never collides with the unique constraint.
    pub fn normalized(self) -> Self {
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            name: self.name.trim().to_string(),
            class_name: blank_to_none(self.class_name),
            student_number: blank_to_none(self.student_number),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub date: NaiveDate,
    pub status: String,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
#[derive(sqlx::FromRow, Clone)]
pub struct DbAttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub date: NaiveDate,
    pub status: String,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
impl From<DbAttendanceRecord> for AttendanceRecord {
    fn from(db: DbAttendanceRecord) -> Self {
        Self {
            id: db.id,
            student_id: db.student_id,
            date: db.date,
            status: db.status,
            note: db.note,
            created_at: db.created_at,
        }
    }
}

/// An attendance record joined with the student's name, as listed in
/// reports.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
pub struct ReportRow {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub date: NaiveDate,
    pub status: String,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
pub struct StudentSummary {
    pub student_id: i64,
    pub name: String,
    pub present: i64,
    pub absent: i64,
    pub total: i64,
}
