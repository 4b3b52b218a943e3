use chrono::NaiveDate;
use sqlx::SqliteConnection;
use tracing::{info, instrument};

use crate::auth::{DbUser, User};
use crate::error::AppError;
#[cfg(test)]
use crate::models::{AttendanceRecord, DbAttendanceRecord};
use crate::models::{
    DbStudent, NewStudent, ReportRow, STATUS_ABSENT, STATUS_PRESENT, Student, StudentSummary,
};
use crate::reports::ReportFilter;

/// Plaintext lookup on both fields.
#[instrument(skip(conn, password))]
pub async fn authenticate_user(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, role FROM users WHERE username = ? AND password = ?",
    )
    .bind(username)
    .bind(password)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(User::from))
}

#[cfg(test)]
#[instrument(skip(conn, password))]
pub async fn create_user(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
    role: &str,
) -> Result<i64, AppError> {
    info!("Creating user");
    let res = sqlx::query("INSERT INTO users (username, password, role) VALUES (?, ?, ?)")
        .bind(username)
        .bind(password)
        .bind(role)
        .execute(&mut *conn)
        .await?;

    Ok(res.last_insert_rowid())
}

#[cfg(test)]
#[instrument(skip(conn))]
pub async fn count_users(conn: &mut SqliteConnection) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

#[instrument(skip(conn))]
pub async fn create_student(
    conn: &mut SqliteConnection,
    student: &NewStudent,
) -> Result<i64, AppError> {
    info!("Creating student");
    let res = sqlx::query(
        "INSERT INTO students (name, class_name, student_number, active) VALUES (?, ?, ?, 1)",
    )
    .bind(&student.name)
    .bind(&student.class_name)
    .bind(&student.student_number)
    .execute(&mut *conn)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(conn))]
pub async fn get_student(conn: &mut SqliteConnection, id: i64) -> Result<Student, AppError> {
    let row = sqlx::query_as::<_, DbStudent>(
        "SELECT id, name, class_name, student_number, active FROM students WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(student) => Ok(Student::from(student)),
        None => Err(AppError::NotFound(format!(
            "Student with id {} not found in database",
            id
        ))),
    }
}

#[instrument(skip(conn))]
pub async fn student_exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, AppError> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM students WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

#[instrument(skip(conn))]
pub async fn list_students(conn: &mut SqliteConnection) -> Result<Vec<Student>, AppError> {
    info!("Listing all students");
    let rows = sqlx::query_as::<_, DbStudent>(
        "SELECT id, name, class_name, student_number, active FROM students ORDER BY id",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Student::from).collect())
}

#[instrument(skip(conn))]
pub async fn list_active_students(conn: &mut SqliteConnection) -> Result<Vec<Student>, AppError> {
    info!("Listing active students");
    let rows = sqlx::query_as::<_, DbStudent>(
        "SELECT id, name, class_name, student_number, active FROM students
         WHERE active = 1
         ORDER BY name",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Student::from).collect())
}

#[instrument(skip(conn))]
pub async fn set_student_active(
    conn: &mut SqliteConnection,
    id: i64,
    active: bool,
) -> Result<(), AppError> {
    info!("Updating student active flag");
    let res = sqlx::query("UPDATE students SET active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Student with id {} not found in database",
            id
        )));
    }

    Ok(())
}

#[instrument(skip(conn, note))]
pub async fn insert_attendance(
    conn: &mut SqliteConnection,
    student_id: i64,
    date: NaiveDate,
    status: &str,
    note: Option<&str>,
) -> Result<i64, AppError> {
    let res =
        sqlx::query("INSERT INTO attendance (student_id, date, status, note) VALUES (?, ?, ?, ?)")
            .bind(student_id)
            .bind(date)
            .bind(status)
            .bind(note)
            .execute(&mut *conn)
            .await?;

    Ok(res.last_insert_rowid())
}

#[cfg(test)]
#[instrument(skip(conn))]
pub async fn get_attendance_for_student(
    conn: &mut SqliteConnection,
    student_id: i64,
) -> Result<Vec<AttendanceRecord>, AppError> {
    let rows = sqlx::query_as::<_, DbAttendanceRecord>(
        "SELECT id, student_id, date, status, note, created_at FROM attendance
         WHERE student_id = ?
         ORDER BY date DESC, id DESC",
    )
    .bind(student_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(AttendanceRecord::from).collect())
}

#[cfg(test)]
#[instrument(skip(conn))]
pub async fn count_attendance(conn: &mut SqliteConnection) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Records matching the filter, newest date first. Unset bounds bind as NULL
/// and leave that side of the range open.
#[instrument(skip(conn))]
pub async fn find_attendance(
    conn: &mut SqliteConnection,
    filter: &ReportFilter,
) -> Result<Vec<ReportRow>, AppError> {
    info!("Querying attendance records");
    let rows = sqlx::query_as::<_, ReportRow>(
        "SELECT a.id, a.student_id, s.name AS student_name, a.date, a.status, a.note
         FROM attendance a
         JOIN students s ON s.id = a.student_id
         WHERE (?1 IS NULL OR a.date >= ?1)
           AND (?2 IS NULL OR a.date <= ?2)
           AND (?3 IS NULL OR a.student_id = ?3)
         ORDER BY a.date DESC, a.id DESC",
    )
    .bind(filter.start)
    .bind(filter.end)
    .bind(filter.student_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

#[instrument(skip(conn))]
pub async fn summarize_attendance(
    conn: &mut SqliteConnection,
    filter: &ReportFilter,
) -> Result<Vec<StudentSummary>, AppError> {
    info!("Summarizing attendance");
    let rows = sqlx::query_as::<_, StudentSummary>(
        "SELECT s.id AS student_id, s.name AS name,
                COALESCE(SUM(CASE WHEN a.status = ?1 THEN 1 ELSE 0 END), 0) AS present,
                COALESCE(SUM(CASE WHEN a.status = ?2 THEN 1 ELSE 0 END), 0) AS absent,
                COUNT(a.id) AS total
         FROM students s
         LEFT JOIN attendance a ON a.student_id = s.id
              AND (?3 IS NULL OR a.date >= ?3)
              AND (?4 IS NULL OR a.date <= ?4)
         WHERE (?5 IS NULL OR s.id = ?5)
         GROUP BY s.id, s.name
         ORDER BY s.name",
    )
    .bind(STATUS_PRESENT)
    .bind(STATUS_ABSENT)
    .bind(filter.start)
    .bind(filter.end)
    .bind(filter.student_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}
