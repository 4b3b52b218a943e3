use chrono::{Local, NaiveDate};
use rocket::Request;
use rocket::http::{RawStr, Status};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::attendance::{AttendanceSubmission, record_attendance};
use crate::auth::{LOGIN_ERROR_MESSAGE, User};
use crate::database::DbConn;
use crate::db::{authenticate_user, create_student, get_student, list_students, set_student_active};
use crate::models::{NewStudent, Student};
use crate::reports::{Report, ReportFilter, generate_report};
use crate::validation::{ApiError, AppErrorExt, JsonValidateExt, ToValidationResponse};

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    username: String,
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<User>,
    pub error: Option<String>,
    pub redirect_url: Option<String>,
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    mut conn: DbConn,
) -> Result<Json<LoginResponse>, ApiError> {
    let validated = login.validate_custom()?;

    match authenticate_user(&mut conn, &validated.username, &validated.password)
        .await
        .validate_custom()?
    {
        Some(user) => {
            let redirect_url = format!(
                "/dashboard?role={}",
                RawStr::new(&user.role).percent_encode()
            );

            Ok(Json(LoginResponse {
                success: true,
                user: Some(user),
                error: None,
                redirect_url: Some(redirect_url),
            }))
        }
        None => Ok(Json(LoginResponse {
            success: false,
            user: None,
            error: Some(LOGIN_ERROR_MESSAGE.to_string()),
            redirect_url: None,
        })),
    }
}

#[get("/students")]
pub async fn api_get_students(mut conn: DbConn) -> Result<Json<Vec<Student>>, ApiError> {
    let students = list_students(&mut conn).await.validate_custom()?;
    Ok(Json(students))
}

#[derive(Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[post("/students", data = "<student>")]
pub async fn api_create_student(
    student: Json<NewStudent>,
    mut conn: DbConn,
) -> Result<Custom<Json<CreatedResponse>>, ApiError> {
    let student = Json(student.into_inner().normalized()).validate_custom()?;

    let id = create_student(&mut conn, &student).await.validate_custom()?;

    Ok(Custom(Status::Created, Json(CreatedResponse { id })))
}

#[derive(Deserialize)]
pub struct StudentUpdateRequest {
    active: bool,
}

#[put("/students/<id>", data = "<update>")]
pub async fn api_update_student(
    id: i64,
    update: Json<StudentUpdateRequest>,
    mut conn: DbConn,
) -> Result<Json<Student>, ApiError> {
    set_student_active(&mut conn, id, update.active)
        .await
        .validate_custom()?;

    let student = get_student(&mut conn, id).await.validate_custom()?;
    Ok(Json(student))
}

#[derive(Serialize, Deserialize)]
pub struct AttendanceResponse {
    pub date: NaiveDate,
    pub inserted: usize,
}

#[post("/attendance", data = "<submission>")]
pub async fn api_record_attendance(
    submission: Json<AttendanceSubmission>,
    mut conn: DbConn,
) -> Result<Json<AttendanceResponse>, ApiError> {
    let submission = submission.validate_custom()?;
    let today = Local::now().date_naive();

    let inserted = record_attendance(&mut conn, &submission, today)
        .await
        .validate_custom()?;

    Ok(Json(AttendanceResponse {
        date: submission.date.unwrap_or(today),
        inserted,
    }))
}

#[get("/reports?<start>&<end>&<student>")]
pub async fn api_get_report(
    start: Option<&str>,
    end: Option<&str>,
    student: Option<&str>,
    mut conn: DbConn,
) -> Result<Json<Report>, ApiError> {
    let filter = ReportFilter::from_params(start, end, student).validate_custom()?;
    let report = generate_report(&mut conn, &filter).await.validate_custom()?;
    Ok(Json(report))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

#[catch(default)]
pub fn api_error(status: Status, _req: &Request) -> ApiError {
    status.to_validation_response()
}
