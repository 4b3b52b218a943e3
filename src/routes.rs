use std::collections::HashMap;
use std::convert::Infallible;

use chrono::{Local, NaiveDate};
use rocket::form::Form;
use rocket::http::{Header, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::response::Redirect;
use rocket::response::status::Custom;
use rocket::tokio::task::spawn_blocking;
use rocket::{Request, State};
use rocket_dyn_templates::{Template, context};
use serde::Serialize;
use tracing::info;
use validator::Validate;

use crate::attendance::{AttendanceSubmission, mark_single, record_attendance};
use crate::config::AppConfig;
use crate::database::DbConn;
use crate::db::{create_student, list_active_students, list_students};
use crate::error::AppError;
use crate::export::{LINES_PER_PAGE, ReportFont, ReportLayout, render_pdf, report_title};
use crate::models::{NewStudent, STATUS_ABSENT, STATUS_PRESENT};
use crate::reports::{ReportFilter, generate_report};

pub const REPORT_FILENAME: &str = "attendance_report.pdf";

#[derive(Serialize)]
struct StatusOption {
    value: &'static str,
    label: &'static str,
}

const STATUS_OPTIONS: [StatusOption; 2] = [
    StatusOption {
        value: STATUS_PRESENT,
        label: "حاضر",
    },
    StatusOption {
        value: STATUS_ABSENT,
        label: "غائب",
    },
];

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The page the request came from, used to send form posts back where they
/// started.
pub struct Referer(Option<String>);

impl Referer {
    pub fn redirect_or(self, fallback: &str) -> Redirect {
        Redirect::to(self.0.unwrap_or_else(|| fallback.to_string()))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Referer {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(Referer(
            request.headers().get_one("Referer").map(str::to_string),
        ))
    }
}

#[get("/dashboard?<role>")]
pub async fn dashboard(role: Option<String>, mut conn: DbConn) -> Result<Template, AppError> {
    let students = list_students(&mut conn).await?;

    Ok(Template::render(
        "dashboard",
        context! {
            title: "لوحة التحكم",
            role: role.unwrap_or_default(),
            students: students,
        },
    ))
}

#[derive(FromForm)]
pub struct AddStudentForm {
    name: String,
    class_name: Option<String>,
    student_number: Option<String>,
}

#[post("/add_student", data = "<form>")]
pub async fn add_student(
    mut conn: DbConn,
    form: Form<AddStudentForm>,
    referer: Referer,
) -> Result<Redirect, AppError> {
    let form = form.into_inner();
    let student = NewStudent {
        name: form.name,
        class_name: form.class_name,
        student_number: form.student_number,
    }
    .normalized();

    student
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let id = create_student(&mut conn, &student).await?;
    info!(student_id = id, "Student added to roster");

    Ok(referer.redirect_or("/dashboard"))
}

#[get("/attendance")]
pub async fn attendance_form(mut conn: DbConn) -> Result<Template, AppError> {
    let students = list_active_students(&mut conn).await?;

    Ok(Template::render(
        "attendance",
        context! {
            title: "تسجيل الحضور",
            today: today(),
            students: students,
            statuses: STATUS_OPTIONS,
        },
    ))
}

#[post("/attendance", data = "<form>")]
pub async fn submit_attendance(
    mut conn: DbConn,
    form: Form<HashMap<String, String>>,
) -> Result<Redirect, AppError> {
    let today = today();
    let submission = AttendanceSubmission::from_form_fields(&form, today)?;
    let date = submission.date.unwrap_or(today);

    record_attendance(&mut conn, &submission, today).await?;

    Ok(Redirect::to(format!("/reports?start={}&end={}", date, date)))
}

#[get("/attendance/<student_id>/<status>")]
pub async fn mark_attendance(
    student_id: i64,
    status: &str,
    mut conn: DbConn,
    referer: Referer,
) -> Result<Redirect, AppError> {
    mark_single(&mut conn, student_id, status, today()).await?;
    Ok(referer.redirect_or("/attendance"))
}

async fn render_reports(
    conn: &mut DbConn,
    start: Option<&str>,
    end: Option<&str>,
    student: Option<&str>,
) -> Result<Template, AppError> {
    let filter = ReportFilter::from_params(start, end, student)?;
    let report = generate_report(conn, &filter).await?;

    Ok(Template::render(
        "reports",
        context! {
            title: "التقارير",
            start: filter.start.map(|d| d.to_string()).unwrap_or_default(),
            end: filter.end.map(|d| d.to_string()).unwrap_or_default(),
            selected_student: filter.student_id,
            query: filter_query(&filter),
            report: report,
        },
    ))
}

fn filter_query(filter: &ReportFilter) -> String {
    let mut params = Vec::new();
    if let Some(start) = filter.start {
        params.push(format!("start={}", start));
    }
    if let Some(end) = filter.end {
        params.push(format!("end={}", end));
    }
    if let Some(student_id) = filter.student_id {
        params.push(format!("student={}", student_id));
    }
    params.join("&")
}

#[get("/reports?<start>&<end>&<student>")]
pub async fn reports_page(
    start: Option<&str>,
    end: Option<&str>,
    student: Option<&str>,
    mut conn: DbConn,
) -> Result<Template, AppError> {
    render_reports(&mut conn, start, end, student).await
}

#[derive(FromForm)]
pub struct ReportForm {
    start: Option<String>,
    end: Option<String>,
    student: Option<String>,
}

#[post("/reports", data = "<form>")]
pub async fn reports_form(mut conn: DbConn, form: Form<ReportForm>) -> Result<Template, AppError> {
    render_reports(
        &mut conn,
        form.start.as_deref(),
        form.end.as_deref(),
        form.student.as_deref(),
    )
    .await
}

#[derive(Responder)]
#[response(content_type = "application/pdf")]
pub struct PdfDownload {
    body: Vec<u8>,
    disposition: Header<'static>,
}

impl PdfDownload {
    pub fn new(body: Vec<u8>, filename: &str) -> Self {
        Self {
            body,
            disposition: Header::new(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", filename),
            ),
        }
    }
}

#[get("/download_pdf?<start>&<end>&<student>")]
pub async fn download_pdf(
    start: Option<&str>,
    end: Option<&str>,
    student: Option<&str>,
    mut conn: DbConn,
    config: &State<AppConfig>,
) -> Result<PdfDownload, AppError> {
    let filter = ReportFilter::from_params(start, end, student)?;
    let report = generate_report(&mut conn, &filter).await?;
    drop(conn);

    let layout = ReportLayout::paginate(
        &report_title(&config.report_title, &filter),
        &report.records,
        LINES_PER_PAGE,
    );
    let font = ReportFont::from_config(config.report_font.as_ref());
    let body = spawn_blocking(move || render_pdf(&layout, &font))
        .await
        .map_err(|e| AppError::Internal(format!("PDF rendering task failed: {}", e)))??;

    Ok(PdfDownload::new(body, REPORT_FILENAME))
}

/// Localized error page for every status the HTML surface can produce.
#[catch(default)]
pub fn error_page(status: Status, _req: &Request) -> Custom<Template> {
    let message = match status.code {
        400 | 422 => "طلب غير صالح",
        404 => "الصفحة غير موجودة",
        503 => "الخدمة غير متاحة حاليا",
        _ => "حدث خطأ في الخادم",
    };

    Custom(
        status,
        Template::render(
            "error",
            context! {
                title: "خطأ",
                code: status.code,
                message: message,
            },
        ),
    )
}
