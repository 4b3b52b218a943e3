#[macro_use]
extern crate rocket;

mod api;
mod attendance;
mod auth;
mod config;
mod database;
mod db;
mod error;
mod export;
mod models;
mod reports;
mod routes;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use std::sync::Mutex;

use api::{
    api_create_student, api_error, api_get_report, api_get_students, api_login,
    api_record_attendance, api_update_student, health,
};
use auth::{login, process_login};
use config::AppConfig;
use error::AppError;
use once_cell::sync::Lazy;
use rocket::figment::Figment;
use rocket::{Build, Rocket};
use rocket_dyn_templates::Template;
use routes::{
    add_student, attendance_form, dashboard, download_pdf, error_page, mark_attendance,
    reports_form, reports_page, submit_attendance,
};
use sqlx::SqlitePool;
use telemetry::{OtelGuard, TelemetryFairing, init_tracing, shutdown_telemetry};
use thiserror::Error;
use tracing::info;

pub static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Figment(rocket::figment::Error),
    #[error("{0}")]
    Rocket(Box<rocket::Error>),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::figment::Error> for Error {
    fn from(value: rocket::figment::Error) -> Self {
        Error::Figment(value)
    }
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Rocket(Box::new(value))
    }
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    let env_files = config::load_env_files()?;
    let figment = config::figment();
    let app_config = AppConfig::from_figment(&figment)?;

    let guard = init_tracing(&app_config)?;
    if let Ok(mut slot) = TELEMETRY_GUARD.lock() {
        *slot = guard;
    }

    for path in &env_files {
        info!(path = %path.display(), "Loaded environment file");
    }

    let pool = database::connect(&app_config).await?;
    database::init_database(&pool).await?;

    let result = init_rocket(figment, pool, app_config).launch().await;
    shutdown_telemetry();
    result?;

    Ok(())
}

pub fn init_rocket(figment: Figment, pool: SqlitePool, config: AppConfig) -> Rocket<Build> {
    info!("Starting attendance tracker");

    rocket::custom(figment)
        .manage(pool)
        .manage(config)
        .mount(
            "/",
            routes![
                login,
                process_login,
                dashboard,
                add_student,
                attendance_form,
                submit_attendance,
                mark_attendance,
                reports_page,
                reports_form,
                download_pdf,
            ],
        )
        .mount(
            "/api",
            routes![
                api_login,
                api_get_students,
                api_create_student,
                api_update_student,
                api_record_attendance,
                api_get_report,
                health,
            ],
        )
        .register("/", catchers![error_page])
        .register("/api", catchers![api_error])
        .attach(Template::fairing())
        .attach(TelemetryFairing)
}
