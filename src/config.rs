use std::path::PathBuf;

use rocket::figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://attendance.db";
pub const DEFAULT_REPORT_TITLE: &str = "Attendance Report";
/// Bundled DejaVu Sans, which covers Latin and Arabic. Relative paths resolve
/// against the working directory, like the template directory.
pub const DEFAULT_REPORT_FONT: &str = "fonts/DejaVuSans.ttf";

/// Application settings, extracted once at startup and handed to Rocket as
/// managed state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// TrueType font used for PDF exports. When unset the built-in Helvetica
    /// is used, which cannot encode non-Latin scripts.
    pub report_font: Option<PathBuf>,
    pub report_title: String,
    pub otlp_endpoint: Option<String>,
    /// Extra gRPC metadata for the OTLP exporter, as `key=value` pairs
    /// separated by commas.
    pub otlp_headers: Option<String>,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            report_font: Some(PathBuf::from(DEFAULT_REPORT_FONT)),
            report_title: DEFAULT_REPORT_TITLE.to_string(),
            otlp_endpoint: None,
            otlp_headers: None,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_figment(figment: &Figment) -> Result<Self, rocket::figment::Error> {
        figment.extract()
    }

    pub fn otlp_header_pairs(&self) -> Vec<(String, String)> {
        self.otlp_headers
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=')?;
                let key = key.trim();
                if key.is_empty() {
                    return None;
                }
                Some((key.to_string(), value.trim().to_string()))
            })
            .collect()
    }
}

/// Loads `config/common.env`, the profile specific file and `.secrets.env`
/// into the process environment, later files overriding earlier ones.
/// Missing files are skipped. Returns the files that were applied.
pub fn load_env_files() -> anyhow::Result<Vec<PathBuf>> {
    let profile = dotenvy::var("ROCKET_PROFILE").unwrap_or_else(|_| "debug".to_string());

    let candidates = [
        PathBuf::from("config/common.env"),
        PathBuf::from(format!("config/{}.env", profile)),
        PathBuf::from(".secrets.env"),
    ];

    let mut loaded = Vec::new();
    for path in candidates {
        if !path.exists() {
            continue;
        }
        dotenvy::from_filename_override(&path)?;
        loaded.push(path);
    }

    Ok(loaded)
}

/// Rocket's own figment plus the application defaults and overrides.
///
/// `PORT` and `DATABASE_URL` are honoured without prefix; every other
/// setting is read from `ATTENDANCE_*`.
pub fn figment() -> Figment {
    rocket::Config::figment()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Env::prefixed("ATTENDANCE_").global())
        .merge(Env::raw().only(&["port", "database_url"]).global())
}
