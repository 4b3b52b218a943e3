#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serial_test::serial;

    use crate::config::{
        AppConfig, DEFAULT_DATABASE_URL, DEFAULT_REPORT_FONT, DEFAULT_REPORT_TITLE, figment,
    };

    #[test]
    #[serial]
    fn test_defaults() {
        temp_env::with_vars_unset(
            [
                "PORT",
                "DATABASE_URL",
                "ATTENDANCE_REPORT_TITLE",
                "ATTENDANCE_DATABASE_URL",
                "ATTENDANCE_REPORT_FONT",
            ],
            || {
                let config = AppConfig::from_figment(&figment()).unwrap();
                assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
                assert_eq!(config.report_title, DEFAULT_REPORT_TITLE);
                assert_eq!(config.report_font, Some(PathBuf::from(DEFAULT_REPORT_FONT)));
            },
        );
    }

    #[test]
    #[serial]
    fn test_port_and_database_url_override() {
        temp_env::with_vars(
            [
                ("PORT", Some("8123")),
                ("DATABASE_URL", Some("sqlite://override.db")),
            ],
            || {
                let figment = figment();
                let port: u16 = figment.extract_inner("port").unwrap();
                assert_eq!(port, 8123);

                let config = AppConfig::from_figment(&figment).unwrap();
                assert_eq!(config.database_url, "sqlite://override.db");
            },
        );
    }

    #[test]
    #[serial]
    fn test_prefixed_settings() {
        temp_env::with_vars(
            [
                ("ATTENDANCE_REPORT_TITLE", Some("Monthly Attendance")),
                ("ATTENDANCE_REPORT_FONT", Some("fonts/Amiri-Regular.ttf")),
                ("ATTENDANCE_MAX_CONNECTIONS", Some("2")),
            ],
            || {
                let config = AppConfig::from_figment(&figment()).unwrap();
                assert_eq!(config.report_title, "Monthly Attendance");
                assert_eq!(
                    config.report_font.as_deref(),
                    Some(std::path::Path::new("fonts/Amiri-Regular.ttf"))
                );
                assert_eq!(config.max_connections, 2);
            },
        );
    }

    #[test]
    fn test_otlp_header_pairs() {
        let config = AppConfig {
            otlp_headers: Some("x-api-key = secret, ,=orphan,team=school".to_string()),
            ..AppConfig::default()
        };

        assert_eq!(
            config.otlp_header_pairs(),
            vec![
                ("x-api-key".to_string(), "secret".to_string()),
                ("team".to_string(), "school".to_string()),
            ]
        );
        assert!(AppConfig::default().otlp_header_pairs().is_empty());
    }
}
