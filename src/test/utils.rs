#[cfg(test)]
pub mod test_utils {
    use std::collections::HashMap;
    use std::sync::Once;

    use chrono::NaiveDate;
    use rocket::local::asynchronous::Client;
    use sqlx::pool::PoolConnection;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Sqlite, SqlitePool};
    use tracing::log::LevelFilter;

    use crate::config::{AppConfig, figment};
    use crate::database::apply_schema;
    use crate::db::{create_student, create_user, insert_attendance, set_student_active};
    use crate::error::AppError;
    use crate::init_rocket;
    use crate::models::NewStudent;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    pub fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("Invalid test date")
    }

    /// In-memory databases live as long as their connection, so the pool is
    /// pinned to a single connection that never expires.
    pub async fn test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database")
    }

    struct TestUser {
        username: String,
        password: String,
        role: String,
    }

    struct TestStudent {
        name: String,
        class_name: Option<String>,
        student_number: Option<String>,
        active: bool,
    }

    struct TestRecord {
        student_name: String,
        date: NaiveDate,
        status: String,
        note: Option<String>,
    }

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        students: Vec<TestStudent>,
        records: Vec<TestRecord>,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn user(mut self, username: &str, password: &str, role: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                password: password.to_string(),
                role: role.to_string(),
            });
            self
        }

        pub fn student(mut self, name: &str, student_number: Option<&str>) -> Self {
            self.students.push(TestStudent {
                name: name.to_string(),
                class_name: None,
                student_number: student_number.map(String::from),
                active: true,
            });
            self
        }

        pub fn student_in_class(mut self, name: &str, class_name: &str) -> Self {
            self.students.push(TestStudent {
                name: name.to_string(),
                class_name: Some(class_name.to_string()),
                student_number: None,
                active: true,
            });
            self
        }

        pub fn inactive_student(mut self, name: &str) -> Self {
            self.students.push(TestStudent {
                name: name.to_string(),
                class_name: None,
                student_number: None,
                active: false,
            });
            self
        }

        pub fn attendance(mut self, student_name: &str, day: &str, status: &str) -> Self {
            self.records.push(TestRecord {
                student_name: student_name.to_string(),
                date: date(day),
                status: status.to_string(),
                note: None,
            });
            self
        }

        pub fn attendance_with_note(
            mut self,
            student_name: &str,
            day: &str,
            status: &str,
            note: &str,
        ) -> Self {
            self.records.push(TestRecord {
                student_name: student_name.to_string(),
                date: date(day),
                status: status.to_string(),
                note: Some(note.to_string()),
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .filter_level(LevelFilter::Debug)
                    .is_test(true)
                    .try_init();
            });

            let pool = test_pool().await;
            apply_schema(&pool).await?;

            let mut conn = pool.acquire().await?;
            let mut student_id_map: HashMap<String, i64> = HashMap::new();

            for user in &self.users {
                create_user(&mut conn, &user.username, &user.password, &user.role).await?;
            }

            for student in &self.students {
                let new_student = NewStudent {
                    name: student.name.clone(),
                    class_name: student.class_name.clone(),
                    student_number: student.student_number.clone(),
                };
                let id = create_student(&mut conn, &new_student).await?;
                if !student.active {
                    set_student_active(&mut conn, id, false).await?;
                }
                student_id_map.insert(student.name.clone(), id);
            }

            for record in &self.records {
                let student_id = student_id_map
                    .get(&record.student_name)
                    .copied()
                    .ok_or_else(|| {
                        AppError::NotFound(format!("test student {}", record.student_name))
                    })?;
                insert_attendance(
                    &mut conn,
                    student_id,
                    record.date,
                    &record.status,
                    record.note.as_deref(),
                )
                .await?;
            }

            drop(conn);

            Ok(TestDb {
                pool,
                student_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: SqlitePool,
        pub student_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn student_id(&self, name: &str) -> i64 {
            self.student_id_map
                .get(name)
                .copied()
                .unwrap_or_else(|| panic!("Student {} not found", name))
        }

        /// Only hold this between requests: the pool has a single
        /// connection and the request guard needs it too.
        pub async fn conn(&self) -> PoolConnection<Sqlite> {
            self.pool
                .acquire()
                .await
                .expect("Failed to acquire test connection")
        }
    }

    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .user("admin", "1234", "admin")
            .user("teacher", STANDARD_PASSWORD, "teacher")
            .student("Ahmed", Some("S001"))
            .student("Sara", Some("S002"))
            .student_in_class("Layla", "5B")
            .inactive_student("Omar")
            .attendance("Ahmed", "2024-03-01", "present")
            .attendance("Sara", "2024-03-01", "absent")
            .attendance("Ahmed", "2024-03-02", "absent")
            .attendance_with_note("Sara", "2024-03-03", "present", "late bus")
            .attendance("Layla", "2024-03-05", "present")
            .build()
            .await
            .expect("Failed to build standard test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        setup_test_client_with_config(test_db, AppConfig::default()).await
    }

    pub async fn setup_test_client_with_config(
        test_db: TestDb,
        config: AppConfig,
    ) -> (Client, TestDb) {
        let rocket = init_rocket(figment(), test_db.pool.clone(), config);
        let client = Client::tracked(rocket)
            .await
            .expect("Failed to create Rocket test client");
        (client, test_db)
    }
}
