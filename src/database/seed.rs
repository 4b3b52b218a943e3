use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;

pub const SEED_ADMIN: (&str, &str, &str) = ("admin", "1234", "admin");

/// Sample roster inserted on first run as `(name, student_number)`. The
/// numbers carry the unique constraint that keeps re-seeding idempotent.
pub const SEED_STUDENTS: [(&str, &str); 5] = [
    ("أحمد", "S001"),
    ("سارة", "S002"),
    ("محمد", "S003"),
    ("ليلى", "S004"),
    ("علي", "S005"),
];

#[instrument(skip(pool))]
pub async fn seed_database(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let (username, password, role) = SEED_ADMIN;
    let admin = sqlx::query("INSERT OR IGNORE INTO users (username, password, role) VALUES (?, ?, ?)")
        .bind(username)
        .bind(password)
        .bind(role)
        .execute(&mut *tx)
        .await?;

    let mut students_added = 0;
    for (name, number) in SEED_STUDENTS {
        let res =
            sqlx::query("INSERT OR IGNORE INTO students (name, student_number) VALUES (?, ?)")
                .bind(name)
                .bind(number)
                .execute(&mut *tx)
                .await?;
        students_added += res.rows_affected();
    }

    tx.commit().await?;

    info!(
        admin_added = admin.rows_affected(),
        students_added, "Seed data applied"
    );
    Ok(())
}

/// Schema followed by seed data, as run at startup.
pub async fn init_database(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    super::apply_schema(pool).await?;
    seed_database(pool).await
}
