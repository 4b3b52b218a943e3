use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool};
use tracing::info;

use crate::config::AppConfig;
use crate::error::AppError;

pub async fn connect(config: &AppConfig) -> Result<SqlitePool, AppError> {
    info!(database_url = %config.database_url, "Connecting to SQLite database");

    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// A pooled connection held for the duration of one request. It goes back
/// to the pool when the guard drops, whichever way the handler exits.
pub struct DbConn(PoolConnection<Sqlite>);

impl Deref for DbConn {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DbConn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for DbConn {
    type Error = AppError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let pool = match request.rocket().state::<SqlitePool>() {
            Some(pool) => pool,
            None => {
                tracing::error!("Database pool not found in managed state");
                return Outcome::Error((
                    Status::InternalServerError,
                    AppError::Internal("database pool is not managed".to_string()),
                ));
            }
        };

        match pool.acquire().await {
            Ok(conn) => Outcome::Success(DbConn(conn)),
            Err(err) => {
                tracing::error!(error = %err, "Failed to acquire database connection");
                Outcome::Error((Status::ServiceUnavailable, AppError::Database(err)))
            }
        }
    }
}
