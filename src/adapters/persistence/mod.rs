use sqlx::PgPool;

use crate::app_error::AppError;

pub mod account;
pub mod device;
pub mod webhook_event;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    AppError::InvalidInput("A record with this value already exists".into())
                } else if db_err.is_foreign_key_violation() {
                    AppError::InvalidInput("Referenced record not found".into())
                } else if db_err.is_check_violation() {
                    AppError::InvalidInput("Value rejected by a constraint".into())
                } else {
                    // Details stay in the log
                    tracing::error!(error = ?err, "Database error");
                    AppError::Database("Database operation failed".into())
                }
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
