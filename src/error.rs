use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the dashboard library
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("background task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl From<envy::Error> for DashboardError {
    fn from(err: envy::Error) -> Self {
        DashboardError::Config(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DashboardError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            DashboardError::Task("fetch cancelled".to_string())
        } else {
            DashboardError::Task(err.to_string())
        }
    }
}
