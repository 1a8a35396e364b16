use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::{ErrorBody, TaskId};
use thiserror::Error;

pub const TITLE_REQUIRED: &str = "Title is required";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("todo {0} not found")]
    NotFound(TaskId),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn title_required() -> Self {
        StoreError::Validation(TITLE_REQUIRED.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Unavailable(format!("corrupt record: {e}"))
    }
}

/// Which endpoint failed; picks the fixed message for server errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::List => "Failed to fetch todos",
            Operation::Get => "Failed to fetch todo",
            Operation::Create => "Failed to create todo",
            Operation::Update => "Failed to update todo",
            Operation::Delete => "Failed to delete todo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: &'static str,
}

impl ApiError {
    pub const INVALID_BODY: &'static str = "Invalid request body";
    pub const NOT_FOUND: &'static str = "Todo not found";

    pub fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }

    pub fn invalid_body() -> Self {
        Self::new(StatusCode::BAD_REQUEST, Self::INVALID_BODY)
    }

    /// Maps a store failure to the response for `operation`, logging the cause.
    /// The cause never reaches the client.
    pub fn from_store(operation: Operation, error: StoreError) -> Self {
        match error {
            StoreError::Validation(reason) => {
                tracing::warn!(?operation, %reason, "Rejected invalid input");
                Self::new(StatusCode::BAD_REQUEST, TITLE_REQUIRED)
            }
            StoreError::NotFound(id) => {
                tracing::warn!(?operation, id, "Todo not found");
                Self::new(StatusCode::NOT_FOUND, Self::NOT_FOUND)
            }
            StoreError::Unavailable(cause) => {
                let message = operation.failure_message();
                tracing::error!(?operation, %cause, "{message}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}
