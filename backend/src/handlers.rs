use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use shared::{CreateTaskRequest, MessageBody, Task, TaskId, UpdateTaskRequest};

use crate::error::{ApiError, Operation};
use crate::store::SharedStore;

pub const DELETED_MESSAGE: &str = "Todo deleted successfully";

type ApiResult<T> = Result<T, ApiError>;

/// Non-numeric ids cannot name a task, so they get the not-found response
/// without reaching the store.
fn parse_id(raw: &str, operation: Operation) -> ApiResult<TaskId> {
    raw.parse().map_err(|_| {
        tracing::warn!(?operation, id = raw, "Invalid todo id");
        ApiError::new(StatusCode::NOT_FOUND, ApiError::NOT_FOUND)
    })
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>, operation: Operation) -> ApiResult<T> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::warn!(?operation, error = %rejection, "Rejected request body");
            Err(ApiError::invalid_body())
        }
    }
}

pub async fn list_todos(State(store): State<SharedStore>) -> ApiResult<Json<Vec<Task>>> {
    let tasks = store
        .list()
        .await
        .map_err(|e| ApiError::from_store(Operation::List, e))?;
    Ok(Json(tasks))
}

pub async fn get_todo(
    Path(id): Path<String>,
    State(store): State<SharedStore>,
) -> ApiResult<Json<Task>> {
    let id = parse_id(&id, Operation::Get)?;
    let task = store
        .get(id)
        .await
        .map_err(|e| ApiError::from_store(Operation::Get, e))?;
    Ok(Json(task))
}

pub async fn create_todo(
    State(store): State<SharedStore>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let request = parse_body(payload, Operation::Create)?;
    let task = store
        .create(request)
        .await
        .map_err(|e| ApiError::from_store(Operation::Create, e))?;

    tracing::info!(id = task.id, "Todo created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_todo(
    Path(id): Path<String>,
    State(store): State<SharedStore>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let id = parse_id(&id, Operation::Update)?;
    let patch = parse_body(payload, Operation::Update)?;
    let task = store
        .update(id, patch)
        .await
        .map_err(|e| ApiError::from_store(Operation::Update, e))?;

    tracing::info!(id, completed = task.completed, "Todo updated");
    Ok(Json(task))
}

pub async fn delete_todo(
    Path(id): Path<String>,
    State(store): State<SharedStore>,
) -> ApiResult<Json<MessageBody>> {
    let id = parse_id(&id, Operation::Delete)?;
    store
        .delete(id)
        .await
        .map_err(|e| ApiError::from_store(Operation::Delete, e))?;

    tracing::info!(id, "Todo deleted");
    Ok(Json(MessageBody {
        message: DELETED_MESSAGE.to_string(),
    }))
}
