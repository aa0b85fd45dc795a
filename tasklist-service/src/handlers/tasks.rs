use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::dtos::tasks::{
    DeleteTaskResponse, InsertTasksRequest, InsertTasksResponse, UpdateTasksRequest,
    UpdateTasksResponse,
};
use crate::services::BatchOutcome;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

const DELETED_MESSAGE: &str = "タスクが正常に削除されました";

/// All tasks with their priority and progress labels.
pub async fn list_tasks(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let tasks = state.tasks.list().await?;
    Ok(Json(tasks))
}

/// Insert a batch of tasks in one transaction.
pub async fn insert_tasks(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<InsertTasksRequest>,
) -> Result<impl IntoResponse, AppError> {
    let fields = req
        .tasks
        .into_iter()
        .map(|task| task.into_fields())
        .collect::<Result<Vec<_>, _>>()?;

    let report = state.tasks.insert_batch(fields).await?;

    if report.committed() {
        Ok((
            StatusCode::OK,
            Json(InsertTasksResponse {
                success_inserts: report.inserted,
                failed_inserts: None,
            }),
        ))
    } else {
        Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(InsertTasksResponse {
                success_inserts: report.inserted,
                failed_inserts: Some(report.failed),
            }),
        ))
    }
}

/// Apply a batch of updates row by row.
pub async fn update_tasks(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UpdateTasksRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updates = req
        .tasks
        .into_iter()
        .map(|task| task.into_parts())
        .collect::<Result<Vec<_>, _>>()?;

    let report = state.tasks.update_batch(updates).await;

    let status = match report.outcome() {
        BatchOutcome::Complete => StatusCode::OK,
        BatchOutcome::Partial => StatusCode::PARTIAL_CONTENT,
        BatchOutcome::Failed => StatusCode::BAD_REQUEST,
    };

    Ok((
        status,
        Json(UpdateTasksResponse {
            success_updates: report.succeeded,
            failed_updates: report.failed,
        }),
    ))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id: i64 = id
        .parse()
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("IDは数値で指定してください")))?;

    state.tasks.delete(id).await?;

    Ok((
        StatusCode::OK,
        Json(DeleteTaskResponse {
            message: DELETED_MESSAGE.to_string(),
        }),
    ))
}
