use crate::models::{parse_due, Priority, TaskFields};
use crate::utils::validation::{validate_due, validate_text};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

// ============================================================================
// Insert
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct InsertTasksRequest {
    #[validate(nested)]
    pub tasks: Vec<NewTaskInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewTaskInput {
    #[serde(default)]
    #[validate(custom(function = "validate_text"))]
    pub title: String,

    #[serde(default)]
    #[validate(custom(function = "validate_text"))]
    pub content: String,

    #[serde(default)]
    #[validate(custom(function = "validate_due"))]
    pub due: String,

    #[serde(default)]
    #[validate(custom(function = "validate_text"))]
    pub priority_name: String,

    #[validate(required, range(min = 0, max = 100))]
    pub progress_id: Option<i32>,

    pub position: Option<f64>,
}

impl NewTaskInput {
    /// Convert a validated submission into column values.
    pub fn into_fields(self) -> Result<TaskFields, AppError> {
        let due = parse_due(&self.due).ok_or_else(|| invalid_due("due"))?;
        let progress_id = self.progress_id.ok_or_else(|| missing("progress_id"))?;

        Ok(TaskFields {
            priority: Priority::code_for_label(&self.priority_name),
            title: self.title,
            content: self.content,
            due,
            progress_id,
            position: self.position.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InsertedTask {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FailedInsert {
    pub title: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertTasksResponse {
    pub success_inserts: Vec<InsertedTask>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_inserts: Option<Vec<FailedInsert>>,
}

// ============================================================================
// Update
// ============================================================================

/// `priority` as sent by clients: either the numeric code or the display label.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PriorityInput {
    Code(i64),
    Label(String),
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTasksRequest {
    #[validate(nested)]
    pub tasks: Vec<TaskUpdateInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TaskUpdateInput {
    pub id: Option<i64>,

    #[serde(default)]
    #[validate(custom(function = "validate_text"))]
    pub title: String,

    #[serde(default)]
    #[validate(custom(function = "validate_text"))]
    pub content: String,

    #[serde(default)]
    #[validate(custom(function = "validate_due"))]
    pub due: String,

    #[validate(length(max = 255))]
    pub priority_name: Option<String>,

    pub priority: Option<PriorityInput>,

    #[validate(required, range(min = 0, max = 100))]
    pub progress_id: Option<i32>,

    pub position: Option<f64>,
}

impl TaskUpdateInput {
    /// Priority code to persist.
    ///
    /// A non-empty `priority_name` wins, then `priority` (code or label);
    /// anything unrecognised resolves to 0.
    pub fn resolved_priority(&self) -> i32 {
        if let Some(label) = self.priority_name.as_deref().filter(|l| !l.is_empty()) {
            return Priority::code_for_label(label);
        }

        match &self.priority {
            Some(PriorityInput::Code(code)) => i32::try_from(*code)
                .ok()
                .and_then(Priority::from_code)
                .map_or(0, |p| p.code()),
            Some(PriorityInput::Label(label)) => Priority::code_for_label(label),
            None => 0,
        }
    }

    /// Split a validated submission into its target id and column values.
    pub fn into_parts(self) -> Result<(Option<i64>, TaskFields), AppError> {
        let priority = self.resolved_priority();
        let due = parse_due(&self.due).ok_or_else(|| invalid_due("due"))?;
        let progress_id = self.progress_id.ok_or_else(|| missing("progress_id"))?;

        Ok((
            self.id,
            TaskFields {
                title: self.title,
                content: self.content,
                due,
                priority,
                progress_id,
                position: self.position.unwrap_or_default(),
            },
        ))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpdatedTask {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub due: DateTime<Utc>,
    pub priority: i32,
    pub progress_id: i32,
    pub position: f64,
}

impl UpdatedTask {
    pub fn new(id: i64, fields: TaskFields) -> Self {
        Self {
            id,
            title: fields.title,
            content: fields.content,
            due: fields.due,
            priority: fields.priority,
            progress_id: fields.progress_id,
            position: fields.position,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FailedUpdate {
    pub id: Option<i64>,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTasksResponse {
    pub success_updates: Vec<UpdatedTask>,
    pub failed_updates: Vec<FailedUpdate>,
}

// ============================================================================
// Delete
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DeleteTaskResponse {
    pub message: String,
}

fn invalid_due(field: &str) -> AppError {
    AppError::ValidationFailed(vec![format!("{field}は日時形式で入力してください")])
}

fn missing(field: &str) -> AppError {
    AppError::ValidationFailed(vec![format!("{field}は必須です")])
}
