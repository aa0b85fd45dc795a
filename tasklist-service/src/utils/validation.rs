use crate::models::parse_due;
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Longest accepted value for VARCHAR(255) columns, counted in characters.
pub const MAX_TEXT_LENGTH: usize = 255;

/// Returned when the body is not JSON of the expected shape.
pub const MALFORMED_REQUEST_MESSAGE: &str = "不正なリクエスト形式です";

const FALLBACK_MESSAGE: &str = "不正な入力です";

const FIELD_ORDER: [&str; 8] = [
    "id",
    "title",
    "content",
    "due",
    "priority_name",
    "priority",
    "progress_id",
    "position",
];

// ============================================================================
// Field validators
// ============================================================================

/// Required, at most [`MAX_TEXT_LENGTH`] characters.
pub fn validate_text(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("required"));
    }
    if value.chars().count() > MAX_TEXT_LENGTH {
        return Err(ValidationError::new("max"));
    }
    Ok(())
}

/// Required and parseable by [`parse_due`].
pub fn validate_due(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("required"));
    }
    if parse_due(value).is_none() {
        return Err(ValidationError::new("datetime"));
    }
    Ok(())
}

// ============================================================================
// Messages
// ============================================================================

/// Flatten validation errors into user-facing messages.
///
/// Messages are ordered by batch row, then by field position in the request.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut collected = Vec::new();
    collect(errors, 0, &mut collected);
    collected.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    collected.into_iter().map(|(_, _, message)| message).collect()
}

fn collect(errors: &ValidationErrors, row: usize, out: &mut Vec<(usize, usize, String)>) {
    for (field, kind) in errors.errors() {
        let field = field.to_string();
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    out.push((row, field_rank(&field), message_for(&field, error)));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, row, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, *index, out);
                }
            }
        }
    }
}

fn field_rank(field: &str) -> usize {
    FIELD_ORDER
        .iter()
        .position(|known| *known == field)
        .unwrap_or(FIELD_ORDER.len())
}

fn message_for(field: &str, error: &ValidationError) -> String {
    match error.code.as_ref() {
        "required" => format!("{field}は必須です"),
        "max" | "length" => format!("{field}は{MAX_TEXT_LENGTH}文字以内で入力してください"),
        "range" => match (error.params.get("min"), error.params.get("max")) {
            (Some(min), Some(max)) => format!(
                "{field}は{}から{}の範囲で入力してください",
                param_text(min),
                param_text(max)
            ),
            _ => FALLBACK_MESSAGE.to_string(),
        },
        "datetime" => format!("{field}は日時形式で入力してください"),
        _ => FALLBACK_MESSAGE.to_string(),
    }
}

fn param_text(value: &serde_json::Value) -> String {
    match value.as_f64() {
        Some(number) if number.fract() == 0.0 => format!("{}", number as i64),
        _ => value.to_string(),
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// JSON body that has passed `validator` checks.
///
/// Malformed bodies and failed checks both become a 400 with an `errors` list.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            tracing::warn!(error = %e, "JSON body rejected");
            AppError::ValidationFailed(vec![MALFORMED_REQUEST_MESSAGE.to_string()])
        })?;

        value.validate().map_err(|e| {
            let messages = validation_messages(&e);
            tracing::warn!(errors = ?messages, "Request validation failed");
            AppError::ValidationFailed(messages)
        })?;

        Ok(ValidatedJson(value))
    }
}
