use super::Priority;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

// ============================================================================
// Persisted rows
// ============================================================================

/// A `tasklist` row joined with its progress status.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub due: DateTime<Utc>,
    pub priority: i32,
    pub progress_id: i32,
    pub progress_name: String,
    pub position: f64,
}

/// Row of the `task_progress` lookup table.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ProgressStatus {
    pub id: i32,
    pub progress_name: String,
}

/// Column values written by insert and update.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFields {
    pub title: String,
    pub content: String,
    pub due: DateTime<Utc>,
    pub priority: i32,
    pub progress_id: i32,
    pub position: f64,
}

// ============================================================================
// Listing view
// ============================================================================

/// JSON shape of one entry in `GET /tasklist`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub due: DateTime<Utc>,
    pub priority: i32,
    pub priority_name: &'static str,
    pub progress_id: i32,
    pub progress_name: String,
    pub position: f64,
}

impl From<TaskRow> for TaskView {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            priority_name: Priority::label_for_code(row.priority),
            title: row.title,
            content: row.content,
            due: row.due,
            priority: row.priority,
            progress_id: row.progress_id,
            progress_name: row.progress_name,
            position: row.position,
        }
    }
}

// ============================================================================
// Due date parsing
// ============================================================================

const NAIVE_DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parse a submitted due date.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM[:SS]` and a bare
/// `YYYY-MM-DD` (midnight). Offset-less values are taken as UTC.
pub fn parse_due(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_with_offset() {
        let due = parse_due("2024-02-23T21:00:00+09:00").unwrap();
        assert_eq!(due, Utc.with_ymd_and_hms(2024, 2, 23, 12, 0, 0).unwrap());
    }

    #[test]
    fn parses_zulu_timestamp() {
        let due = parse_due("2024-02-23T12:00:00Z").unwrap();
        assert_eq!(due, Utc.with_ymd_and_hms(2024, 2, 23, 12, 0, 0).unwrap());
    }

    #[test]
    fn parses_sql_style_datetime() {
        let due = parse_due("2024-02-23 08:30:00").unwrap();
        assert_eq!(due, Utc.with_ymd_and_hms(2024, 2, 23, 8, 30, 0).unwrap());
    }

    #[test]
    fn parses_datetime_local_input() {
        let due = parse_due("2024-02-23T08:30").unwrap();
        assert_eq!(due, Utc.with_ymd_and_hms(2024, 2, 23, 8, 30, 0).unwrap());
    }

    #[test]
    fn parses_date_only_as_midnight() {
        let due = parse_due("2024-02-23").unwrap();
        assert_eq!(due, Utc.with_ymd_and_hms(2024, 2, 23, 0, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_due("").is_none());
        assert!(parse_due("tomorrow").is_none());
        assert!(parse_due("2024-13-40").is_none());
    }

    #[test]
    fn view_carries_priority_label() {
        let row = TaskRow {
            id: 4,
            title: "cuuat".to_string(),
            content: "内容1".to_string(),
            due: Utc.with_ymd_and_hms(2024, 2, 23, 12, 0, 0).unwrap(),
            priority: 2,
            progress_id: 1,
            progress_name: "未着手".to_string(),
            position: 1000.0,
        };

        let view = TaskView::from(row);
        assert_eq!(view.priority_name, "中");
        assert_eq!(view.progress_name, "未着手");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["due"], "2024-02-23T12:00:00Z");
        assert_eq!(json["priority_name"], "中");
    }
}
