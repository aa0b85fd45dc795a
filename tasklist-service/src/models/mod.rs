//! Domain models for tasklist-service.

mod priority;
mod task;
mod user;

pub use priority::{Priority, UNKNOWN_PRIORITY_LABEL};
pub use task::{parse_due, ProgressStatus, TaskFields, TaskRow, TaskView};
pub use user::UserRecord;
