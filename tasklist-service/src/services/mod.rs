//! Services layer for tasklist-service.

pub mod auth;
pub mod database;
pub mod error;
mod jwt;
pub mod metrics;
pub mod mock;
pub mod tasks;

pub use auth::AuthService;
pub use database::{BatchInsert, Database, TaskStore};
pub use error::ServiceError;
pub use jwt::{AccessTokenClaims, JwtService};
pub use metrics::{get_metrics, init_metrics, record_error, record_login, record_task_operation};
pub use mock::MockTaskStore;
pub use tasks::{BatchOutcome, InsertReport, TaskService, UpdateReport};
