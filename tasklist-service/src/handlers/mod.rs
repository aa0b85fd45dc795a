//! HTTP handlers for tasklist-service.

pub mod auth;
pub mod health;
pub mod tasks;

pub use auth::*;
pub use health::*;
pub use tasks::*;
