//! Tasklist Service - kanban task backend with batch insert/update reconciliation.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

pub use startup::AppState;
