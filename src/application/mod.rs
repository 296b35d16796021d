//! Application layer: component lifecycle hooks and services
//!
//! This layer orchestrates domain logic on a catalog.

pub mod error;
pub mod hooks;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use hooks::{ComponentDraft, OperationComponentHooks};
