//! Data models for Taskdeck entities.
//!
//! - `Task`, `TaskStatus`, `TaskPriority`: the task domain types
//! - `NewTask`, `TaskPatch`: create/update payloads
//! - `TaskFilter`, `TaskPage`, `PageMeta`: listing parameters and envelope
//! - `User`, `TokenPair`: account and credential exchange types

pub mod task;
pub mod user;

pub use task::{NewTask, PageMeta, Task, TaskFilter, TaskPage, TaskPatch, TaskPriority, TaskStatus};
pub use user::{TokenPair, User};
