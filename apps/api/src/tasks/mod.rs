//! Content tasks: the status machine, content writes and asset generation.

pub mod content;
pub mod generation;
pub mod handlers;
pub mod status;

use crate::errors::AppError;
use crate::models::task::ContentTask;

pub use status::{TaskEvent, TaskStatus};

/// Moves `task` through `event`, leaving it untouched when the table rejects it.
pub fn transition(task: &mut ContentTask, event: TaskEvent) -> Result<(), AppError> {
    task.status = task.status.apply(event)?;
    Ok(())
}
