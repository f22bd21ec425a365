//! Boundary to the remote task service.
//!
//! The engine only sees [`TaskGateway`]; the service is the source of truth
//! for ids and timestamps, so every successful call hands back the task as
//! the service now stores it.

mod http;

use async_trait::async_trait;

use crate::error::MutationFailure;
use crate::task::{NewTask, Task, TaskId};

pub use http::HttpGateway;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// Lists every task of the signed-in user.
    async fn list_tasks(&self) -> Result<Vec<Task>, MutationFailure>;

    async fn create_task(&self, task: NewTask) -> Result<Task, MutationFailure>;

    /// Replaces the editable fields of an existing task.
    async fn update_task(&self, id: TaskId, task: NewTask) -> Result<Task, MutationFailure>;

    /// Flips `completed` server-side and returns the resulting task.
    async fn toggle_complete(&self, id: TaskId) -> Result<Task, MutationFailure>;

    async fn delete_task(&self, id: TaskId) -> Result<(), MutationFailure>;
}
