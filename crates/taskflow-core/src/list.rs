//! The canonical task list.
//!
//! [`TaskListController`] is the only writer of the list. Every change it
//! makes follows a result the task service already confirmed, so a failed
//! call never needs compensating work here.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::datetime::is_same_day;
use crate::error::{EngineError, FormError};
use crate::form::{FormMode, SAVE_FAILED, SubmitOutcome, TaskForm};
use crate::gateway::TaskGateway;
use crate::interaction::{ItemBusy, ItemInteractions};
use crate::notify::Notifier;
use crate::task::{Priority, Task, TaskId};

pub const TASK_CREATED: &str = "Task created";
pub const TASK_UPDATED: &str = "Task updated";
pub const TASK_DELETED: &str = "Task deleted";
pub const DELETE_FAILED: &str = "Failed to delete task";
pub const LOAD_FAILED: &str = "Failed to load tasks";

/// Commands the per-item controller sends to the list owner.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskCommands: Send + Sync {
    /// Replaces the task with the same id by a confirmed version of it.
    fn apply_update(&self, task: Task) -> Result<(), EngineError>;

    /// Deletes the task remotely, then drops it from the list.
    async fn request_removal(&self, id: TaskId) -> Result<(), EngineError>;
}

/// Sidebar views over the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Completed,
    Today,
    Priority,
}

impl TaskFilter {
    pub fn matches(self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Completed => task.completed,
            TaskFilter::Today => task.due_date.map(|due| is_same_day(due, now)).unwrap_or(false),
            TaskFilter::Priority => task.priority == Priority::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown filter '{0}', expected all, completed, today or priority")]
pub struct ParseFilterError(String);

impl FromStr for TaskFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "completed" | "done" => Ok(TaskFilter::Completed),
            "today" => Ok(TaskFilter::Today),
            "priority" => Ok(TaskFilter::Priority),
            _ => Err(ParseFilterError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueBadge {
    pub due: DateTime<Utc>,
    pub overdue: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badges {
    pub priority: Priority,
    pub category: Option<String>,
    pub due: Option<DueBadge>,
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: TaskId,
    pub completed: bool,
    pub title_display: String,
    /// `None` when the description is empty and nothing should be drawn.
    pub description_display: Option<String>,
    pub badges: Badges,
    pub created_at: DateTime<Utc>,
    pub busy: ItemBusy,
}

pub struct TaskListController {
    gateway: Arc<dyn TaskGateway>,
    notifier: Arc<dyn Notifier>,
    tasks: Mutex<Vec<Task>>,
}

impl TaskListController {
    pub fn new(gateway: Arc<dyn TaskGateway>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            notifier,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.tasks.lock().iter().find(|task| task.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Replaces the list with what the service currently holds. Repeated ids
    /// in the response keep their first occurrence.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<usize, EngineError> {
        let fetched = match self.gateway.list_tasks().await {
            Ok(tasks) => tasks,
            Err(failure) => {
                warn!(error = %failure, "loading tasks failed");
                self.notifier.notify_failure(LOAD_FAILED);
                return Err(failure.into());
            }
        };

        let mut unique: Vec<Task> = Vec::with_capacity(fetched.len());
        for task in fetched {
            if unique.iter().any(|seen| seen.id == task.id) {
                warn!(id = %task.id, "service returned a task id twice; keeping the first");
                continue;
            }
            unique.push(task);
        }

        let count = unique.len();
        *self.tasks.lock() = unique;
        info!(count, "task list loaded");
        Ok(count)
    }

    /// Appends a newly created task.
    pub fn apply_create(&self, task: Task) -> Result<(), EngineError> {
        let mut tasks = self.tasks.lock();
        if tasks.iter().any(|existing| existing.id == task.id) {
            error!(id = %task.id, "created task id already present");
            return Err(EngineError::DuplicateId(task.id));
        }
        debug!(id = %task.id, "appending created task");
        tasks.push(task);
        Ok(())
    }

    /// Removes `id`. Removing an id that is not present does nothing.
    pub fn apply_removal(&self, id: TaskId) {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|task| task.id != id);
        if tasks.len() == before {
            debug!(id = %id, "removal of absent task ignored");
        }
    }

    /// Submits `form` and commits the saved task.
    #[instrument(skip(self, form), fields(create = form.mode().is_create()))]
    pub async fn submit_form(&self, form: &TaskForm) -> Result<SubmitOutcome, EngineError> {
        match form.submit(self.gateway.as_ref()).await {
            Ok(SubmitOutcome::Saved(task)) => {
                match form.mode() {
                    FormMode::Create => {
                        self.apply_create(task.clone())?;
                        self.notifier.notify_success(TASK_CREATED);
                    }
                    FormMode::Edit { .. } => {
                        self.apply_update(task.clone())?;
                        self.notifier.notify_success(TASK_UPDATED);
                    }
                }
                Ok(SubmitOutcome::Saved(task))
            }
            Ok(SubmitOutcome::AlreadySubmitting) => Ok(SubmitOutcome::AlreadySubmitting),
            Err(err @ FormError::Mutation(_)) => {
                self.notifier.notify_failure(SAVE_FAILED);
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Rows for every task in list order.
    pub fn views(&self, items: &ItemInteractions, now: DateTime<Utc>) -> Vec<TaskView> {
        self.tasks
            .lock()
            .iter()
            .map(|task| view_of(task, items.busy(task.id), now))
            .collect()
    }

    pub fn filtered(&self, filter: TaskFilter, now: DateTime<Utc>) -> Vec<Task> {
        self.tasks
            .lock()
            .iter()
            .filter(|task| filter.matches(task, now))
            .cloned()
            .collect()
    }
}

fn view_of(task: &Task, busy: ItemBusy, now: DateTime<Utc>) -> TaskView {
    let description = task.description.trim();
    TaskView {
        id: task.id,
        completed: task.completed,
        title_display: task.title.clone(),
        description_display: (!description.is_empty()).then(|| task.description.clone()),
        badges: Badges {
            priority: task.priority,
            category: task.category.clone().filter(|category| !category.trim().is_empty()),
            due: task.due_date.map(|due| DueBadge {
                due,
                overdue: task.is_overdue(now),
            }),
        },
        created_at: task.created_at,
        busy,
    }
}

#[async_trait]
impl TaskCommands for TaskListController {
    fn apply_update(&self, task: Task) -> Result<(), EngineError> {
        let mut tasks = self.tasks.lock();
        let Some(slot) = tasks.iter_mut().find(|existing| existing.id == task.id) else {
            error!(id = %task.id, "update targets a task missing from the list");
            return Err(EngineError::StaleReference(task.id));
        };
        debug!(id = %task.id, completed = task.completed, "replacing task");
        *slot = task;
        Ok(())
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn request_removal(&self, id: TaskId) -> Result<(), EngineError> {
        match self.gateway.delete_task(id).await {
            Ok(()) => {
                self.apply_removal(id);
                self.notifier.notify_success(TASK_DELETED);
                Ok(())
            }
            Err(failure) => {
                warn!(error = %failure, "delete failed; list unchanged");
                self.notifier.notify_failure(DELETE_FAILED);
                Err(failure.into())
            }
        }
    }
}
