use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::EngineError;
use crate::form::{FormMode, SubmitOutcome, TaskForm};
use crate::gateway::TaskGateway;
use crate::interaction::ItemInteractions;
use crate::list::{TaskListController, TaskView};
use crate::notify::Notifier;
use crate::task::TaskId;

/// Wires one list controller and its item controller to a gateway and a
/// notification sink.
pub struct TaskSession {
    list: Arc<TaskListController>,
    items: ItemInteractions,
}

impl TaskSession {
    pub fn new(gateway: Arc<dyn TaskGateway>, notifier: Arc<dyn Notifier>) -> Self {
        let list = Arc::new(TaskListController::new(gateway.clone(), notifier.clone()));
        let items = ItemInteractions::new(gateway, list.clone(), notifier);
        Self { list, items }
    }

    pub fn list(&self) -> &TaskListController {
        &self.list
    }

    pub fn items(&self) -> &ItemInteractions {
        &self.items
    }

    /// Loads the list, mounts an item state for every task and drops the
    /// states of tasks that are gone.
    pub async fn load(&self) -> Result<usize, EngineError> {
        let count = self.list.load().await?;
        let ids: Vec<TaskId> = self.list.snapshot().iter().map(|task| task.id).collect();
        self.items.retain_mounted(&ids);
        for id in ids {
            self.items.mount(id);
        }
        debug!(count, "mounted loaded tasks");
        Ok(count)
    }

    pub fn views(&self, now: DateTime<Utc>) -> Vec<TaskView> {
        self.list.views(&self.items, now)
    }

    pub fn create_form(&self) -> TaskForm {
        TaskForm::create()
    }

    /// Edit form pre-filled from the current version of `id`.
    pub fn edit_form(&self, id: TaskId) -> Result<TaskForm, EngineError> {
        self.list
            .get(id)
            .map(|task| TaskForm::edit(&task))
            .ok_or(EngineError::StaleReference(id))
    }

    pub async fn submit(&self, form: &TaskForm) -> Result<SubmitOutcome, EngineError> {
        let outcome = self.list.submit_form(form).await?;
        if let (SubmitOutcome::Saved(task), FormMode::Create) = (&outcome, form.mode()) {
            self.items.mount(task.id);
        }
        Ok(outcome)
    }
}
