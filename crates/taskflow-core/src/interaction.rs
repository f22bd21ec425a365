//! Per-task toggle and delete state machines.
//!
//! Each mounted task id owns one [`ItemState`] with a flag per action kind.
//! The flag is set before the gateway call starts and cleared once it
//! resolves. At most one call per id is in flight: a request arriving while
//! a toggle or a delete of the same id is pending is dropped. An open
//! confirmation dialog does not block a toggle.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::EngineError;
use crate::gateway::TaskGateway;
use crate::list::TaskCommands;
use crate::notify::Notifier;
use crate::task::TaskId;

pub const TASK_COMPLETED: &str = "Task completed!";
pub const TASK_REOPENED: &str = "Task reopened";
pub const TOGGLE_FAILED: &str = "Failed to toggle task";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePhase {
    #[default]
    Idle,
    Confirming,
    Deleting,
}

/// Summary of an item's state as seen by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemBusy {
    #[default]
    Idle,
    Toggling,
    ConfirmingDelete,
    Deleting,
}

impl fmt::Display for ItemBusy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ItemBusy::Idle => "idle",
            ItemBusy::Toggling => "toggling",
            ItemBusy::ConfirmingDelete => "confirming delete",
            ItemBusy::Deleting => "deleting",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemState {
    toggling: bool,
    delete: DeletePhase,
}

impl ItemState {
    pub fn is_toggling(&self) -> bool {
        self.toggling
    }

    pub fn delete_phase(&self) -> DeletePhase {
        self.delete
    }

    /// Whether the delete confirmation dialog is showing.
    pub fn dialog_open(&self) -> bool {
        self.delete != DeletePhase::Idle
    }

    pub fn busy(&self) -> ItemBusy {
        match (self.delete, self.toggling) {
            (DeletePhase::Deleting, _) => ItemBusy::Deleting,
            (_, true) => ItemBusy::Toggling,
            (DeletePhase::Confirming, false) => ItemBusy::ConfirmingDelete,
            (DeletePhase::Idle, false) => ItemBusy::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action ran and its confirmed result was committed.
    Applied,
    /// Dropped because another call for this task is already in flight.
    Ignored,
}

pub struct ItemInteractions {
    gateway: Arc<dyn TaskGateway>,
    commands: Arc<dyn TaskCommands>,
    notifier: Arc<dyn Notifier>,
    states: Mutex<HashMap<TaskId, ItemState>>,
}

impl ItemInteractions {
    pub fn new(
        gateway: Arc<dyn TaskGateway>,
        commands: Arc<dyn TaskCommands>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gateway,
            commands,
            notifier,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Starts tracking `id`. Mounting an already tracked id keeps its state.
    pub fn mount(&self, id: TaskId) {
        self.states.lock().entry(id).or_default();
    }

    pub fn unmount(&self, id: TaskId) {
        if self.states.lock().remove(&id).is_some() {
            debug!(id = %id, "item unmounted");
        }
    }

    pub fn is_mounted(&self, id: TaskId) -> bool {
        self.states.lock().contains_key(&id)
    }

    /// Drops the state of every id not in `keep`.
    pub fn retain_mounted(&self, keep: &[TaskId]) {
        self.states.lock().retain(|id, _| {
            let kept = keep.contains(id);
            if !kept {
                debug!(id = %id, "item unmounted; task left the list");
            }
            kept
        });
    }

    /// State of `id`; unmounted ids read as idle.
    pub fn state(&self, id: TaskId) -> ItemState {
        self.states.lock().get(&id).copied().unwrap_or_default()
    }

    pub fn busy(&self, id: TaskId) -> ItemBusy {
        self.state(id).busy()
    }

    /// Asks the service to flip `completed` for `id`.
    ///
    /// The list only changes once the service confirms; a failure leaves the
    /// task exactly as it was and only resets the toggle flag.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn request_toggle(&self, id: TaskId) -> Result<ActionOutcome, EngineError> {
        {
            let mut states = self.states.lock();
            let state = states.entry(id).or_default();
            if state.toggling {
                debug!("toggle already in flight; ignoring");
                return Ok(ActionOutcome::Ignored);
            }
            if state.delete == DeletePhase::Deleting {
                debug!("delete in flight; ignoring toggle");
                return Ok(ActionOutcome::Ignored);
            }
            state.toggling = true;
        }

        let result = self.gateway.toggle_complete(id).await;

        if let Some(state) = self.states.lock().get_mut(&id) {
            state.toggling = false;
        }

        match result {
            Ok(task) => {
                let completed = task.completed;
                if let Err(err) = self.commands.apply_update(task) {
                    if matches!(err, EngineError::StaleReference(_)) {
                        self.unmount(id);
                    }
                    return Err(err);
                }
                info!(completed, "toggle confirmed");
                self.notifier
                    .notify_success(if completed { TASK_COMPLETED } else { TASK_REOPENED });
                Ok(ActionOutcome::Applied)
            }
            Err(failure) => {
                warn!(error = %failure, "toggle failed");
                self.notifier.notify_failure(TOGGLE_FAILED);
                Err(EngineError::Mutation(failure))
            }
        }
    }

    /// Opens the delete confirmation dialog. No network traffic.
    pub fn request_delete_confirmation(&self, id: TaskId) -> Result<(), EngineError> {
        let mut states = self.states.lock();
        let state = states.entry(id).or_default();
        let phase = state.delete;
        match phase {
            DeletePhase::Idle => {
                state.delete = DeletePhase::Confirming;
                debug!(id = %id, "delete confirmation opened");
                Ok(())
            }
            DeletePhase::Confirming => Ok(()),
            DeletePhase::Deleting => Err(EngineError::InvalidTransition {
                id,
                from: state.busy(),
                action: "open delete confirmation for",
            }),
        }
    }

    /// Closes the delete confirmation dialog without deleting.
    pub fn cancel_delete_confirmation(&self, id: TaskId) -> Result<(), EngineError> {
        let mut states = self.states.lock();
        let Some(state) = states.get_mut(&id) else {
            return Ok(());
        };
        let phase = state.delete;
        match phase {
            DeletePhase::Deleting => Err(EngineError::InvalidTransition {
                id,
                from: state.busy(),
                action: "cancel deletion of",
            }),
            DeletePhase::Confirming | DeletePhase::Idle => {
                state.delete = DeletePhase::Idle;
                debug!(id = %id, "delete confirmation dismissed");
                Ok(())
            }
        }
    }

    /// Deletes `id` through the list controller. Only valid once the
    /// confirmation dialog is open.
    ///
    /// On success the item's state is dropped with the task. On failure the
    /// item returns to idle, which closes the dialog and leaves the task in
    /// place for a retry.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn confirm_delete(&self, id: TaskId) -> Result<ActionOutcome, EngineError> {
        {
            let mut states = self.states.lock();
            let state = states.entry(id).or_default();
            let phase = state.delete;
            match phase {
                DeletePhase::Deleting => {
                    debug!("delete already in flight; ignoring");
                    return Ok(ActionOutcome::Ignored);
                }
                DeletePhase::Idle => {
                    return Err(EngineError::InvalidTransition {
                        id,
                        from: state.busy(),
                        action: "delete unconfirmed",
                    });
                }
                DeletePhase::Confirming if state.toggling => {
                    debug!("toggle in flight; ignoring delete");
                    return Ok(ActionOutcome::Ignored);
                }
                DeletePhase::Confirming => state.delete = DeletePhase::Deleting,
            }
        }

        match self.commands.request_removal(id).await {
            Ok(()) => {
                self.states.lock().remove(&id);
                info!("task removed");
                Ok(ActionOutcome::Applied)
            }
            Err(err) => {
                if let Some(state) = self.states.lock().get_mut(&id) {
                    state.delete = DeletePhase::Idle;
                }
                warn!(error = %err, "delete failed; task kept");
                Err(err)
            }
        }
    }
}
