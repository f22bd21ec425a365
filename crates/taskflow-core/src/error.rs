//! Error taxonomy of the mutation engine.
//!
//! Field-level validation problems stay inside [`FormError`]; anything the
//! task service rejects arrives as a [`MutationFailure`]; inconsistencies in
//! the canonical list surface as [`EngineError`].

use thiserror::Error;

use crate::interaction::ItemBusy;
use crate::task::TaskId;
use crate::validation::FieldErrors;

/// A gateway call that did not complete successfully.
///
/// Timeouts, transport errors and server-side rejections are deliberately
/// collapsed into this one shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct MutationFailure {
  message: String
}

impl MutationFailure {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into()
    }
  }

  pub fn message(&self) -> &str {
    &self.message
  }

  /// The message to show the user, or `fallback` when the failure carried
  /// nothing readable.
  pub fn display_message(
    &self,
    fallback: &str
  ) -> String {
    let trimmed = self.message.trim();
    if trimmed.is_empty() {
      fallback.to_string()
    } else {
      trimmed.to_string()
    }
  }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
  #[error("validation failed: {0}")]
  Validation(FieldErrors),

  #[error("failed to save task: {0}")]
  Mutation(#[from] MutationFailure),

  #[error("a submission is already in progress")]
  Busy
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
  #[error("task {0} is not in the current list")]
  StaleReference(TaskId),

  #[error("task {0} is already in the current list")]
  DuplicateId(TaskId),

  #[error("cannot {action} task {id} while it is {from}")]
  InvalidTransition {
    id:     TaskId,
    from:   ItemBusy,
    action: &'static str
  },

  #[error(transparent)]
  Mutation(#[from] MutationFailure),

  #[error(transparent)]
  Form(#[from] FormError)
}

impl EngineError {
  /// True for faults that point at a programming error rather than at
  /// something the user can retry.
  pub fn is_logic_fault(&self) -> bool {
    matches!(
      self,
      EngineError::StaleReference(_)
        | EngineError::DuplicateId(_)
    )
  }
}
