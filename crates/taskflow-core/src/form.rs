//! Create/edit form state.
//!
//! A [`TaskForm`] owns one draft. Field edits are accepted at any time,
//! including while a submission is in flight; only a second submit is
//! refused until the first one resolves.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::FormError;
use crate::gateway::TaskGateway;
use crate::task::{Draft, NewTask, Priority, Task, TaskId};
use crate::validation::{FieldErrors, FormField, validate_draft};

pub const SAVE_FAILED: &str = "Failed to save task";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: TaskId, initial: Draft },
}

impl FormMode {
    fn initial_draft(&self) -> Draft {
        match self {
            FormMode::Create => Draft::default(),
            FormMode::Edit { initial, .. } => initial.clone(),
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, FormMode::Create)
    }
}

/// A single field edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Title(String),
    Description(String),
    Category(Option<String>),
    Priority(Priority),
    DueDate(Option<DateTime<Utc>>),
}

impl FieldUpdate {
    pub fn field(&self) -> FormField {
        match self {
            FieldUpdate::Title(_) => FormField::Title,
            FieldUpdate::Description(_) => FormField::Description,
            FieldUpdate::Category(_) => FormField::Category,
            FieldUpdate::Priority(_) => FormField::Priority,
            FieldUpdate::DueDate(_) => FormField::DueDate,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Saved(Task),
    /// Submit was pressed again while the previous submission was in flight.
    AlreadySubmitting,
}

/// Signal to the caller that the form should be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormClosed;

/// What a form renderer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub values: Draft,
    pub errors: FieldErrors,
    pub submission_error: Option<String>,
    pub in_progress: bool,
    pub submit_enabled: bool,
    pub cancel_enabled: bool,
    pub submit_label: &'static str,
}

#[derive(Debug, Default)]
struct FormState {
    draft: Draft,
    errors: FieldErrors,
    in_progress: bool,
    submission_error: Option<String>,
}

#[derive(Debug)]
pub struct TaskForm {
    mode: FormMode,
    state: Mutex<FormState>,
}

impl TaskForm {
    pub fn new(mode: FormMode) -> Self {
        let draft = mode.initial_draft();
        Self {
            mode,
            state: Mutex::new(FormState {
                draft,
                ..FormState::default()
            }),
        }
    }

    pub fn create() -> Self {
        Self::new(FormMode::Create)
    }

    pub fn edit(task: &Task) -> Self {
        Self::new(FormMode::Edit {
            id: task.id,
            initial: Draft::from_task(task),
        })
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn submit_label(&self) -> &'static str {
        if self.mode.is_create() { "Create Task" } else { "Save Changes" }
    }

    pub fn draft(&self) -> Draft {
        self.state.lock().draft.clone()
    }

    pub fn errors(&self) -> FieldErrors {
        self.state.lock().errors.clone()
    }

    pub fn submission_error(&self) -> Option<String> {
        self.state.lock().submission_error.clone()
    }

    pub fn in_progress(&self) -> bool {
        self.state.lock().in_progress
    }

    pub fn view(&self) -> FormView {
        let state = self.state.lock();
        FormView {
            values: state.draft.clone(),
            errors: state.errors.clone(),
            submission_error: state.submission_error.clone(),
            in_progress: state.in_progress,
            submit_enabled: !state.in_progress,
            cancel_enabled: !state.in_progress,
            submit_label: self.submit_label(),
        }
    }

    /// Replaces one field and clears that field's validation error, leaving
    /// errors on other fields until the next submit.
    pub fn update_field(&self, update: FieldUpdate) {
        let field = update.field();
        let mut state = self.state.lock();
        match update {
            FieldUpdate::Title(value) => state.draft.title = value,
            FieldUpdate::Description(value) => state.draft.description = value,
            FieldUpdate::Category(value) => state.draft.category = value,
            FieldUpdate::Priority(value) => state.draft.priority = value,
            FieldUpdate::DueDate(value) => state.draft.due_date = value,
        }
        if state.errors.remove(field).is_some() {
            debug!(field = %field, "cleared field error after edit");
        }
    }

    /// Validates the draft and sends it through `gateway`.
    ///
    /// A create form resets to an empty draft on success; an edit form keeps
    /// what was submitted. On failure the draft is kept for a retry and the
    /// failure is recorded as the submission error.
    #[instrument(skip(self, gateway), fields(create = self.mode.is_create()))]
    pub async fn submit(&self, gateway: &dyn TaskGateway) -> Result<SubmitOutcome, FormError> {
        let payload = {
            let mut state = self.state.lock();
            if state.in_progress {
                debug!("ignored duplicate submit while busy");
                return Ok(SubmitOutcome::AlreadySubmitting);
            }

            let errors = validate_draft(&state.draft.title, &state.draft.description);
            if !errors.is_empty() {
                debug!(errors = %errors, "draft failed validation");
                state.errors = errors.clone();
                return Err(FormError::Validation(errors));
            }

            state.errors = FieldErrors::default();
            state.submission_error = None;
            state.in_progress = true;
            NewTask::from_draft(&state.draft)
        };

        let result = match &self.mode {
            FormMode::Create => gateway.create_task(payload).await,
            FormMode::Edit { id, .. } => gateway.update_task(*id, payload).await,
        };

        let mut state = self.state.lock();
        state.in_progress = false;
        match result {
            Ok(task) => {
                info!(id = %task.id, "task saved");
                if self.mode.is_create() {
                    state.draft = Draft::default();
                }
                Ok(SubmitOutcome::Saved(task))
            }
            Err(failure) => {
                warn!(error = %failure, "task save failed; keeping draft");
                state.submission_error = Some(failure.display_message(SAVE_FAILED));
                Err(FormError::Mutation(failure))
            }
        }
    }

    /// Discards the draft. Refused while a submission is in flight.
    pub fn cancel(&self) -> Result<FormClosed, FormError> {
        let mut state = self.state.lock();
        if state.in_progress {
            return Err(FormError::Busy);
        }
        state.draft = self.mode.initial_draft();
        state.errors = FieldErrors::default();
        state.submission_error = None;
        Ok(FormClosed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mockall::predicate::eq;

    use super::*;
    use crate::error::MutationFailure;
    use crate::gateway::MockTaskGateway;
    use crate::validation::{DESCRIPTION_TOO_LONG, TITLE_REQUIRED, TITLE_TOO_LONG};

    fn saved(id: u64, payload: &NewTask) -> Task {
        Task {
            id: TaskId::new(id),
            title: payload.title.clone(),
            description: payload.description.clone(),
            category: payload.category.clone(),
            priority: payload.priority,
            due_date: payload.due_date,
            completed: false,
            created_at: Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).single().expect("valid ts"),
        }
    }

    #[tokio::test]
    async fn create_submit_sends_trimmed_payload_and_resets() {
        let mut gateway = MockTaskGateway::new();
        gateway
            .expect_create_task()
            .with(eq(NewTask {
                title: "Buy milk".to_string(),
                description: String::new(),
                category: None,
                priority: Priority::Medium,
                due_date: None,
            }))
            .times(1)
            .returning(|payload| Ok(saved(1, &payload)));

        let form = TaskForm::create();
        form.update_field(FieldUpdate::Title("  Buy milk  ".to_string()));

        let outcome = form.submit(&gateway).await.expect("submit succeeds");
        let SubmitOutcome::Saved(task) = outcome else {
            panic!("expected a saved task");
        };
        assert_eq!(task.title, "Buy milk");
        assert!(!task.completed);
        assert_eq!(form.draft(), Draft::default());
        assert!(!form.in_progress());
    }

    #[tokio::test]
    async fn invalid_draft_never_reaches_the_gateway() {
        let mut gateway = MockTaskGateway::new();
        gateway.expect_create_task().never();

        let form = TaskForm::create();
        form.update_field(FieldUpdate::Title("   ".to_string()));
        form.update_field(FieldUpdate::Description("d".repeat(1001)));

        let err = form.submit(&gateway).await.expect_err("validation fails");
        let FormError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(errors.get(FormField::Title), Some(TITLE_REQUIRED));
        assert_eq!(errors.get(FormField::Description), Some(DESCRIPTION_TOO_LONG));
        assert_eq!(form.errors(), errors);
        assert!(!form.in_progress());
    }

    #[tokio::test]
    async fn overlong_title_is_rejected_without_a_call() {
        let mut gateway = MockTaskGateway::new();
        gateway.expect_create_task().never();

        let form = TaskForm::create();
        form.update_field(FieldUpdate::Title("t".repeat(201)));
        let err = form.submit(&gateway).await.expect_err("too long");
        assert!(matches!(err, FormError::Validation(ref e) if e.get(FormField::Title) == Some(TITLE_TOO_LONG)));
    }

    #[tokio::test]
    async fn editing_a_field_clears_only_its_error() {
        let gateway = MockTaskGateway::new();
        let form = TaskForm::create();
        form.update_field(FieldUpdate::Description("d".repeat(1001)));
        let _ = form.submit(&gateway).await;
        assert_eq!(form.errors().len(), 2);

        form.update_field(FieldUpdate::Title("Buy milk".to_string()));
        let errors = form.errors();
        assert!(!errors.contains(FormField::Title));
        assert_eq!(errors.get(FormField::Description), Some(DESCRIPTION_TOO_LONG));

        form.update_field(FieldUpdate::Priority(Priority::High));
        assert_eq!(form.errors().len(), 1);
    }

    #[tokio::test]
    async fn failed_submit_keeps_the_draft_and_records_the_error() {
        let mut gateway = MockTaskGateway::new();
        gateway
            .expect_create_task()
            .times(1)
            .returning(|_| Err(MutationFailure::new("service unavailable")));

        let form = TaskForm::create();
        let due = Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).single();
        form.update_field(FieldUpdate::Title("Buy milk".to_string()));
        form.update_field(FieldUpdate::Description("two liters".to_string()));
        form.update_field(FieldUpdate::Category(Some("errands".to_string())));
        form.update_field(FieldUpdate::Priority(Priority::High));
        form.update_field(FieldUpdate::DueDate(due));
        let before = form.draft();

        let err = form.submit(&gateway).await.expect_err("gateway fails");
        assert!(matches!(err, FormError::Mutation(_)));
        assert_eq!(form.draft(), before);
        assert_eq!(form.submission_error().as_deref(), Some("service unavailable"));
        assert!(!form.in_progress());
        assert!(form.view().submit_enabled);
    }

    #[tokio::test]
    async fn blank_failure_message_uses_generic_text() {
        let mut gateway = MockTaskGateway::new();
        gateway.expect_create_task().returning(|_| Err(MutationFailure::new("")));

        let form = TaskForm::create();
        form.update_field(FieldUpdate::Title("Buy milk".to_string()));
        let _ = form.submit(&gateway).await;
        assert_eq!(form.submission_error().as_deref(), Some(SAVE_FAILED));
    }

    #[tokio::test]
    async fn successful_retry_clears_previous_submission_error() {
        let mut gateway = MockTaskGateway::new();
        let mut seq = mockall::Sequence::new();
        gateway
            .expect_create_task()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(MutationFailure::new("timeout")));
        gateway
            .expect_create_task()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|payload| Ok(saved(9, &payload)));

        let form = TaskForm::create();
        form.update_field(FieldUpdate::Title("Buy milk".to_string()));
        assert!(form.submit(&gateway).await.is_err());
        assert!(form.submission_error().is_some());

        assert!(matches!(form.submit(&gateway).await, Ok(SubmitOutcome::Saved(_))));
        assert_eq!(form.submission_error(), None);
    }

    #[tokio::test]
    async fn edit_submit_updates_by_id_and_keeps_the_draft() {
        let existing = Task {
            id: TaskId::new(5),
            title: String::new(),
            description: String::new(),
            category: None,
            priority: Priority::Low,
            due_date: None,
            completed: true,
            created_at: Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).single().expect("valid ts"),
        };

        let mut gateway = MockTaskGateway::new();
        gateway.expect_create_task().never();
        gateway
            .expect_update_task()
            .withf(|id, payload| *id == TaskId::new(5) && payload.title == "Renamed")
            .times(1)
            .returning(|id, payload| Ok(saved(id.get(), &payload)));

        let form = TaskForm::edit(&existing);
        assert_eq!(form.submit_label(), "Save Changes");
        form.update_field(FieldUpdate::Title("Renamed ".to_string()));

        let outcome = form.submit(&gateway).await.expect("update succeeds");
        assert!(matches!(outcome, SubmitOutcome::Saved(ref task) if task.id == TaskId::new(5)));
        assert_eq!(form.draft().title, "Renamed ");
        assert_eq!(form.draft().priority, Priority::Low);
    }

    #[test]
    fn cancel_restores_the_initial_draft() {
        let form = TaskForm::create();
        form.update_field(FieldUpdate::Title("half typed".to_string()));
        assert_eq!(form.cancel(), Ok(FormClosed));
        assert_eq!(form.draft(), Draft::default());
        assert_eq!(form.submit_label(), "Create Task");
    }
}
