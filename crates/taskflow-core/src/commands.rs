use anyhow::{Context, anyhow, bail};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::cli::Command;
use crate::datetime::parse_due;
use crate::error::{EngineError, FormError};
use crate::form::{FieldUpdate, SubmitOutcome, TaskForm};
use crate::interaction::ActionOutcome;
use crate::render::Renderer;
use crate::session::TaskSession;
use crate::task::{Task, TaskId};

/// Runs one CLI command against a freshly loaded session.
///
/// `confirm` is asked before a delete unless the command already carries
/// `--yes`; answering `false` closes the confirmation without deleting.
#[instrument(skip(session, renderer, confirm))]
pub async fn dispatch<C>(
    session: &TaskSession,
    renderer: &Renderer,
    command: Command,
    now: DateTime<Utc>,
    mut confirm: C,
) -> anyhow::Result<()>
where
    C: FnMut(&Task) -> anyhow::Result<bool>,
{
    let count = session.load().await.context("failed to load tasks")?;
    debug!(count, "task list loaded");

    match command {
        Command::List { filter } => {
            let keep: Vec<TaskId> = session
                .list()
                .filtered(filter, now)
                .into_iter()
                .map(|task| task.id)
                .collect();
            let views: Vec<_> = session
                .views(now)
                .into_iter()
                .filter(|view| keep.contains(&view.id))
                .collect();
            renderer.print_task_table(&views)
        }
        Command::Info { id } => {
            let id = TaskId::new(id);
            let task = session
                .list()
                .get(id)
                .ok_or_else(|| anyhow!("no task with id {id}"))?;
            renderer.print_task_info(&task)
        }
        Command::Add {
            title,
            description,
            category,
            priority,
            due,
        } => {
            let form = session.create_form();
            form.update_field(FieldUpdate::Title(title));
            form.update_field(FieldUpdate::Description(description.unwrap_or_default()));
            form.update_field(FieldUpdate::Category(category));
            form.update_field(FieldUpdate::Priority(priority));
            form.update_field(FieldUpdate::DueDate(parse_optional_due(due, now)?));
            submit(session, renderer, &form).await
        }
        Command::Edit {
            id,
            title,
            description,
            category,
            clear_category,
            priority,
            due,
            clear_due,
        } => {
            let id = TaskId::new(id);
            let form = session
                .edit_form(id)
                .with_context(|| format!("no task with id {id}"))?;

            if let Some(title) = title {
                form.update_field(FieldUpdate::Title(title));
            }
            if let Some(description) = description {
                form.update_field(FieldUpdate::Description(description));
            }
            if clear_category {
                form.update_field(FieldUpdate::Category(None));
            } else if category.is_some() {
                form.update_field(FieldUpdate::Category(category));
            }
            if let Some(priority) = priority {
                form.update_field(FieldUpdate::Priority(priority));
            }
            if clear_due {
                form.update_field(FieldUpdate::DueDate(None));
            } else if due.is_some() {
                form.update_field(FieldUpdate::DueDate(parse_optional_due(due, now)?));
            }

            submit(session, renderer, &form).await
        }
        Command::Toggle { id } => {
            let id = TaskId::new(id);
            match session.items().request_toggle(id).await.map_err(engine_failure)? {
                ActionOutcome::Applied => Ok(()),
                ActionOutcome::Ignored => {
                    warn!(%id, "toggle ignored, item busy");
                    Ok(())
                }
            }
        }
        Command::Delete { id, yes } => {
            let id = TaskId::new(id);
            let task = session
                .list()
                .get(id)
                .ok_or_else(|| anyhow!("no task with id {id}"))?;

            session
                .items()
                .request_delete_confirmation(id)
                .map_err(engine_failure)?;
            let confirmed = yes || confirm(&task)?;
            if !confirmed {
                session
                    .items()
                    .cancel_delete_confirmation(id)
                    .map_err(engine_failure)?;
                info!(%id, "deletion cancelled");
                println!("Deletion cancelled");
                return Ok(());
            }

            session
                .items()
                .confirm_delete(id)
                .await
                .map_err(engine_failure)?;
            Ok(())
        }
    }
}

fn parse_optional_due(
    due: Option<String>,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<DateTime<Utc>>> {
    due.map(|raw| parse_due(&raw, now)).transpose()
}

async fn submit(session: &TaskSession, renderer: &Renderer, form: &TaskForm) -> anyhow::Result<()> {
    match session.submit(form).await {
        Ok(SubmitOutcome::Saved(task)) => {
            info!(id = %task.id, "task saved");
            Ok(())
        }
        Ok(SubmitOutcome::AlreadySubmitting) => bail!("a submission is already in progress"),
        Err(EngineError::Form(FormError::Validation(errors))) => {
            renderer.print_field_errors(&errors)?;
            bail!("task not saved: {} invalid field(s)", errors.len())
        }
        Err(err) => Err(engine_failure(err)),
    }
}

/// Tells the user when the local list disagrees with the service, which a
/// retry of the same command will not fix.
fn engine_failure(err: EngineError) -> anyhow::Error {
    if err.is_logic_fault() {
        error!(error = %err, "task list out of sync with the task service");
        return anyhow::Error::new(err).context(
            "local task list is out of sync with the task service; run `taskflow list` to refresh",
        );
    }
    err.into()
}
