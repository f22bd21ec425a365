pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod form;
pub mod gateway;
pub mod interaction;
pub mod list;
pub mod notify;
pub mod render;
pub mod session;
pub mod task;
pub mod validation;

use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

pub use error::{EngineError, FormError, MutationFailure};
pub use form::{FieldUpdate, FormMode, SubmitOutcome, TaskForm};
pub use gateway::{HttpGateway, TaskGateway};
pub use interaction::{ActionOutcome, ItemBusy, ItemInteractions};
pub use list::{TaskCommands, TaskFilter, TaskListController, TaskView};
pub use notify::{Notification, Notifier};
pub use session::TaskSession;
pub use task::{Draft, NewTask, Priority, Task, TaskId};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting taskflow CLI"
    );
    debug!(count = pre.rc_overrides.len(), "preprocessed rc overrides");

    let mut cfg = config::Config::load(cli.taskflowrc.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );

    let settings =
        config::ApiSettings::from_config(&cfg).context("invalid task service settings")?;
    let gateway = HttpGateway::new(&settings).context("failed to build task service client")?;
    let renderer = render::Renderer::new(&cfg)?;
    let session = TaskSession::new(Arc::new(gateway), Arc::new(notify::ConsoleNotifier));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(commands::dispatch(
        &session,
        &renderer,
        cli.command,
        chrono::Utc::now(),
        prompt_delete,
    ))
}

fn prompt_delete(task: &Task) -> anyhow::Result<bool> {
    let mut out = io::stdout().lock();
    write!(out, "Delete task {} '{}'? [y/N] ", task.id, task.title)?;
    out.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
