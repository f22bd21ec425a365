#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use taskflow_core::notify::RecordingNotifier;
use taskflow_core::{MutationFailure, NewTask, Priority, Task, TaskGateway, TaskId, TaskSession};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(NewTask),
    Update(TaskId, NewTask),
    Toggle(TaskId),
    Delete(TaskId),
}

/// In-memory task service. Mutating calls can be held open with [`hold`]
/// and the next one scripted to fail with [`fail_next`].
///
/// [`hold`]: FakeGateway::hold
/// [`fail_next`]: FakeGateway::fail_next
#[derive(Default)]
pub struct FakeGateway {
    tasks: Mutex<Vec<Task>>,
    next_id: Mutex<u64>,
    calls: Mutex<Vec<Call>>,
    gate: Mutex<Option<Arc<Notify>>>,
    failure: Mutex<Option<String>>,
}

impl FakeGateway {
    pub fn with_tasks(tasks: Vec<Task>) -> Arc<Self> {
        let next_id = tasks.iter().map(|t| t.id.get()).max().unwrap_or(0) + 1;
        Arc::new(Self {
            tasks: Mutex::new(tasks),
            next_id: Mutex::new(next_id),
            ..Self::default()
        })
    }

    /// Every mutating call from now on waits until the returned handle is
    /// notified once per call.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    pub fn release_all(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.notify_waiters();
        }
    }

    pub fn fail_next(&self, message: &str) {
        *self.failure.lock() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn mutation_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| *c != Call::List).collect()
    }

    pub fn stored(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    /// Deletes `id` service-side, as another client would.
    pub fn forget(&self, id: TaskId) {
        self.tasks.lock().retain(|t| t.id != id);
    }

    async fn enter(&self, call: Call) -> Result<(), MutationFailure> {
        let mutating = call != Call::List;
        self.calls.lock().push(call);

        if !mutating {
            return Ok(());
        }

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.failure.lock().take() {
            Some(message) => Err(MutationFailure::new(message)),
            None => Ok(()),
        }
    }

    fn missing(id: TaskId) -> MutationFailure {
        MutationFailure::new(format!("Task {id} not found"))
    }
}

#[async_trait]
impl TaskGateway for FakeGateway {
    async fn list_tasks(&self) -> Result<Vec<Task>, MutationFailure> {
        self.enter(Call::List).await?;
        Ok(self.stored())
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, MutationFailure> {
        self.enter(Call::Create(task.clone())).await?;

        let id = {
            let mut next = self.next_id.lock();
            let id = *next;
            *next += 1;
            id
        };
        let created = Task {
            id: TaskId::new(id),
            title: task.title,
            description: task.description,
            category: task.category,
            priority: task.priority,
            due_date: task.due_date,
            completed: false,
            created_at: at(17, 12),
        };
        self.tasks.lock().push(created.clone());
        Ok(created)
    }

    async fn update_task(&self, id: TaskId, task: NewTask) -> Result<Task, MutationFailure> {
        self.enter(Call::Update(id, task.clone())).await?;

        let mut tasks = self.tasks.lock();
        let stored = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Self::missing(id))?;
        stored.title = task.title;
        stored.description = task.description;
        stored.category = task.category;
        stored.priority = task.priority;
        stored.due_date = task.due_date;
        Ok(stored.clone())
    }

    async fn toggle_complete(&self, id: TaskId) -> Result<Task, MutationFailure> {
        self.enter(Call::Toggle(id)).await?;

        let mut tasks = self.tasks.lock();
        let stored = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Self::missing(id))?;
        stored.completed = !stored.completed;
        Ok(stored.clone())
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), MutationFailure> {
        self.enter(Call::Delete(id)).await?;

        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(Self::missing(id));
        }
        Ok(())
    }
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn task(id: u64, title: &str) -> Task {
    Task {
        id: TaskId::new(id),
        title: title.to_string(),
        description: String::new(),
        category: None,
        priority: Priority::Medium,
        due_date: None,
        completed: false,
        created_at: at(1, 9),
    }
}

pub struct Harness {
    pub gateway: Arc<FakeGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub session: TaskSession,
}

pub async fn loaded(tasks: Vec<Task>) -> Harness {
    let gateway = FakeGateway::with_tasks(tasks);
    let notifier = Arc::new(RecordingNotifier::new());
    let session = TaskSession::new(gateway.clone(), notifier.clone());
    session.load().await.expect("initial load");
    Harness {
        gateway,
        notifier,
        session,
    }
}
