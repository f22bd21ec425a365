use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use taskflow_shared::{TaskCreate, TaskDto, TaskPriority, TaskUpdate};
use thiserror::Error;

use crate::datetime::{format_timestamp, parse_timestamp};
use crate::error::MutationFailure;

/// Server-assigned task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown priority '{0}', expected low, medium or high")]
pub struct ParsePriorityError(String);

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Priority::Low),
            "medium" | "m" => Ok(Priority::Medium),
            "high" | "h" => Ok(Priority::High),
            _ => Err(ParsePriorityError(s.to_string())),
        }
    }
}

impl From<Priority> for TaskPriority {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => TaskPriority::Low,
            Priority::Medium => TaskPriority::Medium,
            Priority::High => TaskPriority::High,
        }
    }
}

impl From<TaskPriority> for Priority {
    fn from(priority: TaskPriority) -> Self {
        match priority {
            TaskPriority::Low => Priority::Low,
            TaskPriority::Medium => Priority::Medium,
            TaskPriority::High => Priority::High,
        }
    }
}

/// A task confirmed by the task service.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.map(|due| due < now).unwrap_or(false)
    }
}

impl TryFrom<TaskDto> for Task {
    type Error = MutationFailure;

    fn try_from(dto: TaskDto) -> Result<Self, Self::Error> {
        let created_at = parse_timestamp(&dto.created_at).map_err(|err| {
            MutationFailure::new(format!("malformed task payload: created_at: {err}"))
        })?;
        let due_date = dto
            .due_date
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_timestamp)
            .transpose()
            .map_err(|err| MutationFailure::new(format!("malformed task payload: due_date: {err}")))?;

        Ok(Self {
            id: TaskId::new(dto.id),
            title: dto.title,
            description: dto.description,
            category: dto.category,
            priority: dto.priority.map(Priority::from).unwrap_or_default(),
            due_date,
            completed: dto.completed,
            created_at,
        })
    }
}

/// Editable, not yet persisted task fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Draft {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
}

impl Draft {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            category: task.category.clone(),
            priority: task.priority,
            due_date: task.due_date,
        }
    }
}

/// Payload handed to the gateway for a create or a full update. Title and
/// description are already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn from_draft(draft: &Draft) -> Self {
        Self {
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            category: draft.category.clone(),
            priority: draft.priority,
            due_date: draft.due_date,
        }
    }

    pub fn to_create(&self) -> TaskCreate {
        TaskCreate {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            priority: Some(self.priority.into()),
            due_date: self.due_date.map(format_timestamp),
        }
    }

    pub fn to_update(&self) -> TaskUpdate {
        TaskUpdate {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            priority: Some(self.priority.into()),
            due_date: self.due_date.map(format_timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn dto() -> TaskDto {
        TaskDto {
            id: 12,
            title: "Buy milk".to_string(),
            description: String::new(),
            category: Some("errands".to_string()),
            priority: None,
            due_date: Some("2026-10-20T00:00:00Z".to_string()),
            completed: false,
            created_at: "2026-10-17T08:30:00.123456".to_string(),
        }
    }

    #[test]
    fn dto_conversion_defaults_priority_to_medium() {
        let task = Task::try_from(dto()).expect("valid dto");
        assert_eq!(task.id, TaskId::new(12));
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(
            task.due_date,
            Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).single()
        );
    }

    #[test]
    fn dto_conversion_rejects_unparseable_timestamps() {
        let mut bad = dto();
        bad.created_at = "yesterday-ish".to_string();
        let err = Task::try_from(bad).expect_err("created_at must parse");
        assert!(err.message().contains("created_at"));
    }

    #[test]
    fn new_task_trims_title_and_description_only() {
        let draft = Draft {
            title: "  Buy milk ".to_string(),
            description: "\n two liters \t".to_string(),
            category: Some(" errands ".to_string()),
            priority: Priority::High,
            due_date: None,
        };
        let payload = NewTask::from_draft(&draft);
        assert_eq!(payload.title, "Buy milk");
        assert_eq!(payload.description, "two liters");
        assert_eq!(payload.category.as_deref(), Some(" errands "));

        let create = payload.to_create();
        assert_eq!(create.priority, Some(TaskPriority::High));
        assert_eq!(create.due_date, None);
    }

    #[test]
    fn update_payload_uses_wire_priority_and_timestamp() {
        let payload = NewTask {
            title: "Pay rent".to_string(),
            description: String::new(),
            category: None,
            priority: Priority::Low,
            due_date: Utc.with_ymd_and_hms(2026, 10, 20, 9, 30, 0).single(),
        };

        let update = payload.to_update();
        assert_eq!(update.title, "Pay rent");
        assert_eq!(update.priority, Some(TaskPriority::Low));
        assert_eq!(update.due_date.as_deref(), Some("2026-10-20T09:30:00Z"));
    }

    #[test]
    fn priority_parses_short_and_long_names() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("l".parse::<Priority>(), Ok(Priority::Low));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn overdue_ignores_completed_tasks() {
        let now = Utc.with_ymd_and_hms(2026, 10, 21, 0, 0, 0).single().expect("valid now");
        let mut task = Task::try_from(dto()).expect("valid dto");
        assert!(task.is_overdue(now));
        task.completed = true;
        assert!(!task.is_overdue(now));
    }
}
