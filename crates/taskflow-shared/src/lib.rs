use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
  Low,
  Medium,
  High
}

/// Task as returned by the task service.
///
/// Timestamps stay as strings here; the service emits either RFC 3339 or
/// naive ISO-8601 values depending on the column, so parsing belongs to
/// the consumer.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct TaskDto {
  pub id:          u64,
  #[serde(default)]
  pub title:       String,
  #[serde(default)]
  pub description: String,
  pub category:    Option<String>,
  pub priority:    Option<TaskPriority>,
  pub due_date:    Option<String>,
  #[serde(default)]
  pub completed:   bool,
  pub created_at:  String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct TaskCreate {
  pub title:       String,
  pub description: String,
  pub category:    Option<String>,
  pub priority:    Option<TaskPriority>,
  pub due_date:    Option<String>
}

/// Full replacement body for `PUT /api/tasks/{id}`.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct TaskUpdate {
  pub title:       String,
  pub description: String,
  pub category:    Option<String>,
  pub priority:    Option<TaskPriority>,
  pub due_date:    Option<String>
}

/// Error body of a rejected request. `detail` is a plain string for most
/// failures and a list of field problems for request validation errors.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub detail: Option<serde_json::Value>
}

impl ApiErrorBody {
  pub fn message(&self) -> Option<String> {
    match self.detail.as_ref()? {
      | serde_json::Value::String(text) => {
        let text = text.trim();
        (!text.is_empty())
          .then(|| text.to_string())
      }
      | serde_json::Value::Null => None,
      | other => Some(other.to_string())
    }
  }
}
