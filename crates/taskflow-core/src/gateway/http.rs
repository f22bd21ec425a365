use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{
  Client,
  Method,
  RequestBuilder,
  Response,
  StatusCode
};
use taskflow_shared::{
  ApiErrorBody,
  TaskDto
};
use tracing::{
  debug,
  error,
  info,
  instrument
};

use super::TaskGateway;
use crate::config::ApiSettings;
use crate::error::MutationFailure;
use crate::task::{
  NewTask,
  Task,
  TaskId
};

/// [`TaskGateway`] over the task service's REST API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
  client:   Client,
  base_url: String,
  token:    Option<String>
}

impl HttpGateway {
  pub fn new(
    settings: &ApiSettings
  ) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_millis(
        settings.timeout_ms
      ))
      .build()
      .context(
        "failed to build HTTP client"
      )?;

    info!(
      base_url = %settings.base_url,
      timeout_ms = settings.timeout_ms,
      has_token = settings.token.is_some(),
      "configured task service gateway"
    );

    Ok(Self {
      client,
      base_url: settings
        .base_url
        .trim_end_matches('/')
        .to_string(),
      token: settings.token.clone()
    })
  }

  fn tasks_url(&self) -> String {
    format!(
      "{}/api/tasks",
      self.base_url
    )
  }

  fn task_url(
    &self,
    id: TaskId
  ) -> String {
    format!(
      "{}/api/tasks/{}",
      self.base_url, id
    )
  }

  fn request(
    &self,
    method: Method,
    url: &str
  ) -> RequestBuilder {
    let builder =
      self.client.request(method, url);
    match self.token.as_deref() {
      | Some(token) => {
        builder.bearer_auth(token)
      }
      | None => builder
    }
  }

  async fn send(
    &self,
    builder: RequestBuilder,
    action: &'static str
  ) -> Result<Response, MutationFailure>
  {
    let response =
      builder.send().await.map_err(
        |err| {
          error!(action, error = %err, "task service request failed");
          if err.is_timeout() {
            MutationFailure::new(format!(
              "{action} timed out \
               waiting for the task \
               service"
            ))
          } else {
            MutationFailure::new(format!(
              "{action} failed: could \
               not reach the task \
               service"
            ))
          }
        }
      )?;

    let status = response.status();
    if status.is_success() {
      debug!(action, %status, "task service responded");
      return Ok(response);
    }

    let body = response
      .text()
      .await
      .unwrap_or_default();
    error!(action, %status, body = %body, "task service rejected request");
    Err(MutationFailure::new(
      failure_message(
        action, status, &body
      )
    ))
  }
}

async fn decode_task(
  response: Response,
  action: &'static str
) -> Result<Task, MutationFailure> {
  let dto = response
    .json::<TaskDto>()
    .await
    .map_err(|err| {
      MutationFailure::new(format!(
        "{action} returned an \
         unreadable task: {err}"
      ))
    })?;
  Task::try_from(dto)
}

fn failure_message(
  action: &str,
  status: StatusCode,
  body: &str
) -> String {
  let detail =
    serde_json::from_str::<ApiErrorBody>(
      body
    )
    .ok()
    .and_then(|parsed| {
      parsed.message()
    });

  match detail {
    | Some(detail) => detail,
    | None
      if status
        == StatusCode::UNAUTHORIZED =>
    {
      format!(
        "{action} was not \
         authorized; sign in again \
         or check api.token"
      )
    }
    | None => {
      format!(
        "{action} failed with status \
         {status}"
      )
    }
  }
}

#[async_trait]
impl TaskGateway for HttpGateway {
  #[instrument(skip(self))]
  async fn list_tasks(
    &self
  ) -> Result<Vec<Task>, MutationFailure>
  {
    let url = self.tasks_url();
    let response = self
      .send(
        self.request(Method::GET, &url),
        "list tasks"
      )
      .await?;
    let dtos = response
      .json::<Vec<TaskDto>>()
      .await
      .map_err(|err| {
        MutationFailure::new(format!(
          "list tasks returned an \
           unreadable body: {err}"
        ))
      })?;
    dtos
      .into_iter()
      .map(Task::try_from)
      .collect()
  }

  #[instrument(skip(self, task), fields(title_len = task.title.len(), priority = %task.priority))]
  async fn create_task(
    &self,
    task: NewTask
  ) -> Result<Task, MutationFailure> {
    let url = self.tasks_url();
    let body = task.to_create();
    let response = self
      .send(
        self
          .request(Method::POST, &url)
          .json(&body),
        "create task"
      )
      .await?;
    decode_task(response, "create task")
      .await
  }

  #[instrument(skip(self, task), fields(id = %id))]
  async fn update_task(
    &self,
    id: TaskId,
    task: NewTask
  ) -> Result<Task, MutationFailure> {
    let url = self.task_url(id);
    let body = task.to_update();
    let response = self
      .send(
        self
          .request(Method::PUT, &url)
          .json(&body),
        "update task"
      )
      .await?;
    decode_task(response, "update task")
      .await
  }

  #[instrument(skip(self), fields(id = %id))]
  async fn toggle_complete(
    &self,
    id: TaskId
  ) -> Result<Task, MutationFailure> {
    let url = format!(
      "{}/complete",
      self.task_url(id)
    );
    let response = self
      .send(
        self.request(Method::PATCH, &url),
        "toggle task"
      )
      .await?;
    decode_task(response, "toggle task")
      .await
  }

  #[instrument(skip(self), fields(id = %id))]
  async fn delete_task(
    &self,
    id: TaskId
  ) -> Result<(), MutationFailure> {
    let url = self.task_url(id);
    self
      .send(
        self.request(Method::DELETE, &url),
        "delete task"
      )
      .await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn settings() -> ApiSettings {
    ApiSettings {
      base_url:   "http://tasks.local:8000/"
        .to_string(),
      token:      Some("secret".to_string()),
      timeout_ms: 2_500
    }
  }

  #[test]
  fn builds_task_urls_without_double_slashes()
  {
    let gateway = HttpGateway::new(
      &settings()
    )
    .expect("build gateway");
    assert_eq!(
      gateway.tasks_url(),
      "http://tasks.local:8000/api/tasks"
    );
    assert_eq!(
      gateway.task_url(TaskId::new(42)),
      "http://tasks.local:8000/api/tasks/42"
    );
  }

  #[test]
  fn failure_message_prefers_service_detail()
  {
    let message = failure_message(
      "delete task",
      StatusCode::NOT_FOUND,
      r#"{"detail":"Task not found"}"#
    );
    assert_eq!(message, "Task not found");
  }

  #[test]
  fn failure_message_falls_back_to_status() {
    let message = failure_message(
      "toggle task",
      StatusCode::BAD_GATEWAY,
      "<html>upstream down</html>"
    );
    assert_eq!(
      message,
      "toggle task failed with status \
       502 Bad Gateway"
    );

    let unauthorized = failure_message(
      "list tasks",
      StatusCode::UNAUTHORIZED,
      ""
    );
    assert!(
      unauthorized.contains("api.token")
    );
  }
}
