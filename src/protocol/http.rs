//! HTTP client for the task protocol backend

use super::types::{StepUpdate, TaskLogEntry, TaskStep};
use crate::abstractions::TaskGateway;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

/// Bearer-authenticated JSON client for step reads, logs and updates
pub struct HttpTaskGateway {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl HttpTaskGateway {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid backend URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Backend URL {base_url} cannot carry a path"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// Append percent-encoded path segments to the backend URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::Config(format!("Backend URL {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn step_url(&self, step_id: &str) -> Result<Url> {
        self.endpoint(&["api", "v1", "agents", "steps", step_id])
    }

    fn log_url(&self, task_id: &str) -> Result<Url> {
        self.endpoint(&["api", "v1", "agents", "tasks", task_id, "logs"])
    }

    fn update_url(&self, did: &str, task_id: &str, step_id: &str) -> Result<Url> {
        self.endpoint(&["api", "v1", "agents", did, "tasks", task_id, "steps", step_id])
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Error::Protocol(format!("{what} request failed: {e}")))?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Protocol(format!(
                "{what} rejected: invalid API key"
            ))),
            status => {
                let error_text = response.text().await.unwrap_or_default();
                Err(Error::Protocol(format!(
                    "{what} failed with {status}: {error_text}"
                )))
            }
        }
    }
}

#[async_trait]
impl TaskGateway for HttpTaskGateway {
    async fn get_step(&self, step_id: &str) -> Result<TaskStep> {
        trace!("Fetching step {}", step_id);
        let response = self
            .send(self.client.get(self.step_url(step_id)?), "get_step")
            .await?;
        response
            .json()
            .await
            .map_err(|e| Error::Protocol(format!("Failed to parse step {step_id}: {e}")))
    }

    async fn log_task(&self, entry: &TaskLogEntry) -> Result<()> {
        debug!("Task log [{:?}] {}: {}", entry.level, entry.task_id, entry.message);
        self.send(
            self.client.post(self.log_url(&entry.task_id)?).json(entry),
            "log_task",
        )
        .await?;
        Ok(())
    }

    async fn update_step(
        &self,
        did: &str,
        task_id: &str,
        step_id: &str,
        update: &StepUpdate,
    ) -> Result<()> {
        self.send(
            self.client
                .put(self.update_url(did, task_id, step_id)?)
                .json(update),
            "update_step",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_ignore_trailing_slash() {
        let gateway =
            HttpTaskGateway::new("https://backend.example/", "key", Duration::from_secs(1)).unwrap();
        assert_eq!(
            gateway.step_url("s1").unwrap().as_str(),
            "https://backend.example/api/v1/agents/steps/s1"
        );
        assert_eq!(
            gateway.log_url("t1").unwrap().as_str(),
            "https://backend.example/api/v1/agents/tasks/t1/logs"
        );
        assert_eq!(
            gateway.update_url("did:nv:a", "t1", "s1").unwrap().as_str(),
            "https://backend.example/api/v1/agents/did:nv:a/tasks/t1/steps/s1"
        );
    }

    #[test]
    fn test_ids_are_percent_encoded() {
        let gateway =
            HttpTaskGateway::new("https://backend.example/base/", "key", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            gateway.step_url("a/b?c#d").unwrap().as_str(),
            "https://backend.example/base/api/v1/agents/steps/a%2Fb%3Fc%23d"
        );
        assert_eq!(
            gateway.update_url("did:nv:x/y", "t 1", "s").unwrap().as_str(),
            "https://backend.example/base/api/v1/agents/did:nv:x%2Fy/tasks/t%201/steps/s"
        );
    }

    #[test]
    fn test_rejects_unparseable_backend_url() {
        let err = HttpTaskGateway::new("not a url", "key", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
