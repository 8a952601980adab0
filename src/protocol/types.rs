//! Wire types exchanged with the task protocol gateway

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Execution status of a step as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepStatus {
    Pending,
    InProgress,
    NotReady,
    Completed,
    Failed,
    /// A status this agent does not know about, kept verbatim
    Other(String),
}

impl StepStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StepStatus::Pending => "Pending",
            StepStatus::InProgress => "In_Progress",
            StepStatus::NotReady => "Not_Ready",
            StepStatus::Completed => "Completed",
            StepStatus::Failed => "Failed",
            StepStatus::Other(s) => s,
        }
    }
}

impl From<String> for StepStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Pending" => StepStatus::Pending,
            "In_Progress" => StepStatus::InProgress,
            "Not_Ready" => StepStatus::NotReady,
            "Completed" => StepStatus::Completed,
            "Failed" => StepStatus::Failed,
            _ => StepStatus::Other(s),
        }
    }
}

impl From<StepStatus> for String {
    fn from(status: StepStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable locator of a stored artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactReference(String);

impl ArtifactReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of work within a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStep {
    pub task_id: String,
    pub step_id: String,
    #[serde(default)]
    pub did: Option<String>,
    pub step_status: StepStatus,
    #[serde(default, deserialize_with = "deserialize_input_query")]
    pub input_query: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub output_artifacts: Vec<ArtifactReference>,
    #[serde(default)]
    pub is_last: bool,
}

impl TaskStep {
    pub fn is_pending(&self) -> bool {
        self.step_status == StepStatus::Pending
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInputQuery {
    Text(String),
    Object(IndexMap<String, serde_json::Value>),
}

/// Accepts `input_query` as a string, or as a JSON object which is
/// re-encoded to text with its key order intact.
fn deserialize_input_query<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawInputQuery> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawInputQuery::Text(text)) => Ok(Some(text)),
        Some(RawInputQuery::Object(map)) => serde_json::to_string(&map)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Payload delivered by the subscription for each assigned step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    pub step_id: String,
    pub task_id: String,
    pub did: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

/// Append-only log line attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskLogEntry {
    pub task_id: String,
    pub message: String,
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_status: Option<StepStatus>,
}

/// Partial step sent with the terminal update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepUpdate {
    pub step_id: String,
    pub task_id: String,
    pub step_status: StepStatus,
    pub output: String,
    pub is_last: bool,
    pub output_artifacts: Vec<ArtifactReference>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_status_wire_names() {
        let status: StepStatus = serde_json::from_value(json!("In_Progress")).unwrap();
        assert_eq!(status, StepStatus::InProgress);
        assert_eq!(
            serde_json::to_value(StepStatus::Completed).unwrap(),
            json!("Completed")
        );
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let status: StepStatus = serde_json::from_value(json!("Cancelled")).unwrap();
        assert_eq!(status, StepStatus::Other("Cancelled".to_string()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("Cancelled"));
    }

    #[test]
    fn test_task_step_minimal_payload() {
        let step: TaskStep = serde_json::from_value(json!({
            "task_id": "task-1",
            "step_id": "step-1",
            "step_status": "Pending"
        }))
        .unwrap();

        assert!(step.is_pending());
        assert_eq!(step.input_query, None);
        assert!(step.output_artifacts.is_empty());
        assert!(!step.is_last);
    }

    #[test]
    fn test_object_input_query_keeps_key_order() {
        let raw = r#"{
            "task_id": "task-1",
            "step_id": "step-1",
            "step_status": "Pending",
            "input_query": {"name": "Aria", "age": 31, "eyes": "green"}
        }"#;
        let step: TaskStep = serde_json::from_str(raw).unwrap();
        assert_eq!(
            step.input_query.as_deref(),
            Some(r#"{"name":"Aria","age":31,"eyes":"green"}"#)
        );
    }

    #[test]
    fn test_null_input_query() {
        let step: TaskStep = serde_json::from_value(json!({
            "task_id": "t",
            "step_id": "s",
            "step_status": "Pending",
            "input_query": null
        }))
        .unwrap();
        assert_eq!(step.input_query, None);
    }

    #[test]
    fn test_log_entry_omits_absent_status() {
        let entry = TaskLogEntry {
            task_id: "task-1".to_string(),
            message: "Starting image generation...".to_string(),
            level: LogLevel::Info,
            task_status: None,
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "task_id": "task-1",
                "message": "Starting image generation...",
                "level": "info"
            })
        );
    }

    #[test]
    fn test_step_event_ignores_extra_fields() {
        let event: StepEvent = serde_json::from_value(json!({
            "step_id": "s",
            "task_id": "t",
            "did": "did:nv:abc",
            "event": "step-created"
        }))
        .unwrap();
        assert_eq!(event.did, "did:nv:abc");
    }
}
