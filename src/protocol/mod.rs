//! Task protocol: wire types, the HTTP gateway and event subscription

pub mod http;
pub mod subscription;
pub mod types;

pub use http::HttpTaskGateway;
pub use subscription::{ChannelEventSource, EventSource, JoinRequest, WebSocketEventSource};
pub use types::{
    ArtifactReference, LogLevel, StepEvent, StepStatus, StepUpdate, TaskLogEntry, TaskStep,
};
