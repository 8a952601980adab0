//! Step event delivery
//!
//! The worker pulls events from an [`EventSource`]. The production source is
//! a WebSocket subscription to the agent's room; tests feed a channel.

use super::types::StepEvent;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Source of delivered step events
///
/// `next_event` must be cancel safe: the worker polls it inside
/// `tokio::select!` alongside in-flight steps.
#[async_trait]
pub trait EventSource: Send {
    /// Next event, or `None` once the subscription has ended
    async fn next_event(&mut self) -> Option<Result<StepEvent>>;
}

/// Room membership requested right after connecting
#[derive(Debug, Serialize)]
pub struct JoinRequest {
    pub join_account_room: bool,
    pub join_agent_rooms: Vec<String>,
    pub get_pending_events_on_subscribe: bool,
}

impl JoinRequest {
    /// Only the agent's own room, without replaying backlog
    pub fn for_agent(did: &str) -> Self {
        Self {
            join_account_room: false,
            join_agent_rooms: vec![did.to_string()],
            get_pending_events_on_subscribe: false,
        }
    }
}

pub struct WebSocketEventSource {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WebSocketEventSource {
    pub async fn connect(url: &str, api_key: &str, did: &str) -> Result<Self> {
        let mut request = url
            .into_client_request()
            .map_err(|e| Error::Config(format!("Invalid subscription URL {url}: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (mut stream, _) = connect_async(request)
            .await
            .map_err(|e| Error::Protocol(format!("Failed to subscribe: {e}")))?;

        let join = serde_json::to_string(&JoinRequest::for_agent(did))?;
        stream
            .send(Message::Text(join.into()))
            .await
            .map_err(|e| Error::Protocol(format!("Failed to join agent room: {e}")))?;

        info!("Subscribed to step events for {}", did);
        Ok(Self { stream })
    }
}

#[async_trait]
impl EventSource for WebSocketEventSource {
    async fn next_event(&mut self) -> Option<Result<StepEvent>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => {
                    return Some(Err(Error::Protocol(format!("Subscription failed: {e}"))))
                }
            };

            match message {
                Message::Text(text) => match serde_json::from_str::<StepEvent>(text.as_str()) {
                    Ok(event) => return Some(Ok(event)),
                    Err(e) => warn!("Skipping undecodable event: {}", e),
                },
                Message::Close(frame) => {
                    debug!("Subscription closed: {:?}", frame);
                    return None;
                }
                _ => {}
            }
        }
    }
}

/// In-process source fed through an mpsc channel
pub struct ChannelEventSource {
    receiver: mpsc::Receiver<Result<StepEvent>>,
}

impl ChannelEventSource {
    pub fn new(capacity: usize) -> (mpsc::Sender<Result<StepEvent>>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self { receiver })
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn next_event(&mut self) -> Option<Result<StepEvent>> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_request_for_agent() {
        let join = serde_json::to_value(JoinRequest::for_agent("did:nv:agent")).unwrap();
        assert_eq!(
            join,
            json!({
                "join_account_room": false,
                "join_agent_rooms": ["did:nv:agent"],
                "get_pending_events_on_subscribe": false
            })
        );
    }

    #[tokio::test]
    async fn test_channel_source_ends_when_senders_drop() {
        let (sender, mut source) = ChannelEventSource::new(4);
        sender
            .send(Ok(StepEvent {
                step_id: "s".into(),
                task_id: "t".into(),
                did: "d".into(),
            }))
            .await
            .unwrap();
        drop(sender);

        assert!(matches!(source.next_event().await, Some(Ok(_))));
        assert!(source.next_event().await.is_none());
    }
}
