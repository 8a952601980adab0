//! Network adapters against local fake servers

mod common;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use common::spawn_server;
use futures::{SinkExt, StreamExt};
use portrait_agent::abstractions::{ArtifactStore, ImageGenerator, MockImageGenerator, TaskGateway};
use portrait_agent::config::{GenerationConfig, StorageConfig};
use portrait_agent::generation::{ComputeDevice, DiffusionClient};
use portrait_agent::protocol::{
    EventSource, HttpTaskGateway, LogLevel, StepStatus, StepUpdate, TaskLogEntry,
    WebSocketEventSource,
};
use portrait_agent::storage::PinataStore;
use portrait_agent::Error;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

#[derive(Clone, Default)]
struct Recorder {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

impl Recorder {
    fn push(&self, route: String, headers: &HeaderMap, body: Value) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push((route, auth, body));
    }

    fn take(&self) -> Vec<(String, Option<String>, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

fn backend(recorder: Recorder) -> Router {
    Router::new()
        .route(
            "/api/v1/agents/steps/{step_id}",
            get(
                |State(rec): State<Recorder>, Path(step_id): Path<String>, headers: HeaderMap| async move {
                    rec.push(format!("get {step_id}"), &headers, Value::Null);
                    (
                        [(header::CONTENT_TYPE, "application/json")],
                        format!(
                            r#"{{"task_id":"task-1","step_id":"{step_id}","step_status":"Pending","input_query":{{"race":"elf","class":"bard"}},"is_last":true}}"#
                        ),
                    )
                },
            ),
        )
        .route(
            "/api/v1/agents/tasks/{task_id}/logs",
            post(
                |State(rec): State<Recorder>,
                 Path(task_id): Path<String>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    rec.push(format!("log {task_id}"), &headers, body);
                    StatusCode::CREATED
                },
            ),
        )
        .route(
            "/api/v1/agents/{did}/tasks/{task_id}/steps/{step_id}",
            put(
                |State(rec): State<Recorder>,
                 Path((did, task_id, step_id)): Path<(String, String, String)>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    rec.push(format!("update {did} {task_id} {step_id}"), &headers, body);
                    StatusCode::OK
                },
            ),
        )
        .with_state(recorder)
}

#[tokio::test]
async fn test_gateway_round_trip_against_backend() {
    let recorder = Recorder::default();
    let base = spawn_server(backend(recorder.clone())).await;
    let gateway = HttpTaskGateway::new(&base, "secret-key", Duration::from_secs(5)).unwrap();

    let step = gateway.get_step("step-9").await.unwrap();
    assert_eq!(step.step_status, StepStatus::Pending);
    assert_eq!(
        step.input_query.as_deref(),
        Some(r#"{"race":"elf","class":"bard"}"#)
    );

    gateway
        .log_task(&TaskLogEntry {
            task_id: "task-1".to_string(),
            message: "Starting image generation...".to_string(),
            level: LogLevel::Info,
            task_status: None,
        })
        .await
        .unwrap();

    gateway
        .update_step(
            "did:nv:owner",
            "task-1",
            "step-9",
            &StepUpdate {
                step_id: "step-9".to_string(),
                task_id: "task-1".to_string(),
                step_status: StepStatus::Completed,
                output: "Image generated and uploaded to IPFS".to_string(),
                is_last: true,
                output_artifacts: vec![],
            },
        )
        .await
        .unwrap();

    let requests = recorder.take();
    assert_eq!(requests.len(), 3);
    for (_, auth, _) in &requests {
        assert_eq!(auth.as_deref(), Some("Bearer secret-key"));
    }
    assert_eq!(requests[0].0, "get step-9");
    assert_eq!(requests[1].0, "log task-1");
    assert_eq!(requests[1].2["level"], "info");
    assert!(requests[1].2.get("task_status").is_none());
    assert_eq!(requests[2].0, "update did:nv:owner task-1 step-9");
    assert_eq!(requests[2].2["step_status"], "Completed");
    assert_eq!(requests[2].2["is_last"], true);
}

#[tokio::test]
async fn test_gateway_routes_ids_with_reserved_characters() {
    let recorder = Recorder::default();
    let base = spawn_server(backend(recorder.clone())).await;
    let gateway = HttpTaskGateway::new(&base, "secret-key", Duration::from_secs(5)).unwrap();

    let step = gateway.get_step("batch/7?x#y").await.unwrap();

    assert_eq!(step.step_id, "batch/7?x#y");
    assert_eq!(recorder.take()[0].0, "get batch/7?x#y");
}

#[tokio::test]
async fn test_gateway_rejected_key_is_protocol_error() {
    let router = Router::new().route(
        "/api/v1/agents/steps/{step_id}",
        get(|| async { StatusCode::UNAUTHORIZED }),
    );
    let base = spawn_server(router).await;
    let gateway = HttpTaskGateway::new(&base, "bad", Duration::from_secs(5)).unwrap();

    let err = gateway.get_step("s").await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert!(err.to_string().contains("invalid API key"));
}

fn pinata_config(endpoint: String) -> StorageConfig {
    StorageConfig {
        pinata_api_key: Some("pin-key".to_string()),
        pinata_api_secret: Some("pin-secret".to_string()),
        pinata_endpoint: endpoint,
        ..StorageConfig::default()
    }
}

#[tokio::test]
async fn test_pinata_upload_returns_gateway_url() {
    let seen: Arc<Mutex<Option<(HeaderMap, Bytes)>>> = Arc::default();
    let captured = seen.clone();
    let router = Router::new().route(
        "/pinning/pinFileToIPFS",
        post(move |headers: HeaderMap, body: Bytes| {
            let captured = captured.clone();
            async move {
                *captured.lock().unwrap() = Some((headers, body));
                Json(json!({
                    "IpfsHash": "QmPortrait",
                    "PinSize": 18,
                    "Timestamp": "2024-05-01T12:00:00.000Z"
                }))
            }
        }),
    );
    let base = spawn_server(router).await;
    let store = PinataStore::new(&pinata_config(format!("{base}/pinning/pinFileToIPFS"))).unwrap();

    let reference = store
        .upload(&MockImageGenerator::sample_image(), "task-1.png")
        .await
        .unwrap();

    assert_eq!(
        reference.as_str(),
        "https://gateway.pinata.cloud/ipfs/QmPortrait"
    );
    let (headers, body) = seen.lock().unwrap().take().unwrap();
    assert_eq!(headers["pinata_api_key"], "pin-key");
    assert_eq!(headers["pinata_secret_api_key"], "pin-secret");
    let body = String::from_utf8_lossy(&body);
    assert!(body.contains(r#"name="file""#));
    assert!(body.contains(r#"filename="task-1.png""#));
    assert!(body.contains("mock-image"));
}

#[tokio::test]
async fn test_pinata_server_error_is_upload_error() {
    let router = Router::new().route(
        "/pin",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "pinning backlog") }),
    );
    let base = spawn_server(router).await;
    let store = PinataStore::new(&pinata_config(format!("{base}/pin"))).unwrap();

    let err = store
        .upload(&MockImageGenerator::sample_image(), "task-1.png")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Upload(_)));
    let message = err.to_string();
    assert!(message.contains("Failed to upload image to Pinata"));
    assert!(message.contains("pinning backlog"));
}

fn diffusion(endpoint: String) -> DiffusionClient {
    let config = GenerationConfig {
        endpoint,
        ..GenerationConfig::default()
    };
    DiffusionClient::new(config, ComputeDevice::Cpu).unwrap()
}

#[tokio::test]
async fn test_diffusion_client_returns_png() {
    let request: Arc<Mutex<Option<Value>>> = Arc::default();
    let captured = request.clone();
    let router = Router::new().route(
        "/generate",
        post(move |Json(body): Json<Value>| {
            let captured = captured.clone();
            async move {
                *captured.lock().unwrap() = Some(body);
                MockImageGenerator::sample_image().into_data()
            }
        }),
    );
    let base = spawn_server(router).await;

    let image = diffusion(base).generate("class: bard").await.unwrap();

    assert_eq!(image, MockImageGenerator::sample_image());
    let body = request.lock().unwrap().take().unwrap();
    assert_eq!(body["device"], "cpu");
    assert_eq!(body["dtype"], "float32");
    assert!(body["prompt"].as_str().unwrap().contains("class: bard"));
}

#[tokio::test]
async fn test_diffusion_client_rejects_non_png_body() {
    let router = Router::new().route("/generate", post(|| async { "not an image" }));
    let base = spawn_server(router).await;

    let err = diffusion(base).generate("a bard").await.unwrap_err();
    assert!(matches!(err, Error::Generation(_)));
}

#[tokio::test]
async fn test_diffusion_client_unavailable_server() {
    let router = Router::new().route(
        "/generate",
        post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let base = spawn_server(router).await;

    let err = diffusion(base).generate("a bard").await.unwrap_err();
    assert!(matches!(err, Error::Generation(_)));
    assert!(err.to_string().contains("not ready"));
}

#[tokio::test]
async fn test_websocket_subscription_joins_and_yields_events() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (joined_tx, joined_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let auth: Arc<Mutex<Option<String>>> = Arc::default();
        let seen = auth.clone();
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            *seen.lock().unwrap() = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Ok(resp)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(tcp, callback)
            .await
            .unwrap();

        let join = match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => serde_json::from_str::<Value>(text.as_str()).unwrap(),
            other => panic!("expected join message, got {other:?}"),
        };
        let auth = auth.lock().unwrap().clone();
        joined_tx.send((auth, join)).unwrap();

        ws.send(Message::Text("not json".to_string().into()))
            .await
            .unwrap();
        let event = json!({"step_id": "step-1", "task_id": "task-1", "did": "did:nv:agent"});
        ws.send(Message::Text(event.to_string().into()))
            .await
            .unwrap();
        ws.close(None).await.unwrap();
    });

    let mut source =
        WebSocketEventSource::connect(&format!("ws://{addr}"), "ws-key", "did:nv:agent")
            .await
            .unwrap();

    let event = source.next_event().await.unwrap().unwrap();
    assert_eq!(event.step_id, "step-1");
    assert_eq!(event.task_id, "task-1");
    assert!(source.next_event().await.is_none());

    let (auth, join) = joined_rx.await.unwrap();
    assert_eq!(auth.as_deref(), Some("Bearer ws-key"));
    assert_eq!(join["join_agent_rooms"], json!(["did:nv:agent"]));
    assert_eq!(join["join_account_room"], false);
}
