//! Shared fixtures for command and upload tests

use axum::body::Bytes;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use std::sync::{Arc, Mutex};

use harvest_persist::{SqliteConfig, SqliteQueueStore};

use crate::capture::CaptureMetadata;
use crate::upload::{IDEMPOTENCY_HEADER, METADATA_HEADER};

/// One request seen by the test upload server
#[derive(Debug, Clone)]
pub struct Upload {
    pub id: String,
    pub idempotency_key: String,
    pub metadata: CaptureMetadata,
    pub body: Vec<u8>,
}

pub type Received = Arc<Mutex<Vec<Upload>>>;

/// Ids starting with "reject" get a 503
async fn accept(
    State(received): State<Received>,
    UrlPath(id): UrlPath<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let metadata = STANDARD.decode(header(METADATA_HEADER)).unwrap();
    let status = if id.starts_with("reject") {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::CREATED
    };

    received.lock().unwrap().push(Upload {
        idempotency_key: header(IDEMPOTENCY_HEADER),
        metadata: serde_json::from_slice(&metadata).unwrap(),
        body: body.to_vec(),
        id,
    });
    status
}

pub async fn spawn_server() -> (String, Received) {
    let received = Received::default();
    let app = Router::new()
        .route("/captures/{id}", post(accept))
        .with_state(received.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/", addr), received)
}

/// An address nothing listens on
pub async fn unreachable_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// File-backed queue inside `dir`; reopening the same dir sees the same queue
pub async fn open_store(dir: &Path) -> SqliteQueueStore<CaptureMetadata> {
    SqliteQueueStore::open(&SqliteConfig::file(dir.join("queue.db")))
        .await
        .unwrap()
}
