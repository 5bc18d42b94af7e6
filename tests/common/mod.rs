//! In-process fake of the analysis service for integration tests.
//!
//! An axum router on an ephemeral port: `POST /analyze` parses the multipart
//! upload, `GET /health` answers the readiness check. Both record what they
//! received and reply with one canned response.

#![allow(dead_code)]

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use camino::Utf8PathBuf;
use candlescope::models::SelectedFile;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{Builder, NamedTempFile};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl FakeResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// One field of a multipart upload
#[derive(Debug, Clone)]
pub struct CapturedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    pub parts: Vec<CapturedPart>,
}

impl CapturedRequest {
    pub fn part(&self, name: &str) -> Option<&CapturedPart> {
        self.parts.iter().find(|part| part.name == name)
    }
}

#[derive(Clone)]
struct FakeState {
    response: FakeResponse,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl FakeState {
    fn record(&self, request: CapturedRequest) {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
    }

    async fn respond(&self) -> Response {
        if !self.response.delay.is_zero() {
            tokio::time::sleep(self.response.delay).await;
        }

        let status = StatusCode::from_u16(self.response.status).unwrap();
        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            self.response.body.clone(),
        )
            .into_response()
    }
}

async fn analyze_handler(
    State(state): State<FakeState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, MultipartError> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?.to_vec();

        parts.push(CapturedPart {
            name,
            file_name,
            content_type,
            bytes,
        });
    }

    state.record(CapturedRequest {
        method: "POST".to_string(),
        path: "/analyze".to_string(),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
        parts,
    });

    Ok(state.respond().await)
}

async fn health_handler(State(state): State<FakeState>) -> Response {
    state.record(CapturedRequest {
        method: "GET".to_string(),
        path: "/health".to_string(),
        content_type: None,
        parts: Vec::new(),
    });

    state.respond().await
}

pub struct FakeService {
    base_url: String,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    task: JoinHandle<()>,
}

impl FakeService {
    /// Serve `response` to every request until dropped
    pub async fn start(response: FakeResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let state = FakeState {
            response,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let request_count = Arc::clone(&state.request_count);
        let requests = Arc::clone(&state.requests);

        let router = Router::new()
            .route("/analyze", post(analyze_handler))
            .route("/health", get(health_handler))
            .with_state(state);

        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("fake service stopped");
        });

        Self {
            base_url,
            request_count,
            requests,
            task,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn analyze_url(&self) -> String {
        format!("{}/analyze", self.base_url)
    }

    /// Requests that reached a handler, including ones still waiting on the delay
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeService {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Base URL of a local port with nothing listening on it
pub async fn unused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// A successful analysis body the way the service emits it
pub fn sample_result_body() -> serde_json::Value {
    serde_json::json!({
        "prediction": "UP",
        "strength": 80,
        "stopLoss": 98.25,
        "takeProfit": 107.75,
        "patterns": ["Hammer"],
        "analysis": "TREND: UPTREND\nBuyers in control",
        "timeframe": "1-hour",
        "keyLevels": {
            "support": [99.5],
            "resistance": [104.5, 106.0],
            "lastHigh": 105.5,
            "lastLow": 96.75
        },
        "riskReward": "1:2.00",
        "tradingSetup": "ENTRY: 101.5\nSTOP: 98.25\nTARGET: 107.75",
        "candleCount": 48,
        "currentPrice": 101.5
    })
}

/// A chart image on disk; the handle keeps the file alive
pub fn chart_file(extension: &str, contents: &[u8]) -> (SelectedFile, NamedTempFile) {
    let mut temp_file = Builder::new()
        .prefix("chart")
        .suffix(&format!(".{}", extension))
        .tempfile()
        .unwrap();
    temp_file.write_all(contents).unwrap();
    temp_file.flush().unwrap();

    let path = Utf8PathBuf::try_from(temp_file.path().to_path_buf()).unwrap();
    let file = SelectedFile::from_path(&path).unwrap();
    (file, temp_file)
}
