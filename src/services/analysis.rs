use crate::models::{AnalysisResult, SelectedFile, Settings};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Message shown for every failure that carries no server-provided detail
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to analyze chart. Please try again.";

/// Message shown when analysis is requested with no image selected
pub const NO_FILE_MESSAGE: &str = "Please select an image first";

/// Name of the multipart part carrying the image bytes
pub const FILE_PART_NAME: &str = "file";

/// One chart upload: image bytes plus declared type. Lives only for one request.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AnalysisRequest {
    /// Read `file` fully into memory.
    pub async fn from_file(file: &SelectedFile) -> Result<Self, AnalysisError> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| AnalysisError::Read(format!("{}: {}", file.path, e)))?;

        Ok(Self {
            file_name: file.name.clone(),
            mime_type: file.mime_type().to_string(),
            bytes,
        })
    }
}

/// Errors from the analysis pipeline.
///
/// The window only ever shows [`AnalysisError::user_message`]; the variants exist
/// for logging and tests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("No image selected")]
    Validation,

    #[error("Failed to read image {0}")]
    Read(String),

    #[error("Analysis service unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server returned {status}")]
    Server { status: u16, detail: Option<String> },

    #[error("Malformed analysis response: {0}")]
    InvalidResponse(String),
}

impl AnalysisError {
    /// The single message the session stores in its `Error` phase.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Validation => NO_FILE_MESSAGE.to_string(),
            AnalysisError::Server {
                detail: Some(detail),
                ..
            } => detail.clone(),
            AnalysisError::Timeout(duration) => format!(
                "Analysis timed out after {}. Please try again.",
                format_seconds(*duration)
            ),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AnalysisError::Timeout(_))
    }
}

/// Whole seconds print bare, sub-second remainders keep up to millisecond precision.
fn format_seconds(duration: Duration) -> String {
    let millis = duration.as_millis();
    let amount = if millis % 1000 == 0 {
        (millis / 1000).to_string()
    } else {
        format!("{:.3}", duration.as_secs_f64())
            .trim_end_matches('0')
            .to_string()
    };

    if amount == "1" {
        "1 second".to_string()
    } else {
        format!("{} seconds", amount)
    }
}

/// Error body of a failed request (`{"detail": "..."}`)
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Extract the `detail` string from an error body, if the body is JSON and has one.
pub fn parse_error_detail(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
}

/// Transport seam for the remote analysis service.
///
/// Implementations perform exactly one attempt per call: no queuing, retry or backoff.
pub trait AnalysisService: Send + Sync {
    fn submit(
        &self,
        request: AnalysisRequest,
    ) -> impl Future<Output = Result<AnalysisResult, AnalysisError>> + Send;
}

/// Turn a selected file into one analysis request and submit it.
///
/// Fails with [`AnalysisError::Validation`] without touching the network when no
/// file is selected.
pub async fn analyze<S: AnalysisService>(
    service: &S,
    file: Option<&SelectedFile>,
) -> Result<AnalysisResult, AnalysisError> {
    let file = file.ok_or(AnalysisError::Validation)?;
    let request = AnalysisRequest::from_file(file).await?;
    service.submit(request).await
}

/// HTTP client for `POST {baseURL}/analyze`
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    http: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpAnalysisClient {
    pub fn new(settings: &Settings) -> Result<Self, AnalysisError> {
        Self::with_endpoint(settings.analyze_url(), settings.request_timeout())
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    fn classify(&self, error: reqwest::Error) -> AnalysisError {
        if error.is_timeout() {
            AnalysisError::Timeout(self.timeout)
        } else if error.is_connect() {
            AnalysisError::BackendUnavailable(error.to_string())
        } else {
            AnalysisError::Network(error.to_string())
        }
    }
}

impl AnalysisService for HttpAnalysisClient {
    async fn submit(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let size = request.bytes.len();
        let part = Part::bytes(request.bytes)
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)
            .map_err(|e| AnalysisError::Network(e.to_string()))?;
        let form = Form::new().part(FILE_PART_NAME, part);

        tracing::info!(
            "Submitting {} ({} bytes) to {}",
            request.file_name,
            size,
            self.endpoint
        );
        let start = Instant::now();

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        tracing::debug!(
            "Analysis response {} after {:.2}s ({} bytes)",
            status,
            start.elapsed().as_secs_f32(),
            body.len()
        );

        if !status.is_success() {
            return Err(server_error(status, &body));
        }

        serde_json::from_str::<AnalysisResult>(&body).map_err(|e| {
            tracing::warn!("Analysis response did not match the result contract: {}", e);
            AnalysisError::InvalidResponse(e.to_string())
        })
    }
}

fn server_error(status: StatusCode, body: &str) -> AnalysisError {
    let detail = parse_error_detail(body);
    tracing::warn!("Analysis failed with {}: {:?}", status, detail);

    AnalysisError::Server {
        status: status.as_u16(),
        detail,
    }
}
