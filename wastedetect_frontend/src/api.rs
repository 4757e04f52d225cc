use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};

use crate::config::{FrontendConfig, DEFAULT_TIMEOUT_SECS};
use crate::error::{ConnectivityError, SubmissionError};
use crate::models::{DetectionResult, HealthStatus};
use crate::validation::ImageUpload;

/// Multipart field the backend reads the image from.
pub const UPLOAD_FIELD: &str = "file";

/// The two calls the session needs from a detection backend.
pub trait DetectionApi: Clone + Send + 'static {
    fn check_health(&self) -> Result<HealthStatus, ConnectivityError>;

    fn submit_image(&self, upload: &ImageUpload) -> Result<DetectionResult, SubmissionError>;

    fn base_url(&self) -> &str;
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    health_url: Url,
    predict_url: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
    }

    pub fn from_config(config: &FrontendConfig) -> Result<Self> {
        Self::with_timeout(config.api_url.clone(), config.request_timeout)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let base = sanitize_base_url(base_url.into())?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            health_url: endpoint(&base, "/health")?,
            predict_url: endpoint(&base, "/predict")?,
            base_url: base,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health`. Any 2xx counts as reachable; the body is decoded on a
    /// best-effort basis.
    pub fn check_health(&self) -> Result<HealthStatus, ConnectivityError> {
        debug!("GET {}", self.health_url);
        let response = self
            .client
            .get(self.health_url.clone())
            .send()
            .map_err(ConnectivityError::from_transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConnectivityError::Status(status));
        }
        let body = response.text().map_err(ConnectivityError::from_transport)?;
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    /// `POST /predict` with the image as the single multipart field.
    pub fn submit_image(
        &self,
        file_bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> Result<DetectionResult, SubmissionError> {
        debug!(
            "POST {} ({filename}, {mime_type}, {} bytes)",
            self.predict_url,
            file_bytes.len()
        );
        let part = Part::bytes(file_bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(SubmissionError::Network)?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        let response = self
            .client
            .post(self.predict_url.clone())
            .multipart(form)
            .send()
            .map_err(SubmissionError::from_transport)?;
        let status = response.status();
        if !status.is_success() {
            // An unreadable error body still reports the status.
            let body = response.text().unwrap_or_default();
            return Err(SubmissionError::Status {
                status,
                message: error_message(status, &body),
            });
        }
        let body = response.text().map_err(SubmissionError::from_transport)?;
        serde_json::from_str(&body).map_err(SubmissionError::MalformedBody)
    }

    /// Resolves a backend-relative asset path (crop or annotated image).
    pub fn resolve_asset_url(&self, path: &str) -> String {
        resolve_asset_url(&self.base_url, path)
    }
}

impl DetectionApi for ApiClient {
    fn check_health(&self) -> Result<HealthStatus, ConnectivityError> {
        ApiClient::check_health(self)
    }

    fn submit_image(&self, upload: &ImageUpload) -> Result<DetectionResult, SubmissionError> {
        ApiClient::submit_image(self, upload.bytes().to_vec(), &upload.file_name, &upload.mime)
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

pub(crate) fn resolve_asset_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else if path.starts_with('/') {
        format!("{base_url}{path}")
    } else {
        format!("{base_url}/{path}")
    }
}

/// Picks the most useful message out of an error body: FastAPI's `detail`,
/// a `message` field, the raw text, or the reason phrase.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message"] {
            match value.get(key) {
                Some(serde_json::Value::String(text)) => return text.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.chars().take(300).collect();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

fn endpoint(base: &str, path: &str) -> Result<Url> {
    Url::parse(&format!("{base}{path}")).with_context(|| format!("invalid endpoint URL for {path}"))
}

fn sanitize_base_url(mut base: String) -> Result<String> {
    base = base.trim().to_string();
    if !base.starts_with("http://") && !base.starts_with("https://") {
        base = format!("http://{base}");
    }
    while base.ends_with('/') {
        base.pop();
    }
    let _ = Url::parse(&base).context("invalid base URL")?;
    Ok(base)
}
