//! Presentation model. Everything here is a pure function of the session.

use std::fmt;

use uuid::Uuid;

use crate::api::resolve_asset_url;
use crate::app::{Phase, Session};
use crate::category::{self, Category};
use crate::models::{DetectedBox, DetectionResult};

pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    CheckingConnection,
    ConnectionError { message: String },
    Upload,
    Preview(PreviewView),
    NoResults,
    Results(ResultsView),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewView {
    pub file_name: String,
    pub mime: String,
    pub size: [usize; 2],
    pub preview_id: Uuid,
    pub error: Option<String>,
    pub processing: bool,
    pub can_submit: bool,
    pub can_cancel: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub annotated_image_url: Option<String>,
    pub items: Vec<ResultItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultItem {
    pub label: String,
    pub confidence_percent: u8,
    pub tier: ConfidenceTier,
    pub category: Category,
    pub crop_url: Option<String>,
}

/// Colour band of the confidence bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceTier {
    pub fn from_percent(percent: u8) -> Self {
        match percent {
            p if p > 80 => ConfidenceTier::High,
            p if p > 50 => ConfidenceTier::Medium,
            p if p > 30 => ConfidenceTier::Low,
            _ => ConfidenceTier::VeryLow,
        }
    }
}

pub fn confidence_percent(confidence: f64) -> u8 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

pub fn screen(session: &Session, base_url: &str) -> Screen {
    match session.phase() {
        Phase::CheckingHealth => Screen::CheckingConnection,
        Phase::Unreachable => Screen::ConnectionError {
            message: session.error().unwrap_or_default().to_string(),
        },
        Phase::Idle => Screen::Upload,
        Phase::Previewing | Phase::Submitting | Phase::Failed => {
            match (session.selected_file(), session.preview()) {
                (Some(file), Some(preview)) => {
                    let processing = session.is_loading();
                    Screen::Preview(PreviewView {
                        file_name: file.file_name.clone(),
                        mime: file.mime.clone(),
                        size: [preview.image().width(), preview.image().height()],
                        preview_id: preview.id(),
                        error: session.error().map(str::to_string),
                        processing,
                        can_submit: !processing,
                        can_cancel: !processing,
                    })
                }
                _ => Screen::Upload,
            }
        }
        Phase::Completed => match session.results() {
            Some(results) if !results.is_empty() => Screen::Results(results_view(results, base_url)),
            _ => Screen::NoResults,
        },
    }
}

pub fn results_view(results: &DetectionResult, base_url: &str) -> ResultsView {
    ResultsView {
        annotated_image_url: results
            .image_urls
            .annotated_image
            .as_deref()
            .map(|path| resolve_asset_url(base_url, path)),
        items: results
            .boxes()
            .map(|detected| result_item(detected, base_url))
            .collect(),
    }
}

fn result_item(detected: &DetectedBox, base_url: &str) -> ResultItem {
    let label = detected.top_class().unwrap_or(UNKNOWN_LABEL).to_string();
    let confidence_percent = confidence_percent(detected.top_confidence().unwrap_or(0.0));
    let hint = detected
        .classification_results
        .as_ref()
        .and_then(|classification| classification.category);
    ResultItem {
        category: category::classify(&label, hint),
        tier: ConfidenceTier::from_percent(confidence_percent),
        crop_url: detected
            .crop_url
            .as_deref()
            .map(|path| resolve_asset_url(base_url, path)),
        label,
        confidence_percent,
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::CheckingConnection => writeln!(f, "Connecting to the detection API..."),
            Screen::ConnectionError { message } => {
                writeln!(f, "Connection Error")?;
                writeln!(f, "  {message}")?;
                writeln!(f, "  [Retry Connection]")
            }
            Screen::Upload => writeln!(f, "Upload Image (JPEG or PNG)"),
            Screen::Preview(preview) => {
                writeln!(f, "Preview & Upload")?;
                writeln!(
                    f,
                    "  {} ({}, {}x{})",
                    preview.file_name, preview.mime, preview.size[0], preview.size[1]
                )?;
                if let Some(error) = &preview.error {
                    writeln!(f, "  {error}")?;
                }
                if preview.processing {
                    writeln!(f, "  Processing...")
                } else {
                    writeln!(f, "  [Cancel] [Analyze Image]")
                }
            }
            Screen::NoResults => {
                writeln!(f, "No Results")?;
                writeln!(f, "  No waste objects detected. Try uploading a different image.")
            }
            Screen::Results(results) => {
                writeln!(f, "Detection Results")?;
                if let Some(url) = &results.annotated_image_url {
                    writeln!(f, "  annotated: {url}")?;
                }
                for item in &results.items {
                    write!(
                        f,
                        "  {} {} [{}] confidence {}%",
                        item.category.icon(),
                        item.label,
                        item.category,
                        item.confidence_percent
                    )?;
                    match &item.crop_url {
                        Some(url) => writeln!(f, " crop: {url}")?,
                        None => writeln!(f)?,
                    }
                }
                Ok(())
            }
        }
    }
}
