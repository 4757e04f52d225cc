use serde::{Deserialize, Deserializer, Serialize};

use crate::category::Category;

/// Body returned by `POST /predict`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub results: Vec<ImageDetections>,
    #[serde(default)]
    pub image_urls: ImageUrls,
}

impl DetectionResult {
    /// Iterates every box across all per-image detections.
    pub fn boxes(&self) -> impl Iterator<Item = &DetectedBox> {
        self.results.iter().flat_map(|detections| detections.boxes.iter())
    }

    pub fn box_count(&self) -> usize {
        self.results.iter().map(|detections| detections.boxes.len()).sum()
    }

    /// A response without any box is the "no objects found" outcome.
    pub fn is_empty(&self) -> bool {
        self.box_count() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageDetections {
    #[serde(default)]
    pub boxes: Vec<DetectedBox>,
    #[serde(default)]
    pub shape: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageUrls {
    #[serde(default)]
    pub original_image: Option<String>,
    #[serde(default)]
    pub annotated_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedBox {
    #[serde(default)]
    pub x1: Option<f64>,
    #[serde(default)]
    pub y1: Option<f64>,
    #[serde(default)]
    pub x2: Option<f64>,
    #[serde(default)]
    pub y2: Option<f64>,
    /// Detector score, distinct from the classifier confidence.
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default, rename = "class")]
    pub class_id: Option<i64>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub classification_results: Option<ClassificationResults>,
    #[serde(default)]
    pub crop_url: Option<String>,
}

impl DetectedBox {
    pub fn top_class(&self) -> Option<&str> {
        self.classification_results
            .as_ref()
            .and_then(ClassificationResults::top_class)
    }

    pub fn top_confidence(&self) -> Option<f64> {
        self.classification_results
            .as_ref()
            .and_then(ClassificationResults::top_confidence)
    }
}

/// Classifier output for one crop.
///
/// The backend has shipped two shapes: a flat `{top_class, confidence}` pair
/// and a ranked `top_classes` list with a `status`. Both are accepted; the
/// flat pair wins when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResults {
    #[serde(default)]
    pub top_class: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub top_classes: Vec<RankedClass>,
    #[serde(default)]
    pub message: Option<String>,
    /// Unrecognised values are ignored so the label keywords decide.
    #[serde(default, deserialize_with = "lenient_category")]
    pub category: Option<Category>,
}

fn lenient_category<'de, D>(deserializer: D) -> Result<Option<Category>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(Category::parse))
}

impl ClassificationResults {
    pub fn top_class(&self) -> Option<&str> {
        self.top_class
            .as_deref()
            .or_else(|| self.top_classes.first().map(|ranked| ranked.class_name.as_str()))
    }

    pub fn top_confidence(&self) -> Option<f64> {
        self.confidence
            .or_else(|| self.top_classes.first().map(|ranked| ranked.probability))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedClass {
    #[serde(default)]
    pub class_id: Option<i64>,
    pub class_name: String,
    pub probability: f64,
}

/// Body returned by `GET /health`. Every field is optional; any 2xx body
/// counts as healthy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub segmentation_model_loaded: Option<bool>,
    #[serde(default)]
    pub classification_model_loaded: Option<bool>,
}

impl HealthStatus {
    /// `Some(false)` when the backend says a model is missing, `None` when
    /// it did not report model state at all.
    pub fn models_ready(&self) -> Option<bool> {
        match (
            self.segmentation_model_loaded,
            self.classification_model_loaded,
        ) {
            (None, None) => None,
            (seg, cls) => Some(seg.unwrap_or(true) && cls.unwrap_or(true)),
        }
    }
}
