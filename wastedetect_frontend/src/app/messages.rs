use log::{debug, error, info, warn};

use crate::api::DetectionApi;
use crate::error::{ConnectivityError, SubmissionError};
use crate::models::{DetectionResult, HealthStatus};

use super::state::SUBMISSION_MESSAGE;
use super::WasteDetectApp;

/// Completions reported by worker threads. Each carries the generation of
/// the session that issued the request.
pub enum AppMessage {
    HealthChecked {
        generation: u64,
        result: Result<HealthStatus, ConnectivityError>,
    },
    DetectionFinished {
        generation: u64,
        file_name: String,
        result: Result<DetectionResult, SubmissionError>,
    },
}

impl AppMessage {
    fn generation(&self) -> u64 {
        match self {
            AppMessage::HealthChecked { generation, .. }
            | AppMessage::DetectionFinished { generation, .. } => *generation,
        }
    }
}

impl<A: DetectionApi> WasteDetectApp<A> {
    pub(super) fn handle_message(&mut self, message: AppMessage) {
        if message.generation() != self.session.generation() {
            debug!(
                "dropping completion from discarded session {}",
                message.generation()
            );
            return;
        }
        match message {
            AppMessage::HealthChecked { result, .. } => self.handle_health_checked(result),
            AppMessage::DetectionFinished {
                file_name, result, ..
            } => self.handle_detection_finished(&file_name, result),
        }
    }

    fn handle_health_checked(&mut self, result: Result<HealthStatus, ConnectivityError>) {
        match result {
            Ok(health) => {
                if self.session.mark_healthy() {
                    info!("detection API at {} is reachable", self.api.base_url());
                }
                if health.models_ready() == Some(false) {
                    warn!("detection API reports its models are not loaded; submissions will fail");
                }
            }
            Err(err) => {
                error!("health check against {} failed: {err}", self.api.base_url());
                self.session.mark_unreachable();
            }
        }
    }

    fn handle_detection_finished(
        &mut self,
        file_name: &str,
        result: Result<DetectionResult, SubmissionError>,
    ) {
        match result {
            Ok(detections) => {
                let count = detections.box_count();
                if self.session.complete_submission(detections) {
                    info!("{file_name}: {count} object(s) detected");
                }
            }
            Err(err) => {
                error!("detection for {file_name} failed: {err}");
                self.session.fail_submission(SUBMISSION_MESSAGE);
            }
        }
    }
}
