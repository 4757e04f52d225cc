use crate::error::SessionError;
use crate::models::DetectionResult;
use crate::preview::PreviewHandle;
use crate::validation::ImageUpload;

pub const CONNECTIVITY_MESSAGE: &str =
    "Unable to connect to the API. Please ensure the backend server is running.";
pub const SUBMISSION_MESSAGE: &str =
    "An error occurred while processing the image. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    Checking,
    Healthy,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    CheckingHealth,
    Unreachable,
    Idle,
    Previewing,
    Submitting,
    Completed,
    Failed,
}

/// The selected file and its preview travel together, so one can never
/// exist without the other.
#[derive(Debug)]
pub struct Selection {
    pub upload: ImageUpload,
    pub preview: PreviewHandle,
}

/// One user's upload/detection interaction.
#[derive(Debug)]
pub struct Session {
    generation: u64,
    api_status: ApiStatus,
    health_requested: bool,
    selection: Option<Selection>,
    results: Option<DetectionResult>,
    loading: bool,
    error: Option<String>,
}

impl Session {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            api_status: ApiStatus::Checking,
            health_requested: false,
            selection: None,
            results: None,
            loading: false,
            error: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn api_status(&self) -> ApiStatus {
        self.api_status
    }

    pub fn selected_file(&self) -> Option<&ImageUpload> {
        self.selection.as_ref().map(|selection| &selection.upload)
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.selection.as_ref().map(|selection| &selection.preview)
    }

    pub fn results(&self) -> Option<&DetectionResult> {
        self.results.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn phase(&self) -> Phase {
        match self.api_status {
            ApiStatus::Checking => return Phase::CheckingHealth,
            ApiStatus::Error => return Phase::Unreachable,
            ApiStatus::Healthy => {}
        }
        if self.loading {
            Phase::Submitting
        } else if self.results.is_some() {
            Phase::Completed
        } else if self.selection.is_some() && self.error.is_some() {
            Phase::Failed
        } else if self.selection.is_some() {
            Phase::Previewing
        } else {
            Phase::Idle
        }
    }

    /// Returns `true` the first time it is called; the health probe runs
    /// once per session.
    pub(crate) fn request_health_check(&mut self) -> bool {
        if self.health_requested {
            return false;
        }
        self.health_requested = true;
        true
    }

    pub(crate) fn health_requested(&self) -> bool {
        self.health_requested
    }

    pub(crate) fn mark_healthy(&mut self) -> bool {
        if self.api_status != ApiStatus::Checking {
            return false;
        }
        self.api_status = ApiStatus::Healthy;
        true
    }

    pub(crate) fn mark_unreachable(&mut self) -> bool {
        if self.api_status != ApiStatus::Checking {
            return false;
        }
        self.api_status = ApiStatus::Error;
        self.error = Some(CONNECTIVITY_MESSAGE.to_string());
        true
    }

    pub fn ensure_can_select(&self) -> Result<(), SessionError> {
        match self.phase() {
            Phase::Idle | Phase::Previewing | Phase::Completed | Phase::Failed => Ok(()),
            Phase::Submitting => Err(SessionError::Busy),
            Phase::CheckingHealth | Phase::Unreachable => Err(SessionError::NotReady),
        }
    }

    /// Replaces the selection. The previous preview is released before the
    /// new one is acquired.
    pub fn select_file<F>(&mut self, upload: ImageUpload, acquire: F) -> Result<(), SessionError>
    where
        F: FnOnce(&ImageUpload) -> PreviewHandle,
    {
        self.ensure_can_select()?;
        self.selection = None;
        let preview = acquire(&upload);
        self.selection = Some(Selection { upload, preview });
        self.results = None;
        self.error = None;
        Ok(())
    }

    /// Moves to `Submitting` and hands back the file to send. `None` means
    /// the call is a no-op: nothing to submit, or a submission is already in
    /// flight.
    pub fn begin_submission(&mut self) -> Option<ImageUpload> {
        if !matches!(self.phase(), Phase::Previewing | Phase::Failed) {
            return None;
        }
        let upload = self.selected_file()?.clone();
        self.loading = true;
        self.error = None;
        Some(upload)
    }

    pub(crate) fn complete_submission(&mut self, results: DetectionResult) -> bool {
        if !self.loading {
            return false;
        }
        self.loading = false;
        self.error = None;
        self.results = Some(results);
        true
    }

    /// Keeps the selection so the user can retry or cancel.
    pub(crate) fn fail_submission(&mut self, message: impl Into<String>) -> bool {
        if !self.loading {
            return false;
        }
        self.loading = false;
        self.error = Some(message.into());
        true
    }

    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.loading {
            return Err(SessionError::Busy);
        }
        self.selection = None;
        self.results = None;
        if self.api_status == ApiStatus::Healthy {
            self.error = None;
        }
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.reset()
    }
}
