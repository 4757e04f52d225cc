use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// The health probe could not reach a working backend.
#[derive(Debug, Error)]
pub enum ConnectivityError {
    #[error("health check timed out")]
    Timeout,
    #[error("health check failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("health check returned {0}")]
    Status(StatusCode),
}

impl ConnectivityError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err)
        }
    }
}

/// A detection request did not produce a usable result.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("detection request timed out")]
    Timeout,
    #[error("detection request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("malformed detection response: {0}")]
    MalformedBody(#[source] serde_json::Error),
}

impl SubmissionError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err)
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// The selected file was rejected before it reached the session.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{file_name} is empty")]
    Empty { file_name: String },
    #[error("{file_name} is not an image ({mime})")]
    NotAnImage { file_name: String, mime: String },
    #[error("{file_name} is not a JPEG or PNG image")]
    UnsupportedFormat { file_name: String },
    #[error("{file_name} could not be decoded: {source}")]
    Undecodable {
        file_name: String,
        #[source]
        source: image::ImageError,
    },
}

/// An operation was requested in a state that does not allow it.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a submission is in flight")]
    Busy,
    #[error("the detection service is not available")]
    NotReady,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
