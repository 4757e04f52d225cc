pub mod api;
pub mod app;
pub mod category;
pub mod config;
pub mod error;
pub mod models;
pub mod preview;
pub mod validation;
pub mod view;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use log::error;

pub use api::{ApiClient, DetectionApi};
pub use app::{Phase, WasteDetectApp};
pub use config::FrontendConfig;
pub use error::SessionError;
pub use validation::ImageUpload;
pub use view::Screen;

/// How a one-shot run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Detected,
    NoObjects,
    Unreachable,
    Rejected,
    Failed,
    TimedOut,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Detected | RunOutcome::NoObjects)
    }
}

/// Runs start → select → submit for a single image against the configured
/// backend, handing every screen to `render` as it changes.
pub fn run_frontend(
    config: &FrontendConfig,
    image: &Path,
    settle_timeout: Duration,
    render: impl FnMut(&Screen),
) -> Result<RunOutcome> {
    let api = ApiClient::from_config(config)?;
    let mut app = WasteDetectApp::new(api);
    Ok(drive(&mut app, image, settle_timeout, render))
}

/// Same flow as [`run_frontend`] on an app the caller already built.
pub fn drive<A: DetectionApi>(
    app: &mut WasteDetectApp<A>,
    image: &Path,
    settle_timeout: Duration,
    mut render: impl FnMut(&Screen),
) -> RunOutcome {
    app.start();
    render(&app.screen());
    if !app.wait_until_settled(settle_timeout) {
        return RunOutcome::TimedOut;
    }
    if app.phase() == Phase::Unreachable {
        render(&app.screen());
        return RunOutcome::Unreachable;
    }

    let selected = ImageUpload::from_path(image)
        .map_err(SessionError::from)
        .and_then(|upload| app.select_file(upload));
    if let Err(err) = selected {
        error!("{} rejected: {err}", image.display());
        render(&app.screen());
        return RunOutcome::Rejected;
    }
    render(&app.screen());

    app.submit();
    render(&app.screen());
    if !app.wait_until_settled(settle_timeout) {
        return RunOutcome::TimedOut;
    }
    render(&app.screen());

    match app.screen() {
        Screen::Results(_) => RunOutcome::Detected,
        Screen::NoResults => RunOutcome::NoObjects,
        _ => RunOutcome::Failed,
    }
}
