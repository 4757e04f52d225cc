use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use log::info;

use crate::api::{ApiClient, DetectionApi};
use crate::error::SessionError;
use crate::preview::{LoadedImage, PreviewRegistry};
use crate::validation::{validate_image, ImageUpload};
use crate::view::{self, Screen};

mod messages;
pub mod state;
mod tasks;

pub use messages::AppMessage;
pub use state::{ApiStatus, Phase, Session};

/// Owns the session and drives the two network calls.
///
/// Calls run on worker threads and report back over a channel; the session
/// only changes inside [`process_messages`](Self::process_messages) and the
/// `wait_*` helpers, so every transition happens on the caller's thread.
pub struct WasteDetectApp<A: DetectionApi = ApiClient> {
    api: A,
    tx: Sender<AppMessage>,
    rx: Receiver<AppMessage>,
    session: Session,
    previews: PreviewRegistry,
    next_generation: u64,
}

impl<A: DetectionApi> WasteDetectApp<A> {
    pub fn new(api: A) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            api,
            tx,
            rx,
            session: Session::new(0),
            previews: PreviewRegistry::new(),
            next_generation: 1,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn screen(&self) -> Screen {
        view::screen(&self.session, self.api.base_url())
    }

    /// Issues the health probe for the current session. Later calls are
    /// no-ops.
    pub fn start(&mut self) {
        if self.session.request_health_check() {
            info!("checking detection API at {}", self.api.base_url());
            tasks::check_health(self.api.clone(), self.tx.clone(), self.session.generation());
        }
    }

    /// Discards the whole session, including any preview, and probes the
    /// backend again. A request still in flight for the old session is
    /// ignored when it completes.
    pub fn restart(&mut self) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.session = Session::new(generation);
        self.start();
    }

    pub fn select_file(&mut self, upload: ImageUpload) -> Result<(), SessionError> {
        self.session.ensure_can_select()?;
        let kind = validate_image(&upload)?;
        let image = LoadedImage::decode(&upload, kind)?;
        let upload = upload.with_mime(kind.mime_type());
        let file_name = upload.file_name.clone();
        let (width, height) = (image.width(), image.height());
        let previews = &self.previews;
        self.session
            .select_file(upload, |upload| previews.acquire(&upload.file_name, image))?;
        info!("selected {file_name} ({width}x{height})");
        Ok(())
    }

    /// Starts a submission. Returns `false` when nothing was sent because
    /// there is no file to submit or one is already in flight.
    pub fn submit(&mut self) -> bool {
        match self.session.begin_submission() {
            Some(upload) => {
                info!("submitting {}", upload.file_name);
                tasks::submit_image(
                    self.api.clone(),
                    self.tx.clone(),
                    self.session.generation(),
                    upload,
                );
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.session.reset()
    }

    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.session.cancel()
    }

    /// Applies every completion that has already arrived.
    pub fn process_messages(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.handle_message(message);
            handled += 1;
        }
        handled
    }

    /// Blocks until one completion arrives and applies it.
    pub fn wait_for_message(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => {
                self.handle_message(message);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Applies completions until neither the health probe nor a submission
    /// is pending. Returns `false` on timeout.
    pub fn wait_until_settled(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_messages();
            if !self.is_waiting() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.wait_for_message(deadline - now);
        }
    }

    fn is_waiting(&self) -> bool {
        match self.session.phase() {
            // A session that was never started has nothing to wait for.
            Phase::CheckingHealth => self.session.health_requested(),
            Phase::Submitting => true,
            _ => false,
        }
    }
}
