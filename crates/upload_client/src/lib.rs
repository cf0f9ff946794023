use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use shared::{
    error::server_error_detail,
    protocol::{
        classify_response, content_disposition_filename, ResponseKind, ResponseMode, SubmitPolicy,
        DOCUMENT_FAILURE_MESSAGE,
    },
};
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info};

pub mod error;
pub mod form;
pub mod surface;
pub mod transport;
pub mod types;

pub use error::{BindError, UploadError};
pub use form::{FieldValue, FilePart, FormField, UploadForm};
pub use surface::{Blob, DownloadAnchor, ObjectUrl, PageSurface};
pub use transport::{HttpTransport, UploadResponse, UploadTransport};
pub use types::{ControllerEvent, ControllerSettings, ControllerState, SubmitEvent, SubmitOutcome};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const FALLBACK_BLOB_MIME: &str = "application/octet-stream";

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct UploadFormController {
    settings: ControllerSettings,
    transport: Arc<dyn UploadTransport>,
    surface: Arc<dyn PageSurface>,
    in_flight: AtomicBool,
    generation: AtomicU64,
    state: Mutex<ControllerState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl UploadFormController {
    /// Setup entry point, called once the page surface is ready. Fails if the
    /// form or the status region is missing.
    pub fn bind(
        settings: ControllerSettings,
        transport: Arc<dyn UploadTransport>,
        surface: Arc<dyn PageSurface>,
    ) -> Result<Arc<Self>, BindError> {
        for element_id in [&settings.form_id, &settings.status_id] {
            if !surface.has_element(element_id) {
                return Err(BindError::MissingElement(element_id.clone()));
            }
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(
            form_id = %settings.form_id,
            endpoint = %settings.endpoint,
            mode = %settings.response_mode,
            policy = %settings.submit_policy,
            "upload form controller bound"
        );
        Ok(Arc::new(Self {
            settings,
            transport,
            surface,
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            state: Mutex::new(ControllerState::Idle),
            events,
        }))
    }

    pub async fn state(&self) -> ControllerState {
        *self.state.lock().await
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Handles submit events from `submissions` until the sender side closes.
    pub fn listen(self: &Arc<Self>, mut submissions: mpsc::Receiver<SubmitEvent>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(mut event) = submissions.recv().await {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    controller.handle_submit(&mut event).await;
                });
            }
            debug!("submit event stream closed");
        })
    }

    pub async fn handle_submit(&self, event: &mut SubmitEvent) -> SubmitOutcome {
        event.prevent_default();

        let _guard = match self.settings.submit_policy {
            SubmitPolicy::RejectWhileInFlight => match InFlightGuard::acquire(&self.in_flight) {
                Some(guard) => Some(guard),
                None => {
                    info!("ignoring submit while an upload is in flight");
                    return SubmitOutcome::Ignored;
                }
            },
            SubmitPolicy::Supersede => None,
        };

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.set_state(ControllerState::Submitting).await;
        let _ = self
            .events
            .send(ControllerEvent::SubmissionStarted { generation });
        self.set_status(&self.settings.processing_message).await;

        let form = event.take_form();
        info!(generation, fields = form.len(), "submitting upload form");

        let response = match self.transport.post_form(&self.settings.endpoint, form).await {
            Ok(response) => response,
            Err(err) => return self.fail(generation, None, err).await,
        };

        if !self.is_current(generation) {
            debug!(generation, status = response.status, "discarding superseded response");
            return SubmitOutcome::Superseded;
        }

        if !response.is_success() {
            let err = UploadError::Status {
                status: response.status,
                detail: server_error_detail(&response.body),
            };
            return self.fail(generation, None, err).await;
        }

        let kind = self.response_kind(&response);
        debug!(generation, ?kind, content_type = ?response.content_type, "upload succeeded");
        let applied = match kind {
            ResponseKind::Page => self.render_page(generation, response).await,
            ResponseKind::Document => self.deliver_document(generation, response).await,
        };

        let outcome = match applied {
            Ok(outcome) => outcome,
            Err(err) => return self.fail(generation, Some(kind), err).await,
        };
        let state = match outcome {
            SubmitOutcome::Downloaded { .. } => ControllerState::Downloaded,
            SubmitOutcome::Rendered => ControllerState::Rendered,
            _ => return outcome,
        };
        if self.finish(generation, state).await {
            outcome
        } else {
            SubmitOutcome::Superseded
        }
    }

    fn response_kind(&self, response: &UploadResponse) -> ResponseKind {
        self.settings.response_mode.forced_kind().unwrap_or_else(|| {
            classify_response(
                response.content_type.as_deref(),
                response.content_disposition.as_deref(),
            )
        })
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    fn superseded(&self, generation: u64, step: &'static str) -> bool {
        let stale = !self.is_current(generation);
        if stale {
            debug!(generation, step, "newer submission started; stopping here");
        }
        stale
    }

    async fn render_page(
        &self,
        generation: u64,
        response: UploadResponse,
    ) -> Result<SubmitOutcome, UploadError> {
        // Undecodable bytes become U+FFFD rather than failing the render.
        let markup = String::from_utf8_lossy(&response.body);
        if self.superseded(generation, "replace document") {
            return Ok(SubmitOutcome::Superseded);
        }
        self.surface
            .replace_document(&markup)
            .await
            .map_err(UploadError::surface)?;
        if self.superseded(generation, "scroll to top") {
            return Ok(SubmitOutcome::Superseded);
        }
        self.surface.scroll_to_top().await;
        Ok(SubmitOutcome::Rendered)
    }

    async fn deliver_document(
        &self,
        generation: u64,
        response: UploadResponse,
    ) -> Result<SubmitOutcome, UploadError> {
        let filename = match self.settings.response_mode {
            ResponseMode::Negotiate => response
                .content_disposition
                .as_deref()
                .and_then(content_disposition_filename),
            _ => None,
        }
        .unwrap_or_else(|| self.settings.download_filename.clone());

        let blob = Blob {
            mime_type: response
                .content_type
                .unwrap_or_else(|| FALLBACK_BLOB_MIME.to_string()),
            bytes: response.body,
        };
        if self.superseded(generation, "create object url") {
            return Ok(SubmitOutcome::Superseded);
        }
        let href = self
            .surface
            .create_object_url(blob)
            .await
            .map_err(UploadError::surface)?;
        if self.superseded(generation, "append anchor") {
            self.surface.revoke_object_url(&href).await;
            return Ok(SubmitOutcome::Superseded);
        }
        let anchor = DownloadAnchor {
            href: href.clone(),
            download: filename.clone(),
            hidden: true,
        };

        let clicked = self.activate_anchor(generation, &anchor).await;
        self.surface.revoke_object_url(&href).await;
        if !clicked? || self.superseded(generation, "completion status") {
            return Ok(SubmitOutcome::Superseded);
        }

        self.set_status(&self.settings.completion_message).await;
        info!(%filename, "report download triggered");
        Ok(SubmitOutcome::Downloaded { filename })
    }

    async fn activate_anchor(
        &self,
        generation: u64,
        anchor: &DownloadAnchor,
    ) -> Result<bool, UploadError> {
        self.surface
            .append_anchor(anchor)
            .await
            .map_err(UploadError::surface)?;
        let clicked = if self.superseded(generation, "click anchor") {
            Ok(false)
        } else {
            self.surface
                .click_anchor(anchor)
                .await
                .map(|()| true)
                .map_err(UploadError::surface)
        };
        self.surface.remove_anchor(anchor).await;
        clicked
    }

    async fn fail(
        &self,
        generation: u64,
        classified: Option<ResponseKind>,
        err: UploadError,
    ) -> SubmitOutcome {
        if !self.is_current(generation) {
            debug!(generation, error = %err, "discarding superseded failure");
            return SubmitOutcome::Superseded;
        }

        match &err {
            UploadError::Status { status, detail } => {
                error!(generation, status, detail = ?detail, error = %err, "upload rejected by server")
            }
            _ => error!(generation, error = ?err, "upload failed"),
        }

        let kind = self
            .settings
            .response_mode
            .forced_kind()
            .or(classified)
            .unwrap_or(ResponseKind::Page);
        let message = match kind {
            ResponseKind::Page => format!("An error occurred: {err}"),
            ResponseKind::Document => DOCUMENT_FAILURE_MESSAGE.to_string(),
        };
        self.set_status(&message).await;
        if self.finish(generation, ControllerState::Failed).await {
            SubmitOutcome::Failed(err)
        } else {
            SubmitOutcome::Superseded
        }
    }

    async fn finish(&self, generation: u64, state: ControllerState) -> bool {
        let mut current = self.state.lock().await;
        if self.superseded(generation, "finish") {
            return false;
        }
        *current = state;
        drop(current);
        let _ = self
            .events
            .send(ControllerEvent::SubmissionFinished { generation, state });
        true
    }

    async fn set_state(&self, state: ControllerState) {
        *self.state.lock().await = state;
    }

    async fn set_status(&self, message: &str) {
        self.surface
            .set_status(&self.settings.status_id, message)
            .await;
        let _ = self
            .events
            .send(ControllerEvent::StatusChanged(message.to_string()));
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
