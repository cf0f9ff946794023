use serde::{Deserialize, Serialize};
use shared::protocol::{
    ResponseMode, SubmitPolicy, COMPLETION_MESSAGE, DEFAULT_DOWNLOAD_FILENAME, DEFAULT_FORM_ID,
    DEFAULT_STATUS_ID, PROCESSING_MESSAGE, UPLOAD_PATH,
};

use crate::{error::UploadError, form::UploadForm};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSettings {
    pub endpoint: String,
    pub response_mode: ResponseMode,
    pub submit_policy: SubmitPolicy,
    pub download_filename: String,
    pub form_id: String,
    pub status_id: String,
    pub processing_message: String,
    pub completion_message: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            endpoint: UPLOAD_PATH.into(),
            response_mode: ResponseMode::default(),
            submit_policy: SubmitPolicy::default(),
            download_filename: DEFAULT_DOWNLOAD_FILENAME.into(),
            form_id: DEFAULT_FORM_ID.into(),
            status_id: DEFAULT_STATUS_ID.into(),
            processing_message: PROCESSING_MESSAGE.into(),
            completion_message: COMPLETION_MESSAGE.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    #[default]
    Idle,
    Submitting,
    Rendered,
    Downloaded,
    Failed,
}

#[derive(Debug)]
pub struct SubmitEvent {
    form: Option<UploadForm>,
    default_prevented: bool,
}

impl SubmitEvent {
    pub fn new(form: UploadForm) -> Self {
        Self {
            form: Some(form),
            default_prevented: false,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub(crate) fn take_form(&mut self) -> UploadForm {
        self.form.take().unwrap_or_default()
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Rendered,
    Downloaded { filename: String },
    Failed(UploadError),
    Ignored,
    /// Completed after a newer submission started; nothing was applied.
    Superseded,
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            SubmitOutcome::Rendered | SubmitOutcome::Downloaded { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    StatusChanged(String),
    SubmissionStarted { generation: u64 },
    SubmissionFinished { generation: u64, state: ControllerState },
}
