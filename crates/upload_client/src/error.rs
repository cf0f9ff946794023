use shared::protocol::NOT_OK_MESSAGE;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Transport(String),
    #[error("{message}", message = NOT_OK_MESSAGE)]
    Status { status: u16, detail: Option<String> },
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("invalid form field '{name}': {reason}")]
    Form { name: String, reason: String },
    #[error("page surface update failed: {0}")]
    Surface(String),
}

impl UploadError {
    pub(crate) fn surface(err: anyhow::Error) -> Self {
        UploadError::Surface(format!("{err:#}"))
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            UploadError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() || err.is_body() {
            UploadError::Body(err.to_string())
        } else {
            UploadError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("page has no element with id \"{0}\"")]
    MissingElement(String),
    #[error("invalid server url '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },
}
