use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE},
    Client,
};
use tracing::debug;
use url::Url;

use crate::{
    error::{BindError, UploadError},
    form::UploadForm,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
}

impl UploadResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn post_form(&self, endpoint: &str, form: UploadForm)
        -> Result<UploadResponse, UploadError>;
}

pub struct HttpTransport {
    http: Client,
    server_url: Url,
}

impl HttpTransport {
    pub fn new(server_url: &str, timeout: Option<Duration>) -> Result<Self, BindError> {
        let server_url = Url::parse(server_url).map_err(|err| BindError::InvalidServerUrl {
            url: server_url.to_string(),
            reason: err.to_string(),
        })?;
        if server_url.cannot_be_a_base() {
            return Err(BindError::InvalidServerUrl {
                url: server_url.to_string(),
                reason: "url cannot be used as a base".to_string(),
            });
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|err| BindError::InvalidServerUrl {
            url: server_url.to_string(),
            reason: format!("failed to build http client: {err}"),
        })?;

        Ok(Self { http, server_url })
    }

    /// `/upload` replaces the base path, matching how a page resolves a
    /// root-relative action against its origin.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, UploadError> {
        self.server_url
            .join(endpoint)
            .map_err(|err| UploadError::Transport(format!("invalid endpoint '{endpoint}': {err}")))
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn post_form(
        &self,
        endpoint: &str,
        form: UploadForm,
    ) -> Result<UploadResponse, UploadError> {
        let url = self.endpoint_url(endpoint)?;
        let field_count = form.len();
        let multipart = form.into_multipart()?;

        debug!(%url, field_count, "posting upload form");
        let response = self.http.post(url).multipart(multipart).send().await?;

        let status = response.status().as_u16();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };
        let content_type = header(CONTENT_TYPE);
        let content_disposition = header(CONTENT_DISPOSITION);

        let body = response
            .bytes()
            .await
            .map_err(|err| UploadError::Body(err.to_string()))?;

        Ok(UploadResponse {
            status,
            content_type,
            content_disposition,
            body: body.to_vec(),
        })
    }
}
