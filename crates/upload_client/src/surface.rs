use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadAnchor {
    pub href: ObjectUrl,
    pub download: String,
    pub hidden: bool,
}

#[async_trait]
pub trait PageSurface: Send + Sync {
    fn has_element(&self, element_id: &str) -> bool;

    async fn set_status(&self, element_id: &str, message: &str);

    async fn replace_document(&self, markup: &str) -> Result<()>;

    async fn scroll_to_top(&self);

    async fn create_object_url(&self, blob: Blob) -> Result<ObjectUrl>;

    async fn append_anchor(&self, anchor: &DownloadAnchor) -> Result<()>;

    async fn click_anchor(&self, anchor: &DownloadAnchor) -> Result<()>;

    async fn remove_anchor(&self, anchor: &DownloadAnchor);

    async fn revoke_object_url(&self, url: &ObjectUrl);
}
