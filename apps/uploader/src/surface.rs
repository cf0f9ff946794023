//! Page surface backed by an output directory: the replaced document and any
//! downloads land on disk, status updates go to the log.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};
use upload_client::{Blob, DownloadAnchor, ObjectUrl, PageSurface};
use uuid::Uuid;

pub const PAGE_FILENAME: &str = "page.html";

pub struct FsSurface {
    output_dir: PathBuf,
    elements: HashSet<String>,
    status: Mutex<Option<String>>,
    staged: Mutex<HashMap<ObjectUrl, Blob>>,
    anchors: Mutex<Vec<DownloadAnchor>>,
    written: Mutex<Vec<PathBuf>>,
}

impl FsSurface {
    pub fn new<I, S>(output_dir: impl Into<PathBuf>, element_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            output_dir: output_dir.into(),
            elements: element_ids.into_iter().map(Into::into).collect(),
            status: Mutex::new(None),
            staged: Mutex::new(HashMap::new()),
            anchors: Mutex::new(Vec::new()),
            written: Mutex::new(Vec::new()),
        }
    }

    pub async fn status(&self) -> Option<String> {
        self.status.lock().await.clone()
    }

    pub async fn written_files(&self) -> Vec<PathBuf> {
        self.written.lock().await.clone()
    }

    async fn write_output(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| anyhow!("refusing to write download without a file name: '{filename}'"))?;
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| {
                format!(
                    "failed to create output directory '{}'",
                    self.output_dir.display()
                )
            })?;

        let path = self.output_dir.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        self.written.lock().await.push(path.clone());
        Ok(path)
    }
}

#[async_trait]
impl PageSurface for FsSurface {
    fn has_element(&self, element_id: &str) -> bool {
        self.elements.contains(element_id)
    }

    async fn set_status(&self, element_id: &str, message: &str) {
        info!(element = element_id, "{message}");
        *self.status.lock().await = Some(message.to_string());
    }

    async fn replace_document(&self, markup: &str) -> Result<()> {
        let path = self.write_output(PAGE_FILENAME, markup.as_bytes()).await?;
        info!(path = %path.display(), bytes = markup.len(), "document replaced");
        Ok(())
    }

    async fn scroll_to_top(&self) {
        debug!("viewport reset to top");
    }

    async fn create_object_url(&self, blob: Blob) -> Result<ObjectUrl> {
        let url = ObjectUrl::new(format!("blob:uploader/{}", Uuid::new_v4()));
        self.staged.lock().await.insert(url.clone(), blob);
        Ok(url)
    }

    async fn append_anchor(&self, anchor: &DownloadAnchor) -> Result<()> {
        if !self.staged.lock().await.contains_key(&anchor.href) {
            bail!("anchor points at unknown object url {}", anchor.href);
        }
        self.anchors.lock().await.push(anchor.clone());
        Ok(())
    }

    async fn click_anchor(&self, anchor: &DownloadAnchor) -> Result<()> {
        if !self.anchors.lock().await.contains(anchor) {
            bail!("anchor for {} is not attached to the page", anchor.download);
        }
        let blob = self
            .staged
            .lock()
            .await
            .get(&anchor.href)
            .cloned()
            .ok_or_else(|| anyhow!("object url {} was revoked", anchor.href))?;

        let path = self.write_output(&anchor.download, &blob.bytes).await?;
        info!(
            path = %path.display(),
            mime_type = %blob.mime_type,
            bytes = blob.bytes.len(),
            "download saved"
        );
        Ok(())
    }

    async fn remove_anchor(&self, anchor: &DownloadAnchor) {
        self.anchors.lock().await.retain(|attached| attached != anchor);
    }

    async fn revoke_object_url(&self, url: &ObjectUrl) {
        self.staged.lock().await.remove(url);
    }
}

#[cfg(test)]
#[path = "tests/surface_tests.rs"]
mod tests;
