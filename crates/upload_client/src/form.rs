use std::path::Path;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use shared::domain::{mime_type_for_filename, DocumentRole};

use crate::error::UploadError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    File(FilePart),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    fields: Vec<FormField>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: FieldValue::Text(value.into()),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        mime_type: Option<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: FieldValue::File(FilePart {
                filename: filename.into(),
                mime_type,
                bytes: bytes.into(),
            }),
        });
        self
    }

    pub async fn file_from_path(self, name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read upload file '{}'", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        let mime_type = mime_type_for_filename(&filename).to_string();
        Ok(self.file(name, filename, Some(mime_type), bytes))
    }

    /// The treaty / bordereaux / statement form posted by the discrepancy
    /// check page.
    pub async fn discrepancy_check(
        treaty: impl AsRef<Path>,
        bordereaux: impl AsRef<Path>,
        statement: impl AsRef<Path>,
    ) -> Result<Self> {
        Self::new()
            .file_from_path(DocumentRole::Treaty.field_name(), treaty)
            .await?
            .file_from_path(DocumentRole::Bordereaux.field_name(), bordereaux)
            .await?
            .file_from_path(DocumentRole::Statement.field_name(), statement)
            .await
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_multipart(self) -> Result<Form, UploadError> {
        let mut form = Form::new();
        for field in self.fields {
            form = match field.value {
                FieldValue::Text(value) => form.text(field.name, value),
                FieldValue::File(file) => {
                    let mut part = Part::bytes(file.bytes).file_name(file.filename);
                    if let Some(mime_type) = file.mime_type {
                        part = part.mime_str(&mime_type).map_err(|err| UploadError::Form {
                            name: field.name.clone(),
                            reason: err.to_string(),
                        })?;
                    }
                    form.part(field.name, part)
                }
            };
        }
        Ok(form)
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
