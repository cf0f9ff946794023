use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

pub const UPLOAD_PATH: &str = "/upload";
pub const DEFAULT_DOWNLOAD_FILENAME: &str = "discrepancy_report.pdf";
pub const DEFAULT_FORM_ID: &str = "uploadForm";
pub const DEFAULT_STATUS_ID: &str = "result";
pub const PROCESSING_MESSAGE: &str = "Processing...";
pub const COMPLETION_MESSAGE: &str = "Report downloaded successfully.";
pub const NOT_OK_MESSAGE: &str = "Network response was not ok";
pub const DOCUMENT_FAILURE_MESSAGE: &str = "An error occurred while processing the files.";

/// What a successful upload response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Page,
    Document,
}

/// How the client decides between [`ResponseKind`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    #[default]
    Negotiate,
    Page,
    Download,
}

impl ResponseMode {
    pub fn forced_kind(self) -> Option<ResponseKind> {
        match self {
            ResponseMode::Negotiate => None,
            ResponseMode::Page => Some(ResponseKind::Page),
            ResponseMode::Download => Some(ResponseKind::Document),
        }
    }
}

impl FromStr for ResponseMode {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "negotiate" | "auto" => Ok(ResponseMode::Negotiate),
            "page" | "page_replace" => Ok(ResponseMode::Page),
            "download" | "file_download" => Ok(ResponseMode::Download),
            _ => Err(UnknownVariant {
                kind: "response mode",
                value: value.to_string(),
                expected: "negotiate, page, download",
            }),
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResponseMode::Negotiate => "negotiate",
            ResponseMode::Page => "page",
            ResponseMode::Download => "download",
        })
    }
}

/// What happens when a submit arrives while an earlier one is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitPolicy {
    #[default]
    RejectWhileInFlight,
    Supersede,
}

impl FromStr for SubmitPolicy {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "reject_while_in_flight" | "reject" => Ok(SubmitPolicy::RejectWhileInFlight),
            "supersede" => Ok(SubmitPolicy::Supersede),
            _ => Err(UnknownVariant {
                kind: "submit policy",
                value: value.to_string(),
                expected: "reject_while_in_flight, supersede",
            }),
        }
    }
}

impl fmt::Display for SubmitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubmitPolicy::RejectWhileInFlight => "reject_while_in_flight",
            SubmitPolicy::Supersede => "supersede",
        })
    }
}

/// Decides from response headers whether a body is a page or a download.
///
/// An `attachment` disposition always wins. Textual content types render as a
/// page, anything else is treated as a document. A response without either
/// header is assumed to be a page.
pub fn classify_response(
    content_type: Option<&str>,
    content_disposition: Option<&str>,
) -> ResponseKind {
    if let Some(disposition) = content_disposition {
        if disposition_type(disposition).eq_ignore_ascii_case("attachment") {
            return ResponseKind::Document;
        }
    }

    let Some(content_type) = content_type else {
        return ResponseKind::Page;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence.is_empty() || essence.starts_with("text/") || essence == "application/xhtml+xml" {
        ResponseKind::Page
    } else {
        ResponseKind::Document
    }
}

fn disposition_type(disposition: &str) -> &str {
    disposition.split(';').next().unwrap_or_default().trim()
}

/// Filename suggested by a `Content-Disposition` header.
///
/// `filename*` (RFC 5987) takes precedence over `filename`. Directory parts
/// are stripped so the result is always a bare file name.
pub fn content_disposition_filename(disposition: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in split_params(disposition).into_iter().skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "filename*" => {
                // charset'language'percent-encoded
                let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
                extended = urlencoding::decode(encoded.trim_matches('"'))
                    .ok()
                    .map(|name| name.into_owned());
            }
            "filename" => plain = Some(value.trim_matches('"').to_string()),
            _ => {}
        }
    }

    extended.or(plain).and_then(|name| bare_filename(&name))
}

fn bare_filename(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

/// Splits header parameters on `;`, leaving separators inside quoted strings
/// alone.
fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (idx, ch) in header.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(&header[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    params.push(&header[start..]);
    params
}
