use serde::{Deserialize, Serialize};

/// The three documents a discrepancy check compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRole {
    Treaty,
    Bordereaux,
    Statement,
}

impl DocumentRole {
    pub const ALL: [DocumentRole; 3] = [
        DocumentRole::Treaty,
        DocumentRole::Bordereaux,
        DocumentRole::Statement,
    ];

    /// Multipart field name the upload endpoint reads this document from.
    pub fn field_name(self) -> &'static str {
        match self {
            DocumentRole::Treaty => "treaty",
            DocumentRole::Bordereaux => "bordereaux",
            DocumentRole::Statement => "statement",
        }
    }
}

/// Best-effort MIME type for an uploaded file, keyed on its extension.
pub fn mime_type_for_filename(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "csv" => "text/csv",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_match_upload_form() {
        let names: Vec<_> = DocumentRole::ALL.iter().map(|r| r.field_name()).collect();
        assert_eq!(names, ["treaty", "bordereaux", "statement"]);
    }

    #[test]
    fn infers_mime_type_case_insensitively() {
        assert_eq!(mime_type_for_filename("Treaty.PDF"), "application/pdf");
        assert_eq!(
            mime_type_for_filename("q3.bordereaux.xlsx"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(mime_type_for_filename("README"), "application/octet-stream");
    }
}
