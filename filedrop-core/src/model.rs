use crate::{FileDropError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard upload limit: 20 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const UPLOAD_KEY_PREFIX: &str = "uploads";

/// Metadata persisted for one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub file_id: String,
    pub filename: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub sha256: String,
    pub s3_key: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Listing projection of a [`FileRecord`]; leaves out storage internals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub file_id: String,
    pub filename: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&FileRecord> for FileSummary {
    fn from(record: &FileRecord) -> Self {
        Self {
            file_id: record.file_id.clone(),
            filename: record.filename.clone(),
            size_bytes: record.size_bytes,
            uploaded_at: record.uploaded_at,
        }
    }
}

/// Blob key for a file id, e.g. `uploads/{file_id}`.
pub fn blob_key(file_id: &str) -> String {
    format!("{}/{}", UPLOAD_KEY_PREFIX, file_id)
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
///
/// Rejects names that are blank; surrounding whitespace is replaced like any
/// other character.
pub fn sanitize_filename(filename: &str) -> Result<String> {
    if filename.trim().is_empty() {
        return Err(FileDropError::InvalidRequest(
            "filename cannot be empty".to_string(),
        ));
    }

    Ok(filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect())
}

/// Declared content type, or the generic binary type when absent or blank.
pub fn effective_content_type(declared: Option<&str>) -> String {
    declared
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_safe_names() {
        assert_eq!(sanitize_filename("test.txt").unwrap(), "test.txt");
        assert_eq!(
            sanitize_filename("report_v2-final.tar.gz").unwrap(),
            "report_v2-final.tar.gz"
        );
    }

    #[test]
    fn test_sanitize_replaces_unsafe_chars() {
        assert_eq!(
            sanitize_filename("my report (1).pdf").unwrap(),
            "my_report__1_.pdf"
        );
        assert_eq!(sanitize_filename("../etc/passwd").unwrap(), ".._etc_passwd");
        assert_eq!(sanitize_filename("a\"b.txt").unwrap(), "a_b.txt");
        assert_eq!(sanitize_filename("résumé.doc").unwrap(), "r_sum_.doc");
    }

    #[test]
    fn test_sanitize_replaces_surrounding_whitespace() {
        assert_eq!(sanitize_filename(" test.txt ").unwrap(), "_test.txt_");
        assert_eq!(sanitize_filename("\tnotes.md").unwrap(), "_notes.md");
    }

    #[test]
    fn test_sanitize_rejects_blank() {
        assert!(matches!(
            sanitize_filename("   "),
            Err(FileDropError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_effective_content_type() {
        assert_eq!(effective_content_type(Some("text/plain")), "text/plain");
        assert_eq!(effective_content_type(Some("")), DEFAULT_CONTENT_TYPE);
        assert_eq!(effective_content_type(None), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = FileRecord {
            file_id: "abc".into(),
            filename: "a.txt".into(),
            size_bytes: 5,
            content_type: "text/plain".into(),
            sha256: "00".into(),
            s3_key: blob_key("abc"),
            uploaded_at: Utc::now(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["fileId"], "abc");
        assert_eq!(value["sizeBytes"], 5);
        assert_eq!(value["s3Key"], "uploads/abc");
        assert!(value.get("uploadedAt").is_some());

        let summary = serde_json::to_value(FileSummary::from(&record)).unwrap();
        assert!(summary.get("s3Key").is_none());
        assert!(summary.get("sha256").is_none());
    }
}
