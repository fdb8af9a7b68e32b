// src/models/document.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'upload_files' table: object-storage metadata per uploaded
/// document. The bytes themselves live in object storage and are out of scope.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub id: i64,
    pub user_id: i64,
    /// The raw label the client sent, e.g. "12th Marksheet".
    pub document_type: String,
    /// Classified category, see `DocumentCategory`.
    pub category: String,
    pub file_url: String,
    pub file_name: String,
    pub file_key: String,
    pub file_size: i64,
    pub mime_type: String,
    pub verified: bool,
    pub rejected: bool,
    pub rejection_reason: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Fixed category set a document-type label is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentCategory {
    Aadhar,
    TenthMarksheet,
    TwelfthMarksheet,
    ProfilePhoto,
    Other,
}

impl DocumentCategory {
    /// Classifies a free-form document-type label by substring match.
    pub fn classify(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("aadhar") {
            DocumentCategory::Aadhar
        } else if label.contains("10th") || label.contains("marksheet10") {
            DocumentCategory::TenthMarksheet
        } else if label.contains("12th") || label.contains("marksheet12") {
            DocumentCategory::TwelfthMarksheet
        } else if label.contains("photo") {
            DocumentCategory::ProfilePhoto
        } else {
            DocumentCategory::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Aadhar => "aadhar",
            DocumentCategory::TenthMarksheet => "10th_marksheet",
            DocumentCategory::TwelfthMarksheet => "12th_marksheet",
            DocumentCategory::ProfilePhoto => "profile_pic",
            DocumentCategory::Other => "other",
        }
    }
}

/// DTO for registering an uploaded document's metadata.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterDocumentRequest {
    #[validate(length(min = 1, max = 100))]
    pub document_type: String,
    #[validate(url)]
    pub file_url: String,
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(length(min = 1, max = 512))]
    pub file_key: String,
    #[validate(range(min = 1))]
    pub file_size: i64,
    #[validate(length(min = 1, max = 100))]
    pub mime_type: String,
}

/// DTO for rejecting a document during review.
#[derive(Debug, Deserialize, Validate)]
pub struct RejectDocumentRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_labels() {
        assert_eq!(DocumentCategory::classify("Aadhar Card"), DocumentCategory::Aadhar);
        assert_eq!(
            DocumentCategory::classify("10th Marksheet"),
            DocumentCategory::TenthMarksheet
        );
        assert_eq!(
            DocumentCategory::classify("marksheet12"),
            DocumentCategory::TwelfthMarksheet
        );
        assert_eq!(
            DocumentCategory::classify("Profile Photo"),
            DocumentCategory::ProfilePhoto
        );
    }

    #[test]
    fn falls_back_to_other() {
        assert_eq!(
            DocumentCategory::classify("transfer certificate"),
            DocumentCategory::Other
        );
        assert_eq!(DocumentCategory::Other.as_str(), "other");
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(DocumentCategory::classify("AADHAR"), DocumentCategory::Aadhar);
        assert_eq!(
            DocumentCategory::classify("12TH MARKSHEET"),
            DocumentCategory::TwelfthMarksheet
        );
    }
}
