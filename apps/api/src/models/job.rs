use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Aggregate tracking record for one bulk-upload batch.
/// `job_id` is the caller-visible identifier; `id` is the internal row key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BulkUploadJobRow {
    pub id: Uuid,
    pub job_id: String,
    pub initiator_id: Uuid,
    pub total_files: i32,
    pub processed_files: i32,
    pub successful_files: i32,
    pub failed_files: i32,
    pub status: String,
    pub error_report: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Per-uploaded-file tracking record within a job.
/// Mutated exactly twice by the orchestrator: `pending -> processing`,
/// then `processing -> success | failed`. Terminal states are never left.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BulkUploadFileRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub stored_filename: String,
    pub original_filename: String,
    pub file_size: i64,
    pub file_type: String,
    pub status: String,
    pub candidate_id: Option<Uuid>,
    pub error_message: Option<String>,
    pub parsed_text: Option<String>,
    pub extracted_name: Option<String>,
    pub extracted_email: Option<String>,
    pub extracted_phone: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Job lifecycle status. `failed` is reserved for catastrophic errors;
/// individual file failures never move a job out of `processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Processing => "processing",
            FileStatus::Success => "success",
            FileStatus::Failed => "failed",
        }
    }
}

/// Accepted resume formats. Detection requires BOTH the filename extension
/// and the declared content type to agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Docx,
}

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pdf" => Some(FileType::Pdf),
            "docx" => Some(FileType::Docx),
            _ => None,
        }
    }

    /// Detects the file type from the original filename and the declared MIME
    /// type. Returns `None` unless both point at the same accepted format.
    pub fn detect(filename: &str, content_type: &str) -> Option<Self> {
        let ext = filename.rsplit('.').next()?.to_lowercase();
        match (ext.as_str(), content_type) {
            ("pdf", PDF_MIME) => Some(FileType::Pdf),
            ("docx", DOCX_MIME) => Some(FileType::Docx),
            _ => None,
        }
    }
}
