//! Axum route handlers for the Bulk Upload API.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingestion::{intake, store};
use crate::models::job::BulkUploadFileRow;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InitiatorQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BulkUploadResponse {
    #[serde(rename = "jobId")]
    pub job_id: String,
    #[serde(rename = "totalFiles")]
    pub total_files: usize,
    pub message: String,
}

/// Per-file slice of the status response: name, outcome, and whatever the
/// heuristics managed to pull out.
#[derive(Debug, Serialize)]
pub struct FileStatusSummary {
    pub file_name: String,
    pub status: String,
    pub error_message: Option<String>,
    pub extracted_name: Option<String>,
    pub extracted_email: Option<String>,
    pub extracted_phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
    pub total_files: i32,
    pub processed_files: i32,
    pub successful_files: i32,
    pub failed_files: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub files: Vec<FileStatusSummary>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/bulk-resume-upload
///
/// Multipart intake of up to the configured batch limit of PDF/DOCX resumes.
/// Returns as soon as the batch is accepted; processing runs in a spawned
/// task and is observed through the status endpoint.
pub async fn handle_bulk_upload(
    State(state): State<AppState>,
    Query(params): Query<InitiatorQuery>,
    multipart: Multipart,
) -> Result<Json<BulkUploadResponse>, AppError> {
    let files = intake::collect_files(
        multipart,
        &state.config.upload_dir,
        state.config.max_files_per_batch,
        state.config.max_file_size_bytes,
    )
    .await?;
    let total_files = files.len();

    let job_id = intake::persist_and_enqueue(&state, params.user_id, files)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(BulkUploadResponse {
        job_id,
        total_files,
        message: format!("Upload accepted; {total_files} file(s) queued for processing"),
    }))
}

/// GET /api/v1/bulk-upload-jobs/:job_id/status
pub async fn handle_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, AppError> {
    let job = store::get_job_by_public_id(&state.db, &job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    let files = store::files_for_job(&state.db, job.id).await?;

    Ok(Json(JobStatusResponse {
        job_id: job.job_id,
        status: job.status,
        total_files: job.total_files,
        processed_files: job.processed_files,
        successful_files: job.successful_files,
        failed_files: job.failed_files,
        created_at: job.created_at,
        completed_at: job.completed_at,
        files: files
            .into_iter()
            .map(|f| FileStatusSummary {
                file_name: f.original_filename,
                status: f.status,
                error_message: f.error_message,
                extracted_name: f.extracted_name,
                extracted_email: f.extracted_email,
                extracted_phone: f.extracted_phone,
            })
            .collect(),
    }))
}

/// GET /api/v1/bulk-upload-jobs/:job_id/error-report
///
/// CSV export of the failed files. 404 when the job is unknown OR when it
/// has no failures — an empty report is never served.
pub async fn handle_error_report(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let job = store::get_job_by_public_id(&state.db, &job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    let failed = store::failed_files_for_job(&state.db, job.id).await?;
    if failed.is_empty() {
        return Err(AppError::NotFound(format!(
            "Job {job_id} has no failed files"
        )));
    }

    let csv = build_error_report_csv(&failed);
    let disposition = format!("attachment; filename=\"{job_id}_errors.csv\"");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

// ────────────────────────────────────────────────────────────────────────────
// CSV shaping
// ────────────────────────────────────────────────────────────────────────────

fn build_error_report_csv(failed: &[BulkUploadFileRow]) -> String {
    let mut csv = String::from("File Name,Error Message,File Size,File Type\n");
    for file in failed {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(&file.original_filename),
            csv_field(file.error_message.as_deref().unwrap_or("")),
            file.file_size,
            file.file_type,
        ));
    }
    csv
}

/// Quotes a field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn failed_file(name: &str, error: &str) -> BulkUploadFileRow {
        BulkUploadFileRow {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            stored_filename: format!("stored_{name}"),
            original_filename: name.to_string(),
            file_size: 2048,
            file_type: "pdf".to_string(),
            status: "failed".to_string(),
            candidate_id: None,
            error_message: Some(error.to_string()),
            parsed_text: None,
            extracted_name: None,
            extracted_email: None,
            extracted_phone: None,
            processed_at: None,
        }
    }

    #[test]
    fn test_csv_header_and_row() {
        let csv = build_error_report_csv(&[failed_file("a.pdf", "No email found in resume")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "File Name,Error Message,File Size,File Type");
        assert_eq!(lines[1], "a.pdf,No email found in resume,2048,pdf");
    }

    #[test]
    fn test_csv_quotes_commas() {
        let csv = build_error_report_csv(&[failed_file("a,b.pdf", "bad, very bad")]);
        assert!(csv.contains("\"a,b.pdf\",\"bad, very bad\",2048,pdf"));
    }

    #[test]
    fn test_csv_escapes_quotes() {
        assert_eq!(csv_field(r#"say "hi""#), r#""say ""hi""""#);
    }

    #[test]
    fn test_csv_plain_field_unquoted() {
        assert_eq!(csv_field("plain.pdf"), "plain.pdf");
    }

    #[test]
    fn test_csv_one_row_per_failed_file() {
        let files = vec![
            failed_file("a.pdf", "No email found in resume"),
            failed_file("b.docx", "Failed to create candidate profile"),
        ];
        let csv = build_error_report_csv(&files);
        assert_eq!(csv.lines().count(), 3);
    }
}
