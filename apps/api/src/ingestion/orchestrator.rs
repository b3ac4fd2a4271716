//! Batch pipeline controller.
//!
//! One spawned task per job walks the job's files strictly in sequence:
//! extract text, run field heuristics, register the candidate, record the
//! outcome. Anything that goes wrong while handling a single file is caught
//! at the per-file boundary and becomes that file's `failed` status — the
//! caller-visible unit of failure is one resume, never the batch. Only
//! failures outside the loop (job unreadable, completion write) are fatal
//! to the job.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::ingestion::extract::extract_text;
use crate::ingestion::heuristics::{extract_email, extract_name, extract_phone};
use crate::ingestion::registrar::register_candidate;
use crate::ingestion::store::{self, FileOutcome};
use crate::models::job::{BulkUploadFileRow, BulkUploadJobRow, FileStatus, FileType};
use crate::notifications::{
    create_notification, TYPE_BULK_UPLOAD_COMPLETED, TYPE_BULK_UPLOAD_FAILED,
};
use crate::state::AppState;

pub const ERR_NO_EMAIL: &str = "No email found in resume";
pub const ERR_CANDIDATE_CREATE: &str = "Failed to create candidate profile";

/// Upper bound on stored parsed text, in characters.
pub const PARSED_TEXT_LIMIT: usize = 5_000;

/// Kicks off processing for a job after the intake response has been sent.
/// The task owns its own error reporting; the handle is intentionally not
/// awaited.
pub fn spawn_job(state: AppState, job_row_id: Uuid) {
    tokio::spawn(async move {
        run_job(&state, job_row_id).await;
    });
}

pub async fn run_job(state: &AppState, job_row_id: Uuid) {
    let job = match store::get_job(&state.db, job_row_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            error!("Bulk upload job {job_row_id} not found; nothing to process");
            return;
        }
        Err(e) => {
            error!("Failed to load bulk upload job {job_row_id}: {e:?}");
            // No row means no initiator to notify, but the terminal status
            // write can still be attempted so the job does not sit at
            // `processing` until the next restart sweep.
            if let Err(e2) =
                store::fail_job(&state.db, job_row_id, "Failed to load job record").await
            {
                error!("Failed to mark job {job_row_id} as failed: {e2:?}");
            }
            return;
        }
    };

    info!(
        "Starting bulk upload job {} ({} files)",
        job.job_id, job.total_files
    );

    if let Err(e) = process_job(state, &job).await {
        error!("Bulk upload job {} failed: {e:?}", job.job_id);
        if let Err(e2) = store::fail_job(&state.db, job.id, &e.to_string()).await {
            error!("Failed to mark job {} as failed: {e2:?}", job.job_id);
        }
        let message = format!("Bulk resume upload {} failed: {e}", job.job_id);
        if let Err(e2) = create_notification(
            &state.db,
            job.initiator_id,
            TYPE_BULK_UPLOAD_FAILED,
            "Bulk upload failed",
            &message,
            Some(job.id),
        )
        .await
        {
            error!("Failed to write failure notification for {}: {e2:?}", job.job_id);
        }
    }
}

async fn process_job(state: &AppState, job: &BulkUploadJobRow) -> Result<()> {
    let files = store::files_for_job(&state.db, job.id)
        .await
        .context("Failed to load file rows")?;

    for file in &files {
        if let Err(e) = process_file(state, file).await {
            warn!(
                "File {} in job {} failed: {e:#}",
                file.original_filename, job.job_id
            );
            let message = e.to_string();
            if let Err(e2) =
                store::mark_file_terminal(&state.db, file.id, FileOutcome::failed(&message)).await
            {
                // The file row stays non-terminal; the startup sweep
                // reconciles it. Sibling files keep going.
                error!(
                    "Failed to record failure for file {}: {e2:?}",
                    file.original_filename
                );
            }
        }
    }

    store::complete_job(&state.db, job.id)
        .await
        .context("Failed to mark job completed")?;

    let finished = store::get_job(&state.db, job.id)
        .await?
        .context("Job row disappeared after completion")?;
    info!(
        "Bulk upload job {} completed: {} processed, {} successful, {} failed",
        finished.job_id,
        finished.processed_files,
        finished.successful_files,
        finished.failed_files
    );

    let message = format!(
        "Bulk resume upload {} completed: {} files processed, {} successful, {} failed.",
        finished.job_id,
        finished.processed_files,
        finished.successful_files,
        finished.failed_files
    );
    if let Err(e) = create_notification(
        &state.db,
        finished.initiator_id,
        TYPE_BULK_UPLOAD_COMPLETED,
        "Bulk upload completed",
        &message,
        Some(finished.id),
    )
    .await
    {
        // Logged, never retried; processing is already done.
        error!("Failed to write completion notification for {}: {e:?}", finished.job_id);
    }

    Ok(())
}

/// One file through the extract → heuristics → registrar chain. Errors
/// returned here are converted to a `failed` file status by the caller.
async fn process_file(state: &AppState, file: &BulkUploadFileRow) -> Result<()> {
    store::mark_file_processing(&state.db, file.id).await?;

    let file_type = FileType::from_db(&file.file_type)
        .with_context(|| format!("Unknown file type '{}'", file.file_type))?;
    let path = Path::new(&state.config.upload_dir).join(&file.stored_filename);
    let text = extract_text(&path, file_type).await;

    let name = extract_name(&text);
    let email = extract_email(&text);
    let phone = extract_phone(&text);
    let parsed_text = truncate_text(&text, PARSED_TEXT_LIMIT);

    let outcome = match &email {
        Some(email) => {
            match register_candidate(&state.db, email, name.as_deref(), phone.as_deref()).await {
                Ok(candidate_id) => FileOutcome {
                    status: FileStatus::Success,
                    candidate_id: Some(candidate_id),
                    error_message: None,
                    parsed_text: parsed_text.as_deref(),
                    extracted_name: name.as_deref(),
                    extracted_email: Some(email.as_str()),
                    extracted_phone: phone.as_deref(),
                },
                Err(e) => {
                    warn!(
                        "Registrar failed for {} ({email}): {e:?}",
                        file.original_filename
                    );
                    FileOutcome {
                        status: FileStatus::Failed,
                        candidate_id: None,
                        error_message: Some(ERR_CANDIDATE_CREATE),
                        parsed_text: parsed_text.as_deref(),
                        extracted_name: name.as_deref(),
                        extracted_email: Some(email.as_str()),
                        extracted_phone: phone.as_deref(),
                    }
                }
            }
        }
        None => FileOutcome {
            status: FileStatus::Failed,
            candidate_id: None,
            error_message: Some(ERR_NO_EMAIL),
            parsed_text: parsed_text.as_deref(),
            extracted_name: name.as_deref(),
            extracted_email: None,
            extracted_phone: phone.as_deref(),
        },
    };

    store::mark_file_terminal(&state.db, file.id, outcome).await?;
    Ok(())
}

/// Char-boundary-safe truncation; `None` for empty text.
fn truncate_text(text: &str, limit: usize) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(limit).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_empty_is_none() {
        assert_eq!(truncate_text("", 10), None);
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_text("hello", 10), Some("hello".to_string()));
    }

    #[test]
    fn test_truncate_at_limit() {
        let text = "a".repeat(6_000);
        let truncated = truncate_text(&text, PARSED_TEXT_LIMIT).unwrap();
        assert_eq!(truncated.chars().count(), PARSED_TEXT_LIMIT);
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "é".repeat(20);
        let truncated = truncate_text(&text, 10).unwrap();
        assert_eq!(truncated.chars().count(), 10);
        assert_eq!(truncated, "é".repeat(10));
    }
}
