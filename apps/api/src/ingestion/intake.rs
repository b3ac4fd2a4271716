//! Multipart intake for bulk resume uploads.
//!
//! Each file is validated and streamed straight to the upload directory as
//! the request body is drained, so intake memory stays bounded by one chunk
//! regardless of batch size. If any file invalidates the batch — one too
//! many, oversized, wrong type, empty — the request is rejected whole, the
//! staged files are removed, and no Job row is left behind. Intake success
//! only means the batch was accepted; processing is asynchronous.

use std::path::Path;

use anyhow::Result;
use axum::extract::multipart::Field;
use axum::extract::Multipart;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingestion::{orchestrator, store};
use crate::models::job::FileType;
use crate::state::AppState;

/// Multipart field name carrying the resume files.
pub const UPLOAD_FIELD: &str = "resumes";

/// One validated upload, already staged under the upload directory.
pub struct ValidatedUpload {
    pub original_filename: String,
    pub stored_filename: String,
    pub file_type: FileType,
    pub size: i64,
}

/// Drains the multipart stream, validating count, per-file size, and
/// extension + declared MIME type, staging each accepted file to
/// `upload_dir`. Any violation rejects the entire request and discards
/// whatever was already staged.
pub async fn collect_files(
    multipart: Multipart,
    upload_dir: &str,
    max_files: usize,
    max_file_size: usize,
) -> Result<Vec<ValidatedUpload>, AppError> {
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::Internal(
            anyhow::Error::new(e).context("Failed to create upload directory"),
        ))?;

    let mut files = Vec::new();
    match drain_multipart(multipart, upload_dir, max_files, max_file_size, &mut files).await {
        Ok(()) => Ok(files),
        Err(e) => {
            discard_staged(upload_dir, &files).await;
            Err(e)
        }
    }
}

async fn drain_multipart(
    mut multipart: Multipart,
    upload_dir: &str,
    max_files: usize,
    max_file_size: usize,
    files: &mut Vec<ValidatedUpload>,
) -> Result<(), AppError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        if files.len() >= max_files {
            return Err(AppError::Validation(format!(
                "Too many files: a batch is limited to {max_files} resumes"
            )));
        }

        let original_filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("File field is missing a filename".to_string()))?;
        let content_type = field.content_type().map(str::to_string).unwrap_or_default();

        let file_type = FileType::detect(&original_filename, &content_type).ok_or_else(|| {
            AppError::Validation(format!(
                "'{original_filename}': only .pdf and .docx resumes are accepted"
            ))
        })?;

        let stored_filename = format!(
            "{}_{}",
            Uuid::new_v4(),
            sanitize_filename(&original_filename)
        );
        let path = Path::new(upload_dir).join(&stored_filename);

        let size = match stage_field(&mut field, &path, &original_filename, max_file_size).await {
            Ok(size) => size,
            Err(e) => {
                // The partially written file is not in `files` yet.
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e);
            }
        };
        if size == 0 {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(AppError::Validation(format!(
                "'{original_filename}' is empty"
            )));
        }

        files.push(ValidatedUpload {
            original_filename,
            stored_filename,
            file_type,
            size,
        });
    }

    if files.is_empty() {
        return Err(AppError::Validation(format!(
            "No files found in multipart field '{UPLOAD_FIELD}'"
        )));
    }

    Ok(())
}

/// Streams one field to `path` chunk by chunk, enforcing the size cap as
/// bytes arrive so an oversized upload is cut off mid-stream instead of
/// accumulating in memory or on disk.
async fn stage_field(
    field: &mut Field<'_>,
    path: &Path,
    original_filename: &str,
    max_file_size: usize,
) -> Result<i64, AppError> {
    let mut out = tokio::fs::File::create(path).await.map_err(|e| {
        AppError::Internal(
            anyhow::Error::new(e).context(format!("Failed to stage '{original_filename}'")),
        )
    })?;

    let mut written: usize = 0;
    while let Some(chunk) = field.chunk().await? {
        written += chunk.len();
        if written > max_file_size {
            return Err(AppError::PayloadTooLarge(format!(
                "'{original_filename}' exceeds the per-file limit of {max_file_size} bytes"
            )));
        }
        out.write_all(&chunk).await.map_err(|e| {
            AppError::Internal(
                anyhow::Error::new(e).context(format!("Failed to stage '{original_filename}'")),
            )
        })?;
    }
    out.flush().await.map_err(|e| {
        AppError::Internal(
            anyhow::Error::new(e).context(format!("Failed to stage '{original_filename}'")),
        )
    })?;

    Ok(written as i64)
}

/// Best-effort removal of files staged for a batch that was then rejected.
async fn discard_staged(upload_dir: &str, files: &[ValidatedUpload]) {
    for file in files {
        let path = Path::new(upload_dir).join(&file.stored_filename);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove staged file {}: {e}", file.stored_filename);
        }
    }
}

/// Inserts the Job + File rows for an already-staged batch and spawns the
/// orchestrator. Returns the caller-visible job id.
pub async fn persist_and_enqueue(
    state: &AppState,
    initiator_id: Uuid,
    files: Vec<ValidatedUpload>,
) -> Result<String> {
    let job_id = new_job_id();
    let job = store::create_job(&state.db, &job_id, initiator_id, files.len() as i32).await?;

    for file in &files {
        let created = store::create_file(
            &state.db,
            job.id,
            &file.stored_filename,
            &file.original_filename,
            file.size,
            file.file_type,
        )
        .await;
        if let Err(e) = created {
            // A half-registered batch must not run; fail the job so the
            // caller sees a terminal state instead of a stuck `processing`.
            store::fail_job(&state.db, job.id, "Intake failed to register all files").await?;
            return Err(anyhow::Error::new(e).context("Failed to register file rows"));
        }
    }

    info!(
        "Accepted bulk upload {} with {} file(s) from {}",
        job_id,
        files.len(),
        initiator_id
    );
    orchestrator::spawn_job(state.clone(), job.id);

    Ok(job_id)
}

/// Caller-visible opaque job identifier.
fn new_job_id() -> String {
    let short = Uuid::new_v4().simple().to_string();
    format!("bulk_{}_{}", Utc::now().timestamp_millis(), &short[..8])
}

/// Keeps the stored name shell- and path-safe; the original name is
/// preserved verbatim in the file row.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{header, Request};

    const BOUNDARY: &str = "resume-batch-test";

    async fn multipart_with_files(specs: &[(&str, &[u8])]) -> Multipart {
        let mut body = Vec::new();
        for (filename, bytes) in specs {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; \
                     name=\"{UPLOAD_FIELD}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    fn staged_count(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_collect_stages_validated_files_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().to_str().unwrap();

        let multipart =
            multipart_with_files(&[("a.pdf", b"%PDF-1.4 aaa"), ("b.pdf", b"%PDF-1.4 bbbb")]).await;
        let files = collect_files(multipart, upload_dir, 10, 1024).await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].original_filename, "a.pdf");
        assert_eq!(files[0].size, 12);
        assert_eq!(files[1].size, 13);
        for file in &files {
            let staged = dir.path().join(&file.stored_filename);
            assert_eq!(std::fs::metadata(&staged).unwrap().len() as i64, file.size);
        }
    }

    #[tokio::test]
    async fn test_batch_over_file_count_limit_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().to_str().unwrap();

        let multipart = multipart_with_files(&[
            ("a.pdf", b"%PDF aaa"),
            ("b.pdf", b"%PDF bbb"),
            ("c.pdf", b"%PDF ccc"),
        ])
        .await;
        let result = collect_files(multipart, upload_dir, 2, 1024).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        // Nothing accepted: the files staged before the limit hit are gone.
        assert_eq!(staged_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_oversized_file_cut_off_mid_stream() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().to_str().unwrap();

        let big = vec![b'x'; 64 * 1024];
        let multipart = multipart_with_files(&[("ok.pdf", b"%PDF ok"), ("big.pdf", &big)]).await;
        let result = collect_files(multipart, upload_dir, 10, 1024).await;

        assert!(matches!(result, Err(AppError::PayloadTooLarge(_))));
        assert_eq!(staged_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().to_str().unwrap();

        let multipart = multipart_with_files(&[("empty.pdf", b"")]).await;
        let result = collect_files(multipart, upload_dir, 10, 1024).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(staged_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_unsupported_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().to_str().unwrap();

        let multipart = multipart_with_files(&[("notes.txt", b"plain text")]).await;
        let result = collect_files(multipart, upload_dir, 10, 1024).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(staged_count(dir.path()), 0);
    }

    #[test]
    fn test_sanitize_keeps_safe_chars() {
        assert_eq!(sanitize_filename("resume-v2_final.pdf"), "resume-v2_final.pdf");
    }

    #[test]
    fn test_sanitize_replaces_path_separators() {
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
    }

    #[test]
    fn test_sanitize_replaces_spaces_and_unicode() {
        assert_eq!(sanitize_filename("Jane Doe résumé.docx"), "Jane_Doe_r_sum_.docx");
    }

    #[test]
    fn test_job_id_shape() {
        let id = new_job_id();
        assert!(id.starts_with("bulk_"));
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(new_job_id(), new_job_id());
    }
}
