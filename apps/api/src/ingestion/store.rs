//! SQL operations for bulk-upload job and file rows.
//!
//! Every operation is a single statement; there is no cross-record
//! transaction. The one place atomicity matters — recording a file's
//! terminal status together with the parent job's counter increments —
//! is a single CTE update, so a crash can never leave the counters
//! undercounting files already attempted.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::job::{BulkUploadFileRow, BulkUploadJobRow, FileStatus, FileType, JobStatus};

/// Extraction outputs recorded with a file's terminal transition.
pub struct FileOutcome<'a> {
    pub status: FileStatus,
    pub candidate_id: Option<Uuid>,
    pub error_message: Option<&'a str>,
    pub parsed_text: Option<&'a str>,
    pub extracted_name: Option<&'a str>,
    pub extracted_email: Option<&'a str>,
    pub extracted_phone: Option<&'a str>,
}

impl<'a> FileOutcome<'a> {
    pub fn failed(error_message: &'a str) -> Self {
        FileOutcome {
            status: FileStatus::Failed,
            candidate_id: None,
            error_message: Some(error_message),
            parsed_text: None,
            extracted_name: None,
            extracted_email: None,
            extracted_phone: None,
        }
    }
}

pub async fn create_job(
    pool: &PgPool,
    job_id: &str,
    initiator_id: Uuid,
    total_files: i32,
) -> Result<BulkUploadJobRow, sqlx::Error> {
    Ok(sqlx::query_as::<_, BulkUploadJobRow>(
        r#"
        INSERT INTO bulk_upload_jobs (id, job_id, initiator_id, total_files, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job_id)
    .bind(initiator_id)
    .bind(total_files)
    .bind(JobStatus::Processing.as_str())
    .fetch_one(pool)
    .await?)
}

pub async fn create_file(
    pool: &PgPool,
    job_row_id: Uuid,
    stored_filename: &str,
    original_filename: &str,
    file_size: i64,
    file_type: FileType,
) -> Result<Uuid, sqlx::Error> {
    Ok(sqlx::query_scalar(
        r#"
        INSERT INTO bulk_upload_files
            (id, job_id, stored_filename, original_filename, file_size, file_type, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job_row_id)
    .bind(stored_filename)
    .bind(original_filename)
    .bind(file_size)
    .bind(file_type.as_str())
    .bind(FileStatus::Pending.as_str())
    .fetch_one(pool)
    .await?)
}

pub async fn get_job(pool: &PgPool, job_row_id: Uuid) -> Result<Option<BulkUploadJobRow>, sqlx::Error> {
    Ok(
        sqlx::query_as::<_, BulkUploadJobRow>("SELECT * FROM bulk_upload_jobs WHERE id = $1")
            .bind(job_row_id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn get_job_by_public_id(
    pool: &PgPool,
    job_id: &str,
) -> Result<Option<BulkUploadJobRow>, sqlx::Error> {
    Ok(
        sqlx::query_as::<_, BulkUploadJobRow>("SELECT * FROM bulk_upload_jobs WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(pool)
            .await?,
    )
}

/// File rows in insertion order (`seq` is storage-assigned).
pub async fn files_for_job(pool: &PgPool, job_row_id: Uuid) -> Result<Vec<BulkUploadFileRow>, sqlx::Error> {
    Ok(sqlx::query_as::<_, BulkUploadFileRow>(
        "SELECT * FROM bulk_upload_files WHERE job_id = $1 ORDER BY seq",
    )
    .bind(job_row_id)
    .fetch_all(pool)
    .await?)
}

pub async fn failed_files_for_job(
    pool: &PgPool,
    job_row_id: Uuid,
) -> Result<Vec<BulkUploadFileRow>, sqlx::Error> {
    Ok(sqlx::query_as::<_, BulkUploadFileRow>(
        "SELECT * FROM bulk_upload_files WHERE job_id = $1 AND status = 'failed' ORDER BY seq",
    )
    .bind(job_row_id)
    .fetch_all(pool)
    .await?)
}

/// Transitions a pending file to `processing` and stamps `processed_at`.
/// The status guard keeps terminal rows monotonic even if the same file is
/// ever visited twice.
pub async fn mark_file_processing(pool: &PgPool, file_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE bulk_upload_files
        SET status = $2, processed_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(file_id)
    .bind(FileStatus::Processing.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Terminal file write + job counter increments in one statement, preserving
/// `processed == successful + failed` at every observation point. The guard
/// accepts `pending` as well as `processing`: a file whose processing
/// transition itself failed still gets its failure recorded, instead of
/// sitting at `pending` under a job that goes on to complete.
const MARK_FILE_TERMINAL_SQL: &str = r#"
    WITH finished AS (
        UPDATE bulk_upload_files
        SET status = $2,
            candidate_id = $3,
            error_message = $4,
            parsed_text = $5,
            extracted_name = $6,
            extracted_email = $7,
            extracted_phone = $8
        WHERE id = $1 AND status IN ('pending', 'processing')
        RETURNING job_id, status
    )
    UPDATE bulk_upload_jobs j
    SET processed_files = processed_files + 1,
        successful_files = successful_files
            + CASE WHEN f.status = 'success' THEN 1 ELSE 0 END,
        failed_files = failed_files
            + CASE WHEN f.status = 'failed' THEN 1 ELSE 0 END
    FROM finished f
    WHERE j.id = f.job_id
"#;

pub async fn mark_file_terminal(
    pool: &PgPool,
    file_id: Uuid,
    outcome: FileOutcome<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(MARK_FILE_TERMINAL_SQL)
        .bind(file_id)
        .bind(outcome.status.as_str())
        .bind(outcome.candidate_id)
        .bind(outcome.error_message)
        .bind(outcome.parsed_text)
        .bind(outcome.extracted_name)
        .bind(outcome.extracted_email)
        .bind(outcome.extracted_phone)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn complete_job(pool: &PgPool, job_row_id: Uuid) -> Result<(), sqlx::Error> {
    set_job_terminal(pool, job_row_id, JobStatus::Completed, None).await
}

pub async fn fail_job(pool: &PgPool, job_row_id: Uuid, error: &str) -> Result<(), sqlx::Error> {
    set_job_terminal(pool, job_row_id, JobStatus::Failed, Some(error)).await
}

/// Jobs only leave `processing`; a terminal status is never overwritten.
const SET_JOB_TERMINAL_SQL: &str = r#"
    UPDATE bulk_upload_jobs
    SET status = $2, error_report = COALESCE($3, error_report), completed_at = NOW()
    WHERE id = $1 AND status = 'processing'
"#;

async fn set_job_terminal(
    pool: &PgPool,
    job_row_id: Uuid,
    status: JobStatus,
    error: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(SET_JOB_TERMINAL_SQL)
        .bind(job_row_id)
        .bind(status.as_str())
        .bind(error)
        .execute(pool)
        .await?;
    Ok(())
}
