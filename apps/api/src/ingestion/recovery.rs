//! Startup reconciliation for work stranded by a process restart.
//!
//! A restart mid-batch leaves file rows at `processing` (and their jobs at
//! `processing`) with no task driving them. Rather than silently retrying —
//! which would break file-status monotonicity — the sweep fails the stranded
//! rows explicitly, reconciles job counters from the file rows, and fails
//! the jobs. Runs before the server starts accepting requests.

use anyhow::Result;
use sqlx::PgPool;
use tracing::{info, warn};

pub const ERR_INTERRUPTED: &str = "Interrupted by service restart";

pub async fn recover_interrupted(pool: &PgPool) -> Result<()> {
    let files = sqlx::query(
        r#"
        UPDATE bulk_upload_files
        SET status = 'failed',
            error_message = $1,
            processed_at = COALESCE(processed_at, NOW())
        WHERE status IN ('pending', 'processing')
          AND job_id IN (SELECT id FROM bulk_upload_jobs WHERE status = 'processing')
        "#,
    )
    .bind(ERR_INTERRUPTED)
    .execute(pool)
    .await?;

    let jobs = sqlx::query(
        r#"
        UPDATE bulk_upload_jobs j
        SET status = 'failed',
            error_report = $1,
            completed_at = NOW(),
            processed_files = c.successful + c.failed,
            successful_files = c.successful,
            failed_files = c.failed
        FROM (
            SELECT j2.id,
                   COUNT(f.id) FILTER (WHERE f.status = 'success')::int AS successful,
                   COUNT(f.id) FILTER (WHERE f.status = 'failed')::int AS failed
            FROM bulk_upload_jobs j2
            LEFT JOIN bulk_upload_files f ON f.job_id = j2.id
            WHERE j2.status = 'processing'
            GROUP BY j2.id
        ) c
        WHERE j.id = c.id
        "#,
    )
    .bind(ERR_INTERRUPTED)
    .execute(pool)
    .await?;

    if jobs.rows_affected() > 0 {
        warn!(
            "Recovery sweep failed {} interrupted job(s) and {} stranded file(s)",
            jobs.rows_affected(),
            files.rows_affected()
        );
    } else {
        info!("Recovery sweep found no interrupted jobs");
    }

    Ok(())
}
