//! Candidate dedup/create keyed on extracted email.
//!
//! Re-importing the same resume is idempotent: an existing active candidate
//! is reused without mutation. New candidates get the next sequential
//! human-readable identifier and a hashed placeholder password; they log in
//! later through the normal reset flow.

use anyhow::Result;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::candidate::CandidateRow;

const DEFAULT_PASSWORD: &str = "Welcome@123";

/// Returns the row key of the candidate for `email`, creating one if no
/// active candidate exists. Storage failures propagate to the caller, which
/// converts them into a per-file failure.
pub async fn register_candidate(
    pool: &PgPool,
    email: &str,
    name: Option<&str>,
    phone: Option<&str>,
) -> Result<Uuid> {
    if let Some(existing) = find_active_by_email(pool, email).await? {
        debug!("Reusing candidate {} for {email}", existing.candidate_id);
        return Ok(existing.id);
    }

    // Sequence allocation is concurrency-safe; a losing racer just leaves a
    // gap in the numbering.
    let suffix: i64 = sqlx::query_scalar("SELECT nextval('candidate_id_seq')")
        .fetch_one(pool)
        .await?;
    let candidate_id = format_candidate_id(suffix);

    let full_name = name
        .map(str::to_string)
        .unwrap_or_else(|| name_from_email(email));

    // The partial unique index on active emails arbitrates two jobs racing
    // the same not-yet-existing address: the loser's insert is a no-op and
    // the re-select below lands on the surviving row.
    let inserted: Option<Uuid> = sqlx::query_scalar(
        r#"
        INSERT INTO candidates
            (id, candidate_id, full_name, email, password_hash, phone, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, TRUE)
        ON CONFLICT (email) WHERE is_active DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&candidate_id)
    .bind(&full_name)
    .bind(email)
    .bind(default_password_hash())
    .bind(phone)
    .fetch_optional(pool)
    .await?;

    match inserted {
        Some(id) => {
            info!("Created candidate {candidate_id} for {email}");
            Ok(id)
        }
        None => find_active_by_email(pool, email)
            .await?
            .map(|row| row.id)
            .ok_or_else(|| anyhow::anyhow!("Candidate insert conflicted but no row found for {email}")),
    }
}

async fn find_active_by_email(pool: &PgPool, email: &str) -> Result<Option<CandidateRow>> {
    Ok(sqlx::query_as::<_, CandidateRow>(
        "SELECT * FROM candidates WHERE email = $1 AND is_active = TRUE",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?)
}

/// Human-readable identifier from a sequence value. Padding keeps the
/// common range fixed-width; past 99999 the suffix simply widens rather
/// than wrapping or colliding.
fn format_candidate_id(suffix: i64) -> String {
    format!("CAND-{suffix:05}")
}

fn name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

fn default_password_hash() -> String {
    Sha256::digest(DEFAULT_PASSWORD.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_id_padding() {
        assert_eq!(format_candidate_id(1), "CAND-00001");
        assert_eq!(format_candidate_id(42), "CAND-00042");
    }

    #[test]
    fn test_candidate_id_widens_past_padded_range() {
        // String ordering stops tracking numeric ordering here, which is
        // why the suffix comes from a sequence and never from a string max.
        assert_eq!(format_candidate_id(99_999), "CAND-99999");
        assert_eq!(format_candidate_id(100_000), "CAND-100000");
        assert_ne!(format_candidate_id(100_000), format_candidate_id(100_001));
    }

    #[test]
    fn test_name_falls_back_to_email_local_part() {
        assert_eq!(name_from_email("jane.doe@corp.io"), "jane.doe");
    }

    #[test]
    fn test_default_password_hash_is_stable_hex() {
        let hash = default_password_hash();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, default_password_hash());
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
