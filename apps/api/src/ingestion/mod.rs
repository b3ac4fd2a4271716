//! Bulk resume ingestion pipeline: intake, extraction, field heuristics,
//! candidate registration, and per-job orchestration.

pub mod extract;
pub mod handlers;
pub mod heuristics;
pub mod intake;
pub mod orchestrator;
pub mod recovery;
pub mod registrar;
pub mod store;
