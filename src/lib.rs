// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod analyze;
pub mod api;
pub mod auth;
pub mod config;
pub mod metrics;
pub mod retry;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{AnalysisOutcome, AnalysisService, FallbackReason};
pub use crate::api::{create_router, AppState};
