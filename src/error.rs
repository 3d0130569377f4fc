//! Engine error taxonomy.
//!
//! The only failure a caller should ever surface to an end user is
//! `NotAuthenticated`. Generation problems are absorbed into fixed
//! fallback replies inside the orchestrator and never escape as errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A write path was invoked without an authenticated user attached.
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("config error: {0}")]
    Config(String),
}
