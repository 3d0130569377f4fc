//! Bounded conversation context for the reply generator.

use crate::error::EngineError;
use crate::storage::{Turn, TurnStore};

/// Fetches the most recent turns of a session as generation context.
/// Purely a bounded, ordered read — no transformation happens here.
#[derive(Clone)]
pub struct ContextWindowBuilder {
    store: TurnStore,
    max_turns: usize,
}

impl ContextWindowBuilder {
    pub fn new(store: TurnStore, max_turns: usize) -> Self {
        Self { store, max_turns }
    }

    /// Prior turns for a session, newest first. Never returns more than
    /// the configured bound; a session with no history yields an empty
    /// sequence.
    pub async fn build(&self, session_id: &str) -> Result<Vec<Turn>, EngineError> {
        self.store
            .recent_for_session(session_id, self.max_turns as i64)
            .await
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }
}
