pub mod ai;
pub mod config;
pub mod error;
pub mod llm;
pub mod storage;
pub mod utils;

pub use ai::{ChatEngine, MoodAnalytics, MoodSummary, SentimentLexicon, SentimentScorer};
pub use config::EngineConfig;
pub use error::EngineError;
pub use llm::{LlmConfig, LlmProvider, LlmService};
pub use storage::{
    connect, MoodEntry, MoodStore, NewMoodEntry, NewTurn, Turn, TurnStore, UserId,
};

/// Install the global tracing subscriber. Intended for the hosting shell;
/// safe to call more than once (later calls are no-ops).
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}
