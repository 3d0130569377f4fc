pub mod analytics;
pub mod context;
pub mod orchestrator;
pub mod prompts;
pub mod sentiment;

#[cfg(test)]
mod tests;

pub use analytics::{MoodAnalytics, MoodSummary};
pub use context::ContextWindowBuilder;
pub use orchestrator::{
    new_session_id, ChatEngine, GenerationOutcome, SendMessageRequest, TurnQueue,
    EMPTY_REPLY_FALLBACK, FAILED_CALL_FALLBACK,
};
pub use sentiment::{Sentiment, SentimentLabel, SentimentLexicon, SentimentScorer};
