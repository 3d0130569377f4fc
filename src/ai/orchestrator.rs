//! Turn processing: accept a user message, score it, assemble context,
//! call the generation provider, persist the exchange.
//!
//! The submit path only enqueues. The pipeline itself runs on a
//! background task and its result becomes visible to readers once the
//! turn row is written — callers poll the store, they do not get the
//! reply back from the request. Turns within one session are not
//! serialized; reads order by creation time.

use crate::ai::context::ContextWindowBuilder;
use crate::ai::prompts;
use crate::ai::sentiment::SentimentScorer;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::llm::provider::{LlmParams, Message};
use crate::llm::service::LlmService;
use crate::storage::{NewTurn, Turn, TurnStore, UserId};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Incoming user message, as handed over by the shell.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    pub session_id: String,
    /// Present when the message text came out of a transcription step.
    pub audio_transcript: Option<String>,
}

// ── Generation Outcome ─────────────────────────────────────

/// Reply shown when the provider succeeded but returned nothing usable.
pub const EMPTY_REPLY_FALLBACK: &str =
    "I'm here to listen and support you. Could you tell me more about how you're feeling?";

/// Reply shown when the provider call itself failed.
pub const FAILED_CALL_FALLBACK: &str = "I'm here to support you. Sometimes I have trouble finding the right words, but I want you to know that your feelings are valid and you're not alone.";

/// Outcome of one generation call. Kept tagged until the orchestration
/// boundary so telemetry can tell an empty reply from a failed call —
/// the user-visible text differs only by which fallback is chosen, the
/// logs must not.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Reply(String),
    Empty,
    Failed(String),
}

impl GenerationOutcome {
    fn from_call(result: Result<String, String>) -> Self {
        match result {
            Ok(text) if text.trim().is_empty() => GenerationOutcome::Empty,
            Ok(text) => GenerationOutcome::Reply(text),
            Err(err) => GenerationOutcome::Failed(err),
        }
    }

    /// Resolve to user-visible reply text. A raw error never reaches the
    /// user; both failure branches map to fixed supportive fallbacks.
    pub fn resolve(self) -> String {
        match self {
            GenerationOutcome::Reply(text) => text,
            GenerationOutcome::Empty => {
                info!("[Chat] Generation returned no usable text, using listening fallback");
                EMPTY_REPLY_FALLBACK.to_string()
            }
            GenerationOutcome::Failed(err) => {
                warn!("[Chat] Generation call failed: {}", err);
                FAILED_CALL_FALLBACK.to_string()
            }
        }
    }
}

// ── Turn Queue ─────────────────────────────────────────────

/// Concurrency-limited queue for background turn processing.
///
/// Keeps a burst of submissions from stacking unbounded provider calls;
/// jobs past the limit wait for a permit instead of failing.
#[derive(Clone)]
pub struct TurnQueue {
    semaphore: Arc<Semaphore>,
}

impl TurnQueue {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Enqueue a processing task. The task executes once a semaphore
    /// permit is acquired, limiting concurrency to `max_concurrent`.
    pub fn enqueue<F, Fut>(&self, task: F) -> JoinHandle<Result<Turn, EngineError>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<Turn, EngineError>> + Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        tokio::spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|e| EngineError::Queue(e.to_string()))?;
            task().await
        })
    }

    /// Number of currently available permits (free slots).
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

// ── Chat Engine ────────────────────────────────────────────

/// The turn-processing facade: everything between "user typed a message"
/// and "a reply row exists".
#[derive(Clone)]
pub struct ChatEngine {
    turns: TurnStore,
    scorer: SentimentScorer,
    window: ContextWindowBuilder,
    llm: LlmService,
    queue: TurnQueue,
    config: EngineConfig,
}

impl ChatEngine {
    pub fn new(pool: SqlitePool, llm: LlmService, config: EngineConfig) -> Self {
        let turns = TurnStore::new(pool);
        let window = ContextWindowBuilder::new(turns.clone(), config.context_window);
        let queue = TurnQueue::new(config.max_concurrent_turns);
        Self {
            turns,
            scorer: SentimentScorer::default(),
            window,
            llm,
            queue,
            config,
        }
    }

    /// Replace the default sentiment lexicon/scorer.
    pub fn with_scorer(mut self, scorer: SentimentScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Accept a message and schedule the reply pipeline.
    ///
    /// Returns as soon as the job is enqueued; the persisted turn becomes
    /// visible to readers when the background task finishes. The returned
    /// handle is for shells and tests that want to await completion —
    /// dropping it does not cancel the job, and once generation starts the
    /// turn is persisted even if the submitting client is gone.
    ///
    /// Fails hard with `NotAuthenticated` when no user is attached: this
    /// is a write path.
    pub fn submit_message(
        &self,
        user: Option<&UserId>,
        request: SendMessageRequest,
    ) -> Result<JoinHandle<Result<Turn, EngineError>>, EngineError> {
        let user = user.cloned().ok_or(EngineError::NotAuthenticated)?;
        let engine = self.clone();
        Ok(self
            .queue
            .enqueue(move || async move { engine.run_pipeline(user, request).await }))
    }

    /// Run the full pipeline synchronously. Same authorization rule as
    /// `submit_message`; exposed for shells that want the reply in-line.
    pub async fn process_message(
        &self,
        user: Option<&UserId>,
        request: SendMessageRequest,
    ) -> Result<Turn, EngineError> {
        let user = user.cloned().ok_or(EngineError::NotAuthenticated)?;
        self.run_pipeline(user, request).await
    }

    /// Scored → ContextAssembled → Generated → Persisted.
    async fn run_pipeline(
        &self,
        user: UserId,
        request: SendMessageRequest,
    ) -> Result<Turn, EngineError> {
        // Scored: carried through the pipeline, persisted with the turn.
        let sentiment = self.scorer.score(&request.message);

        // ContextAssembled: bounded fetch, then replay the newest pairs
        // oldest-to-newest so the model reads history chronologically.
        let window = self.window.build(&request.session_id).await?;
        let history = prior_exchanges(&window, self.config.history_pairs);

        // Generated: the single slow, fallible step.
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(prompts::compose_system_prompt(&sentiment)));
        messages.extend(history);
        messages.push(Message::user(request.message.clone()));

        let params = LlmParams {
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
            ..Default::default()
        };
        let provider = self.llm.provider().await;
        let outcome = GenerationOutcome::from_call(provider.chat(messages, Some(params)).await);
        let response = outcome.resolve();

        // Persisted: the only durable side effect of the pipeline.
        self.turns
            .insert(NewTurn {
                user_id: user,
                session_id: request.session_id,
                message: request.message,
                response,
                sentiment,
                audio_transcript: request.audio_transcript,
            })
            .await
    }

    /// Recent turns, newest first. With a session id the read is scoped
    /// to that session, otherwise it spans all of the user's sessions.
    /// Reads degrade to empty when no user is attached.
    pub async fn conversation_history(
        &self,
        user: Option<&UserId>,
        session_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Turn>, EngineError> {
        let Some(user) = user else {
            return Ok(Vec::new());
        };
        match session_id {
            Some(session_id) => self.turns.recent_for_session(session_id, limit as i64).await,
            None => self.turns.recent_for_user(user, limit as i64).await,
        }
    }

    /// Free queue slots; surfaced for shell health reporting.
    pub fn available_permits(&self) -> usize {
        self.queue.available_permits()
    }
}

/// Mint a fresh session identifier for a new conversation. Sessions are
/// caller-owned; this is a convenience for shells that don't bring their
/// own scheme.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Project the newest `pairs` turns of a newest-first window into
/// chronological (user message, assistant reply) exchanges.
fn prior_exchanges(window: &[Turn], pairs: usize) -> Vec<Message> {
    window
        .iter()
        .take(pairs)
        .rev()
        .flat_map(|turn| {
            [
                Message::user(turn.message.clone()),
                Message::assistant(turn.response.clone()),
            ]
        })
        .collect()
}
