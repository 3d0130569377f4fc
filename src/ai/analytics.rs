//! Aggregate statistics over a user's mood history.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::storage::{MoodEntry, MoodStore, NewMoodEntry, UserId};
use serde::Serialize;

/// Derived summary of recent mood entries. Never persisted; recomputed
/// per request from the stored history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodSummary {
    /// Mean intensity over the considered entries, one decimal place.
    pub average_intensity: f64,
    /// Most frequent category; ties go to the one seen most recently.
    pub dominant_mood: String,
    pub total_entries: usize,
    /// Mean intensity over the newest entries only, full precision —
    /// rounding for display is the UI's job.
    pub recent_trend: f64,
}

pub struct MoodAnalytics {
    store: MoodStore,
    mood_window: usize,
    trend_window: usize,
}

impl MoodAnalytics {
    pub fn new(store: MoodStore, config: &EngineConfig) -> Self {
        Self {
            store,
            mood_window: config.mood_window,
            trend_window: config.trend_window,
        }
    }

    /// Record a mood entry. Write path: absent user fails hard. The
    /// intensity is stored verbatim — the 1–10 scale is a UI convention,
    /// not a constraint enforced here.
    pub async fn log_mood(
        &self,
        user: Option<&UserId>,
        entry: NewMoodEntry,
    ) -> Result<MoodEntry, EngineError> {
        let user = user.ok_or(EngineError::NotAuthenticated)?;
        self.store.insert(user, entry).await
    }

    /// Recent entries, newest first. Reads degrade to empty without a user.
    pub async fn mood_history(
        &self,
        user: Option<&UserId>,
        limit: usize,
    ) -> Result<Vec<MoodEntry>, EngineError> {
        let Some(user) = user else {
            return Ok(Vec::new());
        };
        self.store.recent_for_user(user, limit as i64).await
    }

    /// Summarize the most recent entries. `None` when the user is absent
    /// or has no history — no data is not an error.
    pub async fn summarize(
        &self,
        user: Option<&UserId>,
    ) -> Result<Option<MoodSummary>, EngineError> {
        let Some(user) = user else {
            return Ok(None);
        };
        let entries = self
            .store
            .recent_for_user(user, self.mood_window as i64)
            .await?;
        Ok(summarize_entries(&entries, self.trend_window))
    }
}

/// Pure aggregation over an already-fetched newest-first slice.
fn summarize_entries(entries: &[MoodEntry], trend_window: usize) -> Option<MoodSummary> {
    if entries.is_empty() {
        return None;
    }

    let total = entries.len();
    let average = entries.iter().map(|e| e.intensity).sum::<f64>() / total as f64;

    // Count categories, remembering first-seen position. Iteration is
    // newest first, so a tie resolves toward the more recent mood.
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for entry in entries {
        match counts.iter().position(|(mood, _)| *mood == entry.mood) {
            Some(i) => counts[i].1 += 1,
            None => counts.push((entry.mood.as_str(), 1)),
        }
    }
    let mut dominant = counts[0];
    for candidate in &counts[1..] {
        if candidate.1 > dominant.1 {
            dominant = *candidate;
        }
    }

    let trend_n = trend_window.min(total);
    let recent_trend = entries[..trend_n].iter().map(|e| e.intensity).sum::<f64>() / trend_n as f64;

    Some(MoodSummary {
        average_intensity: (average * 10.0).round() / 10.0,
        dominant_mood: dominant.0.to_string(),
        total_entries: total,
        recent_trend,
    })
}
