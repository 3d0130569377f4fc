//! User Sentiment Analysis — detect emotional valence from user messages.
//!
//! Uses keyword-stem matching (fast, no LLM call) to estimate the user's
//! emotional state before the reply pipeline runs. The score feeds the
//! generation prompt and is persisted on every turn, so mood analytics can
//! read it back later.

use serde::{Deserialize, Serialize};

/// Categorical summary of a continuous sentiment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

/// Score above which text reads positive; mirrored for negative. The dead
/// zone in between keeps near-balanced text from being forced either way.
const LABEL_THRESHOLD: f64 = 0.1;

/// Confidence reported when no stem matched at all: a fixed prior for
/// "no evidence", not certainty about neutrality.
const NO_EVIDENCE_CONFIDENCE: f64 = 0.5;

impl SentimentLabel {
    /// Labels are a pure function of score.
    pub fn from_score(score: f64) -> Self {
        if score > LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if score < -LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    /// Parse a stored label; anything unrecognized degrades to Neutral.
    pub fn parse(s: &str) -> Self {
        match s {
            "positive" => SentimentLabel::Positive,
            "negative" => SentimentLabel::Negative,
            _ => SentimentLabel::Neutral,
        }
    }
}

/// Detected sentiment for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// -1.0 = fully negative, 1.0 = fully positive.
    pub score: f64,
    pub label: SentimentLabel,
    /// 0.0 = guessing, 1.0 = unanimous lexical evidence.
    pub confidence: f64,
}

// ── Lexicon ────────────────────────────────────────────────

const POSITIVE_STEMS: &[&str] = &[
    "happy",
    "good",
    "great",
    "wonderful",
    "amazing",
    "love",
    "joy",
    "excited",
    "grateful",
    "peaceful",
];

const NEGATIVE_STEMS: &[&str] = &[
    "sad",
    "bad",
    "terrible",
    "awful",
    "hate",
    "angry",
    "depressed",
    "anxious",
    "worried",
    "stressed",
];

/// Positive/negative stem vocabularies. Immutable once constructed;
/// injected into the scorer so deployments and tests can substitute
/// their own word lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentLexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl Default for SentimentLexicon {
    fn default() -> Self {
        Self {
            positive: POSITIVE_STEMS.iter().map(|s| s.to_string()).collect(),
            negative: NEGATIVE_STEMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Pure lexical scorer. Stateless apart from its lexicon; the same input
/// always yields the same output.
#[derive(Debug, Clone, Default)]
pub struct SentimentScorer {
    lexicon: SentimentLexicon,
}

impl SentimentScorer {
    pub fn new(lexicon: SentimentLexicon) -> Self {
        Self { lexicon }
    }

    /// Score one utterance.
    ///
    /// Tokens are whitespace-split after lowercasing; a token matches a
    /// stem by substring containment ("loved" matches "love"). Each token
    /// adds at most 1 to each list's count no matter how many of that
    /// list's stems it contains, and the two counts are independent; one
    /// token may add to both.
    pub fn score(&self, text: &str) -> Sentiment {
        let lower = text.to_lowercase();

        let mut positive = 0usize;
        let mut negative = 0usize;
        for token in lower.split_whitespace() {
            if self.lexicon.positive.iter().any(|stem| token.contains(stem.as_str())) {
                positive += 1;
            }
            if self.lexicon.negative.iter().any(|stem| token.contains(stem.as_str())) {
                negative += 1;
            }
        }

        let matches = positive + negative;
        if matches == 0 {
            return Sentiment {
                score: 0.0,
                label: SentimentLabel::Neutral,
                confidence: NO_EVIDENCE_CONFIDENCE,
            };
        }

        let score = (positive as f64 - negative as f64) / matches as f64;
        Sentiment {
            score,
            label: SentimentLabel::from_score(score),
            confidence: score.abs(),
        }
    }
}
