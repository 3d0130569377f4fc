use crate::ai::sentiment::Sentiment;

pub const SUPPORT_PERSONA_PROMPT: &str = r#"You are a compassionate AI mental health support assistant. Your role is to:
- Provide empathetic, non-judgmental support
- Use active listening techniques
- Offer coping strategies and mindfulness exercises
- Encourage professional help when appropriate
- Never diagnose or provide medical advice
- Be warm, understanding, and supportive"#;

/// Full system prompt with the user's current sentiment interpolated.
pub fn compose_system_prompt(sentiment: &Sentiment) -> String {
    format!(
        "{}\n\nCurrent user sentiment: {} (confidence: {}%)\n\nRespond with empathy and provide helpful, therapeutic guidance.",
        SUPPORT_PERSONA_PROMPT,
        sentiment.label.as_str(),
        (sentiment.confidence * 100.0).round() as i64
    )
}
