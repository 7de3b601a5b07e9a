//! Templated reasoning strings

use crate::evaluator::decision::ScoredAction;
use crate::opponent::emotion::Mood;
use crate::opponent::strategy::Strategy;

pub fn mood_label(mood: Mood) -> &'static str {
    match mood {
        Mood::Neutral => "neutral",
        Mood::Confident => "confident",
        Mood::Excited => "excited",
        Mood::Cautious => "cautious",
        Mood::Frustrated => "frustrated",
        Mood::Aggressive => "aggressive",
    }
}

/// One-line explanation of the chosen candidate
pub fn decision_reasoning(
    chosen: &ScoredAction,
    strategy: &Strategy,
    mood: Mood,
    confidence: f32,
) -> String {
    format!(
        "{}: {} (score {:.2}, {} strategy, {} mood, confidence {:.2})",
        chosen.action_type(),
        chosen.reasoning,
        chosen.score,
        strategy.name(),
        mood_label(mood),
        confidence
    )
}

pub fn fallback_reasoning(reason: &str) -> String {
    format!("fallback: ending turn ({})", reason)
}
