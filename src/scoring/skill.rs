//! Skill usage scoring

use crate::core::types::{unit, PlayerId};
use crate::evaluator::SituationAnalysis;
use crate::game::{SkillState, SkillTag};
use crate::opponent::OpponentState;

#[derive(Debug, Clone)]
pub struct SkillScore {
    pub score: f32,
    pub target: Option<PlayerId>,
    pub reasoning: String,
}

/// Situational base value of one tag
fn tag_value(tag: SkillTag, analysis: &SituationAnalysis) -> f32 {
    let strongest = analysis
        .strongest_rival()
        .map(|r| r.threat_level)
        .unwrap_or(0.0);
    let best_ally = analysis
        .players
        .iter()
        .map(|p| p.alliance_potential)
        .fold(0.0, f32::max);

    match tag {
        SkillTag::Offensive => 0.35 + strongest * 0.3,
        SkillTag::Defensive => 0.3 + analysis.max_threat_severity() * 0.5,
        SkillTag::Economic => 0.4 + (1.0 - analysis.economics.liquidity_ratio) * 0.3,
        SkillTag::Movement => 0.35,
        SkillTag::Control => 0.35 + strongest * 0.25,
        SkillTag::Social => 0.3 + best_ally * 0.3,
    }
}

/// Who a targeted skill should hit
fn pick_target(skill: &SkillState, analysis: &SituationAnalysis) -> Option<PlayerId> {
    if !skill.requires_target {
        return None;
    }
    if skill.has_tag(SkillTag::Social) && !skill.has_tag(SkillTag::Offensive) {
        analysis
            .players
            .iter()
            .max_by(|a, b| {
                a.alliance_potential
                    .partial_cmp(&b.alliance_potential)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|p| p.id)
    } else {
        analysis.strongest_rival().map(|p| p.id)
    }
}

/// Base score for using `skill` now, or `None` when it cannot be used
pub fn score_skill(
    skill: &SkillState,
    opponent: &OpponentState,
    analysis: &SituationAnalysis,
) -> Option<SkillScore> {
    if !skill.is_ready() || skill.cost > analysis.economics.cash {
        return None;
    }
    let target = pick_target(skill, analysis);
    if skill.requires_target && target.is_none() {
        return None;
    }

    let prefs = &opponent.personality().skills;
    let mut score = skill
        .tags
        .iter()
        .map(|tag| tag_value(*tag, analysis))
        .fold(0.3, f32::max);

    if skill.tags.iter().any(|t| prefs.preferred_tags.contains(t)) {
        score += 0.1;
    }
    score *= 0.7 + prefs.usage_frequency * 0.6;
    if prefs.save_for_critical && analysis.max_threat_severity() < 0.5 {
        score *= 0.7;
    }
    if analysis.economics.cash > 0.0 {
        score -= (skill.cost / analysis.economics.cash) as f32 * 0.2;
    }

    let reasoning = match target {
        Some(t) => format!("use {} on {}", skill.name, t),
        None => format!("use {}", skill.name),
    };
    Some(SkillScore {
        score: unit(score),
        target,
        reasoning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::evaluator::analyze_situation;
    use crate::game::{GameState, PlayerSnapshot};
    use crate::opponent::{Difficulty, Personality};

    fn setup(skill: SkillState) -> (OpponentState, SituationAnalysis, SkillState) {
        let me = PlayerId::new();
        let game = GameState::builder("g")
            .player(PlayerSnapshot::new(me, "Me", 1000.0).with_skill(skill.clone()))
            .player(PlayerSnapshot::new(PlayerId::new(), "Rival", 3000.0))
            .board_len(20)
            .build();
        let state = OpponentState::new(
            me,
            "Me",
            Personality::default(),
            Difficulty::Normal,
            &EngineConfig::default(),
        );
        let analysis = analyze_situation(&game, me).expect("analysis");
        (state, analysis, skill)
    }

    #[test]
    fn test_cooldown_blocks_skill() {
        let (state, analysis, skill) =
            setup(SkillState::new("s", "Storm", vec![SkillTag::Offensive]).with_cooldown(2));
        assert!(score_skill(&skill, &state, &analysis).is_none());
    }

    #[test]
    fn test_unaffordable_skill_is_skipped() {
        let (state, analysis, skill) =
            setup(SkillState::new("s", "Bribe", vec![SkillTag::Social]).with_cost(5000.0));
        assert!(score_skill(&skill, &state, &analysis).is_none());
    }

    #[test]
    fn test_targeted_skill_picks_strongest_rival() {
        let (state, analysis, skill) =
            setup(SkillState::new("s", "Curse", vec![SkillTag::Offensive]).targeted());
        let scored = score_skill(&skill, &state, &analysis).expect("usable");
        assert_eq!(scored.target, analysis.strongest_rival().map(|r| r.id));
        assert!((0.0..=1.0).contains(&scored.score));
    }
}
