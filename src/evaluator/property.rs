//! Property purchase scoring
//!
//! Five weighted sub-scores (financial, strategic, market, risk and
//! competition) are summed, then scaled by the game phase and the
//! opponent's mood. Each stage is clamped to the unit interval.

use crate::core::types::unit;
use crate::evaluator::situation::{GamePhase, SituationAnalysis};
use crate::game::{BoardCell, GameState};
use crate::opponent::strategy::StrategyFocus;
use crate::opponent::OpponentState;

const FINANCIAL_WEIGHT: f32 = 0.35;
const STRATEGIC_WEIGHT: f32 = 0.25;
const MARKET_WEIGHT: f32 = 0.20;
const RISK_WEIGHT: f32 = 0.10;
const COMPETITION_WEIGHT: f32 = 0.10;

/// Zodiac match between buyer and cell
const ZODIAC_BONUS: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PurchaseBreakdown {
    pub financial: f32,
    pub strategic: f32,
    pub market: f32,
    pub risk: f32,
    pub competition: f32,
    pub combined: f32,
    pub final_score: f32,
}

pub fn affordability_tier(price_ratio: f64) -> f32 {
    if price_ratio <= 0.2 {
        1.0
    } else if price_ratio <= 0.4 {
        0.8
    } else if price_ratio <= 0.6 {
        0.55
    } else if price_ratio <= 0.8 {
        0.3
    } else {
        0.1
    }
}

fn financial_score(opponent: &OpponentState, game: &GameState, cell: &BoardCell, cash: f64) -> f32 {
    if cash <= 0.0 || cell.price > cash {
        return 0.0;
    }
    let ratio = cell.price / cash;
    let affordability = affordability_tier(ratio);
    let roi = cell.base_rent() * game.market.rent_multiplier as f64 / cell.price.max(1.0);
    let roi_score = unit(roi as f32 * 5.0);
    let buffer = unit(((cash - cell.price) / cash) as f32 * 1.25);

    let mut score = affordability * 0.45 + roi_score * 0.35 + buffer * 0.2;
    if ratio as f32 > opponent.personality().property.max_price_ratio {
        score *= 0.7;
    }
    unit(score)
}

fn strategic_score(
    opponent: &OpponentState,
    game: &GameState,
    cell: &BoardCell,
    analysis: &SituationAnalysis,
) -> f32 {
    let roi = (cell.base_rent() / cell.price.max(1.0)) as f32;
    let score = match opponent.strategy.focus {
        StrategyFocus::WealthAccumulation => unit(roi * 6.0),
        StrategyFocus::PropertyMonopoly => match &cell.group {
            Some(group) => {
                let cells: Vec<&BoardCell> = game.group_cells(group).collect();
                let mine = cells.iter().filter(|c| c.owner == Some(opponent.id)).count();
                let blocked = cells
                    .iter()
                    .any(|c| c.owner.is_some() && c.owner != Some(opponent.id));
                if mine + 1 == cells.len() {
                    1.0
                } else if blocked {
                    0.35
                } else {
                    0.4 + 0.6 * (mine + 1) as f32 / cells.len().max(1) as f32
                }
            }
            None => 0.3,
        },
        StrategyFocus::OpponentElimination => {
            let rival_cash = analysis.players.iter().map(|p| p.cash).sum::<f64>()
                / analysis.players.len().max(1) as f64;
            unit((cell.max_rent() / rival_cash.max(1.0)) as f32 * 4.0).max(0.3)
        }
        StrategyFocus::RiskMinimization => 0.5,
        StrategyFocus::Opportunistic => 0.4 + 0.6 * (1.0 - game.ownership_ratio()),
    };

    let favored = cell
        .group
        .as_ref()
        .map(|g| opponent.personality().property.favored_groups.contains(g))
        .unwrap_or(false);
    unit(score + if favored { 0.15 } else { 0.0 })
}

fn market_score(opponent: &OpponentState, game: &GameState, cell: &BoardCell) -> f32 {
    let market = &game.market;
    let value_ratio = market.rent_multiplier / market.property_multiplier.max(0.01);
    let season = game.season.map(|s| s.market_bonus()).unwrap_or(0.0);
    let zodiac = match (cell.zodiac, game.player(opponent.id).and_then(|p| p.zodiac)) {
        (Some(a), Some(b)) if a == b => ZODIAC_BONUS,
        _ => 0.0,
    };
    unit(0.2 + unit(value_ratio * 0.5) * 0.3 + unit(market.economic_health) * 0.3 + season + zodiac)
}

fn risk_score(opponent: &OpponentState, game: &GameState, cell: &BoardCell, cash: f64) -> f32 {
    let position = game.player(opponent.id).map(|p| p.position).unwrap_or(0);
    let ahead: Vec<&BoardCell> = game.cells_ahead(position).collect();
    let hostile = ahead
        .iter()
        .filter(|c| c.owner.is_some() && c.owner != Some(opponent.id))
        .count();
    let exposure = hostile as f32 / ahead.len().max(1) as f32;
    let density = unit((cell.price / cash.max(1.0)) as f32);

    unit(
        (1.0 - exposure) * 0.4
            + (1.0 - density) * 0.3
            + opponent.personality().risk_tolerance * 0.3,
    )
}

fn competition_score(
    opponent: &OpponentState,
    game: &GameState,
    cell: &BoardCell,
    analysis: &SituationAnalysis,
) -> f32 {
    if analysis.players.is_empty() {
        return 1.0;
    }
    let affording = analysis
        .players
        .iter()
        .filter(|p| p.cash >= cell.price)
        .count();
    let mut score = 1.0 - affording as f32 / analysis.players.len() as f32 * 0.5;

    let strong_neighbour = analysis.players.iter().any(|p| {
        p.threat_level > 0.6
            && game.cells_owned_by(p.id).any(|c| {
                c.group.is_some() && c.group == cell.group
                    || c.index.abs_diff(cell.index) <= 3
            })
    });
    if strong_neighbour && cell.owner != Some(opponent.id) {
        score -= 0.2;
    }
    unit(score)
}

fn phase_multiplier(phase: GamePhase, focus: StrategyFocus) -> f32 {
    match phase {
        GamePhase::Early
            if matches!(
                focus,
                StrategyFocus::WealthAccumulation | StrategyFocus::PropertyMonopoly
            ) =>
        {
            1.1
        }
        GamePhase::Late | GamePhase::Endgame if focus != StrategyFocus::RiskMinimization => 0.9,
        _ => 1.0,
    }
}

/// Full purchase score for `cell`
pub fn score_purchase(
    opponent: &OpponentState,
    game: &GameState,
    analysis: &SituationAnalysis,
    cell: &BoardCell,
) -> PurchaseBreakdown {
    let cash = analysis.economics.cash;
    let financial = financial_score(opponent, game, cell, cash);
    let strategic = strategic_score(opponent, game, cell, analysis);
    let market = market_score(opponent, game, cell);
    let risk = risk_score(opponent, game, cell, cash);
    let competition = competition_score(opponent, game, cell, analysis);

    let combined = unit(
        financial * FINANCIAL_WEIGHT
            + strategic * STRATEGIC_WEIGHT
            + market * MARKET_WEIGHT
            + risk * RISK_WEIGHT
            + competition * COMPETITION_WEIGHT,
    );
    let phased = unit(combined * phase_multiplier(analysis.phase, opponent.strategy.focus));
    let final_score = unit(phased * opponent.emotion.mood.purchase_multiplier());

    PurchaseBreakdown {
        financial,
        strategic,
        market,
        risk,
        competition,
        combined,
        final_score,
    }
}

/// Base score for declining a purchase
pub fn score_skip(opponent: &OpponentState, analysis: &SituationAnalysis, cell: &BoardCell) -> f32 {
    let cash = analysis.economics.cash;
    let mut score = 0.25 + (1.0 - opponent.personality().risk_tolerance) * 0.2;
    if cash <= 0.0 || cell.price / cash > 0.6 {
        score += 0.3;
    }
    if analysis.economics.liquidity_ratio < 0.2 {
        score += 0.2;
    }
    unit(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::types::PlayerId;
    use crate::evaluator::analyze_situation;
    use crate::game::{PlayerSnapshot, TurnPhase};
    use crate::opponent::{Difficulty, Personality};

    fn scenario(risk_tolerance: f32, cash: f64, price: f64, rent: f64) -> (OpponentState, GameState) {
        let me = PlayerId::new();
        let game = GameState::builder("g")
            .phase(TurnPhase::PropertyDecision)
            .player(PlayerSnapshot::new(me, "Me", cash).at(5))
            .player(PlayerSnapshot::new(PlayerId::new(), "Rival", 1500.0))
            .cell(BoardCell::property(5, "Jade Palace", price, vec![rent, rent * 3.0]))
            .board_len(40)
            .build();
        let personality = Personality {
            risk_tolerance,
            ..Personality::default()
        };
        let state = OpponentState::new(
            me,
            "Me",
            personality,
            Difficulty::Normal,
            &EngineConfig::default(),
        );
        (state, game)
    }

    #[test]
    fn test_affordability_tiers() {
        assert_eq!(affordability_tier(0.1), 1.0);
        assert_eq!(affordability_tier(0.3), 0.8);
        assert_eq!(affordability_tier(0.5), 0.55);
        assert_eq!(affordability_tier(0.7), 0.3);
        assert_eq!(affordability_tier(0.95), 0.1);
    }

    #[test]
    fn test_cheap_high_rent_property_beats_skip() {
        let (state, game) = scenario(0.9, 15000.0, 3000.0, 400.0);
        let analysis = analyze_situation(&game, state.id).expect("analysis");
        let cell = game.cell(5).expect("cell");

        let buy = score_purchase(&state, &game, &analysis, cell);
        let skip = score_skip(&state, &analysis, cell);
        assert!(buy.final_score > skip + 0.2, "buy {:?} skip {}", buy, skip);
    }

    #[test]
    fn test_expensive_property_favours_skip() {
        let (state, game) = scenario(0.1, 1000.0, 900.0, 20.0);
        let analysis = analyze_situation(&game, state.id).expect("analysis");
        let cell = game.cell(5).expect("cell");

        let buy = score_purchase(&state, &game, &analysis, cell);
        let skip = score_skip(&state, &analysis, cell);
        assert!(skip > buy.final_score);
    }

    #[test]
    fn test_phase_multipliers() {
        assert_eq!(
            phase_multiplier(GamePhase::Early, StrategyFocus::WealthAccumulation),
            1.1
        );
        assert_eq!(
            phase_multiplier(GamePhase::Late, StrategyFocus::Opportunistic),
            0.9
        );
        assert_eq!(
            phase_multiplier(GamePhase::Endgame, StrategyFocus::RiskMinimization),
            1.0
        );
    }
}
