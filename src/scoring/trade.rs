//! Trade opportunity scoring
//!
//! Two kinds of trades are proposed: buying the last cell of a colour group
//! from the rival holding it, and selling a stray cell for cash when
//! liquidity runs low.

use serde::{Deserialize, Serialize};

use crate::core::types::unit;
use crate::evaluator::situation::group_ownership;
use crate::evaluator::SituationAnalysis;
use crate::game::{GameState, TradeProposal};
use crate::opponent::OpponentState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    CompleteGroup,
    RaiseCash,
}

#[derive(Debug, Clone)]
pub struct TradeOpportunity {
    pub kind: TradeKind,
    pub proposal: TradeProposal,
    pub value: f32,
    pub reasoning: String,
}

/// All trade opportunities for the opponent, most valuable first
pub fn find_trade_opportunities(
    opponent: &OpponentState,
    game: &GameState,
    analysis: &SituationAnalysis,
) -> Vec<TradeOpportunity> {
    let me = opponent.id;
    let negotiation = &opponent.personality().negotiation;
    let cash = analysis.economics.cash;
    let groups = group_ownership(game);
    let mut found = Vec::new();

    for (name, group) in &groups {
        let mine = group.owned_by(me);
        if mine == 0 || mine + 1 != group.cells.len() {
            continue;
        }
        let Some((cell_index, holder)) = group
            .cells
            .iter()
            .zip(&group.owners)
            .find_map(|(c, o)| o.filter(|h| *h != me).map(|h| (*c, h)))
        else {
            continue;
        };
        let Some(cell) = game.cell(cell_index) else {
            continue;
        };

        // Fairer negotiators open closer to a generous premium
        let premium = 1.1 + negotiation.fairness * 0.2;
        let cash_offer = (cell.price * premium as f64).min(cash * 0.5);
        let affordable = cash_offer >= cell.price;
        let trust = opponent.memory.trust_in(holder);

        let value = unit(
            0.55 + (trust - 0.5) * 0.4
                + if affordable { 0.15 } else { -0.15 }
                + mine as f32 / group.cells.len() as f32 * 0.1,
        );
        found.push(TradeOpportunity {
            kind: TradeKind::CompleteGroup,
            proposal: TradeProposal {
                target: holder,
                offered_cells: Vec::new(),
                requested_cells: vec![cell_index],
                cash_offer,
            },
            value,
            reasoning: format!("offer {:.0} for {} to complete {}", cash_offer, cell.name, name),
        });
    }

    if analysis.economics.liquidity_ratio < 0.2 {
        // Sell the cheapest cell that is not part of a group we are building
        let stray = game
            .cells_owned_by(me)
            .filter(|c| {
                c.group
                    .as_ref()
                    .and_then(|g| groups.get(g))
                    .map(|g| g.owned_by(me) < 2)
                    .unwrap_or(true)
            })
            .min_by(|a, b| {
                a.price
                    .partial_cmp(&b.price)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        let buyer = analysis.players.iter().max_by(|a, b| {
            a.cash
                .partial_cmp(&b.cash)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if let (Some(cell), Some(buyer)) = (stray, buyer) {
            let asking = cell.price * 0.9;
            if buyer.cash >= asking {
                found.push(TradeOpportunity {
                    kind: TradeKind::RaiseCash,
                    proposal: TradeProposal {
                        target: buyer.id,
                        offered_cells: vec![cell.index],
                        requested_cells: Vec::new(),
                        cash_offer: -asking,
                    },
                    value: unit(0.4 + (0.2 - analysis.economics.liquidity_ratio) * 2.0),
                    reasoning: format!("sell {} to {} for {:.0}", cell.name, buyer.name, asking),
                });
            }
        }
    }

    found.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::types::PlayerId;
    use crate::evaluator::analyze_situation;
    use crate::game::{BoardCell, PlayerSnapshot};
    use crate::opponent::{Difficulty, Personality};

    fn opponent(id: PlayerId) -> OpponentState {
        OpponentState::new(
            id,
            "Me",
            Personality::default(),
            Difficulty::Normal,
            &EngineConfig::default(),
        )
    }

    #[test]
    fn test_completion_trade_targets_holder() {
        let me = PlayerId::new();
        let rival = PlayerId::new();
        let game = GameState::builder("g")
            .player(PlayerSnapshot::new(me, "Me", 2000.0).owning(&[1, 2]))
            .player(PlayerSnapshot::new(rival, "Rival", 2000.0).owning(&[3]))
            .cell(BoardCell::property(1, "J1", 200.0, vec![20.0]).in_group("jade"))
            .cell(BoardCell::property(2, "J2", 200.0, vec![20.0]).in_group("jade"))
            .cell(BoardCell::property(3, "J3", 240.0, vec![24.0]).in_group("jade"))
            .board_len(12)
            .build();
        let analysis = analyze_situation(&game, me).expect("analysis");

        let trades = find_trade_opportunities(&opponent(me), &game, &analysis);
        let best = trades.first().expect("a trade");
        assert_eq!(best.kind, TradeKind::CompleteGroup);
        assert_eq!(best.proposal.target, rival);
        assert_eq!(best.proposal.requested_cells, vec![3]);
        assert!(best.proposal.cash_offer >= 240.0);
    }

    #[test]
    fn test_low_liquidity_offers_sale() {
        let me = PlayerId::new();
        let rival = PlayerId::new();
        let game = GameState::builder("g")
            .player(PlayerSnapshot::new(me, "Me", 50.0).owning(&[1, 5]))
            .player(PlayerSnapshot::new(rival, "Rival", 3000.0))
            .cell(BoardCell::property(1, "Cheap", 200.0, vec![20.0]))
            .cell(BoardCell::property(5, "Dear", 600.0, vec![60.0]))
            .board_len(12)
            .build();
        let analysis = analyze_situation(&game, me).expect("analysis");

        let trades = find_trade_opportunities(&opponent(me), &game, &analysis);
        let sale = trades
            .iter()
            .find(|t| t.kind == TradeKind::RaiseCash)
            .expect("sale");
        assert_eq!(sale.proposal.offered_cells, vec![1]);
        assert!(sale.proposal.cash_offer < 0.0);
    }

    #[test]
    fn test_no_trades_without_openings() {
        let me = PlayerId::new();
        let game = GameState::builder("g")
            .player(PlayerSnapshot::new(me, "Me", 2000.0))
            .player(PlayerSnapshot::new(PlayerId::new(), "Rival", 2000.0))
            .board_len(12)
            .build();
        let analysis = analyze_situation(&game, me).expect("analysis");
        assert!(find_trade_opportunities(&opponent(me), &game, &analysis).is_empty());
    }
}
