//! Candidate enumeration with context-appropriate base scores

use crate::core::config::EngineConfig;
use crate::evaluator::decision::{DecisionContext, ScoredAction};
use crate::evaluator::property::{score_purchase, score_skip};
use crate::evaluator::situation::SituationAnalysis;
use crate::game::{Action, ActionKind, GameState, TurnPhase};
use crate::opponent::OpponentState;
use crate::scoring::{find_trade_opportunities, score_skill};

const ROLL_SCORE: f32 = 0.8;
const PAY_RENT_SCORE: f32 = 0.9;
/// Skip when the property cannot be paid for at all
const FORCED_SKIP_SCORE: f32 = 0.6;

fn end_turn_score(phase: TurnPhase) -> f32 {
    match phase {
        TurnPhase::TurnEnd => 0.6,
        TurnPhase::Action => 0.35,
        TurnPhase::PropertyDecision => 0.15,
        TurnPhase::AwaitingRoll | TurnPhase::RentDue => 0.05,
    }
}

/// Enumerate every candidate the opponent may take right now
pub fn enumerate_candidates(
    opponent: &OpponentState,
    game: &GameState,
    analysis: &SituationAnalysis,
    context: &DecisionContext,
    config: &EngineConfig,
) -> Vec<ScoredAction> {
    let me = opponent.id;
    let mut candidates = vec![ScoredAction::new(
        Action::end_turn(me),
        end_turn_score(game.phase),
        "end the turn",
    )];

    let Some(player) = game.player(me) else {
        return candidates;
    };

    match game.phase {
        TurnPhase::AwaitingRoll => {
            candidates.push(ScoredAction::new(
                Action::new(me, ActionKind::RollDice),
                ROLL_SCORE,
                "roll to move",
            ));
        }
        TurnPhase::PropertyDecision => {
            if let Some(cell) = game.cell(player.position).filter(|c| c.is_purchasable()) {
                if cell.price <= player.cash {
                    let breakdown = score_purchase(opponent, game, analysis, cell);
                    candidates.push(ScoredAction::new(
                        Action::new(
                            me,
                            ActionKind::BuyProperty {
                                cell: cell.index,
                                price: cell.price,
                            },
                        ),
                        breakdown.final_score,
                        format!(
                            "buy {} for {:.0} (financial {:.2}, strategic {:.2})",
                            cell.name, cell.price, breakdown.financial, breakdown.strategic
                        ),
                    ));
                    candidates.push(ScoredAction::new(
                        Action::new(me, ActionKind::SkipPurchase { cell: cell.index }),
                        score_skip(opponent, analysis, cell),
                        format!("pass on {}", cell.name),
                    ));
                } else {
                    candidates.push(ScoredAction::new(
                        Action::new(me, ActionKind::SkipPurchase { cell: cell.index }),
                        FORCED_SKIP_SCORE,
                        format!("cannot afford {}", cell.name),
                    ));
                }
            }
        }
        TurnPhase::RentDue => {
            if let Some(rent) = game.rent_due.as_ref().filter(|r| r.payer == me) {
                candidates.push(ScoredAction::new(
                    Action::new(
                        me,
                        ActionKind::PayRent {
                            owner: rent.owner,
                            amount: rent.amount,
                        },
                    ),
                    PAY_RENT_SCORE,
                    format!("pay {:.0} rent", rent.amount),
                ));
            }
        }
        TurnPhase::Action | TurnPhase::TurnEnd => {}
    }

    if matches!(
        game.phase,
        TurnPhase::AwaitingRoll | TurnPhase::Action | TurnPhase::TurnEnd
    ) {
        for skill in &player.skills {
            if let Some(scored) = score_skill(skill, opponent, analysis) {
                candidates.push(
                    ScoredAction::new(
                        Action::new(
                            me,
                            ActionKind::UseSkill {
                                skill_id: skill.id.clone(),
                                target: scored.target,
                            },
                        ),
                        scored.score,
                        scored.reasoning,
                    )
                    .with_tags(skill.tags.clone()),
                );
            }
        }

        let trades = find_trade_opportunities(opponent, game, analysis);
        for trade in trades
            .into_iter()
            .filter(|t| t.value >= config.trade_threshold)
            .take(config.max_trade_candidates)
        {
            candidates.push(ScoredAction::new(
                Action::new(me, ActionKind::TradeRequest(trade.proposal)),
                trade.value,
                trade.reasoning,
            ));
        }
    }

    candidates.retain(|c| context.allows(c.action_type()));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PlayerId;
    use crate::evaluator::analyze_situation;
    use crate::game::{ActionType, BoardCell, PlayerSnapshot, RentDue, SkillState, SkillTag};
    use crate::opponent::{Difficulty, Personality};

    fn types(candidates: &[ScoredAction]) -> Vec<ActionType> {
        candidates.iter().map(|c| c.action_type()).collect()
    }

    fn run(game: &GameState, me: PlayerId, context: &DecisionContext) -> Vec<ScoredAction> {
        let config = EngineConfig::default();
        let state = OpponentState::new(me, "Me", Personality::default(), Difficulty::Normal, &config);
        let analysis = analyze_situation(game, me).expect("analysis");
        enumerate_candidates(&state, game, &analysis, context, &config)
    }

    #[test]
    fn test_awaiting_roll() {
        let me = PlayerId::new();
        let game = GameState::builder("g")
            .phase(TurnPhase::AwaitingRoll)
            .player(PlayerSnapshot::new(me, "Me", 1000.0))
            .board_len(10)
            .build();
        let found = types(&run(&game, me, &DecisionContext::default()));
        assert_eq!(found, vec![ActionType::EndTurn, ActionType::RollDice]);
    }

    #[test]
    fn test_property_decision_offers_buy_and_skip() {
        let me = PlayerId::new();
        let game = GameState::builder("g")
            .phase(TurnPhase::PropertyDecision)
            .player(PlayerSnapshot::new(me, "Me", 1000.0).at(3))
            .cell(BoardCell::property(3, "Lot", 200.0, vec![20.0]))
            .board_len(10)
            .build();
        let found = types(&run(&game, me, &DecisionContext::default()));
        assert!(found.contains(&ActionType::BuyProperty));
        assert!(found.contains(&ActionType::SkipPurchase));
    }

    #[test]
    fn test_rent_due_offers_payment() {
        let me = PlayerId::new();
        let owner = PlayerId::new();
        let game = GameState::builder("g")
            .phase(TurnPhase::RentDue)
            .player(PlayerSnapshot::new(me, "Me", 1000.0))
            .player(PlayerSnapshot::new(owner, "Owner", 1000.0))
            .rent_due(RentDue {
                payer: me,
                owner,
                cell: 4,
                amount: 120.0,
            })
            .board_len(10)
            .build();
        let found = run(&game, me, &DecisionContext::default());
        let pay = found
            .iter()
            .find(|c| c.action_type() == ActionType::PayRent)
            .expect("pay rent");
        assert_eq!(pay.score, PAY_RENT_SCORE);
    }

    #[test]
    fn test_skills_and_exclusions() {
        let me = PlayerId::new();
        let game = GameState::builder("g")
            .phase(TurnPhase::Action)
            .player(
                PlayerSnapshot::new(me, "Me", 1000.0)
                    .with_skill(SkillState::new("gust", "Gust", vec![SkillTag::Movement]))
                    .with_skill(SkillState::new("rest", "Rest", vec![]).with_cooldown(1)),
            )
            .board_len(10)
            .build();

        let found = types(&run(&game, me, &DecisionContext::default()));
        assert_eq!(found, vec![ActionType::EndTurn, ActionType::UseSkill]);

        let context = DecisionContext::default().excluding(ActionType::UseSkill);
        let found = types(&run(&game, me, &context));
        assert_eq!(found, vec![ActionType::EndTurn]);
    }
}
