//! Situation analysis: phase, standings, economics, threats, opportunities
//!
//! Derived once per (game, turn, opponent) and shared read-only between the
//! evaluator, the tree optimizer and the state store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, RivalError};
use crate::core::types::{now_millis, unit, PlayerId, Timestamp};
use crate::game::GameState;

/// Game length assumed when the snapshot carries no round limit
pub const DEFAULT_MAX_ROUNDS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Early,
    Mid,
    Late,
    Endgame,
}

impl GamePhase {
    pub const ALL: [GamePhase; 4] = [
        GamePhase::Early,
        GamePhase::Mid,
        GamePhase::Late,
        GamePhase::Endgame,
    ];

    /// Numeric code used by tree conditions
    pub fn code(&self) -> f32 {
        match self {
            GamePhase::Early => 0.0,
            GamePhase::Mid => 1.0,
            GamePhase::Late => 2.0,
            GamePhase::Endgame => 3.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GamePhase::Early => "early",
            GamePhase::Mid => "mid",
            GamePhase::Late => "late",
            GamePhase::Endgame => "endgame",
        }
    }

    /// Classify by the larger of round progress and board saturation
    pub fn classify(round: u32, max_rounds: u32, ownership_ratio: f32) -> Self {
        let round_progress = round as f32 / max_rounds.max(1) as f32;
        let progress = round_progress.max(ownership_ratio * 0.9);
        if progress < 0.25 {
            GamePhase::Early
        } else if progress < 0.6 {
            GamePhase::Mid
        } else if progress < 0.85 {
            GamePhase::Late
        } else {
            GamePhase::Endgame
        }
    }
}

/// How the opponent sees one rival
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerAssessment {
    pub id: PlayerId,
    pub name: String,
    /// 1-based rank by net worth among all active players
    pub rank: usize,
    pub cash: f64,
    pub net_worth: f64,
    pub threat_level: f32,
    pub alliance_potential: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomicMetrics {
    pub cash: f64,
    pub net_worth: f64,
    /// Cash over net worth
    pub liquidity_ratio: f32,
    /// 1-based rank by cash
    pub money_rank: usize,
    /// 1-based rank by number of properties
    pub property_rank: usize,
    pub property_count: usize,
    /// Colour groups owned outright
    pub complete_groups: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatKind {
    RentExposure,
    DominantRival,
    CashShortage,
    RivalMonopoly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threat {
    pub kind: ThreatKind,
    pub source: Option<PlayerId>,
    pub severity: f32,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    PurchasableProperty,
    GroupCompletion,
    TradeOpening,
    WeakRival,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub kind: OpportunityKind,
    pub value: f32,
    pub cell: Option<usize>,
    pub target: Option<PlayerId>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationAnalysis {
    pub game_id: String,
    pub turn: u32,
    pub opponent_id: PlayerId,
    pub phase: GamePhase,
    pub turns_remaining: u32,
    /// Active rivals, strongest first
    pub players: Vec<PlayerAssessment>,
    pub economics: EconomicMetrics,
    /// Most severe first
    pub threats: Vec<Threat>,
    /// Most valuable first
    pub opportunities: Vec<Opportunity>,
    pub created_at: Timestamp,
}

impl SituationAnalysis {
    pub fn max_threat_severity(&self) -> f32 {
        self.threats.first().map(|t| t.severity).unwrap_or(0.0)
    }

    pub fn assessment(&self, id: PlayerId) -> Option<&PlayerAssessment> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Rival with the highest threat level
    pub fn strongest_rival(&self) -> Option<&PlayerAssessment> {
        self.players.iter().max_by(|a, b| {
            a.threat_level
                .partial_cmp(&b.threat_level)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    pub fn player_count(&self) -> usize {
        self.players.len() + 1
    }
}

/// Build the analysis for opponent `id` from a snapshot
pub fn analyze_situation(game: &GameState, id: PlayerId) -> Result<SituationAnalysis> {
    let me = game.player(id).ok_or(RivalError::UnknownOpponent(id))?;

    let max_rounds = game.max_rounds.unwrap_or(DEFAULT_MAX_ROUNDS);
    let phase = GamePhase::classify(game.round, max_rounds, game.ownership_ratio());
    let turns_remaining = max_rounds.saturating_sub(game.round);

    let economics = economic_metrics(game, id);
    let groups = group_ownership(game);
    let players = assess_rivals(game, id, &groups);
    let threats = find_threats(game, id, &economics, &players, &groups);
    let opportunities = find_opportunities(game, me.position, id, &economics, &groups);

    Ok(SituationAnalysis {
        game_id: game.game_id.clone(),
        turn: game.turn,
        opponent_id: id,
        phase,
        turns_remaining,
        players,
        economics,
        threats,
        opportunities,
        created_at: now_millis(),
    })
}

/// Per colour group: cell indices and their owners
pub(crate) struct GroupInfo {
    pub cells: Vec<usize>,
    pub owners: Vec<Option<PlayerId>>,
}

impl GroupInfo {
    pub fn owned_by(&self, id: PlayerId) -> usize {
        self.owners.iter().filter(|o| **o == Some(id)).count()
    }

    pub fn complete_for(&self, id: PlayerId) -> bool {
        !self.cells.is_empty() && self.owned_by(id) == self.cells.len()
    }
}

pub(crate) fn group_ownership(game: &GameState) -> BTreeMap<String, GroupInfo> {
    let mut groups: BTreeMap<String, GroupInfo> = BTreeMap::new();
    for cell in game.board.iter().filter(|c| c.is_property()) {
        if let Some(group) = &cell.group {
            let info = groups.entry(group.clone()).or_insert_with(|| GroupInfo {
                cells: Vec::new(),
                owners: Vec::new(),
            });
            info.cells.push(cell.index);
            info.owners.push(cell.owner);
        }
    }
    groups
}

fn economic_metrics(game: &GameState, id: PlayerId) -> EconomicMetrics {
    let me = game.player(id);
    let cash = me.map(|p| p.cash).unwrap_or(0.0);
    let net_worth = game.net_worth(id);
    let property_count = game.cells_owned_by(id).count();

    let money_rank = 1 + game.rivals_of(id).filter(|p| p.cash > cash).count();
    let property_rank = 1 + game
        .rivals_of(id)
        .filter(|p| game.cells_owned_by(p.id).count() > property_count)
        .count();

    let complete_groups = group_ownership(game)
        .values()
        .filter(|g| g.complete_for(id))
        .count();

    let liquidity_ratio = if net_worth > 0.0 {
        (cash / net_worth) as f32
    } else {
        0.0
    };

    EconomicMetrics {
        cash,
        net_worth,
        liquidity_ratio: unit(liquidity_ratio),
        money_rank,
        property_rank,
        property_count,
        complete_groups,
    }
}

fn assess_rivals(
    game: &GameState,
    id: PlayerId,
    groups: &BTreeMap<String, GroupInfo>,
) -> Vec<PlayerAssessment> {
    let my_worth = game.net_worth(id).max(1.0);
    let worths: Vec<(PlayerId, f64)> = game
        .players
        .iter()
        .filter(|p| p.is_active())
        .map(|p| (p.id, game.net_worth(p.id)))
        .collect();
    let leader = worths
        .iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(pid, _)| *pid);

    let mut assessments: Vec<PlayerAssessment> = game
        .rivals_of(id)
        .map(|rival| {
            let net_worth = game.net_worth(rival.id);
            let rank = 1 + worths.iter().filter(|(_, w)| *w > net_worth).count();
            let monopolies = groups.values().filter(|g| g.complete_for(rival.id)).count();

            let threat_level =
                unit((net_worth / my_worth) as f32 * 0.5 + monopolies as f32 * 0.15);
            let both_trailing = leader != Some(id) && leader != Some(rival.id);
            let alliance_potential = unit(
                0.3 + if both_trailing { 0.3 } else { 0.0 } + (1.0 - threat_level) * 0.3,
            );

            PlayerAssessment {
                id: rival.id,
                name: rival.name.clone(),
                rank,
                cash: rival.cash,
                net_worth,
                threat_level,
                alliance_potential,
            }
        })
        .collect();

    assessments.sort_by(|a, b| {
        b.threat_level
            .partial_cmp(&a.threat_level)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    assessments
}

fn find_threats(
    game: &GameState,
    id: PlayerId,
    economics: &EconomicMetrics,
    players: &[PlayerAssessment],
    groups: &BTreeMap<String, GroupInfo>,
) -> Vec<Threat> {
    let mut threats = Vec::new();
    let cash = economics.cash.max(1.0);

    if let Some(me) = game.player(id) {
        let worst = game
            .cells_ahead(me.position)
            .filter(|c| c.owner.is_some() && c.owner != Some(id))
            .map(|c| (c, c.current_rent() * game.market.rent_multiplier as f64))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        if let Some((cell, rent)) = worst {
            let severity = unit((rent / cash) as f32 * 2.0);
            if severity > 0.1 {
                threats.push(Threat {
                    kind: ThreatKind::RentExposure,
                    source: cell.owner,
                    severity,
                    description: format!("{:.0} rent at {} within reach", rent, cell.name),
                });
            }
        }
    }

    for rival in players.iter().filter(|p| p.threat_level > 0.6) {
        threats.push(Threat {
            kind: ThreatKind::DominantRival,
            source: Some(rival.id),
            severity: rival.threat_level,
            description: format!("{} is pulling ahead", rival.name),
        });
    }

    for (name, group) in groups {
        for rival in players {
            if group.complete_for(rival.id) {
                threats.push(Threat {
                    kind: ThreatKind::RivalMonopoly,
                    source: Some(rival.id),
                    severity: unit(0.5 + rival.threat_level * 0.3),
                    description: format!("{} owns all of {}", rival.name, name),
                });
            }
        }
    }

    if economics.liquidity_ratio < 0.2 || economics.cash < 200.0 {
        threats.push(Threat {
            kind: ThreatKind::CashShortage,
            source: None,
            severity: unit(1.0 - economics.liquidity_ratio * 4.0).max(0.4),
            description: format!("only {:.0} cash on hand", economics.cash),
        });
    }

    threats.sort_by(|a, b| {
        b.severity
            .partial_cmp(&a.severity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    threats
}

fn find_opportunities(
    game: &GameState,
    position: usize,
    id: PlayerId,
    economics: &EconomicMetrics,
    groups: &BTreeMap<String, GroupInfo>,
) -> Vec<Opportunity> {
    let mut opportunities = Vec::new();
    let cash = economics.cash.max(1.0);

    if let Some(cell) = game.cell(position).filter(|c| c.is_purchasable()) {
        if cell.price <= economics.cash {
            let roi = (cell.base_rent() / cell.price.max(1.0)) as f32;
            opportunities.push(Opportunity {
                kind: OpportunityKind::PurchasableProperty,
                value: unit(roi * 2.5 + (1.0 - (cell.price / cash) as f32) * 0.5),
                cell: Some(cell.index),
                target: None,
                description: format!("{} is for sale at {:.0}", cell.name, cell.price),
            });
        }
    }

    for (name, group) in groups {
        let mine = group.owned_by(id);
        if mine == 0 || mine + 1 != group.cells.len() {
            continue;
        }
        for (index, owner) in group.cells.iter().zip(&group.owners) {
            match owner {
                None => opportunities.push(Opportunity {
                    kind: OpportunityKind::GroupCompletion,
                    value: 0.8,
                    cell: Some(*index),
                    target: None,
                    description: format!("one cell short of owning {}", name),
                }),
                Some(holder) if *holder != id => opportunities.push(Opportunity {
                    kind: OpportunityKind::TradeOpening,
                    value: 0.6,
                    cell: Some(*index),
                    target: Some(*holder),
                    description: format!("last cell of {} is held by a rival", name),
                }),
                _ => {}
            }
        }
    }

    for rival in game.rivals_of(id) {
        if rival.cash < economics.cash * 0.2 {
            opportunities.push(Opportunity {
                kind: OpportunityKind::WeakRival,
                value: unit(1.0 - (rival.cash / cash) as f32),
                cell: None,
                target: Some(rival.id),
                description: format!("{} is nearly broke", rival.name),
            });
        }
    }

    opportunities.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    opportunities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{BoardCell, PlayerSnapshot, TurnPhase};

    #[test]
    fn test_phase_classification() {
        assert_eq!(GamePhase::classify(1, 60, 0.0), GamePhase::Early);
        assert_eq!(GamePhase::classify(20, 60, 0.0), GamePhase::Mid);
        assert_eq!(GamePhase::classify(1, 60, 0.9), GamePhase::Late);
        assert_eq!(GamePhase::classify(58, 60, 0.0), GamePhase::Endgame);
    }

    #[test]
    fn test_unknown_player_is_an_error() {
        let game = GameState::builder("g").build();
        assert!(matches!(
            analyze_situation(&game, PlayerId::new()),
            Err(RivalError::UnknownOpponent(_))
        ));
    }

    #[test]
    fn test_ranks_and_liquidity() {
        let me = PlayerId::new();
        let rich = PlayerId::new();
        let game = GameState::builder("g")
            .player(PlayerSnapshot::new(me, "Me", 1000.0).owning(&[1]))
            .player(PlayerSnapshot::new(rich, "Rich", 5000.0))
            .cell(BoardCell::property(1, "A", 1000.0, vec![100.0]))
            .board_len(20)
            .build();

        let analysis = analyze_situation(&game, me).expect("analysis");
        assert_eq!(analysis.economics.money_rank, 2);
        assert_eq!(analysis.economics.property_rank, 1);
        assert!((analysis.economics.liquidity_ratio - 0.5).abs() < 1e-6);
        assert_eq!(analysis.players.len(), 1);
        assert_eq!(analysis.players[0].rank, 1);
    }

    #[test]
    fn test_rent_exposure_threat() {
        let me = PlayerId::new();
        let landlord = PlayerId::new();
        let game = GameState::builder("g")
            .phase(TurnPhase::AwaitingRoll)
            .player(PlayerSnapshot::new(me, "Me", 500.0).at(0))
            .player(PlayerSnapshot::new(landlord, "Landlord", 3000.0).owning(&[7]))
            .cell(BoardCell::property(7, "Palace", 400.0, vec![300.0]))
            .board_len(20)
            .build();

        let analysis = analyze_situation(&game, me).expect("analysis");
        let exposure = analysis
            .threats
            .iter()
            .find(|t| t.kind == ThreatKind::RentExposure)
            .expect("rent exposure");
        assert_eq!(exposure.source, Some(landlord));
        assert_eq!(exposure.severity, 1.0);
    }

    #[test]
    fn test_group_completion_and_trade_opening() {
        let me = PlayerId::new();
        let rival = PlayerId::new();
        let game = GameState::builder("g")
            .player(PlayerSnapshot::new(me, "Me", 2000.0).owning(&[1, 4]))
            .player(PlayerSnapshot::new(rival, "Rival", 2000.0).owning(&[6]))
            .cell(BoardCell::property(1, "J1", 200.0, vec![20.0]).in_group("jade"))
            .cell(BoardCell::property(2, "J2", 200.0, vec![20.0]).in_group("jade"))
            .cell(BoardCell::property(4, "S1", 200.0, vec![20.0]).in_group("silk"))
            .cell(BoardCell::property(6, "S2", 200.0, vec![20.0]).in_group("silk"))
            .board_len(12)
            .build();

        let analysis = analyze_situation(&game, me).expect("analysis");
        assert!(analysis
            .opportunities
            .iter()
            .any(|o| o.kind == OpportunityKind::GroupCompletion && o.cell == Some(2)));
        assert!(analysis
            .opportunities
            .iter()
            .any(|o| o.kind == OpportunityKind::TradeOpening && o.target == Some(rival)));
    }
}
