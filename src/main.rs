//! Rival AI - Entry Point
//!
//! Drives registered opponents through a synthetic board game and prints
//! every decision, or lists the shipped personality archetypes.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use rival_ai::core::config::{DecisionMode, EngineConfig};
use rival_ai::core::error::Result;
use rival_ai::core::types::PlayerId;
use rival_ai::game::{
    ActionKind, BoardCell, CellKind, GameEvent, GameEventType, GameState, PlayerSnapshot,
    RentDue, SkillState, SkillTag, TurnPhase,
};
use rival_ai::opponent::{Archetype, Personality};
use rival_ai::orchestrator::{OpponentConfig, Orchestrator};
use rival_ai::persistence::InMemoryPersistence;

const BOARD_LEN: usize = 24;
const STARTING_CASH: f64 = 15_000.0;
const PASS_START_BONUS: f64 = 2_000.0;

/// Rival AI - board-game opponent decision core
#[derive(Parser, Debug)]
#[command(name = "rival-ai")]
#[command(about = "Run computer opponents through a synthetic property game")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a synthetic game and print each decision
    Simulate {
        /// Number of opponents (one per archetype, cycling)
        #[arg(long, default_value_t = 3)]
        opponents: usize,

        /// Rounds to play
        #[arg(long, default_value_t = 10)]
        turns: u32,

        /// Random seed for dice and tie-breaks
        #[arg(long)]
        seed: Option<u64>,

        /// Engine config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Decide through personalized decision trees
        #[arg(long)]
        tree: bool,
    },
    /// List personality archetypes
    Presets,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rival_ai=info")),
        )
        .init();

    match Args::parse().command {
        Command::Presets => {
            print_presets();
            Ok(())
        }
        Command::Simulate {
            opponents,
            turns,
            seed,
            config,
            tree,
        } => simulate(opponents, turns, seed, config, tree).await,
    }
}

fn print_presets() {
    println!(
        "{:<14} {:>6} {:>6} {:>6} {:>6} {:>6}",
        "archetype", "risk", "aggr", "coop", "adapt", "pat"
    );
    for archetype in Archetype::ALL {
        let p = Personality::archetype(archetype);
        println!(
            "{:<14} {:>6.2} {:>6.2} {:>6.2} {:>6.2} {:>6.2}",
            archetype.name(),
            p.risk_tolerance,
            p.aggression,
            p.cooperation,
            p.adaptability,
            p.patience
        );
    }
}

async fn simulate(
    opponents: usize,
    rounds: u32,
    seed: Option<u64>,
    config_path: Option<PathBuf>,
    tree: bool,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let seed = seed.unwrap_or_else(|| rand::random());
    config.rng_seed = Some(seed);
    if tree {
        config.decision_mode = DecisionMode::Tree;
    }

    let orchestrator = Arc::new(Orchestrator::new(
        config,
        Arc::new(InMemoryPersistence::new()),
    )?);
    let mut dice = ChaCha8Rng::seed_from_u64(seed);

    let mut players = Vec::with_capacity(opponents);
    for (i, archetype) in Archetype::ALL.iter().cycle().take(opponents.max(1)).enumerate() {
        let name = format!("{}-{}", archetype.name(), i + 1);
        let id = orchestrator
            .create_opponent(OpponentConfig::new(&name).with_archetype(*archetype))
            .await?;
        players.push(
            PlayerSnapshot::new(id, &name, STARTING_CASH)
                .with_skill(
                    SkillState::new("levy", "Levy", vec![SkillTag::Economic]).with_cost(500.0),
                )
                .with_skill(
                    SkillState::new(
                        "blockade",
                        "Blockade",
                        vec![SkillTag::Offensive, SkillTag::Control],
                    )
                    .with_cost(800.0)
                    .targeted(),
                ),
        );
    }

    let mut builder = GameState::builder("simulation").max_rounds(rounds);
    for player in players {
        builder = builder.player(player);
    }
    for cell in synthetic_board() {
        builder = builder.cell(cell);
    }
    let mut game = builder.build();

    let (events, feed) = tokio::sync::mpsc::channel(64);
    let consumer = orchestrator.spawn_event_consumer(feed);
    let _ = events.send(GameEvent::new(GameEventType::GameStart)).await;

    println!("seed {} | {} opponents | {} rounds", seed, game.players.len(), rounds);
    let mut turn = 0;
    for round in 1..=rounds {
        game.round = round;
        for seat in 0..game.players.len() {
            if game.players[seat].bankrupt {
                continue;
            }
            turn += 1;
            game.turn = turn;
            play_turn(&orchestrator, &mut game, seat, &mut dice, &events).await;
        }
    }

    let winner = GameEvent::new(GameEventType::GameEnd)
        .with_payload(serde_json::json!({ "winner": richest(&game) }));
    let _ = events.send(winner).await;
    drop(events);
    if let Err(e) = consumer.await {
        tracing::warn!("Event consumer ended abnormally: {}", e);
    }

    println!();
    for player in &game.players {
        println!(
            "{:<16} cash {:>9.0} | net worth {:>9.0} | {} properties",
            player.name,
            player.cash,
            game.net_worth(player.id),
            player.properties.len()
        );
    }
    let stats = orchestrator.stats().await;
    println!(
        "{} decisions, {} fallbacks, {} tree decisions, avg confidence {:.2}, avg latency {:.2}ms",
        stats.decisions,
        stats.fallbacks,
        stats.tree_decisions,
        stats.avg_confidence,
        stats.avg_latency_ms
    );
    Ok(())
}

fn synthetic_board() -> Vec<BoardCell> {
    let groups = ["jade", "amber", "coral", "onyx", "pearl", "ruby"];
    (0..BOARD_LEN)
        .map(|index| match index % 4 {
            0 if index == 0 => BoardCell::special(0, "Start", CellKind::Start),
            0 => BoardCell::special(index, "Chance", CellKind::Chance),
            _ => {
                let tier = (index / 4) as f64;
                let price = 1_000.0 + tier * 500.0;
                let base = price * 0.12;
                BoardCell::property(
                    index,
                    &format!("{} {}", groups[index / 4], index % 4),
                    price,
                    vec![base, base * 3.0, base * 6.0],
                )
                .in_group(groups[index / 4])
            }
        })
        .collect()
}

fn richest(game: &GameState) -> Option<PlayerId> {
    game.players
        .iter()
        .max_by(|a, b| {
            game.net_worth(a.id)
                .partial_cmp(&game.net_worth(b.id))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|p| p.id)
}

/// One seat's turn: roll, resolve the landing cell, then the free action window
async fn play_turn(
    orchestrator: &Arc<Orchestrator>,
    game: &mut GameState,
    seat: usize,
    dice: &mut ChaCha8Rng,
    events: &tokio::sync::mpsc::Sender<GameEvent>,
) {
    let id = game.players[seat].id;
    game.current_player = id;
    game.rent_due = None;

    game.phase = TurnPhase::AwaitingRoll;
    let decision = orchestrator.decide(id, game, None).await;
    report(game, seat, &decision.reasoning);
    let roll = dice.gen_range(1..=6) + dice.gen_range(1..=6);
    advance(game, seat, roll);

    if let Some(landing) = landing_phase(game, seat) {
        game.phase = landing;
        let decision = orchestrator.decide(id, game, None).await;
        report(game, seat, &decision.reasoning);
        apply(game, seat, &decision.action.kind, events).await;
        game.rent_due = None;
    }

    if !game.players[seat].bankrupt {
        game.phase = TurnPhase::Action;
        let decision = orchestrator.decide(id, game, None).await;
        report(game, seat, &decision.reasoning);
        apply(game, seat, &decision.action.kind, events).await;
    }

    for skill in &mut game.players[seat].skills {
        skill.cooldown_remaining = skill.cooldown_remaining.saturating_sub(1);
    }
}

fn advance(game: &mut GameState, seat: usize, roll: usize) {
    let player = &mut game.players[seat];
    let next = player.position + roll;
    if next >= BOARD_LEN {
        player.cash += PASS_START_BONUS;
    }
    player.position = next % BOARD_LEN;
}

/// Phase implied by the landing cell, if it needs a decision
fn landing_phase(game: &mut GameState, seat: usize) -> Option<TurnPhase> {
    let payer = game.players[seat].id;
    let cell = game.cell(game.players[seat].position)?;
    if cell.is_purchasable() {
        return Some(TurnPhase::PropertyDecision);
    }
    let rent = match cell.owner {
        Some(owner) if owner != payer && cell.current_rent() > 0.0 => RentDue {
            payer,
            owner,
            cell: cell.index,
            amount: cell.current_rent(),
        },
        _ => return None,
    };
    game.rent_due = Some(rent);
    Some(TurnPhase::RentDue)
}

async fn apply(
    game: &mut GameState,
    seat: usize,
    action: &ActionKind,
    events: &tokio::sync::mpsc::Sender<GameEvent>,
) {
    let id = game.players[seat].id;
    let event = match action {
        ActionKind::BuyProperty { cell, price } if game.players[seat].cash >= *price => {
            game.players[seat].cash -= price;
            game.players[seat].properties.push(*cell);
            let group = game.cell(*cell).and_then(|c| c.group.clone());
            if let Some(board_cell) = game.board.iter_mut().find(|c| c.index == *cell) {
                board_cell.owner = Some(id);
            }
            Some(
                GameEvent::new(GameEventType::PropertyPurchased)
                    .by(id)
                    .with_payload(serde_json::json!({ "group": group })),
            )
        }
        ActionKind::PayRent { owner, amount } => {
            game.players[seat].cash -= amount;
            if let Some(payee) = game.players.iter_mut().find(|p| p.id == *owner) {
                payee.cash += amount;
            }
            if game.players[seat].cash < 0.0 {
                game.players[seat].bankrupt = true;
            }
            Some(GameEvent::new(GameEventType::RentPaid).by(id).targeting(*owner))
        }
        ActionKind::UseSkill { skill_id, target } => {
            let player = &mut game.players[seat];
            if let Some(skill) = player.skills.iter_mut().find(|s| &s.id == skill_id) {
                player.cash -= skill.cost;
                skill.cooldown_remaining = 3;
            }
            let event = GameEvent::new(GameEventType::SkillUsed).by(id);
            Some(match target {
                Some(t) => event.targeting(*t),
                None => event,
            })
        }
        ActionKind::TradeRequest(proposal) => Some(
            GameEvent::new(GameEventType::TradeProposed)
                .by(id)
                .targeting(proposal.target),
        ),
        _ => None,
    };

    if let Some(event) = event {
        let _ = events.send(event).await;
    }
}

fn report(game: &GameState, seat: usize, reasoning: &str) {
    println!(
        "[r{:>2} t{:>3}] {:<16} {}",
        game.round, game.turn, game.players[seat].name, reasoning
    );
}
