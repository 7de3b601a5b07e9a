//! Read-only game-state snapshot supplied by the rules engine
//!
//! The decision core never mutates a snapshot; every decision works from
//! the prices, rents and ownership computed by the board engine.

use serde::{Deserialize, Serialize};

use crate::core::types::PlayerId;

/// Step of the current player's turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Waiting for the player to roll
    AwaitingRoll,
    /// Landed on an unowned property
    PropertyDecision,
    /// Landed on an owned property and owes rent
    RentDue,
    /// Free action window (skills, trades)
    Action,
    /// Nothing left but ending the turn
    TurnEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Bonus applied to property market value in this season
    pub fn market_bonus(&self) -> f32 {
        match self {
            Season::Spring => 0.05,
            Season::Summer => 0.1,
            Season::Autumn => 0.03,
            Season::Winter => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zodiac {
    Rat,
    Ox,
    Tiger,
    Rabbit,
    Dragon,
    Snake,
    Horse,
    Goat,
    Monkey,
    Rooster,
    Dog,
    Pig,
}

/// Capability tags carried by skills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillTag {
    Offensive,
    Defensive,
    Economic,
    Movement,
    Control,
    Social,
}

impl SkillTag {
    pub const ALL: [SkillTag; 6] = [
        SkillTag::Offensive,
        SkillTag::Defensive,
        SkillTag::Economic,
        SkillTag::Movement,
        SkillTag::Control,
        SkillTag::Social,
    ];
}

/// A skill owned by a player, with its cooldown state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillState {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<SkillTag>,
    #[serde(default)]
    pub cooldown_remaining: u32,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub requires_target: bool,
}

impl SkillState {
    pub fn new(id: &str, name: &str, tags: Vec<SkillTag>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            tags,
            cooldown_remaining: 0,
            cost: 0.0,
            requires_target: false,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_cooldown(mut self, turns: u32) -> Self {
        self.cooldown_remaining = turns;
        self
    }

    pub fn targeted(mut self) -> Self {
        self.requires_target = true;
        self
    }

    pub fn has_tag(&self, tag: SkillTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown_remaining == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub cash: f64,
    pub position: usize,
    /// Indices of owned board cells
    #[serde(default)]
    pub properties: Vec<usize>,
    #[serde(default)]
    pub skills: Vec<SkillState>,
    #[serde(default)]
    pub bankrupt: bool,
    #[serde(default)]
    pub zodiac: Option<Zodiac>,
}

impl PlayerSnapshot {
    pub fn new(id: PlayerId, name: &str, cash: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            cash,
            position: 0,
            properties: Vec::new(),
            skills: Vec::new(),
            bankrupt: false,
            zodiac: None,
        }
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    pub fn owning(mut self, cells: &[usize]) -> Self {
        self.properties.extend_from_slice(cells);
        self
    }

    pub fn with_skill(mut self, skill: SkillState) -> Self {
        self.skills.push(skill);
        self
    }

    pub fn with_zodiac(mut self, zodiac: Zodiac) -> Self {
        self.zodiac = Some(zodiac);
        self
    }

    pub fn is_active(&self) -> bool {
        !self.bankrupt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Property,
    Start,
    Chance,
    Tax,
    Jail,
    Rest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardCell {
    pub index: usize,
    pub name: String,
    pub kind: CellKind,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub owner: Option<PlayerId>,
    /// Rent by development level
    #[serde(default)]
    pub rent: Vec<f64>,
    #[serde(default)]
    pub level: usize,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub mortgaged: bool,
    #[serde(default)]
    pub zodiac: Option<Zodiac>,
}

impl BoardCell {
    pub fn property(index: usize, name: &str, price: f64, rent: Vec<f64>) -> Self {
        Self {
            index,
            name: name.to_string(),
            kind: CellKind::Property,
            price,
            owner: None,
            rent,
            level: 0,
            group: None,
            mortgaged: false,
            zodiac: None,
        }
    }

    pub fn special(index: usize, name: &str, kind: CellKind) -> Self {
        Self {
            index,
            name: name.to_string(),
            kind,
            price: 0.0,
            owner: None,
            rent: Vec::new(),
            level: 0,
            group: None,
            mortgaged: false,
            zodiac: None,
        }
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn owned_by(mut self, owner: PlayerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_zodiac(mut self, zodiac: Zodiac) -> Self {
        self.zodiac = Some(zodiac);
        self
    }

    pub fn is_property(&self) -> bool {
        self.kind == CellKind::Property
    }

    pub fn is_purchasable(&self) -> bool {
        self.is_property() && self.owner.is_none() && self.price > 0.0
    }

    /// Rent at the first development level
    pub fn base_rent(&self) -> f64 {
        self.rent.first().copied().unwrap_or(0.0)
    }

    /// Rent at the current development level
    pub fn current_rent(&self) -> f64 {
        if self.mortgaged {
            return 0.0;
        }
        self.rent
            .get(self.level)
            .or_else(|| self.rent.last())
            .copied()
            .unwrap_or(0.0)
    }

    /// Highest rent in the schedule
    pub fn max_rent(&self) -> f64 {
        self.rent.iter().copied().fold(0.0, f64::max)
    }

    /// Value of the cell towards its owner's net worth
    pub fn asset_value(&self) -> f64 {
        if self.mortgaged {
            self.price * 0.5
        } else {
            self.price
        }
    }
}

/// Multipliers published by the market simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConditions {
    pub property_multiplier: f32,
    pub rent_multiplier: f32,
    /// Overall economic health (0.0 = crash, 1.0 = boom)
    pub economic_health: f32,
}

impl Default for MarketConditions {
    fn default() -> Self {
        Self {
            property_multiplier: 1.0,
            rent_multiplier: 1.0,
            economic_health: 0.5,
        }
    }
}

/// Rent owed by the current player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentDue {
    pub payer: PlayerId,
    pub owner: PlayerId,
    pub cell: usize,
    pub amount: f64,
}

/// Snapshot of the whole game at one point of a turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: String,
    pub turn: u32,
    pub round: u32,
    #[serde(default)]
    pub max_rounds: Option<u32>,
    pub phase: TurnPhase,
    pub current_player: PlayerId,
    pub players: Vec<PlayerSnapshot>,
    pub board: Vec<BoardCell>,
    #[serde(default)]
    pub market: MarketConditions,
    #[serde(default)]
    pub season: Option<Season>,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub rent_due: Option<RentDue>,
}

impl GameState {
    pub fn builder(game_id: &str) -> GameStateBuilder {
        GameStateBuilder::new(game_id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn cell(&self, index: usize) -> Option<&BoardCell> {
        self.board.iter().find(|c| c.index == index)
    }

    /// Active players other than `id`
    pub fn rivals_of(&self, id: PlayerId) -> impl Iterator<Item = &PlayerSnapshot> {
        self.players
            .iter()
            .filter(move |p| p.id != id && p.is_active())
    }

    pub fn cells_owned_by(&self, id: PlayerId) -> impl Iterator<Item = &BoardCell> {
        self.board.iter().filter(move |c| c.owner == Some(id))
    }

    pub fn group_cells<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a BoardCell> {
        self.board
            .iter()
            .filter(move |c| c.group.as_deref() == Some(group))
    }

    /// Cash plus the asset value of owned cells
    pub fn net_worth(&self, id: PlayerId) -> f64 {
        let cash = self.player(id).map(|p| p.cash).unwrap_or(0.0);
        cash + self.cells_owned_by(id).map(|c| c.asset_value()).sum::<f64>()
    }

    /// Cells reachable with one roll of two dice from `position`
    pub fn cells_ahead(&self, position: usize) -> impl Iterator<Item = &BoardCell> {
        let len = self.board.len().max(1);
        (2..=12).filter_map(move |step| self.cell((position + step) % len))
    }

    /// Fraction of properties that already have an owner
    pub fn ownership_ratio(&self) -> f32 {
        let total = self.board.iter().filter(|c| c.is_property()).count();
        if total == 0 {
            return 0.0;
        }
        let owned = self
            .board
            .iter()
            .filter(|c| c.is_property() && c.owner.is_some())
            .count();
        owned as f32 / total as f32
    }
}

/// Fluent construction of snapshots, used by tests and the demo driver
#[derive(Debug, Clone)]
pub struct GameStateBuilder {
    state: GameState,
}

impl GameStateBuilder {
    pub fn new(game_id: &str) -> Self {
        Self {
            state: GameState {
                game_id: game_id.to_string(),
                turn: 1,
                round: 1,
                max_rounds: None,
                phase: TurnPhase::AwaitingRoll,
                current_player: PlayerId(uuid::Uuid::nil()),
                players: Vec::new(),
                board: Vec::new(),
                market: MarketConditions::default(),
                season: None,
                weather: None,
                rent_due: None,
            },
        }
    }

    pub fn turn(mut self, turn: u32) -> Self {
        self.state.turn = turn;
        self
    }

    pub fn round(mut self, round: u32) -> Self {
        self.state.round = round;
        self
    }

    pub fn max_rounds(mut self, max_rounds: u32) -> Self {
        self.state.max_rounds = Some(max_rounds);
        self
    }

    pub fn phase(mut self, phase: TurnPhase) -> Self {
        self.state.phase = phase;
        self
    }

    pub fn current_player(mut self, id: PlayerId) -> Self {
        self.state.current_player = id;
        self
    }

    pub fn player(mut self, player: PlayerSnapshot) -> Self {
        if self.state.players.is_empty() {
            self.state.current_player = player.id;
        }
        self.state.players.push(player);
        self
    }

    pub fn cell(mut self, cell: BoardCell) -> Self {
        self.state.board.push(cell);
        self
    }

    pub fn market(mut self, market: MarketConditions) -> Self {
        self.state.market = market;
        self
    }

    pub fn season(mut self, season: Season) -> Self {
        self.state.season = Some(season);
        self
    }

    pub fn rent_due(mut self, rent: RentDue) -> Self {
        self.state.rent_due = Some(rent);
        self
    }

    /// Finish the snapshot, filling empty board slots up to `len`
    /// with rest cells so positions always resolve
    pub fn board_len(mut self, len: usize) -> Self {
        for index in 0..len {
            if self.state.board.iter().all(|c| c.index != index) {
                self.state
                    .board
                    .push(BoardCell::special(index, "Rest Stop", CellKind::Rest));
            }
        }
        self.state.board.sort_by_key(|c| c.index);
        self
    }

    pub fn build(mut self) -> GameState {
        // Owned cells listed on players are reflected on the board
        for player in &self.state.players {
            for index in &player.properties {
                if let Some(cell) = self.state.board.iter_mut().find(|c| c.index == *index) {
                    cell.owner = Some(player.id);
                }
            }
        }
        self.state
    }
}
