use std::collections::VecDeque;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{now_millis, unit, PlayerId, Timestamp};
use crate::game::GameEventType;

/// Events whose importance decays below this are forgotten
pub const IMPORTANCE_FLOOR: f32 = 0.1;

/// Neutral trust/predictability a relationship decays back to
const RELATIONSHIP_BASELINE: f32 = 0.5;

/// What a memory event is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Observed from the event feed
    Event(GameEventType),
    /// Snapshot observed during a decision cycle
    TurnObserved,
}

impl MemoryKind {
    pub fn base_importance(&self) -> f32 {
        match self {
            MemoryKind::Event(event_type) => event_type.base_importance(),
            MemoryKind::TurnObserved => GameEventType::TurnEnd.base_importance(),
        }
    }
}

/// A single decaying memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEvent {
    pub kind: MemoryKind,
    pub turn: u32,
    pub summary: String,
    /// Current importance (0.0 to 1.0), decays every cycle
    pub importance: f32,
    pub related_player: Option<PlayerId>,
    pub recorded_at: Timestamp,
}

impl MemoryEvent {
    pub fn new(kind: MemoryKind, turn: u32, summary: impl Into<String>) -> Self {
        Self {
            kind,
            turn,
            summary: summary.into(),
            importance: kind.base_importance(),
            related_player: None,
            recorded_at: now_millis(),
        }
    }

    pub fn about(mut self, player: Option<PlayerId>) -> Self {
        self.related_player = player;
        self
    }
}

/// What an opponent believes about another player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub trust: f32,
    pub aggression: f32,
    pub predictability: f32,
    pub interactions: u32,
    pub last_interaction: Timestamp,
}

impl Default for Relationship {
    fn default() -> Self {
        Self {
            trust: RELATIONSHIP_BASELINE,
            aggression: 0.0,
            predictability: RELATIONSHIP_BASELINE,
            interactions: 0,
            last_interaction: now_millis(),
        }
    }
}

impl Relationship {
    /// Trust and predictability relax toward neutral, aggression toward zero
    pub fn decay(&mut self, rate: f32) {
        self.trust = RELATIONSHIP_BASELINE + (self.trust - RELATIONSHIP_BASELINE) * rate;
        self.predictability =
            RELATIONSHIP_BASELINE + (self.predictability - RELATIONSHIP_BASELINE) * rate;
        self.aggression *= rate;
    }

    pub fn nudge(&mut self, trust: f32, aggression: f32, predictability: f32) {
        self.trust = unit(self.trust + trust);
        self.aggression = unit(self.aggression + aggression);
        self.predictability = unit(self.predictability + predictability);
        self.interactions += 1;
        self.last_interaction = now_millis();
    }
}

/// Something learned about how the game is being played
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicNote {
    pub topic: String,
    pub detail: String,
    pub observations: u32,
    pub recorded_at: Timestamp,
}

/// Bounded event history, relationships and strategic notes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Memory {
    /// Oldest first
    pub events: VecDeque<MemoryEvent>,
    pub relationships: AHashMap<PlayerId, Relationship>,
    /// Oldest first; reinforcing a note moves it to the back
    pub knowledge: VecDeque<StrategicNote>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decay existing memories, forget faded ones, then append and cap
    pub fn record(&mut self, event: MemoryEvent, decay_rate: f32, max_events: usize) {
        self.decay_events(decay_rate);
        self.events.push_back(event);
        while self.events.len() > max_events {
            self.events.pop_front();
        }
    }

    /// Multiply every importance by `rate` and drop events below the floor
    pub fn decay_events(&mut self, rate: f32) {
        for event in &mut self.events {
            event.importance *= rate;
        }
        self.events.retain(|e| e.importance >= IMPORTANCE_FLOOR);
    }

    pub fn decay_relationships(&mut self, rate: f32) {
        for relationship in self.relationships.values_mut() {
            relationship.decay(rate);
        }
    }

    pub fn relationship(&self, player: PlayerId) -> Option<&Relationship> {
        self.relationships.get(&player)
    }

    pub fn relationship_mut(&mut self, player: PlayerId) -> &mut Relationship {
        self.relationships.entry(player).or_default()
    }

    /// Trust in a player, neutral when unknown
    pub fn trust_in(&self, player: PlayerId) -> f32 {
        self.relationship(player)
            .map(|r| r.trust)
            .unwrap_or(RELATIONSHIP_BASELINE)
    }

    /// Record or reinforce a note, keeping the most recent `max_notes`
    pub fn note(&mut self, topic: &str, detail: &str, max_notes: usize) {
        let observations = match self.knowledge.iter().position(|n| n.topic == topic) {
            Some(index) => self
                .knowledge
                .remove(index)
                .map_or(1, |previous| previous.observations + 1),
            None => 1,
        };
        self.knowledge.push_back(StrategicNote {
            topic: topic.to_string(),
            detail: detail.to_string(),
            observations,
            recorded_at: now_millis(),
        });

        while self.knowledge.len() > max_notes {
            self.knowledge.pop_front();
        }
    }

    pub fn most_important(&self) -> Option<&MemoryEvent> {
        self.events.iter().max_by(|a, b| {
            a.importance
                .partial_cmp(&b.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}
