//! Skill and trade scorers plus the skill tag rule table

pub mod rules;
pub mod skill;
pub mod trade;

pub use rules::{SkillRuleTable, TagRule};
pub use skill::{score_skill, SkillScore};
pub use trade::{find_trade_opportunities, TradeKind, TradeOpportunity};
