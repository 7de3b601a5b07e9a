//! Rival AI - decision core for computer-controlled board-game opponents

pub mod core;
pub mod evaluator;
pub mod explain;
pub mod game;
pub mod opponent;
pub mod orchestrator;
pub mod persistence;
pub mod scoring;
pub mod tree;
