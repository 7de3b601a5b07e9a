//! Running orchestrator statistics

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStats {
    /// Calls to `decide`, cache hits included
    pub requests: u64,
    /// Decisions computed (not served from cache), fallbacks included
    pub decisions: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub fallbacks: u64,
    pub timeouts: u64,
    pub tree_decisions: u64,
    pub explanation_failures: u64,
    pub avg_latency_ms: f64,
    pub avg_confidence: f64,
    pub active_opponents: usize,
    pub cached_decisions: usize,
    pub cached_analyses: usize,
    pub trees: usize,
}

impl OrchestratorStats {
    /// Fold one computed decision into the running averages
    pub fn record_decision(&mut self, latency_ms: f64, confidence: f32) {
        self.decisions += 1;
        let n = self.decisions as f64;
        self.avg_latency_ms += (latency_ms - self.avg_latency_ms) / n;
        self.avg_confidence += (confidence as f64 - self.avg_confidence) / n;
    }

    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }
}
