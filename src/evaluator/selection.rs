//! Ranking, randomized tie-break selection and confidence

use ordered_float::OrderedFloat;
use rand::Rng;

use crate::core::types::unit;
use crate::evaluator::decision::ScoredAction;

/// Largest pool the tie-break draws from
const TIE_POOL: usize = 3;

/// Sort by descending score; equal scores keep enumeration order
pub fn rank(candidates: &mut [ScoredAction]) {
    candidates.sort_by_key(|c| std::cmp::Reverse(OrderedFloat(c.score)));
}

/// Probability of drawing among near-ties instead of taking the top score
pub fn randomness(adaptability: f32) -> f32 {
    unit(1.0 - unit(adaptability) * 0.3)
}

/// Index of the chosen candidate in a ranked slice
///
/// Draws uniformly among the top candidates that lie within `tie_margin`
/// of the best score, with probability [`randomness`].
pub fn select<R: Rng + ?Sized>(
    ranked: &[ScoredAction],
    adaptability: f32,
    tie_margin: f32,
    rng: &mut R,
) -> usize {
    let Some(best) = ranked.first().map(|c| c.score) else {
        return 0;
    };
    let pool = ranked
        .iter()
        .take(TIE_POOL)
        .take_while(|c| c.score >= best - tie_margin)
        .count();
    if pool <= 1 {
        return 0;
    }
    if rng.gen::<f32>() < randomness(adaptability) {
        rng.gen_range(0..pool)
    } else {
        0
    }
}

/// Confidence in the candidate at `chosen`
pub fn confidence(ranked: &[ScoredAction], chosen: usize, adaptability: f32) -> f32 {
    let Some(winner) = ranked.get(chosen) else {
        return 0.0;
    };
    let runner_up = ranked
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != chosen)
        .map(|(_, c)| c.score)
        .fold(None, |best: Option<f32>, s| Some(best.map_or(s, |b| b.max(s))));

    let mut value = winner.score;
    if let Some(runner_up) = runner_up {
        value += 0.3 * (winner.score - runner_up);
    }
    unit(unit(value) * (0.7 + 0.3 * unit(adaptability)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PlayerId;
    use crate::game::{Action, ActionKind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn scored(scores: &[f32]) -> Vec<ScoredAction> {
        let me = PlayerId::new();
        scores
            .iter()
            .map(|s| ScoredAction::new(Action::new(me, ActionKind::RollDice), *s, "x"))
            .collect()
    }

    #[test]
    fn test_rank_descending() {
        let mut candidates = scored(&[0.2, 0.9, 0.5]);
        rank(&mut candidates);
        let scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![0.9, 0.5, 0.2]);
    }

    #[test]
    fn test_clear_winner_is_always_chosen() {
        let candidates = scored(&[0.9, 0.5, 0.4]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(select(&candidates, 0.0, 0.1, &mut rng), 0);
        }
    }

    #[test]
    fn test_near_ties_are_drawn_within_pool() {
        let candidates = scored(&[0.8, 0.78, 0.75, 0.74, 0.1]);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut seen = [false; 3];
        for _ in 0..500 {
            let chosen = select(&candidates, 0.0, 0.1, &mut rng);
            assert!(chosen < 3);
            seen[chosen] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_same_seed_same_choice() {
        let candidates = scored(&[0.8, 0.78, 0.75]);
        let picks = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..20)
                .map(|_| select(&candidates, 0.3, 0.1, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(42), picks(42));
    }

    #[test]
    fn test_randomness_falls_with_adaptability() {
        assert_eq!(randomness(0.0), 1.0);
        assert!((randomness(1.0) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_formula() {
        let candidates = scored(&[0.8, 0.6]);
        // 0.8 + 0.3 * 0.2 = 0.86, scaled by 0.7 + 0.3 * 0.5 = 0.85
        assert!((confidence(&candidates, 0, 0.5) - 0.731).abs() < 1e-4);

        let single = scored(&[0.5]);
        assert!((confidence(&single, 0, 1.0) - 0.5).abs() < 1e-6);
    }
}
