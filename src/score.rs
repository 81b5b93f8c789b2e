//! Scoring and combo multiplier
//!
//! Each gap the player drops through scores the level tier times the current
//! multiplier. A gap passed while the previous one's window is still open
//! doubles the multiplier; once the window lapses it falls back to 1. The
//! window is a plain deadline compared against run time, no timers involved.

use serde::{Deserialize, Serialize};

use crate::persistence::{BEST_SCORE_KEY, Persistence};

/// Snapshot of level progress counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Rings emitted by the generator so far
    pub layers_emitted: u32,
    /// Gaps the player has dropped through
    pub layers_passed: u32,
    pub score: u64,
    pub multiplier: u32,
    pub best_score: u64,
}

/// Score, best score and combo multiplier
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreKeeper {
    score: u64,
    best: u64,
    layers_passed: u32,
    multiplier: u32,
    /// Run time (seconds) at which the multiplier window closes
    multiplier_expires_at: Option<f32>,
    timeout: f32,
}

impl ScoreKeeper {
    pub fn new(timeout: f32, best: u64) -> Self {
        Self {
            score: 0,
            best,
            layers_passed: 0,
            multiplier: 1,
            multiplier_expires_at: None,
            timeout,
        }
    }

    /// Start a run with the persisted best score
    pub fn load<P: Persistence + ?Sized>(store: &P, timeout: f32) -> Self {
        let best = store.get(BEST_SCORE_KEY).max(0) as u64;
        Self::new(timeout, best)
    }

    /// Close the multiplier window if its deadline has passed
    pub fn tick(&mut self, now: f32) {
        if self.multiplier_expires_at.is_some_and(|deadline| now >= deadline) {
            self.multiplier_expires_at = None;
            self.multiplier = 1;
        }
    }

    /// Record a passed layer and add `points` times the multiplier
    ///
    /// Returns the points added. A new best score is written to `store`.
    pub fn add_score<P: Persistence + ?Sized>(&mut self, points: u32, now: f32, store: &mut P) -> u64 {
        self.layers_passed += 1;
        self.tick(now);

        if self.multiplier_expires_at.is_some() {
            self.multiplier = self.multiplier.saturating_mul(2);
        }
        self.multiplier_expires_at = Some(now + self.timeout);

        let added = u64::from(points) * u64::from(self.multiplier);
        self.score += added;

        if self.score > self.best {
            self.best = self.score;
            store.set(BEST_SCORE_KEY, self.best.min(i32::MAX as u64) as i32);
        }
        added
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn best(&self) -> u64 {
        self.best
    }

    pub fn layers_passed(&self) -> u32 {
        self.layers_passed
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Whether a scoring event now would double the multiplier
    pub fn window_open(&self, now: f32) -> bool {
        self.multiplier_expires_at.is_some_and(|deadline| now < deadline)
    }

    /// Share of the level's layers passed, rounded to a whole percent
    pub fn percent_completed(&self, total_layers: u32) -> u32 {
        if total_layers == 0 {
            return 0;
        }
        (self.layers_passed as f32 / total_layers as f32 * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_quick_succession_doubles() {
        let mut store = MemoryStore::new();
        let mut score = ScoreKeeper::new(1.0, 0);

        assert_eq!(score.add_score(2, 0.0, &mut store), 2);
        assert_eq!(score.multiplier(), 1);
        assert_eq!(score.add_score(2, 0.5, &mut store), 4);
        assert_eq!(score.multiplier(), 2);
        assert_eq!(score.add_score(2, 1.2, &mut store), 8);
        assert_eq!(score.multiplier(), 4);
        assert_eq!(score.score(), 14);
        assert_eq!(score.layers_passed(), 3);
    }

    #[test]
    fn test_lapsed_window_resets() {
        let mut store = MemoryStore::new();
        let mut score = ScoreKeeper::new(1.0, 0);

        score.add_score(1, 0.0, &mut store);
        score.add_score(1, 0.5, &mut store);
        assert_eq!(score.multiplier(), 2);

        // Window from the second event closes at 1.5
        assert_eq!(score.add_score(1, 1.6, &mut store), 1);
        assert_eq!(score.multiplier(), 1);
    }

    #[test]
    fn test_tick_closes_window() {
        let mut store = MemoryStore::new();
        let mut score = ScoreKeeper::new(1.0, 0);
        score.add_score(1, 0.0, &mut store);
        score.add_score(1, 0.1, &mut store);

        assert!(score.window_open(0.9));
        score.tick(1.2);
        assert_eq!(score.multiplier(), 1);
        assert!(!score.window_open(1.2));
    }

    #[test]
    fn test_best_score_persisted_only_when_beaten() {
        let mut store = MemoryStore::new().with(BEST_SCORE_KEY, 5);
        let mut score = ScoreKeeper::load(&store, 1.0);
        assert_eq!(score.best(), 5);

        score.add_score(3, 0.0, &mut store);
        assert_eq!(store.get(BEST_SCORE_KEY), 5);
        score.add_score(3, 5.0, &mut store);
        assert_eq!(score.best(), 6);
        assert_eq!(store.get(BEST_SCORE_KEY), 6);
    }

    #[test]
    fn test_percent_completed_rounds() {
        let mut store = MemoryStore::new();
        let mut score = ScoreKeeper::new(0.0, 0);
        for i in 0..2 {
            score.add_score(1, i as f32, &mut store);
        }
        assert_eq!(score.percent_completed(3), 67);
        assert_eq!(score.percent_completed(0), 0);
    }
}
