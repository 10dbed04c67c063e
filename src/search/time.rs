/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Converts remaining-clock information into a per-move time budget and
//! decides, iteration by iteration, whether the searcher may start another
//! one.

use std::time::{Duration, Instant};

/// GUI/network round-trip slack subtracted from every clock-derived budget.
pub const OVERHEAD_MS: u128 = 50;

const STABLE_WINDOW: usize = 5;
const MIN_ITERATIONS_FOR_STABILITY: usize = 10;
const PAIRWISE_SCORE_STABLE: i32 = 50;
const SKIP_ONE_SCORE_STABLE: i32 = 100;
const STABLE_SCORE_CEILING: i32 = 300;
const DENOMINATORS: [u128; 3] = [8, 18, 25];

struct IterationRecord {
    #[allow(dead_code)]
    depth: i8,
    best_move: crate::movegen::defs::ShortMove,
    score: i32,
    duration: Duration,
}

/// Per-move time allocator driven by `go wtime/btime/winc/binc`.
pub struct TimeManager {
    time_left_ms: u128,
    increment_ms: u128,
    target_ms: u128,
    max_time_ms: u128,
    started: Instant,
    time_used: Duration,
    history: Vec<IterationRecord>,
}

impl TimeManager {
    pub fn new(time_left_ms: u128, increment_ms: u128) -> Self {
        let target_ms = (time_left_ms / 18 + increment_ms / 2).min(time_left_ms);
        let max_time_ms = (time_left_ms / 8 + increment_ms / 2).min(time_left_ms);
        Self {
            time_left_ms,
            increment_ms,
            target_ms,
            max_time_ms,
            started: Instant::now(),
            time_used: Duration::ZERO,
            history: Vec::new(),
        }
    }

    pub fn start(&mut self) {
        self.started = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Records one completed iteration and re-derives `target_ms` from
    /// best-move/score stability once enough history has accumulated.
    pub fn on_end_of_iteration(
        &mut self,
        depth: i8,
        best_move: crate::movegen::defs::ShortMove,
        score: i32,
    ) {
        let now = self.started.elapsed();
        let duration = now - self.time_used;
        self.time_used = now;
        self.history.push(IterationRecord {
            depth,
            best_move,
            score,
            duration,
        });

        if self.history.len() >= MIN_ITERATIONS_FOR_STABILITY {
            let denom = self.pick_denominator();
            self.target_ms = (self.time_left_ms / denom + self.increment_ms / 2)
                .min(self.time_left_ms)
                .min(self.max_time_ms);
        }
    }

    fn pick_denominator(&self) -> u128 {
        if !self.best_move_stable() {
            return DENOMINATORS[0];
        }
        if self.score_stable() {
            DENOMINATORS[2]
        } else {
            DENOMINATORS[1]
        }
    }

    fn best_move_stable(&self) -> bool {
        let tail = &self.history[self.history.len() - STABLE_WINDOW..];
        let first = tail[0].best_move;
        tail.iter().all(|r| r.best_move == first)
    }

    fn score_stable(&self) -> bool {
        let tail = &self.history[self.history.len() - STABLE_WINDOW..];
        if tail.iter().any(|r| r.score.abs() >= STABLE_SCORE_CEILING) {
            return false;
        }
        let pairwise_ok = tail
            .windows(2)
            .all(|w| (w[1].score - w[0].score).abs() < PAIRWISE_SCORE_STABLE);
        let skip_one_ok = tail
            .windows(3)
            .all(|w| (w[2].score - w[0].score).abs() < SKIP_ONE_SCORE_STABLE);
        pairwise_ok && skip_one_ok
    }

    /// Mean ratio of consecutive iteration durations, over iterations whose
    /// duration exceeded 5ms, clamped to `[1.0, 2.0]`.
    fn branching_factor(&self) -> f64 {
        let mut ratios = Vec::new();
        for w in self.history.windows(2) {
            let (a, b) = (w[0].duration.as_millis(), w[1].duration.as_millis());
            if a > 5 && b > 5 {
                ratios.push(b as f64 / a as f64);
            }
        }
        if ratios.is_empty() {
            return 1.0;
        }
        let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
        mean.clamp(1.0, 2.0)
    }

    /// Whether the searcher may start another iteration, estimating its
    /// cost from the branching factor and the previous iteration's length.
    pub fn should_start_iteration(&self) -> bool {
        let time_used = self.started.elapsed().as_millis();
        if time_used >= self.max_time_ms {
            return false;
        }
        let last = self.history.last().map(|r| r.duration.as_millis()).unwrap_or(0);
        let estimated_cost = time_used + (self.branching_factor() * last as f64 / 2.0) as u128;
        estimated_cost <= self.target_ms
    }

    /// Within-iteration stop check.
    pub fn should_stop_now(&self) -> bool {
        self.started.elapsed().as_millis() > self.target_ms
            || self.started.elapsed().as_millis() >= self.max_time_ms
    }

    pub fn target_ms(&self) -> u128 {
        self.target_ms
    }

    #[cfg(test)]
    fn last_depth(&self) -> i8 {
        self.history.last().map(|r| r.depth).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movegen::defs::ShortMove;

    #[test]
    fn init_derives_target_and_max_from_clock() {
        let tm = TimeManager::new(18_000, 0);
        assert_eq!(tm.target_ms, 1000);
        assert_eq!(tm.max_time_ms, 2250);
    }

    #[test]
    fn zero_clock_clamps_to_zero_regardless_of_increment() {
        let tm = TimeManager::new(0, 1000);
        assert_eq!(tm.target_ms, 0);
        assert_eq!(tm.max_time_ms, 0);
    }

    #[test]
    fn unstable_best_move_keeps_tight_denominator() {
        let mut tm = TimeManager::new(180_000, 0);
        for i in 0..12 {
            let mv = ShortMove::new(i as usize % 60, (i as usize + 1) % 60, crate::defs::Pieces::NONE);
            tm.on_end_of_iteration(i as i8 + 1, mv, 20);
        }
        assert_eq!(tm.last_depth(), 12);
        assert_eq!(tm.target_ms, 180_000 / 8);
    }

    #[test]
    fn stable_best_move_and_score_widen_denominator() {
        let mut tm = TimeManager::new(180_000, 0);
        let mv = ShortMove::new(12, 28, crate::defs::Pieces::NONE);
        for i in 0..12 {
            tm.on_end_of_iteration(i as i8 + 1, mv, 10);
        }
        assert_eq!(tm.target_ms, 180_000 / 25);
    }
}
