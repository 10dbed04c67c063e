/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! External stop-control contract for the searcher: a limit descriptor plus
//! the two call sites (`on_end_of_iteration`, `on_search_stop_control`) the
//! searcher consults to decide whether to keep iterating.

use super::time::TimeManager;
use crate::movegen::defs::{Move, ShortMove};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// How the current search is bounded.
pub enum SearchLimit {
    FixedDepth(i8),
    FixedNodes(u64),
    FixedTimeMs(u128),
    DepthAndNodes(i8, u64),
    Infinite,
    Clock(TimeManager),
}

pub struct SearchManager {
    limit: SearchLimit,
    start: Instant,
    abort: Arc<AtomicBool>,
    last_depth: i8,
    last_pv: Vec<Move>,
}

impl SearchManager {
    pub fn new(limit: SearchLimit) -> Self {
        Self {
            limit,
            start: Instant::now(),
            abort: Arc::new(AtomicBool::new(false)),
            last_depth: 0,
            last_pv: Vec::new(),
        }
    }

    /// Shares the abort flag with `flag` instead of owning a private one, so
    /// an external thread (e.g. a UCI `stop` handler) can request a stop
    /// without holding a reference to the `SearchManager` itself.
    pub fn with_shared_abort(limit: SearchLimit, flag: Arc<AtomicBool>) -> Self {
        Self {
            limit,
            start: Instant::now(),
            abort: flag,
            last_depth: 0,
            last_pv: Vec::new(),
        }
    }

    pub fn start_search(&mut self) {
        self.start = Instant::now();
        self.abort.store(false, Ordering::Relaxed);
        if let SearchLimit::Clock(tm) = &mut self.limit {
            tm.start();
        }
    }

    pub fn request_stop(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    pub fn aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    /// Called once per 2048 nodes by the main search thread.
    pub fn on_search_stop_control(&self, nodes: u64) -> bool {
        if self.abort.load(Ordering::Relaxed) {
            return true;
        }
        let stop = match &self.limit {
            SearchLimit::FixedDepth(_) | SearchLimit::Infinite => false,
            SearchLimit::FixedNodes(cap) => nodes >= *cap,
            SearchLimit::DepthAndNodes(_, cap) => nodes >= *cap,
            SearchLimit::FixedTimeMs(budget) => self.start.elapsed().as_millis() >= *budget,
            SearchLimit::Clock(tm) => tm.should_stop_now(),
        };
        if stop {
            self.abort.store(true, Ordering::Relaxed);
        }
        stop
    }

    /// Called at the end of every completed depth iteration. Publishes the
    /// result and returns whether the searcher should stop iterating.
    pub fn on_end_of_iteration(&mut self, depth: i8, _seldepth: i8, nodes: u64, pv: &[Move], score: i32) -> bool {
        self.last_depth = depth;
        self.last_pv = pv.to_vec();
        let best = pv.first().map(|m| m.to_short()).unwrap_or_else(ShortMove::none);

        if let SearchLimit::Clock(tm) = &mut self.limit {
            tm.on_end_of_iteration(depth, best, score);
        }

        if self.abort.load(Ordering::Relaxed) {
            return true;
        }

        match &self.limit {
            SearchLimit::FixedDepth(max) => depth >= *max,
            SearchLimit::DepthAndNodes(max, cap) => depth >= *max || nodes >= *cap,
            SearchLimit::FixedNodes(cap) => nodes >= *cap,
            SearchLimit::FixedTimeMs(budget) => self.start.elapsed().as_millis() >= *budget,
            SearchLimit::Infinite => false,
            SearchLimit::Clock(tm) => !tm.should_start_iteration(),
        }
    }

    pub fn last_depth(&self) -> i8 {
        self.last_depth
    }

    pub fn last_pv(&self) -> &[Move] {
        &self.last_pv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_depth_stops_after_target_depth() {
        let mut mgr = SearchManager::new(SearchLimit::FixedDepth(5));
        for d in 1..5 {
            assert!(!mgr.on_end_of_iteration(d, d, 0, &[], 0));
        }
        assert!(mgr.on_end_of_iteration(5, 5, 0, &[], 0));
    }

    #[test]
    fn fixed_nodes_stop_control_triggers_abort() {
        let mgr = SearchManager::new(SearchLimit::FixedNodes(1000));
        assert!(!mgr.on_search_stop_control(500));
        assert!(mgr.on_search_stop_control(1000));
        assert!(mgr.aborted());
    }

    #[test]
    fn request_stop_is_observed_immediately() {
        let mgr = SearchManager::new(SearchLimit::Infinite);
        assert!(!mgr.on_search_stop_control(0));
        mgr.request_stop();
        assert!(mgr.on_search_stop_control(0));
    }
}
