/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Per-perspective accumulator stack. Depth tracks the search ply exactly;
//! `push`/`pop` move the live-accumulator pointer in lockstep with
//! `Position::make`/`unmake`. A push either applies a small add/sub delta
//! (the common case) or does a full refresh (forced on a king move that
//! crosses a king-bucket boundary or flips the mirror bit).

use super::{Network, HIDDEN};
use crate::defs::MAX_PLY;

#[derive(Clone)]
struct Frame {
    values: [i32; HIDDEN],
}

impl Frame {
    fn from_bias(net: &Network) -> Self {
        let mut values = [0i32; HIDDEN];
        for (v, &b) in values.iter_mut().zip(net.feature_bias.iter()) {
            *v = b as i32;
        }
        Frame { values }
    }
}

/// One perspective's accumulator stack (white-view or black-view).
struct PerspectiveStack {
    frames: Vec<Frame>,
}

impl PerspectiveStack {
    fn new(net: &Network) -> Self {
        let mut frames = Vec::with_capacity(MAX_PLY + 2);
        frames.push(Frame::from_bias(net));
        Self { frames }
    }

    fn top(&self) -> &Frame {
        self.frames.last().expect("accumulator stack never empty")
    }
}

/// Both perspectives' accumulator stacks, owned by a search context and
/// bound to one `Network`.
pub struct AccumulatorStack {
    persp: [PerspectiveStack; 2],
}

impl AccumulatorStack {
    pub fn new(net: &Network) -> Self {
        Self {
            persp: [PerspectiveStack::new(net), PerspectiveStack::new(net)],
        }
    }

    pub fn current(&self, perspective: usize) -> &[i32; HIDDEN] {
        &self.persp[perspective].top().values
    }

    /// Push a new frame for `perspective`, applying `adds` then `subs` to a
    /// copy of the current top frame.
    pub fn push_delta(&mut self, perspective: usize, net: &Network, adds: &[usize], subs: &[usize]) {
        let mut next = self.persp[perspective].top().clone();
        for &idx in adds {
            let col = net.feature_weight_column(idx);
            for (v, &w) in next.values.iter_mut().zip(col.iter()) {
                *v += w as i32;
            }
        }
        for &idx in subs {
            let col = net.feature_weight_column(idx);
            for (v, &w) in next.values.iter_mut().zip(col.iter()) {
                *v -= w as i32;
            }
        }
        self.persp[perspective].frames.push(next);
    }

    /// Push a fully-rebuilt frame for `perspective` from a clean baseline
    /// plus `active_features` (used on king-bucket/mirror boundary crossings).
    pub fn push_refresh(&mut self, perspective: usize, net: &Network, active_features: &[usize]) {
        let mut frame = Frame::from_bias(net);
        for &idx in active_features {
            let col = net.feature_weight_column(idx);
            for (v, &w) in frame.values.iter_mut().zip(col.iter()) {
                *v += w as i32;
            }
        }
        self.persp[perspective].frames.push(frame);
    }

    /// Push an identical copy of the current top frame (used for null
    /// moves, which never touch NNUE features).
    pub fn push_copy(&mut self, perspective: usize) {
        let frame = self.persp[perspective].top().clone();
        self.persp[perspective].frames.push(frame);
    }

    pub fn pop(&mut self, perspective: usize) {
        self.persp[perspective].frames.pop();
        debug_assert!(!self.persp[perspective].frames.is_empty());
    }

    pub fn depth(&self, perspective: usize) -> usize {
        self.persp[perspective].frames.len()
    }
}
