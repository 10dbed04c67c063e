/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! The repetition ring: a stack of position hashes with zero-valued
//! sentinel entries inserted before every irreversible move (capture, pawn
//! move, castling-right loss, en passant). `repetition_count` scans
//! backward until it hits a sentinel.

use crate::defs::MAX_GAME_MOVES;

pub struct History {
    stack: Vec<u64>,
}

impl History {
    pub fn new() -> Self {
        Self {
            stack: Vec::with_capacity(MAX_GAME_MOVES),
        }
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Push a zero-valued sentinel, marking the boundary before an
    /// irreversible move.
    pub fn push_sentinel(&mut self) {
        self.stack.push(0);
    }

    /// Push a position hash reached after a move.
    pub fn push_hash(&mut self, hash: u64) {
        self.stack.push(hash);
    }

    /// Pop the most recently pushed entry (hash or sentinel).
    pub fn pop(&mut self) {
        self.stack.pop();
    }

    /// Count occurrences of `hash` since the most recent sentinel
    /// (exclusive), scanning backward from the top of the stack.
    pub fn repetition_count(&self, hash: u64) -> usize {
        let mut count = 0;
        for &entry in self.stack.iter().rev() {
            if entry == 0 {
                break;
            }
            if entry == hash {
                count += 1;
            }
        }
        count
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for History {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repetition_count_stops_at_sentinel() {
        let mut h = History::new();
        h.push_sentinel();
        h.push_hash(1);
        h.push_hash(2);
        h.push_hash(1);
        assert_eq!(h.repetition_count(1), 2);
        h.push_sentinel();
        h.push_hash(1);
        assert_eq!(h.repetition_count(1), 1);
    }
}
