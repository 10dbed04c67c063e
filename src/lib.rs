/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

pub mod bitboards;
pub mod board;
pub mod defs;
pub mod engine;
pub mod evalcache;
pub mod history_tables;
pub mod misc;
pub mod movegen;
pub mod nnue;
pub mod search;
pub mod see;
pub mod tt;
pub mod zobrist;

pub use board::Position;
pub use defs::FEN_START_POSITION;
pub use movegen::MoveGenerator;
