/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Process entry point: parse the command line, initialize the shared
//! attack tables and NNUE weights, then either run one-shot `perft` and
//! exit, or hand off to the UCI engine loop.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use talon_engine::bitboards::Attacks;
use talon_engine::board::Position;
use talon_engine::defs::{FEN_KIWIPETE_POSITION, MAX_PLY};
use talon_engine::engine::Engine;
use talon_engine::misc::cmdline::CmdLine;
use talon_engine::movegen::MoveGenerator;
use talon_engine::nnue::Network;
use talon_engine::zobrist::ZobristRandoms;

fn main() -> ExitCode {
    let cmdline = CmdLine::new();

    let attacks = match Attacks::new() {
        Ok(attacks) => Arc::new(attacks),
        Err(e) => {
            eprintln!("fatal: attack table initialization failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let net = match Network::embedded() {
        Ok(net) => Arc::new(net),
        Err(e) => {
            eprintln!("fatal: NNUE weight initialization failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cmdline.perft() > 0 {
        return run_perft(&cmdline, attacks);
    }

    let mut engine = Engine::new(attacks, net);
    ExitCode::from(engine.run() as u8)
}

fn run_perft(cmdline: &CmdLine, attacks: Arc<Attacks>) -> ExitCode {
    let depth = (cmdline.perft().max(0) as u32).min(MAX_PLY as u32) as u8;
    let fen = if cmdline.has_kiwipete() { FEN_KIWIPETE_POSITION.to_string() } else { cmdline.fen() };

    let zr = Arc::new(ZobristRandoms::new());
    let mg = MoveGenerator::new(attacks.clone());
    let mut pos = Position::new(attacks, zr);
    pos.load_fen(&fen);

    let started = Instant::now();
    let nodes = mg.perft(&mut pos, depth);
    let elapsed_ms = started.elapsed().as_millis().max(1);
    let nps = nodes as u128 * 1000 / elapsed_ms;

    if !cmdline.has_quiet() {
        println!("perft({depth}) = {nodes} ({elapsed_ms} ms, {nps} nps)");
    } else {
        println!("{nodes}");
    }

    ExitCode::SUCCESS
}
