/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Top-level engine: owns the live position and shared tables, drives the
//! UCI read loop, and dispatches each parsed command. A search runs on its
//! own thread so `stop` (and a new `position`/`go`) can interrupt it;
//! results flow back over a `crossbeam_channel`.

pub mod defs;
pub mod uci;

use crate::board::Position;
use crate::defs::FEN_START_POSITION;
use crate::engine::defs::{EngineOptionName, ErrFatal, ErrNormal, Settings};
use crate::engine::uci::{GoLimits, UciCommand};
use crate::movegen::defs::{Move, MoveType};
use crate::movegen::MoveGenerator;
use crate::nnue::Network;
use crate::search::manager::{SearchLimit, SearchManager};
use crate::search::time::TimeManager;
use crate::search::{iterative_deepening, multi_pv_deepening, SearchContext};
use crate::tt::TranspositionTable;
use crate::zobrist::ZobristRandoms;
use crossbeam_channel::{Receiver, Sender};
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

/// Progress published by the search thread back to the UCI loop.
pub enum SearchReport {
    Info(String),
    Done(Move),
}

pub struct Engine {
    pos: Arc<Mutex<Position>>,
    mg: Arc<MoveGenerator>,
    net: Arc<Network>,
    tt: Arc<TranspositionTable>,
    settings: Settings,
    stop_flag: Arc<AtomicBool>,
    search_thread: Option<JoinHandle<()>>,
    report_rx: Option<Receiver<SearchReport>>,
}

impl Engine {
    pub fn new(attacks: Arc<crate::bitboards::Attacks>, net: Arc<Network>) -> Self {
        let zr = Arc::new(ZobristRandoms::new());
        let pos = Position::new(attacks.clone(), zr);
        let settings = Settings::default();
        Self {
            pos: Arc::new(Mutex::new(pos)),
            mg: Arc::new(MoveGenerator::new(attacks)),
            net,
            tt: Arc::new(TranspositionTable::with_size_mb(settings.hash_mb)),
            settings,
            stop_flag: Arc::new(AtomicBool::new(false)),
            search_thread: None,
            report_rx: None,
        }
    }

    /// Reads UCI commands from stdin until `quit`. Returns the process
    /// exit code (0 on normal quit).
    pub fn run(&mut self) -> i32 {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if self.dispatch(uci::parse(&line)) {
                break;
            }
        }
        self.wait_for_search();
        0
    }

    /// Handles one parsed command. Returns true when the engine should exit.
    fn dispatch(&mut self, cmd: UciCommand) -> bool {
        match cmd {
            UciCommand::Uci => {
                for line in uci::format_identity() {
                    println!("{line}");
                }
                io::stdout().flush().ok();
            }
            UciCommand::IsReady => {
                self.drain_reports();
                println!("readyok");
                io::stdout().flush().ok();
            }
            UciCommand::UciNewGame => {
                self.pos.lock().expect(ErrFatal::LOCK).load_fen(FEN_START_POSITION);
                for _ in 0..4 {
                    self.tt.new_search();
                }
            }
            UciCommand::SetOption(option) => self.set_option(option),
            UciCommand::Position(fen, moves) => self.set_position(&fen, &moves),
            UciCommand::Go(limits) => self.start_search(limits),
            UciCommand::Stop => {
                self.stop_flag.store(true, Ordering::Relaxed);
                self.wait_for_search();
            }
            UciCommand::Quit => return true,
            UciCommand::Unknown(_) => {}
        }
        false
    }

    fn set_option(&mut self, option: EngineOptionName) {
        match option {
            EngineOptionName::Hash(value) => match value.parse::<usize>() {
                Ok(mb) if mb >= 1 => {
                    self.settings.hash_mb = mb;
                    self.tt = Arc::new(TranspositionTable::with_size_mb(mb));
                }
                _ => println!("info string {}", ErrNormal::NOT_INT),
            },
            EngineOptionName::ClearHash => self.tt = Arc::new(TranspositionTable::with_size_mb(self.settings.hash_mb)),
            EngineOptionName::Threads(value) => match value.parse::<usize>() {
                Ok(n) if (1..=32).contains(&n) => self.settings.threads = n,
                _ => println!("info string {}", ErrNormal::NOT_INT),
            },
            EngineOptionName::MultiPv(value) => match value.parse::<usize>() {
                Ok(n) if (1..=16).contains(&n) => self.settings.multi_pv = n,
                _ => println!("info string {}", ErrNormal::NOT_INT),
            },
            EngineOptionName::Nothing => println!("info string {}", ErrNormal::UNKNOWN_OPTION),
        }
        io::stdout().flush().ok();
    }

    fn set_position(&mut self, fen: &str, moves: &[String]) {
        self.wait_for_search();
        let mut pos = self.pos.lock().expect(ErrFatal::LOCK);
        pos.load_fen(fen);
        for uci_move in moves {
            match find_move_by_uci(&pos, &self.mg, uci_move) {
                Some(m) => {
                    pos.make(m);
                }
                None => {
                    println!("info string {}: {}", uci_move, ErrNormal::NOT_LEGAL);
                    break;
                }
            }
        }
    }

    fn start_search(&mut self, limits: GoLimits) {
        self.wait_for_search();
        self.stop_flag.store(false, Ordering::Relaxed);

        let side_to_move_is_white = self.pos.lock().expect(ErrFatal::LOCK).us() == crate::defs::Sides::WHITE;
        let limit = match limits {
            GoLimits::Infinite => SearchLimit::Infinite,
            GoLimits::Depth(d) => SearchLimit::FixedDepth(d),
            GoLimits::Nodes(n) => SearchLimit::FixedNodes(n),
            GoLimits::MoveTime(ms) => SearchLimit::FixedTimeMs(ms),
            GoLimits::Clock { wtime_ms, btime_ms, winc_ms, binc_ms } => {
                let (time_left_ms, increment_ms) = if side_to_move_is_white {
                    (wtime_ms, winc_ms)
                } else {
                    (btime_ms, binc_ms)
                };
                SearchLimit::Clock(TimeManager::new(time_left_ms, increment_ms))
            }
        };

        let pos_snapshot = self.pos.lock().expect(ErrFatal::LOCK).clone();
        let mg = self.mg.clone();
        let net = self.net.clone();
        let tt = self.tt.clone();
        let stop_flag = self.stop_flag.clone();
        let multi_pv = self.settings.multi_pv;
        let (tx, rx) = crossbeam_channel::unbounded();
        self.report_rx = Some(rx);

        self.search_thread = Some(std::thread::spawn(move || {
            run_search_thread(pos_snapshot, mg, net, tt, stop_flag, limit, multi_pv, tx);
        }));
    }

    fn wait_for_search(&mut self) {
        if let Some(handle) = self.search_thread.take() {
            self.stop_flag.store(true, Ordering::Relaxed);
            let _ = handle.join();
        }
        self.drain_reports();
    }

    fn drain_reports(&mut self) {
        if let Some(rx) = &self.report_rx {
            for report in rx.try_iter() {
                emit(report);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_search_thread(
    pos: Position,
    mg: Arc<MoveGenerator>,
    net: Arc<Network>,
    tt: Arc<TranspositionTable>,
    stop_flag: Arc<AtomicBool>,
    limit: SearchLimit,
    multi_pv: usize,
    tx: Sender<SearchReport>,
) {
    let mut ctx = SearchContext::new(pos, mg, net, tt);
    let mut manager = SearchManager::with_shared_abort(limit, stop_flag);
    let started = Instant::now();

    let depth;
    let nodes;
    let best;

    if multi_pv <= 1 {
        let (found, score) = iterative_deepening(&mut ctx, &mut manager);
        depth = manager.last_depth();
        nodes = ctx.nodes;
        best = found;
        let elapsed_ms = started.elapsed().as_millis().max(1);
        let nps = (nodes as u128 * 1000 / elapsed_ms) as u64;
        let info = uci::format_info(depth, ctx.seldepth, score, nodes, nps, 0, elapsed_ms, manager.last_pv());
        let _ = tx.send(SearchReport::Info(info));
    } else {
        let lines = multi_pv_deepening(&mut ctx, &mut manager, multi_pv);
        depth = manager.last_depth();
        nodes = ctx.nodes;
        best = lines.first().and_then(|l| l.pv.first().copied()).unwrap_or(Move::null());
        let elapsed_ms = started.elapsed().as_millis().max(1);
        let nps = (nodes as u128 * 1000 / elapsed_ms) as u64;
        for (i, line) in lines.iter().enumerate() {
            let info =
                uci::format_info_multipv(depth, ctx.seldepth, i + 1, line.score, nodes, nps, 0, elapsed_ms, &line.pv);
            let _ = tx.send(SearchReport::Info(info));
        }
    }

    let _ = tx.send(SearchReport::Done(best));
}

fn emit(report: SearchReport) {
    match report {
        SearchReport::Info(line) => println!("{line}"),
        SearchReport::Done(m) => println!("{}", uci::format_bestmove(m)),
    }
    io::stdout().flush().ok();
}

fn find_move_by_uci(pos: &Position, mg: &MoveGenerator, uci_move: &str) -> Option<Move> {
    let mut list = crate::movegen::defs::MoveList::new();
    let mut scratch = pos.clone();
    mg.generate(&scratch, &mut list, MoveType::All);
    let side = scratch.us();
    let found = list.iter().filter(|m| !scratch.causes_check(*m, side)).find(|m| m.to_uci() == uci_move);
    found
}
