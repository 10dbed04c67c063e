/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! UCI protocol parsing and formatting. Thin translation layer: every
//! recognized input line becomes a [`UciCommand`]; every engine-observable
//! output becomes a formatted line written by [`format_info`]/[`format_bestmove`].

use super::defs::{engine_options, EngineOptionName, UiElement};
use crate::movegen::defs::Move;
use crate::search::defs::MATE_THRESHOLD;

#[derive(Debug, Clone)]
pub enum GoLimits {
    Infinite,
    Depth(i8),
    Nodes(u64),
    MoveTime(u128),
    Clock { wtime_ms: u128, btime_ms: u128, winc_ms: u128, binc_ms: u128 },
}

#[derive(Debug, Clone)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    SetOption(EngineOptionName),
    Position(String, Vec<String>),
    Go(GoLimits),
    Stop,
    Quit,
    Unknown(String),
}

/// Parses one line of UCI input. Unrecognized tokens become
/// `UciCommand::Unknown`, logged and otherwise ignored by the caller.
pub fn parse(line: &str) -> UciCommand {
    let mut tokens = line.split_whitespace();
    match tokens.next().unwrap_or("") {
        "uci" => UciCommand::Uci,
        "isready" => UciCommand::IsReady,
        "ucinewgame" => UciCommand::UciNewGame,
        "stop" => UciCommand::Stop,
        "quit" => UciCommand::Quit,
        "setoption" => parse_setoption(tokens),
        "position" => parse_position(tokens),
        "go" => parse_go(tokens),
        _ => UciCommand::Unknown(line.to_string()),
    }
}

fn parse_setoption<'a>(tokens: impl Iterator<Item = &'a str>) -> UciCommand {
    let rest: Vec<&str> = tokens.collect();
    let name_pos = rest.iter().position(|&t| t == "name");
    let value_pos = rest.iter().position(|&t| t == "value");
    let Some(np) = name_pos else { return UciCommand::SetOption(EngineOptionName::Nothing) };

    let name_end = value_pos.unwrap_or(rest.len());
    let name = rest[np + 1..name_end].join(" ");
    let value = value_pos.map(|vp| rest[vp + 1..].join(" ")).unwrap_or_default();

    let option = if name.eq_ignore_ascii_case(EngineOptionName::HASH) {
        EngineOptionName::Hash(value)
    } else if name.eq_ignore_ascii_case(EngineOptionName::CLEAR_HASH) {
        EngineOptionName::ClearHash
    } else if name.eq_ignore_ascii_case(EngineOptionName::THREADS) {
        EngineOptionName::Threads(value)
    } else if name.eq_ignore_ascii_case(EngineOptionName::MULTI_PV) {
        EngineOptionName::MultiPv(value)
    } else {
        EngineOptionName::Nothing
    };
    UciCommand::SetOption(option)
}

fn parse_position<'a>(mut tokens: impl Iterator<Item = &'a str>) -> UciCommand {
    let mut fen = crate::defs::FEN_START_POSITION.to_string();
    let mut moves = Vec::new();

    match tokens.next() {
        Some("startpos") => {}
        Some("fen") => {
            let mut fields = Vec::new();
            for t in tokens.by_ref() {
                if t == "moves" {
                    break;
                }
                fields.push(t);
            }
            fen = fields.join(" ");
        }
        _ => {}
    }

    let mut in_moves = false;
    for t in tokens {
        if t == "moves" {
            in_moves = true;
            continue;
        }
        if in_moves {
            moves.push(t.to_string());
        }
    }

    UciCommand::Position(fen, moves)
}

fn parse_go<'a>(tokens: impl Iterator<Item = &'a str>) -> UciCommand {
    let rest: Vec<&str> = tokens.collect();
    if rest.iter().any(|&t| t == "infinite") {
        return UciCommand::Go(GoLimits::Infinite);
    }

    let arg = |key: &str| -> Option<u128> {
        rest.iter().position(|&t| t == key).and_then(|i| rest.get(i + 1)).and_then(|v| v.parse().ok())
    };

    if let Some(depth) = arg("depth") {
        return UciCommand::Go(GoLimits::Depth(depth as i8));
    }
    if let Some(nodes) = arg("nodes") {
        return UciCommand::Go(GoLimits::Nodes(nodes as u64));
    }
    if let Some(mt) = arg("movetime") {
        return UciCommand::Go(GoLimits::MoveTime(mt));
    }

    let wtime = arg("wtime");
    let btime = arg("btime");
    if wtime.is_some() || btime.is_some() {
        return UciCommand::Go(GoLimits::Clock {
            wtime_ms: wtime.unwrap_or(0),
            btime_ms: btime.unwrap_or(0),
            winc_ms: arg("winc").unwrap_or(0),
            binc_ms: arg("binc").unwrap_or(0),
        });
    }

    UciCommand::Go(GoLimits::Infinite)
}

/// `id name`/`id author`, the option table, and `uciok`.
pub fn format_identity() -> Vec<String> {
    let mut lines = vec!["id name Talon 0.1".to_string(), "id author Talon contributors".to_string()];
    for opt in engine_options() {
        let kind = match opt.ui_element {
            UiElement::Spin => "spin",
            UiElement::Button => "button",
        };
        let mut line = format!("option name {} type {}", opt.name, kind);
        if let Some(default) = &opt.default {
            line.push_str(&format!(" default {default}"));
        }
        if let Some(min) = &opt.min {
            line.push_str(&format!(" min {min}"));
        }
        if let Some(max) = &opt.max {
            line.push_str(&format!(" max {max}"));
        }
        lines.push(line);
    }
    lines.push("uciok".to_string());
    lines
}

#[allow(clippy::too_many_arguments)]
pub fn format_info(depth: i8, seldepth: i8, score: i32, nodes: u64, nps: u64, hashfull: u32, time_ms: u128, pv: &[Move]) -> String {
    format_info_multipv(depth, seldepth, 1, score, nodes, nps, hashfull, time_ms, pv)
}

/// Like [`format_info`] but reports `multipv {line}`, used when
/// `Settings::multi_pv` asks for more than the single best line.
#[allow(clippy::too_many_arguments)]
pub fn format_info_multipv(
    depth: i8,
    seldepth: i8,
    line: usize,
    score: i32,
    nodes: u64,
    nps: u64,
    hashfull: u32,
    time_ms: u128,
    pv: &[Move],
) -> String {
    let score_term = if score.abs() >= MATE_THRESHOLD {
        let plies_to_mate = crate::search::defs::MATE - score.abs();
        let moves_to_mate = (plies_to_mate + 1) / 2;
        let signed = if score > 0 { moves_to_mate } else { -moves_to_mate };
        format!("mate {signed}")
    } else {
        format!("cp {score}")
    };

    let pv_str = pv.iter().map(|m| m.to_uci()).collect::<Vec<_>>().join(" ");
    format!(
        "info depth {depth} seldepth {seldepth} multipv {line} score {score_term} nodes {nodes} nps {nps} hashfull {hashfull} time {time_ms} pv {pv_str}"
    )
}

pub fn format_bestmove(m: Move) -> String {
    format!("bestmove {}", m.to_uci())
}
