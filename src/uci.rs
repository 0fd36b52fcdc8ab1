// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An implementation of the UCI protocol, driving `driver::Driver` from stdin.
//! See [here](http://wbec-ridderkerk.nl/html/UCIProtocol.html) for full
//! documentation on the protocol.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::{self, EngineConfig};
use crate::core::Move;
use crate::driver::{Driver, GoOptions, SearchInfo};
use crate::movegen;
use crate::position::Position;

/// Owns the engine's mutable state across the lifetime of the UCI session: the
/// current position, the driver (and its transposition table), and whatever
/// search is currently running in the background.
pub struct Session {
    pos: Position,
    driver: Driver,
    stop_flag: Arc<AtomicBool>,
    search: Option<JoinHandle<()>>,
}

impl Session {
    fn new() -> Session {
        Session {
            pos: Position::startpos(),
            driver: Driver::new(EngineConfig::default()),
            stop_flag: Arc::new(AtomicBool::new(false)),
            search: None,
        }
    }

    /// Blocks until any in-flight search finishes. Called before any command
    /// that would mutate state the search thread reads (`position`,
    /// `ucinewgame`, `setoption`) or before starting a new one.
    fn await_search(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.search.take() {
            let _ = handle.join();
        }
    }
}

pub fn run() -> io::Result<()> {
    let stdin = io::stdin();
    let mut session = Session::new();

    for maybe_line in stdin.lock().lines() {
        let line = maybe_line?;
        let components: Vec<_> = line.split_whitespace().collect();
        let Some((&command, arguments)) = components.split_first() else {
            continue;
        };

        match command {
            "uci" => handle_uci(),
            "isready" => uci_output!("readyok"),
            "ucinewgame" => {
                session.await_search();
                session.driver.new_game();
                session.pos = Position::startpos();
            }
            "setoption" => handle_setoption(&mut session, arguments),
            "position" => {
                session.await_search();
                session.driver.between_moves();
                if let Err(e) = handle_position(&mut session.pos, arguments) {
                    uci_output!("info string {}", e);
                }
            }
            "go" => handle_go(&mut session, arguments),
            "stop" => session.stop_flag.store(true, Ordering::Release),
            "quit" => {
                session.await_search();
                break;
            }
            "" => {}
            other => uci_output!("info string unrecognized command: {}", other),
        }
    }

    Ok(())
}

fn handle_uci() {
    uci_output!(
        "id name {} {}",
        config::ENGINE_NAME,
        env!("CARGO_PKG_VERSION")
    );
    uci_output!("id author {}", config::ENGINE_AUTHOR);
    uci_output!(
        "option name Hash type spin default {} min {} max {}",
        config::DEFAULT_HASH_MB,
        config::MIN_HASH_MB,
        config::MAX_HASH_MB
    );
    uci_output!("uciok");
}

/// Handles `setoption name Hash value <N>`. Any other option name is
/// acknowledged silently, as the protocol allows.
fn handle_setoption(session: &mut Session, arguments: &[&str]) {
    // arguments looks like ["name", "Hash", "value", "16"]
    if arguments.len() < 4 || arguments[0] != "name" {
        return;
    }
    let name = arguments[1];
    let value_pos = arguments.iter().position(|&a| a == "value");
    let Some(value_pos) = value_pos else {
        return;
    };
    let Some(&value) = arguments.get(value_pos + 1) else {
        return;
    };

    if name.eq_ignore_ascii_case("hash") {
        session.await_search();
        if let Ok(mb) = value.parse::<u32>() {
            session.driver.set_hash_mb(mb);
        }
    }
}

/// Handles `position [startpos | fen <fen>] [moves <uci> <uci> ...]`.
fn handle_position(pos: &mut Position, arguments: &[&str]) -> Result<(), crate::error::EngineError> {
    let moves_at = arguments.iter().position(|&a| a == "moves");
    let (board_tokens, move_tokens) = match moves_at {
        Some(i) => (&arguments[..i], &arguments[i + 1..]),
        None => (arguments, &arguments[arguments.len()..]),
    };

    *pos = match board_tokens.first() {
        Some(&"startpos") => Position::startpos(),
        Some(&"fen") => {
            let fen = board_tokens[1..].join(" ");
            Position::from_fen(&fen)?
        }
        _ => return Err(crate::error::EngineError::Uci("expected startpos or fen".to_owned())),
    };

    for uci_move in move_tokens {
        apply_uci_move(pos, uci_move)?;
    }
    Ok(())
}

/// Parses a bare UCI move string against the legal moves available in `pos`
/// and applies it, discarding the unapply info: once a move is committed to
/// the `position` command's replay, the engine never walks it back.
fn apply_uci_move(pos: &mut Position, uci_move: &str) -> Result<(), crate::error::EngineError> {
    let (from, to, promote_to) = Move::parse_uci(uci_move)?;
    let legal = movegen::generate(pos, false);
    let matched = legal
        .into_iter()
        .find(|mv| mv.from == from && mv.to == to && mv.promote_to == promote_to);
    let Some(mv) = matched else {
        return Err(crate::error::MoveParseError::Illegal(uci_move.to_owned()).into());
    };
    pos.apply(mv);
    Ok(())
}

/// Parses the `go` subcommand's options and spawns a background search
/// thread. The thread prints its own `info` lines as each depth completes and
/// a final `bestmove` line when it returns, so the main loop never blocks
/// waiting for it; `stop` simply flips the shared flag the thread polls.
fn handle_go(session: &mut Session, arguments: &[&str]) {
    session.await_search();

    let opts = parse_go_options(arguments);
    session.stop_flag.store(false, Ordering::Release);

    let driver = session.driver.clone();
    let pos = session.pos.clone();
    let stop_flag = Arc::clone(&session.stop_flag);

    session.search = Some(thread::spawn(move || {
        let best_move = driver.go(&pos, opts, Arc::clone(&stop_flag), print_info);
        uci_output!("bestmove {}", best_move.as_uci());
    }));
}

fn parse_go_options(arguments: &[&str]) -> GoOptions {
    let mut opts = GoOptions::default();
    let mut i = 0;
    while i < arguments.len() {
        match arguments[i] {
            "wtime" => i += read_u64(arguments, i, &mut opts.wtime),
            "btime" => i += read_u64(arguments, i, &mut opts.btime),
            "winc" => i += read_u64(arguments, i, &mut opts.winc),
            "binc" => i += read_u64(arguments, i, &mut opts.binc),
            "movetime" => i += read_u64(arguments, i, &mut opts.movetime),
            "movestogo" => {
                i += 1;
                if let Some(&v) = arguments.get(i) {
                    opts.movestogo = v.parse().ok();
                    i += 1;
                }
            }
            "infinite" => {
                opts.infinite = true;
                i += 1;
            }
            _ => i += 1,
        }
    }
    opts
}

fn read_u64(arguments: &[&str], i: usize, slot: &mut Option<u64>) -> usize {
    if let Some(&v) = arguments.get(i + 1) {
        *slot = v.parse().ok();
        2
    } else {
        1
    }
}

/// Formats one iterative-deepening depth as a UCI `info` line.
fn print_info(info: SearchInfo) {
    let millis = info.time.as_millis().max(1) as u64;
    let nps = info.nodes * 1000 / millis;
    let pv: Vec<String> = info.pv.iter().map(Move::as_uci).collect();
    uci_output!(
        "info depth {} time {} nodes {} score cp {} hashfull {} nps {} pv {}",
        info.depth,
        millis,
        info.nodes,
        info.score_cp,
        info.hashfull,
        nps,
        pv.join(" ")
    );
}
