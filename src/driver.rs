// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Owns the transposition table and drives iterative deepening under a time
//! budget. Unlike the thread pool this replaces, there is no process-wide global
//! state here: a `Driver` is an explicit object the UCI loop owns and threads
//! through every command, per the redesign this engine's predecessor called for.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::core::{Color, Move};
use crate::movegen;
use crate::position::Position;
use crate::search::{self, SearchContext, SearchStats};
use crate::table::Table;

#[derive(Debug, Default, Clone, Copy)]
pub struct GoOptions {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movetime: Option<u64>,
    pub movestogo: Option<u32>,
    pub infinite: bool,
}

#[derive(Debug, Clone)]
pub struct SearchInfo {
    pub depth: u32,
    pub time: Duration,
    pub nodes: u64,
    pub score_cp: i32,
    pub hashfull: u32,
    pub pv: Vec<Move>,
}

#[derive(Clone)]
pub struct Driver {
    table: Arc<Table>,
    config: EngineConfig,
}

impl Driver {
    pub fn new(config: EngineConfig) -> Driver {
        Driver {
            table: Arc::new(Table::with_size_mb(config.hash_mb)),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_hash_mb(&mut self, mb: u32) {
        self.config.set_hash_mb(mb);
        self.table = Arc::new(Table::with_size_mb(self.config.hash_mb));
    }

    pub fn new_game(&mut self) {
        self.table.clear();
    }

    /// Runs a deferred table clear if one was scheduled by the high-water-mark
    /// policy. Called between moves in an ongoing game, never mid-search.
    pub fn between_moves(&self) {
        self.table.clear_if_scheduled();
    }

    pub fn hashfull_permille(&self) -> u32 {
        self.table.hashfull_permille()
    }

    /// Runs iterative deepening from depth 1 up to the configured maximum, or
    /// until `stop_flag` is observed set. `on_info` is called once per completed
    /// depth with the data a UCI `info` line needs. Returns the best move found
    /// at the deepest fully- or partially-searched depth, falling back to any
    /// legal move if the search never completed a single depth (e.g. `stop` was
    /// sent immediately).
    pub fn go(
        &self,
        pos: &Position,
        opts: GoOptions,
        stop_flag: Arc<AtomicBool>,
        mut on_info: impl FnMut(SearchInfo),
    ) -> Move {
        let budget = compute_time_budget(pos.side_to_move(), &opts, pos.ply());
        let deadline = budget.map(|d| Instant::now() + d);

        let timer_handle = deadline.map(|deadline| {
            let flag = Arc::clone(&stop_flag);
            thread::Builder::new()
                .name("talon-timer".to_owned())
                .spawn(move || {
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    }
                    flag.store(true, Ordering::Release);
                })
                .expect("failed to spawn timer thread")
        });

        let start = Instant::now();
        let mut best_move = Move::null();
        let mut total_stats = SearchStats::default();

        for depth in 1..=self.config.max_depth {
            if stop_flag.load(Ordering::Acquire) {
                break;
            }

            let ctx = SearchContext {
                table: &self.table,
                hard_stop: &stop_flag,
                node_limit: None,
                deadline,
                quiescence_ply_floor: self.config.quiescence_ply_floor,
                game_ply: pos.ply(),
            };

            let result = search::search_at_depth(pos, depth, &ctx);
            total_stats.nodes += result.stats.nodes;
            total_stats.qnodes += result.stats.qnodes;

            if !result.best_move.is_null() {
                best_move = result.best_move;
                let pv = self.reconstruct_pv(pos, depth);
                let elapsed = start.elapsed();
                on_info(SearchInfo {
                    depth,
                    time: elapsed,
                    nodes: total_stats.nodes + total_stats.qnodes,
                    score_cp: result.best_score,
                    hashfull: self.table.hashfull_permille(),
                    pv,
                });
            }

            if !opts.infinite {
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        break;
                    }
                }
            }
        }

        stop_flag.store(true, Ordering::Release);
        if let Some(handle) = timer_handle {
            let _ = handle.join();
        }

        if best_move.is_null() {
            always!("search produced no move; falling back to a random legal move");
            best_move = fallback_move(pos);
        } else {
            let legal_at_root = root_legal_moves(pos);
            if !legal_at_root.contains(&best_move) {
                always!("search returned a move absent from the root legal-move list; substituting a fallback");
                best_move = random_legal_move(&legal_at_root);
            }
        }

        info!("search finished: nodes={} qnodes={}", total_stats.nodes, total_stats.qnodes);
        best_move
    }

    fn reconstruct_pv(&self, pos: &Position, max_plies: u32) -> Vec<Move> {
        let mut scratch = pos.clone();
        crate::table::reconstruct_pv(&self.table, pos.zobrist_hash(), max_plies, move |mv| {
            scratch.apply(mv);
            Some(scratch.zobrist_hash())
        })
    }
}

/// Below this much remaining time, the clock is treated as an emergency: ignore
/// `movestogo` entirely and spend only a fixed small fraction of what is left,
/// so a move is always produced well before flagging.
const LOW_TIME_THRESHOLD_MS: u64 = 1000;
const LOW_TIME_FRACTION_DIVISOR: u64 = 20;

/// Floor on the assumed moves remaining in the game when the GUI doesn't supply
/// `movestogo`, so the allocator never divides by something smaller than this
/// even deep into a long game.
const MIN_ASSUMED_MOVES_TO_GO: u64 = 10;
const ASSUMED_GAME_LENGTH_PLIES: u64 = 70;

/// Splits the remaining time budget across the estimated number of moves left
/// in the game, adding the increment. Mirrors a conventional "time / movestogo"
/// allocator: `movestogo`, when the opponent sends it, is authoritative;
/// otherwise the divisor shrinks as the game goes on, down to a floor of
/// `MIN_ASSUMED_MOVES_TO_GO`. A clock already below `LOW_TIME_THRESHOLD_MS`
/// bypasses both and spends a fixed small fraction of whatever is left.
fn compute_time_budget(side: Color, opts: &GoOptions, ply_count: u32) -> Option<Duration> {
    if let Some(movetime) = opts.movetime {
        return Some(Duration::from_millis(movetime));
    }
    if opts.infinite {
        return None;
    }

    let (time, inc) = match side {
        Color::White => (opts.wtime, opts.winc),
        Color::Black => (opts.btime, opts.binc),
    };

    let time = time?;
    let inc = inc.unwrap_or(0);

    if time < LOW_TIME_THRESHOLD_MS {
        return Some(Duration::from_millis((time / LOW_TIME_FRACTION_DIVISOR).max(20)));
    }

    let moves_to_go = match opts.movestogo {
        Some(n) => n.max(1) as u64,
        None => ASSUMED_GAME_LENGTH_PLIES
            .saturating_sub(ply_count as u64)
            .max(MIN_ASSUMED_MOVES_TO_GO),
    };
    let per_move = time / moves_to_go + inc;
    Some(Duration::from_millis(per_move.max(20)))
}

/// The root's legal moves, generated pseudo-legally and filtered for king safety.
/// Used both to pick a fallback move and to re-verify a search result before it
/// is ever emitted as `bestmove`.
fn root_legal_moves(pos: &Position) -> Vec<Move> {
    let side = pos.side_to_move();
    let other = side.toggle();
    let mut scratch = pos.clone();
    let mut legal_moves = Vec::new();
    for mv in movegen::generate(pos, false) {
        let info = scratch.apply(mv);
        if !movegen::is_square_attacked(&scratch, scratch.king_coord(side), other) {
            legal_moves.push(mv);
        }
        scratch.unapply(mv, info);
    }
    legal_moves
}

fn random_legal_move(legal_moves: &[Move]) -> Move {
    use rand::seq::SliceRandom;
    legal_moves
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_else(Move::null)
}

/// Used only when the search was cancelled before completing even depth 1 (a
/// `stop` sent immediately after `go`). Picks a random legal move rather than
/// returning a null move, since some GUIs treat a null `bestmove` as a
/// protocol violation.
fn fallback_move(pos: &Position) -> Move {
    random_legal_move(&root_legal_moves(pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn go_with_movetime_returns_a_legal_move() {
        let driver = Driver::new(EngineConfig::default());
        let pos = Position::startpos();
        let stop = Arc::new(AtomicBool::new(false));
        let mv = driver.go(
            &pos,
            GoOptions {
                movetime: Some(50),
                ..Default::default()
            },
            stop,
            |_| {},
        );
        assert!(!mv.is_null());
    }

    #[test]
    fn fallback_move_is_legal_when_search_never_runs() {
        let pos = Position::startpos();
        let mv = fallback_move(&pos);
        assert!(!mv.is_null());
    }

    #[test]
    fn time_budget_honors_explicit_movetime() {
        let opts = GoOptions {
            movetime: Some(250),
            ..Default::default()
        };
        let budget = compute_time_budget(Color::White, &opts, 0).unwrap();
        assert_eq!(budget, Duration::from_millis(250));
    }

    #[test]
    fn time_budget_divides_remaining_clock_by_movestogo() {
        let opts = GoOptions {
            wtime: Some(60_000),
            movestogo: Some(30),
            ..Default::default()
        };
        let budget = compute_time_budget(Color::White, &opts, 0).unwrap();
        assert_eq!(budget, Duration::from_millis(2000));
    }

    #[test]
    fn time_budget_falls_back_to_a_ply_based_divisor_without_movestogo() {
        let opts = GoOptions {
            wtime: Some(60_000),
            ..Default::default()
        };
        // 70 - 40 == 30 moves assumed remaining.
        let budget = compute_time_budget(Color::White, &opts, 40).unwrap();
        assert_eq!(budget, Duration::from_millis(2000));
    }

    #[test]
    fn time_budget_floors_the_ply_based_divisor_late_in_the_game() {
        let opts = GoOptions {
            wtime: Some(10_000),
            ..Default::default()
        };
        // 70 - 200 saturates to 0, floored to MIN_ASSUMED_MOVES_TO_GO (10).
        let budget = compute_time_budget(Color::White, &opts, 200).unwrap();
        assert_eq!(budget, Duration::from_millis(1000));
    }

    #[test]
    fn time_budget_uses_a_fixed_fraction_when_time_is_low() {
        let opts = GoOptions {
            wtime: Some(500),
            movestogo: Some(30),
            ..Default::default()
        };
        let budget = compute_time_budget(Color::White, &opts, 0).unwrap();
        assert_eq!(budget, Duration::from_millis(25));
    }

    #[test]
    fn search_result_is_always_a_root_legal_move() {
        let driver = Driver::new(EngineConfig::default());
        let pos = Position::startpos();
        let stop = Arc::new(AtomicBool::new(false));
        let mv = driver.go(
            &pos,
            GoOptions {
                movetime: Some(50),
                ..Default::default()
            },
            stop,
            |_| {},
        );
        assert!(root_legal_moves(&pos).contains(&mv));
    }
}
