// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Negamax alpha-beta search with quiescence, transposition-table probing and
//! storing, MVV/LVA move ordering, and a one-shot check extension. Iterative
//! deepening and the time budget that bounds it live one layer up, in
//! `driver.rs`: this module searches a single fixed depth and returns as soon as
//! it is asked to stop.

pub mod move_order;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::core::Move;
use crate::eval::{evaluate, score::MATE};
use crate::movegen;
use crate::position::Position;
use crate::table::{BoundType, Entry, Table};

/// Centiply threshold at which an accumulated check extension is consumed,
/// expressed in the same units the original engine used (100 centiplies == one
/// additional ply). Extensions are granted at most once per branch and only
/// near the leaves (`depth <= CHECK_EXTENSION_MAX_DEPTH`); deep, repeated
/// checks in the middle of a line do not keep extending the search.
const CHECK_EXTENSION_CENTIPLY: i32 = 100;
const CHECK_EXTENSION_MAX_DEPTH: i32 = 2;

const NODE_CHECK_INTERVAL: u64 = 2048;

#[derive(Debug, Default, Clone, Copy)]
pub struct SearchStats {
    pub nodes: u64,
    pub qnodes: u64,
    pub qnode_aborts: u64,
    pub tt_probes: u64,
    pub tt_hits: u64,
    pub tt_stores: u64,
}

/// Per-search configuration threaded down from `driver.rs`. Borrowed rather than
/// owned: the table and cancellation flag outlive any one fixed-depth search and
/// are shared across the whole iterative-deepening run.
pub struct SearchContext<'a> {
    pub table: &'a Table,
    pub hard_stop: &'a AtomicBool,
    pub node_limit: Option<u64>,
    pub deadline: Option<Instant>,
    pub quiescence_ply_floor: i32,
    /// The ply clock to stamp every stored entry with, for staleness-based
    /// replacement across searches.
    pub game_ply: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchResult {
    pub best_move: Move,
    pub best_score: i32,
    pub stats: SearchStats,
}

struct Searcher<'ctx, 'a> {
    ctx: &'ctx SearchContext<'a>,
    stats: SearchStats,
    stopped: bool,
}

impl<'ctx, 'a> Searcher<'ctx, 'a> {
    fn new(ctx: &'ctx SearchContext<'a>) -> Searcher<'ctx, 'a> {
        Searcher {
            ctx,
            stats: SearchStats::default(),
            stopped: false,
        }
    }

    fn should_stop(&mut self) -> bool {
        if self.stopped {
            return true;
        }
        if self.stats.nodes % NODE_CHECK_INTERVAL == 0 {
            if self.ctx.hard_stop.load(Ordering::Acquire) {
                self.stopped = true;
            } else if let Some(deadline) = self.ctx.deadline {
                if Instant::now() >= deadline {
                    self.stopped = true;
                }
            } else if let Some(limit) = self.ctx.node_limit {
                if self.stats.nodes >= limit {
                    self.stopped = true;
                }
            }
        }
        self.stopped
    }

    /// Probes the table for `key`. `quiescence` must match whether the caller is a
    /// quiescence node or a full-width node: an entry from the other family is
    /// still returned as a move-ordering hint, but never trusted for a cutoff,
    /// since the two searches bound the score over different move sets.
    fn probe_tt(
        &mut self,
        key: u64,
        alpha: i32,
        beta: i32,
        depth: i32,
        quiescence: bool,
    ) -> (Option<Move>, Option<i32>) {
        self.stats.tt_probes += 1;
        let Some(entry) = self.ctx.table.probe(key) else {
            return (None, None);
        };
        self.stats.tt_hits += 1;
        let tt_move = if entry.best_move.is_null() {
            None
        } else {
            Some(entry.best_move)
        };
        if entry.bound_type.is_quiescence() != quiescence || entry.depth < depth {
            return (tt_move, None);
        }
        let cutoff = match entry.bound_type {
            BoundType::Exact | BoundType::QExact => Some(entry.score),
            BoundType::Lower | BoundType::QLower if entry.score >= beta => Some(entry.score),
            BoundType::Upper | BoundType::QUpper if entry.score <= alpha => Some(entry.score),
            _ => None,
        };
        (tt_move, cutoff)
    }

    fn store_tt(&mut self, key: u64, best_move: Move, score: i32, bound_type: BoundType, depth: i32) {
        self.stats.tt_stores += 1;
        self.ctx.table.store(Entry {
            key,
            best_move,
            score,
            bound_type,
            depth,
            last_access_game_ply: self.ctx.game_ply,
        });
    }

    fn legal_moves(&self, pos: &mut Position, captures_only: bool) -> Vec<Move> {
        let side = pos.side_to_move();
        let other = side.toggle();
        let pseudo = movegen::generate(pos, captures_only);
        let mut legal = Vec::with_capacity(pseudo.len());
        for mv in pseudo {
            let info = pos.apply(mv);
            if !movegen::is_square_attacked(pos, pos.king_coord(side), other) {
                legal.push(mv);
            }
            pos.unapply(mv, info);
        }
        legal
    }

    fn is_in_check(&self, pos: &Position) -> bool {
        let side = pos.side_to_move();
        movegen::is_square_attacked(pos, pos.king_coord(side), side.toggle())
    }

    fn negamax(
        &mut self,
        pos: &mut Position,
        mut alpha: i32,
        beta: i32,
        mut depth: i32,
        mut extension_centiply: i32,
        mut allow_extensions: bool,
    ) -> i32 {
        self.stats.nodes += 1;
        if self.should_stop() {
            return alpha;
        }

        let in_check = self.is_in_check(pos);
        if in_check && allow_extensions && depth <= CHECK_EXTENSION_MAX_DEPTH {
            extension_centiply += CHECK_EXTENSION_CENTIPLY;
            if extension_centiply >= CHECK_EXTENSION_CENTIPLY {
                depth += 1;
                allow_extensions = false;
            }
        }

        if depth <= 0 {
            return self.quiesce(pos, alpha, beta, 0);
        }

        let key = pos.zobrist_hash();
        let (tt_move, cutoff) = self.probe_tt(key, alpha, beta, depth, false);
        if let Some(score) = cutoff {
            return score;
        }

        let mut moves = self.legal_moves(pos, false);
        if moves.is_empty() {
            return if in_check { MATE } else { 0 };
        }
        move_order::order_moves(&mut moves, pos, tt_move);

        let original_alpha = alpha;
        let mut best_move = moves[0];
        let mut best_score = i32::MIN;

        for mv in moves {
            let info = pos.apply(mv);
            let score = -self.negamax(
                pos,
                -beta,
                -alpha,
                depth - 1,
                extension_centiply,
                allow_extensions,
            );
            pos.unapply(mv, info);

            if self.stopped {
                return alpha;
            }

            if score > best_score {
                best_score = score;
                best_move = mv;
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                self.store_tt(key, mv, beta, BoundType::Lower, depth);
                return beta;
            }
        }

        let bound_type = if best_score <= original_alpha {
            BoundType::Upper
        } else {
            BoundType::Exact
        };
        self.store_tt(key, best_move, best_score, bound_type, depth);
        best_score
    }

    fn quiesce(&mut self, pos: &mut Position, mut alpha: i32, beta: i32, qply: i32) -> i32 {
        self.stats.qnodes += 1;
        if self.should_stop() {
            return alpha;
        }

        if qply < self.ctx.quiescence_ply_floor {
            self.stats.qnode_aborts += 1;
            return evaluate(pos);
        }

        // TT depth for a quiescence node is how many captures deep it has already
        // resolved, not how many remain; it grows as qply falls, so a stored entry
        // is trustworthy for any request at the same or shallower qply.
        let tt_depth = -qply;
        let key = pos.zobrist_hash();
        let (tt_move, cutoff) = self.probe_tt(key, alpha, beta, tt_depth, true);
        if let Some(score) = cutoff {
            return score;
        }

        let stand_pat = evaluate(pos);
        if stand_pat >= beta {
            self.store_tt(key, Move::null(), beta, BoundType::QLower, tt_depth);
            return beta;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let mut captures = self.legal_moves(pos, true);
        move_order::order_moves(&mut captures, pos, tt_move);

        let original_alpha = alpha;
        let mut best_move = tt_move.unwrap_or_else(Move::null);

        for mv in captures {
            let info = pos.apply(mv);
            let score = -self.quiesce(pos, -beta, -alpha, qply - 1);
            pos.unapply(mv, info);

            if self.stopped {
                return alpha;
            }

            if score >= beta {
                self.store_tt(key, mv, beta, BoundType::QLower, tt_depth);
                return beta;
            }
            if score > alpha {
                alpha = score;
                best_move = mv;
            }
        }

        let bound_type = if alpha > original_alpha {
            BoundType::QExact
        } else {
            BoundType::QUpper
        };
        self.store_tt(key, best_move, alpha, bound_type, tt_depth);
        alpha
    }

    fn search_root(&mut self, pos: &mut Position, depth: u32) -> SearchResult {
        let mut alpha = MATE;
        let beta = -MATE;
        let mut best_move = Move::null();
        let mut best_score = alpha;
        let mut seen_any = false;

        let key = pos.zobrist_hash();
        let (tt_move, _) = self.probe_tt(key, alpha, beta, 0, false);
        let mut moves = self.legal_moves(pos, false);
        move_order::order_moves(&mut moves, pos, tt_move);

        for mv in moves {
            let info = pos.apply(mv);
            let score = -self.negamax(pos, -beta, -alpha, depth as i32 - 1, 0, true);
            pos.unapply(mv, info);

            if score > best_score || !seen_any {
                best_score = score;
                best_move = mv;
                seen_any = true;
            }
            if score > alpha {
                alpha = score;
            }
            if self.stopped {
                break;
            }
        }

        if !best_move.is_null() {
            self.store_tt(key, best_move, best_score, BoundType::Exact, depth as i32);
        }

        SearchResult {
            best_move,
            best_score,
            stats: self.stats,
        }
    }
}

/// Searches `pos` to a fixed `depth`, honoring `ctx`'s cancellation flag, node
/// limit, and deadline. Returns as soon as a termination condition is hit, with
/// whatever root move currently looks best.
pub fn search_at_depth(pos: &Position, depth: u32, ctx: &SearchContext) -> SearchResult {
    let mut scratch = pos.clone();
    Searcher::new(ctx).search_root(&mut scratch, depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::sync::atomic::AtomicBool;

    fn ctx<'a>(table: &'a Table, flag: &'a AtomicBool) -> SearchContext<'a> {
        let cfg = EngineConfig::default();
        SearchContext {
            table,
            hard_stop: flag,
            node_limit: None,
            deadline: None,
            quiescence_ply_floor: cfg.quiescence_ply_floor,
            game_ply: 0,
        }
    }

    #[test]
    fn finds_mate_in_one() {
        let pos = Position::from_fen("6k1/5ppp/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        let table = Table::with_size_mb(1);
        let flag = AtomicBool::new(false);
        let result = search_at_depth(&pos, 3, &ctx(&table, &flag));
        assert!(result.best_score >= 9000 || result.best_score == -MATE);
    }

    #[test]
    fn avoids_stalemating_when_a_winning_move_exists() {
        // White to move, up a rook, must not play a move that stalemates black.
        let pos = Position::from_fen("7k/8/6K1/8/8/8/8/R7 w - - 0 1").unwrap();
        let table = Table::with_size_mb(1);
        let flag = AtomicBool::new(false);
        let result = search_at_depth(&pos, 2, &ctx(&table, &flag));
        assert!(!result.best_move.is_null());
    }

    #[test]
    fn returns_zero_on_stalemate_position() {
        let pos = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let table = Table::with_size_mb(1);
        let flag = AtomicBool::new(false);
        let mut scratch = pos.clone();
        let search_ctx = ctx(&table, &flag);
        let mut searcher = Searcher::new(&search_ctx);
        let score = searcher.negamax(&mut scratch, MATE, -MATE, 1, 0, true);
        assert_eq!(score, 0);
    }

    #[test]
    fn quiescence_nodes_populate_the_transposition_table() {
        let pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/Pp2P3/2N2Q1p/1PPBBPPP/R3K2R b KQkq a3 0 1",
        )
        .unwrap();
        let table = Table::with_size_mb(1);
        let flag = AtomicBool::new(false);
        let mut scratch = pos.clone();
        let search_ctx = ctx(&table, &flag);
        let mut searcher = Searcher::new(&search_ctx);
        searcher.quiesce(&mut scratch, MATE, -MATE, 0);
        assert!(searcher.stats.tt_stores > 0);
    }

    #[test]
    fn respects_a_hard_stop_flag() {
        let pos = Position::startpos();
        let table = Table::with_size_mb(1);
        let flag = AtomicBool::new(true);
        let result = search_at_depth(&pos, 5, &ctx(&table, &flag));
        // With hard_stop already set, the root loop still evaluates whichever
        // move it started with before observing the flag.
        assert!(!result.best_move.is_null());
    }
}
