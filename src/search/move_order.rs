// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Move ordering: the transposition-table move first, if present, then captures
//! sorted by MVV/LVA (most valuable victim, least valuable attacker), then quiet
//! moves in generation order.

use crate::core::{Move, PieceKind};
use crate::position::Position;

fn attacker_value(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Pawn => 1,
        PieceKind::Knight => 3,
        PieceKind::Bishop => 3,
        PieceKind::Rook => 5,
        PieceKind::Queen => 9,
        PieceKind::King => 20,
    }
}

fn victim_value(kind: PieceKind) -> i32 {
    attacker_value(kind)
}

/// `(victim << 2) - attacker`, descending: a cheap way to prefer capturing a high
/// value piece with a low value piece, without the cost of full static exchange
/// evaluation. `attacker` is the kind of the piece making the move, not the
/// promotion target, since a pawn promoting by capture is still a pawn doing the
/// attacking until the capture resolves.
fn mvv_lva_key(mv: Move, attacker: PieceKind) -> i32 {
    let victim = mv.captured.map(|p| victim_value(p.kind)).unwrap_or(0);
    (victim << 2) - attacker_value(attacker)
}

/// Orders `moves` in place: the TT hint move (if it appears in the list) first,
/// then captures by descending MVV/LVA key, then quiet moves. `pos` must be the
/// position the moves were generated from, and not yet have any of them applied,
/// since the mover's kind is looked up from the board rather than carried on `Move`.
pub fn order_moves(moves: &mut [Move], pos: &Position, tt_move: Option<Move>) {
    moves.sort_by(|a, b| {
        let a_key = ranking_key(*a, pos, tt_move);
        let b_key = ranking_key(*b, pos, tt_move);
        b_key.cmp(&a_key)
    });
}

fn ranking_key(mv: Move, pos: &Position, tt_move: Option<Move>) -> i64 {
    if Some(mv) == tt_move {
        return i64::MAX;
    }
    if mv.is_capture() {
        let attacker = pos
            .piece_at(mv.from)
            .map(|p| p.kind)
            .unwrap_or(PieceKind::Pawn);
        1_000_000 + mvv_lva_key(mv, attacker) as i64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Color, Coord, Piece};

    fn capture(victim: PieceKind) -> Move {
        Move::capture(
            Coord::new(0, 0),
            Coord::new(1, 1),
            Piece::new(Color::Black, victim),
        )
    }

    fn pos_with_white_piece_on_a1(kind: PieceKind) -> Position {
        let letter = Piece::new(Color::White, kind).to_string();
        let fen = format!("8/8/8/8/8/8/8/{}7 w - - 0 1", letter);
        Position::from_fen(&fen).unwrap()
    }

    #[test]
    fn captures_sort_ahead_of_quiet_moves() {
        let pos = pos_with_white_piece_on_a1(PieceKind::Queen);
        let mut moves = vec![
            Move::quiet(Coord::new(2, 2), Coord::new(2, 3)),
            capture(PieceKind::Queen),
        ];
        order_moves(&mut moves, &pos, None);
        assert!(moves[0].is_capture());
    }

    #[test]
    fn higher_value_captures_sort_first() {
        let pos = pos_with_white_piece_on_a1(PieceKind::Queen);
        let mut moves = vec![capture(PieceKind::Pawn), capture(PieceKind::Queen)];
        order_moves(&mut moves, &pos, None);
        assert_eq!(moves[0].captured.unwrap().kind, PieceKind::Queen);
    }

    #[test]
    fn cheaper_attacker_sorts_first_against_an_equal_victim() {
        // A rook and a queen, both able to capture the same victim: the rook
        // should be preferred since it is the less valuable attacker.
        let fen = "8/8/8/8/8/8/8/Q6R w - - 0 1";
        let pos = Position::from_fen(fen).unwrap();
        let queen_capture = Move::capture(
            Coord::new(0, 0),
            Coord::new(1, 1),
            Piece::new(Color::Black, PieceKind::Knight),
        );
        let rook_capture = Move::capture(
            Coord::new(7, 0),
            Coord::new(1, 1),
            Piece::new(Color::Black, PieceKind::Knight),
        );
        let mut moves = vec![queen_capture, rook_capture];
        order_moves(&mut moves, &pos, None);
        assert_eq!(moves[0], rook_capture);
    }

    #[test]
    fn tt_move_always_sorts_first() {
        let pos = pos_with_white_piece_on_a1(PieceKind::Queen);
        let queen_capture = capture(PieceKind::Queen);
        let hint = Move::quiet(Coord::new(4, 4), Coord::new(4, 5));
        let mut moves = vec![queen_capture, hint];
        order_moves(&mut moves, &pos, Some(hint));
        assert_eq!(moves[0], hint);
    }
}
