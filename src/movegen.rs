// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Pseudo-legal move generation and the `is_square_attacked` ray-scan predicate it
//! shares with castling-path safety checks. Legality (own-king safety) is not
//! filtered here: the caller applies a candidate move, tests
//! `is_square_attacked(king, other_side)`, and unapplies if it was illegal. An
//! earlier revision of this generator had a cheaper incremental "does this move
//! put my own king in check" fast path; it had a known bug and is not resurrected
//! here, since the full re-scan is never wrong.

use crate::core::{CastleSide, Color, Coord, Move, Piece, PieceKind};
use crate::position::Position;

const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (1, 2), (2, 1), (2, -1), (1, -2),
    (-1, -2), (-2, -1), (-2, 1), (-1, 2),
];

const KING_OFFSETS: [(i32, i32); 8] = [
    (1, 0), (1, 1), (0, 1), (-1, 1),
    (-1, 0), (-1, -1), (0, -1), (1, -1),
];

const BISHOP_DIRECTIONS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ROOK_DIRECTIONS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Generates all pseudo-legal moves for the side to move. When `captures_only` is
/// set, only captures and promotions to a capturing or promoting square are
/// generated — used by quiescence search.
pub fn generate(pos: &Position, captures_only: bool) -> Vec<Move> {
    let mut moves = Vec::with_capacity(48);
    let side = pos.side_to_move();
    for col in 0..8u8 {
        for row in 0..8u8 {
            let coord = Coord::new(col, row);
            let Some(piece) = pos.piece_at(coord) else {
                continue;
            };
            if piece.color != side {
                continue;
            }
            match piece.kind {
                PieceKind::Pawn => generate_pawn_moves(pos, coord, piece, captures_only, &mut moves),
                PieceKind::Knight => {
                    generate_offset_moves(pos, coord, piece, &KNIGHT_OFFSETS, captures_only, &mut moves)
                }
                PieceKind::King => {
                    generate_offset_moves(pos, coord, piece, &KING_OFFSETS, captures_only, &mut moves);
                    if !captures_only {
                        generate_castles(pos, coord, piece, &mut moves);
                    }
                }
                PieceKind::Bishop => {
                    generate_slides(pos, coord, piece, &BISHOP_DIRECTIONS, captures_only, &mut moves)
                }
                PieceKind::Rook => {
                    generate_slides(pos, coord, piece, &ROOK_DIRECTIONS, captures_only, &mut moves)
                }
                PieceKind::Queen => {
                    generate_slides(pos, coord, piece, &BISHOP_DIRECTIONS, captures_only, &mut moves);
                    generate_slides(pos, coord, piece, &ROOK_DIRECTIONS, captures_only, &mut moves);
                }
            }
        }
    }
    moves
}

const PROMOTION_KINDS: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

fn push_pawn_move(
    from: Coord,
    to: Coord,
    captured: Option<Piece>,
    is_promotion: bool,
    moves: &mut Vec<Move>,
) {
    if is_promotion {
        for kind in PROMOTION_KINDS {
            moves.push(match captured {
                Some(c) => Move::promotion_capture(from, to, c, kind),
                None => Move::promotion(from, to, kind),
            });
        }
    } else {
        moves.push(match captured {
            Some(c) => Move::capture(from, to, c),
            None => Move::quiet(from, to),
        });
    }
}

fn generate_pawn_moves(
    pos: &Position,
    from: Coord,
    piece: Piece,
    captures_only: bool,
    moves: &mut Vec<Move>,
) {
    let dir = piece.color.pawn_direction();
    let promotion_row = piece.color.toggle().back_rank();

    if !captures_only {
        if let Some(one) = from.offset(0, dir) {
            if pos.piece_at(one).is_none() {
                let is_promo = one.row == promotion_row;
                push_pawn_move(from, one, None, is_promo, moves);

                let start_row = match piece.color {
                    Color::White => 1,
                    Color::Black => 6,
                };
                if from.row == start_row {
                    if let Some(two) = from.offset(0, dir * 2) {
                        if pos.piece_at(two).is_none() {
                            moves.push(Move::quiet(from, two));
                        }
                    }
                }
            }
        }
    }

    for dc in [-1, 1] {
        let Some(to) = from.offset(dc, dir) else {
            continue;
        };
        if let Some(target) = pos.piece_at(to) {
            if target.color != piece.color {
                let is_promo = to.row == promotion_row;
                push_pawn_move(from, to, Some(target), is_promo, moves);
            }
        }
    }
}

fn generate_offset_moves(
    pos: &Position,
    from: Coord,
    piece: Piece,
    offsets: &[(i32, i32)],
    captures_only: bool,
    moves: &mut Vec<Move>,
) {
    for &(dc, dr) in offsets {
        let Some(to) = from.offset(dc, dr) else {
            continue;
        };
        match pos.piece_at(to) {
            Some(target) if target.color != piece.color => {
                moves.push(Move::capture(from, to, target));
            }
            Some(_) => {}
            None if !captures_only => moves.push(Move::quiet(from, to)),
            None => {}
        }
    }
}

fn generate_slides(
    pos: &Position,
    from: Coord,
    piece: Piece,
    directions: &[(i32, i32)],
    captures_only: bool,
    moves: &mut Vec<Move>,
) {
    for &(dc, dr) in directions {
        let mut current = from;
        loop {
            let Some(to) = current.offset(dc, dr) else {
                break;
            };
            match pos.piece_at(to) {
                Some(target) => {
                    if target.color != piece.color {
                        moves.push(Move::capture(from, to, target));
                    }
                    break;
                }
                None => {
                    if !captures_only {
                        moves.push(Move::quiet(from, to));
                    }
                    current = to;
                }
            }
        }
    }
}

fn generate_castles(pos: &Position, king_from: Coord, king: Piece, moves: &mut Vec<Move>) {
    let color = king.color;
    let row = color.back_rank();
    let other_side = color.toggle();

    if pos.has_kingside_right(color)
        && pos.piece_at(Coord::new(5, row)).is_none()
        && pos.piece_at(Coord::new(6, row)).is_none()
        && !is_square_attacked(pos, Coord::new(4, row), other_side)
        && !is_square_attacked(pos, Coord::new(5, row), other_side)
        && !is_square_attacked(pos, Coord::new(6, row), other_side)
    {
        moves.push(Move::castle(king_from, Coord::new(6, row), CastleSide::Kingside));
    }

    if pos.has_queenside_right(color)
        && pos.piece_at(Coord::new(1, row)).is_none()
        && pos.piece_at(Coord::new(2, row)).is_none()
        && pos.piece_at(Coord::new(3, row)).is_none()
        && !is_square_attacked(pos, Coord::new(4, row), other_side)
        && !is_square_attacked(pos, Coord::new(3, row), other_side)
        && !is_square_attacked(pos, Coord::new(2, row), other_side)
    {
        moves.push(Move::castle(
            king_from,
            Coord::new(2, row),
            CastleSide::Queenside,
        ));
    }
}

/// True if any piece of `by_color` attacks `target`. Implemented as a ray/offset
/// scan outward from `target` rather than a forward scan of every piece, so it can
/// be called cheaply for both check detection and castling-path safety.
pub fn is_square_attacked(pos: &Position, target: Coord, by_color: Color) -> bool {
    for &(dc, dr) in &KNIGHT_OFFSETS {
        if let Some(from) = target.offset(dc, dr) {
            if matches!(pos.piece_at(from), Some(p) if p.color == by_color && p.kind == PieceKind::Knight)
            {
                return true;
            }
        }
    }

    for &(dc, dr) in &KING_OFFSETS {
        if let Some(from) = target.offset(dc, dr) {
            if matches!(pos.piece_at(from), Some(p) if p.color == by_color && p.kind == PieceKind::King) {
                return true;
            }
        }
    }

    // Pawns attack diagonally towards the target from the opposite direction they push.
    let pawn_dir = by_color.pawn_direction();
    for dc in [-1, 1] {
        if let Some(from) = target.offset(dc, -pawn_dir) {
            if matches!(pos.piece_at(from), Some(p) if p.color == by_color && p.kind == PieceKind::Pawn) {
                return true;
            }
        }
    }

    for &(dc, dr) in &BISHOP_DIRECTIONS {
        if ray_attacked(pos, target, by_color, dc, dr, &[PieceKind::Bishop, PieceKind::Queen]) {
            return true;
        }
    }
    for &(dc, dr) in &ROOK_DIRECTIONS {
        if ray_attacked(pos, target, by_color, dc, dr, &[PieceKind::Rook, PieceKind::Queen]) {
            return true;
        }
    }

    false
}

fn ray_attacked(
    pos: &Position,
    target: Coord,
    by_color: Color,
    dc: i32,
    dr: i32,
    kinds: &[PieceKind],
) -> bool {
    let mut current = target;
    while let Some(next) = current.offset(dc, dr) {
        match pos.piece_at(next) {
            Some(piece) => {
                return piece.color == by_color && kinds.contains(&piece.kind);
            }
            None => current = next,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perft(pos: &Position, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        let side = pos.side_to_move();
        let mut total = 0;
        for mv in generate(pos, false) {
            let mut next = pos.clone();
            let info = next.apply(mv);
            if !is_square_attacked(&next, next.king_coord(side), next.side_to_move()) {
                total += perft(&next, depth - 1);
            }
            next.unapply(mv, info);
        }
        total
    }

    #[test]
    fn perft_depth_1_from_startpos_is_20() {
        let pos = Position::startpos();
        assert_eq!(perft(&pos, 1), 20);
    }

    #[test]
    fn perft_depth_2_from_startpos_is_400() {
        let pos = Position::startpos();
        assert_eq!(perft(&pos, 2), 400);
    }

    #[test]
    fn perft_depth_3_from_startpos_is_8902() {
        let pos = Position::startpos();
        assert_eq!(perft(&pos, 3), 8902);
    }

    #[test]
    fn perft_depth_1_from_kiwipete_is_48() {
        let pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&pos, 1), 48);
    }

    #[test]
    fn is_square_attacked_detects_a_simple_pawn_check() {
        let pos = Position::from_fen("4k3/8/8/8/8/3p4/8/4K3 b - - 0 1").unwrap();
        assert!(is_square_attacked(&pos, Coord::new(4, 0), Color::Black));
    }

    #[test]
    fn castling_is_blocked_when_the_king_passes_through_check() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/4r3/4K2R w K - 0 1").unwrap();
        let moves = generate(&pos, false);
        assert!(!moves.iter().any(|m| m.is_castle()));
    }
}
