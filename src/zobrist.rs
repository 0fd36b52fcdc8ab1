// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Incremental Zobrist hashing. The key table is the one piece of process-wide
//! global state in the engine: it is immutable once built, seeded deterministically
//! so that perft and search tests are reproducible across runs.

use crate::core::{Color, Piece, PieceKind};

struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    pub const fn new(seed: u64) -> Xorshift64 {
        Xorshift64 { state: seed }
    }

    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        self.state
    }
}

const SQUARE_TABLE_SIZE: usize = 64 * 12;
const SIDE_TO_MOVE_INDEX: usize = SQUARE_TABLE_SIZE;
const CASTLING_RIGHTS_INDEX: usize = SIDE_TO_MOVE_INDEX + 1;
const TABLE_SIZE: usize = CASTLING_RIGHTS_INDEX + 4;

struct ZobristHasher {
    keys: [u64; TABLE_SIZE],
}

impl ZobristHasher {
    pub fn new(seed: u64) -> ZobristHasher {
        let mut rng = Xorshift64::new(seed);
        let mut keys = [0u64; TABLE_SIZE];
        for entry in keys.iter_mut() {
            *entry = rng.next();
        }
        ZobristHasher { keys }
    }

    fn piece_index(kind: PieceKind, color: Color, square_index: usize) -> usize {
        let color_offset = if color == Color::White { 0 } else { 6 };
        let kind_offset = match kind {
            PieceKind::Pawn => 0,
            PieceKind::Knight => 1,
            PieceKind::Bishop => 2,
            PieceKind::Rook => 3,
            PieceKind::Queen => 4,
            PieceKind::King => 5,
        };
        12 * square_index + color_offset + kind_offset
    }

    pub fn square_hash(&self, kind: PieceKind, color: Color, col: u8, row: u8) -> u64 {
        let square_index = row as usize * 8 + col as usize;
        self.keys[Self::piece_index(kind, color, square_index)]
    }

    pub fn side_to_move_hash(&self) -> u64 {
        self.keys[SIDE_TO_MOVE_INDEX]
    }

    fn castle_hash(&self, offset: usize) -> u64 {
        self.keys[CASTLING_RIGHTS_INDEX + offset]
    }
}

const ZOBRIST_SEED: u64 = 0xf68e34a4e8ccf09a;

lazy_static::lazy_static! {
    static ref ZOBRIST_HASHER: ZobristHasher = ZobristHasher::new(ZOBRIST_SEED);
}

pub fn modify_piece(hash: &mut u64, col: u8, row: u8, piece: Piece) {
    *hash ^= ZOBRIST_HASHER.square_hash(piece.kind, piece.color, col, row);
}

pub fn modify_side_to_move(hash: &mut u64) {
    *hash ^= ZOBRIST_HASHER.side_to_move_hash();
}

pub fn modify_kingside_castle(hash: &mut u64, color: Color) {
    let offset = if color == Color::White { 0 } else { 2 };
    *hash ^= ZOBRIST_HASHER.castle_hash(offset);
}

pub fn modify_queenside_castle(hash: &mut u64, color: Color) {
    let offset = if color == Color::White { 1 } else { 3 };
    *hash ^= ZOBRIST_HASHER.castle_hash(offset);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piece_hash_is_deterministic() {
        let mut a = 0u64;
        let mut b = 0u64;
        let piece = Piece::new(Color::White, PieceKind::Knight);
        modify_piece(&mut a, 1, 0, piece);
        modify_piece(&mut b, 1, 0, piece);
        assert_eq!(a, b);
    }

    #[test]
    fn applying_twice_cancels_out() {
        let mut hash = 0x1234u64;
        let piece = Piece::new(Color::Black, PieceKind::Queen);
        modify_piece(&mut hash, 3, 7, piece);
        modify_piece(&mut hash, 3, 7, piece);
        assert_eq!(hash, 0x1234);
    }

    #[test]
    fn distinct_squares_hash_differently() {
        let mut a = 0u64;
        let mut b = 0u64;
        let piece = Piece::new(Color::White, PieceKind::Pawn);
        modify_piece(&mut a, 0, 1, piece);
        modify_piece(&mut b, 0, 2, piece);
        assert_ne!(a, b);
    }

    #[test]
    fn side_to_move_toggle_is_an_involution() {
        let mut hash = 0xabcdu64;
        modify_side_to_move(&mut hash);
        modify_side_to_move(&mut hash);
        assert_eq!(hash, 0xabcd);
    }
}
