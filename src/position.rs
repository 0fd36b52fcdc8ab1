// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The board representation and the mutator (`apply`/`unapply`) that the search
//! walks the game tree with. The board is a plain 8x8 array of optional pieces,
//! not bitboards: `[col][row]`, column 0 is the a-file, row 0 is White's back rank.

use std::convert::TryFrom;
use std::fmt;

use crate::core::{CastleRights, CastleSide, Color, Coord, Piece, PieceKind};
use crate::error::FenParseError;
use crate::zobrist;

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// State captured by `apply` that cannot be recovered from the `Move` alone and
/// must be restored verbatim by the matching `unapply`.
#[derive(Debug, Clone, Copy)]
pub struct UnapplyInfo {
    previous_en_passant_file: Option<u8>,
    previous_halfmove_clock: u32,
    previous_fullmove_number: u32,
}

#[derive(Debug, Clone)]
pub struct Position {
    board: [[Option<Piece>; 8]; 8],
    side_to_move: Color,
    white_kingside_lost_on_ply: Option<u32>,
    white_queenside_lost_on_ply: Option<u32>,
    black_kingside_lost_on_ply: Option<u32>,
    black_queenside_lost_on_ply: Option<u32>,
    en_passant_file: Option<u8>,
    halfmove_clock: u32,
    fullmove_number: u32,
    white_king: Coord,
    black_king: Coord,
    zobrist_hash: u64,
    ply: u32,
}

impl Position {
    pub fn startpos() -> Position {
        Position::from_fen(STARTPOS_FEN).expect("startpos FEN is well-formed")
    }

    pub fn piece_at(&self, coord: Coord) -> Option<Piece> {
        self.board[coord.col as usize][coord.row as usize]
    }

    fn set_piece_at(&mut self, coord: Coord, piece: Option<Piece>) {
        if let Some(p) = self.board[coord.col as usize][coord.row as usize] {
            zobrist::modify_piece(&mut self.zobrist_hash, coord.col, coord.row, p);
        }
        self.board[coord.col as usize][coord.row as usize] = piece;
        if let Some(p) = piece {
            zobrist::modify_piece(&mut self.zobrist_hash, coord.col, coord.row, p);
        }
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn king_coord(&self, color: Color) -> Coord {
        match color {
            Color::White => self.white_king,
            Color::Black => self.black_king,
        }
    }

    pub fn zobrist_hash(&self) -> u64 {
        self.zobrist_hash
    }

    pub fn ply(&self) -> u32 {
        self.ply
    }

    pub fn has_kingside_right(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_kingside_lost_on_ply.is_none(),
            Color::Black => self.black_kingside_lost_on_ply.is_none(),
        }
    }

    pub fn has_queenside_right(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_queenside_lost_on_ply.is_none(),
            Color::Black => self.black_queenside_lost_on_ply.is_none(),
        }
    }

    pub fn castle_rights(&self) -> CastleRights {
        let mut rights = CastleRights::empty();
        if self.has_kingside_right(Color::White) {
            rights |= CastleRights::WHITE_KINGSIDE;
        }
        if self.has_queenside_right(Color::White) {
            rights |= CastleRights::WHITE_QUEENSIDE;
        }
        if self.has_kingside_right(Color::Black) {
            rights |= CastleRights::BLACK_KINGSIDE;
        }
        if self.has_queenside_right(Color::Black) {
            rights |= CastleRights::BLACK_QUEENSIDE;
        }
        rights
    }

    fn lose_kingside_right(&mut self, color: Color) {
        if self.has_kingside_right(color) {
            zobrist::modify_kingside_castle(&mut self.zobrist_hash, color);
            match color {
                Color::White => self.white_kingside_lost_on_ply = Some(self.ply),
                Color::Black => self.black_kingside_lost_on_ply = Some(self.ply),
            }
        }
    }

    fn lose_queenside_right(&mut self, color: Color) {
        if self.has_queenside_right(color) {
            zobrist::modify_queenside_castle(&mut self.zobrist_hash, color);
            match color {
                Color::White => self.white_queenside_lost_on_ply = Some(self.ply),
                Color::Black => self.black_queenside_lost_on_ply = Some(self.ply),
            }
        }
    }

    fn restore_kingside_right(&mut self, color: Color, at_ply: u32) {
        let field = match color {
            Color::White => &mut self.white_kingside_lost_on_ply,
            Color::Black => &mut self.black_kingside_lost_on_ply,
        };
        if *field == Some(at_ply) {
            *field = None;
            zobrist::modify_kingside_castle(&mut self.zobrist_hash, color);
        }
    }

    fn restore_queenside_right(&mut self, color: Color, at_ply: u32) {
        let field = match color {
            Color::White => &mut self.white_queenside_lost_on_ply,
            Color::Black => &mut self.black_queenside_lost_on_ply,
        };
        if *field == Some(at_ply) {
            *field = None;
            zobrist::modify_queenside_castle(&mut self.zobrist_hash, color);
        }
    }

    fn back_rank_rook_coords(color: Color) -> (Coord, Coord) {
        let row = color.back_rank();
        (Coord::new(0, row), Coord::new(7, row))
    }

    /// Applies `mv` to the position, returning the state needed to undo it exactly.
    /// Incrementally maintains the Zobrist hash, cached king coordinates, and
    /// castling rights (recording the ply on which a right is lost so `unapply`
    /// can restore it precisely).
    pub fn apply(&mut self, mv: crate::core::Move) -> UnapplyInfo {
        let moving_ply = self.ply;
        let info = UnapplyInfo {
            previous_en_passant_file: self.en_passant_file,
            previous_halfmove_clock: self.halfmove_clock,
            previous_fullmove_number: self.fullmove_number,
        };

        let moving_color = self.side_to_move;
        let mover = self.piece_at(mv.from).expect("apply: no piece at source square");

        if mv.is_castle() {
            self.apply_castle(mv, moving_color);
        } else {
            self.set_piece_at(mv.from, None);
            let placed = match mv.promote_to {
                Some(kind) => Piece::new(moving_color, kind),
                None => mover,
            };
            self.set_piece_at(mv.to, Some(placed));

            if mover.kind == PieceKind::King {
                match moving_color {
                    Color::White => self.white_king = mv.to,
                    Color::Black => self.black_king = mv.to,
                }
                self.lose_kingside_right(moving_color);
                self.lose_queenside_right(moving_color);
            } else if mover.kind == PieceKind::Rook {
                let (queenside_rook, kingside_rook) = Self::back_rank_rook_coords(moving_color);
                if mv.from == queenside_rook {
                    self.lose_queenside_right(moving_color);
                } else if mv.from == kingside_rook {
                    self.lose_kingside_right(moving_color);
                }
            }

            // A rook captured on its starting square loses that side's rights too,
            // even though the rook's own color never moved.
            if let Some(captured) = mv.captured {
                if captured.kind == PieceKind::Rook {
                    let (queenside_rook, kingside_rook) = Self::back_rank_rook_coords(captured.color);
                    if mv.to == queenside_rook {
                        self.lose_queenside_right(captured.color);
                    } else if mv.to == kingside_rook {
                        self.lose_kingside_right(captured.color);
                    }
                }
            }
        }

        self.en_passant_file = if mover.kind == PieceKind::Pawn && mv.from.row.abs_diff(mv.to.row) == 2
        {
            Some(mv.from.col)
        } else {
            None
        };

        if mover.kind == PieceKind::Pawn || mv.is_capture() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        if moving_color == Color::Black {
            self.fullmove_number += 1;
        }

        zobrist::modify_side_to_move(&mut self.zobrist_hash);
        self.side_to_move = moving_color.toggle();
        self.ply = moving_ply + 1;

        info
    }

    fn apply_castle(&mut self, mv: crate::core::Move, color: Color) {
        let king = self.piece_at(mv.from).expect("apply_castle: no king at source");
        self.set_piece_at(mv.from, None);
        self.set_piece_at(mv.to, Some(king));
        match color {
            Color::White => self.white_king = mv.to,
            Color::Black => self.black_king = mv.to,
        }

        let (rook_from, rook_to) = match mv.castle_side {
            CastleSide::Kingside => (
                Coord::new(7, color.back_rank()),
                Coord::new(5, color.back_rank()),
            ),
            CastleSide::Queenside => (
                Coord::new(0, color.back_rank()),
                Coord::new(3, color.back_rank()),
            ),
            CastleSide::None => unreachable!("apply_castle called with a non-castling move"),
        };
        let rook = self.piece_at(rook_from).expect("apply_castle: no rook at source");
        self.set_piece_at(rook_from, None);
        self.set_piece_at(rook_to, Some(rook));

        self.lose_kingside_right(color);
        self.lose_queenside_right(color);
    }

    /// Reverses `mv`, restoring the board, cached king coordinates, castling
    /// rights, en-passant file, clocks, and side to move to exactly what they
    /// were before the matching `apply`.
    pub fn unapply(&mut self, mv: crate::core::Move, info: UnapplyInfo) {
        zobrist::modify_side_to_move(&mut self.zobrist_hash);
        self.side_to_move = self.side_to_move.toggle();
        self.ply -= 1;
        let moving_color = self.side_to_move;
        let undone_ply = self.ply;

        if mv.is_castle() {
            self.unapply_castle(mv, moving_color);
        } else {
            let mover_kind = if mv.promote_to.is_some() {
                PieceKind::Pawn
            } else {
                self.piece_at(mv.to).expect("unapply: no piece at destination").kind
            };
            self.set_piece_at(mv.to, mv.captured);
            self.set_piece_at(mv.from, Some(Piece::new(moving_color, mover_kind)));

            if mover_kind == PieceKind::King {
                match moving_color {
                    Color::White => self.white_king = mv.from,
                    Color::Black => self.black_king = mv.from,
                }
            }
        }

        self.restore_kingside_right(Color::White, undone_ply);
        self.restore_queenside_right(Color::White, undone_ply);
        self.restore_kingside_right(Color::Black, undone_ply);
        self.restore_queenside_right(Color::Black, undone_ply);
        if let Some(captured) = mv.captured {
            if captured.kind == PieceKind::Rook {
                self.restore_kingside_right(captured.color, undone_ply);
                self.restore_queenside_right(captured.color, undone_ply);
            }
        }

        self.en_passant_file = info.previous_en_passant_file;
        self.halfmove_clock = info.previous_halfmove_clock;
        self.fullmove_number = info.previous_fullmove_number;
    }

    fn unapply_castle(&mut self, mv: crate::core::Move, color: Color) {
        let king = self.piece_at(mv.to).expect("unapply_castle: no king at destination");
        self.set_piece_at(mv.to, None);
        self.set_piece_at(mv.from, Some(king));
        match color {
            Color::White => self.white_king = mv.from,
            Color::Black => self.black_king = mv.from,
        }

        let (rook_from, rook_to) = match mv.castle_side {
            CastleSide::Kingside => (
                Coord::new(7, color.back_rank()),
                Coord::new(5, color.back_rank()),
            ),
            CastleSide::Queenside => (
                Coord::new(0, color.back_rank()),
                Coord::new(3, color.back_rank()),
            ),
            CastleSide::None => unreachable!("unapply_castle called with a non-castling move"),
        };
        let rook = self.piece_at(rook_to).expect("unapply_castle: no rook at destination");
        self.set_piece_at(rook_to, None);
        self.set_piece_at(rook_from, Some(rook));
    }

    pub fn from_fen(fen: &str) -> Result<Position, FenParseError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(FenParseError::WrongFieldCount(fields.len()));
        }

        let mut board = [[None; 8]; 8];
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenParseError::WrongRankCount);
        }
        let mut white_king = None;
        let mut black_king = None;
        for (rank_from_top, rank_str) in ranks.iter().enumerate() {
            let row = 7 - rank_from_top as u8;
            let mut col = 0u8;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    col += skip as u8;
                    continue;
                }
                let piece = Piece::try_from(c)?;
                if piece.kind == PieceKind::King {
                    match piece.color {
                        Color::White => white_king = Some(Coord::new(col, row)),
                        Color::Black => black_king = Some(Coord::new(col, row)),
                    }
                }
                board[col as usize][row as usize] = Some(piece);
                col += 1;
            }
        }

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenParseError::SideToMove(other.to_owned())),
        };

        let mut white_kingside_lost_on_ply = Some(0);
        let mut white_queenside_lost_on_ply = Some(0);
        let mut black_kingside_lost_on_ply = Some(0);
        let mut black_queenside_lost_on_ply = Some(0);
        if fields[3] != "-" {
            for c in fields[3].chars() {
                match c {
                    'K' => white_kingside_lost_on_ply = None,
                    'Q' => white_queenside_lost_on_ply = None,
                    'k' => black_kingside_lost_on_ply = None,
                    'q' => black_queenside_lost_on_ply = None,
                    _ => return Err(FenParseError::CastleRights(fields[3].to_owned())),
                }
            }
        }

        let en_passant_file = match fields[2] {
            "-" => None,
            sq => Some(Coord::try_from(sq)?.col),
        };

        let halfmove_clock: u32 = fields[4].parse().map_err(FenParseError::HalfmoveClock)?;
        let fullmove_number: u32 = fields[5].parse().map_err(FenParseError::HalfmoveClock)?;

        let mut zobrist_hash = 0u64;
        for col in 0..8u8 {
            for row in 0..8u8 {
                if let Some(piece) = board[col as usize][row as usize] {
                    zobrist::modify_piece(&mut zobrist_hash, col, row, piece);
                }
            }
        }
        if white_kingside_lost_on_ply.is_none() {
            zobrist::modify_kingside_castle(&mut zobrist_hash, Color::White);
        }
        if white_queenside_lost_on_ply.is_none() {
            zobrist::modify_queenside_castle(&mut zobrist_hash, Color::White);
        }
        if black_kingside_lost_on_ply.is_none() {
            zobrist::modify_kingside_castle(&mut zobrist_hash, Color::Black);
        }
        if black_queenside_lost_on_ply.is_none() {
            zobrist::modify_queenside_castle(&mut zobrist_hash, Color::Black);
        }
        if side_to_move == Color::Black {
            zobrist::modify_side_to_move(&mut zobrist_hash);
        }

        Ok(Position {
            board,
            side_to_move,
            white_kingside_lost_on_ply,
            white_queenside_lost_on_ply,
            black_kingside_lost_on_ply,
            black_queenside_lost_on_ply,
            en_passant_file,
            halfmove_clock,
            fullmove_number,
            white_king: white_king.expect("FEN must name a white king"),
            black_king: black_king.expect("FEN must name a black king"),
            zobrist_hash,
            ply: 0,
        })
    }

    pub fn as_fen(&self) -> String {
        let mut ranks = Vec::with_capacity(8);
        for row in (0..8u8).rev() {
            let mut rank = String::new();
            let mut empty_run = 0;
            for col in 0..8u8 {
                match self.board[col as usize][row as usize] {
                    Some(piece) => {
                        if empty_run > 0 {
                            rank.push_str(&empty_run.to_string());
                            empty_run = 0;
                        }
                        rank.push_str(&piece.to_string());
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                rank.push_str(&empty_run.to_string());
            }
            ranks.push(rank);
        }
        let board_field = ranks.join("/");

        let side_field = match self.side_to_move {
            Color::White => "w",
            Color::Black => "b",
        };

        let mut castle_field = String::new();
        if self.has_kingside_right(Color::White) {
            castle_field.push('K');
        }
        if self.has_queenside_right(Color::White) {
            castle_field.push('Q');
        }
        if self.has_kingside_right(Color::Black) {
            castle_field.push('k');
        }
        if self.has_queenside_right(Color::Black) {
            castle_field.push('q');
        }
        if castle_field.is_empty() {
            castle_field.push('-');
        }

        let ep_field = match self.en_passant_file {
            Some(col) => {
                let row = if self.side_to_move == Color::White { 5 } else { 2 };
                Coord::new(col, row).to_string()
            }
            None => "-".to_owned(),
        };

        format!(
            "{} {} {} {} {} {}",
            board_field, side_field, castle_field, ep_field, self.halfmove_clock, self.fullmove_number
        )
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..8u8).rev() {
            for col in 0..8u8 {
                let c = match self.board[col as usize][row as usize] {
                    Some(piece) => piece.to_string(),
                    None => ".".to_owned(),
                };
                write!(f, "{} ", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
