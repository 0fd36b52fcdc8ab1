// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::convert::TryFrom;
use std::fmt;

use bitflags::bitflags;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0:?} is not a valid square in algebraic notation")]
pub struct CoordParseError(pub String);

#[derive(Debug, Error)]
#[error("{0:?} is not a valid file letter")]
pub struct FileParseError(pub char);

#[derive(Debug, Error)]
#[error("{0:?} is not a valid rank digit")]
pub struct RankParseError(pub char);

#[derive(Debug, Error)]
#[error("{0:?} is not a valid piece letter")]
pub struct PieceParseError(pub char);

/// A file, `0` is the `a`-file and `7` is the `h`-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct File(pub u8);

impl TryFrom<char> for File {
    type Error = FileParseError;

    fn try_from(c: char) -> Result<File, FileParseError> {
        match c {
            'a'..='h' => Ok(File(c as u8 - b'a')),
            _ => Err(FileParseError(c)),
        }
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", (b'a' + self.0) as char)
    }
}

/// A rank, `0` is White's back rank and `7` is Black's back rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rank(pub u8);

impl TryFrom<char> for Rank {
    type Error = RankParseError;

    fn try_from(c: char) -> Result<Rank, RankParseError> {
        match c {
            '1'..='8' => Ok(Rank(c as u8 - b'1')),
            _ => Err(RankParseError(c)),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 + 1)
    }
}

/// A square on the board, addressed by `(column, row)`. Column 0 is the `a`-file,
/// row 0 is White's back rank. This is the coordinate pair the board array, move
/// generator, and evaluator all index with directly; there is no packed encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub col: u8,
    pub row: u8,
}

impl Coord {
    pub const fn new(col: u8, row: u8) -> Coord {
        Coord { col, row }
    }

    pub fn in_bounds(col: i32, row: i32) -> bool {
        (0..8).contains(&col) && (0..8).contains(&row)
    }

    pub fn offset(self, dcol: i32, drow: i32) -> Option<Coord> {
        let col = self.col as i32 + dcol;
        let row = self.row as i32 + drow;
        if Coord::in_bounds(col, row) {
            Some(Coord::new(col as u8, row as u8))
        } else {
            None
        }
    }

    pub fn file(self) -> File {
        File(self.col)
    }

    pub fn rank(self) -> Rank {
        Rank(self.row)
    }
}

impl TryFrom<&str> for Coord {
    type Error = CoordParseError;

    fn try_from(s: &str) -> Result<Coord, CoordParseError> {
        let mut chars = s.chars();
        let (Some(file_ch), Some(rank_ch), None) = (chars.next(), chars.next(), chars.next())
        else {
            return Err(CoordParseError(s.to_owned()));
        };
        let file = File::try_from(file_ch).map_err(|_| CoordParseError(s.to_owned()))?;
        let rank = Rank::try_from(rank_ch).map_err(|_| CoordParseError(s.to_owned()))?;
        Ok(Coord::new(file.0, rank.0))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn toggle(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// The row index of this color's back rank.
    pub fn back_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// The direction (in row delta) that this color's pawns advance.
    pub fn pawn_direction(self) -> i32 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };
        write!(f, "{}", c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub const fn new(color: Color, kind: PieceKind) -> Piece {
        Piece { color, kind }
    }
}

impl TryFrom<char> for Piece {
    type Error = PieceParseError;

    fn try_from(c: char) -> Result<Piece, PieceParseError> {
        let kind = match c.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return Err(PieceParseError(c)),
        };
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Ok(Piece::new(color, kind))
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.kind.to_string();
        match self.color {
            Color::White => write!(f, "{}", s.to_uppercase()),
            Color::Black => write!(f, "{}", s),
        }
    }
}

/// Which side a castling move is performed towards. `None` marks a non-castling move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastleSide {
    None,
    Kingside,
    Queenside,
}

bitflags! {
    /// The castling rights currently held by both sides. This is a compact summary used
    /// for FEN formatting; `Position` separately tracks the ply on which each right was
    /// lost so that `unapply` can restore rights exactly.
    #[derive(Default)]
    pub struct CastleRights: u8 {
        const WHITE_KINGSIDE  = 0b0001;
        const WHITE_QUEENSIDE = 0b0010;
        const BLACK_KINGSIDE  = 0b0100;
        const BLACK_QUEENSIDE = 0b1000;
    }
}

impl CastleRights {
    pub fn kingside(color: Color) -> CastleRights {
        match color {
            Color::White => CastleRights::WHITE_KINGSIDE,
            Color::Black => CastleRights::BLACK_KINGSIDE,
        }
    }

    pub fn queenside(color: Color) -> CastleRights {
        match color {
            Color::White => CastleRights::WHITE_QUEENSIDE,
            Color::Black => CastleRights::BLACK_QUEENSIDE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_round_trips_through_algebraic_notation() {
        let c = Coord::try_from("e4").unwrap();
        assert_eq!(c, Coord::new(4, 3));
        assert_eq!(c.to_string(), "e4");
    }

    #[test]
    fn coord_rejects_out_of_range_notation() {
        assert!(Coord::try_from("i9").is_err());
        assert!(Coord::try_from("a").is_err());
    }

    #[test]
    fn piece_display_matches_fen_case_convention() {
        let white_knight = Piece::new(Color::White, PieceKind::Knight);
        let black_knight = Piece::new(Color::Black, PieceKind::Knight);
        assert_eq!(white_knight.to_string(), "N");
        assert_eq!(black_knight.to_string(), "n");
    }

    #[test]
    fn piece_parses_from_fen_letter() {
        assert_eq!(
            Piece::try_from('Q').unwrap(),
            Piece::new(Color::White, PieceKind::Queen)
        );
        assert_eq!(
            Piece::try_from('q').unwrap(),
            Piece::new(Color::Black, PieceKind::Queen)
        );
        assert!(Piece::try_from('x').is_err());
    }

    #[test]
    fn color_toggle_is_involutive() {
        assert_eq!(Color::White.toggle().toggle(), Color::White);
    }
}
