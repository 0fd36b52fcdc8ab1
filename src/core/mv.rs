// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::convert::TryFrom;
use std::fmt;

use crate::core::types::{CastleSide, Coord, Piece, PieceKind};
use crate::error::MoveParseError;

/// A single move. Unlike a packed encoding, `captured` is stored directly on the move
/// so that `Position::unapply` can restore a captured piece without consulting
/// anything but the move itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Coord,
    pub to: Coord,
    pub captured: Option<Piece>,
    pub promote_to: Option<PieceKind>,
    pub castle_side: CastleSide,
}

impl Move {
    pub fn quiet(from: Coord, to: Coord) -> Move {
        Move {
            from,
            to,
            captured: None,
            promote_to: None,
            castle_side: CastleSide::None,
        }
    }

    pub fn capture(from: Coord, to: Coord, captured: Piece) -> Move {
        Move {
            from,
            to,
            captured: Some(captured),
            promote_to: None,
            castle_side: CastleSide::None,
        }
    }

    pub fn promotion(from: Coord, to: Coord, promote_to: PieceKind) -> Move {
        Move {
            from,
            to,
            captured: None,
            promote_to: Some(promote_to),
            castle_side: CastleSide::None,
        }
    }

    pub fn promotion_capture(from: Coord, to: Coord, captured: Piece, promote_to: PieceKind) -> Move {
        Move {
            from,
            to,
            captured: Some(captured),
            promote_to: Some(promote_to),
            castle_side: CastleSide::None,
        }
    }

    pub fn castle(from: Coord, to: Coord, side: CastleSide) -> Move {
        Move {
            from,
            to,
            captured: None,
            promote_to: None,
            castle_side: side,
        }
    }

    /// A sentinel move used where a "no move" value is needed, e.g. an empty
    /// transposition-table slot or a position with no recorded last move.
    pub fn null() -> Move {
        Move {
            from: Coord::new(0, 0),
            to: Coord::new(0, 0),
            captured: None,
            promote_to: None,
            castle_side: CastleSide::None,
        }
    }

    pub fn is_null(&self) -> bool {
        *self == Move::null()
    }

    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    pub fn is_promotion(&self) -> bool {
        self.promote_to.is_some()
    }

    pub fn is_castle(&self) -> bool {
        self.castle_side != CastleSide::None
    }

    /// The move in UCI long algebraic notation, e.g. `e2e4` or `e7e8q`.
    pub fn as_uci(&self) -> String {
        let mut s = format!("{}{}", self.from, self.to);
        if let Some(promo) = self.promote_to {
            s.push_str(&promo.to_string());
        }
        s
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_uci())
    }
}

impl Move {
    /// Parses a bare UCI move string (`<from><to>[promo]`). This does not know
    /// whether the move is a capture, castle, or promotion beyond the trailing
    /// promotion letter; callers match the parsed `from`/`to`/`promote_to` against
    /// a legal move list to recover the rest (see `movegen::find_move`).
    pub fn parse_uci(s: &str) -> Result<(Coord, Coord, Option<PieceKind>), MoveParseError> {
        if s.len() != 4 && s.len() != 5 {
            return Err(MoveParseError::WrongLength(s.to_owned()));
        }
        let from = Coord::try_from(&s[0..2])?;
        let to = Coord::try_from(&s[2..4])?;
        let promote_to = if s.len() == 5 {
            let c = s.chars().nth(4).unwrap();
            Some(match c.to_ascii_lowercase() {
                'n' => PieceKind::Knight,
                'b' => PieceKind::Bishop,
                'r' => PieceKind::Rook,
                'q' => PieceKind::Queen,
                _ => return Err(MoveParseError::BadPromotion(c)),
            })
        } else {
            None
        };
        Ok((from, to, promote_to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Color;

    #[test]
    fn quiet_move_formats_as_uci() {
        let m = Move::quiet(Coord::new(4, 1), Coord::new(4, 3));
        assert_eq!(m.as_uci(), "e2e4");
    }

    #[test]
    fn promotion_move_formats_with_trailing_letter() {
        let m = Move::promotion(Coord::new(4, 6), Coord::new(4, 7), PieceKind::Queen);
        assert_eq!(m.as_uci(), "e7e8q");
    }

    #[test]
    fn capture_move_carries_captured_piece() {
        let captured = Piece::new(Color::Black, PieceKind::Knight);
        let m = Move::capture(Coord::new(2, 2), Coord::new(3, 3), captured);
        assert_eq!(m.captured, Some(captured));
        assert!(m.is_capture());
    }

    #[test]
    fn parse_uci_round_trips_quiet_move() {
        let (from, to, promo) = Move::parse_uci("e2e4").unwrap();
        assert_eq!(from, Coord::new(4, 1));
        assert_eq!(to, Coord::new(4, 3));
        assert_eq!(promo, None);
    }

    #[test]
    fn parse_uci_reads_promotion_letter() {
        let (_, _, promo) = Move::parse_uci("a7a8q").unwrap();
        assert_eq!(promo, Some(PieceKind::Queen));
    }

    #[test]
    fn parse_uci_rejects_bad_length() {
        assert!(Move::parse_uci("e2e").is_err());
    }

    #[test]
    fn null_move_is_identifiable() {
        assert!(Move::null().is_null());
        assert!(!Move::quiet(Coord::new(1, 1), Coord::new(1, 2)).is_null());
    }
}
