// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for the engine. Parse errors are recoverable and are reported back to
//! the UCI client as `info string ...`; anything else is a bug.

use thiserror::Error;

use crate::core::{CoordParseError, FileParseError, PieceParseError, RankParseError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid FEN: {0}")]
    Fen(#[from] FenParseError),

    #[error("invalid move: {0}")]
    Move(#[from] MoveParseError),

    #[error("invalid UCI command: {0}")]
    Uci(String),
}

#[derive(Debug, Error)]
pub enum FenParseError {
    #[error("expected 6 space-separated fields, found {0}")]
    WrongFieldCount(usize),

    #[error("board field did not describe 8 ranks")]
    WrongRankCount,

    #[error(transparent)]
    Coord(#[from] CoordParseError),

    #[error(transparent)]
    Piece(#[from] PieceParseError),

    #[error(transparent)]
    Rank(#[from] RankParseError),

    #[error(transparent)]
    File(#[from] FileParseError),

    #[error("invalid side to move: {0}")]
    SideToMove(String),

    #[error("invalid castling rights field: {0}")]
    CastleRights(String),

    #[error("invalid halfmove clock: {0}")]
    HalfmoveClock(#[from] std::num::ParseIntError),
}

#[derive(Debug, Error)]
pub enum MoveParseError {
    #[error("move string {0:?} is not 4 or 5 characters long")]
    WrongLength(String),

    #[error(transparent)]
    Coord(#[from] CoordParseError),

    #[error("unrecognized promotion piece {0:?}")]
    BadPromotion(char),

    #[error("move {0} is not legal in the given position")]
    Illegal(String),
}
