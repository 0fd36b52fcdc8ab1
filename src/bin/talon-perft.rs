// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A perft runner: counts the leaf nodes of the legal move tree to a fixed
//! depth, the standard move-generator correctness oracle.

use structopt::StructOpt;

use talon::movegen;
use talon::position::Position;

#[derive(Debug, StructOpt)]
struct Options {
    /// FEN representation of the position to analyze.
    #[structopt(name = "FEN")]
    fen: String,

    /// The depth to search to.
    #[structopt(short, long)]
    depth: u32,

    /// If set, print the leaf-node count broken down by each root move.
    #[structopt(long)]
    divide: bool,
}

fn perft(pos: &mut Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let side = pos.side_to_move();
    let other = side.toggle();
    let mut nodes = 0;
    for mv in movegen::generate(pos, false) {
        let info = pos.apply(mv);
        if !movegen::is_square_attacked(pos, pos.king_coord(side), other) {
            nodes += perft(pos, depth - 1);
        }
        pos.unapply(mv, info);
    }
    nodes
}

fn main() {
    let ops = Options::from_args();
    let mut pos = Position::from_fen(&ops.fen).expect("invalid FEN");

    if ops.divide && ops.depth > 0 {
        let side = pos.side_to_move();
        let other = side.toggle();
        let mut total = 0;
        for mv in movegen::generate(&pos, false) {
            let info = pos.apply(mv);
            let legal = !movegen::is_square_attacked(&pos, pos.king_coord(side), other);
            let count = if legal { perft(&mut pos, ops.depth - 1) } else { 0 };
            pos.unapply(mv, info);
            if legal {
                println!("{}: {}", mv, count);
                total += count;
            }
        }
        println!("total: {}", total);
    } else {
        println!("{}", perft(&mut pos, ops.depth));
    }
}
