// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::atomic::AtomicBool;

use structopt::StructOpt;

use talon::config::EngineConfig;
use talon::position::Position;
use talon::search::{self, SearchContext};
use talon::table::Table;

#[derive(Debug, StructOpt)]
struct Options {
    /// FEN representation of the position to analyze.
    #[structopt(name = "FEN")]
    fen: String,
    /// Depth to which to search.
    #[structopt(short, long)]
    depth: u32,
    /// If present, serializes the output as json.
    #[structopt(long)]
    json: bool,
}

fn main() {
    let ops = Options::from_args();
    let pos = Position::from_fen(&ops.fen).expect("invalid FEN");
    let config = EngineConfig::default();
    let table = Table::with_size_mb(config.hash_mb);
    let stop = AtomicBool::new(false);
    let ctx = SearchContext {
        table: &table,
        hard_stop: &stop,
        node_limit: None,
        deadline: None,
        quiescence_ply_floor: config.quiescence_ply_floor,
        game_ply: pos.ply(),
    };

    let result = search::search_at_depth(&pos, ops.depth, &ctx);
    if ops.json {
        println!(
            "{{\"best_move\": \"{}\", \"best_score\": {}, \"nodes\": {}, \"qnodes\": {}}}",
            result.best_move, result.best_score, result.stats.nodes, result.stats.qnodes
        );
    } else {
        println!("{:?}", result);
    }
}
