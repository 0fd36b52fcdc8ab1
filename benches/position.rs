// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use talon::core::{Coord, Move};
use talon::movegen;
use talon::position::Position;

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("quiet-move-applyunapply", |b| {
        let pos = Position::from_fen("8/8/4b3/8/2B5/8/8/8 w - - 0 1").unwrap();
        let mov = Move::quiet(Coord::new(2, 3), Coord::new(3, 4));
        b.iter(|| {
            let mut pos = black_box(&pos).clone();
            let mov = black_box(mov);
            let info = pos.apply(mov);
            pos.unapply(mov, info);
        });
    });

    c.bench_function("kiwipete-movegen-all", |b| {
        let pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/Pp2P3/2N2Q1p/1PPBBPPP/R3K2R b KQkq a3 0 1",
        )
        .unwrap();
        b.iter(|| movegen::generate(black_box(&pos), false));
    });

    c.bench_function("kiwipete-movegen-captures", |b| {
        let pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/Pp2P3/2N2Q1p/1PPBBPPP/R3K2R b KQkq a3 0 1",
        )
        .unwrap();
        b.iter(|| movegen::generate(black_box(&pos), true));
    });

    c.bench_function("kiwipete-perft-3", |b| {
        let pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/Pp2P3/2N2Q1p/1PPBBPPP/R3K2R b KQkq a3 0 1",
        )
        .unwrap();
        b.iter(|| {
            let mut pos = black_box(&pos).clone();
            perft(&mut pos, 3)
        });
    });
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

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
