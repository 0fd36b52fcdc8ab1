// Copyright 2017-2022 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The transposition table. Open-addressed with linear probing, sized from a
//! megabyte budget, and owned by the `Driver` rather than kept as process-wide
//! global state: the table's replacement policy depends on the game-ply clock of
//! the search that is using it, which a `lazy_static` singleton cannot express
//! cleanly once more than one position is ever searched.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::core::Move;

/// How the `score` field of an `Entry` should be interpreted relative to the window
/// it was stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundType {
    Exact,
    Lower,
    Upper,
    QExact,
    QLower,
    QUpper,
}

impl BoundType {
    pub fn is_exact(self) -> bool {
        matches!(self, BoundType::Exact | BoundType::QExact)
    }

    pub fn is_quiescence(self) -> bool {
        matches!(self, BoundType::QExact | BoundType::QLower | BoundType::QUpper)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub key: u64,
    pub best_move: Move,
    pub score: i32,
    pub bound_type: BoundType,
    pub depth: i32,
    pub last_access_game_ply: u32,
}

const STALENESS_PLIES: u32 = 5;

/// Occupancy fraction (numerator/denominator) above which a full clear is scheduled
/// rather than performed immediately, so a search never pays for a clear mid-depth.
const HIGH_WATER_NUM: usize = 3;
const HIGH_WATER_DEN: usize = 4;

struct Slot(Mutex<Option<Entry>>);

/// Bound by a megabyte budget rather than an entry count, matching the way `Driver`
/// exposes hash size through the UCI `Hash` option in units of megabytes.
pub struct Table {
    slots: Vec<Slot>,
    occupied: AtomicUsize,
    failed_inserts: AtomicU64,
    /// Set once occupancy crosses the high-water mark. The actual clear is deferred
    /// until `clear_if_scheduled` is called between moves, not mid-search; while set,
    /// `store` stops claiming empty slots so occupancy cannot climb further.
    clear_pending: AtomicBool,
}

fn slot_count_for_budget(mb: u32) -> usize {
    let bytes = mb as usize * 1024 * 1024;
    let slot_size = std::mem::size_of::<Entry>() + std::mem::size_of::<Mutex<()>>();
    (bytes / slot_size.max(1)).max(1024)
}

impl Table {
    pub fn with_size_mb(mb: u32) -> Table {
        let count = slot_count_for_budget(mb);
        let mut slots = Vec::with_capacity(count);
        slots.resize_with(count, || Slot(Mutex::new(None)));
        Table {
            slots,
            occupied: AtomicUsize::new(0),
            failed_inserts: AtomicU64::new(0),
            clear_pending: AtomicBool::new(false),
        }
    }

    fn index_for(&self, key: u64) -> usize {
        (key as usize) % self.slots.len()
    }

    /// Unconditionally empties every slot and resets counters, e.g. on `ucinewgame`.
    pub fn clear(&self) {
        for slot in &self.slots {
            *slot.0.lock().unwrap() = None;
        }
        self.occupied.store(0, Ordering::Relaxed);
        self.clear_pending.store(false, Ordering::Relaxed);
    }

    /// Performs the deferred high-water-mark clear if one was scheduled, and is a
    /// no-op otherwise. Callers invoke this between game moves, never mid-search.
    pub fn clear_if_scheduled(&self) {
        if self.clear_pending.load(Ordering::Relaxed) {
            self.clear();
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn failed_inserts(&self) -> u64 {
        self.failed_inserts.load(Ordering::Relaxed)
    }

    pub fn clear_scheduled(&self) -> bool {
        self.clear_pending.load(Ordering::Relaxed)
    }

    /// `hashfull` per mille, as reported in UCI `info` lines.
    pub fn hashfull_permille(&self) -> u32 {
        let capacity = self.slots.len();
        if capacity == 0 {
            return 0;
        }
        let occupied = self.occupied.load(Ordering::Relaxed);
        ((occupied * 1000) / capacity).min(1000) as u32
    }

    /// Probes from `hash mod capacity`, stopping at the first key match (hit) or the
    /// first empty slot (miss) along the linear probe sequence.
    pub fn probe(&self, key: u64) -> Option<Entry> {
        let len = self.slots.len();
        let start = self.index_for(key);
        for step in 0..len {
            let idx = (start + step) % len;
            let guard = self.slots[idx].0.lock().unwrap();
            match *guard {
                None => return None,
                Some(entry) if entry.key == key => {
                    return Some(entry);
                }
                _ => continue,
            }
        }
        None
    }

    /// Stores `entry`, probing forward from its home slot and applying the
    /// replacement policy at the first slot where it applies:
    ///
    /// 1. A slot occupied by a stale entry (older than `STALENESS_PLIES`) is always
    ///    reclaimed, regardless of key.
    /// 2. An empty slot claims the insert, unless a clear is pending (see below).
    /// 3. On a key match: never demote an exact bound to non-exact; always promote a
    ///    non-exact entry to exact; otherwise prefer the greater-or-equal depth.
    /// 4. Otherwise (occupied, fresh, different key), keep probing.
    ///
    /// If a clear is pending, empty slots are left alone so occupancy cannot climb
    /// further; only occupied slots are eligible for replacement. If the whole probe
    /// sequence is exhausted without placing the entry, the insert fails and is
    /// recorded in `failed_inserts`.
    pub fn store(&self, entry: Entry) {
        let len = self.slots.len();
        let start = self.index_for(entry.key);
        let clear_pending = self.clear_pending.load(Ordering::Relaxed);

        for step in 0..len {
            let idx = (start + step) % len;
            let mut guard = self.slots[idx].0.lock().unwrap();
            match *guard {
                None => {
                    if clear_pending {
                        continue;
                    }
                    *guard = Some(entry);
                    self.note_insert();
                    return;
                }
                Some(existing) => {
                    let stale = entry
                        .last_access_game_ply
                        .saturating_sub(existing.last_access_game_ply)
                        >= STALENESS_PLIES;
                    if stale {
                        *guard = Some(entry);
                        return;
                    }
                    if existing.key == entry.key {
                        let replace = if existing.bound_type.is_exact() && !entry.bound_type.is_exact() {
                            false
                        } else if !existing.bound_type.is_exact() && entry.bound_type.is_exact() {
                            true
                        } else {
                            entry.depth >= existing.depth
                        };
                        if replace {
                            *guard = Some(entry);
                        }
                        return;
                    }
                    // Occupied by a different, fresh key: keep probing.
                }
            }
        }

        self.failed_inserts.fetch_add(1, Ordering::Relaxed);
    }

    fn note_insert(&self) {
        let occupied = self.occupied.fetch_add(1, Ordering::Relaxed) + 1;
        if occupied * HIGH_WATER_DEN >= self.slots.len() * HIGH_WATER_NUM {
            self.clear_pending.store(true, Ordering::Relaxed);
        }
    }
}

/// Walks the table from `key` along the principal variation, applying moves to a
/// scratch position as it goes, up to `max_plies`. Separated from `Position` so the
/// table has no dependency on the board representation beyond the `Move` type.
pub fn reconstruct_pv<F>(table: &Table, root_key: u64, max_plies: u32, mut apply: F) -> Vec<Move>
where
    F: FnMut(Move) -> Option<u64>,
{
    let mut pv = Vec::new();
    let mut key = root_key;
    for _ in 0..max_plies {
        let Some(entry) = table.probe(key) else {
            break;
        };
        if entry.best_move.is_null() || !entry.bound_type.is_exact() || entry.bound_type.is_quiescence()
        {
            break;
        }
        let Some(next_key) = apply(entry.best_move) else {
            break;
        };
        pv.push(entry.best_move);
        key = next_key;
    }
    pv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Coord;

    fn dummy_entry(key: u64, depth: i32, bound_type: BoundType, ply: u32) -> Entry {
        Entry {
            key,
            best_move: Move::quiet(Coord::new(0, 1), Coord::new(0, 2)),
            score: 0,
            bound_type,
            depth,
            last_access_game_ply: ply,
        }
    }

    #[test]
    fn stores_and_probes_an_entry() {
        let table = Table::with_size_mb(1);
        let entry = dummy_entry(42, 4, BoundType::Exact, 0);
        table.store(entry);
        let found = table.probe(42).unwrap();
        assert_eq!(found.depth, 4);
    }

    #[test]
    fn never_demotes_exact_entry_to_non_exact() {
        let table = Table::with_size_mb(1);
        let key = 7u64;
        let exact = dummy_entry(key, 2, BoundType::Exact, 0);
        table.store(exact);
        let shallow_bound = dummy_entry(key, 10, BoundType::Lower, 0);
        table.store(shallow_bound);
        let found = table.probe(key).unwrap();
        assert_eq!(found.bound_type, BoundType::Exact);
    }

    #[test]
    fn stale_entries_are_overwritten_regardless_of_bound_type() {
        let table = Table::with_size_mb(1);
        let old = dummy_entry(99, 20, BoundType::Exact, 0);
        table.store(old);
        let fresh = dummy_entry(99, 1, BoundType::Upper, STALENESS_PLIES);
        table.store(fresh);
        let found = table.probe(99).unwrap();
        assert_eq!(found.bound_type, BoundType::Upper);
    }

    #[test]
    fn clear_empties_all_slots() {
        let table = Table::with_size_mb(1);
        table.store(dummy_entry(1, 1, BoundType::Exact, 0));
        table.clear();
        assert_eq!(table.probe(1), None);
    }

    #[test]
    fn colliding_keys_probe_forward_instead_of_clobbering() {
        let table = Table::with_size_mb(1);
        let capacity = table.capacity() as u64;
        let a = dummy_entry(capacity, 1, BoundType::Exact, 0);
        let b = dummy_entry(capacity * 2, 1, BoundType::Exact, 0);
        // Both keys hash to slot 0 (key % capacity == 0); the second insert must not
        // clobber the first.
        table.store(a);
        table.store(b);
        assert_eq!(table.probe(capacity).unwrap().key, capacity);
        assert_eq!(table.probe(capacity * 2).unwrap().key, capacity * 2);
    }

    #[test]
    fn insert_fails_and_is_recorded_once_the_whole_probe_sequence_is_occupied() {
        let table = Table::with_size_mb(1);
        let capacity = table.capacity() as u64;
        // Fill every slot with fresh, exact, max-depth entries at the same access ply
        // so none of them are eligible for staleness- or depth-based replacement.
        for i in 0..capacity {
            table.store(dummy_entry(i + 1, i32::MAX, BoundType::Exact, 0));
        }
        let overflow_key = capacity + 1;
        table.store(dummy_entry(overflow_key, 0, BoundType::Exact, 0));
        assert_eq!(table.failed_inserts(), 1);
        assert_eq!(table.probe(overflow_key), None);
    }

    #[test]
    fn schedules_a_clear_once_occupancy_crosses_the_high_water_mark() {
        let table = Table::with_size_mb(1);
        let capacity = table.capacity() as u64;
        let target = (table.capacity() * HIGH_WATER_NUM) / HIGH_WATER_DEN + 1;
        for i in 0..target as u64 {
            table.store(dummy_entry(i + 1, 1, BoundType::Exact, 0));
            if i >= capacity {
                break;
            }
        }
        assert!(table.clear_scheduled());
        table.clear_if_scheduled();
        assert!(!table.clear_scheduled());
        assert_eq!(table.hashfull_permille(), 0);
    }
}
