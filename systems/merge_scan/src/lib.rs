#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic scans that surface merge opportunities for hint UI.
//!
//! The idle scan pairs up identical mergeable items across the whole board
//! and picks one pair pseudo-randomly to highlight. The held-item scan runs
//! while the player drags an item, listing the slots that could absorb it,
//! lowest-friction first. Finding nothing is a normal outcome for both
//! scans: callers simply suppress their hint UI.

use merge_grove_catalog::Catalog;
use merge_grove_core::{
    BoardView, CatalogError, ItemLevel, ItemPayload, MergeCandidate, SlotOrder, SlotState,
    SpriteId,
};

/// Configuration parameters required to construct the scanner.
#[derive(Clone, Copy, Debug)]
pub struct ScanConfig {
    rng_seed: u64,
}

impl ScanConfig {
    /// Creates a new configuration using the provided hint-selection seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Slot able to absorb the currently held item.
///
/// Default-state targets sort before lockers, then lower levels before
/// higher ones; levels compare numerically, never by sprite-name suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeTarget {
    /// Linear position of the candidate slot.
    pub order: SlotOrder,
    /// Lock state of the candidate occupant.
    pub state: SlotState,
    /// Level of the candidate occupant.
    pub level: ItemLevel,
}

/// Board scanner that reuses scratch buffers across scan cycles.
#[derive(Debug)]
pub struct MergeScan {
    singles: Vec<ScanEntry>,
    rng: SplitMix64,
}

impl MergeScan {
    /// Creates a new scanner using the supplied configuration.
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self {
            singles: Vec::new(),
            rng: SplitMix64::new(config.rng_seed),
        }
    }

    /// Collects every mergeable pair and surfaces one as the hint.
    ///
    /// Eligible singles are occupied `Default`-state slots below their
    /// group's maximum level. They are sorted by sprite (then order), a
    /// trailing unpaired entry is dropped when the count is odd, and
    /// consecutive equal-sprite entries pair up. The output buffer receives
    /// every pair; the returned candidate is the pseudo-random pick.
    ///
    /// Catalog misses abort the scan: a sprite the catalog cannot resolve
    /// means the board and configuration disagree.
    pub fn scan(
        &mut self,
        view: &BoardView,
        catalog: &Catalog,
        out: &mut Vec<MergeCandidate>,
    ) -> Result<Option<MergeCandidate>, CatalogError> {
        out.clear();
        self.singles.clear();

        for snapshot in view.iter() {
            let Some(payload) = &snapshot.payload else {
                continue;
            };
            if payload.state != SlotState::Default {
                continue;
            }
            if catalog.descriptor_of(&payload.sprite)?.is_max_level() {
                continue;
            }
            self.singles.push(ScanEntry {
                order: snapshot.order,
                sprite: payload.sprite.clone(),
            });
        }

        self.singles
            .sort_by(|a, b| a.sprite.cmp(&b.sprite).then(a.order.cmp(&b.order)));
        if self.singles.len() % 2 == 1 {
            let _ = self.singles.pop();
        }

        let mut index = 0;
        while index + 1 < self.singles.len() {
            let first = &self.singles[index];
            let second = &self.singles[index + 1];
            if first.sprite == second.sprite {
                out.push(MergeCandidate {
                    first: first.order,
                    second: second.order,
                    sprite: first.sprite.clone(),
                });
                index += 2;
            } else {
                index += 1;
            }
        }

        if out.is_empty() {
            return Ok(None);
        }
        let pick = (self.rng.next_u64() % out.len() as u64) as usize;
        Ok(out.get(pick).cloned())
    }

    /// Lists the slots that could absorb the held item, best first.
    ///
    /// Candidates share the held item's kind and group, sit in `Default` or
    /// `Locker` state, and exclude the held item itself. Ordering is state
    /// ordinal, then numeric level, then order.
    pub fn held_targets(&self, view: &BoardView, held: &ItemPayload, out: &mut Vec<MergeTarget>) {
        out.clear();

        for snapshot in view.iter() {
            let Some(payload) = &snapshot.payload else {
                continue;
            };
            if payload.id == held.id {
                continue;
            }
            if payload.kind != held.kind || payload.group != held.group {
                continue;
            }
            if payload.state != SlotState::Default && payload.state != SlotState::Locker {
                continue;
            }
            out.push(MergeTarget {
                order: snapshot.order,
                state: payload.state,
                level: payload.level,
            });
        }

        out.sort_by_key(|target| (target.state, target.level, target.order));
    }
}

#[derive(Clone, Debug)]
struct ScanEntry {
    order: SlotOrder,
    sprite: SpriteId,
}

#[derive(Debug)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        let seed = if seed == 0 { 0x9e3779b97f4a7c15 } else { seed };
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }
}
