#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure empty-slot search used to place spawned and retrieved items.
//!
//! Spawn-on-merge rewards, generator production, shop deliveries, and
//! inventory retrieval all need a destination slot; they query here and then
//! submit a `Place` command for the chosen order. The search never mutates
//! the board.

use merge_grove_core::{BoardView, SlotCoord, SlotOrder};

/// One empty slot candidate produced by the search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmptySlot {
    /// Linear position of the empty slot.
    pub order: SlotOrder,
    /// Grid coordinate of the empty slot.
    pub coord: SlotCoord,
    /// Squared Euclidean distance from the search origin; zero when the
    /// search ran without an origin.
    pub distance_sq: u64,
}

/// Enumerates every empty slot, measuring distance from an optional origin.
///
/// The output buffer is cleared before populating it. Candidates appear in
/// order; callers sorting nearest-first should key on `(distance_sq, order)`
/// or use [`nearest_empty_slot`]. Squared distance orders candidates
/// identically to true Euclidean distance.
pub fn find_empty_slots(view: &BoardView, origin: Option<SlotOrder>, out: &mut Vec<EmptySlot>) {
    out.clear();

    let origin_coord = origin.and_then(|order| view.dimensions().location_of(order));
    for snapshot in view.iter() {
        if !snapshot.is_empty() {
            continue;
        }
        let distance_sq = origin_coord
            .map(|coord| coord.distance_squared(snapshot.coord))
            .unwrap_or(0);
        out.push(EmptySlot {
            order: snapshot.order,
            coord: snapshot.coord,
            distance_sq,
        });
    }
}

/// Returns the empty slot nearest to the origin, if any exists.
///
/// Ties break toward the smaller order so selection stays deterministic.
#[must_use]
pub fn nearest_empty_slot(view: &BoardView, origin: Option<SlotOrder>) -> Option<EmptySlot> {
    let mut candidates = Vec::new();
    find_empty_slots(view, origin, &mut candidates);
    candidates
        .into_iter()
        .min_by_key(|candidate| (candidate.distance_sq, candidate.order))
}
