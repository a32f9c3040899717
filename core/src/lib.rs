#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Merge Grove engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative board, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the board executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems and
//! external collaborators to react to deterministically. Systems consume
//! read-only [`BoardView`] snapshots and respond with new command batches.
//!
//! Economy side effects never happen here: merge, removal, and spawn
//! operations only *request* currency and experience deltas through events,
//! leaving the actual ledger to the embedding application.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location of a single board slot expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotCoord {
    column: u32,
    row: u32,
}

impl SlotCoord {
    /// Creates a new slot coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the slot.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the slot.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the squared Euclidean distance between two coordinates.
    ///
    /// Squared distance orders candidates identically to true Euclidean
    /// distance while keeping the arithmetic in integers.
    #[must_use]
    pub fn distance_squared(self, other: SlotCoord) -> u64 {
        let dx = u64::from(self.column.abs_diff(other.column));
        let dy = u64::from(self.row.abs_diff(other.row));
        dx * dx + dy * dy
    }
}

impl fmt::Display for SlotCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Fixed linear index identifying a slot position, independent of content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotOrder(u32);

impl SlotOrder {
    /// Creates a new slot order wrapper.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the underlying linear index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns the order as a `usize` suitable for dense-array indexing.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl std::error::Error for SlotOrder {}

/// Dimensions of the slot grid, owning the order/location bijection.
///
/// Orders traverse the grid column-outer: `order = column * rows + row`.
/// Persisted snapshots and the spawn-search algorithms depend on this exact
/// mapping, so it must never change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardDimensions {
    columns: u32,
    rows: u32,
}

impl BoardDimensions {
    /// Creates a new dimensions descriptor.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of slots in the grid.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        let count = u64::from(self.columns) * u64::from(self.rows);
        usize::try_from(count).unwrap_or(0)
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub const fn contains(&self, coord: SlotCoord) -> bool {
        coord.column() < self.columns && coord.row() < self.rows
    }

    /// Resolves the linear order of a coordinate, if it is in range.
    #[must_use]
    pub fn order_of(&self, coord: SlotCoord) -> Option<SlotOrder> {
        if !self.contains(coord) {
            return None;
        }
        let order = u64::from(coord.column()) * u64::from(self.rows) + u64::from(coord.row());
        u32::try_from(order).ok().map(SlotOrder::new)
    }

    /// Resolves the coordinate of a linear order, if it is in range.
    #[must_use]
    pub fn location_of(&self, order: SlotOrder) -> Option<SlotCoord> {
        if self.rows == 0 || order.index() >= self.slot_count() {
            return None;
        }
        let column = order.get() / self.rows;
        let row = order.get() % self.rows;
        Some(SlotCoord::new(column, row))
    }
}

/// Stable unique identifier assigned to an item at creation.
///
/// The identifier follows the item through moves and swaps; merging upgrades
/// the surviving item in place, keeping the target's identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ItemId(u64);

impl ItemId {
    /// Creates a new item identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Explicit item level carried on the data model.
///
/// Levels are assigned by catalog position and never derived from sprite
/// name parsing.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ItemLevel(u32);

impl ItemLevel {
    /// Creates a new level wrapper.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the underlying level value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ItemLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog key naming one sprite, e.g. `Sword1`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpriteId(String);

impl SpriteId {
    /// Creates a new sprite identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the sprite name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog key naming one item group, e.g. `Tools`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    /// Creates a new group identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the group name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Broad item categories recognised by the board.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ItemKind {
    /// Ordinary mergeable item.
    Item,
    /// Item that produces other items when tapped.
    Generator,
    /// Reward item granted by merge milestones; never triggers further rewards.
    Collectable,
    /// Container item opened through the crate/locker progression.
    Chest,
}

/// Lock states an occupied slot passes through before becoming interactable.
///
/// The declaration order doubles as the held-item scan's primary sort key,
/// so `Default` must stay first and `Locker` must follow `Crate`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SlotState {
    /// Fully interactable item.
    Default,
    /// Sealed item; must be opened into a locker before unlocking.
    Crate,
    /// Opened crate awaiting an unlock.
    Locker,
    /// Cosmetic bubble overlay; popping returns the item to `Default`.
    Bubble,
}

/// Content of an occupied slot.
///
/// A slot holding no payload is empty; every other slot field lives here so
/// persistence can round-trip occupants verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPayload {
    /// Stable identity assigned at creation.
    pub id: ItemId,
    /// Sprite resolved through the item catalog.
    pub sprite: SpriteId,
    /// Broad category of the item.
    pub kind: ItemKind,
    /// Catalog group the item belongs to.
    pub group: GroupId,
    /// Level assigned by catalog position.
    pub level: ItemLevel,
    /// Current lock state.
    pub state: SlotState,
    /// Cosmetic crate variant, meaningful only while `state` is `Crate`.
    pub crate_variant: u32,
    /// Cosmetic completion flag.
    pub completed: bool,
}

/// Item data supplied by callers when requesting a placement.
///
/// The board resolves the seed through the catalog and assigns the stable
/// identifier itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSeed {
    /// Broad category of the item.
    pub kind: ItemKind,
    /// Catalog group the item belongs to.
    pub group: GroupId,
    /// Sprite to resolve through the catalog.
    pub sprite: SpriteId,
    /// Initial lock state.
    pub state: SlotState,
    /// Cosmetic crate variant.
    pub crate_variant: u32,
}

/// Serialization shape of one slot: its fixed order plus optional occupant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    /// Fixed linear position of the slot.
    pub order: SlotOrder,
    /// Occupant, or `None` for an empty slot.
    pub payload: Option<ItemPayload>,
}

/// Immutable snapshot of a single slot used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotSnapshot {
    /// Fixed linear position of the slot.
    pub order: SlotOrder,
    /// Grid coordinate of the slot.
    pub coord: SlotCoord,
    /// Occupant, or `None` for an empty slot.
    pub payload: Option<ItemPayload>,
}

impl SlotSnapshot {
    /// Reports whether the slot holds no item.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.payload.is_none()
    }
}

/// Read-only dense snapshot describing every slot of the board.
#[derive(Clone, Debug)]
pub struct BoardView {
    dimensions: BoardDimensions,
    snapshots: Vec<SlotSnapshot>,
}

impl BoardView {
    /// Creates a new board view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(dimensions: BoardDimensions, mut snapshots: Vec<SlotSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.order);
        Self {
            dimensions,
            snapshots,
        }
    }

    /// Dimensions of the captured board.
    #[must_use]
    pub const fn dimensions(&self) -> BoardDimensions {
        self.dimensions
    }

    /// Iterator over the captured slots in order.
    pub fn iter(&self) -> impl Iterator<Item = &SlotSnapshot> {
        self.snapshots.iter()
    }

    /// Returns the snapshot stored at the provided order, if any.
    #[must_use]
    pub fn get(&self, order: SlotOrder) -> Option<&SlotSnapshot> {
        self.snapshots
            .binary_search_by_key(&order, |snapshot| snapshot.order)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<SlotSnapshot> {
        self.snapshots
    }
}

/// Candidate pair of slots whose occupants could merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeCandidate {
    /// First slot of the pair in scan order.
    pub first: SlotOrder,
    /// Second slot of the pair in scan order.
    pub second: SlotOrder,
    /// Shared sprite of both occupants.
    pub sprite: SpriteId,
}

impl MergeCandidate {
    /// Reports whether the candidate references the provided slot.
    #[must_use]
    pub fn references(&self, order: SlotOrder) -> bool {
        self.first == order || self.second == order
    }
}

/// Commands that express all permissible board mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Writes a catalog-resolved item into an empty slot.
    Place {
        /// Slot that receives the item.
        target: SlotOrder,
        /// Item data to resolve and place.
        item: ItemSeed,
    },
    /// Clears an occupied slot, optionally crediting a sale.
    Remove {
        /// Slot to clear.
        order: SlotOrder,
        /// Currency amount to request from the external ledger; zero skips
        /// the credit.
        sell_value: u32,
    },
    /// Restores the most recent removal from the one-entry undo buffer.
    Undo,
    /// Moves an item into an empty slot.
    Move {
        /// Occupied source slot.
        from: SlotOrder,
        /// Empty destination slot.
        to: SlotOrder,
    },
    /// Exchanges the occupants of two occupied slots.
    Swap {
        /// First occupied slot.
        first: SlotOrder,
        /// Second occupied slot.
        second: SlotOrder,
    },
    /// Collapses two identical items into the next-level item.
    Merge {
        /// Slot whose item is consumed (the dragged item).
        source: SlotOrder,
        /// Slot that receives the upgraded item (the drop target).
        target: SlotOrder,
    },
    /// Transitions a crated slot into the locker state.
    OpenCrate {
        /// Slot to open.
        order: SlotOrder,
    },
    /// Transitions a locker slot into the default state.
    UnlockLocker {
        /// Slot to unlock.
        order: SlotOrder,
    },
    /// Pops a bubble overlay back to the default state.
    PopBubble {
        /// Slot to pop.
        order: SlotOrder,
    },
    /// Opens every orthogonal neighbor currently in the crate state.
    CheckAdjacentCrates {
        /// Slot whose neighbors are examined.
        order: SlotOrder,
    },
}

/// Events broadcast by the board after processing commands.
///
/// Currency, experience, and spawn events are effect *requests* aimed at
/// external collaborators; the board never applies them itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that an item was written into a slot.
    ItemPlaced {
        /// Slot that received the item.
        order: SlotOrder,
        /// Identity assigned to the item.
        item: ItemId,
        /// Sprite resolved for the item.
        sprite: SpriteId,
    },
    /// Confirms that a slot was cleared.
    ItemRemoved {
        /// Slot that was cleared.
        order: SlotOrder,
        /// Identity of the removed item.
        item: ItemId,
    },
    /// Requests that the external ledger credit a sale.
    CurrencyCredited {
        /// Amount to credit.
        amount: u32,
    },
    /// Confirms that an undone removal was restored.
    ItemRestored {
        /// Slot the item returned to.
        order: SlotOrder,
        /// Identity of the restored item.
        item: ItemId,
    },
    /// Requests that the external ledger reverse an earlier sale credit.
    CurrencyRevoked {
        /// Amount to reclaim.
        amount: u32,
    },
    /// Confirms that an item moved between slots.
    ItemMoved {
        /// Slot the item left.
        from: SlotOrder,
        /// Slot the item now occupies.
        to: SlotOrder,
        /// Identity of the moved item.
        item: ItemId,
    },
    /// Confirms that two occupants exchanged slots.
    ItemsSwapped {
        /// First slot of the exchange.
        first: SlotOrder,
        /// Second slot of the exchange.
        second: SlotOrder,
    },
    /// Confirms that two items collapsed into the next level.
    ItemsMerged {
        /// Slot whose item was consumed.
        source: SlotOrder,
        /// Slot holding the upgraded item.
        target: SlotOrder,
        /// Identity of the surviving item.
        item: ItemId,
        /// Sprite of the upgraded item.
        sprite: SpriteId,
        /// Level of the upgraded item.
        level: ItemLevel,
    },
    /// Requests that the external progression track grant experience.
    ExperienceGranted {
        /// Amount of experience to grant.
        amount: u32,
    },
    /// Requests that the external spawner place a collectable reward.
    ///
    /// The spawner is expected to pick a destination through the empty-slot
    /// finder, nearest to the origin first.
    CollectableSpawnRequested {
        /// Slot whose merge earned the reward.
        origin: SlotOrder,
        /// Level the merged item reached.
        level: ItemLevel,
    },
    /// Confirms that a crated slot opened into a locker.
    CrateOpened {
        /// Slot that opened.
        order: SlotOrder,
    },
    /// Confirms that a locker slot unlocked.
    LockerUnlocked {
        /// Slot that unlocked.
        order: SlotOrder,
    },
    /// Confirms that a bubble overlay popped.
    BubblePopped {
        /// Slot that popped.
        order: SlotOrder,
    },
}

/// Reasons a merge request may be rejected by the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum MergeRejection {
    /// Source and target name the same slot.
    #[error("source and target are the same slot")]
    SameSlot,
    /// The source slot holds no item.
    #[error("source slot is empty")]
    SourceEmpty,
    /// The target slot holds no item.
    #[error("target slot is empty")]
    TargetEmpty,
    /// The target occupant is not in the default state.
    #[error("target item is not in the default state")]
    TargetNotDefault,
    /// The source occupant is still crated.
    #[error("source item is still crated")]
    SourceCrated,
    /// The occupants belong to different item kinds.
    #[error("item kinds differ")]
    KindMismatch,
    /// The occupants belong to different groups.
    #[error("item groups differ")]
    GroupMismatch,
    /// The occupants carry different sprites.
    #[error("item sprites differ")]
    SpriteMismatch,
    /// The occupants carry different levels.
    #[error("item levels differ")]
    LevelMismatch,
    /// The occupants already sit at the group's maximum level.
    #[error("items are already at the maximum level")]
    MaxLevel,
}

/// Failures reported by catalog lookups and construction.
///
/// A lookup miss indicates a configuration bug rather than a runtime edge
/// case, so callers propagate it to top-level error reporting instead of
/// defaulting.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// No descriptor exists for the requested combination.
    #[error("catalog has no descriptor for sprite {sprite}")]
    NotFound {
        /// Sprite that failed to resolve.
        sprite: SpriteId,
    },
    /// A sprite appeared more than once while building the catalog.
    #[error("catalog defines sprite {sprite} more than once")]
    DuplicateSprite {
        /// Sprite that was repeated.
        sprite: SpriteId,
    },
}

/// Failures reported by the board engine.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BoardError {
    /// The target slot already holds an item.
    #[error("target slot {0} is already occupied")]
    Occupied(SlotOrder),
    /// The operated slot holds no item.
    #[error("slot {0} is empty")]
    EmptySlot(SlotOrder),
    /// A slot order referenced a position outside the board.
    #[error("slot order {order} exceeds the {columns}x{rows} board")]
    OrderOutOfBounds {
        /// Order that failed to resolve.
        order: SlotOrder,
        /// Configured column count.
        columns: u32,
        /// Configured row count.
        rows: u32,
    },
    /// A coordinate referenced a position outside the board.
    #[error("coordinate {coord} lies outside the {columns}x{rows} board")]
    CoordOutOfBounds {
        /// Coordinate that failed to resolve.
        coord: SlotCoord,
        /// Configured column count.
        columns: u32,
        /// Configured row count.
        rows: u32,
    },
    /// Merge preconditions were not satisfied.
    #[error("merge of {source} into {target} rejected: {reason}")]
    InvalidMerge {
        /// Slot whose item would have been consumed.
        source: SlotOrder,
        /// Slot that would have received the upgrade.
        target: SlotOrder,
        /// Precondition that failed.
        reason: MergeRejection,
    },
    /// Undo was requested while the buffer was empty.
    #[error("no removal is pending undo")]
    NothingToUndo,
    /// A persisted snapshot held the wrong number of records.
    #[error("linear snapshot holds {actual} records, expected {expected}")]
    SnapshotLength {
        /// Record count the dimensions require.
        expected: usize,
        /// Record count actually provided.
        actual: usize,
    },
    /// A persisted snapshot repeated a slot order.
    #[error("linear snapshot repeats order {0}")]
    SnapshotDuplicate(SlotOrder),
    /// A catalog lookup failed; fatal, indicates a configuration bug.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
