#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative merge board state for Merge Grove.
//!
//! The board owns the dense slot array, the item catalog, and the one-entry
//! undo buffer. All mutations flow through [`apply`], which validates every
//! precondition before touching state: a returned error guarantees the board
//! is unchanged. Successful commands broadcast [`Event`] values, including
//! the currency/experience/spawn effect requests consumed by external
//! collaborators.

use merge_grove_catalog::Catalog;
use merge_grove_core::{
    BoardDimensions, BoardError, Command, Event, ItemId, ItemKind, ItemLevel, ItemPayload,
    MergeRejection, SlotCoord, SlotOrder, SlotRecord, SlotState,
};

/// Default column count of a session board.
pub const DEFAULT_COLUMNS: u32 = 7;

/// Default row count of a session board.
pub const DEFAULT_ROWS: u32 = 9;

/// Default level at which a merge earns a collectable reward.
pub const DEFAULT_REWARD_THRESHOLD: ItemLevel = ItemLevel::new(4);

/// Snapshot captured by a removal, held until consumed or discarded.
///
/// The buffer holds at most one record: a newer removal overwrites it and
/// any other mutating command silently discards it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoRecord {
    order: SlotOrder,
    payload: ItemPayload,
    credited: u32,
}

impl UndoRecord {
    /// Slot the removed item occupied.
    #[must_use]
    pub const fn order(&self) -> SlotOrder {
        self.order
    }

    /// Exact payload captured at removal time.
    #[must_use]
    pub const fn payload(&self) -> &ItemPayload {
        &self.payload
    }

    /// Currency amount credited by the paired removal.
    #[must_use]
    pub const fn credited(&self) -> u32 {
        self.credited
    }
}

/// Represents the authoritative merge board state.
#[derive(Clone, Debug)]
pub struct Board {
    dimensions: BoardDimensions,
    slots: Vec<Option<ItemPayload>>,
    catalog: Catalog,
    undo: Option<UndoRecord>,
    next_item_id: u64,
    reward_threshold: ItemLevel,
}

impl Board {
    /// Creates an empty board with the default 7x9 layout.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self::with_dimensions(catalog, DEFAULT_COLUMNS, DEFAULT_ROWS)
    }

    /// Creates an empty board with explicit dimensions.
    #[must_use]
    pub fn with_dimensions(catalog: Catalog, columns: u32, rows: u32) -> Self {
        let dimensions = BoardDimensions::new(columns, rows);
        Self {
            slots: vec![None; dimensions.slot_count()],
            dimensions,
            catalog,
            undo: None,
            next_item_id: 0,
            reward_threshold: DEFAULT_REWARD_THRESHOLD,
        }
    }

    /// Overrides the level at which merges earn collectable rewards.
    #[must_use]
    pub fn with_reward_threshold(mut self, threshold: ItemLevel) -> Self {
        self.reward_threshold = threshold;
        self
    }

    /// Restores a board from a persisted linear snapshot.
    ///
    /// The snapshot must cover every slot exactly once; the item identifier
    /// allocator resumes past the highest identifier found.
    pub fn from_records(
        catalog: Catalog,
        columns: u32,
        rows: u32,
        records: Vec<SlotRecord>,
    ) -> Result<Self, BoardError> {
        let dimensions = BoardDimensions::new(columns, rows);
        let expected = dimensions.slot_count();
        if records.len() != expected {
            return Err(BoardError::SnapshotLength {
                expected,
                actual: records.len(),
            });
        }

        let mut slots: Vec<Option<ItemPayload>> = vec![None; expected];
        let mut filled = vec![false; expected];
        let mut next_item_id: u64 = 0;

        for record in records {
            let index = record.order.index();
            if index >= expected {
                return Err(BoardError::OrderOutOfBounds {
                    order: record.order,
                    columns,
                    rows,
                });
            }
            if filled[index] {
                return Err(BoardError::SnapshotDuplicate(record.order));
            }
            filled[index] = true;
            if let Some(payload) = &record.payload {
                next_item_id = next_item_id.max(payload.id.get().saturating_add(1));
            }
            slots[index] = record.payload;
        }

        Ok(Self {
            dimensions,
            slots,
            catalog,
            undo: None,
            next_item_id,
            reward_threshold: DEFAULT_REWARD_THRESHOLD,
        })
    }

    /// Writes raw slot content at the provided coordinate.
    ///
    /// This is the low-level seeding primitive for loaders that already
    /// hold fully-resolved payloads; gameplay mutations go through
    /// [`apply`]. The identifier allocator advances past the written
    /// payload so later placements stay unique, and any pending undo
    /// record is discarded.
    pub fn set_slot_at(
        &mut self,
        coord: SlotCoord,
        payload: Option<ItemPayload>,
    ) -> Result<(), BoardError> {
        let order = self
            .dimensions
            .order_of(coord)
            .ok_or(BoardError::CoordOutOfBounds {
                coord,
                columns: self.dimensions.columns(),
                rows: self.dimensions.rows(),
            })?;
        if let Some(payload) = &payload {
            self.next_item_id = self.next_item_id.max(payload.id.get().saturating_add(1));
        }
        self.discard_undo();
        self.slots[order.index()] = payload;
        Ok(())
    }

    fn index_of(&self, order: SlotOrder) -> Result<usize, BoardError> {
        if order.index() < self.slots.len() {
            Ok(order.index())
        } else {
            Err(BoardError::OrderOutOfBounds {
                order,
                columns: self.dimensions.columns(),
                rows: self.dimensions.rows(),
            })
        }
    }

    fn allocate_item_id(&mut self) -> ItemId {
        let id = ItemId::new(self.next_item_id);
        self.next_item_id = self.next_item_id.saturating_add(1);
        id
    }

    fn discard_undo(&mut self) {
        self.undo = None;
    }
}

/// Applies the provided command to the board, mutating state deterministically.
///
/// Errors are returned without mutating the board; the engine re-validates
/// every precondition rather than trusting the caller's eligibility checks.
pub fn apply(
    board: &mut Board,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), BoardError> {
    match command {
        Command::Place { target, item } => {
            let index = board.index_of(target)?;
            let level = board
                .catalog
                .resolve(item.kind, &item.group, &item.sprite)?
                .level();
            if board.slots[index].is_some() {
                return Err(BoardError::Occupied(target));
            }

            board.discard_undo();
            let id = board.allocate_item_id();
            board.slots[index] = Some(ItemPayload {
                id,
                sprite: item.sprite.clone(),
                kind: item.kind,
                group: item.group,
                level,
                state: item.state,
                crate_variant: item.crate_variant,
                completed: false,
            });
            out_events.push(Event::ItemPlaced {
                order: target,
                item: id,
                sprite: item.sprite,
            });
            Ok(())
        }
        Command::Remove { order, sell_value } => {
            let index = board.index_of(order)?;
            let Some(payload) = board.slots[index].take() else {
                return Err(BoardError::EmptySlot(order));
            };

            let item = payload.id;
            board.undo = Some(UndoRecord {
                order,
                payload,
                credited: sell_value,
            });
            out_events.push(Event::ItemRemoved { order, item });
            if sell_value > 0 {
                out_events.push(Event::CurrencyCredited { amount: sell_value });
            }
            Ok(())
        }
        Command::Undo => {
            let Some(record) = board.undo.take() else {
                return Err(BoardError::NothingToUndo);
            };
            let order = record.order;
            let index = board.index_of(order)?;
            if board.slots[index].is_some() {
                board.undo = Some(record);
                return Err(BoardError::Occupied(order));
            }

            let item = record.payload.id;
            out_events.push(Event::ItemRestored { order, item });
            if record.credited > 0 {
                out_events.push(Event::CurrencyRevoked {
                    amount: record.credited,
                });
            }
            board.slots[index] = Some(record.payload);
            Ok(())
        }
        Command::Move { from, to } => {
            let from_index = board.index_of(from)?;
            let to_index = board.index_of(to)?;
            if board.slots[from_index].is_none() {
                return Err(BoardError::EmptySlot(from));
            }
            if board.slots[to_index].is_some() {
                return Err(BoardError::Occupied(to));
            }

            board.discard_undo();
            let Some(payload) = board.slots[from_index].take() else {
                return Err(BoardError::EmptySlot(from));
            };
            let item = payload.id;
            board.slots[to_index] = Some(payload);
            out_events.push(Event::ItemMoved { from, to, item });
            Ok(())
        }
        Command::Swap { first, second } => {
            let first_index = board.index_of(first)?;
            let second_index = board.index_of(second)?;
            if board.slots[first_index].is_none() {
                return Err(BoardError::EmptySlot(first));
            }
            if board.slots[second_index].is_none() {
                return Err(BoardError::EmptySlot(second));
            }

            board.discard_undo();
            board.slots.swap(first_index, second_index);
            out_events.push(Event::ItemsSwapped { first, second });
            Ok(())
        }
        Command::Merge { source, target } => merge_items(board, source, target, out_events),
        Command::OpenCrate { order } => {
            if transition_slot(board, order, SlotState::Crate, SlotState::Locker)? {
                out_events.push(Event::CrateOpened { order });
            }
            Ok(())
        }
        Command::UnlockLocker { order } => {
            if transition_slot(board, order, SlotState::Locker, SlotState::Default)? {
                out_events.push(Event::LockerUnlocked { order });
            }
            Ok(())
        }
        Command::PopBubble { order } => {
            if transition_slot(board, order, SlotState::Bubble, SlotState::Default)? {
                out_events.push(Event::BubblePopped { order });
            }
            Ok(())
        }
        Command::CheckAdjacentCrates { order } => {
            let Some(coord) = board.dimensions.location_of(order) else {
                return Err(BoardError::OrderOutOfBounds {
                    order,
                    columns: board.dimensions.columns(),
                    rows: board.dimensions.rows(),
                });
            };

            for neighbor in orthogonal_neighbors(coord) {
                let Some(neighbor_order) = board.dimensions.order_of(neighbor) else {
                    continue;
                };
                if transition_slot(board, neighbor_order, SlotState::Crate, SlotState::Locker)? {
                    out_events.push(Event::CrateOpened {
                        order: neighbor_order,
                    });
                }
            }
            Ok(())
        }
    }
}

fn merge_items(
    board: &mut Board,
    source: SlotOrder,
    target: SlotOrder,
    out_events: &mut Vec<Event>,
) -> Result<(), BoardError> {
    let reject = |reason: MergeRejection| BoardError::InvalidMerge {
        source,
        target,
        reason,
    };

    let source_index = board.index_of(source)?;
    let target_index = board.index_of(target)?;
    if source == target {
        return Err(reject(MergeRejection::SameSlot));
    }

    let Some(source_item) = board.slots[source_index].as_ref() else {
        return Err(reject(MergeRejection::SourceEmpty));
    };
    let Some(target_item) = board.slots[target_index].as_ref() else {
        return Err(reject(MergeRejection::TargetEmpty));
    };

    if target_item.state != SlotState::Default {
        return Err(reject(MergeRejection::TargetNotDefault));
    }
    if source_item.state == SlotState::Crate {
        return Err(reject(MergeRejection::SourceCrated));
    }
    if source_item.kind != target_item.kind {
        return Err(reject(MergeRejection::KindMismatch));
    }
    if source_item.group != target_item.group {
        return Err(reject(MergeRejection::GroupMismatch));
    }
    if source_item.sprite != target_item.sprite {
        return Err(reject(MergeRejection::SpriteMismatch));
    }
    if source_item.level != target_item.level {
        return Err(reject(MergeRejection::LevelMismatch));
    }

    let descriptor =
        board
            .catalog
            .resolve(target_item.kind, &target_item.group, &target_item.sprite)?;
    let Some(next) = board.catalog.next_descriptor(descriptor) else {
        return Err(reject(MergeRejection::MaxLevel));
    };

    let next_sprite = next.sprite().clone();
    let next_level = next.level();
    let kind = target_item.kind;
    let item = target_item.id;

    board.discard_undo();
    board.slots[source_index] = None;
    if let Some(payload) = board.slots[target_index].as_mut() {
        payload.sprite = next_sprite.clone();
        payload.level = next_level;
        payload.completed = false;
    }

    out_events.push(Event::ItemsMerged {
        source,
        target,
        item,
        sprite: next_sprite,
        level: next_level,
    });
    out_events.push(Event::ExperienceGranted {
        amount: next_level.get(),
    });
    if next_level >= board.reward_threshold && kind != ItemKind::Collectable {
        out_events.push(Event::CollectableSpawnRequested {
            origin: target,
            level: next_level,
        });
    }
    Ok(())
}

/// Moves the slot between lock states, reporting whether it transitioned.
///
/// Wrong-state and empty slots succeed trivially so cascading checks never
/// need to pre-validate; only out-of-range orders are errors.
fn transition_slot(
    board: &mut Board,
    order: SlotOrder,
    from: SlotState,
    to: SlotState,
) -> Result<bool, BoardError> {
    let index = board.index_of(order)?;
    let transitions = matches!(board.slots[index].as_ref(), Some(payload) if payload.state == from);
    if !transitions {
        return Ok(false);
    }

    board.discard_undo();
    if let Some(payload) = board.slots[index].as_mut() {
        payload.state = to;
    }
    Ok(true)
}

/// Yields the four orthogonal neighbor coordinates in N, E, S, W order.
///
/// The grid does not wrap; callers drop neighbors the dimensions reject.
fn orthogonal_neighbors(coord: SlotCoord) -> impl Iterator<Item = SlotCoord> {
    let column = coord.column();
    let row = coord.row();
    let mut neighbors = Vec::with_capacity(4);
    if let Some(north) = row.checked_sub(1) {
        neighbors.push(SlotCoord::new(column, north));
    }
    if let Some(east) = column.checked_add(1) {
        neighbors.push(SlotCoord::new(east, row));
    }
    if let Some(south) = row.checked_add(1) {
        neighbors.push(SlotCoord::new(column, south));
    }
    if let Some(west) = column.checked_sub(1) {
        neighbors.push(SlotCoord::new(west, row));
    }
    neighbors.into_iter()
}

/// Query functions that provide read-only access to the board state.
pub mod query {
    use super::{Board, UndoRecord};
    use merge_grove_catalog::Catalog;
    use merge_grove_core::{
        BoardDimensions, BoardError, BoardView, SlotCoord, SlotOrder, SlotRecord, SlotSnapshot,
    };

    /// Dimensions of the board grid.
    #[must_use]
    pub fn dimensions(board: &Board) -> BoardDimensions {
        board.dimensions
    }

    /// Provides read-only access to the board's item catalog.
    #[must_use]
    pub fn catalog(board: &Board) -> &Catalog {
        &board.catalog
    }

    /// Captures a snapshot of the slot at the provided order.
    pub fn slot(board: &Board, order: SlotOrder) -> Result<SlotSnapshot, BoardError> {
        let index = board.index_of(order)?;
        let coord = board
            .dimensions
            .location_of(order)
            .ok_or(BoardError::OrderOutOfBounds {
                order,
                columns: board.dimensions.columns(),
                rows: board.dimensions.rows(),
            })?;
        Ok(SlotSnapshot {
            order,
            coord,
            payload: board.slots[index].clone(),
        })
    }

    /// Captures a snapshot of the slot at the provided coordinate.
    pub fn slot_at(board: &Board, coord: SlotCoord) -> Result<SlotSnapshot, BoardError> {
        let order = board
            .dimensions
            .order_of(coord)
            .ok_or(BoardError::CoordOutOfBounds {
                coord,
                columns: board.dimensions.columns(),
                rows: board.dimensions.rows(),
            })?;
        slot(board, order)
    }

    /// Captures a dense read-only view of every slot.
    #[must_use]
    pub fn board_view(board: &Board) -> BoardView {
        let mut snapshots = Vec::with_capacity(board.slots.len());
        for (index, payload) in board.slots.iter().enumerate() {
            let order = SlotOrder::new(index as u32);
            let Some(coord) = board.dimensions.location_of(order) else {
                continue;
            };
            snapshots.push(SlotSnapshot {
                order,
                coord,
                payload: payload.clone(),
            });
        }
        BoardView::from_snapshots(board.dimensions, snapshots)
    }

    /// Serializes the grid into a flat order-indexed record list.
    ///
    /// `Board::from_records` restores the exact same grid; external
    /// persistence must preserve ordering and every field verbatim.
    #[must_use]
    pub fn to_linear(board: &Board) -> Vec<SlotRecord> {
        board
            .slots
            .iter()
            .enumerate()
            .map(|(index, payload)| SlotRecord {
                order: SlotOrder::new(index as u32),
                payload: payload.clone(),
            })
            .collect()
    }

    /// Provides read-only access to the pending undo record, if any.
    #[must_use]
    pub fn pending_undo(board: &Board) -> Option<&UndoRecord> {
        board.undo.as_ref()
    }

    /// Number of slots currently holding an item.
    #[must_use]
    pub fn occupied_count(board: &Board) -> usize {
        board.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::{apply, query, Board, DEFAULT_COLUMNS, DEFAULT_ROWS};
    use merge_grove_catalog::{Catalog, DescriptorSeed, GroupSpec};
    use merge_grove_core::{
        BoardError, CatalogError, Command, Event, GroupId, ItemId, ItemKind, ItemLevel,
        ItemPayload, ItemSeed, MergeRejection, SlotCoord, SlotOrder, SlotState, SpriteId,
    };

    fn levelled_group(kind: ItemKind, group: &str, prefix: &str, levels: u32) -> GroupSpec {
        GroupSpec::new(
            kind,
            GroupId::new(group),
            (1..=levels)
                .map(|level| {
                    DescriptorSeed::new(
                        SpriteId::new(format!("{prefix}{level}")),
                        format!("{prefix} {level}"),
                    )
                })
                .collect(),
        )
    }

    fn demo_catalog() -> Catalog {
        Catalog::from_groups(vec![
            levelled_group(ItemKind::Item, "Tools", "Sword", 5),
            levelled_group(ItemKind::Collectable, "Gems", "Gem", 5),
            levelled_group(ItemKind::Chest, "Chests", "Chest", 2),
        ])
        .expect("demo catalog builds")
    }

    fn board() -> Board {
        Board::new(demo_catalog())
    }

    fn tool_seed(sprite: &str) -> ItemSeed {
        ItemSeed {
            kind: ItemKind::Item,
            group: GroupId::new("Tools"),
            sprite: SpriteId::new(sprite),
            state: SlotState::Default,
            crate_variant: 0,
        }
    }

    fn place(board: &mut Board, order: u32, seed: ItemSeed) {
        apply(
            board,
            Command::Place {
                target: SlotOrder::new(order),
                item: seed,
            },
            &mut Vec::new(),
        )
        .expect("placement succeeds");
    }

    fn place_tool(board: &mut Board, order: u32, sprite: &str) {
        place(board, order, tool_seed(sprite));
    }

    fn merge(board: &mut Board, source: u32, target: u32) -> Result<Vec<Event>, BoardError> {
        let mut events = Vec::new();
        apply(
            board,
            Command::Merge {
                source: SlotOrder::new(source),
                target: SlotOrder::new(target),
            },
            &mut events,
        )
        .map(|()| events)
    }

    #[test]
    fn place_writes_item_into_empty_slot() {
        let mut board = board();
        let mut events = Vec::new();
        apply(
            &mut board,
            Command::Place {
                target: SlotOrder::new(3),
                item: tool_seed("Sword1"),
            },
            &mut events,
        )
        .expect("placement succeeds");

        let snapshot = query::slot(&board, SlotOrder::new(3)).expect("slot resolves");
        let payload = snapshot.payload.expect("slot is occupied");
        assert_eq!(payload.sprite, SpriteId::new("Sword1"));
        assert_eq!(payload.level, ItemLevel::new(1));
        assert_eq!(payload.state, SlotState::Default);
        assert_eq!(
            events,
            vec![Event::ItemPlaced {
                order: SlotOrder::new(3),
                item: payload.id,
                sprite: SpriteId::new("Sword1"),
            }]
        );
    }

    #[test]
    fn place_rejects_occupied_slot() {
        let mut board = board();
        place_tool(&mut board, 3, "Sword1");
        let before = query::slot(&board, SlotOrder::new(3)).expect("slot resolves");

        let result = apply(
            &mut board,
            Command::Place {
                target: SlotOrder::new(3),
                item: tool_seed("Sword2"),
            },
            &mut Vec::new(),
        );

        assert_eq!(result, Err(BoardError::Occupied(SlotOrder::new(3))));
        assert_eq!(
            query::slot(&board, SlotOrder::new(3)).expect("slot resolves"),
            before,
        );
    }

    #[test]
    fn place_propagates_catalog_misses_as_fatal() {
        let mut board = board();
        let result = apply(
            &mut board,
            Command::Place {
                target: SlotOrder::new(0),
                item: tool_seed("Axe1"),
            },
            &mut Vec::new(),
        );

        assert_eq!(
            result,
            Err(BoardError::Catalog(CatalogError::NotFound {
                sprite: SpriteId::new("Axe1")
            }))
        );
        assert_eq!(query::occupied_count(&board), 0);
    }

    #[test]
    fn out_of_range_orders_are_rejected() {
        let mut board = board();
        let past_end = DEFAULT_COLUMNS * DEFAULT_ROWS;
        let result = apply(
            &mut board,
            Command::Place {
                target: SlotOrder::new(past_end),
                item: tool_seed("Sword1"),
            },
            &mut Vec::new(),
        );

        assert_eq!(
            result,
            Err(BoardError::OrderOutOfBounds {
                order: SlotOrder::new(past_end),
                columns: DEFAULT_COLUMNS,
                rows: DEFAULT_ROWS,
            })
        );
    }

    #[test]
    fn remove_then_undo_restores_the_exact_slot() {
        let mut board = board();
        place_tool(&mut board, 8, "Sword2");
        let before = query::slot(&board, SlotOrder::new(8)).expect("slot resolves");
        let item = before.payload.as_ref().expect("slot is occupied").id;

        let mut events = Vec::new();
        apply(
            &mut board,
            Command::Remove {
                order: SlotOrder::new(8),
                sell_value: 25,
            },
            &mut events,
        )
        .expect("removal succeeds");

        assert_eq!(
            events,
            vec![
                Event::ItemRemoved {
                    order: SlotOrder::new(8),
                    item,
                },
                Event::CurrencyCredited { amount: 25 },
            ]
        );
        assert!(query::slot(&board, SlotOrder::new(8))
            .expect("slot resolves")
            .is_empty());
        assert!(query::pending_undo(&board).is_some());

        let mut undo_events = Vec::new();
        apply(&mut board, Command::Undo, &mut undo_events).expect("undo succeeds");

        assert_eq!(
            undo_events,
            vec![
                Event::ItemRestored {
                    order: SlotOrder::new(8),
                    item,
                },
                Event::CurrencyRevoked { amount: 25 },
            ]
        );
        assert_eq!(
            query::slot(&board, SlotOrder::new(8)).expect("slot resolves"),
            before,
        );
        assert!(query::pending_undo(&board).is_none());
    }

    #[test]
    fn undo_with_empty_buffer_reports_nothing_to_undo() {
        let mut board = board();
        assert_eq!(
            apply(&mut board, Command::Undo, &mut Vec::new()),
            Err(BoardError::NothingToUndo)
        );
    }

    #[test]
    fn intervening_mutation_discards_the_pending_undo() {
        let mut board = board();
        place_tool(&mut board, 0, "Sword1");
        place_tool(&mut board, 5, "Sword2");

        apply(
            &mut board,
            Command::Remove {
                order: SlotOrder::new(0),
                sell_value: 10,
            },
            &mut Vec::new(),
        )
        .expect("removal succeeds");

        apply(
            &mut board,
            Command::Move {
                from: SlotOrder::new(5),
                to: SlotOrder::new(6),
            },
            &mut Vec::new(),
        )
        .expect("move succeeds");

        assert_eq!(
            apply(&mut board, Command::Undo, &mut Vec::new()),
            Err(BoardError::NothingToUndo)
        );
        assert!(query::slot(&board, SlotOrder::new(0))
            .expect("slot resolves")
            .is_empty());
    }

    #[test]
    fn newer_removal_overwrites_the_pending_record() {
        let mut board = board();
        place_tool(&mut board, 0, "Sword1");
        place_tool(&mut board, 1, "Sword2");

        for order in [0, 1] {
            apply(
                &mut board,
                Command::Remove {
                    order: SlotOrder::new(order),
                    sell_value: 0,
                },
                &mut Vec::new(),
            )
            .expect("removal succeeds");
        }

        apply(&mut board, Command::Undo, &mut Vec::new()).expect("undo succeeds");
        let restored = query::slot(&board, SlotOrder::new(1)).expect("slot resolves");
        assert_eq!(
            restored.payload.expect("slot restored").sprite,
            SpriteId::new("Sword2")
        );
        assert!(query::slot(&board, SlotOrder::new(0))
            .expect("slot resolves")
            .is_empty());
        assert_eq!(
            apply(&mut board, Command::Undo, &mut Vec::new()),
            Err(BoardError::NothingToUndo)
        );
    }

    #[test]
    fn move_preserves_item_identity() {
        let mut board = board();
        place_tool(&mut board, 2, "Sword3");
        let item = query::slot(&board, SlotOrder::new(2))
            .expect("slot resolves")
            .payload
            .expect("slot is occupied")
            .id;

        let mut events = Vec::new();
        apply(
            &mut board,
            Command::Move {
                from: SlotOrder::new(2),
                to: SlotOrder::new(40),
            },
            &mut events,
        )
        .expect("move succeeds");

        assert_eq!(
            events,
            vec![Event::ItemMoved {
                from: SlotOrder::new(2),
                to: SlotOrder::new(40),
                item,
            }]
        );
        assert!(query::slot(&board, SlotOrder::new(2))
            .expect("slot resolves")
            .is_empty());
        assert_eq!(
            query::slot(&board, SlotOrder::new(40))
                .expect("slot resolves")
                .payload
                .expect("slot is occupied")
                .id,
            item,
        );
    }

    #[test]
    fn move_rejects_missing_source_and_occupied_target() {
        let mut board = board();
        place_tool(&mut board, 1, "Sword1");
        place_tool(&mut board, 2, "Sword2");

        assert_eq!(
            apply(
                &mut board,
                Command::Move {
                    from: SlotOrder::new(10),
                    to: SlotOrder::new(11),
                },
                &mut Vec::new(),
            ),
            Err(BoardError::EmptySlot(SlotOrder::new(10)))
        );
        assert_eq!(
            apply(
                &mut board,
                Command::Move {
                    from: SlotOrder::new(1),
                    to: SlotOrder::new(2),
                },
                &mut Vec::new(),
            ),
            Err(BoardError::Occupied(SlotOrder::new(2)))
        );
    }

    #[test]
    fn swap_exchanges_contents_between_positions() {
        let mut board = board();
        place_tool(&mut board, 0, "Sword1");
        place_tool(&mut board, 9, "Sword4");
        let first_item = query::slot(&board, SlotOrder::new(0))
            .expect("slot resolves")
            .payload
            .expect("occupied")
            .id;

        let mut events = Vec::new();
        apply(
            &mut board,
            Command::Swap {
                first: SlotOrder::new(0),
                second: SlotOrder::new(9),
            },
            &mut events,
        )
        .expect("swap succeeds");

        assert_eq!(
            events,
            vec![Event::ItemsSwapped {
                first: SlotOrder::new(0),
                second: SlotOrder::new(9),
            }]
        );
        assert_eq!(
            query::slot(&board, SlotOrder::new(9))
                .expect("slot resolves")
                .payload
                .expect("occupied")
                .id,
            first_item,
        );
        assert_eq!(
            query::slot(&board, SlotOrder::new(0))
                .expect("slot resolves")
                .payload
                .expect("occupied")
                .sprite,
            SpriteId::new("Sword4"),
        );
    }

    #[test]
    fn swap_requires_both_slots_occupied() {
        let mut board = board();
        place_tool(&mut board, 0, "Sword1");
        assert_eq!(
            apply(
                &mut board,
                Command::Swap {
                    first: SlotOrder::new(0),
                    second: SlotOrder::new(1),
                },
                &mut Vec::new(),
            ),
            Err(BoardError::EmptySlot(SlotOrder::new(1)))
        );
    }

    #[test]
    fn merging_identical_items_upgrades_the_target() {
        let mut board = board();
        place_tool(&mut board, 0, "Sword1");
        place_tool(&mut board, 1, "Sword1");
        let target_item = query::slot(&board, SlotOrder::new(1))
            .expect("slot resolves")
            .payload
            .expect("occupied")
            .id;

        let events = merge(&mut board, 0, 1).expect("merge succeeds");

        assert!(query::slot(&board, SlotOrder::new(0))
            .expect("slot resolves")
            .is_empty());
        let upgraded = query::slot(&board, SlotOrder::new(1))
            .expect("slot resolves")
            .payload
            .expect("occupied");
        assert_eq!(upgraded.sprite, SpriteId::new("Sword2"));
        assert_eq!(upgraded.level, ItemLevel::new(2));
        assert_eq!(upgraded.id, target_item);
        assert_eq!(
            events,
            vec![
                Event::ItemsMerged {
                    source: SlotOrder::new(0),
                    target: SlotOrder::new(1),
                    item: target_item,
                    sprite: SpriteId::new("Sword2"),
                    level: ItemLevel::new(2),
                },
                Event::ExperienceGranted { amount: 2 },
            ]
        );
    }

    #[test]
    fn merge_rejects_mismatched_items_without_mutation() {
        let mut board = board();
        place_tool(&mut board, 0, "Sword1");
        place_tool(&mut board, 1, "Sword2");
        let before_source = query::slot(&board, SlotOrder::new(0)).expect("slot resolves");
        let before_target = query::slot(&board, SlotOrder::new(1)).expect("slot resolves");

        let result = merge(&mut board, 0, 1);

        assert_eq!(
            result,
            Err(BoardError::InvalidMerge {
                source: SlotOrder::new(0),
                target: SlotOrder::new(1),
                reason: MergeRejection::SpriteMismatch,
            })
        );
        assert_eq!(
            query::slot(&board, SlotOrder::new(0)).expect("slot resolves"),
            before_source,
        );
        assert_eq!(
            query::slot(&board, SlotOrder::new(1)).expect("slot resolves"),
            before_target,
        );
    }

    #[test]
    fn merge_rejects_empty_slots() {
        let mut board = board();
        place_tool(&mut board, 1, "Sword1");

        assert_eq!(
            merge(&mut board, 0, 1),
            Err(BoardError::InvalidMerge {
                source: SlotOrder::new(0),
                target: SlotOrder::new(1),
                reason: MergeRejection::SourceEmpty,
            })
        );
        assert_eq!(
            merge(&mut board, 1, 2),
            Err(BoardError::InvalidMerge {
                source: SlotOrder::new(1),
                target: SlotOrder::new(2),
                reason: MergeRejection::TargetEmpty,
            })
        );
    }

    #[test]
    fn merge_rejects_crated_participants() {
        let mut board = board();
        let mut crated = tool_seed("Sword1");
        crated.state = SlotState::Crate;
        place(&mut board, 0, crated);
        place_tool(&mut board, 1, "Sword1");

        assert_eq!(
            merge(&mut board, 0, 1),
            Err(BoardError::InvalidMerge {
                source: SlotOrder::new(0),
                target: SlotOrder::new(1),
                reason: MergeRejection::SourceCrated,
            })
        );
        assert_eq!(
            merge(&mut board, 1, 0),
            Err(BoardError::InvalidMerge {
                source: SlotOrder::new(1),
                target: SlotOrder::new(0),
                reason: MergeRejection::TargetNotDefault,
            })
        );
    }

    #[test]
    fn merge_rejects_the_maximum_level() {
        let mut board = board();
        place_tool(&mut board, 0, "Sword5");
        place_tool(&mut board, 1, "Sword5");

        assert_eq!(
            merge(&mut board, 0, 1),
            Err(BoardError::InvalidMerge {
                source: SlotOrder::new(0),
                target: SlotOrder::new(1),
                reason: MergeRejection::MaxLevel,
            })
        );
    }

    #[test]
    fn merge_rejects_a_slot_against_itself() {
        let mut board = board();
        place_tool(&mut board, 0, "Sword1");
        assert_eq!(
            merge(&mut board, 0, 0),
            Err(BoardError::InvalidMerge {
                source: SlotOrder::new(0),
                target: SlotOrder::new(0),
                reason: MergeRejection::SameSlot,
            })
        );
    }

    #[test]
    fn reward_threshold_merge_requests_a_collectable() {
        let mut board = board();
        place_tool(&mut board, 0, "Sword3");
        place_tool(&mut board, 1, "Sword3");

        let events = merge(&mut board, 0, 1).expect("merge succeeds");

        assert!(events.contains(&Event::CollectableSpawnRequested {
            origin: SlotOrder::new(1),
            level: ItemLevel::new(4),
        }));
        assert!(events.contains(&Event::ExperienceGranted { amount: 4 }));
    }

    #[test]
    fn collectable_merges_never_request_further_rewards() {
        let mut board = board();
        let gem = |sprite: &str| ItemSeed {
            kind: ItemKind::Collectable,
            group: GroupId::new("Gems"),
            sprite: SpriteId::new(sprite),
            state: SlotState::Default,
            crate_variant: 0,
        };
        place(&mut board, 0, gem("Gem3"));
        place(&mut board, 1, gem("Gem3"));

        let events = merge(&mut board, 0, 1).expect("merge succeeds");

        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::CollectableSpawnRequested { .. })));
    }

    #[test]
    fn adjacent_check_opens_a_neighboring_crate_exactly_once() {
        let mut board = board();
        let chest = ItemSeed {
            kind: ItemKind::Chest,
            group: GroupId::new("Chests"),
            sprite: SpriteId::new("Chest1"),
            state: SlotState::Crate,
            crate_variant: 1,
        };
        place(&mut board, 5, chest);
        place_tool(&mut board, 4, "Sword1");
        place_tool(&mut board, 13, "Sword1");

        // The merge result lands at order 4, orthogonally adjacent to the
        // crate at order 5 (same column, neighboring rows).
        let _ = merge(&mut board, 13, 4).expect("merge succeeds");

        let mut events = Vec::new();
        apply(
            &mut board,
            Command::CheckAdjacentCrates {
                order: SlotOrder::new(4),
            },
            &mut events,
        )
        .expect("adjacency check succeeds");

        assert_eq!(
            events,
            vec![Event::CrateOpened {
                order: SlotOrder::new(5)
            }]
        );
        assert_eq!(
            query::slot(&board, SlotOrder::new(5))
                .expect("slot resolves")
                .payload
                .expect("occupied")
                .state,
            SlotState::Locker,
        );

        let mut repeat_events = Vec::new();
        apply(
            &mut board,
            Command::CheckAdjacentCrates {
                order: SlotOrder::new(4),
            },
            &mut repeat_events,
        )
        .expect("repeat check succeeds");
        assert!(repeat_events.is_empty());
    }

    #[test]
    fn lock_state_transitions_walk_crate_to_default() {
        let mut board = board();
        let chest = ItemSeed {
            kind: ItemKind::Chest,
            group: GroupId::new("Chests"),
            sprite: SpriteId::new("Chest1"),
            state: SlotState::Crate,
            crate_variant: 0,
        };
        place(&mut board, 20, chest);

        let mut events = Vec::new();
        apply(
            &mut board,
            Command::OpenCrate {
                order: SlotOrder::new(20),
            },
            &mut events,
        )
        .expect("open succeeds");
        assert_eq!(
            events,
            vec![Event::CrateOpened {
                order: SlotOrder::new(20)
            }]
        );

        events.clear();
        apply(
            &mut board,
            Command::UnlockLocker {
                order: SlotOrder::new(20),
            },
            &mut events,
        )
        .expect("unlock succeeds");
        assert_eq!(
            events,
            vec![Event::LockerUnlocked {
                order: SlotOrder::new(20)
            }]
        );
        assert_eq!(
            query::slot(&board, SlotOrder::new(20))
                .expect("slot resolves")
                .payload
                .expect("occupied")
                .state,
            SlotState::Default,
        );
    }

    #[test]
    fn wrong_state_transitions_are_trivial_successes() {
        let mut board = board();
        place_tool(&mut board, 0, "Sword1");

        let mut events = Vec::new();
        apply(
            &mut board,
            Command::OpenCrate {
                order: SlotOrder::new(0),
            },
            &mut events,
        )
        .expect("wrong-state open is a no-op");
        apply(
            &mut board,
            Command::PopBubble {
                order: SlotOrder::new(0),
            },
            &mut events,
        )
        .expect("wrong-state pop is a no-op");
        apply(
            &mut board,
            Command::UnlockLocker {
                order: SlotOrder::new(44),
            },
            &mut events,
        )
        .expect("empty-slot unlock is a no-op");
        assert!(events.is_empty());
    }

    #[test]
    fn popping_a_bubble_returns_the_item_to_default() {
        let mut board = board();
        let mut bubbled = tool_seed("Sword1");
        bubbled.state = SlotState::Bubble;
        place(&mut board, 7, bubbled);

        let mut events = Vec::new();
        apply(
            &mut board,
            Command::PopBubble {
                order: SlotOrder::new(7),
            },
            &mut events,
        )
        .expect("pop succeeds");

        assert_eq!(
            events,
            vec![Event::BubblePopped {
                order: SlotOrder::new(7)
            }]
        );
        assert_eq!(
            query::slot(&board, SlotOrder::new(7))
                .expect("slot resolves")
                .payload
                .expect("occupied")
                .state,
            SlotState::Default,
        );
    }

    #[test]
    fn state_transitions_discard_the_pending_undo() {
        let mut board = board();
        place_tool(&mut board, 0, "Sword1");
        let mut crated = tool_seed("Sword2");
        crated.state = SlotState::Crate;
        place(&mut board, 1, crated);

        apply(
            &mut board,
            Command::Remove {
                order: SlotOrder::new(0),
                sell_value: 0,
            },
            &mut Vec::new(),
        )
        .expect("removal succeeds");

        apply(
            &mut board,
            Command::OpenCrate {
                order: SlotOrder::new(1),
            },
            &mut Vec::new(),
        )
        .expect("open succeeds");

        assert_eq!(
            apply(&mut board, Command::Undo, &mut Vec::new()),
            Err(BoardError::NothingToUndo)
        );
    }

    #[test]
    fn raw_slot_writes_are_bounds_checked_and_readable() {
        let mut board = board();
        let payload = ItemPayload {
            id: ItemId::new(900),
            sprite: SpriteId::new("Sword4"),
            kind: ItemKind::Item,
            group: GroupId::new("Tools"),
            level: ItemLevel::new(4),
            state: SlotState::Bubble,
            crate_variant: 0,
            completed: true,
        };

        board
            .set_slot_at(SlotCoord::new(2, 3), Some(payload.clone()))
            .expect("write succeeds");
        let read = query::slot_at(&board, SlotCoord::new(2, 3)).expect("read succeeds");
        assert_eq!(read.payload, Some(payload));

        let out_of_range = board.set_slot_at(SlotCoord::new(7, 0), None);
        assert_eq!(
            out_of_range,
            Err(BoardError::CoordOutOfBounds {
                coord: SlotCoord::new(7, 0),
                columns: DEFAULT_COLUMNS,
                rows: DEFAULT_ROWS,
            })
        );

        // The allocator must not reuse identities below the raw write.
        place_tool(&mut board, 0, "Sword1");
        let fresh = query::slot(&board, SlotOrder::new(0))
            .expect("slot resolves")
            .payload
            .expect("occupied")
            .id;
        assert!(fresh > ItemId::new(900));
    }

    #[test]
    fn linear_round_trip_preserves_every_slot() {
        let mut board = board();
        place_tool(&mut board, 0, "Sword1");
        let mut crated = tool_seed("Sword2");
        crated.state = SlotState::Crate;
        crated.crate_variant = 3;
        place(&mut board, 10, crated);
        let mut bubbled = tool_seed("Sword3");
        bubbled.state = SlotState::Bubble;
        place(&mut board, 62, bubbled);

        let records = query::to_linear(&board);
        let restored = Board::from_records(demo_catalog(), DEFAULT_COLUMNS, DEFAULT_ROWS, records)
            .expect("restore succeeds");

        assert_eq!(query::to_linear(&restored), query::to_linear(&board));
    }

    #[test]
    fn linear_round_trip_handles_the_empty_and_full_extremes() {
        let empty = board();
        let restored = Board::from_records(
            demo_catalog(),
            DEFAULT_COLUMNS,
            DEFAULT_ROWS,
            query::to_linear(&empty),
        )
        .expect("empty restore succeeds");
        assert_eq!(query::occupied_count(&restored), 0);

        let mut full = board();
        for order in 0..DEFAULT_COLUMNS * DEFAULT_ROWS {
            place_tool(&mut full, order, "Sword1");
        }
        let restored = Board::from_records(
            demo_catalog(),
            DEFAULT_COLUMNS,
            DEFAULT_ROWS,
            query::to_linear(&full),
        )
        .expect("full restore succeeds");
        assert_eq!(query::to_linear(&restored), query::to_linear(&full));
    }

    #[test]
    fn restore_validates_record_counts_and_duplicates() {
        let board = board();
        let mut records = query::to_linear(&board);
        let _ = records.pop();
        assert_eq!(
            Board::from_records(demo_catalog(), DEFAULT_COLUMNS, DEFAULT_ROWS, records)
                .err()
                .map(|error| matches!(error, BoardError::SnapshotLength { .. })),
            Some(true),
        );

        let mut records = query::to_linear(&board);
        records[1].order = SlotOrder::new(0);
        assert_eq!(
            Board::from_records(demo_catalog(), DEFAULT_COLUMNS, DEFAULT_ROWS, records).err(),
            Some(BoardError::SnapshotDuplicate(SlotOrder::new(0))),
        );
    }

    #[test]
    fn restore_resumes_item_identifiers_past_the_snapshot() {
        let mut board = board();
        place_tool(&mut board, 0, "Sword1");
        place_tool(&mut board, 1, "Sword2");
        let highest = query::slot(&board, SlotOrder::new(1))
            .expect("slot resolves")
            .payload
            .expect("occupied")
            .id;

        let mut restored = Board::from_records(
            demo_catalog(),
            DEFAULT_COLUMNS,
            DEFAULT_ROWS,
            query::to_linear(&board),
        )
        .expect("restore succeeds");
        place_tool(&mut restored, 2, "Sword3");

        let fresh = query::slot(&restored, SlotOrder::new(2))
            .expect("slot resolves")
            .payload
            .expect("occupied")
            .id;
        assert!(fresh > highest);
    }
}
