#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless driver that runs a deterministic merge board session.
//!
//! The driver owns everything the core leaves external: it seeds a demo
//! catalog, scatters starting items, ticks the scan scheduler, applies the
//! hinted merges, cascades crate checks, and satisfies collectable spawn
//! requests through the empty-slot finder, printing the event log as it
//! goes. Equal seeds replay equal sessions.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use merge_grove_catalog::{Catalog, DescriptorSeed, GroupSpec};
use merge_grove_core::{
    Command, Event, GroupId, ItemKind, ItemLevel, ItemPayload, ItemSeed, SlotOrder, SlotState,
    SpriteId,
};
use merge_grove_system_merge_scan::{MergeScan, ScanConfig};
use merge_grove_system_scan_scheduler::{ScanDue, ScanScheduler, SchedulerConfig};
use merge_grove_system_spawn_placement::nearest_empty_slot;
use merge_grove_world::{apply, query, Board, DEFAULT_COLUMNS, DEFAULT_ROWS};

/// Command-line options accepted by the session driver.
#[derive(Debug, Parser)]
#[command(name = "merge-grove", about = "Headless merge board session driver")]
struct Options {
    /// Number of board columns.
    #[arg(long, default_value_t = DEFAULT_COLUMNS)]
    columns: u32,
    /// Number of board rows.
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    rows: u32,
    /// Number of items scattered before the session starts.
    #[arg(long, default_value_t = 24)]
    seed_items: usize,
    /// Simulation ticks to run.
    #[arg(long, default_value_t = 120)]
    ticks: u32,
    /// Milliseconds of simulated time per tick.
    #[arg(long, default_value_t = 250)]
    tick_millis: u64,
    /// Deterministic session seed.
    #[arg(long, default_value_t = 0x6d67)]
    seed: u64,
}

/// Entry point for the Merge Grove command-line driver.
fn main() -> Result<()> {
    let options = Options::parse();
    run_session(&options)
}

fn run_session(options: &Options) -> Result<()> {
    let catalog = demo_catalog().context("assemble the demo catalog")?;
    let mut board = Board::with_dimensions(catalog, options.columns, options.rows);
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);

    scatter_seed_items(&mut board, &mut rng, options.seed_items)
        .context("scatter starting items")?;
    println!(
        "session start: {}x{} board, {} items",
        options.columns,
        options.rows,
        query::occupied_count(&board)
    );

    let mut scheduler = ScanScheduler::new(SchedulerConfig::new(
        Duration::from_secs(2),
        Duration::from_secs(5),
        Duration::from_millis(300),
        options.seed,
    ));
    let mut scanner = MergeScan::new(ScanConfig::new(options.seed));

    let dt = Duration::from_millis(options.tick_millis);
    let mut tick_events: Vec<Event> = Vec::new();
    let mut due = Vec::new();
    let mut pairs = Vec::new();
    let mut targets = Vec::new();
    let mut held: Option<ItemPayload> = None;
    let mut merges = 0u32;

    for tick in 0..options.ticks {
        // Simulated drag: partway through each cycle the driver picks up an
        // item and holds it for a stretch of ticks, letting the held cadence
        // surface absorb targets the way a gesture layer would.
        let in_hold_window = (16..20).contains(&(tick % 24));
        if in_hold_window && held.is_none() {
            held = pick_held_item(&board);
            if let Some(payload) = &held {
                println!("tick {tick:3}: picked up {}", payload.sprite);
                scheduler.begin_hold();
            }
        } else if !in_hold_window && held.is_some() {
            held = None;
            scheduler.end_hold();
        }

        let events = std::mem::take(&mut tick_events);
        scheduler.handle(&events, dt, &mut due);

        for cadence in due.iter().copied() {
            match cadence {
                ScanDue::Idle => {
                    let view = query::board_view(&board);
                    let hint = scanner
                        .scan(&view, query::catalog(&board), &mut pairs)
                        .context("scan the board for mergeable pairs")?;
                    let Some(candidate) = hint else {
                        continue;
                    };

                    println!(
                        "tick {tick:3}: hint {} + {} ({})",
                        candidate.first, candidate.second, candidate.sprite
                    );
                    apply(
                        &mut board,
                        Command::Merge {
                            source: candidate.first,
                            target: candidate.second,
                        },
                        &mut tick_events,
                    )
                    .context("apply the hinted merge")?;
                    apply(
                        &mut board,
                        Command::CheckAdjacentCrates {
                            order: candidate.second,
                        },
                        &mut tick_events,
                    )
                    .context("cascade crate checks around the merge result")?;
                    merges += 1;
                    scheduler.set_hint(candidate);
                }
                ScanDue::Held => {
                    let Some(payload) = &held else {
                        continue;
                    };
                    let view = query::board_view(&board);
                    scanner.held_targets(&view, payload, &mut targets);
                    println!(
                        "tick {tick:3}: holding {}, {} absorb targets",
                        payload.sprite,
                        targets.len()
                    );
                }
            }
        }

        satisfy_spawn_requests(&mut board, &mut tick_events)
            .context("place requested collectable rewards")?;

        for event in &tick_events {
            println!("tick {tick:3}: {}", describe(event));
        }
    }

    println!(
        "session complete: {merges} merges, {} occupied slots",
        query::occupied_count(&board)
    );
    Ok(())
}

/// Picks the first interactable item for the simulated drag.
fn pick_held_item(board: &Board) -> Option<ItemPayload> {
    query::board_view(board)
        .into_vec()
        .into_iter()
        .find_map(|snapshot| {
            snapshot
                .payload
                .filter(|payload| payload.state == SlotState::Default)
        })
}

/// Places one collectable per spawn request, nearest to the merge first.
fn satisfy_spawn_requests(board: &mut Board, events: &mut Vec<Event>) -> Result<()> {
    let requests: Vec<(SlotOrder, ItemLevel)> = events
        .iter()
        .filter_map(|event| match event {
            Event::CollectableSpawnRequested { origin, level } => Some((*origin, *level)),
            _ => None,
        })
        .collect();

    for (origin, _level) in requests {
        let view = query::board_view(board);
        let Some(destination) = nearest_empty_slot(&view, Some(origin)) else {
            continue;
        };
        apply(
            board,
            Command::Place {
                target: destination.order,
                item: ItemSeed {
                    kind: ItemKind::Collectable,
                    group: GroupId::new("Gems"),
                    sprite: SpriteId::new("Gem1"),
                    state: SlotState::Default,
                    crate_variant: 0,
                },
            },
            events,
        )
        .context("place the collectable reward")?;
    }
    Ok(())
}

const SEED_TABLE: [(ItemKind, &str, &str, SlotState); 6] = [
    (ItemKind::Item, "Tools", "Sword1", SlotState::Default),
    (ItemKind::Item, "Tools", "Sword1", SlotState::Default),
    (ItemKind::Item, "Tools", "Sword2", SlotState::Default),
    (ItemKind::Item, "Plants", "Leaf1", SlotState::Default),
    (ItemKind::Item, "Plants", "Leaf1", SlotState::Default),
    (ItemKind::Chest, "Chests", "Chest1", SlotState::Crate),
];

fn scatter_seed_items(board: &mut Board, rng: &mut ChaCha8Rng, count: usize) -> Result<()> {
    for _ in 0..count {
        let view = query::board_view(board);
        let empties: Vec<SlotOrder> = view
            .iter()
            .filter(|snapshot| snapshot.is_empty())
            .map(|snapshot| snapshot.order)
            .collect();
        if empties.is_empty() {
            break;
        }

        let order = empties[rng.gen_range(0..empties.len())];
        let (kind, group, sprite, state) = SEED_TABLE[rng.gen_range(0..SEED_TABLE.len())];
        apply(
            board,
            Command::Place {
                target: order,
                item: ItemSeed {
                    kind,
                    group: GroupId::new(group),
                    sprite: SpriteId::new(sprite),
                    state,
                    crate_variant: 0,
                },
            },
            &mut Vec::new(),
        )
        .context("place a starting item")?;
    }
    Ok(())
}

fn demo_catalog() -> Result<Catalog> {
    let levelled = |kind: ItemKind, group: &str, prefix: &str, levels: u32| {
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
    };

    let catalog = Catalog::from_groups(vec![
        levelled(ItemKind::Item, "Tools", "Sword", 5),
        levelled(ItemKind::Item, "Plants", "Leaf", 4),
        levelled(ItemKind::Collectable, "Gems", "Gem", 5),
        levelled(ItemKind::Chest, "Chests", "Chest", 2),
    ])
    .context("the built-in demo catalog must be consistent")?;
    Ok(catalog)
}

fn describe(event: &Event) -> String {
    match event {
        Event::ItemPlaced { order, sprite, .. } => format!("placed {sprite} at {order}"),
        Event::ItemRemoved { order, .. } => format!("removed item at {order}"),
        Event::CurrencyCredited { amount } => format!("credit {amount} gold"),
        Event::ItemRestored { order, .. } => format!("restored item at {order}"),
        Event::CurrencyRevoked { amount } => format!("revoke {amount} gold"),
        Event::ItemMoved { from, to, .. } => format!("moved {from} -> {to}"),
        Event::ItemsSwapped { first, second } => format!("swapped {first} and {second}"),
        Event::ItemsMerged {
            target,
            sprite,
            level,
            ..
        } => format!("merged into {sprite} (level {level}) at {target}"),
        Event::ExperienceGranted { amount } => format!("grant {amount} xp"),
        Event::CollectableSpawnRequested { origin, level } => {
            format!("reward requested near {origin} (level {level})")
        }
        Event::CrateOpened { order } => format!("crate opened at {order}"),
        Event::LockerUnlocked { order } => format!("locker unlocked at {order}"),
        Event::BubblePopped { order } => format!("bubble popped at {order}"),
    }
}
