#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick-driven scheduler for the board's two scan cadences.
//!
//! The idle scan fires on a multi-second randomized delay so hints never nag
//! the player; the held scan fires on a sub-second fixed delay while the
//! player drags an item. Each cadence keeps at most one pending timer, and
//! requesting a scan while one is pending is a no-op. The scheduler also
//! parks the currently surfaced hint and drops it the moment an event
//! mutates a slot the hint references, so stale pairs are never shown.
//!
//! Engine operations stay synchronous; this is the only time-aware
//! component, driven entirely by the embedder's update tick.

use std::time::Duration;

use merge_grove_core::{Event, MergeCandidate};

/// Configuration parameters required to construct the scheduler.
#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    idle_delay_min: Duration,
    idle_delay_max: Duration,
    held_delay: Duration,
    rng_seed: u64,
}

impl SchedulerConfig {
    /// Creates a new configuration with explicit cadences and delay seed.
    #[must_use]
    pub const fn new(
        idle_delay_min: Duration,
        idle_delay_max: Duration,
        held_delay: Duration,
        rng_seed: u64,
    ) -> Self {
        Self {
            idle_delay_min,
            idle_delay_max,
            held_delay,
            rng_seed,
        }
    }
}

/// Scan cadence whose timer expired during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanDue {
    /// The slow randomized board-wide pairing scan.
    Idle,
    /// The fast held-item target scan.
    Held,
}

/// Two-cadence scheduler dispatching the possible-merge scans.
#[derive(Debug)]
pub struct ScanScheduler {
    config: SchedulerConfig,
    rng: SplitMix64,
    idle_pending: Option<Duration>,
    held_pending: Option<Duration>,
    holding: bool,
    hint: Option<MergeCandidate>,
}

impl ScanScheduler {
    /// Creates a new scheduler with the idle cadence already armed.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        let mut rng = SplitMix64::new(config.rng_seed);
        let initial_delay = sample_delay(&mut rng, config.idle_delay_min, config.idle_delay_max);
        Self {
            config,
            rng,
            idle_pending: Some(initial_delay),
            held_pending: None,
            holding: false,
            hint: None,
        }
    }

    /// Arms the idle cadence; a no-op while a scan is already pending.
    pub fn request_idle_scan(&mut self) {
        if self.idle_pending.is_none() {
            self.idle_pending = Some(self.next_idle_delay());
        }
    }

    /// Arms the held cadence for the duration of a drag.
    ///
    /// Calling again while already holding leaves the pending timer alone.
    pub fn begin_hold(&mut self) {
        self.holding = true;
        if self.held_pending.is_none() {
            self.held_pending = Some(self.config.held_delay);
        }
    }

    /// Disarms the held cadence when the drag ends.
    pub fn end_hold(&mut self) {
        self.holding = false;
        self.held_pending = None;
    }

    /// Parks the hint currently surfaced to the player.
    pub fn set_hint(&mut self, hint: MergeCandidate) {
        self.hint = Some(hint);
    }

    /// Drops the surfaced hint without rescanning.
    pub fn clear_hint(&mut self) {
        self.hint = None;
    }

    /// Hint that is still valid for display, if any.
    #[must_use]
    pub fn hint(&self) -> Option<&MergeCandidate> {
        self.hint.as_ref()
    }

    /// Consumes board events and elapsed time, emitting due scan cadences.
    ///
    /// Any event that mutates a slot the parked hint references drops the
    /// hint and forces the idle cadence to fire on this very tick. Each
    /// cadence fires at most once per call; the idle cadence reschedules
    /// itself with a fresh randomized delay after firing.
    pub fn handle(&mut self, events: &[Event], dt: Duration, out: &mut Vec<ScanDue>) {
        out.clear();

        if let Some(hint) = &self.hint {
            if events.iter().any(|event| event_touches(event, hint)) {
                self.hint = None;
                self.idle_pending = Some(Duration::ZERO);
            }
        }

        if let Some(remaining) = self.idle_pending {
            if remaining <= dt {
                out.push(ScanDue::Idle);
                self.idle_pending = Some(self.next_idle_delay());
            } else {
                self.idle_pending = Some(remaining.saturating_sub(dt));
            }
        }

        if let Some(remaining) = self.held_pending {
            if remaining <= dt {
                out.push(ScanDue::Held);
                self.held_pending = self.holding.then_some(self.config.held_delay);
            } else {
                self.held_pending = Some(remaining.saturating_sub(dt));
            }
        }
    }

    fn next_idle_delay(&mut self) -> Duration {
        sample_delay(
            &mut self.rng,
            self.config.idle_delay_min,
            self.config.idle_delay_max,
        )
    }
}

fn event_touches(event: &Event, hint: &MergeCandidate) -> bool {
    match event {
        Event::ItemPlaced { order, .. }
        | Event::ItemRemoved { order, .. }
        | Event::ItemRestored { order, .. }
        | Event::CrateOpened { order }
        | Event::LockerUnlocked { order }
        | Event::BubblePopped { order } => hint.references(*order),
        Event::ItemMoved { from, to, .. } => hint.references(*from) || hint.references(*to),
        Event::ItemsSwapped { first, second } => {
            hint.references(*first) || hint.references(*second)
        }
        Event::ItemsMerged { source, target, .. } => {
            hint.references(*source) || hint.references(*target)
        }
        Event::CurrencyCredited { .. }
        | Event::CurrencyRevoked { .. }
        | Event::ExperienceGranted { .. }
        | Event::CollectableSpawnRequested { .. } => false,
    }
}

fn sample_delay(rng: &mut SplitMix64, min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let min_ms = min.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    let range = max_ms.saturating_sub(min_ms).saturating_add(1);
    Duration::from_millis(min_ms + rng.next_u64() % range)
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
