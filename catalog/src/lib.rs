#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Static item catalog for the Merge Grove engine.
//!
//! The catalog is immutable reference data: ordered per-group descriptor
//! lists loaded once at startup from external configuration. Level and
//! max-level flags derive solely from list position, never from sprite name
//! parsing. Player progress (which sprites have been discovered) lives in a
//! parallel [`UnlockSet`], not on the descriptors themselves.

use std::collections::{BTreeMap, BTreeSet};

use merge_grove_core::{CatalogError, GroupId, ItemKind, ItemLevel, SpriteId};
use serde::{Deserialize, Serialize};

/// Weighted production rule consumed when a generator produces an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRule {
    group: GroupId,
    chance: u32,
}

impl SpawnRule {
    /// Creates a new production rule.
    #[must_use]
    pub const fn new(group: GroupId, chance: u32) -> Self {
        Self { group, chance }
    }

    /// Group the rule produces from.
    #[must_use]
    pub const fn group(&self) -> &GroupId {
        &self.group
    }

    /// Relative weight of the rule.
    #[must_use]
    pub const fn chance(&self) -> u32 {
        self.chance
    }
}

/// One catalog entry supplied by the external configuration loader.
///
/// Seeds carry no level: levels are assigned from list position while the
/// catalog is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorSeed {
    sprite: SpriteId,
    display_name: String,
    has_level: bool,
    generates_at: Option<ItemLevel>,
    creates: Vec<SpawnRule>,
    parents: Vec<SpriteId>,
}

impl DescriptorSeed {
    /// Creates a new seed with default flags: levelled, no production rules.
    #[must_use]
    pub fn new(sprite: SpriteId, display_name: impl Into<String>) -> Self {
        Self {
            sprite,
            display_name: display_name.into(),
            has_level: true,
            generates_at: None,
            creates: Vec::new(),
            parents: Vec::new(),
        }
    }

    /// Marks the entry as carrying no displayed level.
    #[must_use]
    pub fn without_level(mut self) -> Self {
        self.has_level = false;
        self
    }

    /// Sets the level a generator must reach before producing.
    #[must_use]
    pub fn generates_at(mut self, level: ItemLevel) -> Self {
        self.generates_at = Some(level);
        self
    }

    /// Sets the weighted production rules consumed on generation.
    #[must_use]
    pub fn creates(mut self, rules: Vec<SpawnRule>) -> Self {
        self.creates = rules;
        self
    }

    /// Sets the provenance sprites shown by discovery UI.
    #[must_use]
    pub fn parents(mut self, parents: Vec<SpriteId>) -> Self {
        self.parents = parents;
        self
    }
}

/// Ordered descriptor list for one `(kind, group)` combination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    kind: ItemKind,
    group: GroupId,
    seeds: Vec<DescriptorSeed>,
}

impl GroupSpec {
    /// Creates a new group specification.
    #[must_use]
    pub fn new(kind: ItemKind, group: GroupId, seeds: Vec<DescriptorSeed>) -> Self {
        Self { kind, group, seeds }
    }
}

/// Immutable reference data describing one level of one item group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemDescriptor {
    sprite: SpriteId,
    display_name: String,
    kind: ItemKind,
    group: GroupId,
    level: ItemLevel,
    is_max_level: bool,
    next_sprite: Option<SpriteId>,
    has_level: bool,
    generates_at: Option<ItemLevel>,
    creates: Vec<SpawnRule>,
    parents: Vec<SpriteId>,
}

impl ItemDescriptor {
    /// Sprite identifying the entry.
    #[must_use]
    pub const fn sprite(&self) -> &SpriteId {
        &self.sprite
    }

    /// Human-readable name shown by discovery UI.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Broad category of the entry.
    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Group the entry belongs to.
    #[must_use]
    pub const fn group(&self) -> &GroupId {
        &self.group
    }

    /// Level assigned from list position, starting at one.
    #[must_use]
    pub const fn level(&self) -> ItemLevel {
        self.level
    }

    /// Reports whether the entry is the last of its group.
    #[must_use]
    pub const fn is_max_level(&self) -> bool {
        self.is_max_level
    }

    /// Sprite of the following entry, absent on the last one.
    #[must_use]
    pub const fn next_sprite(&self) -> Option<&SpriteId> {
        self.next_sprite.as_ref()
    }

    /// Reports whether discovery UI displays a level for the entry.
    #[must_use]
    pub const fn has_level(&self) -> bool {
        self.has_level
    }

    /// Level a generator must reach before producing, if any.
    #[must_use]
    pub const fn generates_at(&self) -> Option<ItemLevel> {
        self.generates_at
    }

    /// Weighted production rules consumed on generation.
    #[must_use]
    pub fn creates(&self) -> &[SpawnRule] {
        &self.creates
    }

    /// Provenance sprites, display only; never consulted by the engine.
    #[must_use]
    pub fn parents(&self) -> &[SpriteId] {
        &self.parents
    }
}

/// Deterministic lookup over every descriptor group.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    groups: BTreeMap<(ItemKind, GroupId), Vec<ItemDescriptor>>,
    by_sprite: BTreeMap<SpriteId, (ItemKind, GroupId, usize)>,
}

impl Catalog {
    /// Builds a catalog from ordered per-group seed lists.
    ///
    /// Level numbering and max-level flags derive from list position; each
    /// entry's `next_sprite` points at the entry that follows it. Sprites
    /// must be unique across the whole catalog.
    pub fn from_groups(specs: Vec<GroupSpec>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();

        for spec in specs {
            let last_index = spec.seeds.len().saturating_sub(1);
            let mut descriptors = Vec::with_capacity(spec.seeds.len());
            let mut next_sprites: Vec<Option<SpriteId>> = spec
                .seeds
                .iter()
                .skip(1)
                .map(|seed| Some(seed.sprite.clone()))
                .collect();
            next_sprites.push(None);

            for (index, seed) in spec.seeds.into_iter().enumerate() {
                if catalog.by_sprite.contains_key(&seed.sprite) {
                    return Err(CatalogError::DuplicateSprite {
                        sprite: seed.sprite,
                    });
                }

                let level = u32::try_from(index + 1).unwrap_or(u32::MAX);
                let descriptor = ItemDescriptor {
                    sprite: seed.sprite.clone(),
                    display_name: seed.display_name,
                    kind: spec.kind,
                    group: spec.group.clone(),
                    level: ItemLevel::new(level),
                    is_max_level: index == last_index,
                    next_sprite: next_sprites[index].take(),
                    has_level: seed.has_level,
                    generates_at: seed.generates_at,
                    creates: seed.creates,
                    parents: seed.parents,
                };

                let _ = catalog
                    .by_sprite
                    .insert(seed.sprite, (spec.kind, spec.group.clone(), index));
                descriptors.push(descriptor);
            }

            if !descriptors.is_empty() {
                let _ = catalog
                    .groups
                    .insert((spec.kind, spec.group.clone()), descriptors);
            }
        }

        Ok(catalog)
    }

    /// Resolves the descriptor for the provided combination.
    ///
    /// Misses indicate a configuration bug and are never defaulted.
    pub fn resolve(
        &self,
        kind: ItemKind,
        group: &GroupId,
        sprite: &SpriteId,
    ) -> Result<&ItemDescriptor, CatalogError> {
        let descriptor = self.descriptor_of(sprite)?;
        if descriptor.kind != kind || &descriptor.group != group {
            return Err(CatalogError::NotFound {
                sprite: sprite.clone(),
            });
        }
        Ok(descriptor)
    }

    /// Resolves the descriptor carrying the provided sprite.
    pub fn descriptor_of(&self, sprite: &SpriteId) -> Result<&ItemDescriptor, CatalogError> {
        self.by_sprite
            .get(sprite)
            .and_then(|(kind, group, index)| {
                self.groups
                    .get(&(*kind, group.clone()))
                    .and_then(|descriptors| descriptors.get(*index))
            })
            .ok_or_else(|| CatalogError::NotFound {
                sprite: sprite.clone(),
            })
    }

    /// Returns the next-level descriptor, or `None` at the maximum level.
    #[must_use]
    pub fn next_descriptor(&self, descriptor: &ItemDescriptor) -> Option<&ItemDescriptor> {
        if descriptor.is_max_level {
            return None;
        }
        let (kind, group, index) = self.by_sprite.get(&descriptor.sprite)?;
        self.groups
            .get(&(*kind, group.clone()))
            .and_then(|descriptors| descriptors.get(index + 1))
    }

    /// Iterator over every descriptor group in deterministic key order.
    pub fn groups(&self) -> impl Iterator<Item = (&(ItemKind, GroupId), &[ItemDescriptor])> {
        self.groups
            .iter()
            .map(|(key, descriptors)| (key, descriptors.as_slice()))
    }

    /// Total number of descriptors across every group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_sprite.len()
    }

    /// Reports whether the catalog holds no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_sprite.is_empty()
    }
}

/// Per-player sprite discovery, tracked apart from the immutable catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockSet {
    sprites: BTreeSet<SpriteId>,
}

impl UnlockSet {
    /// Creates an empty unlock set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the sprite as discovered, reporting whether it was new.
    pub fn unlock(&mut self, sprite: SpriteId) -> bool {
        self.sprites.insert(sprite)
    }

    /// Reports whether the sprite has been discovered.
    #[must_use]
    pub fn is_unlocked(&self, sprite: &SpriteId) -> bool {
        self.sprites.contains(sprite)
    }

    /// Iterator over discovered sprites in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &SpriteId> {
        self.sprites.iter()
    }

    /// Number of discovered sprites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    /// Reports whether nothing has been discovered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}
