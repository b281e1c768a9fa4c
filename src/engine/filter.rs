//! Filter engine.
//!
//! A query selects specs for up to five role slots. Within a slot, several
//! specs mean "any of these is present". A slot holding exactly one spec
//! instead requires at least `k` copies of it, where `k` counts the slots
//! whose whole selection is that same single spec. Slots are combined with
//! AND; empty slots add no constraint.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{CompositionRecord, Role, RoleCatalog, SpecIndex, SpecVector};

use super::store::CompositionStore;
use super::EngineError;

/// One of the five query slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleSlot {
    Tank,
    Healer,
    Dps1,
    Dps2,
    Dps3,
}

impl RoleSlot {
    pub const ALL: [RoleSlot; 5] = [
        RoleSlot::Tank,
        RoleSlot::Healer,
        RoleSlot::Dps1,
        RoleSlot::Dps2,
        RoleSlot::Dps3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleSlot::Tank => "tank",
            RoleSlot::Healer => "healer",
            RoleSlot::Dps1 => "dps1",
            RoleSlot::Dps2 => "dps2",
            RoleSlot::Dps3 => "dps3",
        }
    }
}

impl std::str::FromStr for RoleSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown slot: {}", s))
    }
}

/// Spec tokens requested per slot. An empty slot is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSlotSelection {
    #[serde(default)]
    pub tank: Vec<String>,
    #[serde(default)]
    pub healer: Vec<String>,
    #[serde(default)]
    pub dps1: Vec<String>,
    #[serde(default)]
    pub dps2: Vec<String>,
    #[serde(default)]
    pub dps3: Vec<String>,
}

impl RoleSlotSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style slot assignment.
    pub fn with<I, S>(mut self, slot: RoleSlot, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(slot, tokens.into_iter().map(Into::into).collect());
        self
    }

    pub fn get(&self, slot: RoleSlot) -> &[String] {
        match slot {
            RoleSlot::Tank => &self.tank,
            RoleSlot::Healer => &self.healer,
            RoleSlot::Dps1 => &self.dps1,
            RoleSlot::Dps2 => &self.dps2,
            RoleSlot::Dps3 => &self.dps3,
        }
    }

    pub fn set(&mut self, slot: RoleSlot, tokens: Vec<String>) {
        let target = match slot {
            RoleSlot::Tank => &mut self.tank,
            RoleSlot::Healer => &mut self.healer,
            RoleSlot::Dps1 => &mut self.dps1,
            RoleSlot::Dps2 => &mut self.dps2,
            RoleSlot::Dps3 => &mut self.dps3,
        };
        *target = tokens;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when no slot carries a selection.
    pub fn is_unconstrained(&self) -> bool {
        RoleSlot::ALL.iter().all(|slot| self.get(*slot).is_empty())
    }
}

/// The constraint a single non-empty slot puts on a composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotPredicate {
    /// At least one of the specs is present.
    AnyOf(Vec<SpecIndex>),
    /// The spec appears at least `count` times.
    AtLeast { spec: SpecIndex, count: u32 },
}

impl SlotPredicate {
    pub fn matches(&self, vector: &SpecVector) -> bool {
        match self {
            SlotPredicate::AnyOf(specs) => specs.iter().any(|&s| vector.count(s) > 0),
            SlotPredicate::AtLeast { spec, count } => vector.count(*spec) >= *count,
        }
    }
}

/// Resolve a selection into one predicate per non-empty slot.
///
/// Every token is resolved before any predicate is built, so an unknown
/// token fails the whole query.
pub fn compile(
    slots: &RoleSlotSelection,
    catalog: &RoleCatalog,
) -> Result<Vec<SlotPredicate>, EngineError> {
    let mut resolved: Vec<Vec<SpecIndex>> = Vec::with_capacity(RoleSlot::ALL.len());
    for slot in RoleSlot::ALL {
        let indices = slots
            .get(slot)
            .iter()
            .map(|token| {
                catalog
                    .index_of(token.trim())
                    .map_err(|_| EngineError::UnknownToken(token.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        resolved.push(indices);
    }

    let predicates = resolved
        .iter()
        .filter(|indices| !indices.is_empty())
        .map(|indices| match indices.as_slice() {
            [spec] => {
                let count = resolved
                    .iter()
                    .filter(|other| matches!(other.as_slice(), [only] if only == spec))
                    .count() as u32;
                SlotPredicate::AtLeast { spec: *spec, count }
            }
            _ => {
                let mut specs: Vec<SpecIndex> = Vec::with_capacity(indices.len());
                for index in indices {
                    if !specs.contains(index) {
                        specs.push(*index);
                    }
                }
                SlotPredicate::AnyOf(specs)
            }
        })
        .collect();

    Ok(predicates)
}

/// Records matching every slot predicate, in input order.
pub fn filter_records<'r>(
    records: &'r [CompositionRecord],
    slots: &RoleSlotSelection,
    catalog: &RoleCatalog,
) -> Result<Vec<&'r CompositionRecord>, EngineError> {
    let predicates = compile(slots, catalog)?;

    let mut mask: Option<Vec<bool>> = None;
    for predicate in &predicates {
        let slot_mask = records.iter().map(|r| predicate.matches(&r.spec_vector));
        mask = Some(match mask {
            None => slot_mask.collect(),
            Some(current) => current.into_iter().zip(slot_mask).map(|(a, b)| a && b).collect(),
        });
    }

    let matched: Vec<&CompositionRecord> = match mask {
        None => records.iter().collect(),
        Some(mask) => records
            .iter()
            .zip(mask)
            .filter(|(_, keep)| *keep)
            .map(|(record, _)| record)
            .collect(),
    };

    debug!(
        "Filter matched {} of {} compositions ({} constrained slots)",
        matched.len(),
        records.len(),
        predicates.len()
    );
    Ok(matched)
}

/// Records of a store matching the selection. An unconstrained selection returns the whole store.
pub fn filter<'s>(
    store: &'s CompositionStore,
    slots: &RoleSlotSelection,
    catalog: &RoleCatalog,
) -> Result<Vec<&'s CompositionRecord>, EngineError> {
    filter_records(store.records(), slots, catalog)
}

/// Parse user input for a slot: tokens separated by commas or whitespace.
///
/// `@tank`, `@healer`, `@mdps`, `@rdps` and `@dps` expand to every spec of that role.
pub fn parse_slot_tokens(input: &str, catalog: &RoleCatalog) -> Result<Vec<String>, EngineError> {
    let mut tokens: Vec<String> = Vec::new();
    for part in input.split(|c: char| c == ',' || c.is_whitespace()) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let expanded: Vec<&str> = match part.strip_prefix('@') {
            Some("dps") => catalog.dps_tokens(),
            Some(role) => catalog.tokens_for_role(role.parse::<Role>()?),
            None => {
                catalog
                    .index_of(part)
                    .map_err(|_| EngineError::UnknownToken(part.to_string()))?;
                vec![part]
            }
        };
        for token in expanded {
            if !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
    }
    Ok(tokens)
}
