//! Composition codec.
//!
//! Converts raw composition tokens (one shorthand character per roster
//! member) into per-spec count vectors and back. Encoding accepts tokens of
//! any length; the five-member roster shape is only enforced by
//! [`decode_roster`] and by store loading.

use crate::models::{CompositionRecord, CompositionRow, Role, RoleCatalog, SpecIndex, SpecVector};

use super::EngineError;

/// Members in a complete roster.
pub const ROSTER_SIZE: u32 = 5;

/// Encode a raw composition token into a spec vector.
pub fn encode(raw_token: &str, catalog: &RoleCatalog) -> Result<SpecVector, EngineError> {
    let mut vector = SpecVector::new();
    for shorthand in raw_token.chars() {
        let index =
            catalog
                .shorthand_index(shorthand)
                .map_err(|_| EngineError::UnknownShorthand {
                    shorthand,
                    composition: raw_token.to_string(),
                })?;
        vector.increment(index);
    }
    Ok(vector)
}

/// Vectorize an export row.
pub fn vectorize(row: CompositionRow, catalog: &RoleCatalog) -> Result<CompositionRecord, EngineError> {
    let vector = encode(&row.composition, catalog)?;
    Ok(CompositionRecord::new(row, vector))
}

/// Reconstruct the token multiset of a vector, in catalog order.
pub fn decode(vector: &SpecVector, catalog: &RoleCatalog) -> Vec<&'static str> {
    vector
        .present()
        .filter_map(|(index, count)| catalog.get(index).map(|spec| (spec.token, count)))
        .flat_map(|(token, count)| std::iter::repeat(token).take(count as usize))
        .collect()
}

/// Why a vector is not a valid roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterDefect {
    WrongLength(u32),
    TankCount(u32),
    HealerCount(u32),
}

impl std::fmt::Display for RosterDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterDefect::WrongLength(n) => write!(f, "{} members, expected {}", n, ROSTER_SIZE),
            RosterDefect::TankCount(n) => write!(f, "{} tanks, expected 1", n),
            RosterDefect::HealerCount(n) => write!(f, "{} healers, expected 1", n),
        }
    }
}

/// A valid roster: one tank, one healer and the remaining members in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    pub tank: SpecIndex,
    pub healer: SpecIndex,
    pub others: Vec<SpecIndex>,
}

fn role_count(vector: &SpecVector, catalog: &RoleCatalog, role: Role) -> u32 {
    vector
        .present()
        .filter(|(index, _)| catalog.get(*index).is_some_and(|s| s.role == role))
        .map(|(_, count)| count)
        .sum()
}

/// Check the one-tank, one-healer, five-member shape.
pub fn check_roster(vector: &SpecVector, catalog: &RoleCatalog) -> Result<(), RosterDefect> {
    let total = vector.total();
    if total != ROSTER_SIZE {
        return Err(RosterDefect::WrongLength(total));
    }
    let tanks = role_count(vector, catalog, Role::Tank);
    if tanks != 1 {
        return Err(RosterDefect::TankCount(tanks));
    }
    let healers = role_count(vector, catalog, Role::Healer);
    if healers != 1 {
        return Err(RosterDefect::HealerCount(healers));
    }
    Ok(())
}

/// Decode a vector that must be a valid roster.
pub fn decode_roster(
    vector: &SpecVector,
    catalog: &RoleCatalog,
    composition: &str,
) -> Result<Roster, EngineError> {
    check_roster(vector, catalog).map_err(|defect| EngineError::MalformedRoster {
        composition: composition.to_string(),
        reason: defect.to_string(),
    })?;

    let mut tank = None;
    let mut healer = None;
    let mut others = Vec::with_capacity(3);

    for (index, count) in vector.present() {
        let role = catalog.get(index).map(|s| s.role);
        match role {
            Some(Role::Tank) => tank = Some(index),
            Some(Role::Healer) => healer = Some(index),
            _ => others.extend(std::iter::repeat(index).take(count as usize)),
        }
    }

    match (tank, healer) {
        (Some(tank), Some(healer)) => Ok(Roster {
            tank,
            healer,
            others,
        }),
        _ => Err(EngineError::MalformedRoster {
            composition: composition.to_string(),
            reason: "missing tank or healer".to_string(),
        }),
    }
}
