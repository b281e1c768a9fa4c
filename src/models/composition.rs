//! Composition aggregate rows and their vectorized records.

use serde::{Deserialize, Serialize};

use super::{SpecIndex, SPEC_COUNT};

/// One row of the composition aggregate export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionRow {
    /// Raw composition token, one shorthand per roster member
    pub composition: String,

    /// Number of runs with this composition
    pub run_count: u32,

    /// Mean key level
    pub level_mean: f64,

    /// Key level standard deviation
    #[serde(default)]
    pub level_std: f64,

    /// Highest key level
    pub level_max: u32,
}

/// Per-spec occurrence counts, indexed by catalog position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecVector([u32; SPEC_COUNT]);

impl Default for SpecVector {
    fn default() -> Self {
        Self([0; SPEC_COUNT])
    }
}

impl SpecVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of a spec.
    pub fn count(&self, index: SpecIndex) -> u32 {
        self.0.get(index).copied().unwrap_or(0)
    }

    /// Add one occurrence of a spec.
    pub fn increment(&mut self, index: SpecIndex) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot += 1;
        }
    }

    /// Total number of occurrences.
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// `(index, count)` pairs with a non-zero count, in catalog order.
    pub fn present(&self) -> impl Iterator<Item = (SpecIndex, u32)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(i, &c)| (i, c))
    }
}

/// A composition with its statistics and vectorized form.
///
/// Records are owned by a store and never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionRecord {
    pub raw_token: String,
    pub run_count: u32,
    pub level_mean: f64,
    pub level_std: f64,
    pub level_max: u32,
    #[serde(skip)]
    pub spec_vector: SpecVector,
}

impl CompositionRecord {
    /// Attach a vector to an export row.
    pub fn new(row: CompositionRow, spec_vector: SpecVector) -> Self {
        Self {
            raw_token: row.composition,
            run_count: row.run_count,
            level_mean: row.level_mean,
            level_std: row.level_std,
            level_max: row.level_max,
            spec_vector,
        }
    }

    /// Length of the raw token in characters.
    pub fn member_count(&self) -> usize {
        self.raw_token.chars().count()
    }
}
