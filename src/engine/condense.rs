//! Presentation condenser.
//!
//! Collapses a page of compositions into a compact table: a few stat
//! columns, one tank and one healer column, then one column per remaining
//! spec that appears on the page, most played first.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{CompositionRecord, Rgb, RoleCatalog, SpecIndex, SPEC_COUNT};

use super::codec::{self, Roster};
use super::EngineError;

/// Which third stat column to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatColumn {
    #[default]
    Max,
    Std,
}

impl StatColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatColumn::Max => "max",
            StatColumn::Std => "std",
        }
    }
}

impl std::str::FromStr for StatColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "max" => Ok(StatColumn::Max),
            "std" => Ok(StatColumn::Std),
            other => Err(format!("unknown stat column: {}", other)),
        }
    }
}

/// Kind of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Stat,
    Tank,
    Healer,
    Spec,
}

/// Header entry of a display table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub label: String,
    pub kind: ColumnKind,
    /// Spec token for spec columns
    pub token: Option<&'static str>,
    pub color: Option<Rgb>,
    /// Character width reserved for the header label
    pub width: usize,
}

/// One table cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub text: String,
    pub color: Option<Rgb>,
}

impl Cell {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }

    pub fn blank() -> Self {
        Self::plain("")
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Render-ready table, free of any UI framework type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayTable {
    pub columns: Vec<Column>,
    pub abbreviation_width: usize,
    pub rows: Vec<Vec<Cell>>,
}

impl DisplayTable {
    /// Labels of the spec columns after tank and healer.
    pub fn spec_labels(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Spec)
            .map(|c| c.label.as_str())
            .collect()
    }

    /// Index of the first column of a kind.
    pub fn column_index(&self, kind: ColumnKind) -> Option<usize> {
        self.columns.iter().position(|c| c.kind == kind)
    }
}

/// Abbreviation width for a number of spec columns.
pub fn abbreviation_width(spec_columns: usize) -> usize {
    if spec_columns > 20 {
        2
    } else if spec_columns > 17 {
        3
    } else if spec_columns > 10 {
        4
    } else {
        10
    }
}

/// Labels for the specs shown on a page, indexed by spec.
///
/// Specs whose abbreviations clash get their class tag prepended ("DKfr",
/// "Mafr"). Labels still clashing within one class are widened until distinct.
fn page_labels(specs: &[SpecIndex], catalog: &RoleCatalog, width: usize) -> Vec<String> {
    let mut labels = vec![String::new(); SPEC_COUNT];
    for &index in specs {
        if let Some(spec) = catalog.get(index) {
            labels[index] = spec.abbreviation(width);
        }
    }

    let clashing = |labels: &[String]| -> Vec<SpecIndex> {
        specs
            .iter()
            .copied()
            .filter(|&a| specs.iter().any(|&b| a != b && labels[a] == labels[b]))
            .collect()
    };

    let mut current = width;
    let mut pending = clashing(&labels);
    let longest = catalog.specs().iter().map(|s| s.spec_name.len()).max().unwrap_or(width);
    while !pending.is_empty() && current <= longest {
        for &index in &pending {
            if let Some(spec) = catalog.get(index) {
                labels[index] = format!("{}{}", spec.class_tag(), spec.abbreviation(current));
            }
        }
        current += 1;
        pending = clashing(&labels);
    }

    labels
}

/// Condense a page of records into a display table.
///
/// Every record must be a valid roster; a malformed one is an error.
pub fn condense(
    page: &[&CompositionRecord],
    catalog: &RoleCatalog,
    stat: StatColumn,
) -> Result<DisplayTable, EngineError> {
    let rosters: Vec<Roster> = page
        .iter()
        .map(|r| codec::decode_roster(&r.spec_vector, catalog, &r.raw_token))
        .collect::<Result<_, _>>()?;

    // Occurrences outside the tank and healer columns, per spec, across the page
    let mut totals = [0u32; SPEC_COUNT];
    for roster in &rosters {
        for &index in &roster.others {
            totals[index] += 1;
        }
    }

    let mut spec_columns: Vec<SpecIndex> = (0..SPEC_COUNT).filter(|&i| totals[i] > 0).collect();
    spec_columns.sort_by(|a, b| totals[*b].cmp(&totals[*a]).then(a.cmp(b)));

    let width = abbreviation_width(spec_columns.len() + 2);

    let mut shown: Vec<SpecIndex> = spec_columns.clone();
    for roster in &rosters {
        for index in [roster.tank, roster.healer] {
            if !shown.contains(&index) {
                shown.push(index);
            }
        }
    }
    let labels = page_labels(&shown, catalog, width);
    let abbreviate = |index: SpecIndex| -> (String, Option<Rgb>) {
        match catalog.get(index) {
            Some(spec) => (labels[index].clone(), Some(spec.color)),
            None => (String::new(), None),
        }
    };

    let mut columns: Vec<Column> = ["runs", "mean", stat.as_str()]
        .into_iter()
        .map(|label| Column {
            label: label.to_string(),
            kind: ColumnKind::Stat,
            token: None,
            color: None,
            width: label.len(),
        })
        .collect();
    for (label, kind) in [("tank", ColumnKind::Tank), ("healer", ColumnKind::Healer)] {
        columns.push(Column {
            label: label.to_string(),
            kind,
            token: None,
            color: None,
            width,
        });
    }
    for &index in &spec_columns {
        let (label, color) = abbreviate(index);
        columns.push(Column {
            label,
            kind: ColumnKind::Spec,
            token: catalog.get(index).map(|s| s.token),
            color,
            width,
        });
    }

    let rows = page
        .iter()
        .zip(rosters.iter())
        .map(|(record, roster)| {
            let third = match stat {
                StatColumn::Max => record.level_max.to_string(),
                StatColumn::Std => format!("{:.1}", record.level_std),
            };
            let mut cells = vec![
                Cell::plain(record.run_count.to_string()),
                Cell::plain(format!("{:.1}", record.level_mean)),
                Cell::plain(third),
            ];

            for index in [roster.tank, roster.healer] {
                let (text, color) = abbreviate(index);
                cells.push(Cell { text, color });
            }

            for &index in &spec_columns {
                let count = roster.others.iter().filter(|&&i| i == index).count();
                let cell = match count {
                    0 => Cell::blank(),
                    1 => {
                        let (text, color) = abbreviate(index);
                        Cell { text, color }
                    }
                    n => Cell {
                        text: format!("×{}", n),
                        color: catalog.get(index).map(|s| s.color),
                    },
                };
                cells.push(cell);
            }
            cells
        })
        .collect();

    debug!(
        "Condensed {} compositions into {} spec columns (abbreviation width {})",
        page.len(),
        spec_columns.len(),
        width
    );

    Ok(DisplayTable {
        columns,
        abbreviation_width: width,
        rows,
    })
}
