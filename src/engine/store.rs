//! Composition store.
//!
//! Holds every valid composition for one query window. Built once from the
//! aggregate export and read-only afterwards; a refresh builds a new store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::models::{CompositionRecord, CompositionRow, QueryWindow, RoleCatalog};

use super::codec::{self, RosterDefect};
use super::EngineError;

/// Outcome of building a store from export rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub accepted: usize,
    pub wrong_length: usize,
    pub bad_tank_count: usize,
    pub bad_healer_count: usize,
}

impl LoadReport {
    /// Rows left out of the store.
    pub fn excluded(&self) -> usize {
        self.wrong_length + self.bad_tank_count + self.bad_healer_count
    }

    fn record_defect(&mut self, defect: RosterDefect) {
        match defect {
            RosterDefect::WrongLength(_) => self.wrong_length += 1,
            RosterDefect::TankCount(_) => self.bad_tank_count += 1,
            RosterDefect::HealerCount(_) => self.bad_healer_count += 1,
        }
    }
}

/// The compositions of one query window.
#[derive(Debug, Clone)]
pub struct CompositionStore {
    window: QueryWindow,
    records: Vec<CompositionRecord>,
    report: LoadReport,
    loaded_at: DateTime<Utc>,
    fingerprint: Option<String>,
}

impl CompositionStore {
    /// A store with no compositions.
    pub fn empty(window: QueryWindow) -> Self {
        Self {
            window,
            records: Vec::new(),
            report: LoadReport::default(),
            loaded_at: Utc::now(),
            fingerprint: None,
        }
    }

    /// Build a store from export rows.
    ///
    /// Rows with an unknown shorthand abort the load. Rows that are not a
    /// one-tank, one-healer, five-member roster are excluded and counted.
    pub fn from_rows(
        window: QueryWindow,
        rows: Vec<CompositionRow>,
        catalog: &RoleCatalog,
    ) -> Result<Self, EngineError> {
        let mut report = LoadReport {
            rows_read: rows.len(),
            ..Default::default()
        };
        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            let record = codec::vectorize(row, catalog)?;
            match codec::check_roster(&record.spec_vector, catalog) {
                Ok(()) => records.push(record),
                Err(defect) => report.record_defect(defect),
            }
        }
        report.accepted = records.len();

        info!(
            "Loaded {} compositions for {} ({} rows read)",
            report.accepted, window, report.rows_read
        );
        if report.excluded() > 0 {
            warn!(
                "Excluded {} malformed rosters for {}: {} wrong length, {} bad tank count, {} bad healer count",
                report.excluded(),
                window,
                report.wrong_length,
                report.bad_tank_count,
                report.bad_healer_count
            );
        }

        Ok(Self {
            window,
            records,
            report,
            loaded_at: Utc::now(),
            fingerprint: None,
        })
    }

    /// Tag the store with the content fingerprint of its export.
    pub fn with_fingerprint(mut self, fingerprint: String) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn window(&self) -> &QueryWindow {
        &self.window
    }

    pub fn records(&self) -> &[CompositionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Total runs across every stored composition.
    pub fn total_runs(&self) -> u64 {
        self.records.iter().map(|r| r.run_count as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Season;

    fn window() -> QueryWindow {
        Season::new("SL1", "SL Season 1", 780, None).window()
    }

    fn row(composition: &str, run_count: u32) -> CompositionRow {
        CompositionRow {
            composition: composition.to_string(),
            run_count,
            level_mean: 15.0,
            level_std: 2.0,
            level_max: 20,
        }
    }

    #[test]
    fn test_from_rows_accepts_valid_rosters() {
        let rows = vec![row("tigfx", 500), row("aqrrd", 300)];
        let store = CompositionStore::from_rows(window(), rows, RoleCatalog::global()).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.report().accepted, 2);
        assert_eq!(store.report().excluded(), 0);
        assert_eq!(store.total_runs(), 800);
        assert_eq!(store.records()[0].raw_token, "tigfx");
    }

    #[test]
    fn test_from_rows_excludes_malformed_rosters() {
        let rows = vec![
            row("tihgf", 500), // two tanks
            row("tihgf", 300),
            row("siwHg", 50), // no tank
            row("tsiwg", 40), // three healers
            row("tig", 10),   // short
            row("tigfx", 5),
        ];
        let store = CompositionStore::from_rows(window(), rows, RoleCatalog::global()).unwrap();

        let report = store.report();
        assert_eq!(report.rows_read, 6);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.bad_tank_count, 3);
        assert_eq!(report.bad_healer_count, 1);
        assert_eq!(report.wrong_length, 1);
        assert_eq!(report.excluded(), 5);
        assert_eq!(store.records()[0].raw_token, "tigfx");
    }

    #[test]
    fn test_from_rows_unknown_shorthand_fails() {
        let rows = vec![row("tigfx", 5), row("ti?fx", 5)];
        let result = CompositionStore::from_rows(window(), rows, RoleCatalog::global());
        assert!(matches!(
            result,
            Err(EngineError::UnknownShorthand { shorthand: '?', .. })
        ));
    }

    #[test]
    fn test_vector_sum_invariant() {
        let rows = vec![row("tigfx", 1), row("pqmno", 1), row("eDdCB", 1)];
        let store = CompositionStore::from_rows(window(), rows, RoleCatalog::global()).unwrap();
        for record in store.records() {
            assert_eq!(record.spec_vector.total() as usize, record.member_count());
        }
    }

    #[test]
    fn test_empty_store() {
        let store = CompositionStore::empty(window()).with_fingerprint("abc".to_string());
        assert!(store.is_empty());
        assert_eq!(store.fingerprint(), Some("abc"));
        assert_eq!(store.window().season_id, "SL1");
    }
}
