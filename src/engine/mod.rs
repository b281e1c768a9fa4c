//! Composition search engine.
//!
//! A search runs filter, rank, paginate and condense over a loaded
//! [`CompositionStore`]. Nothing here mutates the store, so any number of
//! searches may share one.

pub mod codec;
pub mod condense;
pub mod filter;
pub mod rank;
pub mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{CatalogError, CompositionRecord, QueryWindow, RoleCatalog};

pub use condense::{condense, Cell, Column, ColumnKind, DisplayTable, StatColumn};
pub use filter::{filter, RoleSlot, RoleSlotSelection};
pub use rank::{paginate, rank, PageWindow, SortKey, PAGE_SIZE};
pub use store::{CompositionStore, LoadReport};

/// Search engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown shorthand '{shorthand}' in composition {composition:?}")]
    UnknownShorthand { shorthand: char, composition: String },

    #[error("Unknown spec token: {0}")]
    UnknownToken(String),

    #[error("Malformed roster {composition:?}: {reason}")]
    MalformedRoster { composition: String, reason: String },

    #[error("Unknown sort key: {0}")]
    UnknownSortKey(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Everything a caller chooses for one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub slots: RoleSlotSelection,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default)]
    pub stat: StatColumn,
}

fn default_page() -> i64 {
    1
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            slots: RoleSlotSelection::default(),
            sort: SortKey::default(),
            page: default_page(),
            stat: StatColumn::default(),
        }
    }
}

/// One ranked page of matches, still as record references.
#[derive(Debug, Clone)]
pub struct QueryResult<'a> {
    pub records: Vec<&'a CompositionRecord>,
    pub total_matches: usize,
    pub window: PageWindow,
}

/// Filter, rank and paginate without condensing.
pub fn query<'a>(
    store: &'a CompositionStore,
    slots: &RoleSlotSelection,
    sort: SortKey,
    page: i64,
    catalog: &RoleCatalog,
) -> Result<QueryResult<'a>, EngineError> {
    let matched = filter::filter(store, slots, catalog)?;
    let total_matches = matched.len();
    let ordered = rank::rank(matched, sort);
    let (slice, window) = rank::paginate(&ordered, page);

    Ok(QueryResult {
        records: slice.to_vec(),
        total_matches,
        window,
    })
}

/// A condensed result page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub window: QueryWindow,
    pub sort: SortKey,
    pub page: PageWindow,
    pub table: DisplayTable,
}

/// Run a full search: filter, rank, paginate, condense.
pub fn search(
    store: &CompositionStore,
    request: &SearchQuery,
    catalog: &RoleCatalog,
) -> Result<SearchResponse, EngineError> {
    let result = query(store, &request.slots, request.sort, request.page, catalog)?;
    let table = condense::condense(&result.records, catalog, request.stat)?;

    debug!(
        "Search over {} returned page {}/{} ({} matches)",
        store.window(),
        result.window.page,
        result.window.total_pages,
        result.total_matches
    );

    Ok(SearchResponse {
        window: store.window().clone(),
        sort: request.sort,
        page: result.window,
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompositionRow, Season};
    use pretty_assertions::assert_eq;

    fn catalog() -> &'static RoleCatalog {
        RoleCatalog::global()
    }

    fn row(composition: &str, run_count: u32, level_mean: f64, level_max: u32) -> CompositionRow {
        CompositionRow {
            composition: composition.to_string(),
            run_count,
            level_mean,
            level_std: 1.0,
            level_max,
        }
    }

    fn store(rows: Vec<CompositionRow>) -> CompositionStore {
        let window = Season::new("SL1", "SL Season 1", 780, None).window();
        CompositionStore::from_rows(window, rows, catalog()).unwrap()
    }

    fn sample_store() -> CompositionStore {
        store(vec![
            row("tigfx", 500, 15.0, 20),
            row("tiggx", 300, 16.0, 21),
            row("asHgx", 50, 17.0, 22),
            row("pqrrr", 40, 14.0, 18),
        ])
    }

    fn selection(slot: RoleSlot, tokens: &[&str]) -> RoleSlotSelection {
        RoleSlotSelection::new().with(slot, tokens.iter().copied())
    }

    fn tank_cells(response: &SearchResponse) -> Vec<String> {
        let tank = response.table.column_index(ColumnKind::Tank).unwrap();
        response.table.rows.iter().map(|r| r[tank].text.clone()).collect()
    }

    #[test]
    fn test_search_by_tank() {
        let store = sample_store();
        let request = SearchQuery {
            slots: selection(RoleSlot::Tank, &["death_knight_blood"]),
            ..Default::default()
        };
        let response = search(&store, &request, catalog()).unwrap();

        assert_eq!(response.page.total_items, 2);
        assert_eq!(response.page.total_pages, 1);
        assert_eq!(response.table.rows.len(), 2);
        assert_eq!(response.table.rows[0][0].text, "500");
        assert_eq!(response.table.rows[1][0].text, "300");
        assert_eq!(tank_cells(&response), vec!["blood", "blood"]);
    }

    #[test]
    fn test_search_unconstrained_returns_whole_store() {
        let store = sample_store();
        let response = search(&store, &SearchQuery::default(), catalog()).unwrap();
        assert_eq!(response.page.total_items, store.len());
        assert_eq!(tank_cells(&response), vec!["blood", "blood", "protection", "brewmaster"]);
    }

    #[test]
    fn test_search_sort_by_max() {
        let store = sample_store();
        let request = SearchQuery {
            sort: SortKey::MaxAvgTotal,
            ..Default::default()
        };
        let response = search(&store, &request, catalog()).unwrap();
        let runs: Vec<&str> = response.table.rows.iter().map(|r| r[0].text.as_str()).collect();
        assert_eq!(runs, vec!["50", "300", "500", "40"]);
    }

    #[test]
    fn test_search_double_feral_has_no_match_without_two_ferals() {
        let store = store(vec![row("tigfx", 500, 15.0, 20), row("asHgx", 50, 17.0, 22)]);
        let request = SearchQuery {
            slots: RoleSlotSelection::new()
                .with(RoleSlot::Dps1, ["druid_feral"])
                .with(RoleSlot::Dps2, ["druid_feral"]),
            page: 3,
            ..Default::default()
        };
        let response = search(&store, &request, catalog()).unwrap();
        assert!(response.table.rows.is_empty());
        assert_eq!(response.page.total_pages, 0);
        assert_eq!(response.page.page, 1);
    }

    #[test]
    fn test_search_unknown_token_fails() {
        let store = sample_store();
        let request = SearchQuery {
            slots: selection(RoleSlot::Healer, &["druid_resto"]),
            ..Default::default()
        };
        assert!(matches!(
            search(&store, &request, catalog()),
            Err(EngineError::UnknownToken(_))
        ));
    }

    #[test]
    fn test_mixed_store_scenario_on_raw_records() {
        // Two-tank and no-tank rosters never reach a store, but the filter,
        // ranking and paging stages accept any vectorized record.
        let records: Vec<CompositionRecord> = [("tihgf", 500), ("tihgf", 300), ("siwHg", 50)]
            .into_iter()
            .map(|(c, n)| codec::vectorize(row(c, n, 15.0, 20), catalog()).unwrap())
            .collect();

        let slots = selection(RoleSlot::Tank, &["death_knight_blood"]);
        let matched = filter::filter_records(&records, &slots, catalog()).unwrap();
        let ordered = rank(matched, SortKey::Total);
        let (page, window) = paginate(&ordered, 1);

        let runs: Vec<u32> = page.iter().map(|r| r.run_count).collect();
        assert_eq!(runs, vec![500, 300]);
        assert_eq!(window.total_pages, 1);

        let double_feral = RoleSlotSelection::new()
            .with(RoleSlot::Dps1, ["druid_feral"])
            .with(RoleSlot::Dps2, ["druid_feral"]);
        let matched = filter::filter_records(&records, &double_feral, catalog()).unwrap();
        let (_, window) = paginate(&matched, 1);
        assert!(matched.is_empty());
        assert_eq!(window.total_pages, 0);

        let loaded = store(vec![
            row("tihgf", 500, 15.0, 20),
            row("tihgf", 300, 15.0, 20),
            row("siwHg", 50, 15.0, 20),
        ]);
        assert!(loaded.is_empty());
        assert_eq!(loaded.report().excluded(), 3);
    }

    #[test]
    fn test_query_reports_total_matches() {
        let records: Vec<CompositionRow> = (0..120)
            .map(|i| row("tigfx", i, 15.0, 20))
            .collect();
        let store = store(records);
        let result = query(&store, &RoleSlotSelection::new(), SortKey::Total, 3, catalog()).unwrap();

        assert_eq!(result.total_matches, 120);
        assert_eq!(result.records.len(), 20);
        assert_eq!(result.window.page, 3);
        assert_eq!(result.records[0].run_count, 19);
    }

    #[test]
    fn test_search_query_deserialize_defaults() {
        let request: SearchQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(request, SearchQuery::default());
        assert_eq!(request.page, 1);
    }

    #[test]
    fn test_search_response_serializes() {
        let store = sample_store();
        let response = search(&store, &SearchQuery::default(), catalog()).unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["window"]["season_id"], "SL1");
        assert_eq!(json["sort"], "total");
        assert_eq!(json["table"]["rows"][0][3]["color"], "rgb(196,31,59)");
    }
}
