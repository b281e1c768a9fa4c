//! Ranking and pagination of matched compositions.

use std::cmp::Ordering;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::models::CompositionRecord;

use super::EngineError;

/// Fixed number of compositions per page.
pub const PAGE_SIZE: usize = 50;

/// Sort order for search results. Every key sorts descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Run count, then mean level
    #[default]
    Total,
    /// Mean level, then run count
    Avg,
    /// Max level, then mean level, then run count
    MaxAvgTotal,
    /// Max level, then run count, then mean level
    MaxTotalAvg,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Total,
        SortKey::Avg,
        SortKey::MaxAvgTotal,
        SortKey::MaxTotalAvg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Total => "total",
            SortKey::Avg => "avg",
            SortKey::MaxAvgTotal => "max_avg_total",
            SortKey::MaxTotalAvg => "max_total_avg",
        }
    }

    /// Compare two records; `Less` means `a` ranks first.
    pub fn compare(&self, a: &CompositionRecord, b: &CompositionRecord) -> Ordering {
        let total = || b.run_count.cmp(&a.run_count);
        let avg = || b.level_mean.total_cmp(&a.level_mean);
        let max = || b.level_max.cmp(&a.level_max);

        match self {
            SortKey::Total => total().then_with(avg),
            SortKey::Avg => avg().then_with(total),
            SortKey::MaxAvgTotal => max().then_with(avg).then_with(total),
            SortKey::MaxTotalAvg => max().then_with(total).then_with(avg),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SortKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::UnknownSortKey(s.to_string()))
    }
}

/// Sort matched records. Ties keep their incoming (store) order.
pub fn rank<'a>(mut records: Vec<&'a CompositionRecord>, key: SortKey) -> Vec<&'a CompositionRecord> {
    records.sort_by(|a, b| key.compare(a, b));
    records
}

/// Pagination metadata for one result page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageWindow {
    /// Clamp a requested page into the valid range for `total_items`.
    ///
    /// Pages below 1 become page 1; pages past the end become the last page.
    pub fn new(requested: i64, total_items: usize) -> Self {
        let total_pages = total_items.div_ceil(PAGE_SIZE);
        let last = total_pages.max(1) as i64;
        let page = requested.clamp(1, last) as usize;
        Self {
            page,
            page_size: PAGE_SIZE,
            total_items,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    /// Index range of this page within the ordered results.
    pub fn range(&self) -> Range<usize> {
        let start = ((self.page - 1) * self.page_size).min(self.total_items);
        let end = (start + self.page_size).min(self.total_items);
        start..end
    }
}

/// Slice one page out of an ordered result.
pub fn paginate<'o, 'a>(
    ordered: &'o [&'a CompositionRecord],
    page: i64,
) -> (&'o [&'a CompositionRecord], PageWindow) {
    let window = PageWindow::new(page, ordered.len());
    (&ordered[window.range()], window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpecVector;
    use pretty_assertions::assert_eq;

    fn record(token: &str, run_count: u32, level_mean: f64, level_max: u32) -> CompositionRecord {
        CompositionRecord {
            raw_token: token.to_string(),
            run_count,
            level_mean,
            level_std: 0.0,
            level_max,
            spec_vector: SpecVector::new(),
        }
    }

    fn tokens(records: &[&CompositionRecord]) -> Vec<String> {
        records.iter().map(|r| r.raw_token.clone()).collect()
    }

    fn sample() -> Vec<CompositionRecord> {
        vec![
            record("a", 100, 15.0, 20),
            record("b", 300, 12.0, 18),
            record("c", 100, 17.0, 20),
            record("d", 50, 17.0, 24),
            record("e", 300, 12.0, 24),
        ]
    }

    #[test]
    fn test_sort_total() {
        let records = sample();
        let ranked = rank(records.iter().collect(), SortKey::Total);
        // b and e tie on both keys: store order decides
        assert_eq!(tokens(&ranked), vec!["b", "e", "c", "a", "d"]);
    }

    #[test]
    fn test_sort_avg() {
        let records = sample();
        let ranked = rank(records.iter().collect(), SortKey::Avg);
        assert_eq!(tokens(&ranked), vec!["c", "d", "a", "b", "e"]);
    }

    #[test]
    fn test_sort_max_avg_total() {
        let records = sample();
        let ranked = rank(records.iter().collect(), SortKey::MaxAvgTotal);
        assert_eq!(tokens(&ranked), vec!["d", "e", "c", "a", "b"]);
    }

    #[test]
    fn test_sort_max_total_avg() {
        let records = sample();
        let ranked = rank(records.iter().collect(), SortKey::MaxTotalAvg);
        assert_eq!(tokens(&ranked), vec!["e", "d", "c", "a", "b"]);
    }

    #[test]
    fn test_rank_is_deterministic() {
        let records = sample();
        for key in SortKey::ALL {
            let first = rank(records.iter().collect(), key);
            let second = rank(records.iter().collect(), key);
            assert!(first.iter().zip(second.iter()).all(|(a, b)| std::ptr::eq(*a, *b)));
        }
    }

    #[test]
    fn test_sort_key_from_str() {
        assert_eq!("max_avg_total".parse::<SortKey>().unwrap(), SortKey::MaxAvgTotal);
        assert_eq!("AVG".parse::<SortKey>().unwrap(), SortKey::Avg);
        assert!(matches!(
            "popularity".parse::<SortKey>(),
            Err(EngineError::UnknownSortKey(_))
        ));
    }

    #[test]
    fn test_sort_key_serialization() {
        let json = serde_json::to_string(&SortKey::MaxTotalAvg).unwrap();
        assert_eq!(json, "\"max_total_avg\"");
    }

    #[test]
    fn test_page_window_counts() {
        assert_eq!(PageWindow::new(1, 0).total_pages, 0);
        assert_eq!(PageWindow::new(1, 1).total_pages, 1);
        assert_eq!(PageWindow::new(1, 50).total_pages, 1);
        assert_eq!(PageWindow::new(1, 51).total_pages, 2);
        assert_eq!(PageWindow::new(1, 120).total_pages, 3);
    }

    #[test]
    fn test_page_window_flags() {
        let first = PageWindow::new(1, 120);
        assert!(!first.has_prev);
        assert!(first.has_next);

        let last = PageWindow::new(3, 120);
        assert!(last.has_prev);
        assert!(!last.has_next);
        assert_eq!(last.range(), 100..120);
    }

    #[test]
    fn test_page_clamping() {
        assert_eq!(PageWindow::new(0, 120), PageWindow::new(1, 120));
        assert_eq!(PageWindow::new(-7, 120), PageWindow::new(1, 120));
        assert_eq!(PageWindow::new(53, 120), PageWindow::new(3, 120));
    }

    #[test]
    fn test_empty_result_page() {
        let ordered: Vec<&CompositionRecord> = Vec::new();
        let (page, window) = paginate(&ordered, 4);
        assert!(page.is_empty());
        assert_eq!(window.page, 1);
        assert_eq!(window.total_pages, 0);
        assert!(!window.has_next);
    }

    #[test]
    fn test_pages_cover_everything_once() {
        let records: Vec<CompositionRecord> = (0..123)
            .map(|i| record(&format!("r{i}"), i, 10.0, 15))
            .collect();
        let ordered = rank(records.iter().collect(), SortKey::Total);

        let (_, window) = paginate(&ordered, 1);
        let mut collected: Vec<&CompositionRecord> = Vec::new();
        for page in 1..=window.total_pages {
            let (slice, _) = paginate(&ordered, page as i64);
            collected.extend_from_slice(slice);
        }

        assert_eq!(collected.len(), ordered.len());
        assert!(collected.iter().zip(ordered.iter()).all(|(a, b)| std::ptr::eq(*a, *b)));
    }

    #[test]
    fn test_paging_past_end_returns_last_page() {
        let records: Vec<CompositionRecord> =
            (0..75).map(|i| record(&format!("r{i}"), i, 10.0, 15)).collect();
        let ordered = rank(records.iter().collect(), SortKey::Total);

        let (last, window) = paginate(&ordered, 2);
        let (beyond, beyond_window) = paginate(&ordered, window.total_pages as i64 + 50);
        assert_eq!(window, beyond_window);
        assert_eq!(last.len(), 25);
        assert_eq!(tokens(last), tokens(beyond));
    }
}
