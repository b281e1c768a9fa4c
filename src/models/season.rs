//! Seasons and the query windows a composition store is loaded for.

use serde::{Deserialize, Serialize};

/// A ranked season, bounded by weekly period ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    /// Short id used on disk and on the command line, e.g. "SL1"
    pub id: String,

    /// Display label
    pub label: String,

    /// First period id (inclusive)
    pub period_start: u32,

    /// Last period id (inclusive); open ended when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_end: Option<u32>,
}

impl Season {
    pub fn new(id: &str, label: &str, period_start: u32, period_end: Option<u32>) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            period_start,
            period_end,
        }
    }

    /// Whether a period id falls inside this season.
    pub fn contains_period(&self, period: u32) -> bool {
        period >= self.period_start && self.period_end.map_or(true, |end| period <= end)
    }

    /// The query window covering the whole season.
    pub fn window(&self) -> QueryWindow {
        QueryWindow {
            season_id: self.id.clone(),
            period_start: self.period_start,
            period_end: self.period_end,
        }
    }
}

/// Key of a composition store: which season and period range it covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryWindow {
    pub season_id: String,
    pub period_start: u32,
    pub period_end: Option<u32>,
}

impl std::fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.period_end {
            Some(end) => write!(f, "{} ({}..={})", self.season_id, self.period_start, end),
            None => write!(f, "{} ({}..)", self.season_id, self.period_start),
        }
    }
}

/// Seasons known at release of this build.
pub fn default_seasons() -> Vec<Season> {
    vec![
        Season::new("bfa4", "BFA Season 4 (8.3)", 734, Some(771)),
        Season::new("bfa4_postpatch", "BFA post-patch (9.0.1)", 772, Some(779)),
        Season::new("SL1", "SL Season 1 (9.0.2)", 780, None),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_period() {
        let bfa4 = Season::new("bfa4", "BFA Season 4", 734, Some(771));
        assert!(bfa4.contains_period(734));
        assert!(bfa4.contains_period(771));
        assert!(!bfa4.contains_period(772));
        assert!(!bfa4.contains_period(700));

        let open = Season::new("SL1", "SL Season 1", 780, None);
        assert!(open.contains_period(9000));
    }

    #[test]
    fn test_window_display() {
        let seasons = default_seasons();
        assert_eq!(seasons[0].window().to_string(), "bfa4 (734..=771)");
        assert_eq!(seasons[2].window().to_string(), "SL1 (780..)");
    }

    #[test]
    fn test_default_seasons_do_not_overlap() {
        let seasons = default_seasons();
        for pair in seasons.windows(2) {
            let end = pair[0].period_end.unwrap();
            assert!(end < pair[1].period_start);
        }
    }
}
