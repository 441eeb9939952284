//! Initial narrowing of the dataset before a search: tournament, championship
//! and over/under tip.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::config::{SearchParams, SearchSettings};
use crate::dataset::Dataset;
use crate::error::SearchResult;
use crate::logging;
use crate::search::{search, SearchOutcome};

pub const TIP_OVER: &str = "Over";
pub const TIP_UNDER: &str = "Under";

/// Distinct tournaments, sorted.
pub fn tournaments(dataset: &Dataset) -> Vec<String> {
    let set: BTreeSet<&str> = dataset.rows().map(|r| r.tournament.as_str()).collect();
    set.into_iter().map(str::to_string).collect()
}

/// Distinct championships within `tournament` (`None` for all), sorted.
pub fn championships(dataset: &Dataset, tournament: Option<&str>) -> Vec<String> {
    let set: BTreeSet<&str> = dataset
        .rows()
        .filter(|r| tournament.map_or(true, |t| r.tournament == t))
        .filter_map(|r| r.championship.as_deref())
        .collect();
    set.into_iter().map(str::to_string).collect()
}

/// The over/under tips present under the given narrowing.
pub fn tip_options(dataset: &Dataset, tournament: Option<&str>, championship: Option<&str>) -> Vec<String> {
    let narrowed = Scope {
        tournament: tournament.map(str::to_string),
        championship: championship.map(str::to_string),
        tip: None,
    }
    .apply(dataset);
    [TIP_OVER, TIP_UNDER]
        .into_iter()
        .filter(|tip| narrowed.rows().any(|r| r.tip == *tip))
        .map(str::to_string)
        .collect()
}

/// `None` in any field means no restriction on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub tournament: Option<String>,
    pub championship: Option<String>,
    pub tip: Option<String>,
}

impl Scope {
    pub fn apply(&self, dataset: &Dataset) -> Dataset {
        dataset.retain(|r| {
            self.tournament.as_deref().map_or(true, |t| r.tournament == t)
                && self
                    .championship
                    .as_deref()
                    .map_or(true, |c| r.championship.as_deref() == Some(c))
                && self.tip.as_deref().map_or(true, |t| r.tip == t)
        })
    }

    pub fn is_unrestricted(&self) -> bool {
        self.tournament.is_none() && self.championship.is_none() && self.tip.is_none()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tournament={} championship={} tip={}",
            self.tournament.as_deref().unwrap_or("all"),
            self.championship.as_deref().unwrap_or("all"),
            self.tip.as_deref().unwrap_or("all"),
        )
    }
}

/// Narrow to `scope`, then search. An empty scope is an `EmptyDataset` error.
pub fn run_analysis(
    dataset: &Dataset,
    scope: &Scope,
    target_roi_pct: Option<f64>,
    settings: &SearchSettings,
    params: SearchParams,
) -> SearchResult<SearchOutcome> {
    let scoped = scope.apply(dataset);
    logging::log_scope_applied(&scope.to_string(), dataset.len(), scoped.len());
    let mut outcome = search(&scoped, settings, params, target_roi_pct)?;
    outcome.scope = scope.clone();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::{full_schema, row};
    use crate::error::SearchError;

    fn dataset() -> Dataset {
        let mut rows = vec![
            row("Cup", "a", "b", "Over", 1.0),
            row("Cup", "a", "b", "a", 1.0),
            row("League", "c", "d", "Under", -1.0),
            row("League", "c", "d", "Over", 2.0),
        ];
        rows[0].championship = Some("North".into());
        rows[1].championship = Some("South".into());
        rows[2].championship = Some("North".into());
        rows[3].championship = Some("East".into());
        Dataset::new(rows, full_schema())
    }

    #[test]
    fn option_lists_are_sorted_and_narrowed() {
        let ds = dataset();
        assert_eq!(tournaments(&ds), vec!["Cup", "League"]);
        assert_eq!(championships(&ds, None), vec!["East", "North", "South"]);
        assert_eq!(championships(&ds, Some("Cup")), vec!["North", "South"]);
        assert_eq!(tip_options(&ds, None, None), vec!["Over", "Under"]);
        assert_eq!(tip_options(&ds, Some("Cup"), None), vec!["Over"]);
        assert!(tip_options(&ds, Some("Cup"), Some("South")).is_empty());
    }

    #[test]
    fn scope_applies_every_restriction() {
        let ds = dataset();
        let scope = Scope {
            tournament: Some("League".into()),
            championship: None,
            tip: Some("Over".into()),
        };
        assert_eq!(scope.apply(&ds).row_ids(), &[3]);
        assert!(Scope::default().is_unrestricted());
        assert_eq!(Scope::default().apply(&ds).len(), 4);
        assert_eq!(scope.to_string(), "tournament=League championship=all tip=Over");
    }

    #[test]
    fn empty_scope_fails_the_analysis() {
        let ds = dataset();
        let scope = Scope {
            tournament: Some("Nowhere".into()),
            ..Scope::default()
        };
        let err = run_analysis(&ds, &scope, None, &SearchSettings::default(), SearchParams::default())
            .unwrap_err();
        assert!(matches!(err, SearchError::EmptyDataset));
    }
}
