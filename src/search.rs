//! Greedy sequential filter search.
//!
//! Each pass asks every enabled provider for improving adjustments against the
//! current stage, commits the single best one, and stops on the iteration cap,
//! after too many empty passes, or when the working set falls below the floor.

use serde::Serialize;
use serde_json::json;

use crate::candidates::{build_providers, generate, select_best, CandidateProvider, SearchContext};
use crate::config::{SearchParams, SearchSettings};
use crate::dataset::Dataset;
use crate::error::{SearchError, SearchResult};
use crate::logging::{self, ProfileScope};
use crate::scope::Scope;
use crate::stage::{Stage, StageHistory, StageSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    IterationCap,
    NoImprovement,
    FloorBreached,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::IterationCap => "iteration_cap",
            Termination::NoImprovement => "no_improvement",
            Termination::FloorBreached => "floor_breached",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub history: StageHistory,
    /// Narrowing applied before the search; unrestricted unless set by the caller.
    pub scope: Scope,
    pub termination: Termination,
    /// Passes executed, including empty ones.
    pub iterations: usize,
    pub floor: f64,
    pub initial_rows: usize,
    /// Target ROI in percent, reported only.
    pub target_roi_pct: Option<f64>,
    pub target_reached: bool,
}

#[derive(Debug, Serialize)]
struct OutcomeReport {
    scope: Scope,
    termination: Termination,
    iterations: usize,
    floor: f64,
    initial_rows: usize,
    target_roi_pct: Option<f64>,
    target_reached: bool,
    best_stage: usize,
    best_roi: f64,
    stages: Vec<StageSummary>,
}

impl SearchOutcome {
    pub fn best(&self) -> &Stage {
        self.history.best()
    }

    pub fn stages(&self) -> &[Stage] {
        self.history.stages()
    }

    pub fn to_json(&self) -> String {
        let report = OutcomeReport {
            scope: self.scope.clone(),
            termination: self.termination,
            iterations: self.iterations,
            floor: self.floor,
            initial_rows: self.initial_rows,
            target_roi_pct: self.target_roi_pct,
            target_reached: self.target_reached,
            best_stage: self.history.best_index(),
            best_roi: self.best().roi,
            stages: self.history.summaries(),
        };
        serde_json::to_string_pretty(&report).unwrap_or_default()
    }
}

pub struct GreedySearch {
    providers: Vec<Box<dyn CandidateProvider>>,
    params: SearchParams,
}

impl GreedySearch {
    pub fn new(settings: &SearchSettings, params: SearchParams) -> Self {
        let providers = build_providers(
            &settings.busca_config,
            &settings.min_entradas_config,
            &params.caps,
        );
        Self { providers, params }
    }

    pub fn with_providers(providers: Vec<Box<dyn CandidateProvider>>, params: SearchParams) -> Self {
        Self { providers, params }
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn run(&self, dataset: &Dataset, target_roi_pct: Option<f64>) -> SearchResult<SearchOutcome> {
        if dataset.is_empty() {
            return Err(SearchError::EmptyDataset);
        }
        let _profile = ProfileScope::with_context(
            "search",
            &[("rows", json!(dataset.len())), ("providers", json!(self.providers.len()))],
        );

        let initial_rows = dataset.len();
        let floor = (initial_rows as f64 * self.params.floor_fraction).max(1.0);
        let mut history = StageHistory::new(Stage::initial(dataset.clone()));
        logging::log_search_start(
            initial_rows,
            history.last().roi,
            floor,
            &logging::params_hash(&self.params.to_json()),
        );

        let workers = self.params.workers();
        let mut no_improvement = 0;
        let mut iterations = 0;
        let mut termination = Termination::IterationCap;

        for iteration in 1..=self.params.max_iterations {
            iterations = iteration;
            let chosen = {
                let current = history.last();
                let ctx = SearchContext {
                    dataset: &current.dataset,
                    config: &current.config,
                    roi: current.roi,
                    floor,
                };
                let generation = generate(&self.providers, &ctx, workers);
                for (category, err) in &generation.skipped {
                    logging::log_provider_skipped(iteration, category.as_str(), &err.to_string());
                }
                let best = select_best(&generation.candidates).cloned();
                logging::log_candidate_pass(
                    iteration,
                    generation.candidates.len(),
                    best.as_ref().map(|c| c.impact),
                );
                best
            };

            let Some(candidate) = chosen else {
                no_improvement += 1;
                if no_improvement >= self.params.max_no_improvement {
                    termination = Termination::NoImprovement;
                    break;
                }
                continue;
            };

            let stage = Stage::from_candidate(history.len(), iteration, candidate);
            logging::log_stage_commit(
                stage.index,
                iteration,
                stage.category.map(|c| c.as_str()).unwrap_or_default(),
                &stage.description,
                stage.entries,
                stage.roi,
                stage.impact,
            );
            if history.push(stage) {
                no_improvement = 0;
            } else {
                no_improvement += 1;
            }

            if (history.last().entries as f64) < floor {
                termination = Termination::FloorBreached;
                break;
            }
        }

        let best = history.best();
        logging::log_search_finished(
            history.len(),
            best.index,
            best.roi,
            termination.as_str(),
            iterations,
        );
        let target_reached = target_roi_pct.map_or(false, |t| best.roi * 100.0 >= t);

        Ok(SearchOutcome {
            history,
            scope: Scope::default(),
            termination,
            iterations,
            floor,
            initial_rows,
            target_roi_pct,
            target_reached,
        })
    }
}

/// Run a search with providers built from `settings`.
pub fn search(
    dataset: &Dataset,
    settings: &SearchSettings,
    params: SearchParams,
    target_roi_pct: Option<f64>,
) -> SearchResult<SearchOutcome> {
    GreedySearch::new(settings, params).run(dataset, target_roi_pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::row;
    use crate::dataset::Schema;

    fn losing_pairing_dataset() -> Dataset {
        let mut rows = Vec::new();
        for i in 0..40 {
            let r = if i % 4 == 0 {
                row("T", "ana", "bia", "ana", -1.0)
            } else {
                row("T", "caio", "duda", "caio", 1.0)
            };
            rows.push(r);
        }
        Dataset::new(rows, Schema::default())
    }

    #[test]
    fn empty_dataset_is_an_error() {
        let ds = Dataset::new(Vec::new(), Schema::default());
        let err = search(&ds, &SearchSettings::default(), SearchParams::default(), None).unwrap_err();
        assert!(matches!(err, SearchError::EmptyDataset));
    }

    #[test]
    fn commits_the_losing_group_then_stalls() {
        let ds = losing_pairing_dataset();
        let outcome = search(&ds, &SearchSettings::default(), SearchParams::default(), Some(50.0)).unwrap();
        assert_eq!(outcome.history.len(), 2);
        assert_eq!(outcome.termination, Termination::NoImprovement);
        assert_eq!(outcome.iterations, 11);
        let best = outcome.best();
        assert_eq!(best.entries, 30);
        assert!((best.roi - 1.0).abs() < 1e-12);
        assert!(outcome.target_reached);
        assert!((outcome.floor - 2.0).abs() < 1e-12);
    }

    #[test]
    fn iteration_cap_bounds_passes() {
        let ds = losing_pairing_dataset();
        let params = SearchParams { max_iterations: 3, ..SearchParams::default() };
        let outcome = search(&ds, &SearchSettings::default(), params, None).unwrap();
        assert_eq!(outcome.termination, Termination::IterationCap);
        assert_eq!(outcome.iterations, 3);
        assert!(!outcome.target_reached);
    }

    #[test]
    fn report_json_carries_stages_and_best() {
        let ds = losing_pairing_dataset();
        let outcome = search(&ds, &SearchSettings::default(), SearchParams::default(), None).unwrap();
        let v: serde_json::Value = serde_json::from_str(&outcome.to_json()).unwrap();
        assert_eq!(v["best_stage"], 1);
        assert_eq!(v["termination"], "no_improvement");
        assert_eq!(v["stages"].as_array().map(|a| a.len()), Some(2));
    }
}
