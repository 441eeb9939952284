//! Candidate generation: one provider per category proposes adjustments, the
//! shared evaluator materializes them and keeps the improving ones.

mod providers;

pub use providers::{FixedSides, GroupRole, NegativeGroups, ScoreBound, ScoreSide, WinRateThreshold};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::thread;

use crate::config::{CandidateCaps, MinSamples, SearchToggles};
use crate::dataset::Dataset;
use crate::error::{SearchError, SearchResult};
use crate::filter::{apply_adjustment, Adjustment, FilterConfig};
use crate::roi::roi;

/// Candidate categories, in tie-break priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    WinRate1,
    WinRate2,
    Championship,
    FavoredEntity,
    OpposedEntity,
    Pairing,
    Side,
    Venue,
    FavoredTeam,
    OpposedTeam,
    ScoreDiffMin,
    ScoreDiffMax,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::WinRate1,
        Category::WinRate2,
        Category::Championship,
        Category::FavoredEntity,
        Category::OpposedEntity,
        Category::Pairing,
        Category::Side,
        Category::Venue,
        Category::FavoredTeam,
        Category::OpposedTeam,
        Category::ScoreDiffMin,
        Category::ScoreDiffMax,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::WinRate1 => "win_rate_1",
            Category::WinRate2 => "win_rate_2",
            Category::Championship => "championship",
            Category::FavoredEntity => "favored_entity",
            Category::OpposedEntity => "opposed_entity",
            Category::Pairing => "pairing",
            Category::Side => "side",
            Category::Venue => "venue",
            Category::FavoredTeam => "favored_team",
            Category::OpposedTeam => "opposed_team",
            Category::ScoreDiffMin => "score_diff_min",
            Category::ScoreDiffMax => "score_diff_max",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the working state handed to every provider.
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    pub dataset: &'a Dataset,
    pub config: &'a FilterConfig,
    pub roi: f64,
    pub floor: f64,
}

/// An improving, not yet committed adjustment.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub category: Category,
    pub adjustment: Adjustment,
    pub dataset: Dataset,
    pub config: FilterConfig,
    pub roi: f64,
    pub impact: f64,
}

/// Scored-candidate source for one category.
pub trait CandidateProvider: Send + Sync {
    fn category(&self) -> Category;

    /// Adjustments to try, in enumeration order. Empty when the category does
    /// not apply to this dataset.
    fn propose(&self, ctx: &SearchContext<'_>) -> SearchResult<Vec<Adjustment>>;

    /// Materialize every proposal and keep the ones that stay above the floor
    /// and strictly improve the current ROI.
    fn evaluate(&self, ctx: &SearchContext<'_>) -> SearchResult<Vec<Candidate>> {
        let mut out = Vec::new();
        for adjustment in self.propose(ctx)? {
            let dataset = apply_adjustment(ctx.dataset, &adjustment);
            if (dataset.len() as f64) < ctx.floor {
                continue;
            }
            let candidate_roi = roi(&dataset);
            if candidate_roi > ctx.roi {
                out.push(Candidate {
                    category: self.category(),
                    config: ctx.config.with(adjustment.clone()),
                    adjustment,
                    dataset,
                    roi: candidate_roi,
                    impact: candidate_roi - ctx.roi,
                });
            }
        }
        Ok(out)
    }
}

/// Providers for every enabled category, in `Category::ALL` order.
pub fn build_providers(
    toggles: &SearchToggles,
    mins: &MinSamples,
    caps: &CandidateCaps,
) -> Vec<Box<dyn CandidateProvider>> {
    let mut list: Vec<Box<dyn CandidateProvider>> = Vec::new();
    for category in Category::ALL {
        if !toggles.enabled(category) {
            continue;
        }
        let provider: Box<dyn CandidateProvider> = match category {
            Category::WinRate1 => Box::new(WinRateThreshold::first()),
            Category::WinRate2 => Box::new(WinRateThreshold::second()),
            Category::Championship => Box::new(NegativeGroups::new(
                GroupRole::Championship,
                mins.championships,
                caps.championship,
            )),
            Category::FavoredEntity => Box::new(NegativeGroups::new(
                GroupRole::FavoredEntity,
                mins.favored_entities,
                caps.entity,
            )),
            Category::OpposedEntity => Box::new(NegativeGroups::new(
                GroupRole::OpposedEntity,
                mins.opposed_entities,
                caps.entity,
            )),
            Category::Pairing => Box::new(NegativeGroups::new(
                GroupRole::Pairing,
                mins.pairings,
                caps.pairing,
            )),
            Category::Side => Box::new(FixedSides::sides(mins.sides)),
            Category::Venue => Box::new(FixedSides::venues(mins.venues)),
            Category::FavoredTeam => Box::new(NegativeGroups::new(
                GroupRole::FavoredTeam,
                mins.favored_teams,
                caps.team,
            )),
            Category::OpposedTeam => Box::new(NegativeGroups::new(
                GroupRole::OpposedTeam,
                mins.opposed_teams,
                caps.team,
            )),
            Category::ScoreDiffMin => Box::new(ScoreBound::new(ScoreSide::Min, caps.score)),
            Category::ScoreDiffMax => Box::new(ScoreBound::new(ScoreSide::Max, caps.score)),
        };
        list.push(provider);
    }
    list
}

/// Outcome of one generation pass: improving candidates in enumeration order
/// plus the categories that failed and were skipped.
#[derive(Debug, Default)]
pub struct Generation {
    pub candidates: Vec<Candidate>,
    pub skipped: Vec<(Category, SearchError)>,
}

type ProviderOutcome = (Category, SearchResult<Vec<Candidate>>);

fn run_chunk(chunk: &[Box<dyn CandidateProvider>], ctx: &SearchContext<'_>) -> Vec<ProviderOutcome> {
    chunk.iter().map(|p| (p.category(), p.evaluate(ctx))).collect()
}

/// Run every provider against `ctx`. With `workers > 1` providers are spread
/// over scoped threads; results are reassembled in provider order so the
/// outcome is identical to the sequential pass.
pub fn generate(
    providers: &[Box<dyn CandidateProvider>],
    ctx: &SearchContext<'_>,
    workers: usize,
) -> Generation {
    let outcomes: Vec<ProviderOutcome> = if workers <= 1 || providers.len() <= 1 {
        run_chunk(providers, ctx)
    } else {
        let chunk_size = providers.len().div_ceil(workers);
        thread::scope(|s| {
            let handles: Vec<_> = providers
                .chunks(chunk_size)
                .map(|chunk| (chunk, s.spawn(move || run_chunk(chunk, ctx))))
                .collect();
            handles
                .into_iter()
                .flat_map(|(chunk, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        chunk
                            .iter()
                            .map(|p| {
                                let category = p.category();
                                let reason = "provider panicked".to_string();
                                (category, Err(SearchError::Candidate { category, reason }))
                            })
                            .collect()
                    })
                })
                .collect()
        })
    };

    let mut generation = Generation::default();
    for (category, outcome) in outcomes {
        match outcome {
            Ok(mut found) => generation.candidates.append(&mut found),
            Err(err) => generation.skipped.push((category, err)),
        }
    }
    generation
}

/// The first candidate with the largest impact.
pub fn select_best(candidates: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;
    for c in candidates {
        match best {
            Some(b) if c.impact <= b.impact => {}
            _ => best = Some(c),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::row;
    use crate::dataset::Schema;

    struct Failing;

    impl CandidateProvider for Failing {
        fn category(&self) -> Category {
            Category::Pairing
        }

        fn propose(&self, _ctx: &SearchContext<'_>) -> SearchResult<Vec<Adjustment>> {
            Err(SearchError::Candidate {
                category: Category::Pairing,
                reason: "unexpected value".to_string(),
            })
        }
    }

    fn dataset() -> Dataset {
        let mut rows = Vec::new();
        for i in 0..20 {
            let (tip, profit) = if i % 4 == 0 { ("bia", -2.0) } else { ("ana", 1.0) };
            let mut r = row("T", "ana", "bia", tip, profit);
            r.win_rate_1 = Some(40.0 + i as f64);
            r.win_rate_2 = Some(50.0);
            rows.push(r);
        }
        Dataset::new(rows, Schema::default())
    }

    fn ctx<'a>(ds: &'a Dataset, cfg: &'a FilterConfig) -> SearchContext<'a> {
        SearchContext { dataset: ds, config: cfg, roi: roi(ds), floor: 1.0 }
    }

    fn all_providers() -> Vec<Box<dyn CandidateProvider>> {
        let mut mins = MinSamples::default();
        mins.favored_entities = 1;
        mins.opposed_entities = 1;
        mins.venues = 1;
        build_providers(&SearchToggles::default(), &mins, &CandidateCaps::default())
    }

    #[test]
    fn providers_follow_category_order_and_toggles() {
        let mut toggles = SearchToggles::default();
        toggles.pairings = false;
        let providers = build_providers(&toggles, &MinSamples::default(), &CandidateCaps::default());
        let cats: Vec<Category> = providers.iter().map(|p| p.category()).collect();
        assert_eq!(cats.len(), 11);
        assert!(!cats.contains(&Category::Pairing));
        let mut sorted = cats.clone();
        sorted.sort();
        assert_eq!(cats, sorted);
    }

    #[test]
    fn every_candidate_improves_and_respects_floor() {
        let ds = dataset();
        let cfg = FilterConfig::new();
        let mut c = ctx(&ds, &cfg);
        c.floor = 5.0;
        let generation = generate(&all_providers(), &c, 1);
        assert!(!generation.candidates.is_empty());
        for cand in &generation.candidates {
            assert!(cand.roi > c.roi);
            assert!(cand.dataset.len() >= 5);
            assert!((cand.impact - (cand.roi - c.roi)).abs() < 1e-12);
            assert_eq!(cand.config.trail().len(), 1);
        }
    }

    #[test]
    fn parallel_generation_matches_sequential() {
        let ds = dataset();
        let cfg = FilterConfig::new();
        let c = ctx(&ds, &cfg);
        let providers = all_providers();
        let seq = generate(&providers, &c, 1);
        let par = generate(&providers, &c, 4);
        let key = |g: &Generation| {
            g.candidates
                .iter()
                .map(|c| (c.adjustment.clone(), c.dataset.row_ids().to_vec()))
                .collect::<Vec<_>>()
        };
        assert_eq!(key(&seq), key(&par));
    }

    #[test]
    fn failing_provider_is_skipped_not_fatal() {
        let ds = dataset();
        let cfg = FilterConfig::new();
        let c = ctx(&ds, &cfg);
        let providers: Vec<Box<dyn CandidateProvider>> =
            vec![Box::new(WinRateThreshold::first()), Box::new(Failing)];
        let generation = generate(&providers, &c, 1);
        assert_eq!(generation.skipped.len(), 1);
        assert_eq!(generation.skipped[0].0, Category::Pairing);
        assert!(!generation.candidates.is_empty());
    }

    #[test]
    fn select_best_prefers_first_of_equal_impacts() {
        let ds = dataset();
        let make = |category: Category, impact: f64| Candidate {
            category,
            adjustment: Adjustment::ExcludePairing(format!("{:?}", category)),
            dataset: ds.clone(),
            config: FilterConfig::new(),
            roi: impact,
            impact,
        };
        let list = vec![
            make(Category::WinRate1, 0.1),
            make(Category::Championship, 0.3),
            make(Category::Pairing, 0.3),
            make(Category::ScoreDiffMax, 0.2),
        ];
        assert_eq!(select_best(&list).unwrap().category, Category::Championship);
        assert!(select_best(&[]).is_none());
    }
}
