use serde::Serialize;

use crate::candidates::{Candidate, Category};
use crate::dataset::Dataset;
use crate::filter::FilterConfig;
use crate::roi::roi;

/// One committed step of the search, with its own dataset snapshot.
#[derive(Debug, Clone)]
pub struct Stage {
    pub index: usize,
    /// Controller pass that produced the stage; 0 for the initial stage.
    pub iteration: usize,
    pub description: String,
    pub category: Option<Category>,
    pub config: FilterConfig,
    pub dataset: Dataset,
    pub entries: usize,
    pub profit: f64,
    pub roi: f64,
    pub impact: f64,
}

impl Stage {
    pub fn initial(dataset: Dataset) -> Self {
        Self {
            index: 0,
            iteration: 0,
            description: "Initial state".to_string(),
            category: None,
            config: FilterConfig::new(),
            entries: dataset.len(),
            profit: dataset.profit_sum(),
            roi: roi(&dataset),
            impact: 0.0,
            dataset,
        }
    }

    pub fn from_candidate(index: usize, iteration: usize, candidate: Candidate) -> Self {
        Self {
            index,
            iteration,
            description: candidate.adjustment.describe(),
            category: Some(candidate.category),
            config: candidate.config,
            entries: candidate.dataset.len(),
            profit: candidate.dataset.profit_sum(),
            roi: candidate.roi,
            impact: candidate.impact,
            dataset: candidate.dataset,
        }
    }

    pub fn summary(&self) -> StageSummary {
        StageSummary {
            index: self.index,
            iteration: self.iteration,
            description: self.description.clone(),
            category: self.category,
            entries: self.entries,
            profit: self.profit,
            roi: self.roi,
            impact: self.impact,
            config: self.config.clone(),
        }
    }
}

/// Serializable view of a stage, without its rows.
#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub index: usize,
    pub iteration: usize,
    pub description: String,
    pub category: Option<Category>,
    pub entries: usize,
    pub profit: f64,
    pub roi: f64,
    pub impact: f64,
    pub config: FilterConfig,
}

/// Ordered stages plus the index of the highest-ROI one.
#[derive(Debug, Clone)]
pub struct StageHistory {
    stages: Vec<Stage>,
    best: usize,
}

impl StageHistory {
    pub fn new(initial: Stage) -> Self {
        Self {
            stages: vec![initial],
            best: 0,
        }
    }

    /// Append a stage; returns whether it became the new best.
    pub fn push(&mut self, stage: Stage) -> bool {
        let improved = stage.roi > self.stages[self.best].roi;
        self.stages.push(stage);
        if improved {
            self.best = self.stages.len() - 1;
        }
        improved
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn last(&self) -> &Stage {
        // never empty: constructed with the initial stage
        &self.stages[self.stages.len() - 1]
    }

    pub fn best(&self) -> &Stage {
        &self.stages[self.best]
    }

    pub fn best_index(&self) -> usize {
        self.best
    }

    pub fn summaries(&self) -> Vec<StageSummary> {
        self.stages.iter().map(Stage::summary).collect()
    }
}
