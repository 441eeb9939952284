//! Search configuration: per-category toggles and sample minimums persisted as
//! JSON, plus process-level run parameters read from the environment.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::candidates::Category;
use crate::error::SearchResult;
use crate::logging::log_config_fallback;

fn yes() -> bool {
    true
}

fn ten() -> usize {
    10
}

/// Which candidate categories the search may propose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchToggles {
    #[serde(rename = "usar_winrate1", default = "yes")]
    pub win_rate_1: bool,
    #[serde(rename = "usar_winrate2", default = "yes")]
    pub win_rate_2: bool,
    #[serde(rename = "usar_excl_campeonatos", default = "yes")]
    pub championships: bool,
    #[serde(rename = "usar_excl_apostas_a_favor", default = "yes")]
    pub favored_entities: bool,
    #[serde(rename = "usar_excl_apostas_contra", default = "yes")]
    pub opposed_entities: bool,
    #[serde(rename = "usar_excl_confrontos", default = "yes")]
    pub pairings: bool,
    #[serde(rename = "usar_excl_times_a_favor", default = "yes")]
    pub favored_teams: bool,
    #[serde(rename = "usar_excl_times_contra", default = "yes")]
    pub opposed_teams: bool,
    #[serde(rename = "usar_excl_tipo_apostas", default = "yes")]
    pub sides: bool,
    #[serde(rename = "usar_excl_tipo_local", default = "yes")]
    pub venues: bool,
    #[serde(rename = "usar_diferenca_placar_min", default = "yes")]
    pub score_diff_min: bool,
    #[serde(rename = "usar_diferenca_placar_max", default = "yes")]
    pub score_diff_max: bool,
}

impl Default for SearchToggles {
    fn default() -> Self {
        Self {
            win_rate_1: true,
            win_rate_2: true,
            championships: true,
            favored_entities: true,
            opposed_entities: true,
            pairings: true,
            favored_teams: true,
            opposed_teams: true,
            sides: true,
            venues: true,
            score_diff_min: true,
            score_diff_max: true,
        }
    }
}

impl SearchToggles {
    pub fn enabled(&self, category: Category) -> bool {
        match category {
            Category::WinRate1 => self.win_rate_1,
            Category::WinRate2 => self.win_rate_2,
            Category::Championship => self.championships,
            Category::FavoredEntity => self.favored_entities,
            Category::OpposedEntity => self.opposed_entities,
            Category::Pairing => self.pairings,
            Category::Side => self.sides,
            Category::Venue => self.venues,
            Category::FavoredTeam => self.favored_teams,
            Category::OpposedTeam => self.opposed_teams,
            Category::ScoreDiffMin => self.score_diff_min,
            Category::ScoreDiffMax => self.score_diff_max,
        }
    }
}

/// Minimum occurrences before a group may be proposed for exclusion.
///
/// `win_rate_1`, `win_rate_2` and `score_diff` are carried through the file
/// but the threshold categories are gated by the row floor instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinSamples {
    #[serde(rename = "min_campeonatos", default = "ten")]
    pub championships: usize,
    #[serde(rename = "min_apostas_a_favor", default = "ten")]
    pub favored_entities: usize,
    #[serde(rename = "min_apostas_contra", default = "ten")]
    pub opposed_entities: usize,
    #[serde(rename = "min_confrontos", default = "ten")]
    pub pairings: usize,
    #[serde(rename = "min_times_a_favor", default = "ten")]
    pub favored_teams: usize,
    #[serde(rename = "min_times_contra", default = "ten")]
    pub opposed_teams: usize,
    #[serde(rename = "min_tipo_apostas", default = "ten")]
    pub sides: usize,
    #[serde(rename = "min_tipo_local", default = "ten")]
    pub venues: usize,
    #[serde(rename = "min_winrate1", default = "ten")]
    pub win_rate_1: usize,
    #[serde(rename = "min_winrate2", default = "ten")]
    pub win_rate_2: usize,
    #[serde(rename = "min_diferenca_placar", default = "ten")]
    pub score_diff: usize,
}

impl Default for MinSamples {
    fn default() -> Self {
        Self {
            championships: 10,
            favored_entities: 10,
            opposed_entities: 10,
            pairings: 10,
            favored_teams: 10,
            opposed_teams: 10,
            sides: 10,
            venues: 10,
            win_rate_1: 10,
            win_rate_2: 10,
            score_diff: 10,
        }
    }
}

impl MinSamples {
    /// Every minimum raised to at least one.
    pub fn clamped(mut self) -> Self {
        for v in [
            &mut self.championships,
            &mut self.favored_entities,
            &mut self.opposed_entities,
            &mut self.pairings,
            &mut self.favored_teams,
            &mut self.opposed_teams,
            &mut self.sides,
            &mut self.venues,
            &mut self.win_rate_1,
            &mut self.win_rate_2,
            &mut self.score_diff,
        ] {
            *v = (*v).max(1);
        }
        self
    }
}

/// The persisted settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub busca_config: SearchToggles,
    #[serde(default)]
    pub min_entradas_config: MinSamples,
}

impl SearchSettings {
    pub fn from_json(text: &str) -> SearchResult<Self> {
        let mut settings: SearchSettings = serde_json::from_str(text)?;
        settings.min_entradas_config = settings.min_entradas_config.clamped();
        Ok(settings)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// File-backed settings.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("SEARCH_CONFIG_PATH").unwrap_or_else(|_| "search_config.json".to_string()),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Settings from disk. A missing file yields defaults; an unreadable or
    /// corrupt one is logged and also yields defaults.
    pub fn load(&self) -> SearchSettings {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return SearchSettings::default()
            }
            Err(err) => {
                log_config_fallback(&self.path.to_string_lossy(), &err.to_string());
                return SearchSettings::default();
            }
        };
        match SearchSettings::from_json(&text) {
            Ok(settings) => settings,
            Err(err) => {
                log_config_fallback(&self.path.to_string_lossy(), &err.to_string());
                SearchSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &SearchSettings) -> SearchResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(settings)?)?;
        Ok(())
    }
}

/// Per-category candidate caps. `None` means uncapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CandidateCaps {
    pub entity: Option<usize>,
    pub pairing: Option<usize>,
    pub team: Option<usize>,
    pub score: Option<usize>,
    pub championship: Option<usize>,
}

impl Default for CandidateCaps {
    fn default() -> Self {
        Self {
            entity: Some(5),
            pairing: Some(5),
            team: Some(3),
            score: Some(5),
            championship: None,
        }
    }
}

/// Controller parameters.
#[derive(Debug, Clone, Serialize)]
pub struct SearchParams {
    pub max_iterations: usize,
    pub max_no_improvement: usize,
    pub floor_fraction: f64,
    pub caps: CandidateCaps,
    pub parallel: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_no_improvement: 10,
            floor_fraction: 0.05,
            caps: CandidateCaps::default(),
            parallel: false,
        }
    }
}

fn env_cap(key: &str, default: Option<usize>) -> Option<usize> {
    match std::env::var(key).ok().and_then(|v| v.parse::<usize>().ok()) {
        Some(0) => None,
        Some(n) => Some(n),
        None => default,
    }
}

impl SearchParams {
    pub fn from_env() -> Self {
        let defaults = CandidateCaps::default();
        Self {
            max_iterations: std::env::var("MAX_ITERATIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(100),
            max_no_improvement: std::env::var("MAX_NO_IMPROVEMENT").ok().and_then(|v| v.parse().ok()).unwrap_or(10),
            floor_fraction: std::env::var("FLOOR_FRACTION").ok().and_then(|v| v.parse().ok()).unwrap_or(0.05),
            caps: CandidateCaps {
                entity: env_cap("ENTITY_CAP", defaults.entity),
                pairing: env_cap("PAIRING_CAP", defaults.pairing),
                team: env_cap("TEAM_CAP", defaults.team),
                score: env_cap("SCORE_CAP", defaults.score),
                championship: env_cap("CHAMPIONSHIP_CAP", defaults.championship),
            },
            parallel: std::env::var("PARALLEL_CANDIDATES")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Worker count for a candidate pass.
    pub fn workers(&self) -> usize {
        if self.parallel {
            num_cpus::get().max(1)
        } else {
            1
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults_and_clamps() {
        let text = r#"{
            "busca_config": {"usar_winrate1": false, "unknown_key": true},
            "min_entradas_config": {"min_confrontos": 0, "min_campeonatos": 3}
        }"#;
        let s = SearchSettings::from_json(text).unwrap();
        assert!(!s.busca_config.win_rate_1);
        assert!(s.busca_config.win_rate_2);
        assert_eq!(s.min_entradas_config.pairings, 1);
        assert_eq!(s.min_entradas_config.championships, 3);
        assert_eq!(s.min_entradas_config.sides, 10);
    }

    #[test]
    fn store_round_trips_and_survives_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested/search_config.json"));
        assert_eq!(store.load(), SearchSettings::default());

        let mut settings = SearchSettings::default();
        settings.busca_config.venues = false;
        settings.min_entradas_config.venues = 4;
        store.save(&settings).unwrap();
        assert_eq!(store.load(), settings);

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"usar_excl_tipo_local\": false"));

        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load(), SearchSettings::default());
    }

    #[test]
    fn toggles_cover_every_category() {
        let mut toggles = SearchToggles::default();
        assert!(Category::ALL.iter().all(|c| toggles.enabled(*c)));
        toggles.score_diff_max = false;
        assert!(!toggles.enabled(Category::ScoreDiffMax));
        assert!(toggles.enabled(Category::ScoreDiffMin));
    }

    #[test]
    fn default_params_match_heuristics() {
        let p = SearchParams::default();
        assert_eq!(p.max_iterations, 100);
        assert_eq!(p.max_no_improvement, 10);
        assert_eq!(p.caps.team, Some(3));
        assert_eq!(p.caps.championship, None);
        assert_eq!(p.workers(), 1);
    }
}
