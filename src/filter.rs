//! Filter configuration and the pure filter engine.
//!
//! `FilterConfig` is an immutable value: `with` returns a new configuration
//! one adjustment stricter than the receiver, and keeps the ordered trail of
//! adjustments that built it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::candidates::Category;
use crate::dataset::{Dataset, Row, Schema};

/// Favorite/underdog side of a bet, matched against the label columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideLabel {
    Favorite,
    Underdog,
}

impl SideLabel {
    pub const ALL: [SideLabel; 2] = [SideLabel::Favorite, SideLabel::Underdog];

    /// Label used by the source spreadsheets.
    pub fn source_label(&self) -> &'static str {
        match self {
            SideLabel::Favorite => "Favorito",
            SideLabel::Underdog => "Azarão",
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            SideLabel::Favorite => row.bets_on_favorite(),
            SideLabel::Underdog => row.bets_on_underdog(),
        }
    }
}

impl fmt::Display for SideLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideLabel::Favorite => write!(f, "favorite"),
            SideLabel::Underdog => write!(f, "underdog"),
        }
    }
}

/// Home (entity A) or away (entity B) side of a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    Home,
    Away,
}

impl Venue {
    pub const ALL: [Venue; 2] = [Venue::Home, Venue::Away];

    pub fn source_label(&self) -> &'static str {
        match self {
            Venue::Home => "Mandante",
            Venue::Away => "Visitante",
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Venue::Home => row.bets_on_a(),
            Venue::Away => row.bets_on_b(),
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Home => write!(f, "home"),
            Venue::Away => write!(f, "away"),
        }
    }
}

/// One constraint added to a configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Adjustment {
    MinWinRate1(f64),
    MinWinRate2(f64),
    ExcludeChampionship(String),
    ExcludeFavoredEntity(String),
    ExcludeOpposedEntity(String),
    ExcludePairing(String),
    ExcludeSide(SideLabel),
    ExcludeVenue(Venue),
    ExcludeFavoredTeam(String),
    ExcludeOpposedTeam(String),
    MinScoreDiff(u64),
    MaxScoreDiff(u64),
}

impl Adjustment {
    pub fn category(&self) -> Category {
        match self {
            Adjustment::MinWinRate1(_) => Category::WinRate1,
            Adjustment::MinWinRate2(_) => Category::WinRate2,
            Adjustment::ExcludeChampionship(_) => Category::Championship,
            Adjustment::ExcludeFavoredEntity(_) => Category::FavoredEntity,
            Adjustment::ExcludeOpposedEntity(_) => Category::OpposedEntity,
            Adjustment::ExcludePairing(_) => Category::Pairing,
            Adjustment::ExcludeSide(_) => Category::Side,
            Adjustment::ExcludeVenue(_) => Category::Venue,
            Adjustment::ExcludeFavoredTeam(_) => Category::FavoredTeam,
            Adjustment::ExcludeOpposedTeam(_) => Category::OpposedTeam,
            Adjustment::MinScoreDiff(_) => Category::ScoreDiffMin,
            Adjustment::MaxScoreDiff(_) => Category::ScoreDiffMax,
        }
    }

    /// Human-readable description recorded on the stage.
    pub fn describe(&self) -> String {
        match self {
            Adjustment::MinWinRate1(v) => format!("Win rate 1 minimum = {:.2}%", v),
            Adjustment::MinWinRate2(v) => format!("Win rate 2 minimum = {:.2}%", v),
            Adjustment::ExcludeChampionship(c) => format!("Excluded championship {}", c),
            Adjustment::ExcludeFavoredEntity(e) => format!("Excluded bets on {}", e),
            Adjustment::ExcludeOpposedEntity(e) => format!("Excluded bets against {}", e),
            Adjustment::ExcludePairing(p) => format!("Excluded pairing {}", p),
            Adjustment::ExcludeSide(s) => format!("Excluded bets on the {}", s),
            Adjustment::ExcludeVenue(v) => format!("Excluded bets on the {} side", v),
            Adjustment::ExcludeFavoredTeam(t) => format!("Excluded bets on team {}", t),
            Adjustment::ExcludeOpposedTeam(t) => format!("Excluded bets against team {}", t),
            Adjustment::MinScoreDiff(d) => format!("Score differential minimum = {}", d),
            Adjustment::MaxScoreDiff(d) => format!("Score differential maximum = {}", d),
        }
    }

    /// The single predicate this adjustment adds.
    pub fn admits(&self, row: &Row, schema: &Schema) -> bool {
        match self {
            Adjustment::MinWinRate1(b) => row.win_rate_1.map_or(false, |w| w >= *b),
            Adjustment::MinWinRate2(b) => row.win_rate_2.map_or(false, |w| w >= *b),
            Adjustment::ExcludeChampionship(c) => row.championship.as_deref() != Some(c.as_str()),
            Adjustment::ExcludeFavoredEntity(e) => {
                !((row.bets_on_a() && row.entity_a == *e) || (row.bets_on_b() && row.entity_b == *e))
            }
            Adjustment::ExcludeOpposedEntity(e) => {
                !((!row.bets_on_a() && row.entity_a == *e) || (!row.bets_on_b() && row.entity_b == *e))
            }
            Adjustment::ExcludePairing(p) => row.pairing != *p,
            Adjustment::ExcludeSide(side) => !schema.has_side_labels || !side.matches(row),
            Adjustment::ExcludeVenue(venue) => !venue.matches(row),
            Adjustment::ExcludeFavoredTeam(t) => {
                let t = Some(t.as_str());
                !schema.has_teams
                    || !((row.bets_on_a() && row.team_a.as_deref() == t)
                        || (row.bets_on_b() && row.team_b.as_deref() == t))
            }
            Adjustment::ExcludeOpposedTeam(t) => {
                let t = Some(t.as_str());
                !schema.has_teams
                    || !((!row.bets_on_a() && row.team_a.as_deref() == t)
                        || (!row.bets_on_b() && row.team_b.as_deref() == t))
            }
            Adjustment::MinScoreDiff(m) => !schema.has_score || row.score_diff.map_or(false, |d| d >= *m),
            Adjustment::MaxScoreDiff(m) => !schema.has_score || row.score_diff.map_or(false, |d| d <= *m),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    min_win_rate_1: Option<f64>,
    min_win_rate_2: Option<f64>,
    excluded_favored: Vec<String>,
    excluded_opposed: Vec<String>,
    excluded_pairings: Vec<String>,
    excluded_championships: Vec<String>,
    excluded_favored_teams: Vec<String>,
    excluded_opposed_teams: Vec<String>,
    excluded_sides: Vec<SideLabel>,
    excluded_venues: Vec<Venue>,
    min_score_diff: Option<u64>,
    max_score_diff: Option<u64>,
    trail: Vec<Adjustment>,
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new configuration with `adjustment` added. Bounds only ever tighten:
    /// a looser bound leaves the stricter one in place.
    pub fn with(&self, adjustment: Adjustment) -> FilterConfig {
        let mut next = self.clone();
        match &adjustment {
            Adjustment::MinWinRate1(v) => {
                next.min_win_rate_1 = Some(next.min_win_rate_1.map_or(*v, |cur| cur.max(*v)))
            }
            Adjustment::MinWinRate2(v) => {
                next.min_win_rate_2 = Some(next.min_win_rate_2.map_or(*v, |cur| cur.max(*v)))
            }
            Adjustment::ExcludeChampionship(c) => push_unique(&mut next.excluded_championships, c.clone()),
            Adjustment::ExcludeFavoredEntity(e) => push_unique(&mut next.excluded_favored, e.clone()),
            Adjustment::ExcludeOpposedEntity(e) => push_unique(&mut next.excluded_opposed, e.clone()),
            Adjustment::ExcludePairing(p) => push_unique(&mut next.excluded_pairings, p.clone()),
            Adjustment::ExcludeSide(s) => push_unique(&mut next.excluded_sides, *s),
            Adjustment::ExcludeVenue(v) => push_unique(&mut next.excluded_venues, *v),
            Adjustment::ExcludeFavoredTeam(t) => push_unique(&mut next.excluded_favored_teams, t.clone()),
            Adjustment::ExcludeOpposedTeam(t) => push_unique(&mut next.excluded_opposed_teams, t.clone()),
            Adjustment::MinScoreDiff(d) => {
                next.min_score_diff = Some(next.min_score_diff.map_or(*d, |cur| cur.max(*d)))
            }
            Adjustment::MaxScoreDiff(d) => {
                next.max_score_diff = Some(next.max_score_diff.map_or(*d, |cur| cur.min(*d)))
            }
        }
        next.trail.push(adjustment);
        next
    }

    /// Both configurations' constraints, `other`'s trail appended after ours.
    pub fn merge(&self, other: &FilterConfig) -> FilterConfig {
        other
            .trail
            .iter()
            .cloned()
            .fold(self.clone(), |acc, adj| acc.with(adj))
    }

    /// Adjustments in the order they were added.
    pub fn trail(&self) -> &[Adjustment] {
        &self.trail
    }

    pub fn is_empty(&self) -> bool {
        self.trail.is_empty()
    }

    /// The effective constraint set: one bound per populated bound field and
    /// one exclusion per excluded value.
    pub fn constraints(&self) -> Vec<Adjustment> {
        let mut out = Vec::new();
        out.extend(self.min_win_rate_1.map(Adjustment::MinWinRate1));
        out.extend(self.min_win_rate_2.map(Adjustment::MinWinRate2));
        out.extend(self.excluded_favored.iter().cloned().map(Adjustment::ExcludeFavoredEntity));
        out.extend(self.excluded_opposed.iter().cloned().map(Adjustment::ExcludeOpposedEntity));
        out.extend(self.excluded_pairings.iter().cloned().map(Adjustment::ExcludePairing));
        out.extend(self.excluded_championships.iter().cloned().map(Adjustment::ExcludeChampionship));
        out.extend(self.excluded_favored_teams.iter().cloned().map(Adjustment::ExcludeFavoredTeam));
        out.extend(self.excluded_opposed_teams.iter().cloned().map(Adjustment::ExcludeOpposedTeam));
        out.extend(self.excluded_sides.iter().copied().map(Adjustment::ExcludeSide));
        out.extend(self.excluded_venues.iter().copied().map(Adjustment::ExcludeVenue));
        out.extend(self.min_score_diff.map(Adjustment::MinScoreDiff));
        out.extend(self.max_score_diff.map(Adjustment::MaxScoreDiff));
        out
    }

    pub fn min_win_rate_1(&self) -> Option<f64> {
        self.min_win_rate_1
    }

    pub fn min_win_rate_2(&self) -> Option<f64> {
        self.min_win_rate_2
    }

    pub fn min_score_diff(&self) -> Option<u64> {
        self.min_score_diff
    }

    pub fn max_score_diff(&self) -> Option<u64> {
        self.max_score_diff
    }

    pub fn excluded_favored(&self) -> &[String] {
        &self.excluded_favored
    }

    pub fn excluded_opposed(&self) -> &[String] {
        &self.excluded_opposed
    }

    pub fn excluded_pairings(&self) -> &[String] {
        &self.excluded_pairings
    }

    pub fn excluded_championships(&self) -> &[String] {
        &self.excluded_championships
    }

    pub fn excluded_favored_teams(&self) -> &[String] {
        &self.excluded_favored_teams
    }

    pub fn excluded_opposed_teams(&self) -> &[String] {
        &self.excluded_opposed_teams
    }

    pub fn excluded_sides(&self) -> &[SideLabel] {
        &self.excluded_sides
    }

    pub fn excluded_venues(&self) -> &[Venue] {
        &self.excluded_venues
    }
}

/// Rows of `dataset` admitted by every constraint of `config`.
pub fn apply(dataset: &Dataset, config: &FilterConfig) -> Dataset {
    let constraints = config.constraints();
    if constraints.is_empty() {
        return dataset.clone();
    }
    let schema = dataset.schema();
    dataset.retain(|row| constraints.iter().all(|c| c.admits(row, schema)))
}

/// Narrow a dataset that already satisfies some configuration `C` by one
/// more adjustment. Equal to `apply(dataset, &C.with(adjustment))`.
pub fn apply_adjustment(dataset: &Dataset, adjustment: &Adjustment) -> Dataset {
    let schema = dataset.schema();
    dataset.retain(|row| adjustment.admits(row, schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::{full_schema, row};

    fn dataset() -> Dataset {
        let mut rows = Vec::new();
        let specs = [
            // a, b, tip, profit, wr1, wr2, champ, team_a, team_b, fav, dog, score
            ("ana", "bia", "ana", 1.0, 60.0, 40.0, "C1", "Red", "Blue", "ana", "bia", "2-1"),
            ("ana", "bia", "bia", -1.0, 55.0, 45.0, "C1", "Red", "Blue", "ana", "bia", "3-0"),
            ("caio", "duda", "caio", 2.0, 70.0, 50.0, "C2", "Green", "Red", "duda", "caio", "abc"),
            ("caio", "duda", "duda", -3.0, 45.0, 65.0, "C2", "Green", "Red", "duda", "caio", "1-1"),
            ("ana", "caio", "Over", 0.5, 50.0, 50.0, "C3", "Red", "Green", "ana", "caio", "4-2"),
        ];
        for (a, b, tip, p, w1, w2, c, ta, tb, fav, dog, score) in specs {
            let mut r = row("T1", a, b, tip, p);
            r.win_rate_1 = Some(w1);
            r.win_rate_2 = Some(w2);
            r.championship = Some(c.to_string());
            r.team_a = Some(ta.to_string());
            r.team_b = Some(tb.to_string());
            r.favorite = Some(fav.to_string());
            r.underdog = Some(dog.to_string());
            r.score = Some(score.to_string());
            r.score_diff = crate::score::score_differential(Some(score));
            rows.push(r);
        }
        Dataset::new(rows, full_schema())
    }

    fn ids(config: &FilterConfig) -> Vec<usize> {
        apply(&dataset(), config).row_ids().to_vec()
    }

    #[test]
    fn empty_config_keeps_everything() {
        assert_eq!(ids(&FilterConfig::new()), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn win_rate_bounds_are_inclusive() {
        let cfg = FilterConfig::new().with(Adjustment::MinWinRate1(55.0));
        assert_eq!(ids(&cfg), vec![0, 1, 2]);
        let cfg = cfg.with(Adjustment::MinWinRate2(45.0));
        assert_eq!(ids(&cfg), vec![1, 2]);
    }

    #[test]
    fn undefined_win_rate_is_dropped_by_bound() {
        let mut r = row("T", "a", "b", "a", 1.0);
        r.win_rate_1 = None;
        let ds = Dataset::new(vec![r], full_schema());
        let out = apply(&ds, &FilterConfig::new().with(Adjustment::MinWinRate1(0.0)));
        assert!(out.is_empty());
    }

    #[test]
    fn favored_and_opposed_exclusions_mirror() {
        let favored = FilterConfig::new().with(Adjustment::ExcludeFavoredEntity("ana".into()));
        assert_eq!(ids(&favored), vec![1, 2, 3, 4]);
        // Against ana: row 1 (tip bia), row 4 (tip Over, ana is A).
        let opposed = FilterConfig::new().with(Adjustment::ExcludeOpposedEntity("ana".into()));
        assert_eq!(ids(&opposed), vec![0, 2, 3]);
    }

    #[test]
    fn team_exclusions_follow_tip_side() {
        let favored = FilterConfig::new().with(Adjustment::ExcludeFavoredTeam("Red".into()));
        // Red backed in rows 0 (A=Red) and 3 (B=Red).
        assert_eq!(ids(&favored), vec![1, 2, 4]);
        let opposed = FilterConfig::new().with(Adjustment::ExcludeOpposedTeam("Red".into()));
        // Red opposed in rows 1 (A=Red, tip B), 2 (B=Red, tip A), 4 (tip neither, A=Red).
        assert_eq!(ids(&opposed), vec![0, 3]);
    }

    #[test]
    fn team_exclusions_skip_without_team_columns() {
        let mut schema = full_schema();
        schema.has_teams = false;
        let mut r = row("T", "a", "b", "a", 1.0);
        r.team_a = Some("Red".into());
        let ds = Dataset::new(vec![r], schema);
        let cfg = FilterConfig::new().with(Adjustment::ExcludeFavoredTeam("Red".into()));
        assert_eq!(apply(&ds, &cfg).len(), 1);
    }

    #[test]
    fn pairing_and_championship_exclusions() {
        let cfg = FilterConfig::new()
            .with(Adjustment::ExcludePairing("ana vs bia".into()))
            .with(Adjustment::ExcludeChampionship("C2".into()));
        assert_eq!(ids(&cfg), vec![4]);
    }

    #[test]
    fn side_and_venue_exclusions() {
        let fav = FilterConfig::new().with(Adjustment::ExcludeSide(SideLabel::Favorite));
        assert_eq!(ids(&fav), vec![1, 2, 4]);
        let dog = FilterConfig::new().with(Adjustment::ExcludeSide(SideLabel::Underdog));
        assert_eq!(ids(&dog), vec![0, 3, 4]);
        let home = FilterConfig::new().with(Adjustment::ExcludeVenue(Venue::Home));
        assert_eq!(ids(&home), vec![1, 3, 4]);
        let away = FilterConfig::new().with(Adjustment::ExcludeVenue(Venue::Away));
        assert_eq!(ids(&away), vec![0, 2, 4]);
    }

    #[test]
    fn score_bounds_drop_undefined_differentials() {
        let cfg = FilterConfig::new().with(Adjustment::MinScoreDiff(1));
        assert_eq!(ids(&cfg), vec![0, 1, 4]);
        let cfg = FilterConfig::new().with(Adjustment::MaxScoreDiff(2));
        assert_eq!(ids(&cfg), vec![0, 3, 4]);
    }

    #[test]
    fn bounds_only_tighten() {
        let cfg = FilterConfig::new()
            .with(Adjustment::MinWinRate1(60.0))
            .with(Adjustment::MinWinRate1(50.0))
            .with(Adjustment::MaxScoreDiff(3))
            .with(Adjustment::MaxScoreDiff(5));
        assert_eq!(cfg.min_win_rate_1(), Some(60.0));
        assert_eq!(cfg.max_score_diff(), Some(3));
        assert_eq!(cfg.trail().len(), 4);
    }

    #[test]
    fn with_does_not_mutate_receiver() {
        let base = FilterConfig::new().with(Adjustment::ExcludePairing("x".into()));
        let next = base.with(Adjustment::ExcludePairing("y".into()));
        assert_eq!(base.excluded_pairings(), &["x".to_string()]);
        assert_eq!(next.excluded_pairings().len(), 2);
        assert_eq!(next.trail()[..1], base.trail()[..]);
    }

    #[test]
    fn filters_commute() {
        let ds = dataset();
        let c1 = FilterConfig::new()
            .with(Adjustment::MinWinRate1(50.0))
            .with(Adjustment::ExcludeVenue(Venue::Away));
        let c2 = FilterConfig::new()
            .with(Adjustment::ExcludeChampionship("C3".into()))
            .with(Adjustment::MinScoreDiff(1));
        let stepwise = apply(&apply(&ds, &c1), &c2);
        assert_eq!(stepwise, apply(&ds, &c1.merge(&c2)));
        assert_eq!(stepwise, apply(&apply(&ds, &c2), &c1));
    }

    #[test]
    fn single_adjustment_matches_full_reapply() {
        let ds = dataset();
        let base = FilterConfig::new().with(Adjustment::MinWinRate2(45.0));
        let current = apply(&ds, &base);
        for adj in [
            Adjustment::ExcludeFavoredEntity("caio".into()),
            Adjustment::ExcludeSide(SideLabel::Underdog),
            Adjustment::MaxScoreDiff(1),
        ] {
            let fast = apply_adjustment(&current, &adj);
            assert_eq!(fast, apply(&ds, &base.with(adj.clone())));
        }
    }

    #[test]
    fn output_is_ordered_subset() {
        let ds = dataset();
        let cfg = FilterConfig::new().with(Adjustment::ExcludeOpposedEntity("bia".into()));
        let out = apply(&ds, &cfg);
        assert!(out.len() <= ds.len());
        assert!(out.is_subset_of(&ds));
    }
}
