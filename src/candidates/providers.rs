use std::collections::BTreeMap;

use super::{CandidateProvider, Category, SearchContext};
use crate::dataset::Row;
use crate::error::SearchResult;
use crate::filter::{Adjustment, SideLabel, Venue};

/// Proposes raising a win-rate lower bound to each distinct observed value
/// above the current bound.
#[derive(Debug, Clone, Copy)]
pub struct WinRateThreshold {
    second: bool,
}

impl WinRateThreshold {
    pub fn first() -> Self {
        Self { second: false }
    }

    pub fn second() -> Self {
        Self { second: true }
    }

    fn value(&self, row: &Row) -> Option<f64> {
        if self.second {
            row.win_rate_2
        } else {
            row.win_rate_1
        }
    }
}

impl CandidateProvider for WinRateThreshold {
    fn category(&self) -> Category {
        if self.second {
            Category::WinRate2
        } else {
            Category::WinRate1
        }
    }

    fn propose(&self, ctx: &SearchContext<'_>) -> SearchResult<Vec<Adjustment>> {
        let current = if self.second {
            ctx.config.min_win_rate_2()
        } else {
            ctx.config.min_win_rate_1()
        };
        let mut values: Vec<f64> = ctx
            .dataset
            .rows()
            .filter_map(|r| self.value(r))
            .filter(|v| v.is_finite())
            .filter(|v| current.map_or(true, |c| *v > c))
            .collect();
        values.sort_by(f64::total_cmp);
        values.dedup();
        Ok(values
            .into_iter()
            .map(|v| {
                if self.second {
                    Adjustment::MinWinRate2(v)
                } else {
                    Adjustment::MinWinRate1(v)
                }
            })
            .collect())
    }
}

/// The grouping a `NegativeGroups` provider aggregates profit over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRole {
    Championship,
    FavoredEntity,
    OpposedEntity,
    Pairing,
    FavoredTeam,
    OpposedTeam,
}

impl GroupRole {
    fn category(self) -> Category {
        match self {
            GroupRole::Championship => Category::Championship,
            GroupRole::FavoredEntity => Category::FavoredEntity,
            GroupRole::OpposedEntity => Category::OpposedEntity,
            GroupRole::Pairing => Category::Pairing,
            GroupRole::FavoredTeam => Category::FavoredTeam,
            GroupRole::OpposedTeam => Category::OpposedTeam,
        }
    }

    fn exclusion(self, value: String) -> Adjustment {
        match self {
            GroupRole::Championship => Adjustment::ExcludeChampionship(value),
            GroupRole::FavoredEntity => Adjustment::ExcludeFavoredEntity(value),
            GroupRole::OpposedEntity => Adjustment::ExcludeOpposedEntity(value),
            GroupRole::Pairing => Adjustment::ExcludePairing(value),
            GroupRole::FavoredTeam => Adjustment::ExcludeFavoredTeam(value),
            GroupRole::OpposedTeam => Adjustment::ExcludeOpposedTeam(value),
        }
    }

    /// Entity roles rank and cap the losing groups before the sample
    /// minimum is checked; the others check the minimum first.
    fn caps_before_minimum(self) -> bool {
        matches!(self, GroupRole::FavoredEntity | GroupRole::OpposedEntity)
    }

    /// Group keys a row contributes to. An entity counts once per side it
    /// appears on, matching how the exclusion predicate removes it.
    fn keys<'r>(self, row: &'r Row, out: &mut Vec<&'r str>) {
        out.clear();
        match self {
            GroupRole::Championship => out.extend(row.championship.as_deref()),
            GroupRole::Pairing => out.push(&row.pairing),
            GroupRole::FavoredEntity => {
                if row.bets_on_a() {
                    out.push(&row.entity_a);
                }
                if row.bets_on_b() {
                    out.push(&row.entity_b);
                }
            }
            GroupRole::OpposedEntity => {
                if !row.bets_on_a() {
                    out.push(&row.entity_a);
                }
                if !row.bets_on_b() {
                    out.push(&row.entity_b);
                }
            }
            GroupRole::FavoredTeam => {
                if row.bets_on_a() {
                    out.extend(row.team_a.as_deref());
                }
                if row.bets_on_b() {
                    out.extend(row.team_b.as_deref());
                }
            }
            // Over/Under rows have no opposed team.
            GroupRole::OpposedTeam => out.extend(row.opposed_team()),
        }
        out.retain(|k| !k.is_empty());
    }
}

/// Proposes excluding the groups with negative total profit, most negative
/// first, subject to the sample threshold and the cap.
#[derive(Debug, Clone, Copy)]
pub struct NegativeGroups {
    role: GroupRole,
    min_count: usize,
    cap: Option<usize>,
}

impl NegativeGroups {
    pub fn new(role: GroupRole, min_count: usize, cap: Option<usize>) -> Self {
        Self {
            role,
            min_count: min_count.max(1),
            cap,
        }
    }

    fn already_excluded<'c>(&self, ctx: &'c SearchContext<'_>) -> &'c [String] {
        match self.role {
            GroupRole::Championship => ctx.config.excluded_championships(),
            GroupRole::FavoredEntity => ctx.config.excluded_favored(),
            GroupRole::OpposedEntity => ctx.config.excluded_opposed(),
            GroupRole::Pairing => ctx.config.excluded_pairings(),
            GroupRole::FavoredTeam => ctx.config.excluded_favored_teams(),
            GroupRole::OpposedTeam => ctx.config.excluded_opposed_teams(),
        }
    }
}

impl CandidateProvider for NegativeGroups {
    fn category(&self) -> Category {
        self.role.category()
    }

    fn propose(&self, ctx: &SearchContext<'_>) -> SearchResult<Vec<Adjustment>> {
        let schema = ctx.dataset.schema();
        let applicable = match self.role {
            GroupRole::Championship => schema.has_championship,
            GroupRole::FavoredTeam | GroupRole::OpposedTeam => schema.has_teams,
            _ => true,
        };
        if !applicable {
            return Ok(Vec::new());
        }

        let mut totals: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        let mut keys = Vec::with_capacity(2);
        for row in ctx.dataset.rows() {
            self.role.keys(row, &mut keys);
            for key in &keys {
                let entry = totals.entry(*key).or_insert((0.0, 0));
                entry.0 += row.profit;
                entry.1 += 1;
            }
        }

        let excluded = self.already_excluded(ctx);
        let eligible = |key: &str, count: usize| {
            count >= self.min_count && !excluded.iter().any(|e| e == key)
        };
        let mut losers: Vec<(&str, f64, usize)> = totals
            .into_iter()
            .filter(|(_, (sum, _))| *sum < 0.0)
            .map(|(key, (sum, count))| (key, sum, count))
            .collect();
        // Stable: equal totals keep ascending key order.
        losers.sort_by(|a, b| a.1.total_cmp(&b.1));
        let cap = self.cap.unwrap_or(usize::MAX);
        if self.role.caps_before_minimum() {
            losers.truncate(cap);
            losers.retain(|(key, _, count)| eligible(key, *count));
        } else {
            losers.retain(|(key, _, count)| eligible(key, *count));
            losers.truncate(cap);
        }
        Ok(losers
            .into_iter()
            .map(|(key, _, _)| self.role.exclusion(key.to_string()))
            .collect())
    }
}

/// Proposes excluding one of a fixed pair of labels: favorite/underdog or
/// home/away.
#[derive(Debug, Clone, Copy)]
pub struct FixedSides {
    venues: bool,
    min_count: usize,
}

impl FixedSides {
    pub fn sides(min_count: usize) -> Self {
        Self { venues: false, min_count: min_count.max(1) }
    }

    pub fn venues(min_count: usize) -> Self {
        Self { venues: true, min_count: min_count.max(1) }
    }
}

impl CandidateProvider for FixedSides {
    fn category(&self) -> Category {
        if self.venues {
            Category::Venue
        } else {
            Category::Side
        }
    }

    fn propose(&self, ctx: &SearchContext<'_>) -> SearchResult<Vec<Adjustment>> {
        let count = |pred: &dyn Fn(&Row) -> bool| ctx.dataset.rows().filter(|r| pred(*r)).count();
        let mut out = Vec::new();
        if self.venues {
            for venue in Venue::ALL {
                if ctx.config.excluded_venues().contains(&venue) {
                    continue;
                }
                if count(&|r| venue.matches(r)) >= self.min_count {
                    out.push(Adjustment::ExcludeVenue(venue));
                }
            }
        } else {
            if !ctx.dataset.schema().has_side_labels {
                return Ok(out);
            }
            for side in SideLabel::ALL {
                if ctx.config.excluded_sides().contains(&side) {
                    continue;
                }
                if count(&|r| side.matches(r)) >= self.min_count {
                    out.push(Adjustment::ExcludeSide(side));
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSide {
    Min,
    Max,
}

/// Proposes tightening the score-differential bound to the nearest observed
/// values beyond the current one.
#[derive(Debug, Clone, Copy)]
pub struct ScoreBound {
    side: ScoreSide,
    cap: Option<usize>,
}

impl ScoreBound {
    pub fn new(side: ScoreSide, cap: Option<usize>) -> Self {
        Self { side, cap }
    }
}

impl CandidateProvider for ScoreBound {
    fn category(&self) -> Category {
        match self.side {
            ScoreSide::Min => Category::ScoreDiffMin,
            ScoreSide::Max => Category::ScoreDiffMax,
        }
    }

    fn propose(&self, ctx: &SearchContext<'_>) -> SearchResult<Vec<Adjustment>> {
        if !ctx.dataset.schema().has_score {
            return Ok(Vec::new());
        }
        let mut values: Vec<u64> = ctx.dataset.rows().filter_map(|r| r.score_diff).collect();
        values.sort_unstable();
        values.dedup();

        let picked: Vec<u64> = match self.side {
            ScoreSide::Min => {
                let current = ctx.config.min_score_diff();
                values
                    .into_iter()
                    .filter(|v| current.map_or(true, |c| *v > c))
                    .collect()
            }
            ScoreSide::Max => {
                let current = ctx.config.max_score_diff();
                values
                    .into_iter()
                    .rev()
                    .filter(|v| current.map_or(true, |c| *v < c))
                    .collect()
            }
        };
        let limit = self.cap.unwrap_or(usize::MAX);
        Ok(picked
            .into_iter()
            .take(limit)
            .map(|v| match self.side {
                ScoreSide::Min => Adjustment::MinScoreDiff(v),
                ScoreSide::Max => Adjustment::MaxScoreDiff(v),
            })
            .collect())
    }
}
