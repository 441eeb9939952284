//! Canonical wager rows and immutable dataset views.
//!
//! A `Dataset` is an ordered index into a shared, never-mutated frame of rows.
//! Filtering produces a new index over the same frame, so every stage of a
//! search can keep its own snapshot without copying rows.

use std::sync::Arc;

use serde::Serialize;

pub const COL_TOURNAMENT: &str = "Torneio";
pub const COL_CHAMPIONSHIP: &str = "Campeonato";
pub const COL_ENTITY_A: &str = "Jogador A";
pub const COL_ENTITY_B: &str = "Jogador B";
pub const COL_TEAM_A: &str = "Time A";
pub const COL_TEAM_B: &str = "Time B";
pub const COL_TIP: &str = "Tip";
pub const COL_PROFIT: &str = "Lucro/Prej.";
pub const COL_WIN_RATE_1: &str = "Winrate 1";
pub const COL_WIN_RATE_2: &str = "Winrate 2";
pub const COL_FAVORITE: &str = "Favorito";
pub const COL_UNDERDOG: &str = "Azarão";
pub const COL_SCORE: &str = "Placar Envio";
pub const COL_PAIRING: &str = "Confronto";
pub const COL_LINE: &str = "Linha";

pub const REQUIRED_COLUMNS: [&str; 7] = [
    COL_TOURNAMENT,
    COL_ENTITY_A,
    COL_ENTITY_B,
    COL_TIP,
    COL_PROFIT,
    COL_WIN_RATE_1,
    COL_WIN_RATE_2,
];

/// One historical wager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub tournament: String,
    pub championship: Option<String>,
    pub entity_a: String,
    pub entity_b: String,
    pub team_a: Option<String>,
    pub team_b: Option<String>,
    pub tip: String,
    pub profit: f64,
    pub win_rate_1: Option<f64>,
    pub win_rate_2: Option<f64>,
    pub favorite: Option<String>,
    pub underdog: Option<String>,
    pub score: Option<String>,
    pub pairing: String,
    pub score_diff: Option<u64>,
    /// Cells of the non-canonical columns, aligned with `Schema::extra_columns`.
    pub extra: Vec<String>,
}

impl Row {
    pub fn bets_on_a(&self) -> bool {
        self.tip == self.entity_a
    }

    pub fn bets_on_b(&self) -> bool {
        self.tip == self.entity_b
    }

    pub fn favored_entity(&self) -> Option<&str> {
        if self.bets_on_a() {
            Some(&self.entity_a)
        } else if self.bets_on_b() {
            Some(&self.entity_b)
        } else {
            None
        }
    }

    pub fn opposed_entity(&self) -> Option<&str> {
        if self.bets_on_a() {
            Some(&self.entity_b)
        } else if self.bets_on_b() {
            Some(&self.entity_a)
        } else {
            None
        }
    }

    pub fn favored_team(&self) -> Option<&str> {
        if self.bets_on_a() {
            self.team_a.as_deref()
        } else if self.bets_on_b() {
            self.team_b.as_deref()
        } else {
            None
        }
    }

    pub fn opposed_team(&self) -> Option<&str> {
        if self.bets_on_a() {
            self.team_b.as_deref()
        } else if self.bets_on_b() {
            self.team_a.as_deref()
        } else {
            None
        }
    }

    pub fn bets_on_favorite(&self) -> bool {
        self.favorite.as_deref() == Some(self.tip.as_str())
    }

    pub fn bets_on_underdog(&self) -> bool {
        self.underdog.as_deref() == Some(self.tip.as_str())
    }
}

/// Which optional columns the source table carried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub has_championship: bool,
    pub has_teams: bool,
    pub has_side_labels: bool,
    pub has_score: bool,
    pub extra_columns: Vec<String>,
}

impl Schema {
    pub fn extra_position(&self, column: &str) -> Option<usize> {
        self.extra_columns.iter().position(|c| c == column)
    }
}

#[derive(Debug)]
struct Frame {
    rows: Vec<Row>,
    schema: Schema,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    frame: Arc<Frame>,
    index: Arc<[usize]>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>, schema: Schema) -> Self {
        let index: Arc<[usize]> = (0..rows.len()).collect();
        Self {
            frame: Arc::new(Frame { rows, schema }),
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn schema(&self) -> &Schema {
        &self.frame.schema
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> + '_ {
        self.index.iter().map(move |&i| &self.frame.rows[i])
    }

    /// Positions of the visible rows in the underlying frame.
    pub fn row_ids(&self) -> &[usize] {
        &self.index
    }

    pub fn profit_sum(&self) -> f64 {
        self.rows().map(|r| r.profit).sum()
    }

    /// Keep the rows matching `keep`, preserving order.
    pub fn retain<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&Row) -> bool,
    {
        let index: Arc<[usize]> = self
            .index
            .iter()
            .copied()
            .filter(|&i| keep(&self.frame.rows[i]))
            .collect();
        Dataset {
            frame: Arc::clone(&self.frame),
            index,
        }
    }

    pub fn shares_frame(&self, other: &Dataset) -> bool {
        Arc::ptr_eq(&self.frame, &other.frame)
    }

    /// Row-for-row subset check: same frame and an order-preserving
    /// subsequence of `other`'s rows.
    pub fn is_subset_of(&self, other: &Dataset) -> bool {
        if !self.shares_frame(other) {
            return false;
        }
        let mut theirs = other.index.iter();
        self.index.iter().all(|id| theirs.any(|o| o == id))
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        if self.shares_frame(other) {
            return self.index == other.index;
        }
        self.len() == other.len() && self.rows().zip(other.rows()).all(|(a, b)| a == b)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::row;
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(
            vec![
                row("T1", "ana", "bia", "ana", 1.0),
                row("T1", "ana", "bia", "bia", -2.0),
                row("T2", "caio", "duda", "Over", 0.5),
            ],
            Schema::default(),
        )
    }

    #[test]
    fn retain_preserves_order_and_frame() {
        let ds = sample();
        let kept = ds.retain(|r| r.profit > 0.0);
        assert_eq!(kept.row_ids(), &[0, 2]);
        assert!(kept.shares_frame(&ds));
        assert!(kept.is_subset_of(&ds));
        assert!(!ds.is_subset_of(&kept));
    }

    #[test]
    fn roles_follow_the_tip() {
        let ds = sample();
        let rows: Vec<&Row> = ds.rows().collect();
        assert_eq!(rows[0].favored_entity(), Some("ana"));
        assert_eq!(rows[0].opposed_entity(), Some("bia"));
        assert_eq!(rows[1].opposed_entity(), Some("ana"));
        assert_eq!(rows[2].favored_entity(), None);
        assert_eq!(rows[2].opposed_entity(), None);
    }

    #[test]
    fn profit_sum_over_view() {
        let ds = sample();
        assert!((ds.profit_sum() - -0.5).abs() < 1e-12);
        let kept = ds.retain(|r| r.tournament == "T1");
        assert!((kept.profit_sum() - -1.0).abs() < 1e-12);
    }
}
