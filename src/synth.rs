//! Seeded synthetic wager exports for demos and property tests.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::RawTable;
use crate::dataset::*;

const TOURNAMENTS: [&str; 2] = ["Spring Cup", "Winter League"];
const CHAMPIONSHIPS: [&str; 5] = ["Alpha", "Bravo", "Charlie", "Delta", "Echo"];
const PLAYERS: [&str; 12] = [
    "ana", "bia", "caio", "duda", "eli", "fabi", "gui", "hugo", "iris", "joao", "kai", "lia",
];
const TEAMS: [&str; 8] = ["Reds", "Blues", "Greens", "Golds", "Silvers", "Blacks", "Whites", "Purples"];

pub const SYNTH_HEADERS: [&str; 14] = [
    COL_TOURNAMENT,
    COL_CHAMPIONSHIP,
    COL_ENTITY_A,
    COL_ENTITY_B,
    COL_TEAM_A,
    COL_TEAM_B,
    COL_TIP,
    COL_PROFIT,
    COL_WIN_RATE_1,
    COL_WIN_RATE_2,
    COL_FAVORITE,
    COL_UNDERDOG,
    COL_SCORE,
    COL_LINE,
];

/// A table shaped like a real export. Win probability depends on the picked
/// player, the championship and win rate 1, so some groups lose money and the
/// search has something to find.
pub fn synthetic_table(rows: usize, seed: u64) -> RawTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let skill: Vec<f64> = PLAYERS.iter().map(|_| rng.gen_range(-0.15..0.15)).collect();
    let league_bias: Vec<f64> = CHAMPIONSHIPS.iter().map(|_| rng.gen_range(-0.1..0.1)).collect();

    let mut records = Vec::with_capacity(rows);
    for _ in 0..rows {
        let tournament = TOURNAMENTS[rng.gen_range(0..TOURNAMENTS.len())];
        let champ = rng.gen_range(0..CHAMPIONSHIPS.len());
        let a = rng.gen_range(0..PLAYERS.len());
        let mut b = rng.gen_range(0..PLAYERS.len() - 1);
        if b >= a {
            b += 1;
        }
        let team_a = TEAMS[rng.gen_range(0..TEAMS.len())];
        let team_b = TEAMS[rng.gen_range(0..TEAMS.len())];
        let w1: f64 = (rng.gen_range(80..160) as f64) / 2.0;
        let w2: f64 = (rng.gen_range(80..160) as f64) / 2.0;

        let roll: f64 = rng.gen();
        let (tip, edge) = if roll < 0.4 {
            (PLAYERS[a], skill[a])
        } else if roll < 0.8 {
            (PLAYERS[b], skill[b])
        } else if roll < 0.9 {
            ("Over", 0.0)
        } else {
            ("Under", 0.0)
        };
        let p_win = (0.5 + edge + league_bias[champ] + (w1 - 60.0) / 200.0).clamp(0.05, 0.95);
        let profit = if rng.gen_bool(p_win) { 0.85 } else { -1.0 };

        let (favorite, underdog) = if rng.gen_bool(0.5) {
            (PLAYERS[a], PLAYERS[b])
        } else {
            (PLAYERS[b], PLAYERS[a])
        };
        let score = if rng.gen_bool(0.05) {
            "n/a".to_string()
        } else {
            format!("{}-{}", rng.gen_range(0..6), rng.gen_range(0..6))
        };

        records.push(vec![
            tournament.to_string(),
            CHAMPIONSHIPS[champ].to_string(),
            PLAYERS[a].to_string(),
            PLAYERS[b].to_string(),
            team_a.to_string(),
            team_b.to_string(),
            tip.to_string(),
            format!("{:.2}", profit),
            format!("{:.1}%", w1),
            format!("{:.1}%", w2),
            favorite.to_string(),
            underdog.to_string(),
            score,
            "2.5".to_string(),
        ]);
    }

    RawTable {
        headers: SYNTH_HEADERS.iter().map(|h| h.to_string()).collect(),
        records,
    }
}
