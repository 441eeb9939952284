//! List the tournaments, championships and over/under tips of an export.
//!
//! Usage: scopes <data.csv>

use std::path::Path;

use anyhow::{bail, Result};

use tipfilter::data;
use tipfilter::scope::{championships, tip_options, tournaments};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let Some(csv_path) = args.get(1) else {
        bail!("usage: scopes <data.csv>");
    };
    let dataset = data::load_dataset(Path::new(csv_path))?;
    let summary = data::summarize(&dataset);

    println!("Data: {} ({} rows, profit {:.2})", csv_path, summary.rows, summary.total_profit);
    println!(
        "Undefined: win rate 1 {}, win rate 2 {}, score differential {}",
        summary.undefined_win_rate_1, summary.undefined_win_rate_2, summary.undefined_score_diff
    );
    println!();

    for tournament in tournaments(&dataset) {
        println!("{}", tournament);
        for championship in championships(&dataset, Some(tournament.as_str())) {
            let tips = tip_options(&dataset, Some(tournament.as_str()), Some(championship.as_str()));
            if tips.is_empty() {
                println!("  {}", championship);
            } else {
                println!("  {:<30} tips: {}", championship, tips.join(", "));
            }
        }
        let tips = tip_options(&dataset, Some(tournament.as_str()), None);
        if !tips.is_empty() {
            println!("  {:<30} tips: {}", "(all championships)", tips.join(", "));
        }
    }
    Ok(())
}
