//! Run a filter search over a wager export.
//!
//! Usage: tipfilter <data.csv> [target_roi_pct] [report_stage]
//!
//! Scope comes from SCOPE_TOURNAMENT, SCOPE_CHAMPIONSHIP and SCOPE_TIP.
//! Reports land in REPORT_DIR (default out/search); runs are recorded in
//! SQLITE_PATH (default ./tipfilter.sqlite).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::json;

use tipfilter::config::{ConfigStore, SearchParams};
use tipfilter::logging::{self, ProfileScope};
use tipfilter::storage::RunStore;
use tipfilter::{data, report, run_analysis, Scope};

fn scope_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let Some(csv_path) = args.get(1) else {
        bail!("usage: tipfilter <data.csv> [target_roi_pct] [report_stage]");
    };
    let target_roi_pct: Option<f64> = args.get(2).and_then(|s| s.parse().ok());
    let report_stage: Option<usize> = args.get(3).and_then(|s| s.parse().ok());

    let _profile = ProfileScope::with_context("tipfilter", &[("path", json!(csv_path))]);
    let path = Path::new(csv_path);
    let dataset = data::load_dataset(path).with_context(|| format!("loading {}", csv_path))?;
    let dataset_hash = data::fingerprint(path)?;

    let config_store = ConfigStore::from_env();
    let settings = config_store.load();
    let params = SearchParams::from_env();
    let scope = Scope {
        tournament: scope_var("SCOPE_TOURNAMENT"),
        championship: scope_var("SCOPE_CHAMPIONSHIP"),
        tip: scope_var("SCOPE_TIP"),
    };
    logging::log_audit(
        "search_inputs",
        &logging::params_hash(&format!("{}{}", settings.to_json(), params.to_json())),
        &dataset_hash,
        "",
    );

    let outcome = run_analysis(&dataset, &scope, target_roi_pct, &settings, params)?;

    println!("Scope: {}", scope);
    println!(
        "Rows: {} (floor {:.0}), passes: {}, stopped: {}",
        outcome.initial_rows,
        outcome.floor,
        outcome.iterations,
        outcome.termination.as_str()
    );
    println!("{}", report::stage_table(&outcome.history));
    let best = outcome.best();
    println!(
        "Best stage: {} (ROI {:.2}%, {} entries)",
        best.index,
        best.roi * 100.0,
        best.entries
    );
    if let Some(target) = outcome.target_roi_pct {
        println!(
            "Target ROI {:.2}%: {}",
            target,
            if outcome.target_reached { "reached" } else { "not reached" }
        );
    }

    let out_dir = PathBuf::from(std::env::var("REPORT_DIR").unwrap_or_else(|_| "out/search".to_string()));
    std::fs::create_dir_all(&out_dir)?;
    let json_path = out_dir.join("report.json");
    std::fs::write(&json_path, outcome.to_json())?;
    logging::log_report_written("json", &json_path.to_string_lossy(), best.index);

    let stage_index = report_stage.unwrap_or(best.index);
    let Some(stage) = outcome.history.get(stage_index) else {
        bail!(
            "stage {} does not exist (history has {} stages)",
            stage_index,
            outcome.history.len()
        );
    };
    let csv_out = out_dir.join(format!("stage_{}.csv", stage_index));
    report::write_stage_csv(stage, &csv_out)?;
    logging::log_report_written("csv", &csv_out.to_string_lossy(), stage_index);

    let txt_out = out_dir.join(format!("stage_{}.txt", stage_index));
    let text = format!(
        "{}\n{}",
        report::config_summary(stage),
        report::breakdown(stage).render()
    );
    std::fs::write(&txt_out, text)?;
    logging::log_report_written("text", &txt_out.to_string_lossy(), stage_index);

    let sqlite_path = std::env::var("SQLITE_PATH").unwrap_or_else(|_| "./tipfilter.sqlite".to_string());
    let mut store = RunStore::new(&sqlite_path)?;
    store.init()?;
    let run_id = logging::run_id();
    store.persist(&run_id, &outcome, &dataset_hash)?;
    logging::log_audit(
        "search_outcome",
        &logging::params_hash(&settings.to_json()),
        &dataset_hash,
        &logging::params_hash(&outcome.to_json()),
    );

    println!("Reports: {}", out_dir.display());
    println!("Run {} recorded in {}", run_id, sqlite_path);
    Ok(())
}
