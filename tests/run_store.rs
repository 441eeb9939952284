//! SQLite persistence of finished searches.

use tipfilter::config::{SearchParams, SearchSettings};
use tipfilter::data::normalize;
use tipfilter::scope::{run_analysis, Scope};
use tipfilter::storage::RunStore;
use tipfilter::synth::synthetic_table;

fn outcome() -> tipfilter::SearchOutcome {
    let ds = normalize(&synthetic_table(900, 17)).unwrap();
    let scope = Scope {
        tournament: Some("Spring Cup".to_string()),
        ..Scope::default()
    };
    run_analysis(&ds, &scope, Some(5.0), &SearchSettings::default(), SearchParams::default()).unwrap()
}

#[test]
fn persisted_run_reads_back_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runs.sqlite");
    let outcome = outcome();

    let mut store = RunStore::new(path.to_str().unwrap()).unwrap();
    store.init().unwrap();
    store.persist("run-1", &outcome, "abc123").unwrap();

    let run = store.load_run("run-1").unwrap().expect("run stored");
    assert_eq!(run.dataset_hash, "abc123");
    assert_eq!(run.scope, "tournament=Spring Cup championship=all tip=all");
    assert_eq!(run.target_roi_pct, Some(5.0));
    assert_eq!(run.termination, outcome.termination.as_str());
    assert_eq!(run.best_stage, outcome.history.best_index());

    let stages = store.load_stages("run-1").unwrap();
    assert_eq!(stages.len(), outcome.history.len());
    for (stored, stage) in stages.iter().zip(outcome.stages()) {
        assert_eq!(stored.index, stage.index);
        assert_eq!(stored.iteration, stage.iteration);
        assert_eq!(stored.description, stage.description);
        assert_eq!(stored.entries, stage.entries);
        assert_eq!(stored.config, stage.config);
        assert!((stored.roi - stage.roi).abs() < 1e-12);
    }
}

#[test]
fn re_persisting_replaces_the_run() {
    let mut store = RunStore::in_memory().unwrap();
    store.init().unwrap();
    let outcome = outcome();
    store.persist("r", &outcome, "h1").unwrap();
    store.persist("r", &outcome, "h2").unwrap();

    assert_eq!(store.load_run("r").unwrap().unwrap().dataset_hash, "h2");
    assert_eq!(store.load_stages("r").unwrap().len(), outcome.history.len());
    assert!(store.load_run("missing").unwrap().is_none());
    assert!(store.load_stages("missing").unwrap().is_empty());
}

#[test]
fn init_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runs.sqlite");
    let mut store = RunStore::new(path.to_str().unwrap()).unwrap();
    store.init().unwrap();
    store.init().unwrap();
}
