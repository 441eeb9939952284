//! Loading wager exports from disk.
//!
//! Covers header validation, per-row coercion into undefined values, BOM
//! handling, short records and the dataset fingerprint.

use std::io::Write;

use tipfilter::data::{fingerprint, load_dataset, summarize};
use tipfilter::error::SearchError;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path
}

const HEADER: &str =
    "Torneio,Campeonato,Jogador A,Jogador B,Time A,Time B,Tip,Lucro/Prej.,Winrate 1,Winrate 2,Favorito,Azarão,Placar Envio,Linha";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn loads_full_export_with_undefined_values() {
    let dir = tempfile::tempdir().unwrap();
    let body = format!(
        "\u{feff}{}\n\
         Cup,Alpha,ana,bia,Reds,Blues,ana,0.85,55.5%,60%,ana,bia,10-7,2.5\n\
         Cup,Alpha,ana,bia,Reds,Blues,bia,-1,n/a,60%,ana,bia,abc,2.5\n\
         Cup,Bravo,caio,duda,Greens,Golds,Over,-1,70%,,caio,duda,,3.5\n",
        HEADER
    );
    let path = write_csv(&dir, "export.csv", &body);
    let ds = load_dataset(&path).unwrap();
    assert_eq!(ds.len(), 3);

    let schema = ds.schema();
    assert!(schema.has_championship && schema.has_teams && schema.has_side_labels && schema.has_score);
    assert_eq!(schema.extra_columns, vec!["Linha".to_string()]);

    let rows: Vec<_> = ds.rows().collect();
    assert_eq!(rows[0].tournament, "Cup");
    assert_eq!(rows[0].win_rate_1, Some(55.5));
    assert_eq!(rows[0].score_diff, Some(3));
    assert_eq!(rows[1].win_rate_1, None);
    assert_eq!(rows[1].score_diff, None);
    assert_eq!(rows[2].win_rate_2, None);
    assert_eq!(rows[2].score, None);
    assert_eq!(rows[2].pairing, "caio vs duda");

    let summary = summarize(&ds);
    assert_eq!(summary.undefined_win_rate_1, 1);
    assert_eq!(summary.undefined_win_rate_2, 1);
    assert_eq!(summary.undefined_score_diff, 2);
    assert!((summary.total_profit - -1.15).abs() < 1e-9);
}

#[test]
fn short_records_are_padded() {
    let dir = tempfile::tempdir().unwrap();
    let body = "Torneio,Jogador A,Jogador B,Tip,Lucro/Prej.,Winrate 1,Winrate 2\n\
                Cup,ana,bia,ana,1\n";
    let path = write_csv(&dir, "short.csv", body);
    let ds = load_dataset(&path).unwrap();
    let row = ds.rows().next().unwrap();
    assert_eq!(row.profit, 1.0);
    assert_eq!(row.win_rate_1, None);
    assert_eq!(row.win_rate_2, None);
}

#[test]
fn missing_columns_are_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "bad.csv", "Torneio,Jogador A,Tip\nCup,ana,ana\n");
    match load_dataset(&path) {
        Err(SearchError::Schema { missing }) => {
            assert!(missing.contains(&"Jogador B".to_string()));
            assert!(missing.contains(&"Winrate 2".to_string()));
        }
        other => panic!("expected schema error, got {:?}", other.map(|d| d.len())),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_dataset(&dir.path().join("nope.csv")).unwrap_err();
    assert!(matches!(err, SearchError::Io(_)));
}

#[test]
fn fingerprint_tracks_content() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_csv(&dir, "a.csv", "x\n1\n");
    let b = write_csv(&dir, "b.csv", "x\n1\n");
    let c = write_csv(&dir, "c.csv", "x\n2\n");
    let fa = fingerprint(&a).unwrap();
    assert_eq!(fa.len(), 64);
    assert!(fa.chars().all(|ch| ch.is_ascii_hexdigit()));
    assert_eq!(fa, fingerprint(&b).unwrap());
    assert_ne!(fa, fingerprint(&c).unwrap());
}
