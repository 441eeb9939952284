//! Tabular ingestion: CSV loading, schema validation and normalization into
//! the canonical `Dataset`.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::dataset::*;
use crate::error::{SearchError, SearchResult};
use crate::logging;
use crate::score::score_differential;

const CANONICAL_COLUMNS: [&str; 15] = [
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
    COL_PAIRING,
    // Derived on load, never taken from the input.
    "Diferença Placar",
];

/// Header plus string cells, as read from the source file.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl RawTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub undefined_win_rate_1: usize,
    pub undefined_win_rate_2: usize,
    pub undefined_score_diff: usize,
    pub total_profit: f64,
    pub schema: Schema,
}

pub fn read_csv<R: Read>(reader: R) -> SearchResult<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let mut records = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let mut cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        cells.resize(headers.len(), String::new());
        records.push(cells);
    }
    Ok(RawTable { headers, records })
}

pub fn load_csv(path: &Path) -> SearchResult<RawTable> {
    let file = File::open(path)?;
    let table = read_csv(file)?;
    logging::log_table_read(&path.display().to_string(), table.records.len(), table.headers.len());
    Ok(table)
}

/// Validate the required columns and coerce every record into a `Row`.
pub fn normalize(raw: &RawTable) -> SearchResult<Dataset> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !raw.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SearchError::Schema { missing });
    }

    // Required columns are present past this point.
    let required = |name: &str| raw.column(name).unwrap_or_default();
    let tournament = required(COL_TOURNAMENT);
    let entity_a = required(COL_ENTITY_A);
    let entity_b = required(COL_ENTITY_B);
    let tip = required(COL_TIP);
    let profit = required(COL_PROFIT);
    let win_rate_1 = required(COL_WIN_RATE_1);
    let win_rate_2 = required(COL_WIN_RATE_2);

    let championship = raw.column(COL_CHAMPIONSHIP);
    let teams = raw.column(COL_TEAM_A).zip(raw.column(COL_TEAM_B));
    let labels = raw.column(COL_FAVORITE).zip(raw.column(COL_UNDERDOG));
    let score = raw.column(COL_SCORE);
    let pairing = raw.column(COL_PAIRING);

    let extra_idx: Vec<usize> = raw
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !CANONICAL_COLUMNS.contains(&h.as_str()))
        .map(|(i, _)| i)
        .collect();
    let schema = Schema {
        has_championship: championship.is_some(),
        has_teams: teams.is_some(),
        has_side_labels: labels.is_some(),
        has_score: score.is_some(),
        extra_columns: extra_idx.iter().map(|&i| raw.headers[i].clone()).collect(),
    };

    let rows = raw
        .records
        .iter()
        .map(|rec| {
            let cell = |i: usize| rec.get(i).map(|s| s.trim()).unwrap_or("");
            let opt = |i: Option<usize>| i.map(cell).filter(|s| !s.is_empty()).map(str::to_string);
            let a = cell(entity_a).to_string();
            let b = cell(entity_b).to_string();
            let pairing = match pairing {
                Some(i) => cell(i).to_string(),
                None if !a.is_empty() && !b.is_empty() => format!("{} vs {}", a, b),
                None => String::new(),
            };
            let score = opt(score);
            Row {
                tournament: cell(tournament).to_string(),
                championship: opt(championship),
                team_a: opt(teams.map(|t| t.0)),
                team_b: opt(teams.map(|t| t.1)),
                tip: cell(tip).to_string(),
                profit: parse_profit(cell(profit)),
                win_rate_1: parse_percentage(cell(win_rate_1)),
                win_rate_2: parse_percentage(cell(win_rate_2)),
                favorite: opt(labels.map(|l| l.0)),
                underdog: opt(labels.map(|l| l.1)),
                score_diff: score_differential(score.as_deref()),
                score,
                pairing,
                entity_a: a,
                entity_b: b,
                extra: extra_idx.iter().map(|&i| cell(i).to_string()).collect(),
            }
        })
        .collect();

    Ok(Dataset::new(rows, schema))
}

/// `"55.5%"` or `"55.5"` to a number; anything unparseable is undefined.
pub fn parse_percentage(cell: &str) -> Option<f64> {
    cell.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Missing or non-numeric profit counts as zero.
pub fn parse_profit(cell: &str) -> f64 {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

pub fn summarize(dataset: &Dataset) -> DatasetSummary {
    let mut summary = DatasetSummary {
        rows: dataset.len(),
        undefined_win_rate_1: 0,
        undefined_win_rate_2: 0,
        undefined_score_diff: 0,
        total_profit: 0.0,
        schema: dataset.schema().clone(),
    };
    for row in dataset.rows() {
        summary.total_profit += row.profit;
        if row.win_rate_1.is_none() {
            summary.undefined_win_rate_1 += 1;
        }
        if row.win_rate_2.is_none() {
            summary.undefined_win_rate_2 += 1;
        }
        if row.score_diff.is_none() {
            summary.undefined_score_diff += 1;
        }
    }
    summary
}

/// Load and normalize a CSV file in one step.
pub fn load_dataset(path: &Path) -> SearchResult<Dataset> {
    let raw = load_csv(path)?;
    let dataset = normalize(&raw)?;
    let summary = summarize(&dataset);
    logging::log_dataset_loaded(&path.display().to_string(), &summary);
    Ok(dataset)
}

pub fn fingerprint(path: &Path) -> SearchResult<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], records: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            records: records
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    const BASE: [&str; 7] = [
        "Torneio", "Jogador A", "Jogador B", "Tip", "Lucro/Prej.", "Winrate 1", "Winrate 2",
    ];

    #[test]
    fn rejects_missing_required_columns() {
        let raw = table(&["Torneio", "Jogador A", "Tip"], &[]);
        match normalize(&raw) {
            Err(SearchError::Schema { missing }) => {
                assert_eq!(
                    missing,
                    vec!["Jogador B", "Lucro/Prej.", "Winrate 1", "Winrate 2"]
                );
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn coerces_numbers_and_derives_pairing() {
        let raw = table(
            &BASE,
            &[
                &["T1", "ana", "bia", "ana", "1.5", "55%", "40.5%"],
                &["T1", "ana", "", "ana", "", "abc", "40"],
                &["T1", "caio", "duda", "duda", "x", "", "n/a"],
            ],
        );
        let ds = normalize(&raw).unwrap();
        let rows: Vec<&Row> = ds.rows().collect();
        assert_eq!(rows[0].profit, 1.5);
        assert_eq!(rows[0].win_rate_1, Some(55.0));
        assert_eq!(rows[0].win_rate_2, Some(40.5));
        assert_eq!(rows[0].pairing, "ana vs bia");
        assert_eq!(rows[1].profit, 0.0);
        assert_eq!(rows[1].win_rate_1, None);
        assert_eq!(rows[1].pairing, "");
        assert_eq!(rows[2].profit, 0.0);
        assert_eq!(rows[2].win_rate_2, None);
        assert!(!ds.schema().has_teams);
        assert!(!ds.schema().has_score);
    }

    #[test]
    fn optional_columns_are_flagged() {
        let mut headers = BASE.to_vec();
        headers.extend(["Campeonato", "Time A", "Time B", "Placar Envio", "Linha"]);
        let raw = table(
            &headers,
            &[&["T1", "ana", "bia", "bia", "-1", "50", "50", "C1", "Red", "", "10-7", "2.5"]],
        );
        let ds = normalize(&raw).unwrap();
        let schema = ds.schema();
        assert!(schema.has_championship);
        assert!(schema.has_teams);
        assert!(schema.has_score);
        assert!(!schema.has_side_labels);
        assert_eq!(schema.extra_columns, vec!["Linha".to_string()]);
        let row = ds.rows().next().unwrap();
        assert_eq!(row.team_a.as_deref(), Some("Red"));
        assert_eq!(row.team_b, None);
        assert_eq!(row.score_diff, Some(3));
        assert_eq!(row.extra, vec!["2.5".to_string()]);
    }

    #[test]
    fn existing_pairing_column_wins() {
        let mut headers = BASE.to_vec();
        headers.push("Confronto");
        let raw = table(&headers, &[&["T1", "ana", "bia", "ana", "1", "50", "50", "custom"]]);
        let ds = normalize(&raw).unwrap();
        assert_eq!(ds.rows().next().unwrap().pairing, "custom");
    }

    #[test]
    fn normalize_leaves_raw_table_untouched() {
        let raw = table(&BASE, &[&["T1", "ana", "bia", "ana", "1", "50%", "50%"]]);
        let before = raw.records.clone();
        let _ = normalize(&raw).unwrap();
        assert_eq!(raw.records, before);
    }

    #[test]
    fn read_csv_pads_short_records_and_strips_bom() {
        let text = "\u{feff}Torneio,Jogador A,Jogador B,Tip,Lucro/Prej.,Winrate 1,Winrate 2\nT1,ana,bia,ana,1\n";
        let raw = read_csv(text.as_bytes()).unwrap();
        assert_eq!(raw.headers[0], "Torneio");
        assert_eq!(raw.records[0].len(), 7);
        let ds = normalize(&raw).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.rows().next().unwrap().win_rate_1, None);
    }

    #[test]
    fn summary_counts_undefined_values() {
        let raw = table(
            &BASE,
            &[
                &["T1", "ana", "bia", "ana", "1", "50", ""],
                &["T1", "ana", "bia", "bia", "-3", "", ""],
            ],
        );
        let summary = summarize(&normalize(&raw).unwrap());
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.undefined_win_rate_1, 1);
        assert_eq!(summary.undefined_win_rate_2, 2);
        assert_eq!(summary.undefined_score_diff, 2);
        assert!((summary.total_profit - -2.0).abs() < 1e-12);
    }
}
