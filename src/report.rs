//! Text, JSON and CSV renderings of search stages.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::dataset::{self, Row};
use crate::error::SearchResult;
use crate::filter::{SideLabel, Venue};
use crate::stage::{Stage, StageHistory};

const ADJUSTMENT_WIDTH: usize = 50;

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let head: String = text.chars().take(width).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn pct(roi: f64) -> String {
    if roi.is_finite() {
        format!("{:.2}%", roi * 100.0)
    } else {
        "n/a".to_string()
    }
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (cell, w) in cells.zip(widths) {
        let pad = w - cell.chars().count();
        s.push(' ');
        s.push_str(cell);
        s.push_str(&" ".repeat(pad + 1));
        s.push('|');
    }
    s
}

/// Bordered table with left-aligned cells.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }
    let border = {
        let mut s = String::from("+");
        for w in &widths {
            s.push_str(&"-".repeat(w + 2));
            s.push('+');
        }
        s
    };
    let mut out = vec![border.clone()];
    out.push(table_line(headers.iter().copied(), &widths));
    out.push(border.clone());
    for row in rows {
        out.push(table_line(row.iter().map(String::as_str), &widths));
    }
    out.push(border);
    out.join("\n")
}

/// One line per stage: index, adjustment, entries, profit, ROI.
pub fn stage_table(history: &StageHistory) -> String {
    let rows: Vec<Vec<String>> = history
        .stages()
        .iter()
        .map(|s| {
            let mut index = s.index.to_string();
            if s.index == history.best_index() {
                index.push('*');
            }
            vec![
                index,
                truncate(&s.description, ADJUSTMENT_WIDTH),
                s.entries.to_string(),
                format!("{:.2}", s.profit),
                pct(s.roi),
            ]
        })
        .collect();
    render_table(&["Stage", "Adjustment", "Entries", "Profit", "ROI"], &rows)
}

fn or_none<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "None".to_string())
}

fn list_or_none<T: ToString>(values: &[T]) -> String {
    if values.is_empty() {
        "None".to_string()
    } else {
        values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
    }
}

/// Two-column table of the stage totals and every configuration field.
pub fn config_summary(stage: &Stage) -> String {
    let c = &stage.config;
    let rows: Vec<Vec<String>> = vec![
        vec!["Stage".into(), stage.index.to_string()],
        vec!["Adjustment".into(), stage.description.clone()],
        vec!["Entries".into(), stage.entries.to_string()],
        vec!["Profit".into(), format!("{:.2}", stage.profit)],
        vec!["ROI".into(), pct(stage.roi)],
        vec!["Win rate 1 minimum".into(), or_none(c.min_win_rate_1().map(|v| format!("{:.2}%", v)))],
        vec!["Win rate 2 minimum".into(), or_none(c.min_win_rate_2().map(|v| format!("{:.2}%", v)))],
        vec!["Excluded championships".into(), list_or_none(c.excluded_championships())],
        vec!["Excluded bets on".into(), list_or_none(c.excluded_favored())],
        vec!["Excluded bets against".into(), list_or_none(c.excluded_opposed())],
        vec!["Excluded pairings".into(), list_or_none(c.excluded_pairings())],
        vec!["Excluded sides".into(), list_or_none(c.excluded_sides())],
        vec!["Excluded venues".into(), list_or_none(c.excluded_venues())],
        vec!["Excluded teams on".into(), list_or_none(c.excluded_favored_teams())],
        vec!["Excluded teams against".into(), list_or_none(c.excluded_opposed_teams())],
        vec!["Score differential minimum".into(), or_none(c.min_score_diff())],
        vec!["Score differential maximum".into(), or_none(c.max_score_diff())],
    ];
    render_table(&["Parameter", "Value"], &rows)
}

/// Count, profit and ROI of one group within one tournament.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub tournament: String,
    pub key: String,
    pub entries: usize,
    pub profit: f64,
    pub roi: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakdownSection {
    pub name: String,
    pub groups: Vec<GroupStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageBreakdown {
    pub stage: usize,
    pub sections: Vec<BreakdownSection>,
}

impl StageBreakdown {
    pub fn section(&self, name: &str) -> Option<&BreakdownSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            let rows: Vec<Vec<String>> = section
                .groups
                .iter()
                .map(|g| {
                    vec![
                        g.tournament.clone(),
                        g.key.clone(),
                        g.entries.to_string(),
                        format!("{:.2}", g.profit),
                        format!("{:.4}", g.roi),
                    ]
                })
                .collect();
            out.push_str(&format!("\n{}\n", section.name));
            out.push_str(&render_table(&["Tournament", "Group", "Entries", "Profit", "ROI"], &rows));
            out.push('\n');
        }
        out
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Numeric keys first, in numeric order, then the rest lexicographically.
fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn group_by<F>(stage: &Stage, name: &str, key: F) -> BreakdownSection
where
    F: Fn(&Row) -> Option<String>,
{
    let mut totals: BTreeMap<(String, String), (usize, f64)> = BTreeMap::new();
    for row in stage.dataset.rows() {
        if let Some(k) = key(row) {
            let entry = totals.entry((row.tournament.clone(), k)).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += row.profit;
        }
    }
    let mut groups: Vec<GroupStat> = totals
        .into_iter()
        .map(|((tournament, key), (entries, profit))| GroupStat {
            tournament,
            key,
            entries,
            profit,
            roi: round4(profit / entries as f64),
        })
        .collect();
    groups.sort_by(|a, b| a.tournament.cmp(&b.tournament).then_with(|| compare_keys(&a.key, &b.key)));
    BreakdownSection {
        name: name.to_string(),
        groups,
    }
}

/// Pairing with the two names in sorted order, so "b vs a" and "a vs b" group.
pub fn normalized_pairing(row: &Row) -> Option<String> {
    if row.entity_a.is_empty() || row.entity_b.is_empty() {
        return None;
    }
    let mut names = [row.entity_a.as_str(), row.entity_b.as_str()];
    names.sort_unstable();
    Some(names.join(" vs "))
}

fn side_label(row: &Row) -> &'static str {
    if row.bets_on_favorite() {
        SideLabel::Favorite.source_label()
    } else if row.bets_on_underdog() {
        SideLabel::Underdog.source_label()
    } else {
        "N/A"
    }
}

fn venue_label(row: &Row) -> &'static str {
    if Venue::Home.matches(row) {
        Venue::Home.source_label()
    } else if Venue::Away.matches(row) {
        Venue::Away.source_label()
    } else {
        "N/A"
    }
}

/// Per-tournament grouped statistics of a stage's rows.
pub fn breakdown(stage: &Stage) -> StageBreakdown {
    let schema = stage.dataset.schema();
    let mut sections = vec![group_by(stage, "pairing", normalized_pairing)];
    if schema.has_championship {
        sections.push(group_by(stage, "championship", |r| r.championship.clone()));
    }
    sections.push(group_by(stage, "win_rate_1", |r| r.win_rate_1.map(|w| w.to_string())));
    sections.push(group_by(stage, "win_rate_2", |r| r.win_rate_2.map(|w| w.to_string())));
    sections.push(group_by(stage, "favored_entity", |r| r.favored_entity().map(str::to_string)));
    sections.push(group_by(stage, "opposed_entity", |r| r.opposed_entity().map(str::to_string)));
    if schema.has_teams {
        sections.push(group_by(stage, "favored_team", |r| r.favored_team().map(str::to_string)));
        sections.push(group_by(stage, "opposed_team", |r| r.opposed_team().map(str::to_string)));
    }
    if schema.has_side_labels {
        sections.push(group_by(stage, "side", |r| Some(side_label(r).to_string())));
    }
    sections.push(group_by(stage, "venue", |r| Some(venue_label(r).to_string())));
    if schema.has_score {
        sections.push(group_by(stage, "score", |r| r.score.clone()));
        sections.push(group_by(stage, "score_diff", |r| r.score_diff.map(|d| d.to_string())));
    }
    if let Some(pos) = schema.extra_position(dataset::COL_LINE) {
        sections.push(group_by(stage, "line", move |r| {
            r.extra.get(pos).filter(|v| !v.is_empty()).cloned()
        }));
    }
    StageBreakdown {
        stage: stage.index,
        sections,
    }
}

fn opt_cell(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

/// Write the stage's rows, in source column names, plus derived columns.
pub fn write_stage_csv(stage: &Stage, path: &Path) -> SearchResult<()> {
    let schema = stage.dataset.schema();
    let mut headers: Vec<&str> = vec![dataset::COL_TOURNAMENT];
    if schema.has_championship {
        headers.push(dataset::COL_CHAMPIONSHIP);
    }
    headers.extend([dataset::COL_ENTITY_A, dataset::COL_ENTITY_B]);
    if schema.has_teams {
        headers.extend([dataset::COL_TEAM_A, dataset::COL_TEAM_B]);
    }
    headers.extend([
        dataset::COL_TIP,
        dataset::COL_PROFIT,
        dataset::COL_WIN_RATE_1,
        dataset::COL_WIN_RATE_2,
    ]);
    if schema.has_side_labels {
        headers.extend([dataset::COL_FAVORITE, dataset::COL_UNDERDOG]);
    }
    if schema.has_score {
        headers.push(dataset::COL_SCORE);
    }
    headers.push(dataset::COL_PAIRING);
    headers.extend(schema.extra_columns.iter().map(String::as_str));
    headers.extend([
        "Jogador Contra",
        "Time a Favor",
        "Time Contra",
        "Diferença Placar",
        "Aposta Favor (Favorito/Azarão)",
        "Mandante/Visitante",
    ]);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&headers)?;
    for row in stage.dataset.rows() {
        let mut rec: Vec<String> = vec![row.tournament.clone()];
        if schema.has_championship {
            rec.push(opt_cell(row.championship.as_deref()));
        }
        rec.extend([row.entity_a.clone(), row.entity_b.clone()]);
        if schema.has_teams {
            rec.extend([opt_cell(row.team_a.as_deref()), opt_cell(row.team_b.as_deref())]);
        }
        rec.extend([
            row.tip.clone(),
            row.profit.to_string(),
            row.win_rate_1.map(|w| w.to_string()).unwrap_or_default(),
            row.win_rate_2.map(|w| w.to_string()).unwrap_or_default(),
        ]);
        if schema.has_side_labels {
            rec.extend([opt_cell(row.favorite.as_deref()), opt_cell(row.underdog.as_deref())]);
        }
        if schema.has_score {
            rec.push(opt_cell(row.score.as_deref()));
        }
        rec.push(row.pairing.clone());
        rec.extend(row.extra.iter().cloned());
        rec.extend([
            opt_cell(row.opposed_entity()),
            opt_cell(row.favored_team()),
            opt_cell(row.opposed_team()),
            row.score_diff.map(|d| d.to_string()).unwrap_or_default(),
            side_label(row).to_string(),
            venue_label(row).to_string(),
        ]);
        writer.write_record(&rec)?;
    }
    writer.flush()?;
    Ok(())
}
