//! Inspect the JSON-lines logs written by a search run.
//!
//! Usage:
//!   logparse <command> <events.jsonl> [options]
//!
//! Commands:
//!   summary <file>             - Counts by level, domain and event, plus search totals
//!   filter <file> [options]    - Filter entries by domain/level/event/stage
//!   stages <file>              - Committed stages in order
//!   replay <file>              - Check sequence continuity
//!
//! Options:
//!   --domain=<d1,d2>   Filter by domain (data,scope,search,candidate,report,storage,system,profile,audit)
//!   --level=<level>    Minimum level (trace,debug,info,warn,error,fatal)
//!   --event=<e1,e2>    Filter by event name
//!   --stage=<n>        Only entries about stage n
//!   --json             Output raw JSON lines

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct LogEntry {
    ts: String,
    seq: u64,
    lvl: String,
    component: String,
    event: String,
    msg: Option<String>,
    #[serde(default)]
    data: Value,
    stage: Option<u64>,
    iteration: Option<u64>,
    category: Option<String>,
}

#[derive(Debug, Default)]
struct LogStats {
    total_entries: u64,
    by_level: HashMap<String, u64>,
    by_domain: HashMap<String, u64>,
    by_event: HashMap<String, u64>,
    first_ts: Option<String>,
    last_ts: Option<String>,
    candidate_passes: u64,
    empty_passes: u64,
    commits: u64,
    skipped_providers: u64,
    commits_by_category: HashMap<String, u64>,
    termination: Option<String>,
    errors: u64,
}

#[derive(Debug, Clone, Default)]
struct EntryFilter {
    domains: Option<Vec<String>>,
    min_level: Option<String>,
    events: Option<Vec<String>>,
    stage: Option<u64>,
}

fn level_rank(lvl: &str) -> u8 {
    match lvl.to_lowercase().as_str() {
        "trace" => 0,
        "debug" => 1,
        "info" => 2,
        "warn" => 3,
        "error" => 4,
        "fatal" => 5,
        _ => 2,
    }
}

fn parse_log_file(path: &Path) -> Result<Vec<(String, Option<LogEntry>)>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let parsed = serde_json::from_str::<LogEntry>(&line).ok();
        out.push((line, parsed));
    }
    Ok(out)
}

fn cmd_summary(path: &Path) -> Result<()> {
    let mut stats = LogStats::default();

    for (line, entry) in parse_log_file(path)? {
        let Some(e) = entry else {
            if !line.is_empty() {
                eprintln!("Failed to parse: {}", line.chars().take(80).collect::<String>());
            }
            continue;
        };
        stats.total_entries += 1;
        *stats.by_level.entry(e.lvl.clone()).or_insert(0) += 1;
        *stats.by_domain.entry(e.component.clone()).or_insert(0) += 1;
        *stats.by_event.entry(e.event.clone()).or_insert(0) += 1;
        if stats.first_ts.is_none() {
            stats.first_ts = Some(e.ts.clone());
        }
        stats.last_ts = Some(e.ts.clone());

        match e.event.as_str() {
            "candidate_pass" => {
                stats.candidate_passes += 1;
                if e.data.get("generated").and_then(Value::as_u64) == Some(0) {
                    stats.empty_passes += 1;
                }
            }
            "stage_commit" => {
                stats.commits += 1;
                let cat = e.category.clone().unwrap_or_else(|| "?".to_string());
                *stats.commits_by_category.entry(cat).or_insert(0) += 1;
            }
            "provider_skipped" => stats.skipped_providers += 1,
            "search_finished" => {
                stats.termination = e
                    .data
                    .get("termination")
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
            _ => {}
        }
        if e.lvl == "ERROR" || e.lvl == "FATAL" {
            stats.errors += 1;
        }
    }

    println!("=== Log Summary ===\n");
    println!("Total entries: {}", stats.total_entries);
    println!(
        "Time range: {} -> {}",
        stats.first_ts.as_deref().unwrap_or("?"),
        stats.last_ts.as_deref().unwrap_or("?")
    );

    println!("\n--- By Level ---");
    let mut levels: Vec<_> = stats.by_level.iter().collect();
    levels.sort_by_key(|(k, _)| level_rank(k));
    for (lvl, count) in levels {
        println!("  {:<8} {:>8}", lvl, count);
    }

    println!("\n--- By Domain ---");
    let mut domains: Vec<_> = stats.by_domain.iter().collect();
    domains.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (domain, count) in domains {
        println!("  {:<12} {:>8}", domain, count);
    }

    println!("\n--- Top Events ---");
    let mut events: Vec<_> = stats.by_event.iter().collect();
    events.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (event, count) in events.iter().take(15) {
        println!("  {:<24} {:>8}", event, count);
    }

    println!("\n--- Search Activity ---");
    println!("  Candidate passes:  {:>8}", stats.candidate_passes);
    println!("  Empty passes:      {:>8}", stats.empty_passes);
    println!("  Stages committed:  {:>8}", stats.commits);
    println!("  Providers skipped: {:>8}", stats.skipped_providers);
    println!("  Errors:            {:>8}", stats.errors);
    println!(
        "  Termination:       {:>8}",
        stats.termination.as_deref().unwrap_or("?")
    );
    if !stats.commits_by_category.is_empty() {
        println!("\n--- Commits By Category ---");
        let mut cats: Vec<_> = stats.commits_by_category.iter().collect();
        cats.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (cat, count) in cats {
            println!("  {:<16} {:>8}", cat, count);
        }
    }
    Ok(())
}

fn cmd_filter(path: &Path, filter: &EntryFilter, as_json: bool) -> Result<()> {
    for (line, entry) in parse_log_file(path)? {
        let Some(e) = entry else { continue };

        if let Some(ref min) = filter.min_level {
            if level_rank(&e.lvl) < level_rank(min) {
                continue;
            }
        }
        if let Some(ref domains) = filter.domains {
            if !domains.iter().any(|d| d == &e.component) {
                continue;
            }
        }
        if let Some(ref events) = filter.events {
            if !events.iter().any(|ev| ev == &e.event) {
                continue;
            }
        }
        if let Some(stage) = filter.stage {
            if e.stage != Some(stage) {
                continue;
            }
        }

        if as_json {
            println!("{}", line);
        } else {
            println!(
                "[{}] {} {} {} {}",
                e.ts.get(11..23).unwrap_or(&e.ts),
                e.lvl,
                e.component,
                e.event,
                e.msg.as_deref().unwrap_or("")
            );
        }
    }
    Ok(())
}

fn cmd_stages(path: &Path) -> Result<()> {
    println!(
        "{:>5} {:>5} {:<16} {:>8} {:>10} {:>10}  {}",
        "Stage", "Pass", "Category", "Entries", "ROI", "Impact", "Adjustment"
    );
    println!("{}", "-".repeat(90));
    for (_, entry) in parse_log_file(path)? {
        let Some(e) = entry else { continue };
        if e.event != "stage_commit" {
            continue;
        }
        let entries = e.data.get("entries").and_then(Value::as_u64).unwrap_or(0);
        let roi = e.data.get("roi").and_then(Value::as_f64).unwrap_or(f64::NAN);
        let impact = e.data.get("impact").and_then(Value::as_f64).unwrap_or(f64::NAN);
        println!(
            "{:>5} {:>5} {:<16} {:>8} {:>9.2}% {:>10.5}  {}",
            e.stage.unwrap_or(0),
            e.iteration.unwrap_or(0),
            e.category.as_deref().unwrap_or("?"),
            entries,
            roi * 100.0,
            impact,
            e.msg.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn cmd_replay(path: &Path) -> Result<()> {
    println!("=== Sequence Check ===\n");

    let mut last_seq: Option<u64> = None;
    let mut seq_gaps = 0u64;
    let mut audits = 0u64;
    for (_, entry) in parse_log_file(path)? {
        let Some(e) = entry else { continue };
        if let Some(prev) = last_seq {
            if e.seq <= prev {
                seq_gaps += 1;
            }
        }
        last_seq = Some(e.seq);
        if e.component == "audit" {
            audits += 1;
        }
    }

    println!("  Last seq: {}", last_seq.unwrap_or(0));
    println!("  Out-of-order entries: {}", seq_gaps);
    println!("  Audit entries: {}", audits);
    if seq_gaps == 0 {
        println!("\nok: sequence is monotonic");
    } else {
        println!("\nwarning: {} out-of-order entries", seq_gaps);
    }
    Ok(())
}

fn print_usage() {
    eprintln!("Usage: logparse <command> <file.jsonl> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  summary <file>              Summarize log file statistics");
    eprintln!("  filter <file> [options]     Filter and display log entries");
    eprintln!("  stages <file>               List committed stages");
    eprintln!("  replay <file>               Check sequence continuity");
    eprintln!();
    eprintln!("Filter options:");
    eprintln!("  --domain=<d1,d2,...>   Filter by domain(s)");
    eprintln!("  --level=<level>        Minimum log level");
    eprintln!("  --event=<e1,e2,...>    Filter by event name(s)");
    eprintln!("  --stage=<n>            Filter by stage index");
    eprintln!("  --json                 Output raw JSON lines");
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        print_usage();
        std::process::exit(1);
    }

    let cmd = &args[1];
    let path = PathBuf::from(&args[2]);
    if !path.exists() {
        bail!("file not found: {}", path.display());
    }

    match cmd.as_str() {
        "summary" => cmd_summary(&path),
        "filter" => {
            let mut filter = EntryFilter::default();
            let mut as_json = false;
            for arg in &args[3..] {
                if let Some(v) = arg.strip_prefix("--domain=") {
                    filter.domains = Some(split_list(v));
                } else if let Some(v) = arg.strip_prefix("--level=") {
                    filter.min_level = Some(v.to_string());
                } else if let Some(v) = arg.strip_prefix("--event=") {
                    filter.events = Some(split_list(v));
                } else if let Some(v) = arg.strip_prefix("--stage=") {
                    filter.stage = Some(v.parse().with_context(|| format!("bad stage: {}", v))?);
                } else if arg == "--json" {
                    as_json = true;
                } else {
                    bail!("unknown option: {}", arg);
                }
            }
            cmd_filter(&path, &filter, as_json)
        }
        "stages" => cmd_stages(&path),
        "replay" => cmd_replay(&path),
        _ => {
            print_usage();
            bail!("unknown command: {}", cmd);
        }
    }
}
