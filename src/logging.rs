//! Structured logging for filter-search runs.
//!
//! Every record is one JSON line carrying the run id, a sequence number, the
//! level, the component (domain) and an event name, so a run can be replayed
//! stage by stage from `events.jsonl` alone.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use crate::data::DatasetSummary;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Data,      // Loading, normalization
    Scope,     // Initial tournament/championship/tip selection
    Search,    // Controller loop, stage commits, termination
    Candidate, // Per-category candidate generation
    Report,    // Rendered artifacts
    Storage,   // Run persistence
    System,    // Startup, configuration
    Profile,   // Timing
    Audit,     // Replay trail
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Data => "data",
            Domain::Scope => "scope",
            Domain::Search => "search",
            Domain::Candidate => "candidate",
            Domain::Report => "report",
            Domain::Storage => "storage",
            Domain::System => "system",
            Domain::Profile => "profile",
            Domain::Audit => "audit",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS: comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static PROFILE_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Option<Mutex<BufWriter<File>>>,
    trace: Option<Mutex<BufWriter<File>>>,
}

fn open_log(path: PathBuf) -> Option<Mutex<BufWriter<File>>> {
    match File::create(&path) {
        Ok(f) => Some(Mutex::new(BufWriter::new(f))),
        Err(err) => {
            eprintln!("[log] failed to create {}: {}", path.display(), err);
            None
        }
    }
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let base = std::env::var("LOG_DIR").unwrap_or_else(|_| "out/runs".to_string());
        let mut run_dir = PathBuf::from(base);
        run_dir.push(&run_id);
        if let Err(err) = create_dir_all(&run_dir) {
            eprintln!("[log] failed to create run dir: {}", err);
        }

        let _ = std::fs::write(
            run_dir.join("manifest.json"),
            json!({
                "run_id": run_id,
                "ts": ts_now(),
                "pid": process::id(),
                "log_dir": run_dir.to_string_lossy(),
            })
            .to_string(),
        );

        RunContext {
            events: open_log(run_dir.join("events.jsonl")),
            trace: open_log(run_dir.join("trace.jsonl")),
            run_id,
        }
    })
}

/// Identifier of the current process-wide run.
pub fn run_id() -> String {
    ensure_run_context().run_id.clone()
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["stage", "iteration", "category", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(writer: &Option<Mutex<BufWriter<File>>>, line: &str) {
    if let Some(Ok(mut w)) = writer.as_ref().map(|m| m.lock()) {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds (for replay correlation)
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let min_level = Level::from_env();
    if level < min_level || !domain.is_enabled() {
        return;
    }
    emit_record(level, domain.as_str(), event, fields);
}

fn emit_record(level: Level, component: &str, event: &str, fields: Map<String, Value>) {
    let ctx = ensure_run_context();
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));

    let line = Value::Object(entry).to_string();
    match level {
        Level::Trace | Level::Debug => write_line(&ctx.trace, &line),
        _ => write_line(&ctx.events, &line),
    }
    // stdout carries the reports
    eprintln!("{}", line);
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_table_read(path: &str, records: usize, columns: usize) {
    log(
        Level::Debug,
        Domain::Data,
        "table_read",
        obj(&[
            ("path", v_str(path)),
            ("records", json!(records)),
            ("columns", json!(columns)),
        ]),
    );
}

pub fn log_dataset_loaded(path: &str, summary: &DatasetSummary) {
    log(
        Level::Info,
        Domain::Data,
        "dataset_loaded",
        obj(&[
            ("path", v_str(path)),
            ("rows", json!(summary.rows)),
            ("undefined_win_rate_1", json!(summary.undefined_win_rate_1)),
            ("undefined_win_rate_2", json!(summary.undefined_win_rate_2)),
            ("undefined_score_diff", json!(summary.undefined_score_diff)),
            ("has_teams", json!(summary.schema.has_teams)),
            ("has_side_labels", json!(summary.schema.has_side_labels)),
            ("has_score", json!(summary.schema.has_score)),
        ]),
    );
}

pub fn log_scope_applied(scope: &str, before: usize, after: usize) {
    log(
        Level::Info,
        Domain::Scope,
        "scope_applied",
        obj(&[
            ("scope", v_str(scope)),
            ("rows_before", json!(before)),
            ("rows_after", json!(after)),
        ]),
    );
}

pub fn log_search_start(rows: usize, roi: f64, floor: f64, params_hash: &str) {
    log(
        Level::Info,
        Domain::Search,
        "search_start",
        obj(&[
            ("rows", json!(rows)),
            ("roi", v_num(roi)),
            ("floor", v_num(floor)),
            ("params_hash", v_str(params_hash)),
        ]),
    );
}

pub fn log_candidate_pass(iteration: usize, generated: usize, best_impact: Option<f64>) {
    log(
        Level::Debug,
        Domain::Candidate,
        "candidate_pass",
        obj(&[
            ("iteration", json!(iteration)),
            ("generated", json!(generated)),
            ("best_impact", best_impact.map(v_num).unwrap_or(Value::Null)),
        ]),
    );
}

pub fn log_provider_skipped(iteration: usize, category: &str, reason: &str) {
    log(
        Level::Warn,
        Domain::Candidate,
        "provider_skipped",
        obj(&[
            ("iteration", json!(iteration)),
            ("category", v_str(category)),
            ("reason", v_str(reason)),
        ]),
    );
}

pub fn log_stage_commit(
    stage: usize,
    iteration: usize,
    category: &str,
    description: &str,
    entries: usize,
    roi: f64,
    impact: f64,
) {
    log(
        Level::Info,
        Domain::Search,
        "stage_commit",
        obj(&[
            ("stage", json!(stage)),
            ("iteration", json!(iteration)),
            ("category", v_str(category)),
            ("msg", v_str(description)),
            ("entries", json!(entries)),
            ("roi", v_num(roi)),
            ("impact", v_num(impact)),
        ]),
    );
}

pub fn log_search_finished(
    stages: usize,
    best_stage: usize,
    best_roi: f64,
    termination: &str,
    iterations: usize,
) {
    log(
        Level::Info,
        Domain::Search,
        "search_finished",
        obj(&[
            ("stages", json!(stages)),
            ("best_stage", json!(best_stage)),
            ("best_roi", v_num(best_roi)),
            ("termination", v_str(termination)),
            ("iterations", json!(iterations)),
        ]),
    );
}

pub fn log_config_fallback(path: &str, reason: &str) {
    log(
        Level::Warn,
        Domain::System,
        "config_fallback",
        obj(&[("path", v_str(path)), ("reason", v_str(reason))]),
    );
}

pub fn log_report_written(kind: &str, path: &str, stage: usize) {
    log(
        Level::Info,
        Domain::Report,
        "report_written",
        obj(&[
            ("kind", v_str(kind)),
            ("path", v_str(path)),
            ("stage", json!(stage)),
        ]),
    );
}

pub fn log_run_persisted(run_id: &str, stages: usize, dataset_hash: &str) {
    log(
        Level::Info,
        Domain::Storage,
        "run_persisted",
        obj(&[
            ("persisted_run", v_str(run_id)),
            ("stages", json!(stages)),
            ("dataset_hash", v_str(dataset_hash)),
        ]),
    );
}

/// Log an audit entry for replay verification
pub fn log_audit(event_type: &str, config_hash: &str, input_hash: &str, output_hash: &str) {
    log(
        Level::Info,
        Domain::Audit,
        event_type,
        obj(&[
            ("config_hash", v_str(config_hash)),
            ("input_hash", v_str(input_hash)),
            ("output_hash", v_str(output_hash)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn params_hash(input: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut h = std::collections::hash_map::DefaultHasher::new();
    input.hash(&mut h);
    format!("{:x}", h.finish())
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    // Non-finite numbers (empty-dataset ROI) have no JSON form.
    if n.is_finite() {
        json!(n)
    } else {
        Value::String(n.to_string())
    }
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Profiling scope that emits structured timing on drop.
pub struct ProfileScope {
    label: &'static str,
    context: Option<Map<String, Value>>,
    started: Instant,
    enabled: bool,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self::with_context(label, &[])
    }

    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        let enabled = Self::should_sample();
        Self {
            label,
            context: if enabled { Some(obj(fields)) } else { None },
            started: Instant::now(),
            enabled,
        }
    }

    fn should_sample() -> bool {
        std::env::var("PROFILE_SAMPLE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .map(|p| {
                if p >= 1.0 {
                    true
                } else if p <= 0.0 {
                    false
                } else {
                    let seq = PROFILE_SEQ.fetch_add(1, Ordering::SeqCst);
                    let bucket = (seq % 10_000) as f64 / 10_000.0;
                    bucket < p
                }
            })
            .unwrap_or(true)
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = self.context.take().unwrap_or_default();
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

// =============================================================================
// Tests
// =============================================================================
