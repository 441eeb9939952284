use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::filter::FilterConfig;
use crate::logging;
use crate::search::SearchOutcome;

/// SQLite record of finished searches.
pub struct RunStore {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRun {
    pub run_id: String,
    pub created: String,
    pub dataset_hash: String,
    pub scope: String,
    pub target_roi_pct: Option<f64>,
    pub floor: f64,
    pub termination: String,
    pub best_stage: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredStage {
    pub index: usize,
    pub iteration: usize,
    pub description: String,
    pub entries: usize,
    pub profit: f64,
    pub roi: f64,
    pub config: FilterConfig,
}

impl RunStore {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self { conn: Connection::open(path)? })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS runs (
                run_id TEXT PRIMARY KEY,
                created TEXT NOT NULL,
                dataset_hash TEXT NOT NULL,
                scope TEXT NOT NULL,
                target_roi_pct REAL,
                floor REAL NOT NULL,
                termination TEXT NOT NULL,
                best_stage INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS stages (
                run_id TEXT NOT NULL,
                stage_index INTEGER NOT NULL,
                iteration INTEGER NOT NULL,
                description TEXT NOT NULL,
                entries INTEGER NOT NULL,
                profit REAL NOT NULL,
                roi REAL NOT NULL,
                config TEXT NOT NULL,
                PRIMARY KEY (run_id, stage_index)
            );
            COMMIT;",
        )?;
        Ok(())
    }

    /// Write the run and every stage in one transaction. Re-persisting a run
    /// id replaces it.
    pub fn persist(&mut self, run_id: &str, outcome: &SearchOutcome, dataset_hash: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM stages WHERE run_id = ?1", params![run_id])?;
        tx.execute(
            "INSERT OR REPLACE INTO runs
             (run_id, created, dataset_hash, scope, target_roi_pct, floor, termination, best_stage)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run_id,
                logging::ts_now(),
                dataset_hash,
                outcome.scope.to_string(),
                outcome.target_roi_pct,
                outcome.floor,
                outcome.termination.as_str(),
                outcome.history.best_index() as i64
            ],
        )?;
        for stage in outcome.stages() {
            let config = serde_json::to_string(&stage.config).context("serialize stage config")?;
            tx.execute(
                "INSERT INTO stages (run_id, stage_index, iteration, description, entries, profit, roi, config)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    run_id,
                    stage.index as i64,
                    stage.iteration as i64,
                    stage.description,
                    stage.entries as i64,
                    stage.profit,
                    stage.roi,
                    config
                ],
            )?;
        }
        tx.commit()?;
        logging::log_run_persisted(run_id, outcome.history.len(), dataset_hash);
        Ok(())
    }

    pub fn load_run(&self, run_id: &str) -> Result<Option<StoredRun>> {
        let run = self
            .conn
            .query_row(
                "SELECT run_id, created, dataset_hash, scope, target_roi_pct, floor, termination, best_stage
                 FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok(StoredRun {
                        run_id: row.get(0)?,
                        created: row.get(1)?,
                        dataset_hash: row.get(2)?,
                        scope: row.get(3)?,
                        target_roi_pct: row.get(4)?,
                        floor: row.get(5)?,
                        termination: row.get(6)?,
                        best_stage: row.get::<_, i64>(7)? as usize,
                    })
                },
            )
            .optional()?;
        Ok(run)
    }

    /// Stages of a run in index order.
    pub fn load_stages(&self, run_id: &str) -> Result<Vec<StoredStage>> {
        let mut stmt = self.conn.prepare(
            "SELECT stage_index, iteration, description, entries, profit, roi, config
             FROM stages WHERE run_id = ?1 ORDER BY stage_index",
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (index, iteration, description, entries, profit, roi, config) = row?;
            out.push(StoredStage {
                index: index as usize,
                iteration: iteration as usize,
                description,
                entries: entries as usize,
                profit,
                roi,
                config: serde_json::from_str(&config)
                    .with_context(|| format!("stage {} config of run {}", index, run_id))?,
            });
        }
        Ok(out)
    }
}
