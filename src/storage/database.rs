use crate::error::{MerqaError, Result};
use crate::storage::migrations;
use crate::storage::{ProcessingRun, RunId, RunStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::time::Duration;
use std::path::Path;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const RUN_COLUMNS: &str =
    "id, record_id, status, started_at, finished_at, forced, total_score, category, error";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Record the start of a run for `record_id`.
    ///
    /// Fails with `AlreadyProcessing` while another run of the same record is
    /// in progress and younger than `stale_after`. The check and the insert
    /// share one write transaction, so concurrent processes serialize here.
    pub fn begin_run(
        &self,
        record_id: &str,
        forced: bool,
        stale_after: chrono::Duration,
    ) -> Result<ProcessingRun> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let now = Utc::now();
        let active = self
            .runs_for(record_id)?
            .into_iter()
            .filter(|run| run.status == RunStatus::Processing)
            .find(|run| !run.is_stale(stale_after, now));
        if let Some(run) = active {
            tracing::warn!(
                "Record {} already has run {} in progress since {}",
                record_id,
                run.id,
                run.started_at
            );
            return Err(MerqaError::AlreadyProcessing(record_id.to_string()));
        }

        let run = ProcessingRun::new(record_id, forced);
        tx.execute(
            "INSERT INTO runs (id, record_id, status, started_at, forced)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run.id.0,
                run.record_id,
                run.status.to_string(),
                run.started_at.to_rfc3339(),
                run.forced,
            ],
        )?;
        tx.commit()?;
        Ok(run)
    }

    pub fn complete_run(&self, id: &RunId, total_score: u32, category: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?2, finished_at = ?3, total_score = ?4, category = ?5
             WHERE id = ?1",
            params![
                id.0,
                RunStatus::Complete.to_string(),
                Utc::now().to_rfc3339(),
                total_score,
                category,
            ],
        )?;
        Ok(())
    }

    pub fn fail_run(&self, id: &RunId, error: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?2, finished_at = ?3, error = ?4 WHERE id = ?1",
            params![
                id.0,
                RunStatus::Failed.to_string(),
                Utc::now().to_rfc3339(),
                error,
            ],
        )?;
        Ok(())
    }

    pub fn get_run(&self, id: &RunId) -> Result<Option<ProcessingRun>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS))?;
        let run = stmt.query_row([&id.0], run_from_row).optional()?;
        Ok(run)
    }

    pub fn list_runs(&self, limit: usize) -> Result<Vec<ProcessingRun>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY started_at DESC LIMIT ?1",
            RUN_COLUMNS
        ))?;

        let runs = stmt
            .query_map([limit], run_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    /// Runs of one record, newest first.
    pub fn runs_for(&self, record_id: &str) -> Result<Vec<ProcessingRun>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs WHERE record_id = ?1 ORDER BY started_at DESC",
            RUN_COLUMNS
        ))?;

        let runs = stmt
            .query_map([record_id], run_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    /// Most recent completed run of a record.
    pub fn latest_completed_run(&self, record_id: &str) -> Result<Option<ProcessingRun>> {
        Ok(self
            .runs_for(record_id)?
            .into_iter()
            .find(|run| run.status == RunStatus::Complete))
    }
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<ProcessingRun> {
    Ok(ProcessingRun {
        id: RunId::from_string(row.get(0)?),
        record_id: row.get(1)?,
        status: parse_status(&row.get::<_, String>(2)?),
        started_at: parse_time(&row.get::<_, String>(3)?).unwrap_or_else(Utc::now),
        finished_at: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| parse_time(&s)),
        forced: row.get(5)?,
        total_score: row.get(6)?,
        category: row.get(7)?,
        error: row.get(8)?,
    })
}

fn parse_status(s: &str) -> RunStatus {
    match s {
        "processing" => RunStatus::Processing,
        "complete" => RunStatus::Complete,
        _ => RunStatus::Failed,
    }
}

trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(n: i64) -> chrono::Duration {
        chrono::Duration::hours(n)
    }

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_run_lifecycle() {
        let db = Database::open_in_memory().unwrap();

        let run = db.begin_run("R1", false, hours(6)).unwrap();
        let loaded = db.get_run(&run.id).unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Processing);
        assert_eq!(loaded.record_id, "R1");
        assert!(!loaded.forced);

        db.complete_run(&run.id, 1450, "Above Average").unwrap();
        let done = db.get_run(&run.id).unwrap().unwrap();
        assert_eq!(done.status, RunStatus::Complete);
        assert_eq!(done.total_score, Some(1450));
        assert_eq!(done.category.as_deref(), Some("Above Average"));
        assert!(done.finished_at.is_some());

        let latest = db.latest_completed_run("R1").unwrap().unwrap();
        assert_eq!(latest.id, run.id);
        assert!(db.latest_completed_run("R2").unwrap().is_none());
    }

    #[test]
    fn test_single_flight_per_record() {
        let db = Database::open_in_memory().unwrap();

        let first = db.begin_run("R1", false, hours(6)).unwrap();
        assert!(matches!(
            db.begin_run("R1", true, hours(6)),
            Err(MerqaError::AlreadyProcessing(id)) if id == "R1"
        ));
        // Other records are unaffected.
        assert!(db.begin_run("R2", false, hours(6)).is_ok());

        db.fail_run(&first.id, "analyzer unavailable").unwrap();
        let failed = db.get_run(&first.id).unwrap().unwrap();
        assert_eq!(failed.status, RunStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("analyzer unavailable"));

        assert!(db.begin_run("R1", false, hours(6)).is_ok());
    }

    #[test]
    fn test_concurrent_begin_waits_for_the_writer() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("merqa.db");
        let first = Database::open(&path).unwrap();
        let second = Database::open(&path).unwrap();

        // Another process is midway through starting a run of R1.
        first.conn.execute_batch("BEGIN IMMEDIATE").unwrap();
        first
            .conn
            .execute(
                "INSERT INTO runs (id, record_id, status, started_at) VALUES ('a', 'R1', 'processing', ?1)",
                [Utc::now().to_rfc3339()],
            )
            .unwrap();

        let contender = std::thread::spawn(move || second.begin_run("R1", false, hours(6)));
        std::thread::sleep(std::time::Duration::from_millis(200));
        first.conn.execute_batch("COMMIT").unwrap();

        let result = contender.join().unwrap();
        assert!(matches!(result, Err(MerqaError::AlreadyProcessing(id)) if id == "R1"));
        assert_eq!(first.runs_for("R1").unwrap().len(), 1);
    }

    #[test]
    fn test_stale_run_does_not_block() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO runs (id, record_id, status, started_at) VALUES ('old', 'R1', 'processing', ?1)",
                [(Utc::now() - hours(12)).to_rfc3339()],
            )
            .unwrap();

        assert!(db.begin_run("R1", false, hours(6)).is_ok());
        assert_eq!(db.runs_for("R1").unwrap().len(), 2);
    }

    #[test]
    fn test_list_runs_newest_first() {
        let db = Database::open_in_memory().unwrap();
        for (id, started) in [("a", 3), ("b", 1), ("c", 2)] {
            db.conn
                .execute(
                    "INSERT INTO runs (id, record_id, status, started_at) VALUES (?1, ?1, 'complete', ?2)",
                    params![id, (Utc::now() - hours(started)).to_rfc3339()],
                )
                .unwrap();
        }
        let ids: Vec<String> = db.list_runs(2).unwrap().into_iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }
}
