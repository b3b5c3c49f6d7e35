//! libSQL-backed run-status store.
//!
//! The [`StatusStore`] keeps one row per pipeline run: its title, the latest
//! human-readable status label, the root page once it exists, and an expiry
//! after which the run is no longer reported. Writes come from the event-bus
//! subscriber in `wikiforge-core`; reads come from the CLI.

mod migrations;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use libsql::{Connection, Database, params};
use serde::Serialize;
use wikiforge_shared::{Result, WikiForgeError};

/// One stored run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRecord {
    pub id: String,
    pub title: String,
    pub status: String,
    pub page_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Status database handle.
pub struct StatusStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

fn storage_err(e: impl std::fmt::Display) -> WikiForgeError {
    WikiForgeError::Storage(e.to_string())
}

impl StatusStore {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WikiForgeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        WikiForgeError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0,
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a run or replace its title and status.
    pub async fn upsert_status(&self, id: &str, title: &str, status: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO generations (id, title, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                   title = excluded.title,
                   status = excluded.status,
                   updated_at = excluded.updated_at",
                params![id, title, status, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Record the root page of a run.
    pub async fn set_page(&self, id: &str, page_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE generations SET page_id = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, page_id, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Set the run to expire `ttl` from now, unless an expiry is already set.
    ///
    /// Returns whether the expiry was set.
    pub async fn touch_expiry(&self, id: &str, ttl: Duration) -> Result<bool> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires = Utc::now().timestamp_millis().saturating_add(ttl_ms);
        let changed = self
            .conn
            .execute(
                "UPDATE generations SET expires_at = ?2 WHERE id = ?1 AND expires_at IS NULL",
                params![id, expires],
            )
            .await
            .map_err(storage_err)?;
        Ok(changed > 0)
    }

    /// Remove every expired run, returning how many were removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let now = Utc::now().timestamp_millis();
        let removed = self
            .conn
            .execute(
                "DELETE FROM generations WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![now],
            )
            .await
            .map_err(storage_err)?;
        if removed > 0 {
            tracing::info!(removed, "purged expired runs");
        }
        Ok(removed)
    }

    /// Delete one run. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM generations WHERE id = ?1", params![id])
            .await
            .map_err(storage_err)?;
        Ok(removed > 0)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Look up a run. Expired runs are reported as absent.
    pub async fn get(&self, id: &str) -> Result<Option<GenerationRecord>> {
        let now = Utc::now().timestamp_millis();
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, status, page_id, created_at, updated_at, expires_at
                 FROM generations
                 WHERE id = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![id, now],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// All live runs, newest first.
    pub async fn list(&self) -> Result<Vec<GenerationRecord>> {
        let now = Utc::now().timestamp_millis();
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, status, page_id, created_at, updated_at, expires_at
                 FROM generations
                 WHERE expires_at IS NULL OR expires_at > ?1
                 ORDER BY created_at DESC, id DESC",
                params![now],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_record(&row)?);
        }
        Ok(results)
    }
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| WikiForgeError::Storage(format!("invalid date: {e}")))
}

fn row_to_record(row: &libsql::Row) -> Result<GenerationRecord> {
    let created: String = row.get(4).map_err(storage_err)?;
    let updated: String = row.get(5).map_err(storage_err)?;
    Ok(GenerationRecord {
        id: row.get::<String>(0).map_err(storage_err)?,
        title: row.get::<String>(1).map_err(storage_err)?,
        status: row.get::<String>(2).map_err(storage_err)?,
        page_id: row.get::<String>(3).ok(),
        created_at: parse_time(&created)?,
        updated_at: parse_time(&updated)?,
        expires_at: row
            .get::<i64>(6)
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
    })
}
