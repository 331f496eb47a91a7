use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::ClipStore;
use crate::clip::{ClipRecord, Fingerprint, RecordStatus, StageOutput};
use crate::error::{CaptionerError, Result};

const CURRENT_SCHEMA_VERSION: i32 = 1;

const CLIP_COLUMNS: &str = "id, hash, audio_path, video_path, gen_captions_path, \
    gen_raw_video_path, gen_trimmed_video_path, created_at, updated_at, deleted_at";

/// SQLite-backed clip store
pub struct SqliteClipStore {
    conn: Mutex<Connection>,
}

impl SqliteClipStore {
    /// Open (or create) the database file and bring its schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!("Opening clip database: {}", path.display());
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", ())?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL,
                updated TEXT NOT NULL,
                PRIMARY KEY (version)
            )",
            (),
        )?;

        let version = match conn.query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        ) {
            Ok(v) => v,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                conn.execute(
                    "INSERT INTO schema_version (version, updated) VALUES (0, datetime('now'))",
                    [],
                )?;
                0
            }
            Err(e) => return Err(e.into()),
        };

        if version < CURRENT_SCHEMA_VERSION {
            Self::migrate_schema(conn, version)?;
        }

        Ok(())
    }

    fn migrate_schema(conn: &Connection, from_version: i32) -> Result<()> {
        debug!("Migrating clip schema from version {}", from_version);
        if from_version == 0 {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS clips (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    hash TEXT NOT NULL,
                    audio_path TEXT NOT NULL,
                    video_path TEXT NOT NULL,
                    gen_captions_path TEXT,
                    gen_raw_video_path TEXT,
                    gen_trimmed_video_path TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    deleted_at TEXT
                )",
                (),
            )?;

            // One live record per fingerprint; retired rows may share it.
            conn.execute(
                "CREATE UNIQUE INDEX IF NOT EXISTS clips_active_hash
                    ON clips (hash) WHERE deleted_at IS NULL",
                (),
            )?;

            conn.execute(
                "INSERT INTO schema_version (version, updated) VALUES (1, datetime('now'))",
                [],
            )?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn find_active(conn: &Connection, fingerprint: &Fingerprint) -> Result<Option<ClipRecord>> {
        let sql = format!(
            "SELECT {} FROM clips WHERE hash = ?1 AND deleted_at IS NULL",
            CLIP_COLUMNS
        );
        Ok(conn
            .query_row(&sql, [fingerprint.as_str()], row_to_record)
            .optional()?)
    }

    fn find_by_id(conn: &Connection, id: i64) -> Result<Option<ClipRecord>> {
        let sql = format!("SELECT {} FROM clips WHERE id = ?1", CLIP_COLUMNS);
        Ok(conn.query_row(&sql, [id], row_to_record).optional()?)
    }
}

fn path_column(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ClipRecord> {
    let id: i64 = row.get("id")?;
    let hash: String = row.get("hash")?;
    let audio_path: String = row.get("audio_path")?;
    let video_path: String = row.get("video_path")?;
    let deleted_at: Option<DateTime<Utc>> = row.get("deleted_at")?;

    let mut record = ClipRecord::transient(audio_path, video_path);
    record.captions = StageOutput::from_optional(row.get("gen_captions_path")?);
    record.burned_video = StageOutput::from_optional(row.get("gen_raw_video_path")?);
    record.trimmed_video = StageOutput::from_optional(row.get("gen_trimmed_video_path")?);
    record.created_at = row.get("created_at")?;
    record.updated_at = row.get("updated_at")?;
    record.status = RecordStatus::from_deleted_at(deleted_at);

    Ok(record.persisted(id, Fingerprint::new(hash)))
}

impl ClipStore for SqliteClipStore {
    fn get_or_create_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
        audio_path: &Path,
        video_path: &Path,
    ) -> Result<ClipRecord> {
        let mut conn = self.lock();

        if let Some(existing) = Self::find_active(&conn, fingerprint)? {
            debug!("Found clip {} for fingerprint {}", existing.id().unwrap_or_default(), fingerprint);
            return Ok(existing);
        }

        let tx = conn.transaction()?;
        let now = Utc::now();
        tx.execute(
            "INSERT INTO clips (hash, audio_path, video_path, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?4)",
            params![fingerprint.as_str(), path_column(audio_path), path_column(video_path), now],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!("Created clip {} for {}", id, audio_path.display());
        Self::find_by_id(&conn, id)?
            .ok_or_else(|| CaptionerError::NotFound(format!("clip {} vanished after insert", id)))
    }

    fn update(&self, record: &ClipRecord) -> Result<ClipRecord> {
        let id = record
            .id()
            .ok_or_else(|| CaptionerError::NotFound("clip record has not been persisted".to_string()))?;

        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE clips
                SET audio_path = ?1,
                    video_path = ?2,
                    gen_captions_path = ?3,
                    gen_raw_video_path = ?4,
                    gen_trimmed_video_path = ?5,
                    updated_at = ?6
              WHERE id = ?7 AND deleted_at IS NULL",
            params![
                path_column(&record.audio_path),
                path_column(&record.video_path),
                record.captions.to_column(),
                record.burned_video.to_column(),
                record.trimmed_video.to_column(),
                Utc::now(),
                id,
            ],
        )?;

        if changed == 0 {
            return Err(CaptionerError::NotFound(format!("active clip {}", id)));
        }

        debug!("Updated clip {}", id);
        Self::find_by_id(&conn, id)?.ok_or_else(|| CaptionerError::NotFound(format!("clip {}", id)))
    }

    fn soft_delete(&self, id: i64) -> Result<()> {
        let conn = self.lock();
        let existing = Self::find_by_id(&conn, id)?
            .ok_or_else(|| CaptionerError::NotFound(format!("clip {}", id)))?;

        if !existing.status.is_active() {
            debug!("Clip {} is already deleted", id);
            return Ok(());
        }

        let now = Utc::now();
        conn.execute(
            "UPDATE clips SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;

        info!("Soft-deleted clip {}", id);
        Ok(())
    }

    fn get_by_id(&self, id: i64) -> Result<ClipRecord> {
        let conn = self.lock();
        Self::find_by_id(&conn, id)?.ok_or_else(|| CaptionerError::NotFound(format!("clip {}", id)))
    }

    fn list(&self, include_deleted: bool) -> Result<Vec<ClipRecord>> {
        let conn = self.lock();
        let filter = if include_deleted { "" } else { " WHERE deleted_at IS NULL" };
        let sql = format!("SELECT {} FROM clips{} ORDER BY id", CLIP_COLUMNS, filter);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_record)?;
        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }
}
