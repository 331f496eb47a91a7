// Clip progress persistence
//
// The pipeline only needs four operations from storage: get-or-create by fingerprint,
// update by identity, soft delete by identity and lookup by identity. SQLite is the
// shipped backend.

pub mod sqlite;

use std::path::Path;

pub use sqlite::SqliteClipStore;

use crate::clip::{ClipRecord, Fingerprint};
use crate::error::Result;

/// Durable mapping from audio fingerprint to clip progress
pub trait ClipStore: Send + Sync {
    /// Return the active record for `fingerprint`, creating one with the given input paths
    /// when none exists. An existing record is returned unchanged: the paths passed in are
    /// only used for a new record.
    fn get_or_create_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
        audio_path: &Path,
        video_path: &Path,
    ) -> Result<ClipRecord>;

    /// Persist input paths and stage outputs of an active record.
    fn update(&self, record: &ClipRecord) -> Result<ClipRecord>;

    /// Retire a record. It stops matching fingerprint lookups but stays readable by id.
    fn soft_delete(&self, id: i64) -> Result<()>;

    /// Fetch a record by identity, including soft-deleted ones.
    fn get_by_id(&self, id: i64) -> Result<ClipRecord>;

    /// List records, oldest first.
    fn list(&self, include_deleted: bool) -> Result<Vec<ClipRecord>>;
}
