use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::stage::Stage;

/// Content-derived identity of a source audio file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new<S: Into<String>>(digest: S) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output of one pipeline stage as recorded on a clip
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "path", rename_all = "snake_case")]
pub enum StageOutput {
    #[default]
    NotStarted,
    Produced(PathBuf),
}

impl StageOutput {
    /// Build from a stored nullable column; empty paths count as not started.
    pub fn from_optional(path: Option<String>) -> Self {
        match path {
            Some(p) if !p.is_empty() => Self::Produced(PathBuf::from(p)),
            _ => Self::NotStarted,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Produced(path) => Some(path.as_path()),
            Self::NotStarted => None,
        }
    }

    /// A stage is satisfied only when it names a non-empty path that exists on disk right now.
    pub fn is_satisfied(&self) -> bool {
        match self {
            Self::Produced(path) => !path.as_os_str().is_empty() && path.exists(),
            Self::NotStarted => false,
        }
    }

    pub fn to_column(&self) -> Option<String> {
        self.path().map(|p| p.to_string_lossy().into_owned())
    }
}

/// Lifecycle of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecordStatus {
    Active,
    Deleted { at: DateTime<Utc> },
}

impl RecordStatus {
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            Some(at) => Self::Deleted { at },
            None => Self::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Progress record for one clip: the source audio, its paired video and every artifact
/// produced from them so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRecord {
    id: Option<i64>,
    fingerprint: Option<Fingerprint>,
    pub audio_path: PathBuf,
    pub video_path: PathBuf,
    pub captions: StageOutput,
    pub burned_video: StageOutput,
    pub trimmed_video: StageOutput,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: RecordStatus,
}

impl ClipRecord {
    /// An in-memory record that has not been persisted yet.
    pub fn transient<P: Into<PathBuf>, Q: Into<PathBuf>>(audio_path: P, video_path: Q) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            fingerprint: None,
            audio_path: audio_path.into(),
            video_path: video_path.into(),
            captions: StageOutput::NotStarted,
            burned_video: StageOutput::NotStarted,
            trimmed_video: StageOutput::NotStarted,
            created_at: now,
            updated_at: now,
            status: RecordStatus::Active,
        }
    }

    /// Attach the storage identity. Only stores construct persisted records.
    pub(crate) fn persisted(mut self, id: i64, fingerprint: Fingerprint) -> Self {
        self.id = Some(id);
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn output(&self, stage: Stage) -> &StageOutput {
        match stage {
            Stage::Transcribe => &self.captions,
            Stage::BurnCaptions => &self.burned_video,
            Stage::TrimAndFade => &self.trimmed_video,
        }
    }

    fn output_mut(&mut self, stage: Stage) -> &mut StageOutput {
        match stage {
            Stage::Transcribe => &mut self.captions,
            Stage::BurnCaptions => &mut self.burned_video,
            Stage::TrimAndFade => &mut self.trimmed_video,
        }
    }

    /// Record a fresh artifact for `stage`. Outputs of later stages were built from the
    /// previous artifact, so they are cleared.
    pub fn record_output(&mut self, stage: Stage, path: PathBuf) {
        *self.output_mut(stage) = StageOutput::Produced(path);
        for later in Stage::ALL.into_iter().filter(|s| *s > stage) {
            *self.output_mut(later) = StageOutput::NotStarted;
        }
    }
}
