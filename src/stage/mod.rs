// External processing stages
//
// Each stage is an opaque executable that turns input files into one output artifact:
// - Transcribe: audio -> captions (.ass)
// - BurnCaptions: captions + video + audio -> captioned video
// - TrimAndFade: captioned video -> final trimmed clip
//
// The command module builds and runs the process; the script module maps jobs onto the
// fixed argument lists the stage executables expect.

pub mod command;
pub mod script;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub use command::*;
pub use script::*;

use crate::error::{CaptionerError, Result};

/// One of the three pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transcribe,
    BurnCaptions,
    TrimAndFade,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Transcribe, Stage::BurnCaptions, Stage::TrimAndFade];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Transcribe => "transcribe",
            Stage::BurnCaptions => "burn-captions",
            Stage::TrimAndFade => "trim-and-fade",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Clip window in whole seconds of the source audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: u32,
    pub end: u32,
}

impl TimeWindow {
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if end <= start {
            return Err(CaptionerError::Validation(format!(
                "end time {} must be after start time {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> u32 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscribeJob {
    pub audio_path: PathBuf,
    pub output_dir: PathBuf,
    pub model: String,
    pub window: TimeWindow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BurnJob {
    pub captions_path: PathBuf,
    pub video_path: PathBuf,
    pub audio_path: PathBuf,
    pub output_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub window: TimeWindow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrimJob {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub start_offset: u32,
    pub duration: u32,
    pub fade_duration: u32,
}

/// Runs the external stages. Implementations pick the output file name and never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Generate a caption file for the audio window; returns the caption path.
    async fn transcribe(&self, job: &TranscribeJob) -> Result<PathBuf>;

    /// Burn captions onto the video with the audio laid over it; returns the video path.
    async fn burn_captions(&self, job: &BurnJob) -> Result<PathBuf>;

    /// Trim the burned video and fade it out; returns the final clip path.
    async fn trim_and_fade(&self, job: &TrimJob) -> Result<PathBuf>;
}
