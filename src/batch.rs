use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::clip::ClipRecord;
use crate::error::{CaptionerError, Result};
use crate::fingerprint::fingerprint_file;
use crate::pipeline::{ClipReport, Pipeline};
use crate::report::{batch_summary, print_clip_table};
use crate::store::ClipStore;

/// Files dropped by desktop environments that are never media inputs
const OS_METADATA_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

pub fn is_os_metadata(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    OS_METADATA_FILES.contains(&name) || name.starts_with("._")
}

/// Input files under `path`, sorted by name.
///
/// A directory contributes its direct children only. A plain file is a list of one.
pub fn list_inputs<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(CaptionerError::Validation(format!(
            "{} is not a file or directory",
            path.display()
        )));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(CaptionerError::Validation(format!(
                    "cannot list {}: {}",
                    path.display(),
                    e
                )));
            }
            Err(e) => {
                // Dangling links and unreadable entries are not inputs.
                warn!("Ignoring entry in {}: {}", path.display(), e);
                continue;
            }
        };
        if entry.file_type().is_file() && !is_os_metadata(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Outcome of a whole batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Clips that reached the pipeline, in processing order
    pub clips: Vec<(ClipRecord, ClipReport)>,
    /// Audio files that never got a record, with the reason
    pub rejected: Vec<(PathBuf, CaptionerError)>,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.clips.iter().filter(|(_, report)| report.is_done()).count()
    }

    pub fn failed(&self) -> usize {
        self.clips.iter().filter(|(_, report)| report.is_failed()).count() + self.rejected.len()
    }
}

/// Pairs every audio input with a random video and pushes each pair through the pipeline
pub struct BatchDriver<'a, R: Rng> {
    pipeline: Pipeline<'a>,
    store: &'a dyn ClipStore,
    rng: R,
}

impl<'a, R: Rng> BatchDriver<'a, R> {
    pub fn new(pipeline: Pipeline<'a>, store: &'a dyn ClipStore, rng: R) -> Self {
        Self {
            pipeline,
            store,
            rng,
        }
    }

    /// Process every audio file under `audio_path`.
    ///
    /// Only input validation fails the call. Per-clip failures, including unreadable audio,
    /// are logged and collected in the report while the batch moves on.
    pub async fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        audio_path: P,
        video_path: Q,
    ) -> Result<BatchReport> {
        let audio_files = list_inputs(audio_path.as_ref())?;
        let video_files = list_inputs(video_path.as_ref())?;
        if video_files.is_empty() {
            return Err(CaptionerError::Validation(format!(
                "no video files found in {}",
                video_path.as_ref().display()
            )));
        }

        let output_dir = self.pipeline.options().output_dir.clone();
        fs::create_dir_all(&output_dir).await?;

        info!(
            "Found {} audio files and {} video candidates",
            audio_files.len(),
            video_files.len()
        );

        let mut report = BatchReport::default();
        for (index, audio) in audio_files.iter().enumerate() {
            info!("Clip {}/{}: {}", index + 1, audio_files.len(), audio.display());
            match self.process_clip(audio, &video_files).await {
                Ok((record, clip_report)) => {
                    print_clip_table(&record);
                    if let Some(e) = &clip_report.error {
                        warn!("Clip {} stopped: {}", audio.display(), e);
                    } else {
                        info!("Clip {} is {}", audio.display(), clip_report.state);
                    }
                    report.clips.push((record, clip_report));
                }
                Err(e) => {
                    warn!("Skipping {}: {}", audio.display(), e);
                    report.rejected.push((audio.clone(), e));
                }
            }
        }

        println!("\n{}", batch_summary(&report.clips));
        info!(
            "Batch finished: {} done, {} failed, {} total",
            report.completed(),
            report.failed(),
            audio_files.len()
        );
        Ok(report)
    }

    async fn process_clip(
        &mut self,
        audio: &Path,
        video_files: &[PathBuf],
    ) -> Result<(ClipRecord, ClipReport)> {
        let fingerprint = fingerprint_file(audio)?;
        let video = video_files
            .choose(&mut self.rng)
            .ok_or_else(|| CaptionerError::Validation("no video candidates".to_string()))?;

        let mut record = self
            .store
            .get_or_create_by_fingerprint(&fingerprint, audio, video)?;
        if record.video_path != *video {
            info!(
                "Keeping stored video pairing {} for {}",
                record.video_path.display(),
                audio.display()
            );
        }

        let clip_report = self.pipeline.advance(&mut record).await;
        Ok((record, clip_report))
    }
}
