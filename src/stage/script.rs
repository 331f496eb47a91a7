use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{BurnJob, Stage, StageCommand, StageRunner, TranscribeJob, TrimJob};
use crate::config::ScriptsConfig;
use crate::error::{CaptionerError, Result};

/// Runs each stage as a separate executable with the fixed argument list it expects
pub struct ScriptStageRunner {
    config: ScriptsConfig,
    verbose: bool,
}

impl ScriptStageRunner {
    pub fn new(config: ScriptsConfig, verbose: bool) -> Self {
        Self { config, verbose }
    }

    fn command(&self, stage: Stage) -> Result<StageCommand> {
        let command_line = match stage {
            Stage::Transcribe => &self.config.transcribe,
            Stage::BurnCaptions => &self.config.burn_captions,
            Stage::TrimAndFade => &self.config.trim_and_fade,
        };

        Ok(StageCommand::from_command_line(command_line, stage)?
            .verbose(self.verbose)
            .timeout(self.config.timeout()))
    }
}

/// Timestamped artifact path in `output_dir`, e.g. `1718000000-trim.mp4`.
///
/// Two artifacts requested within the same second get a numeric suffix instead of
/// overwriting each other.
pub fn artifact_path(output_dir: &Path, suffix: &str) -> PathBuf {
    let stamp = Utc::now().timestamp();
    let candidate = output_dir.join(format!("{}{}", stamp, suffix));
    if !candidate.exists() {
        return candidate;
    }

    (1u32..)
        .map(|n| output_dir.join(format!("{}-{}{}", stamp, n, suffix)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

#[async_trait]
impl StageRunner for ScriptStageRunner {
    async fn transcribe(&self, job: &TranscribeJob) -> Result<PathBuf> {
        let output = artifact_path(&job.output_dir, ".ass");
        info!("Generating captions for {} -> {}", job.audio_path.display(), output.display());

        self.command(Stage::Transcribe)?
            .path(&job.audio_path)
            .path(&output)
            .option("model", &job.model)
            .option("start", job.window.start)
            .option("end", job.window.end)
            .execute()
            .await?;

        Ok(output)
    }

    async fn burn_captions(&self, job: &BurnJob) -> Result<PathBuf> {
        if job.captions_path.as_os_str().is_empty() {
            return Err(CaptionerError::Precondition(
                "burning requires a captions file".to_string(),
            ));
        }

        let output = artifact_path(&job.output_dir, "-captions.mp4");
        info!(
            "Burning {} onto {} -> {}",
            job.captions_path.display(),
            job.video_path.display(),
            output.display()
        );

        self.command(Stage::BurnCaptions)?
            .path(&job.captions_path)
            .path(&job.video_path)
            .path(&job.audio_path)
            .path(&output)
            .arg(job.width.to_string())
            .arg(job.height.to_string())
            .option("start", job.window.start)
            .option("end", job.window.end)
            .execute()
            .await?;

        Ok(output)
    }

    async fn trim_and_fade(&self, job: &TrimJob) -> Result<PathBuf> {
        let output = artifact_path(&job.output_dir, "-trim.mp4");
        info!("Trimming {} -> {}", job.input_path.display(), output.display());

        self.command(Stage::TrimAndFade)?
            .path(&job.input_path)
            .path(&output)
            .arg(job.start_offset.to_string())
            .arg(job.duration.to_string())
            .arg(format!("--fade-duration={}", job.fade_duration))
            .execute()
            .await?;

        Ok(output)
    }
}
