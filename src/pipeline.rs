use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::clip::ClipRecord;
use crate::error::{CaptionerError, Result};
use crate::prompt::EditCheckpoint;
use crate::report::print_clip_table;
use crate::stage::{BurnJob, Stage, StageRunner, TimeWindow, TranscribeJob, TrimJob};
use crate::store::ClipStore;

/// Fade-out length used when none is configured
pub const DEFAULT_FADE_DURATION: u32 = 5;

/// Parameters shared by every clip of a run. Built once from config and CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    pub model: String,
    pub window: TimeWindow,
    pub width: u32,
    pub height: u32,
    pub fade_duration: u32,
    /// Pause for caption review before burning
    pub interactive: bool,
    /// Never run transcription
    pub skip_captions: bool,
    /// Never run burn or trim
    pub skip_video: bool,
}

impl PipelineOptions {
    fn is_disabled(&self, stage: Stage) -> bool {
        match stage {
            Stage::Transcribe => self.skip_captions,
            Stage::BurnCaptions | Stage::TrimAndFade => self.skip_video,
        }
    }
}

/// Where a clip stands in the transcribe -> burn -> trim chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipState {
    PendingCaptions,
    PendingBurn,
    PendingTrim,
    Done,
    Failed(Stage),
}

impl ClipState {
    /// Derive the state from what is on disk. A stage only counts as done if every stage
    /// before it is done too, so a leftover later artifact never hides missing captions.
    pub fn of(record: &ClipRecord) -> Self {
        if !record.captions.is_satisfied() {
            Self::PendingCaptions
        } else if !record.burned_video.is_satisfied() {
            Self::PendingBurn
        } else if !record.trimmed_video.is_satisfied() {
            Self::PendingTrim
        } else {
            Self::Done
        }
    }

    /// First stage that still has to run
    pub fn pending_stage(&self) -> Option<Stage> {
        match self {
            Self::PendingCaptions => Some(Stage::Transcribe),
            Self::PendingBurn => Some(Stage::BurnCaptions),
            Self::PendingTrim => Some(Stage::TrimAndFade),
            Self::Done | Self::Failed(_) => None,
        }
    }
}

impl fmt::Display for ClipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingCaptions => f.write_str("pending captions"),
            Self::PendingBurn => f.write_str("pending burn"),
            Self::PendingTrim => f.write_str("pending trim"),
            Self::Done => f.write_str("done"),
            Self::Failed(stage) => write!(f, "failed at {}", stage),
        }
    }
}

/// What happened to one clip during a pass
#[derive(Debug)]
pub struct ClipReport {
    pub state: ClipState,
    /// Stages executed in this pass
    pub ran: Vec<Stage>,
    /// Stages whose artifacts were already in place
    pub skipped: Vec<Stage>,
    /// Stages left pending because the run turned them off
    pub disabled: Vec<Stage>,
    pub error: Option<CaptionerError>,
}

impl ClipReport {
    fn new(state: ClipState) -> Self {
        Self {
            state,
            ran: Vec::new(),
            skipped: Vec::new(),
            disabled: Vec::new(),
            error: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == ClipState::Done
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, ClipState::Failed(_))
    }
}

/// Advances one clip at a time through the stages it still needs
pub struct Pipeline<'a> {
    runner: &'a dyn StageRunner,
    store: &'a dyn ClipStore,
    options: &'a PipelineOptions,
    checkpoint: Option<Box<dyn EditCheckpoint + 'a>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        runner: &'a dyn StageRunner,
        store: &'a dyn ClipStore,
        options: &'a PipelineOptions,
    ) -> Self {
        Self {
            runner,
            store,
            options,
            checkpoint: None,
        }
    }

    /// Review point consulted before burning when the run is interactive
    pub fn with_checkpoint(mut self, checkpoint: Box<dyn EditCheckpoint + 'a>) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        self.options
    }

    /// Run every unsatisfied stage of `record` in order, persisting after each success.
    ///
    /// Stages before the first unsatisfied one are skipped. From that stage on everything
    /// runs, since each artifact is built from the one before it. A failure stops the clip
    /// and leaves the stored record as it was after the last successful stage.
    pub async fn advance(&mut self, record: &mut ClipRecord) -> ClipReport {
        let initial = ClipState::of(record);
        let mut report = ClipReport::new(initial);
        let first_pending = initial.pending_stage();

        for stage in Stage::ALL {
            if first_pending.is_none_or(|pending| stage < pending) {
                info!("Skipping {} for {}: output already present", stage, record.audio_path.display());
                report.skipped.push(stage);
                continue;
            }

            if self.options.is_disabled(stage) {
                info!("{} disabled for this run, {} stays pending", stage, record.audio_path.display());
                report.disabled.extend(Stage::ALL.into_iter().filter(|s| *s >= stage));
                report.state = ClipState::of(record);
                return report;
            }

            if stage == Stage::BurnCaptions {
                if let Err(e) = self.review_captions(record).await {
                    warn!("Edit pause failed for {}: {}", record.audio_path.display(), e);
                    report.state = ClipState::Failed(stage);
                    report.error = Some(e);
                    return report;
                }
            }

            match self.run_stage(stage, record).await {
                Ok(()) => {
                    report.ran.push(stage);
                    if self.options.interactive {
                        print_clip_table(record);
                    }
                }
                Err(e) => {
                    warn!("{} failed for {}: {}", stage, record.audio_path.display(), e);
                    report.state = ClipState::Failed(stage);
                    report.error = Some(e);
                    return report;
                }
            }
        }

        report.state = ClipState::of(record);
        report
    }

    async fn review_captions(&mut self, record: &ClipRecord) -> Result<()> {
        if !self.options.interactive {
            return Ok(());
        }
        if let Some(checkpoint) = self.checkpoint.as_mut() {
            let outcome = checkpoint.wait_for_edits(record).await?;
            info!("Caption review for {}: {:?}", record.audio_path.display(), outcome);
        }
        Ok(())
    }

    async fn run_stage(&self, stage: Stage, record: &mut ClipRecord) -> Result<()> {
        let options = self.options;
        info!("Starting {} for {}", stage, record.audio_path.display());

        let output = match stage {
            Stage::Transcribe => {
                let job = TranscribeJob {
                    audio_path: record.audio_path.clone(),
                    output_dir: options.output_dir.clone(),
                    model: options.model.clone(),
                    window: options.window,
                };
                self.runner.transcribe(&job).await?
            }
            Stage::BurnCaptions => {
                let captions_path = require_input(record, Stage::Transcribe)?;
                let job = BurnJob {
                    captions_path: captions_path.to_path_buf(),
                    video_path: record.video_path.clone(),
                    audio_path: record.audio_path.clone(),
                    output_dir: options.output_dir.clone(),
                    width: options.width,
                    height: options.height,
                    window: options.window,
                };
                self.runner.burn_captions(&job).await?
            }
            Stage::TrimAndFade => {
                let input_path = require_input(record, Stage::BurnCaptions)?;
                let job = TrimJob {
                    input_path: input_path.to_path_buf(),
                    output_dir: options.output_dir.clone(),
                    // The burned video already starts at the window start.
                    start_offset: 0,
                    duration: options.window.duration(),
                    fade_duration: options.fade_duration,
                };
                self.runner.trim_and_fade(&job).await?
            }
        };

        if !output.is_file() {
            return Err(CaptionerError::stage(
                stage,
                format!("reported {} but did not write it", output.display()),
            ));
        }

        let mut updated = record.clone();
        updated.record_output(stage, output);
        *record = self.store.update(&updated)?;

        info!("Finished {} for {}", stage, record.audio_path.display());
        Ok(())
    }
}

/// Artifact of `upstream` that the next stage reads. It has to be on disk now.
fn require_input(record: &ClipRecord, upstream: Stage) -> Result<&Path> {
    let output = record.output(upstream);
    match output.path() {
        Some(path) if output.is_satisfied() => Ok(path),
        Some(path) => Err(CaptionerError::Precondition(format!(
            "{} output {} is missing",
            upstream,
            path.display()
        ))),
        None => Err(CaptionerError::Precondition(format!("{} has not run", upstream))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{Fingerprint, StageOutput};
    use crate::prompt::PauseOutcome;
    use crate::stage::MockStageRunner;
    use crate::store::SqliteClipStore;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: SqliteClipStore,
        options: PipelineOptions,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let output_dir = dir.path().join("output");
            std::fs::create_dir_all(&output_dir).unwrap();
            Self {
                options: PipelineOptions {
                    output_dir,
                    model: "base".to_string(),
                    window: TimeWindow::new(0, 30).unwrap(),
                    width: 1080,
                    height: 1920,
                    fade_duration: DEFAULT_FADE_DURATION,
                    interactive: false,
                    skip_captions: false,
                    skip_video: false,
                },
                store: SqliteClipStore::open_in_memory().unwrap(),
                _dir: dir,
            }
        }

        fn record(&self) -> ClipRecord {
            self.store
                .get_or_create_by_fingerprint(
                    &Fingerprint::new("f00d"),
                    Path::new("audio/a.wav"),
                    Path::new("video/v.mp4"),
                )
                .unwrap()
        }

        fn artifact(&self, name: &str) -> PathBuf {
            let path = self.options.output_dir.join(name);
            std::fs::write(&path, name).unwrap();
            path
        }

        fn stored(&self, record: &ClipRecord) -> ClipRecord {
            self.store.get_by_id(record.id().unwrap()).unwrap()
        }
    }

    fn succeeding_runner(captions: PathBuf, burned: PathBuf, trimmed: PathBuf) -> MockStageRunner {
        let mut runner = MockStageRunner::new();
        runner.expect_transcribe().times(1).returning(move |_| Ok(captions.clone()));
        runner.expect_burn_captions().times(1).returning(move |_| Ok(burned.clone()));
        runner.expect_trim_and_fade().times(1).returning(move |_| Ok(trimmed.clone()));
        runner
    }

    struct CountingCheckpoint {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl EditCheckpoint for CountingCheckpoint {
        async fn wait_for_edits(&mut self, record: &ClipRecord) -> Result<PauseOutcome> {
            assert!(record.captions.is_satisfied(), "review needs captions on disk");
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "closed").into());
            }
            Ok(PauseOutcome::Declined)
        }
    }

    #[tokio::test]
    async fn test_fresh_clip_runs_all_stages_and_persists() {
        let fx = Fixture::new();
        let runner = succeeding_runner(
            fx.artifact("1.ass"),
            fx.artifact("2-captions.mp4"),
            fx.artifact("3-trim.mp4"),
        );
        let mut record = fx.record();

        let report = Pipeline::new(&runner, &fx.store, &fx.options).advance(&mut record).await;

        assert!(report.is_done());
        assert_eq!(report.ran, Stage::ALL.to_vec());
        assert!(report.skipped.is_empty());

        let stored = fx.stored(&record);
        assert_eq!(stored.captions, StageOutput::Produced(fx.options.output_dir.join("1.ass")));
        assert_eq!(stored.burned_video, StageOutput::Produced(fx.options.output_dir.join("2-captions.mp4")));
        assert_eq!(stored.trimmed_video, StageOutput::Produced(fx.options.output_dir.join("3-trim.mp4")));
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_second_pass_invokes_no_stage() {
        let fx = Fixture::new();
        let runner = succeeding_runner(
            fx.artifact("1.ass"),
            fx.artifact("2-captions.mp4"),
            fx.artifact("3-trim.mp4"),
        );
        let mut record = fx.record();
        Pipeline::new(&runner, &fx.store, &fx.options).advance(&mut record).await;

        // No expectations: any stage call panics.
        let idle = MockStageRunner::new();
        let mut again = fx.record();
        let report = Pipeline::new(&idle, &fx.store, &fx.options).advance(&mut again).await;

        assert!(report.is_done());
        assert!(report.ran.is_empty());
        assert_eq!(report.skipped, Stage::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_missing_burned_video_reruns_burn_and_trim_only() {
        let fx = Fixture::new();
        let mut record = fx.record();
        record.captions = StageOutput::Produced(fx.artifact("1.ass"));
        record.burned_video = StageOutput::Produced(fx.options.output_dir.join("deleted-captions.mp4"));
        record.trimmed_video = StageOutput::Produced(fx.artifact("old-trim.mp4"));
        let mut record = fx.store.update(&record).unwrap();

        let burned = fx.artifact("4-captions.mp4");
        let trimmed = fx.artifact("5-trim.mp4");
        let captions = fx.options.output_dir.join("1.ass");
        let mut runner = MockStageRunner::new();
        runner
            .expect_burn_captions()
            .withf(move |job| job.captions_path == captions && job.width == 1080 && job.height == 1920)
            .times(1)
            .returning(move |_| Ok(burned.clone()));
        let expected_input = fx.options.output_dir.join("4-captions.mp4");
        runner
            .expect_trim_and_fade()
            .withf(move |job| job.input_path == expected_input && job.duration == 30 && job.fade_duration == 5)
            .times(1)
            .returning(move |_| Ok(trimmed.clone()));

        let report = Pipeline::new(&runner, &fx.store, &fx.options).advance(&mut record).await;

        assert!(report.is_done());
        assert_eq!(report.skipped, vec![Stage::Transcribe]);
        assert_eq!(report.ran, vec![Stage::BurnCaptions, Stage::TrimAndFade]);
        assert_eq!(fx.stored(&record).trimmed_video, StageOutput::Produced(fx.options.output_dir.join("5-trim.mp4")));
    }

    #[tokio::test]
    async fn test_later_artifact_never_hides_missing_captions() {
        let fx = Fixture::new();
        let mut record = fx.record();
        record.burned_video = StageOutput::Produced(fx.artifact("stale-captions.mp4"));
        record.trimmed_video = StageOutput::Produced(fx.artifact("stale-trim.mp4"));
        let mut record = fx.store.update(&record).unwrap();

        let runner = succeeding_runner(
            fx.artifact("1.ass"),
            fx.artifact("2-captions.mp4"),
            fx.artifact("3-trim.mp4"),
        );
        let report = Pipeline::new(&runner, &fx.store, &fx.options).advance(&mut record).await;

        assert_eq!(report.ran, Stage::ALL.to_vec());
        assert!(report.is_done());
    }

    #[tokio::test]
    async fn test_burn_failure_keeps_earlier_progress() {
        let fx = Fixture::new();
        let mut runner = MockStageRunner::new();
        let captions = fx.artifact("1.ass");
        runner.expect_transcribe().times(1).returning(move |_| Ok(captions.clone()));
        runner
            .expect_burn_captions()
            .times(1)
            .returning(|_| Err(CaptionerError::stage(Stage::BurnCaptions, "exit status: 1")));
        runner.expect_trim_and_fade().times(0);

        let mut record = fx.record();
        let report = Pipeline::new(&runner, &fx.store, &fx.options).advance(&mut record).await;

        assert_eq!(report.state, ClipState::Failed(Stage::BurnCaptions));
        assert!(report.is_failed());
        assert_eq!(report.ran, vec![Stage::Transcribe]);
        assert!(matches!(
            report.error,
            Some(CaptionerError::StageExecution { stage: Stage::BurnCaptions, .. })
        ));

        let stored = fx.stored(&record);
        assert_eq!(stored.captions, StageOutput::Produced(fx.options.output_dir.join("1.ass")));
        assert_eq!(stored.burned_video, StageOutput::NotStarted);
        assert_eq!(stored.trimmed_video, StageOutput::NotStarted);
    }

    #[tokio::test]
    async fn test_failure_leaves_persisted_fields_untouched() {
        let fx = Fixture::new();
        let mut record = fx.record();
        record.captions = StageOutput::Produced(fx.artifact("1.ass"));
        record.burned_video = StageOutput::Produced(fx.artifact("2-captions.mp4"));
        let mut record = fx.store.update(&record).unwrap();
        let before = fx.stored(&record);

        let mut runner = MockStageRunner::new();
        runner
            .expect_trim_and_fade()
            .times(1)
            .returning(|_| Err(CaptionerError::stage(Stage::TrimAndFade, "killed")));

        let report = Pipeline::new(&runner, &fx.store, &fx.options).advance(&mut record).await;

        assert_eq!(report.state, ClipState::Failed(Stage::TrimAndFade));
        assert_eq!(fx.stored(&record), before);
    }

    #[tokio::test]
    async fn test_skip_video_stops_after_captions() {
        let mut fx = Fixture::new();
        fx.options.skip_video = true;
        let mut runner = MockStageRunner::new();
        let captions = fx.artifact("1.ass");
        runner.expect_transcribe().times(1).returning(move |_| Ok(captions.clone()));

        let mut record = fx.record();
        let report = Pipeline::new(&runner, &fx.store, &fx.options).advance(&mut record).await;

        assert_eq!(report.state, ClipState::PendingBurn);
        assert_eq!(report.ran, vec![Stage::Transcribe]);
        assert_eq!(report.disabled, vec![Stage::BurnCaptions, Stage::TrimAndFade]);
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn test_skip_captions_without_captions_runs_nothing() {
        let mut fx = Fixture::new();
        fx.options.skip_captions = true;
        let runner = MockStageRunner::new();

        let mut record = fx.record();
        let report = Pipeline::new(&runner, &fx.store, &fx.options).advance(&mut record).await;

        assert_eq!(report.state, ClipState::PendingCaptions);
        assert!(report.ran.is_empty());
        assert_eq!(report.disabled, Stage::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_skip_captions_still_burns_existing_captions() {
        let mut fx = Fixture::new();
        fx.options.skip_captions = true;
        let mut record = fx.record();
        record.captions = StageOutput::Produced(fx.artifact("hand-edited.ass"));
        let mut record = fx.store.update(&record).unwrap();

        let mut runner = MockStageRunner::new();
        let burned = fx.artifact("2-captions.mp4");
        let trimmed = fx.artifact("3-trim.mp4");
        runner.expect_burn_captions().times(1).returning(move |_| Ok(burned.clone()));
        runner.expect_trim_and_fade().times(1).returning(move |_| Ok(trimmed.clone()));

        let report = Pipeline::new(&runner, &fx.store, &fx.options).advance(&mut record).await;
        assert!(report.is_done());
    }

    #[tokio::test]
    async fn test_interactive_run_pauses_before_burn() {
        let mut fx = Fixture::new();
        fx.options.interactive = true;
        let runner = succeeding_runner(
            fx.artifact("1.ass"),
            fx.artifact("2-captions.mp4"),
            fx.artifact("3-trim.mp4"),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let checkpoint = CountingCheckpoint { calls: calls.clone(), fail: false };

        let mut record = fx.record();
        let report = Pipeline::new(&runner, &fx.store, &fx.options)
            .with_checkpoint(Box::new(checkpoint))
            .advance(&mut record)
            .await;

        assert!(report.is_done());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pause_error_abandons_clip_before_burn() {
        let mut fx = Fixture::new();
        fx.options.interactive = true;
        let mut runner = MockStageRunner::new();
        let captions = fx.artifact("1.ass");
        runner.expect_transcribe().times(1).returning(move |_| Ok(captions.clone()));

        let calls = Arc::new(AtomicUsize::new(0));
        let checkpoint = CountingCheckpoint { calls: calls.clone(), fail: true };

        let mut record = fx.record();
        let report = Pipeline::new(&runner, &fx.store, &fx.options)
            .with_checkpoint(Box::new(checkpoint))
            .advance(&mut record)
            .await;

        assert_eq!(report.state, ClipState::Failed(Stage::BurnCaptions));
        assert!(matches!(report.error, Some(CaptionerError::Io(_))));
        assert_eq!(fx.stored(&record).captions, StageOutput::Produced(fx.options.output_dir.join("1.ass")));
    }

    #[tokio::test]
    async fn test_non_interactive_run_never_pauses() {
        let fx = Fixture::new();
        let runner = succeeding_runner(
            fx.artifact("1.ass"),
            fx.artifact("2-captions.mp4"),
            fx.artifact("3-trim.mp4"),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let checkpoint = CountingCheckpoint { calls: calls.clone(), fail: false };

        let mut record = fx.record();
        Pipeline::new(&runner, &fx.store, &fx.options)
            .with_checkpoint(Box::new(checkpoint))
            .advance(&mut record)
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deleted_record_fails_on_update() {
        let fx = Fixture::new();
        let mut record = fx.record();
        fx.store.soft_delete(record.id().unwrap()).unwrap();

        let mut runner = MockStageRunner::new();
        let captions = fx.artifact("1.ass");
        runner.expect_transcribe().times(1).returning(move |_| Ok(captions.clone()));

        let report = Pipeline::new(&runner, &fx.store, &fx.options).advance(&mut record).await;

        assert_eq!(report.state, ClipState::Failed(Stage::Transcribe));
        assert!(matches!(report.error, Some(CaptionerError::NotFound(_))));
        assert_eq!(record.captions, StageOutput::NotStarted);
    }

    #[tokio::test]
    async fn test_unwritten_captions_fail_transcribe_and_stop_the_chain() {
        let fx = Fixture::new();
        let phantom = fx.options.output_dir.join("never-written.ass");
        let mut runner = MockStageRunner::new();
        runner.expect_transcribe().times(1).returning(move |_| Ok(phantom.clone()));
        runner.expect_burn_captions().times(0);
        runner.expect_trim_and_fade().times(0);

        let mut record = fx.record();
        let report = Pipeline::new(&runner, &fx.store, &fx.options).advance(&mut record).await;

        assert_eq!(report.state, ClipState::Failed(Stage::Transcribe));
        assert!(report.is_failed());
        assert!(report.ran.is_empty());
        assert!(matches!(
            report.error,
            Some(CaptionerError::StageExecution { stage: Stage::Transcribe, .. })
        ));
        assert_eq!(fx.stored(&record).captions, StageOutput::NotStarted);
    }

    #[tokio::test]
    async fn test_unwritten_burned_video_never_reaches_trim() {
        let fx = Fixture::new();
        let captions = fx.artifact("1.ass");
        let phantom = fx.options.output_dir.join("never-written-captions.mp4");
        let mut runner = MockStageRunner::new();
        runner.expect_transcribe().times(1).returning(move |_| Ok(captions.clone()));
        runner.expect_burn_captions().times(1).returning(move |_| Ok(phantom.clone()));
        runner.expect_trim_and_fade().times(0);

        let mut record = fx.record();
        let report = Pipeline::new(&runner, &fx.store, &fx.options).advance(&mut record).await;

        assert_eq!(report.state, ClipState::Failed(Stage::BurnCaptions));
        assert_eq!(report.ran, vec![Stage::Transcribe]);
        let stored = fx.stored(&record);
        assert!(stored.captions.is_satisfied());
        assert_eq!(stored.burned_video, StageOutput::NotStarted);
    }

    #[tokio::test]
    async fn test_captions_removed_during_review_block_burn() {
        struct DeletingCheckpoint;

        #[async_trait]
        impl EditCheckpoint for DeletingCheckpoint {
            async fn wait_for_edits(&mut self, record: &ClipRecord) -> Result<PauseOutcome> {
                std::fs::remove_file(record.captions.path().unwrap()).unwrap();
                Ok(PauseOutcome::Edited)
            }
        }

        let mut fx = Fixture::new();
        fx.options.interactive = true;
        let captions = fx.artifact("1.ass");
        let mut runner = MockStageRunner::new();
        runner.expect_transcribe().times(1).returning(move |_| Ok(captions.clone()));
        runner.expect_burn_captions().times(0);

        let mut record = fx.record();
        let report = Pipeline::new(&runner, &fx.store, &fx.options)
            .with_checkpoint(Box::new(DeletingCheckpoint))
            .advance(&mut record)
            .await;

        assert_eq!(report.state, ClipState::Failed(Stage::BurnCaptions));
        assert!(matches!(report.error, Some(CaptionerError::Precondition(_))));
    }

    #[test]
    fn test_require_input_checks_the_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = ClipRecord::transient("a.wav", "v.mp4");
        assert!(matches!(
            require_input(&record, Stage::Transcribe),
            Err(CaptionerError::Precondition(_))
        ));

        let captions = dir.path().join("1.ass");
        record.captions = StageOutput::Produced(captions.clone());
        assert!(matches!(
            require_input(&record, Stage::Transcribe),
            Err(CaptionerError::Precondition(_))
        ));

        std::fs::write(&captions, "").unwrap();
        assert_eq!(require_input(&record, Stage::Transcribe).unwrap(), captions.as_path());
    }

    #[test]
    fn test_state_follows_stage_order() {
        let dir = tempfile::tempdir().unwrap();
        let touch = |name: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, "").unwrap();
            StageOutput::Produced(path)
        };

        let mut record = ClipRecord::transient("a.wav", "v.mp4");
        assert_eq!(ClipState::of(&record), ClipState::PendingCaptions);

        record.trimmed_video = touch("3-trim.mp4");
        assert_eq!(ClipState::of(&record), ClipState::PendingCaptions);

        record.captions = touch("1.ass");
        assert_eq!(ClipState::of(&record), ClipState::PendingBurn);

        record.burned_video = touch("2-captions.mp4");
        assert_eq!(ClipState::of(&record), ClipState::Done);
        assert_eq!(ClipState::Done.pending_stage(), None);
        assert_eq!(ClipState::PendingTrim.pending_stage(), Some(Stage::TrimAndFade));
    }
}
