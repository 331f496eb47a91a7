use async_trait::async_trait;
use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};
use tracing::{debug, info};

use crate::clip::ClipRecord;
use crate::error::Result;

/// How an edit pause ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    /// Nobody answered before the timeout
    TimedOut,
    /// Operator declined to edit
    Declined,
    /// Operator edited and confirmed
    Edited,
}

impl PauseOutcome {
    pub fn edits_requested(&self) -> bool {
        matches!(self, Self::Edited)
    }
}

/// Human review point between captioning and burning
#[async_trait]
pub trait EditCheckpoint: Send {
    async fn wait_for_edits(&mut self, record: &ClipRecord) -> Result<PauseOutcome>;
}

/// Line-oriented terminal prompt with a bounded wait for the first answer.
///
/// Lines are read on a detached thread so an unanswered read never holds up shutdown.
/// Anything typed before a prompt opens, including a late answer to an earlier prompt that
/// timed out, is thrown away; only input given while the prompt is showing counts.
pub struct TerminalPrompt {
    lines: UnboundedReceiver<io::Result<String>>,
    timeout: Duration,
    out: Box<dyn Write + Send>,
}

impl TerminalPrompt {
    /// Prompt on stdout, answers from stdin
    pub fn stdin(timeout: Duration) -> Result<Self> {
        Self::from_reader(BufReader::new(io::stdin()), timeout)
    }

    pub fn from_reader<R: BufRead + Send + 'static>(mut reader: R, timeout: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("edit-prompt".to_string())
            .spawn(move || loop {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) => {
                        let _ = tx.send(Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "input closed",
                        )));
                        break;
                    }
                    Ok(_) => {
                        if tx.send(Ok(line)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            })?;

        Ok(Self::from_channel(rx, timeout))
    }

    pub fn from_channel(lines: UnboundedReceiver<io::Result<String>>, timeout: Duration) -> Self {
        Self {
            lines,
            timeout,
            out: Box::new(io::stdout()),
        }
    }

    /// Send prompt text somewhere other than stdout
    pub fn with_output<W: Write + Send + 'static>(mut self, out: W) -> Self {
        self.out = Box::new(out);
        self
    }

    fn say(&mut self, text: &str) -> Result<()> {
        write!(self.out, "{}", text)?;
        self.out.flush()?;
        Ok(())
    }

    fn discard_typeahead(&mut self) -> Result<()> {
        loop {
            match self.lines.try_recv() {
                Ok(Ok(line)) => debug!("Discarding input typed before the prompt: {:?}", line.trim()),
                Ok(Err(e)) => return Err(e.into()),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
    }

    async fn next_line(&mut self) -> Result<String> {
        match self.lines.recv().await {
            Some(line) => Ok(line?),
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed").into()),
        }
    }
}

#[async_trait]
impl EditCheckpoint for TerminalPrompt {
    async fn wait_for_edits(&mut self, record: &ClipRecord) -> Result<PauseOutcome> {
        self.discard_typeahead()?;

        if let Some(captions) = record.captions.path() {
            self.say(&format!("Captions ready for review: {}\n", captions.display()))?;
        }
        self.say(&format!(
            "Pause {}s: Make edits now? [y/N]: ",
            self.timeout.as_secs()
        ))?;

        let timeout = self.timeout;
        let answer = tokio::select! {
            _ = tokio::time::sleep(timeout) => None,
            line = self.next_line() => Some(line?),
        };

        let Some(answer) = answer else {
            self.say("\n")?;
            info!("No answer within {:?}, continuing", timeout);
            return Ok(PauseOutcome::TimedOut);
        };

        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => {
                self.say("Editing... Press Enter to continue: ")?;
                while !self.next_line().await?.trim().is_empty() {
                    self.say("Press Enter on an empty line to continue: ")?;
                }
                info!("Edits confirmed");
                Ok(PauseOutcome::Edited)
            }
            _ => Ok(PauseOutcome::Declined),
        }
    }
}
