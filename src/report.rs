use std::fmt::Write;
use std::path::Path;

use crate::clip::{ClipRecord, RecordStatus, StageOutput};
use crate::pipeline::ClipReport;

/// Render a stage output, flagging recorded artifacts that are gone from disk
pub fn describe_output(output: &StageOutput) -> String {
    match output {
        StageOutput::NotStarted => "<none>".to_string(),
        StageOutput::Produced(path) if output.is_satisfied() => path.display().to_string(),
        StageOutput::Produced(path) => format!("{} (missing)", path.display()),
    }
}

fn describe_status(status: &RecordStatus) -> String {
    match status {
        RecordStatus::Active => "active".to_string(),
        RecordStatus::Deleted { at } => format!("deleted {}", at.format("%Y-%m-%d %H:%M:%S")),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Two-column dump of everything recorded for one clip
pub fn clip_table(record: &ClipRecord) -> String {
    let rows = [
        ("ID", record.id().map(|id| id.to_string()).unwrap_or_else(|| "<unsaved>".to_string())),
        (
            "Fingerprint",
            record.fingerprint().map(|f| f.to_string()).unwrap_or_else(|| "<none>".to_string()),
        ),
        ("Audio", record.audio_path.display().to_string()),
        ("Video", record.video_path.display().to_string()),
        ("Captions", describe_output(&record.captions)),
        ("Burned video", describe_output(&record.burned_video)),
        ("Trimmed video", describe_output(&record.trimmed_video)),
        ("Status", describe_status(&record.status)),
    ];

    let mut out = String::new();
    let _ = writeln!(out, "{:<15} {}", "Field", "Value");
    let _ = writeln!(out, "{}", "-".repeat(65));
    for (field, value) in rows {
        let _ = writeln!(out, "{:<15} {}", field, value);
    }
    out
}

pub fn print_clip_table(record: &ClipRecord) {
    println!("\n{}", clip_table(record));
}

/// One line per stored record, as shown by `clips list`
pub fn records_table(records: &[ClipRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<14} {:<24} {:<24} {:<10} {:<10} {:<10} {:<8}",
        "ID", "Fingerprint", "Audio", "Video", "Captions", "Burned", "Trimmed", "Status"
    );
    let _ = writeln!(out, "{}", "-".repeat(112));

    for record in records {
        let fingerprint = record
            .fingerprint()
            .map(|f| f.as_str().chars().take(12).collect::<String>())
            .unwrap_or_default();
        let mark = |output: &StageOutput| match output {
            StageOutput::NotStarted => "-",
            StageOutput::Produced(_) if output.is_satisfied() => "yes",
            StageOutput::Produced(_) => "missing",
        };
        let status = if record.status.is_active() { "active" } else { "deleted" };

        let _ = writeln!(
            out,
            "{:<6} {:<14} {:<24} {:<24} {:<10} {:<10} {:<10} {:<8}",
            record.id().unwrap_or_default(),
            fingerprint,
            file_name(&record.audio_path),
            file_name(&record.video_path),
            mark(&record.captions),
            mark(&record.burned_video),
            mark(&record.trimmed_video),
            status
        );
    }
    out
}

/// End-of-batch overview: one line per attempted clip
pub fn batch_summary(entries: &[(ClipRecord, ClipReport)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<24} {:<18} {:<28} {}", "Audio", "State", "Ran", "Final output");
    let _ = writeln!(out, "{}", "-".repeat(100));

    for (record, report) in entries {
        let ran = if report.ran.is_empty() {
            "-".to_string()
        } else {
            report.ran.iter().map(|s| s.name()).collect::<Vec<_>>().join(",")
        };
        let _ = writeln!(
            out,
            "{:<24} {:<18} {:<28} {}",
            file_name(&record.audio_path),
            report.state.to_string(),
            ran,
            describe_output(&record.trimmed_video)
        );
        if let Some(error) = &report.error {
            let _ = writeln!(out, "{:<24} error: {}", "", error);
        }
    }
    out
}
