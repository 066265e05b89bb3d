//! End-of-run summary and failure list

use crate::executor::TransferSummary;
use crate::types::{SyncError, TransferStatus, TransferTask};
use chrono::{DateTime, Local};
use indicatif::HumanBytes;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

/// Human readable statistics for a finished run
pub fn format_summary(summary: &TransferSummary) -> String {
    let mut lines = Vec::with_capacity(8);
    lines.push("Summary:".to_string());
    for status in TransferStatus::ALL {
        lines.push(format!("  {:<15} {}", status.label(), summary.count(status)));
    }
    lines.push(format!("  Transferred     {}", HumanBytes(summary.total_bytes)));
    lines.push(format!(
        "  Raw speed       {}/s over {}",
        HumanBytes(summary.raw_throughput()),
        format_duration(summary.raw_time)
    ));
    lines.push(format!(
        "  Actual speed    {}/s over {}",
        HumanBytes(summary.actual_throughput()),
        format_duration(summary.wall_time)
    ));
    lines.join("\n")
}

fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

/// Listing printed for a dry run
pub fn format_task_list(tasks: &[TransferTask]) -> String {
    if tasks.is_empty() {
        return "Planned transfers:\n  (nothing to transfer)".to_string();
    }

    let mut lines = Vec::with_capacity(tasks.len() + 1);
    lines.push(format!("Planned transfers ({}):", tasks.len()));
    for task in tasks {
        lines.push(format!(
            "  {:<9} {} -> {}",
            task.operation.to_string().to_uppercase(),
            task.from,
            task.to
        ));
    }
    lines.join("\n")
}

/// Failure list file name for a run started at `now`
pub fn failure_file_name(now: DateTime<Local>) -> String {
    format!("davsync-failed-{}.txt", now.format("%Y%m%d-%H%M%S%.3f"))
}

/// Write one failed source path per line into a new file under `dir`.
///
/// Returns `None` when nothing failed. An existing file with the same name
/// is never overwritten.
pub fn write_failure_list(
    summary: &TransferSummary,
    dir: &Path,
    now: DateTime<Local>,
) -> Result<Option<PathBuf>, SyncError> {
    if !summary.has_failures() {
        return Ok(None);
    }

    let path = dir.join(failure_file_name(now));
    let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    let mut writer = BufWriter::new(file);
    for failed in &summary.failed_paths {
        writeln!(writer, "{}", failed)?;
    }
    writer.flush()?;
    Ok(Some(path))
}

/// Print the summary and persist failures.
///
/// Failing to write the failure list is reported, never fatal.
pub fn report(summary: &TransferSummary, failures_dir: &Path) -> Option<PathBuf> {
    println!("{}", format_summary(summary));

    match write_failure_list(summary, failures_dir, Local::now()) {
        Ok(Some(path)) => {
            info!(file = %path.display(), failed = summary.failed, "Failure list written");
            println!("Failed transfers listed in {}", path.display());
            Some(path)
        }
        Ok(None) => None,
        Err(e) => {
            error!(dir = %failures_dir.display(), error = %e, "Could not write failure list");
            eprintln!(
                "Could not write failure list to {}: {}",
                failures_dir.display(),
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Operation;
    use camino::Utf8PathBuf;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 16, 9, 5, 7).unwrap()
    }

    fn failed_summary() -> TransferSummary {
        TransferSummary {
            done: 1,
            failed: 2,
            total_bytes: 5 * 1024 * 1024,
            raw_time: Duration::from_secs(2),
            wall_time: Duration::from_secs(1),
            failed_paths: vec![Utf8PathBuf::from("/src/a.txt"), Utf8PathBuf::from("/src/b/c.txt")],
            ..TransferSummary::default()
        }
    }

    #[test]
    fn test_format_summary_contains_counts_and_speeds() {
        let text = format_summary(&failed_summary());
        assert!(text.contains("Done"));
        assert!(text.contains("Failed          2"));
        assert!(text.contains("Already exists  0"));
        assert!(text.contains("MiB"));
        assert!(text.contains("Raw speed"));
        assert!(text.contains("Actual speed"));
        assert!(text.contains("1.00s"));
    }

    #[test]
    fn test_failure_file_name_is_timestamped() {
        assert_eq!(
            failure_file_name(fixed_time()),
            "davsync-failed-20261016-090507.000.txt"
        );
    }

    #[test]
    fn test_write_failure_list_one_path_per_line() {
        let dir = TempDir::new().unwrap();
        let path = write_failure_list(&failed_summary(), dir.path(), fixed_time())
            .unwrap()
            .expect("failures present");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "/src/a.txt\n/src/b/c.txt\n");
    }

    #[test]
    fn test_no_failure_file_without_failures() {
        let dir = TempDir::new().unwrap();
        let written = write_failure_list(&TransferSummary::default(), dir.path(), fixed_time()).unwrap();
        assert!(written.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_existing_failure_file_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let summary = failed_summary();
        write_failure_list(&summary, dir.path(), fixed_time()).unwrap();
        assert!(write_failure_list(&summary, dir.path(), fixed_time()).is_err());
    }

    #[test]
    fn test_report_survives_unwritable_directory() {
        let written = report(&failed_summary(), Path::new("/definitely/not/a/dir"));
        assert!(written.is_none());
    }

    #[test]
    fn test_format_task_list() {
        let tasks = vec![
            TransferTask::new(Operation::Upload, "/src/a.txt", "/dst/src/a.txt"),
            TransferTask::new(Operation::Upload, "/src/b.txt", "/dst/src/b.txt"),
        ];
        let text = format_task_list(&tasks);
        assert!(text.contains("Planned transfers (2):"));
        assert!(text.contains("UPLOAD    /src/a.txt -> /dst/src/a.txt"));
        assert!(format_task_list(&[]).contains("nothing to transfer"));
    }
}
