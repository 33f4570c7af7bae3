use mediaport_core::{TaskEvent, TaskStatus, UploadTask};
use serde::Serialize;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// One progress line for a task event, e.g. `cat.jpg            transferring  55%`.
pub fn progress_line(filename: &str, event: &TaskEvent) -> String {
    let mut line = format!(
        "{:<32} {:<18} {:>3}%",
        truncate_string(filename, 32),
        event.status.as_str(),
        event.progress
    );
    match (event.status, &event.assigned_asset_id, &event.error_message) {
        (TaskStatus::Error, _, Some(message)) => {
            line.push_str("  ");
            line.push_str(message);
        }
        (TaskStatus::Done | TaskStatus::Duplicate, Some(asset_id), _) => {
            line.push_str("  ");
            line.push_str(asset_id);
        }
        _ => {}
    }
    line
}

/// Batch result printed after all uploads finished.
#[derive(Debug, Serialize)]
pub struct UploadSummary {
    pub done: usize,
    pub duplicate: usize,
    pub failed: usize,
    pub tasks: Vec<UploadTask>,
}

impl UploadSummary {
    pub fn from_tasks(tasks: Vec<UploadTask>) -> Self {
        let count = |status| tasks.iter().filter(|t| t.status == status).count();
        Self {
            done: count(TaskStatus::Done),
            duplicate: count(TaskStatus::Duplicate),
            failed: count(TaskStatus::Error),
            tasks,
        }
    }
}

/// Initialize tracing for CLI binaries. `MEDIAPORT_LOG_FORMAT=json` switches to
/// JSON lines. Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("MEDIAPORT_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaport_core::TaskId;

    fn event(status: TaskStatus, progress: u8) -> TaskEvent {
        TaskEvent {
            task_id: TaskId::new(),
            status,
            progress,
            assigned_asset_id: None,
            error_message: None,
            error_code: None,
            error_kind: None,
        }
    }

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_multibyte() {
        assert_eq!(truncate_string("ééééé", 4), "é...");
    }

    #[test]
    fn progress_line_in_flight() {
        let line = progress_line("cat.jpg", &event(TaskStatus::Transferring, 55));
        assert!(line.starts_with("cat.jpg"));
        assert!(line.contains("transferring"));
        assert!(line.ends_with(" 55%"));
    }

    #[test]
    fn progress_line_error_has_message() {
        let mut e = event(TaskStatus::Error, 100);
        e.error_message = Some("File too large".to_string());
        assert!(progress_line("big.png", &e).ends_with("100%  File too large"));
    }

    #[test]
    fn progress_line_done_has_asset() {
        let mut e = event(TaskStatus::Done, 100);
        e.assigned_asset_id = Some("asset-7".to_string());
        assert!(progress_line("a.png", &e).ends_with("asset-7"));
    }

    #[test]
    fn summary_counts() {
        let mut done = UploadTask::new("a.png".to_string(), 1, "image/png".to_string());
        done.status = TaskStatus::Done;
        let mut dup = UploadTask::new("b.png".to_string(), 1, "image/png".to_string());
        dup.status = TaskStatus::Duplicate;
        let mut failed = UploadTask::new("c.png".to_string(), 1, "image/png".to_string());
        failed.status = TaskStatus::Error;

        let summary = UploadSummary::from_tasks(vec![done, dup, failed]);
        assert_eq!((summary.done, summary.duplicate, summary.failed), (1, 1, 1));
        assert_eq!(summary.tasks.len(), 3);
    }
}
