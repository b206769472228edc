// Append-only JSON Lines log of user corrections

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::Result;
use crate::metrics;
use crate::models::FeedbackEntry;

pub struct FeedbackLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry as a single line. Existing lines are never touched.
    pub async fn append(&self, entry: &FeedbackEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let written = async {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        }
        .await;

        match written {
            Ok(()) => {
                info!("Recorded feedback for '{}' ({})", entry.title, entry.source);
                metrics::record_feedback("ok");
                Ok(())
            }
            Err(e) => {
                metrics::record_feedback("error");
                Err(e.into())
            }
        }
    }

    /// All entries, most recent first. A missing log reads as empty;
    /// unparsable lines are skipped.
    pub async fn recent(&self) -> Result<Vec<FeedbackEntry>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut entries: Vec<FeedbackEntry> = raw
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping malformed feedback line {}: {}", n + 1, e);
                    None
                }
            })
            .collect();
        entries.reverse();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(title: &str, second: u32) -> FeedbackEntry {
        FeedbackEntry {
            query: "quantum computing".into(),
            source: format!("https://example.com/{}", title),
            title: title.into(),
            old_summary: "old".into(),
            user_edit: "better".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, second).unwrap(),
        }
    }

    #[tokio::test]
    async fn appends_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let log = FeedbackLog::new(dir.path().join("feedback_log.jsonl"));

        log.append(&entry("first", 0)).await.unwrap();
        log.append(&entry("second", 1)).await.unwrap();

        let raw = tokio::fs::read_to_string(log.path()).await.unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: FeedbackEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, entry("first", 0));
    }

    #[tokio::test]
    async fn recent_lists_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = FeedbackLog::new(dir.path().join("feedback_log.jsonl"));

        for (i, title) in ["a", "b", "c"].iter().enumerate() {
            log.append(&entry(title, i as u32)).await.unwrap();
        }

        let titles: Vec<String> = log
            .recent()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn missing_log_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = FeedbackLog::new(dir.path().join("absent.jsonl"));
        assert!(log.recent().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback_log.jsonl");
        let good = serde_json::to_string(&entry("kept", 0)).unwrap();
        tokio::fs::write(&path, format!("{}\nnot json\n\n", good))
            .await
            .unwrap();

        let entries = FeedbackLog::new(&path).recent().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "kept");
    }
}
