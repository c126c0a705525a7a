//! Read-side queries over archive documents already on disk.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::model::{ArchiveDocument, ArchiveMetadata, ArchivedMessage};
use crate::observer::{ArchiveEvent, Observer, TracingObserver};
use crate::store::{list_archive_files, read_json};
use crate::{AppError, Result};

const TOP_USERS: usize = 10;
const CSV_HEADER: [&str; 4] = ["timestamp", "user_name", "text", "reply_count"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveSummary {
    pub filename: String,
    pub channel_name: String,
    pub message_count: usize,
    pub archived_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveStatistics {
    pub channel_name: String,
    pub total_messages: usize,
    pub unique_users: usize,
    pub total_threads: usize,
    pub member_count: u64,
    /// At most ten `(user_name, messages)` pairs, busiest first.
    pub top_users: Vec<(String, usize)>,
    pub archived_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelTally {
    pub name: String,
    pub messages: usize,
}

/// Totals over every readable document in the archive directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArchiveStats {
    pub total_archives: usize,
    pub total_messages: usize,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    pub channels: Vec<ChannelTally>,
}

pub struct ArchiveReader {
    dir: PathBuf,
    observer: Arc<dyn Observer>,
}

impl ArchiveReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn load(&self, path: &Path) -> Result<ArchiveDocument> {
        read_json(path)
    }

    /// Top-level messages whose text contains `keyword`.
    pub fn search_messages(
        &self,
        path: &Path,
        keyword: &str,
        case_sensitive: bool,
    ) -> Result<Vec<ArchivedMessage>> {
        let doc = self.load(path)?;
        if case_sensitive {
            return Ok(doc
                .messages
                .into_iter()
                .filter(|m| m.text().contains(keyword))
                .collect());
        }

        let needle = keyword.to_lowercase();
        Ok(doc
            .messages
            .into_iter()
            .filter(|m| m.text().to_lowercase().contains(&needle))
            .collect())
    }

    pub fn search_by_user(&self, path: &Path, user_name: &str) -> Result<Vec<ArchivedMessage>> {
        let doc = self.load(path)?;
        Ok(doc
            .messages
            .into_iter()
            .filter(|m| m.user_name == user_name)
            .collect())
    }

    pub fn message_count(&self, path: &Path) -> Result<usize> {
        Ok(self.load(path)?.message_count)
    }

    pub fn channel_info(&self, path: &Path) -> Result<ArchiveMetadata> {
        Ok(self.load(path)?.metadata)
    }

    /// One summary per readable document, sorted by file name.
    pub fn list_archives(&self) -> Result<Vec<ArchiveSummary>> {
        let mut summaries = Vec::new();
        for path in list_archive_files(&self.dir)? {
            let Some(doc) = self.load_or_warn(&path) else {
                continue;
            };
            summaries.push(ArchiveSummary {
                filename: file_name(&path),
                channel_name: doc.metadata.channel_name,
                message_count: doc.message_count,
                archived_at: doc.metadata.archived_at,
            });
        }
        Ok(summaries)
    }

    pub fn directory_stats(&self) -> Result<ArchiveStats> {
        let mut stats = ArchiveStats::default();
        for path in list_archive_files(&self.dir)? {
            let Some(doc) = self.load_or_warn(&path) else {
                continue;
            };
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

            stats.total_archives += 1;
            stats.total_size_bytes += size;
            stats.total_messages += doc.message_count;
            stats.channels.push(ChannelTally {
                name: doc.metadata.channel_name,
                messages: doc.message_count,
            });
        }
        let megabytes = stats.total_size_bytes as f64 / 1024.0 / 1024.0;
        stats.total_size_mb = (megabytes * 100.0).round() / 100.0;
        Ok(stats)
    }

    /// Write the top-level messages of `path` as CSV and return how many rows were written.
    pub fn export_csv(&self, path: &Path, output: &Path) -> Result<usize> {
        let doc = self.load(path)?;
        let write_error = |source: std::io::Error| AppError::WriteFile {
            path: output.display().to_string(),
            source,
        };

        let file = File::create(output).map_err(write_error)?;
        let mut writer = BufWriter::new(file);
        write_csv_row(&mut writer, &CSV_HEADER).map_err(write_error)?;

        for message in &doc.messages {
            let reply_count = message.message.reply_count.unwrap_or(0).to_string();
            let row = [
                message.timestamp_readable.as_deref().unwrap_or(""),
                message.user_name.as_str(),
                message.text(),
                reply_count.as_str(),
            ];
            write_csv_row(&mut writer, &row).map_err(write_error)?;
        }
        writer.flush().map_err(write_error)?;
        Ok(doc.messages.len())
    }

    pub fn statistics(&self, path: &Path) -> Result<ArchiveStatistics> {
        let doc = self.load(path)?;

        let mut per_user: HashMap<&str, usize> = HashMap::new();
        let mut total_threads = 0;
        for message in &doc.messages {
            let name = if message.user_name.is_empty() {
                "Unknown"
            } else {
                message.user_name.as_str()
            };
            *per_user.entry(name).or_default() += 1;
            if !message.replies().is_empty() {
                total_threads += 1;
            }
        }

        let mut top_users: Vec<(String, usize)> = per_user
            .iter()
            .map(|(name, count)| (name.to_string(), *count))
            .collect();
        top_users.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_users.truncate(TOP_USERS);

        Ok(ArchiveStatistics {
            channel_name: doc.metadata.channel_name.clone(),
            total_messages: doc.messages.len(),
            unique_users: per_user.len(),
            total_threads,
            member_count: doc.metadata.member_count,
            top_users,
            archived_at: doc.metadata.archived_at.clone(),
        })
    }

    fn load_or_warn(&self, path: &Path) -> Option<ArchiveDocument> {
        match self.load(path) {
            Ok(doc) => Some(doc),
            Err(e) => {
                self.observer.event(&ArchiveEvent::MalformedArchive {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
                None
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn write_csv_row<W: Write>(writer: &mut W, fields: &[&str]) -> std::io::Result<()> {
    let line: Vec<String> = fields.iter().map(|field| csv_field(field)).collect();
    write!(writer, "{}\r\n", line.join(","))
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::RecordingObserver;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample(dir: &Path) -> PathBuf {
        let doc = json!({
            "metadata": {
                "archived_at": "2024-03-01T10:00:00.000000",
                "channel_id": "C1",
                "channel_name": "general",
                "member_count": 8
            },
            "messages": [
                {
                    "ts": "1.0",
                    "user": "U1",
                    "user_name": "Alice",
                    "text": "Deploy at noon, \"sharp\"",
                    "timestamp_readable": "2024-03-01T09:00:00",
                    "reply_count": 2,
                    "thread_messages": [
                        { "ts": "1.5", "user": "U2", "user_name": "Bob", "text": "deploy ok" }
                    ]
                },
                { "ts": "2.0", "user": "U2", "user_name": "Bob", "text": "lunch?" },
                {
                    "ts": "3.0",
                    "user": "U1",
                    "user_name": "Alice",
                    "text": "after the DEPLOY\nmaybe"
                },
                { "ts": "4.0", "user": "U3", "user_name": "Carol", "text": "hi" }
            ],
            "message_count": 4
        });
        let path = dir.join("general_20240301_100000.json");
        fs::write(&path, doc.to_string()).unwrap();
        path
    }

    #[test]
    fn test_search_messages() {
        let dir = tempdir().unwrap();
        let path = sample(dir.path());
        let reader = ArchiveReader::new(dir.path());

        let hits = reader.search_messages(&path, "deploy", false).unwrap();
        assert_eq!(hits.len(), 2);

        let hits = reader.search_messages(&path, "DEPLOY", true).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].ts(), "3.0");
    }

    #[test]
    fn test_search_by_user_and_counts() {
        let dir = tempdir().unwrap();
        let path = sample(dir.path());
        let reader = ArchiveReader::new(dir.path());

        assert_eq!(reader.search_by_user(&path, "Alice").unwrap().len(), 2);
        assert!(reader.search_by_user(&path, "alice").unwrap().is_empty());
        assert_eq!(reader.message_count(&path).unwrap(), 4);
        assert_eq!(reader.channel_info(&path).unwrap().channel_id, "C1");
    }

    #[test]
    fn test_statistics() {
        let dir = tempdir().unwrap();
        let path = sample(dir.path());
        let reader = ArchiveReader::new(dir.path());

        let stats = reader.statistics(&path).unwrap();

        assert_eq!(stats.channel_name, "general");
        assert_eq!(stats.total_messages, 4);
        assert_eq!(stats.unique_users, 3);
        assert_eq!(stats.total_threads, 1);
        assert_eq!(stats.member_count, 8);
        assert_eq!(
            stats.top_users,
            vec![
                ("Alice".to_string(), 2),
                ("Bob".to_string(), 1),
                ("Carol".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_export_csv_quotes_fields() {
        let dir = tempdir().unwrap();
        let path = sample(dir.path());
        let out = dir.path().join("general.csv");
        let reader = ArchiveReader::new(dir.path());

        let rows = reader.export_csv(&path, &out).unwrap();
        let csv = fs::read_to_string(&out).unwrap();

        assert_eq!(rows, 4);
        let mut lines = csv.split("\r\n");
        assert_eq!(lines.next(), Some("timestamp,user_name,text,reply_count"));
        assert_eq!(
            lines.next(),
            Some("2024-03-01T09:00:00,Alice,\"Deploy at noon, \"\"sharp\"\"\",2")
        );
        assert_eq!(lines.next(), Some(",Bob,lunch?,0"));
        assert!(csv.contains("\"after the DEPLOY\nmaybe\""));
    }

    #[test]
    fn test_list_archives_skips_malformed() {
        let dir = tempdir().unwrap();
        sample(dir.path());
        fs::write(dir.path().join("zzz_broken.json"), "not json").unwrap();
        let observer = Arc::new(RecordingObserver::new());
        let reader = ArchiveReader::new(dir.path()).with_observer(observer.clone());

        let archives = reader.list_archives().unwrap();

        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].filename, "general_20240301_100000.json");
        assert_eq!(archives[0].message_count, 4);
        assert_eq!(observer.events().len(), 1);
    }

    #[test]
    fn test_directory_stats() {
        let dir = tempdir().unwrap();
        let path = sample(dir.path());
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        let reader =
            ArchiveReader::new(dir.path()).with_observer(Arc::new(RecordingObserver::new()));

        let stats = reader.directory_stats().unwrap();

        assert_eq!(stats.total_archives, 1);
        assert_eq!(stats.total_messages, 4);
        assert_eq!(stats.total_size_bytes, fs::metadata(&path).unwrap().len());
        assert_eq!(
            stats.channels,
            vec![ChannelTally {
                name: "general".to_string(),
                messages: 4
            }]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let reader = ArchiveReader::new(dir.path());
        let result = reader.load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(AppError::ReadFile { .. })));
    }
}
