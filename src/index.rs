use std::path::{Path, PathBuf};

use chrono::Local;

use crate::Result;
use crate::model::{ArchiveDocument, Index, IndexEntry};
use crate::observer::{ArchiveEvent, Observer};
use crate::store::{INDEX_FILE, list_archive_files, read_json, write_json};

/// Catalog every readable archive document in `dir` into `INDEX.json`.
///
/// Unreadable or corrupt documents are reported and left out; they never fail the scan.
pub fn build_index(dir: &Path, observer: &dyn Observer) -> Result<PathBuf> {
    let mut archives = Vec::new();

    for path in list_archive_files(dir)? {
        let doc: ArchiveDocument = match read_json(&path) {
            Ok(doc) => doc,
            Err(e) => {
                observer.event(&ArchiveEvent::MalformedArchive {
                    path: path.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };
        archives.push(index_entry(&path, &doc));
    }

    let index = Index {
        created_at: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        archives,
    };

    let index_path = dir.join(INDEX_FILE);
    write_json(&index_path, &index)?;

    observer.event(&ArchiveEvent::IndexWritten {
        path: index_path.clone(),
        entries: index.archives.len(),
    });
    Ok(index_path)
}

fn index_entry(path: &Path, doc: &ArchiveDocument) -> IndexEntry {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    IndexEntry {
        filename,
        channel_name: doc.metadata.channel_name.clone(),
        channel_id: doc.metadata.channel_id.clone(),
        message_count: doc.message_count,
        archived_at: doc.metadata.archived_at.clone(),
        file_path: path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::RecordingObserver;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn write_archive(dir: &Path, file: &str, channel: &str, count: usize) {
        let doc = json!({
            "metadata": {
                "archived_at": "2024-03-01T10:00:00.000000",
                "channel_id": format!("C-{}", channel),
                "channel_name": channel,
            },
            "messages": [],
            "message_count": count,
        });
        fs::write(dir.join(file), doc.to_string()).unwrap();
    }

    #[test]
    fn test_build_index_skips_corrupt_documents() {
        let dir = tempdir().unwrap();
        write_archive(dir.path(), "general_20240301_100000.json", "general", 12);
        write_archive(dir.path(), "random_20240301_100001.json", "random", 3);
        fs::write(
            dir.path().join("broken_20240301_100002.json"),
            "{\"metadata\": [",
        )
        .unwrap();
        let observer = RecordingObserver::new();

        let path = build_index(dir.path(), &observer).unwrap();
        let index: Index = read_json(&path).unwrap();

        assert_eq!(path, dir.path().join(INDEX_FILE));
        assert_eq!(index.archives.len(), 2);
        assert_eq!(index.archives[0].filename, "general_20240301_100000.json");
        assert_eq!(index.archives[0].channel_id, "C-general");
        assert_eq!(index.archives[0].message_count, 12);
        assert_eq!(index.archives[1].channel_name, "random");

        let events = observer.events();
        let warnings: Vec<&ArchiveEvent> = events
            .iter()
            .filter(|e| matches!(e, ArchiveEvent::MalformedArchive { .. }))
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(events.contains(&ArchiveEvent::IndexWritten {
            path: path.clone(),
            entries: 2,
        }));
    }

    #[test]
    fn test_build_index_is_rebuildable() {
        let dir = tempdir().unwrap();
        write_archive(dir.path(), "general_20240301_100000.json", "general", 1);
        let observer = RecordingObserver::new();

        build_index(dir.path(), &observer).unwrap();
        write_archive(dir.path(), "dev_20240302_090000.json", "dev", 5);
        let path = build_index(dir.path(), &observer).unwrap();

        let index: Index = read_json(&path).unwrap();
        let names: Vec<&str> = index.archives.iter().map(|a| a.channel_name.as_str()).collect();
        assert_eq!(names, vec!["dev", "general"]);
    }

    #[test]
    fn test_build_index_skips_json_that_is_not_an_archive() {
        let dir = tempdir().unwrap();
        write_archive(dir.path(), "general_20240301_100000.json", "general", 4);
        fs::write(dir.path().join("array.json"), "[]").unwrap();
        fs::write(dir.path().join("other.json"), r#"{"foo": 1}"#).unwrap();
        let observer = RecordingObserver::new();

        let path = build_index(dir.path(), &observer).unwrap();
        let index: Index = read_json(&path).unwrap();

        assert_eq!(index.archives.len(), 1);
        assert_eq!(index.archives[0].channel_name, "general");
        let skipped = observer
            .events()
            .iter()
            .filter(|e| matches!(e, ArchiveEvent::MalformedArchive { .. }))
            .count();
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_build_index_on_empty_directory() {
        let dir = tempdir().unwrap();
        let path = build_index(dir.path(), &RecordingObserver::new()).unwrap();

        let index: Index = read_json(&path).unwrap();
        assert!(index.archives.is_empty());
        assert!(!index.created_at.is_empty());
    }
}
