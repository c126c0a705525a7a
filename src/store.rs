//! JSON files in the archive directory.
//!
//! Every write goes through a temporary file in the target directory and is renamed
//! into place, so a document on disk is either complete or absent.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::{AppError, Result};

pub const INDEX_FILE: &str = "INDEX.json";

const MAX_NAME_ATTEMPTS: usize = 1000;

/// Make a channel name safe to use as a file name stem.
pub fn sanitize_file_stem(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');
    if sanitized.is_empty() {
        "channel".to_string()
    } else {
        sanitized.to_string()
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| AppError::WriteFile {
        path: dir.display().to_string(),
        source: e,
    })
}

fn write_temp<T: Serialize>(dir: &Path, value: &T) -> Result<NamedTempFile> {
    let write_error = |source: io::Error| AppError::WriteFile {
        path: dir.display().to_string(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| AppError::JsonSerialize(e.to_string()))?;
        writer.flush().map_err(write_error)?;
    }
    tmp.as_file().sync_all().map_err(write_error)?;
    Ok(tmp)
}

/// Write `value` as `<stem>.json` in `dir` without ever replacing an existing file.
///
/// When the name is taken a numeric suffix is added (`<stem>_2.json`, ...).
pub fn write_new_json<T: Serialize>(dir: &Path, stem: &str, value: &T) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let mut tmp = write_temp(dir, value)?;

    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let file_name = if attempt == 1 {
            format!("{}.json", stem)
        } else {
            format!("{}_{}.json", stem, attempt)
        };
        let path = dir.join(file_name);
        if path.exists() {
            continue;
        }

        match tmp.persist_noclobber(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => tmp = e.file,
            Err(e) => {
                return Err(AppError::WriteFile {
                    path: path.display().to_string(),
                    source: e.error,
                });
            }
        }
    }

    Err(AppError::WriteFile {
        path: dir.join(format!("{}.json", stem)).display().to_string(),
        source: io::Error::new(io::ErrorKind::AlreadyExists, "no free file name"),
    })
}

/// Atomically write `value` to `path`, replacing any previous file.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(dir)?;
    let tmp = write_temp(dir, value)?;
    tmp.persist(path).map_err(|e| AppError::WriteFile {
        path: path.display().to_string(),
        source: e.error,
    })?;
    Ok(())
}

/// Atomically write rendered text to `path`, replacing any previous file.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(dir)?;
    let write_error = |source: io::Error| AppError::WriteFile {
        path: path.display().to_string(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(content.as_bytes()).map_err(write_error)?;
    tmp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| AppError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| AppError::MalformedArchive {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Archive documents in `dir`, sorted by file name.
///
/// Only `*.json` files directly inside `dir` count; hidden files and the index are
/// skipped.
pub fn list_archive_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| AppError::ReadFile {
            path: dir.display().to_string(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || name == INDEX_FILE || !name.ends_with(".json") {
            continue;
        }
        files.push(entry.into_path());
    }
    files.sort();
    Ok(files)
}
