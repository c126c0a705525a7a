//! Progress and degradation events emitted by the archiving pipeline.
//!
//! Components report what happened to an injected [`Observer`] instead of writing to
//! a global logger. The binary installs [`TracingObserver`]; tests use
//! [`RecordingObserver`] to assert on what was reported.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, error, info, warn};

/// `transient` on the failure events tells a rate limit or API hiccup, which only cost
/// the remaining pages, apart from anything else.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveEvent {
    UsersLoaded {
        count: usize,
    },
    UsersFailed {
        loaded: usize,
        error: String,
        transient: bool,
    },
    ChannelsPage {
        count: usize,
    },
    ChannelsFailed {
        loaded: usize,
        error: String,
        transient: bool,
    },
    HistoryPage {
        channel_id: String,
        count: usize,
    },
    HistoryFailed {
        channel_id: String,
        loaded: usize,
        error: String,
        transient: bool,
    },
    ThreadFetched {
        channel_id: String,
        parent_ts: String,
        count: usize,
    },
    ThreadFailed {
        channel_id: String,
        parent_ts: String,
        loaded: usize,
        error: String,
        transient: bool,
    },
    TimestampUnparsable {
        ts: String,
    },
    ChannelStarted {
        channel_id: String,
        channel_name: String,
        position: usize,
        total: usize,
    },
    ChannelArchived {
        channel_name: String,
        message_count: usize,
        path: PathBuf,
    },
    ChannelFailed {
        channel_name: String,
        error: String,
    },
    BatchFinished {
        archived: usize,
        total: usize,
        failed: Vec<String>,
    },
    MalformedArchive {
        path: PathBuf,
        error: String,
    },
    IndexWritten {
        path: PathBuf,
        entries: usize,
    },
}

pub trait Observer: Send + Sync {
    fn event(&self, event: &ArchiveEvent);
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn event(&self, event: &ArchiveEvent) {
        match event {
            ArchiveEvent::UsersLoaded { count } => info!(count, "loaded users into cache"),
            ArchiveEvent::UsersFailed { loaded, error, transient } => {
                warn!(loaded, %error, transient, "failed to load users cache")
            }
            ArchiveEvent::ChannelsPage { count } => info!(count, "retrieved channels"),
            ArchiveEvent::ChannelsFailed { loaded, error, transient } => {
                if *transient {
                    warn!(loaded, %error, "channel listing cut short")
                } else {
                    error!(loaded, %error, "error retrieving channels")
                }
            }
            ArchiveEvent::HistoryPage { channel_id, count } => {
                debug!(channel = %channel_id, count, "retrieved messages")
            }
            ArchiveEvent::HistoryFailed { channel_id, loaded, error, transient } => {
                if *transient {
                    warn!(channel = %channel_id, loaded, %error, "history cut short")
                } else {
                    error!(channel = %channel_id, loaded, %error, "error retrieving history")
                }
            }
            ArchiveEvent::ThreadFetched { channel_id, parent_ts, count } => {
                debug!(
                    channel = %channel_id,
                    thread = %parent_ts,
                    count,
                    "retrieved thread messages"
                )
            }
            ArchiveEvent::ThreadFailed { channel_id, parent_ts, loaded, error, transient } => {
                if *transient {
                    warn!(
                        channel = %channel_id,
                        thread = %parent_ts,
                        loaded,
                        %error,
                        "thread cut short"
                    )
                } else {
                    error!(
                        channel = %channel_id,
                        thread = %parent_ts,
                        loaded,
                        %error,
                        "error retrieving thread messages"
                    )
                }
            }
            ArchiveEvent::TimestampUnparsable { ts } => {
                debug!(%ts, "failed to convert timestamp")
            }
            ArchiveEvent::ChannelStarted { channel_id, channel_name, position, total } => {
                let percent = if *total == 0 { 100 } else { position * 100 / total };
                info!(
                    channel = %channel_id,
                    "[{}/{}] ({}%) archiving #{}",
                    position,
                    total,
                    percent,
                    channel_name
                )
            }
            ArchiveEvent::ChannelArchived { channel_name, message_count, path } => {
                info!(
                    channel = %channel_name,
                    message_count,
                    path = %path.display(),
                    "archived channel"
                )
            }
            ArchiveEvent::ChannelFailed { channel_name, error } => {
                error!(channel = %channel_name, %error, "failed to archive channel")
            }
            ArchiveEvent::BatchFinished { archived, total, failed } => {
                info!(archived, total, "archiving completed");
                if !failed.is_empty() {
                    warn!(count = failed.len(), channels = %failed.join(", "), "failed channels");
                }
            }
            ArchiveEvent::MalformedArchive { path, error } => {
                warn!(path = %path.display(), %error, "skipping unreadable archive")
            }
            ArchiveEvent::IndexWritten { path, entries } => {
                info!(path = %path.display(), entries, "created index file")
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ArchiveEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ArchiveEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Observer for RecordingObserver {
    fn event(&self, event: &ArchiveEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
