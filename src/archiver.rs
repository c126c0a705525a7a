//! Channel enumeration, history and thread retrieval, and archive assembly.
//!
//! Everything here runs strictly sequentially: one request at a time, with a fixed
//! pause between pages and between channels. API failures while paging degrade to
//! partial data; only the channel info lookup and writing the document fail a channel.

use std::path::PathBuf;

use chrono::Local;

use crate::model::{
    ArchiveDocument, ArchiveMetadata, ArchivedMessage, Channel, Message, readable_timestamp,
    sort_by_ts,
};
use crate::observer::{ArchiveEvent, Observer};
use crate::pagination::{Fetched, Pacer, collect_pages};
use crate::settings::Settings;
use crate::slack::{ChannelType, WorkspaceApi};
use crate::store::{sanitize_file_stem, write_new_json};
use crate::users::UserDirectory;
use crate::{AppError, Result};

const CHANNEL_TYPES: &[ChannelType] = &[ChannelType::Public, ChannelType::Private];

#[derive(Debug, Clone)]
pub struct ArchiverOptions {
    pub archive_dir: PathBuf,
    /// Pause between two page requests of the same listing.
    pub page_pacer: Pacer,
    /// Pause between two channels of a batch.
    pub channel_pacer: Pacer,
}

impl ArchiverOptions {
    pub fn new(archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            page_pacer: Pacer::none(),
            channel_pacer: Pacer::none(),
        }
    }

    pub fn from_settings(settings: &Settings, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            page_pacer: Pacer::new(settings.pacing.page_delay()),
            channel_pacer: Pacer::new(settings.pacing.channel_delay()),
        }
    }
}

/// Outcome of a multi-channel run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ArchiveReport {
    pub saved: Vec<PathBuf>,
    pub failed: Vec<String>,
    pub total: usize,
}

impl ArchiveReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Archiver<'a, A: WorkspaceApi + ?Sized> {
    api: &'a A,
    users: UserDirectory,
    options: ArchiverOptions,
    observer: &'a dyn Observer,
}

impl<'a, A: WorkspaceApi + ?Sized> Archiver<'a, A> {
    pub fn new(
        api: &'a A,
        users: UserDirectory,
        options: ArchiverOptions,
        observer: &'a dyn Observer,
    ) -> Self {
        Self {
            api,
            users,
            options,
            observer,
        }
    }

    /// Load the user directory, then build the archiver.
    pub async fn connect(api: &'a A, options: ArchiverOptions, observer: &'a dyn Observer) -> Self {
        let users = UserDirectory::load(api, &options.page_pacer, observer).await;
        Self::new(api, users, options, observer)
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    /// All public and private channels visible to the token.
    pub async fn list_channels(
        &self,
        exclude_archived: bool,
        only_joined: bool,
    ) -> Fetched<Channel> {
        let api = self.api;
        let observer = self.observer;

        let mut fetched = collect_pages(&self.options.page_pacer, |cursor| async move {
            let page = api
                .list_channels(CHANNEL_TYPES, exclude_archived, cursor)
                .await?;
            observer.event(&ArchiveEvent::ChannelsPage {
                count: page.items.len(),
            });
            Ok::<_, AppError>(page)
        })
        .await;

        if let Some(e) = &fetched.error {
            observer.event(&ArchiveEvent::ChannelsFailed {
                loaded: fetched.items.len(),
                error: e.to_string(),
                transient: e.is_transient(),
            });
        }
        if only_joined {
            fetched.items.retain(|c| c.is_member);
        }
        fetched
    }

    /// Top-level messages of a channel, oldest first.
    pub async fn fetch_history(
        &self,
        channel_id: &str,
        oldest: Option<&str>,
        latest: Option<&str>,
    ) -> Fetched<Message> {
        let api = self.api;
        let observer = self.observer;

        let mut fetched = collect_pages(&self.options.page_pacer, |cursor| async move {
            let page = api.history(channel_id, oldest, latest, cursor).await?;
            observer.event(&ArchiveEvent::HistoryPage {
                channel_id: channel_id.to_string(),
                count: page.items.len(),
            });
            Ok::<_, AppError>(page)
        })
        .await;

        if let Some(e) = &fetched.error {
            observer.event(&ArchiveEvent::HistoryFailed {
                channel_id: channel_id.to_string(),
                loaded: fetched.items.len(),
                error: e.to_string(),
                transient: e.is_transient(),
            });
        }
        sort_by_ts(&mut fetched.items);
        fetched
    }

    /// Every message of a thread as the API returns it, parent included, oldest first.
    pub async fn fetch_thread(&self, channel_id: &str, parent_ts: &str) -> Fetched<Message> {
        let api = self.api;

        let mut fetched = collect_pages(&self.options.page_pacer, |cursor| {
            api.thread_replies(channel_id, parent_ts, cursor)
        })
        .await;

        let event = match &fetched.error {
            Some(e) => ArchiveEvent::ThreadFailed {
                channel_id: channel_id.to_string(),
                parent_ts: parent_ts.to_string(),
                loaded: fetched.items.len(),
                error: e.to_string(),
                transient: e.is_transient(),
            },
            None => ArchiveEvent::ThreadFetched {
                channel_id: channel_id.to_string(),
                parent_ts: parent_ts.to_string(),
                count: fetched.items.len(),
            },
        };
        self.observer.event(&event);
        sort_by_ts(&mut fetched.items);
        fetched
    }

    /// Snapshot one channel into a new archive document and return its path.
    pub async fn archive_channel(
        &self,
        channel_id: &str,
        channel_name: &str,
        include_threads: bool,
    ) -> Result<PathBuf> {
        let info = self
            .api
            .channel_info(channel_id)
            .await
            .map_err(|e| AppError::ChannelInfo {
                channel: channel_id.to_string(),
                message: e.to_string(),
            })?;

        let history = self.fetch_history(channel_id, None, None).await;

        let mut messages = Vec::with_capacity(history.items.len());
        for message in history.into_items() {
            let thread = if include_threads && message.has_replies() {
                let fetched = self.fetch_thread(channel_id, &message.ts).await;
                Some(self.embed_replies(&message.ts, fetched.into_items()))
            } else {
                None
            };

            let mut archived = self.enrich(message);
            archived.thread_messages = thread;
            messages.push(archived);
        }

        let now = Local::now();
        let document = ArchiveDocument {
            metadata: ArchiveMetadata {
                archived_at: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
                channel_id: channel_id.to_string(),
                channel_name: channel_name.to_string(),
                channel_topic: info.topic_text().to_string(),
                channel_purpose: info.purpose_text().to_string(),
                is_private: info.is_private,
                created: info.created,
                member_count: info.member_count.unwrap_or(0),
            },
            message_count: messages.len(),
            messages,
        };

        let stem = format!(
            "{}_{}",
            sanitize_file_stem(channel_name),
            now.format("%Y%m%d_%H%M%S")
        );
        let path = write_new_json(&self.options.archive_dir, &stem, &document)?;

        self.observer.event(&ArchiveEvent::ChannelArchived {
            channel_name: channel_name.to_string(),
            message_count: document.message_count,
            path: path.clone(),
        });
        Ok(path)
    }

    /// Archive every enumerated channel, one after the other.
    pub async fn archive_all(
        &self,
        exclude_archived: bool,
        include_threads: bool,
        only_joined: bool,
    ) -> ArchiveReport {
        let channels = self
            .list_channels(exclude_archived, only_joined)
            .await
            .into_items();
        let targets: Vec<(String, Option<Channel>)> = channels
            .into_iter()
            .map(|c| (c.id.clone(), Some(c)))
            .collect();
        self.archive_targets(targets, include_threads).await
    }

    /// Archive the channels named by id or name; unknown selectors count as failures.
    pub async fn archive_channels(
        &self,
        selectors: &[String],
        exclude_archived: bool,
        include_threads: bool,
        only_joined: bool,
    ) -> ArchiveReport {
        let channels = self
            .list_channels(exclude_archived, only_joined)
            .await
            .into_items();
        let targets = selectors
            .iter()
            .map(|selector| (selector.clone(), find_channel(&channels, selector).cloned()))
            .collect();
        self.archive_targets(targets, include_threads).await
    }

    async fn archive_targets(
        &self,
        targets: Vec<(String, Option<Channel>)>,
        include_threads: bool,
    ) -> ArchiveReport {
        let total = targets.len();
        let mut report = ArchiveReport {
            total,
            ..ArchiveReport::default()
        };

        let mut started = false;
        for (i, (selector, channel)) in targets.into_iter().enumerate() {
            let Some(channel) = channel else {
                self.observer.event(&ArchiveEvent::ChannelFailed {
                    channel_name: selector.clone(),
                    error: AppError::ChannelNotFound(selector.clone()).to_string(),
                });
                report.failed.push(selector);
                continue;
            };

            // Pause only between two channels that are actually fetched.
            if started {
                self.options.channel_pacer.pause().await;
            }
            started = true;

            let channel_name = display_channel_name(&channel);
            self.observer.event(&ArchiveEvent::ChannelStarted {
                channel_id: channel.id.clone(),
                channel_name: channel_name.to_string(),
                position: i + 1,
                total,
            });

            match self
                .archive_channel(&channel.id, channel_name, include_threads)
                .await
            {
                Ok(path) => report.saved.push(path),
                Err(e) => {
                    self.observer.event(&ArchiveEvent::ChannelFailed {
                        channel_name: channel_name.to_string(),
                        error: e.to_string(),
                    });
                    report.failed.push(channel_name.to_string());
                }
            }
        }

        self.observer.event(&ArchiveEvent::BatchFinished {
            archived: report.saved.len(),
            total,
            failed: report.failed.clone(),
        });
        report
    }

    fn embed_replies(&self, parent_ts: &str, thread: Vec<Message>) -> Vec<ArchivedMessage> {
        thread
            .into_iter()
            .filter(|reply| reply.ts != parent_ts)
            .map(|reply| self.enrich(reply))
            .collect()
    }

    fn enrich(&self, message: Message) -> ArchivedMessage {
        let user_name = match &message.user {
            Some(user) => self.users.resolve(user),
            None => [&message.username, &message.bot_id]
                .into_iter()
                .flatten()
                .find(|name| !name.is_empty())
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
        };

        let timestamp_readable = readable_timestamp(&message.ts);
        if timestamp_readable.is_none() {
            self.observer.event(&ArchiveEvent::TimestampUnparsable {
                ts: message.ts.clone(),
            });
        }

        ArchivedMessage {
            is_system: message.is_system(),
            message,
            user_name,
            timestamp_readable,
            thread_messages: None,
        }
    }
}

fn display_channel_name(channel: &Channel) -> &str {
    if channel.name.is_empty() {
        &channel.id
    } else {
        &channel.name
    }
}

/// Find a channel by id first, then by name (a leading `#` is ignored).
pub fn find_channel<'c>(channels: &'c [Channel], selector: &str) -> Option<&'c Channel> {
    let name = selector.strip_prefix('#').unwrap_or(selector);
    channels
        .iter()
        .find(|c| c.id == selector)
        .or_else(|| channels.iter().find(|c| c.name == name))
}
