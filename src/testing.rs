//! Scripted in-memory workspace for pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::model::{Channel, ChannelText, Message, User};
use crate::pagination::Page;
use crate::slack::{ChannelType, WorkspaceApi};
use crate::{AppError, Result};

/// Pages are addressed by index; the cursor for page `n` is `"page-n"`.
#[derive(Default)]
pub struct MockWorkspace {
    pub user_pages: Vec<Vec<User>>,
    pub users_fail_at: Option<usize>,
    pub channel_pages: Vec<Vec<Channel>>,
    pub channels_fail_at: Option<usize>,
    pub infos: HashMap<String, Channel>,
    pub history: HashMap<String, Vec<Vec<Message>>>,
    pub history_fail_at: HashMap<String, usize>,
    pub threads: HashMap<(String, String), Vec<Vec<Message>>>,
    /// Reply page, keyed by parent ts, at which `thread_replies` fails.
    pub threads_fail_at: HashMap<String, usize>,
    pub calls: Mutex<Vec<String>>,
}

impl MockWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(mut self, pages: Vec<Vec<User>>) -> Self {
        self.user_pages = pages;
        self
    }

    pub fn with_channel_pages(mut self, pages: Vec<Vec<Channel>>) -> Self {
        self.channel_pages = pages;
        self
    }

    /// Register a channel for both listing (single page) and info lookups.
    pub fn with_channel(mut self, channel: Channel) -> Self {
        if self.channel_pages.is_empty() {
            self.channel_pages.push(Vec::new());
        }
        if let Some(first) = self.channel_pages.first_mut() {
            first.push(channel.clone());
        }
        self.infos.insert(channel.id.clone(), channel);
        self
    }

    pub fn with_history(mut self, channel_id: &str, pages: Vec<Vec<Message>>) -> Self {
        self.history.insert(channel_id.to_string(), pages);
        self
    }

    pub fn with_thread(
        mut self,
        channel_id: &str,
        parent_ts: &str,
        pages: Vec<Vec<Message>>,
    ) -> Self {
        self.threads
            .insert((channel_id.to_string(), parent_ts.to_string()), pages);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

fn page_index(cursor: Option<&str>) -> usize {
    cursor
        .and_then(|c| c.strip_prefix("page-"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn serve<T: Clone>(pages: &[Vec<T>], index: usize) -> Page<T> {
    let items = pages.get(index).cloned().unwrap_or_default();
    if index + 1 < pages.len() {
        Page {
            items,
            has_more: true,
            next_cursor: Some(format!("page-{}", index + 1)),
        }
    } else {
        Page::last(items)
    }
}

#[async_trait]
impl WorkspaceApi for MockWorkspace {
    async fn list_users(&self, cursor: Option<String>) -> Result<Page<User>> {
        let index = page_index(cursor.as_deref());
        self.record(format!("users:{}", index));
        if self.users_fail_at == Some(index) {
            return Err(AppError::SlackApi("ratelimited".to_string()));
        }
        Ok(serve(&self.user_pages, index))
    }

    async fn list_channels(
        &self,
        _types: &[ChannelType],
        exclude_archived: bool,
        cursor: Option<String>,
    ) -> Result<Page<Channel>> {
        let index = page_index(cursor.as_deref());
        self.record(format!("channels:{}", index));
        if self.channels_fail_at == Some(index) {
            return Err(AppError::SlackApi("ratelimited".to_string()));
        }
        let mut page = serve(&self.channel_pages, index);
        if exclude_archived {
            page.items.retain(|c| !c.is_archived);
        }
        Ok(page)
    }

    async fn channel_info(&self, channel_id: &str) -> Result<Channel> {
        self.record(format!("info:{}", channel_id));
        self.infos
            .get(channel_id)
            .cloned()
            .ok_or_else(|| AppError::SlackApi("channel_not_found".to_string()))
    }

    async fn history(
        &self,
        channel_id: &str,
        _oldest: Option<&str>,
        _latest: Option<&str>,
        cursor: Option<String>,
    ) -> Result<Page<Message>> {
        let index = page_index(cursor.as_deref());
        self.record(format!("history:{}:{}", channel_id, index));
        if self.history_fail_at.get(channel_id) == Some(&index) {
            return Err(AppError::SlackApi("internal_error".to_string()));
        }
        let pages = self.history.get(channel_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(serve(pages, index))
    }

    async fn thread_replies(
        &self,
        channel_id: &str,
        parent_ts: &str,
        cursor: Option<String>,
    ) -> Result<Page<Message>> {
        let index = page_index(cursor.as_deref());
        self.record(format!("replies:{}:{}:{}", channel_id, parent_ts, index));
        if self.threads_fail_at.get(parent_ts) == Some(&index) {
            return Err(AppError::SlackRateLimit { retry_after_secs: 30 });
        }
        let key = (channel_id.to_string(), parent_ts.to_string());
        let pages = self.threads.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        Ok(serve(pages, index))
    }
}

pub fn channel(id: &str, name: &str) -> Channel {
    Channel {
        id: id.to_string(),
        name: name.to_string(),
        is_private: false,
        is_archived: false,
        is_member: true,
        member_count: Some(3),
        created: Some(1_600_000_000),
        topic: Some(ChannelText {
            value: format!("{} topic", name),
        }),
        purpose: None,
    }
}

pub fn user(id: &str, real_name: &str) -> User {
    User {
        id: id.to_string(),
        name: Some(real_name.to_lowercase()),
        real_name: Some(real_name.to_string()),
        profile: None,
    }
}

pub fn message(ts: &str, user: &str, text: &str) -> Message {
    Message {
        ts: ts.to_string(),
        user: Some(user.to_string()),
        text: text.to_string(),
        ..Default::default()
    }
}

pub fn parent(ts: &str, user: &str, text: &str, replies: u64) -> Message {
    Message {
        reply_count: Some(replies),
        thread_ts: Some(ts.to_string()),
        ..message(ts, user, text)
    }
}

pub fn reply(ts: &str, parent_ts: &str, user: &str, text: &str) -> Message {
    Message {
        thread_ts: Some(parent_ts.to_string()),
        ..message(ts, user, text)
    }
}
