use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use slack_morphism::errors::SlackClientError;
use slack_morphism::prelude::*;

use crate::model::{Channel, Message, User};
use crate::pagination::Page;
use crate::settings::ApiSettings;
use crate::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Public,
    Private,
}

/// The workspace calls the archiver depends on.
///
/// Every paginated call takes the cursor from the previous page (`None` for the first
/// request) and reports whether more pages follow.
#[async_trait]
pub trait WorkspaceApi: Send + Sync {
    async fn list_users(&self, cursor: Option<String>) -> Result<Page<User>>;

    async fn list_channels(
        &self,
        types: &[ChannelType],
        exclude_archived: bool,
        cursor: Option<String>,
    ) -> Result<Page<Channel>>;

    async fn channel_info(&self, channel_id: &str) -> Result<Channel>;

    async fn history(
        &self,
        channel_id: &str,
        oldest: Option<&str>,
        latest: Option<&str>,
        cursor: Option<String>,
    ) -> Result<Page<Message>>;

    async fn thread_replies(
        &self,
        channel_id: &str,
        parent_ts: &str,
        cursor: Option<String>,
    ) -> Result<Page<Message>>;
}

/// Slack Web API client backed by slack-morphism.
pub struct SlackWorkspace {
    client: SlackHyperClient,
    token: SlackApiToken,
    page_limit: u16,
    history_limit: u16,
}

impl SlackWorkspace {
    pub fn new(token: &str, api: &ApiSettings) -> Result<Self> {
        let connector = SlackClientHyperConnector::new()
            .map_err(|e| AppError::SlackApi(format!("failed to create connector: {}", e)))?;

        Ok(Self {
            client: SlackClient::new(connector),
            token: SlackApiToken::new(SlackApiTokenValue(token.to_string())),
            page_limit: api.page_limit,
            history_limit: api.history_limit,
        })
    }
}

#[async_trait]
impl WorkspaceApi for SlackWorkspace {
    async fn list_users(&self, cursor: Option<String>) -> Result<Page<User>> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiUsersListRequest::new()
            .with_limit(self.page_limit)
            .opt_cursor(cursor.map(SlackCursorId));

        let response = session.users_list(&request).await.map_err(api_error)?;
        wire_page(&response, "members")
    }

    async fn list_channels(
        &self,
        types: &[ChannelType],
        exclude_archived: bool,
        cursor: Option<String>,
    ) -> Result<Page<Channel>> {
        let session = self.client.open_session(&self.token);
        let types = types
            .iter()
            .map(|t| match t {
                ChannelType::Public => SlackConversationType::Public,
                ChannelType::Private => SlackConversationType::Private,
            })
            .collect();
        let request = SlackApiConversationsListRequest::new()
            .with_limit(self.page_limit)
            .with_types(types)
            .with_exclude_archived(exclude_archived)
            .opt_cursor(cursor.map(SlackCursorId));

        let response = session
            .conversations_list(&request)
            .await
            .map_err(api_error)?;

        wire_page(&response, "channels")
    }

    async fn channel_info(&self, channel_id: &str) -> Result<Channel> {
        let session = self.client.open_session(&self.token);
        let response = session
            .conversations_info(&info_request(channel_id))
            .await
            .map_err(api_error)?;

        convert(&response.channel)
    }

    async fn history(
        &self,
        channel_id: &str,
        oldest: Option<&str>,
        latest: Option<&str>,
        cursor: Option<String>,
    ) -> Result<Page<Message>> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiConversationsHistoryRequest::new()
            .with_channel(SlackChannelId(channel_id.to_string()))
            .opt_oldest(oldest.map(|ts| SlackTs(ts.to_string())))
            .opt_latest(latest.map(|ts| SlackTs(ts.to_string())))
            .with_limit(self.history_limit)
            .opt_cursor(cursor.map(SlackCursorId));

        let response = session
            .conversations_history(&request)
            .await
            .map_err(api_error)?;
        wire_page(&response, "messages")
    }

    async fn thread_replies(
        &self,
        channel_id: &str,
        parent_ts: &str,
        cursor: Option<String>,
    ) -> Result<Page<Message>> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiConversationsRepliesRequest::new(
            SlackChannelId(channel_id.to_string()),
            SlackTs(parent_ts.to_string()),
        )
        .with_limit(self.history_limit)
        .opt_cursor(cursor.map(SlackCursorId));

        let response = session
            .conversations_replies(&request)
            .await
            .map_err(api_error)?;
        wire_page(&response, "messages")
    }
}

/// `conversations.info` omits `num_members` unless asked for it.
fn info_request(channel_id: &str) -> SlackApiConversationsInfoRequest {
    SlackApiConversationsInfoRequest::new(SlackChannelId(channel_id.to_string()))
        .with_include_num_members(true)
}

fn api_error(e: SlackClientError) -> AppError {
    match e {
        SlackClientError::RateLimitError(rate) => AppError::SlackRateLimit {
            retry_after_secs: rate.retry_after.map(|d| d.as_secs()).unwrap_or(0),
        },
        other => AppError::SlackApi(other.to_string()),
    }
}

fn payload_error(e: serde_json::Error) -> AppError {
    AppError::SlackApi(format!("unexpected response payload: {}", e))
}

/// Re-read a typed slack-morphism value through its wire JSON.
fn convert<S: Serialize, T: DeserializeOwned>(value: &S) -> Result<T> {
    serde_json::to_value(value)
        .and_then(serde_json::from_value)
        .map_err(payload_error)
}

/// Build a page from a list response: the items under `items_key`, the continuation
/// cursor, and `has_more` when the endpoint reports it.
fn wire_page<S: Serialize, T: DeserializeOwned>(response: &S, items_key: &str) -> Result<Page<T>> {
    let mut raw = serde_json::to_value(response).map_err(payload_error)?;

    let items = match raw.get_mut(items_key).map(serde_json::Value::take) {
        Some(serde_json::Value::Null) | None => Vec::new(),
        Some(value) => serde_json::from_value(value).map_err(payload_error)?,
    };
    let cursor = raw
        .pointer("/response_metadata/next_cursor")
        .and_then(|c| c.as_str())
        .map(str::to_string);

    let page = Page::listing(items, cursor);
    Ok(match raw.get("has_more").and_then(|v| v.as_bool()) {
        Some(has_more) => Page { has_more, ..page },
        None => page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_page_listing_follows_cursor() {
        let response = json!({
            "channels": [{ "id": "C1", "name": "general" }],
            "response_metadata": { "next_cursor": "dXNlcjpVMDYx" }
        });
        let page: Page<Channel> = wire_page(&response, "channels").unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.continuation(), Some("dXNlcjpVMDYx"));

        let response = json!({
            "members": [],
            "response_metadata": { "next_cursor": "" }
        });
        let page: Page<User> = wire_page(&response, "members").unwrap();
        assert!(!page.has_more);
        assert_eq!(page.continuation(), None);
    }

    #[test]
    fn test_wire_page_uses_has_more() {
        let response = json!({
            "messages": [{ "ts": "1.0", "text": "a" }, { "ts": "2.0", "text": "b" }],
            "has_more": false,
            "response_metadata": { "next_cursor": "stale" }
        });
        let page: Page<Message> = wire_page(&response, "messages").unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.continuation(), None);

        let response = json!({ "messages": null, "has_more": false });
        let page: Page<Message> = wire_page(&response, "messages").unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_convert_reads_wire_json() {
        let raw = json!({
            "ts": "1700000000.000100",
            "user": "U1",
            "text": "hi",
            "reply_count": 3
        });
        let message: Message = convert(&raw).unwrap();
        assert_eq!(message.user.as_deref(), Some("U1"));
        assert_eq!(message.reply_count, Some(3));
    }

    #[test]
    fn test_channel_info_carries_member_count() {
        let request = info_request("C1");
        assert_eq!(request.channel.0, "C1");
        assert_eq!(request.include_num_members, Some(true));

        let raw = json!({
            "id": "C1",
            "name": "general",
            "is_private": false,
            "num_members": 7
        });
        let channel: Channel = convert(&raw).unwrap();
        assert_eq!(channel.member_count, Some(7));
    }

    #[test]
    fn test_convert_reports_payload_errors() {
        let raw = json!({ "text": "no ts" });
        let result: Result<Message> = convert(&raw);
        assert!(matches!(result, Err(AppError::SlackApi(_))));
    }
}
