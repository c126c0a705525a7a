//! Channel, message and archive document types.
//!
//! The raw types (`Channel`, `Message`, `User`) mirror the workspace API JSON and keep
//! unknown fields around so nothing the API returned is dropped from a snapshot. The
//! archive types describe the on-disk format written by the archiver and read back by
//! the index builder, the reader and the renderers.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};

/// Subtypes rendered as system notices rather than conversation.
pub const SYSTEM_SUBTYPES: &[&str] = &[
    "channel_join",
    "channel_leave",
    "group_join",
    "group_leave",
    "bot_add",
    "bot_remove",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelText {
    #[serde(default, deserialize_with = "nullable_string")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable_bool")]
    pub is_private: bool,
    #[serde(default, deserialize_with = "nullable_bool")]
    pub is_archived: bool,
    #[serde(default, deserialize_with = "nullable_bool")]
    pub is_member: bool,
    #[serde(default, rename = "num_members", skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient_epoch",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<ChannelText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<ChannelText>,
}

impl Channel {
    pub fn topic_text(&self) -> &str {
        self.topic.as_ref().map(|t| t.value.as_str()).unwrap_or("")
    }

    pub fn purpose_text(&self) -> &str {
        self.purpose.as_ref().map(|p| p.value.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}

impl User {
    /// Real name first, then the handle, then `"Unknown"`.
    pub fn display_name(&self) -> String {
        let profile_real_name = self.profile.as_ref().and_then(|p| p.real_name.as_deref());
        [self.real_name.as_deref(), profile_real_name, self.name.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
            .unwrap_or("Unknown")
            .to_string()
    }
}

/// A message as returned by history and thread-reply calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
    /// Everything else the API sent (blocks, files, reactions, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    pub fn has_replies(&self) -> bool {
        self.reply_count.is_some_and(|count| count > 0)
    }

    pub fn is_system(&self) -> bool {
        is_system_subtype(self.subtype.as_deref())
    }
}

pub fn is_system_subtype(subtype: Option<&str>) -> bool {
    subtype.is_some_and(|s| SYSTEM_SUBTYPES.contains(&s))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveMetadata {
    pub archived_at: String,
    pub channel_id: String,
    pub channel_name: String,
    pub channel_topic: String,
    pub channel_purpose: String,
    pub is_private: bool,
    pub created: Option<i64>,
    pub member_count: u64,
}

/// A message after enrichment, as stored in an archive document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchivedMessage {
    #[serde(flatten)]
    pub message: Message,
    #[serde(default)]
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_readable: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_system: bool,
    /// Replies only; the parent message itself is never repeated here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_messages: Option<Vec<ArchivedMessage>>,
}

impl ArchivedMessage {
    pub fn ts(&self) -> &str {
        &self.message.ts
    }

    pub fn text(&self) -> &str {
        &self.message.text
    }

    /// Display name, falling back to the raw author id.
    pub fn author(&self) -> &str {
        if !self.user_name.is_empty() {
            return &self.user_name;
        }
        self.message.user.as_deref().unwrap_or("Unknown")
    }

    /// Readable timestamp, falling back to the raw `ts`.
    pub fn when(&self) -> &str {
        self.timestamp_readable
            .as_deref()
            .unwrap_or(&self.message.ts)
    }

    pub fn is_system_notice(&self) -> bool {
        self.is_system || self.message.is_system()
    }

    pub fn replies(&self) -> &[ArchivedMessage] {
        self.thread_messages.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveDocument {
    /// Required: a JSON file without it is not an archive.
    pub metadata: ArchiveMetadata,
    #[serde(default)]
    pub messages: Vec<ArchivedMessage>,
    #[serde(default)]
    pub message_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub filename: String,
    pub channel_name: String,
    pub channel_id: String,
    pub message_count: usize,
    pub archived_at: String,
    pub file_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub created_at: String,
    pub archives: Vec<IndexEntry>,
}

/// Parse a fixed-point `seconds.micros` timestamp into `(seconds, micros)`.
pub fn parse_ts(ts: &str) -> Option<(i64, u32)> {
    let (secs, frac) = match ts.split_once('.') {
        Some((secs, frac)) => (secs, frac),
        None => (ts, ""),
    };
    let secs: i64 = secs.parse().ok()?;
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut digits: String = frac.chars().take(6).collect();
    while digits.len() < 6 {
        digits.push('0');
    }
    let micros: u32 = digits.parse().ok()?;
    Some((secs, micros))
}

/// Sort key for message timestamps; unparsable values sort first.
pub fn ts_key(ts: &str) -> Option<(i64, u32)> {
    parse_ts(ts)
}

pub fn sort_by_ts(messages: &mut [Message]) {
    messages.sort_by_key(|m| ts_key(&m.ts));
}

/// Local-time ISO-8601 rendering of a message timestamp.
pub fn readable_timestamp(ts: &str) -> Option<String> {
    let (secs, micros) = parse_ts(ts)?;
    let dt = Local.timestamp_opt(secs, micros * 1000).single()?;
    let formatted = if micros == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    };
    Some(formatted)
}

fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts epoch seconds as an integer, a float or a numeric string.
fn lenient_epoch<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(serde_json::Value::String(s)) => parse_ts(&s).map(|(secs, _)| secs),
        _ => None,
    })
}
