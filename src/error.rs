use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("no Slack token given: pass --token or set SLACK_BOT_TOKEN")]
    MissingToken,

    #[error("Slack API error: {0}")]
    SlackApi(String),

    #[error("Slack rate limit error: retry after {retry_after_secs}s")]
    SlackRateLimit { retry_after_secs: u64 },

    #[error("failed to get channel info for {channel}: {message}")]
    ChannelInfo { channel: String, message: String },

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("failed to read file at {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write file at {path}: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("JSON serialization error: {0}")]
    JsonSerialize(String),

    #[error("malformed archive at {path}: {message}")]
    MalformedArchive { path: String, message: String },

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("invalid output format: {0}")]
    InvalidFormat(String),

    #[error("{failed} of {total} channels failed to archive")]
    BatchFailed { failed: usize, total: usize },

    #[error("invalid markup pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl AppError {
    /// Errors a paginated fetch can absorb as partial data.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::SlackApi(_) | AppError::SlackRateLimit { .. })
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
