pub mod archiver;
pub mod cli;
pub mod commands;
pub mod error;
pub mod index;
pub mod model;
pub mod observer;
pub mod pagination;
pub mod reader;
pub mod render;
pub mod settings;
pub mod slack;
pub mod store;
pub mod users;

#[cfg(test)]
pub mod testing;

pub use archiver::{ArchiveReport, Archiver, ArchiverOptions};
pub use cli::{Cli, Commands};
pub use error::{AppError, Result};
pub use observer::{ArchiveEvent, Observer, TracingObserver};
pub use settings::Settings;

const TOKEN_VARS: [&str; 2] = ["SLACK_BOT_TOKEN", "SLACK_TOKEN"];

/// The token from `--token`, else from `SLACK_BOT_TOKEN`, else from `SLACK_TOKEN`.
pub fn load_token(explicit: Option<String>) -> Result<String> {
    resolve_token(explicit, |name| std::env::var(name).ok())
}

fn resolve_token(explicit: Option<String>, env: impl Fn(&str) -> Option<String>) -> Result<String> {
    explicit
        .into_iter()
        .chain(TOKEN_VARS.iter().filter_map(|&name| env(name)))
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
        .ok_or(AppError::MissingToken)
}
