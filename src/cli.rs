use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::settings::SETTINGS_FILE;

#[derive(Parser)]
#[command(name = "slack-archiver")]
#[command(about = "Archive Slack channels to JSON and convert the archives for reading")]
pub struct Cli {
    /// Slack bot token (defaults to SLACK_BOT_TOKEN, then SLACK_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Archive directory (overrides the settings file)
    #[arg(long, global = true)]
    pub archive_dir: Option<PathBuf>,

    /// Settings file path
    #[arg(long, global = true, default_value = SETTINGS_FILE)]
    pub config: PathBuf,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct ChannelFilter {
    /// Include archived channels
    #[arg(long)]
    pub include_archived: bool,

    /// Only channels the bot is a member of
    #[arg(long)]
    pub only_joined: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List public and private channels
    List {
        #[command(flatten)]
        filter: ChannelFilter,
    },

    /// Archive one or more channels, or all of them
    Archive {
        /// Archive every channel
        #[arg(long, conflicts_with = "channel", required_unless_present = "channel")]
        all: bool,

        /// Channel id or name, may be repeated
        #[arg(short, long)]
        channel: Vec<String>,

        /// Do not fetch thread replies
        #[arg(long)]
        no_threads: bool,

        #[command(flatten)]
        filter: ChannelFilter,

        /// Rebuild INDEX.json afterwards
        #[arg(long)]
        index: bool,
    },

    /// Rebuild INDEX.json from the archive directory
    Index,

    /// Convert an archive to HTML, Markdown or text
    Convert {
        /// Archive JSON file
        input: PathBuf,

        /// Output format: html, markdown, text or all
        #[arg(short, long, default_value = "html")]
        format: String,

        /// Output path without extension (defaults to the input path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Search the messages of an archive
    Search {
        /// Archive JSON file
        file: PathBuf,

        /// Keyword to look for in message text
        #[arg(required_unless_present = "user")]
        keyword: Option<String>,

        #[arg(long)]
        case_sensitive: bool,

        /// Only messages written by this user name
        #[arg(long)]
        user: Option<String>,
    },

    /// Statistics for one archive, or for the whole archive directory
    Stats {
        file: Option<PathBuf>,
    },

    /// Export the messages of an archive as CSV
    ExportCsv {
        file: PathBuf,

        /// Output CSV path (defaults to the input path with a .csv extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List archives in the archive directory
    ListArchives,
}
