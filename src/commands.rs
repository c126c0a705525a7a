use std::path::{Path, PathBuf};

use crate::archiver::{ArchiveReport, Archiver, ArchiverOptions};
use crate::cli::ChannelFilter;
use crate::error::{AppError, Result};
use crate::index::build_index;
use crate::load_token;
use crate::model::ArchivedMessage;
use crate::observer::{Observer, TracingObserver};
use crate::reader::ArchiveReader;
use crate::render::{OutputFormat, convert_file};
use crate::settings::Settings;
use crate::slack::{SlackWorkspace, WorkspaceApi};
use crate::users::UserDirectory;

/// Settings and global flags shared by every command.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub settings: Settings,
    pub archive_dir: PathBuf,
    pub token: Option<String>,
}

impl RunContext {
    pub fn new(config: &Path, archive_dir: Option<PathBuf>, token: Option<String>) -> Result<Self> {
        let settings = Settings::load_from(config)?;
        let archive_dir = archive_dir.unwrap_or_else(|| PathBuf::from(&settings.archive.dir));
        Ok(Self {
            settings,
            archive_dir,
            token,
        })
    }

    /// Resolve the token before any network activity.
    fn workspace(&self) -> Result<SlackWorkspace> {
        let token = load_token(self.token.clone())?;
        SlackWorkspace::new(&token, &self.settings.api)
    }

    fn options(&self) -> ArchiverOptions {
        ArchiverOptions::from_settings(&self.settings, &self.archive_dir)
    }

    fn reader(&self) -> ArchiveReader {
        ArchiveReader::new(&self.archive_dir)
    }
}

/// What `archive` should do, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ArchiveRequest {
    pub all: bool,
    pub channels: Vec<String>,
    pub no_threads: bool,
    pub filter: ChannelFilter,
    pub index: bool,
}

pub async fn run_list(ctx: &RunContext, filter: ChannelFilter) -> Result<()> {
    let api = ctx.workspace()?;
    let observer = TracingObserver;
    let archiver = Archiver::new(&api, UserDirectory::default(), ctx.options(), &observer);

    let fetched = archiver
        .list_channels(!filter.include_archived, filter.only_joined)
        .await;

    println!("{:<12} {:<32} {:>8}  flags", "id", "name", "members");
    for channel in &fetched.items {
        let mut flags = Vec::new();
        if channel.is_private {
            flags.push("private");
        }
        if channel.is_archived {
            flags.push("archived");
        }
        if channel.is_member {
            flags.push("member");
        }
        let members = channel
            .member_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:<32} {:>8}  {}",
            channel.id,
            channel.name,
            members,
            flags.join(",")
        );
    }

    println!("{} channels", fetched.len());
    if fetched.truncated {
        println!("Warning: the channel list is incomplete (see log).");
    }
    Ok(())
}

pub async fn run_archive(ctx: &RunContext, request: &ArchiveRequest) -> Result<()> {
    let api = ctx.workspace()?;
    archive_with(&api, ctx, request, &TracingObserver).await
}

async fn archive_with<A: WorkspaceApi + ?Sized>(
    api: &A,
    ctx: &RunContext,
    request: &ArchiveRequest,
    observer: &dyn Observer,
) -> Result<()> {
    let include_threads = ctx.settings.archive.include_threads && !request.no_threads;
    let exclude_archived = !request.filter.include_archived;
    let only_joined = request.filter.only_joined;

    let archiver = Archiver::connect(api, ctx.options(), observer).await;

    let report = if request.all {
        archiver
            .archive_all(exclude_archived, include_threads, only_joined)
            .await
    } else {
        archiver
            .archive_channels(&request.channels, exclude_archived, include_threads, only_joined)
            .await
    };
    print_report(&report);

    if request.index {
        let path = build_index(&ctx.archive_dir, observer)?;
        println!("Index written to {}", path.display());
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(AppError::BatchFailed {
            failed: report.failed.len(),
            total: report.total,
        })
    }
}

fn print_report(report: &ArchiveReport) {
    println!("Archived {}/{} channels.", report.saved.len(), report.total);
    for path in &report.saved {
        println!("  {}", path.display());
    }
    if !report.failed.is_empty() {
        println!("Failed ({}): {}", report.failed.len(), report.failed.join(", "));
    }
}

pub fn run_index(ctx: &RunContext) -> Result<()> {
    let path = build_index(&ctx.archive_dir, &TracingObserver)?;
    println!("Index written to {}", path.display());
    Ok(())
}

pub fn run_convert(input: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let formats = OutputFormat::parse_selection(format)?;
    for path in convert_file(input, &formats, output)? {
        println!("Created {}", path.display());
    }
    Ok(())
}

pub fn run_search(
    ctx: &RunContext,
    file: &Path,
    keyword: Option<&str>,
    case_sensitive: bool,
    user: Option<&str>,
) -> Result<()> {
    let hits = search(&ctx.reader(), file, keyword, case_sensitive, user)?;
    for message in &hits {
        println!("[{}] {}: {}", message.when(), message.author(), message.text());
    }
    println!("{} matching messages", hits.len());
    Ok(())
}

fn search(
    reader: &ArchiveReader,
    file: &Path,
    keyword: Option<&str>,
    case_sensitive: bool,
    user: Option<&str>,
) -> Result<Vec<ArchivedMessage>> {
    let mut hits = match keyword {
        Some(keyword) => reader.search_messages(file, keyword, case_sensitive)?,
        None => reader.load(file)?.messages,
    };
    if let Some(user) = user {
        hits.retain(|m| m.user_name == user);
    }
    Ok(hits)
}

pub fn run_stats(ctx: &RunContext, file: Option<&Path>) -> Result<()> {
    let reader = ctx.reader();

    let Some(file) = file else {
        let stats = reader.directory_stats()?;
        println!("Archive directory: {}", ctx.archive_dir.display());
        println!("Archives: {}", stats.total_archives);
        println!("Messages: {}", stats.total_messages);
        println!("Size: {:.2} MB ({} bytes)", stats.total_size_mb, stats.total_size_bytes);
        for channel in &stats.channels {
            println!("  #{:<30} {:>8}", channel.name, channel.messages);
        }
        return Ok(());
    };

    let stats = reader.statistics(file)?;
    println!("Channel: #{}", stats.channel_name);
    println!("Archived at: {}", stats.archived_at);
    println!("Messages: {}", stats.total_messages);
    println!("Threads: {}", stats.total_threads);
    println!("Unique users: {}", stats.unique_users);
    println!("Members: {}", stats.member_count);
    println!("Top users:");
    for (i, (name, count)) in stats.top_users.iter().enumerate() {
        println!("  {:>2}. {:<30} {:>6}", i + 1, name, count);
    }
    Ok(())
}

pub fn run_export_csv(ctx: &RunContext, file: &Path, output: Option<&Path>) -> Result<()> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| file.with_extension("csv"));
    let rows = ctx.reader().export_csv(file, &output)?;
    println!("Exported {} messages to {}", rows, output.display());
    Ok(())
}

pub fn run_list_archives(ctx: &RunContext) -> Result<()> {
    let archives = ctx.reader().list_archives()?;

    for archive in &archives {
        println!(
            "{:<45} #{:<25} {:>7} messages  {}",
            archive.filename, archive.channel_name, archive.message_count, archive.archived_at
        );
    }
    println!("{} archives in {}", archives.len(), ctx.archive_dir.display());
    Ok(())
}
