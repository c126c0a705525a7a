use std::process::ExitCode;

use clap::Parser;
use slack_archiver::commands::{self, ArchiveRequest, RunContext};
use slack_archiver::{Cli, Commands, Result};
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    // The HTTPS connector needs a process-wide crypto provider.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    // Return rather than exit, so the dropped command removes its temporary files.
    let result = tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
            return ExitCode::from(EXIT_INTERRUPTED);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = RunContext::new(&cli.config, cli.archive_dir, cli.token)?;

    match cli.command {
        Commands::List { filter } => commands::run_list(&ctx, filter).await,
        Commands::Archive {
            all,
            channel,
            no_threads,
            filter,
            index,
        } => {
            let request = ArchiveRequest {
                all,
                channels: channel,
                no_threads,
                filter,
                index,
            };
            commands::run_archive(&ctx, &request).await
        }
        Commands::Index => commands::run_index(&ctx),
        Commands::Convert {
            input,
            format,
            output,
        } => commands::run_convert(&input, &format, output.as_deref()),
        Commands::Search {
            file,
            keyword,
            case_sensitive,
            user,
        } => commands::run_search(
            &ctx,
            &file,
            keyword.as_deref(),
            case_sensitive,
            user.as_deref(),
        ),
        Commands::Stats { file } => commands::run_stats(&ctx, file.as_deref()),
        Commands::ExportCsv { file, output } => {
            commands::run_export_csv(&ctx, &file, output.as_deref())
        }
        Commands::ListArchives => commands::run_list_archives(&ctx),
    }
}
