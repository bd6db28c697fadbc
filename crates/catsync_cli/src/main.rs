//! catsync CLI
//!
//! Copies a product catalog from one title to another.
//!
//! # Commands
//!
//! - `list` - Print a title's catalog grouped by kind
//! - `copy` - Reconcile a target title's catalog with a source title's
//! - `version` - Show version information

mod commands;
mod transport;

use catsync_engine::EconomyConfig;
use clap::{Args, Parser, Subcommand};
use commands::copy::CopyOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Catalog reconciliation between titles.
#[derive(Parser, Debug)]
#[command(name = "catsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Request timeout in seconds
    #[arg(global = true, long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

/// One title and the secret key used to authenticate against it.
#[derive(Args, Debug)]
struct TitleArgs {
    /// Title id
    #[arg(long, env = "CATSYNC_TITLE")]
    title: String,

    /// Title secret key
    #[arg(long, env = "CATSYNC_SECRET", hide_env_values = true)]
    secret: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a title's catalog grouped by kind
    List {
        #[command(flatten)]
        title: TitleArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Copy currencies, items, bundles and stores to another title
    Copy {
        /// Title to copy from
        #[arg(long)]
        source_title: String,

        /// Secret key of the source title
        #[arg(long, env = "CATSYNC_SOURCE_SECRET", hide_env_values = true)]
        source_secret: String,

        /// Title to copy to
        #[arg(long)]
        target_title: String,

        /// Secret key of the target title
        #[arg(long, env = "CATSYNC_TARGET_SECRET", hide_env_values = true)]
        target_secret: String,

        /// Delete and recreate every currency and item
        #[arg(long)]
        full_recreate: bool,

        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,

        /// Maximum entities per create/delete call
        #[arg(short, long, default_value = "50")]
        batch_size: usize,

        /// Create items as drafts instead of publishing them
        #[arg(long)]
        no_publish: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let timeout = Duration::from_secs(cli.timeout);
    let title_config = |title: &str| EconomyConfig::for_title(title).with_timeout(timeout);

    match cli.command {
        Commands::List { title, format } => {
            let http = Arc::new(transport::ReqwestClient::new(timeout)?);
            commands::list::run(&http, title_config(&title.title), &title.secret, &format)?;
        }
        Commands::Copy {
            source_title,
            source_secret,
            target_title,
            target_secret,
            full_recreate,
            dry_run,
            batch_size,
            no_publish,
            format,
        } => {
            let options = CopyOptions {
                full_recreate,
                dry_run,
                batch_size,
                publish: !no_publish,
                format,
            };
            let http = Arc::new(transport::ReqwestClient::new(timeout)?);
            commands::copy::run(
                &http,
                (title_config(&source_title), &source_secret),
                (title_config(&target_title), &target_secret),
                &options,
            )?;
        }
        Commands::Version => {
            println!("catsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("catsync engine v{}", catsync_engine::VERSION);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn copy_flags_parse() {
        let cli = Cli::try_parse_from([
            "catsync",
            "copy",
            "--source-title",
            "SRC",
            "--source-secret",
            "s1",
            "--target-title",
            "TGT",
            "--target-secret",
            "s2",
            "--full-recreate",
            "--dry-run",
            "--batch-size",
            "10",
            "--no-publish",
            "--format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Copy {
                source_title,
                target_title,
                full_recreate,
                dry_run,
                batch_size,
                no_publish,
                format,
                ..
            } => {
                assert_eq!(source_title, "SRC");
                assert_eq!(target_title, "TGT");
                assert!(full_recreate && dry_run && no_publish);
                assert_eq!(batch_size, 10);
                assert_eq!(format, "json");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn list_takes_title_and_verbose_anywhere() {
        let cli = Cli::try_parse_from([
            "catsync", "list", "--title", "ABC", "--secret", "key", "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.timeout, 30);
        match cli.command {
            Commands::List { title, format } => {
                assert_eq!(title.title, "ABC");
                assert_eq!(format, "text");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn copy_requires_target() {
        let result = Cli::try_parse_from([
            "catsync",
            "copy",
            "--source-title",
            "SRC",
            "--source-secret",
            "s1",
        ]);
        assert!(result.is_err());
    }
}
