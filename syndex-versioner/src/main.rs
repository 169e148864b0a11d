//! Command-line front end for the versioner.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "syndex-versioner")]
#[command(about = "Archive and expire file versions for synced folders")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Move a replaced file into the versions tree
    Archive {
        /// Root of the synced folder
        folder: PathBuf,
        /// Path of the item, relative to the folder root
        item: String,
        /// Root of the versions tree
        versions_dir: PathBuf,
    },
    /// Expire old versions on the staggered schedule
    Clean {
        /// Root of the versions tree
        versions_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Archive {
            folder,
            item,
            versions_dir,
        } => {
            syndex_versioner::archive(&folder, &item, &versions_dir)
                .context("archive failed")?;
        }
        Command::Clean { versions_dir } => {
            let stats = syndex_versioner::clean(&versions_dir).context("clean failed")?;
            info!(
                removed_versions = stats.removed_versions,
                removed_dirs = stats.removed_dirs,
                path = %versions_dir.display(),
                "cleaning pass finished"
            );
        }
    }

    Ok(())
}
