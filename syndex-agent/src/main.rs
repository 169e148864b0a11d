//! # Syndex Agent
//!
//! Bridge daemon between a Syncthing instance and an ownCloud/Nextcloud
//! file index.
//!
//! The agent polls the sync daemon's REST event stream, reduces change
//! notifications to a minimal set of indexer paths, and runs
//! `occ files:scan` for each of them, one at a time. It keeps no state
//! on disk: restarts re-observe the daemon and replay from the start of
//! its current epoch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use syndex_core::{
    Bridge, BridgeConfig, FolderMap, OccConfig, OccScanRunner, SyncthingClient, TransportConfig,
    parse_map_spec,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "syndex-agent")]
#[command(about = "Bridge a Syncthing instance to an ownCloud/Nextcloud file index")]
struct Cli {
    /// Base URL of the Syncthing REST API
    #[arg(
        long,
        env = "SYNDEX_TARGET",
        default_value = "http://localhost:8384"
    )]
    target: Url,

    /// Syncthing API key
    #[arg(long, env = "SYNDEX_API_KEY", conflicts_with = "api_key_from_stdin")]
    api_key: Option<String>,

    /// Read the API key from the first line of stdin instead
    #[arg(long)]
    api_key_from_stdin: bool,

    /// Accept the daemon's TLS certificate without verification
    #[arg(long)]
    insecure: bool,

    /// Path to the indexer's occ script
    #[arg(long, env = "SYNDEX_OCC", value_name = "FILE")]
    occ: PathBuf,

    /// PHP interpreter used to run occ
    #[arg(long, default_value = "php")]
    php: String,

    /// Ask files:scan not to recurse into subdirectories
    #[arg(long)]
    shallow: bool,

    /// TOML file mapping folder ids to indexer destinations
    #[arg(long, env = "SYNDEX_MAPPINGS", value_name = "FILE")]
    mappings: Option<PathBuf>,

    /// Inline folder mapping (repeatable)
    #[arg(long = "map", value_name = "FOLDER=OWNER:DEST")]
    map: Vec<String>,
}

fn resolve_api_key(cli: &Cli) -> anyhow::Result<String> {
    if cli.api_key_from_stdin {
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("failed to read API key from stdin")?;
        let key = line.trim().to_string();
        if key.is_empty() {
            anyhow::bail!("stdin did not provide an API key");
        }
        return Ok(key);
    }
    cli.api_key.clone().ok_or_else(|| {
        anyhow::anyhow!("an API key is required (--api-key or --api-key-from-stdin)")
    })
}

fn load_mapper(cli: &Cli) -> anyhow::Result<FolderMap> {
    let mut mapper = match &cli.mappings {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read mapping file {}", path.display()))?;
            FolderMap::from_toml_str(&text)
                .with_context(|| format!("failed to parse mapping file {}", path.display()))?
        }
        None => FolderMap::default(),
    };
    for spec in &cli.map {
        let (folder, entry) = parse_map_spec(spec)?;
        mapper.insert(folder, entry);
    }
    if mapper.is_empty() {
        anyhow::bail!("no folder mappings configured; pass --mappings and/or --map");
    }
    Ok(mapper)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_key = resolve_api_key(&cli)?;
    let mapper = load_mapper(&cli)?;

    let mut transport_config = TransportConfig::new(cli.target.clone(), api_key);
    transport_config.insecure = cli.insecure;

    let mut occ_config = OccConfig::new(cli.occ.clone());
    occ_config.php_path = cli.php.clone();
    occ_config.shallow = cli.shallow;

    info!(
        target = %cli.target,
        folders = mapper.len(),
        occ = %cli.occ.display(),
        insecure = cli.insecure,
        shallow = cli.shallow,
        "starting bridge"
    );

    let transport = Arc::new(SyncthingClient::new(&transport_config)?);
    let runner = Arc::new(OccScanRunner::new(occ_config));
    Bridge::new(transport, mapper, runner, BridgeConfig::default())
        .run()
        .await
        .context("bridge terminated")
}
