//! chainvote daemon: entry point for running the voting back end.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chainvote_node::{init_logging, ChainvoteNode, NodeConfig};
use chainvote_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment};
use clap::Parser;

#[derive(Parser)]
#[command(name = "chainvote-daemon", about = "Blockchain voting back end")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "CHAINVOTE_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB database.
    #[arg(long, env = "CHAINVOTE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// HTTP API port.
    #[arg(long, env = "CHAINVOTE_HTTP_PORT")]
    http_port: Option<u16>,

    /// Enable the WebSocket server.
    #[arg(long, env = "CHAINVOTE_ENABLE_WEBSOCKET")]
    websocket: bool,

    #[arg(long, env = "CHAINVOTE_WS_PORT")]
    websocket_port: Option<u16>,

    /// Ethereum JSON-RPC endpoint.
    #[arg(long, env = "CHAINVOTE_ETH_RPC_URL")]
    eth_rpc_url: Option<String>,

    /// Address of the deployed voting contract.
    #[arg(long, env = "CHAINVOTE_CONTRACT_ADDRESS")]
    contract_address: Option<String>,

    /// Require a one-time code with every vote.
    #[arg(long, env = "CHAINVOTE_REQUIRE_OTP")]
    require_otp: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "CHAINVOTE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "CHAINVOTE_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Node operations.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Database maintenance.
    #[command(name = "db")]
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    /// Configuration helpers.
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT/SIGTERM.
    Run,
}

#[derive(clap::Subcommand)]
enum DbAction {
    /// Check the database for corruption.
    Check,
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Print a configuration file with every default filled in.
    Init {
        /// Write to this path instead of stdout. Refuses to overwrite.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Load the file config (if any) and apply CLI/env overrides.
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => NodeConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
        if self.websocket {
            config.enable_websocket = true;
        }
        if let Some(port) = self.websocket_port {
            config.websocket_port = port;
        }
        if let Some(url) = &self.eth_rpc_url {
            config.eth_rpc_url = url.clone();
        }
        if let Some(address) = &self.contract_address {
            config.contract_address = address.clone();
        }
        if self.require_otp {
            config.require_otp_for_vote = true;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;

    match cli.command {
        Command::Node {
            action: NodeAction::Run,
        } => run_node(config).await,
        Command::Db {
            action: DbAction::Check,
        } => check_db(&config),
        Command::Config {
            action: ConfigAction::Init { output },
        } => init_config(&config, output.as_deref()),
    }
}

async fn run_node(config: NodeConfig) -> anyhow::Result<()> {
    init_logging(config.log_format()?, &config.log_level)?;
    tracing::info!(
        http = %config.http_addr(),
        websocket = if config.enable_websocket { "on" } else { "off" },
        otp_for_vote = config.require_otp_for_vote,
        "starting chainvote daemon"
    );

    let mut node = ChainvoteNode::new(config).context("failed to build node")?;
    node.run().await?;

    tracing::info!("chainvote daemon exited cleanly");
    Ok(())
}

fn check_db(config: &NodeConfig) -> anyhow::Result<()> {
    init_logging(config.log_format()?, &config.log_level)?;
    if !config.data_dir.exists() {
        anyhow::bail!("no database at {}", config.data_dir.display());
    }
    check_data_dir(&config.data_dir).map_err(anyhow::Error::msg)?;

    let env = LmdbEnvironment::open(&config.data_dir, 8, config.lmdb_map_size)?;
    let report = check_integrity(&env)?;
    println!(
        "checked {} databases, {} entries",
        report.databases_checked, report.total_entries
    );
    if report.is_healthy() {
        println!("database is healthy");
        Ok(())
    } else {
        for error in &report.errors {
            println!("  error: {error}");
        }
        anyhow::bail!("{} integrity errors found", report.errors.len())
    }
}

fn init_config(config: &NodeConfig, output: Option<&Path>) -> anyhow::Result<()> {
    let text = config.to_toml_string()?;
    match output {
        Some(path) => {
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
