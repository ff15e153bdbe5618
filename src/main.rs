/*!
 * Erst CLI - Command Line Interface
 *
 * Version: 0.3.0
 */

use clap::{Parser, Subcommand};
use erst::{
    cli_style::{self, endpoint_failures_table, print_error, print_warning, Theme},
    commands,
    config::AppConfig,
    error::{ErstError, Result, EXIT_SUCCESS},
    logging,
    rpc::{resolve_network, Client, Network, RpcError},
};
use erst_core_cache::{config::config_path, default_cache_root, GlobalCacheConfig};
use std::future::Future;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "erst")]
#[command(version, about = "Resilient access to Stellar Horizon and Soroban RPC providers", long_about = None)]
struct Cli {
    /// Network preset: mainnet, testnet or futurenet
    #[arg(short = 'n', long, global = true, value_parser = parse_network)]
    network: Option<Network>,

    /// General endpoint, tried in the order given (repeatable)
    #[arg(long = "rpc-url", value_name = "URL", global = true)]
    rpc_urls: Vec<String>,

    /// Bearer token for authenticated providers
    #[arg(long, global = true)]
    token: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Bypass the on-disk response cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Configuration file (default: ~/.erst/erst.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a transaction's envelope, result and meta XDR
    Tx {
        /// Transaction hash
        hash: String,

        /// Probe every public network for the hash first
        #[arg(long)]
        resolve: bool,
    },

    /// Fetch ledger entries by base64 key
    Entries {
        #[arg(required = true, value_name = "KEY")]
        keys: Vec<String>,
    },

    /// Show simulation endpoint health
    Health,

    /// Inspect and manage the on-disk cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show cache size and limits
    Status,

    /// Evict least-recently-used files
    Clean {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show or change cache limits
    Config {
        /// Size budget in bytes
        #[arg(long, value_name = "BYTES")]
        max_size: Option<u64>,

        /// Sweep automatically on startup
        #[arg(long, value_name = "BOOL")]
        auto_clean: Option<bool>,
    },
}

fn parse_network(value: &str) -> std::result::Result<Network, String> {
    value.parse().map_err(|e: RpcError| e.to_string())
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            report(&e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(network) = cli.network {
        config.network = network;
    }
    if !cli.rpc_urls.is_empty() {
        config.rpc_urls = cli.rpc_urls.clone();
    }
    if cli.token.is_some() {
        config.token = cli.token.clone();
    }
    if cli.no_cache {
        config.cache_enabled = false;
    }

    if let Err(e) = logging::init_logging(&config.log_config(cli.verbose)) {
        print_warning(&format!("Failed to initialize logging: {}", e));
    }

    let cache_root = default_cache_root()?;
    let cache_config = GlobalCacheConfig::load();
    commands::cache::auto_cleanup(&cache_root, &cache_config);

    match cli.command {
        Commands::Tx { hash, resolve } => block_on(async {
            if resolve {
                let token = config.resolved_token();
                let network = resolve_network(&hash, token.as_deref()).await?;
                cli_style::print_info(&format!("Transaction found on {}", Theme::primary(network)));
                config.network = network;
            }
            commands::rpc::tx(&connect(&config)?, &hash).await?;
            Ok::<(), ErstError>(())
        }),
        Commands::Entries { keys } => block_on(async {
            commands::rpc::entries(&connect(&config)?, &keys).await?;
            Ok::<(), ErstError>(())
        }),
        Commands::Health => block_on(async {
            commands::rpc::health(&connect(&config)?).await?;
            Ok::<(), ErstError>(())
        }),
        Commands::Cache(command) => handle_cache(command, &cache_root, cache_config),
    }
}

fn block_on<F>(future: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| ErstError::Other(format!("Failed to start async runtime: {}", e)))?;
    runtime.block_on(future)
}

fn connect(config: &AppConfig) -> Result<Client> {
    let client = config.client_builder().build()?;
    tracing::debug!(
        network = client.network_name(),
        horizon = client.current_url(),
        soroban = client.current_soroban_url(),
        "Client ready"
    );
    Ok(client)
}

fn handle_cache(command: CacheCommands, root: &Path, config: GlobalCacheConfig) -> Result<()> {
    match command {
        CacheCommands::Status => commands::cache::status(root, &config)?,
        CacheCommands::Clean { force } => {
            commands::cache::clean(root, &config, force)?;
        }
        CacheCommands::Config { max_size, auto_clean } => {
            commands::cache::configure(&config_path()?, config, max_size, auto_clean)?;
        }
    }
    Ok(())
}

fn report(err: &ErstError) {
    let suggestion = match err {
        ErstError::Rpc(e) if e.is_not_found() => Some("Check the hash or try --network / tx --resolve"),
        ErstError::Rpc(e) if e.is_rate_limited() => Some("Set --token or wait before retrying"),
        ErstError::Rpc(e) if e.is_verification_failure() => {
            Some("The provider returned data for keys that were not requested; try another --rpc-url")
        }
        ErstError::Config(_) => Some("Check ~/.erst/erst.toml or the --config file"),
        _ => None,
    };
    print_error(&err.to_string(), suggestion);

    if let ErstError::Rpc(RpcError::AllNodesFailed(failures)) = err {
        eprintln!("{}", endpoint_failures_table(failures));
    }
}
