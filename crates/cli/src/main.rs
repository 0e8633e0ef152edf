//! DA Client
//!
//! Command line entry point for the DA ledger: lists and registers nodes,
//! registers node groups and namespaces, and runs submission cycles that
//! anchor attested commitments on the commitment ledger.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use da_attestation::{AttestationCollector, JsonRpcTransport};
use da_client::{random_payload, CycleConfig, DigestCommitmentEngine, SubmissionCycle};
use da_ledger::{
    Ledger, NamespaceRegistry, NodeDirectory, NodeGroupRegistry, RpcLedger, RpcLedgerConfig,
};
use da_types::{NamespaceKey, NodeGroupKey, NodeInfo, MAX_BLOB_SIZE};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::{load_keypair, parse_addresses, parse_key, ClientConfig};

/// DA ledger client
#[derive(Parser, Debug)]
#[command(name = "da-client")]
#[command(about = "Register DA nodes and submit attested data commitments", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Ledger RPC URL
    #[arg(long, env = "DA_RPC_URL", default_value = "http://127.0.0.1:8899", global = true)]
    rpc_url: String,

    /// Keypair file used to sign ledger transactions
    #[arg(long, env = "DA_KEYPAIR", global = true)]
    keypair: Option<PathBuf>,

    /// Base58 private key, used when no keypair file is given
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true, global = true)]
    private_key: Option<String>,

    /// Node manager program id
    #[arg(long, env = "DA_NODE_MANAGER", default_value = "", global = true)]
    node_manager: String,

    /// Storage manager program id
    #[arg(long, env = "DA_STORAGE_MANAGER", default_value = "", global = true)]
    storage_manager: String,

    /// Commitment manager program id
    #[arg(long, env = "DA_COMMITMENT_MANAGER", default_value = "", global = true)]
    commitment_manager: String,

    /// Per-node attestation timeout in seconds
    #[arg(long, default_value = "30", global = true)]
    node_timeout_secs: u64,

    /// Transaction confirmation timeout in seconds
    #[arg(long, default_value = "90", global = true)]
    confirm_timeout_secs: u64,

    /// Submission record lifetime in seconds
    #[arg(long, default_value = "36000", global = true)]
    expiry_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List active broadcast nodes
    BroadcastNodes,
    /// List active storage nodes
    StorageNodes,
    /// Register a node group, or reuse it if it already exists
    RegisterNodeGroup {
        /// Ordered member addresses
        #[arg(long, value_delimiter = ',', required = true)]
        members: Vec<String>,
        /// Signatures required for a valid submission
        #[arg(long)]
        threshold: u64,
    },
    /// Register a namespace, or reuse it if it already exists
    RegisterNamespace {
        /// Ordered storage node addresses
        #[arg(long, value_delimiter = ',', required = true)]
        members: Vec<String>,
    },
    /// Register the signing account as a broadcast node
    RegisterBroadcastNode(NodeArgs),
    /// Register the signing account as a storage node
    RegisterStorageNode(NodeArgs),
    /// Run submission cycles against a node group
    Submit {
        /// Node group key (base58)
        #[arg(long, env = "DA_NODE_GROUP")]
        node_group: String,
        /// Namespace key (base58); empty submits without a namespace
        #[arg(long, env = "DA_NAMESPACE", default_value = "")]
        namespace: String,
        /// Seconds to wait after each cycle
        #[arg(long, default_value = "300")]
        interval_secs: u64,
        /// Random payload size in bytes
        #[arg(long, default_value_t = MAX_BLOB_SIZE)]
        payload_size: usize,
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
}

#[derive(Args, Debug)]
struct NodeArgs {
    /// Public RPC URL of the node
    #[arg(long)]
    url: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    location: String,
    #[arg(long)]
    staked_tokens: u64,
    /// Storage capacity in bytes
    #[arg(long)]
    max_storage_space: u64,
}

impl NodeArgs {
    fn into_info(self) -> NodeInfo {
        NodeInfo {
            url: self.url,
            name: self.name,
            location: self.location,
            staked_tokens: self.staked_tokens,
            max_storage_space: self.max_storage_space,
            ..Default::default()
        }
    }
}

impl GlobalArgs {
    fn client_config(&self, interval_secs: u64) -> ClientConfig {
        ClientConfig {
            rpc_url: self.rpc_url.clone(),
            node_manager: self.node_manager.clone(),
            storage_manager: self.storage_manager.clone(),
            commitment_manager: self.commitment_manager.clone(),
            node_timeout_secs: self.node_timeout_secs,
            confirm_timeout_secs: self.confirm_timeout_secs,
            expiry_secs: self.expiry_secs,
            interval_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.global.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let interval_secs = match &cli.command {
        Command::Submit { interval_secs, .. } => *interval_secs,
        _ => ClientConfig::default().interval_secs,
    };
    let config = cli.global.client_config(interval_secs);
    let ledger = connect(&cli.global, &config)?;

    match cli.command {
        Command::BroadcastNodes => {
            let nodes = NodeDirectory::new(ledger).list_broadcast_nodes().await?;
            print_nodes(&nodes)
        }
        Command::StorageNodes => {
            let nodes = NodeDirectory::new(ledger).list_storage_nodes().await?;
            print_nodes(&nodes)
        }
        Command::RegisterNodeGroup { members, threshold } => {
            let members = parse_addresses("member", &members)?;
            let key = NodeGroupRegistry::new(ledger)
                .register(&members, threshold)
                .await?;
            println!("{}", key);
            Ok(())
        }
        Command::RegisterNamespace { members } => {
            let members = parse_addresses("member", &members)?;
            let key = NamespaceRegistry::new(ledger).register(&members).await?;
            println!("{}", key);
            Ok(())
        }
        Command::RegisterBroadcastNode(node) => {
            let signature = NodeDirectory::new(ledger)
                .register_broadcast_node(node.into_info())
                .await?;
            println!("{}", signature);
            Ok(())
        }
        Command::RegisterStorageNode(node) => {
            let signature = NodeDirectory::new(ledger)
                .register_storage_node(node.into_info())
                .await?;
            println!("{}", signature);
            Ok(())
        }
        Command::Submit {
            node_group,
            namespace,
            payload_size,
            once,
            ..
        } => {
            let node_group_key: NodeGroupKey = parse_key("node group", &node_group)?;
            let namespace_key: NamespaceKey = parse_key("namespace", &namespace)?;
            run_submit(ledger, &config, node_group_key, namespace_key, payload_size, once).await
        }
    }
}

/// Build the ledger client; every setting is checked before the first request
fn connect(global: &GlobalArgs, config: &ClientConfig) -> Result<Arc<dyn Ledger>> {
    let keypair = load_keypair(global.keypair.as_deref(), global.private_key.as_deref())?;
    let mut ledger_config = RpcLedgerConfig::new(&config.rpc_url, config.programs()?);
    ledger_config.confirm_timeout = config.confirm_timeout()?;

    let ledger = RpcLedger::new(ledger_config, keypair)?;
    tracing::info!("Using ledger {} as {}", config.rpc_url, ledger.payer());
    Ok(Arc::new(ledger))
}

async fn run_submit(
    ledger: Arc<dyn Ledger>,
    config: &ClientConfig,
    node_group_key: NodeGroupKey,
    namespace_key: NamespaceKey,
    payload_size: usize,
    once: bool,
) -> Result<()> {
    let node_timeout = config.node_timeout()?;
    let transport = Arc::new(JsonRpcTransport::new(node_timeout));
    let collector =
        AttestationCollector::new(ledger.clone(), transport).with_node_timeout(node_timeout);
    let cycle_config = CycleConfig::new(node_group_key, namespace_key).with_expiry(config.expiry()?);
    let cycle = SubmissionCycle::new(
        ledger,
        Arc::new(DigestCommitmentEngine),
        collector,
        cycle_config,
    );

    tracing::info!("Starting DA submission");
    tracing::info!("  Node group: {}", node_group_key);
    tracing::info!("  Namespace: {}", namespace_key);
    tracing::info!("  Payload size: {} bytes", payload_size);

    if once {
        let report = cycle.run_once(random_payload(payload_size)).await?;
        println!("{}", report.signature);
        return Ok(());
    }

    tracing::info!("  Interval: {}s", config.interval_secs);
    tracing::info!("Press Ctrl+C to stop.");

    tokio::select! {
        stats = cycle.run_periodic(config.interval(), || random_payload(payload_size), None) => {
            tracing::info!("Submission stopped: {} succeeded, {} failed", stats.succeeded, stats.failed);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down...");
        }
    }

    Ok(())
}

fn print_nodes(nodes: &[NodeInfo]) -> Result<()> {
    if nodes.is_empty() {
        tracing::info!("No active nodes registered");
    }
    for (index, node) in nodes.iter().enumerate() {
        println!("{}", format_node(index, node));
    }
    Ok(())
}

fn format_node(index: usize, node: &NodeInfo) -> String {
    format!(
        "{} addr={} url={} name={} location={} staked_tokens={} max_storage_space={}",
        index,
        node.addr,
        node.url,
        node.name,
        node.location,
        node.staked_tokens,
        node.max_storage_space
    )
}
