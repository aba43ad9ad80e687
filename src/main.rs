use anyhow::Context;
use clap::{Parser, Subcommand};
use mcnet::{
    config::NetworkConfig,
    nbt::{self, Tag},
    network::{
        status::{ServerStatus, StatusListener},
        ListenerFactory, NetworkSystem, ServerConnection,
    },
    protocol::{packet::ServerHandler, ProtocolRegistry},
};
use mimalloc::MiMalloc;
use std::{path::PathBuf, sync::Arc, time::Duration};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[command(version, about = "Minecraft protocol and NBT tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints an NBT file (gzip or plain) as SNBT.
    NbtToSnbt { file: PathBuf },
    /// Converts an SNBT file to binary NBT.
    SnbtToNbt {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        gzip: bool,
    },
    /// Runs a server that answers status pings.
    Serve {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    match Cli::parse().command {
        Command::NbtToSnbt { file } => {
            let root = nbt::io::read_file(&file).with_context(|| format!("failed to read {}", file.display()))?;
            println!("{}", Tag::Compound(root).to_pretty_snbt("    "));
        }
        Command::SnbtToNbt { input, output, gzip } => {
            let text = fs_err::read_to_string(&input)?;
            let root = nbt::parse_snbt(text.trim())?;
            nbt::io::write_file(&root, &output, gzip)?;
            tracing::info!("Wrote {}", output.display());
        }
        Command::Serve { config } => {
            let config = match config {
                Some(path) => NetworkConfig::from_file(path)?,
                None => NetworkConfig::default(),
            };
            tokio::runtime::Runtime::new()?.block_on(serve(config))?;
        }
    }
    Ok(())
}

async fn serve(config: NetworkConfig) -> anyhow::Result<()> {
    let registry = Arc::new(ProtocolRegistry::vanilla());
    let system = NetworkSystem::new(registry, config.connection.clone());

    let status = ServerStatus {
        motd: config.motd.clone(),
        max_players: config.max_players,
        online_players: 0,
    };
    let factory: ListenerFactory =
        Arc::new(move |connection: &Arc<ServerConnection>| -> Arc<dyn ServerHandler> {
            StatusListener::new(connection, status.clone())
        });
    system.bind(config.bind_address.as_str(), factory).await?;
    tracing::info!("Started");

    let mut ticker = tokio::time::interval(Duration::from_secs(1) / config.tick_rate);
    loop {
        tokio::select! {
            _ = ticker.tick() => system.tick(),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("Stopping");
    system.stop();
    system.tick();
    Ok(())
}
