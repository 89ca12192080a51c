use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use nebula_lib::commands;
use nebula_lib::core::config::{GeneratorConfig, CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "nebula", version, about = "Distribution manifest generator for Minecraft servers")]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Debug logging for the generator
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the directory layout of a new server
    InitServer {
        name: String,
        minecraft_version: String,
        /// Forge version written into servermeta.json
        #[arg(long)]
        forge: Option<String>,
    },
    /// Generate the distribution entry of a server
    GenerateServer {
        /// `<name>-<minecraft version>`
        id: String,
        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    nebula_lib::init_tracing(cli.verbose);

    let config = match GeneratorConfig::load(Some(cli.config.as_path())) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let result = match cli.command {
        Command::InitServer {
            name,
            minecraft_version,
            forge,
        } => commands::init_server(config, &name, &minecraft_version, forge)
            .await
            .map(|path| info!("Server created at {:?}", path)),
        Command::GenerateServer { id, output } => {
            commands::generate_server(config, &id, output.as_deref(), &cancel)
                .await
                .map(|manifest| info!("{} module(s) in {}", manifest.modules.len(), manifest.id))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
