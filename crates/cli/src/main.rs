mod config_commands;
mod send_command;

use std::{path::PathBuf, process::ExitCode};

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "inlet", version, about = "inlet: channel event gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Defaults to `info` for
    /// the gateway and `warn` for one-shot commands.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (skips discovery of ./inlet.toml and the user config dir).
    #[arg(long, global = true, env = "INLET_CONFIG")]
    config: Option<PathBuf>,

    // Gateway arguments (used when no subcommand is provided, or with `gateway` subcommand)
    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Gateway,
    /// Submit one event through the local pipeline and print its outcome.
    Send(send_command::SendArgs),
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

impl Cli {
    fn runs_gateway(&self) -> bool {
        matches!(self.command, None | Some(Commands::Gateway))
    }
}

/// Initialise tracing. Logs go to stderr so `inlet send` keeps stdout for
/// the result.
fn init_telemetry(cli: &Cli) {
    let level = cli.log_level.clone().unwrap_or_else(|| {
        if cli.runs_gateway() {
            "info".into()
        } else {
            "warn".into()
        }
    });
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Fatal error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        // Default: start gateway when no subcommand is provided
        None | Some(Commands::Gateway) => {
            let mut config = inlet_config::discover_and_load(cli.config.as_deref())?;

            // CLI args override config values
            if let Some(bind) = cli.bind {
                config.server.bind = bind;
            }
            if let Some(port) = cli.port {
                config.server.port = port;
            }

            info!(version = env!("CARGO_PKG_VERSION"), "inlet starting");
            inlet_gateway::start_gateway(config).await?;
            Ok(ExitCode::SUCCESS)
        },
        Some(Commands::Send(args)) => send_command::handle_send(args, cli.config.as_deref()).await,
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}
