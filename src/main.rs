//! managed-config - application restrictions for managed devices
//!
//! Command-line entry point: resolves restriction schemas against
//! administrator overrides and shows what the sample screen would display.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use managed_config::commands::{
    InitConfigCommand, Inputs, ProvisionCommand, ResolveCommand, SayHelloCommand, WatchCommand,
};
use managed_config::core::{APP_NAME, VERSION};
use managed_config::provisioning::SystemValues;

/// CLI arguments for managed-config
#[derive(Parser, Debug)]
#[command(name = "managed-config")]
#[command(author, version, about = "Resolve application restrictions against administrator overrides")]
struct Cli {
    /// Verbosity level (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the schema and print values and display texts
    Resolve {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the hello message if the restrictions allow it
    SayHello {
        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Re-resolve whenever the overrides file changes
    Watch {
        #[command(flatten)]
        sources: SourceArgs,

        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,

        /// Stop after this many polls
        #[arg(long)]
        max_polls: Option<u64>,
    },

    /// Load device owner provisioning values from a directory
    Provision {
        /// Directory holding nfcprovisioning.json or nfcprovisioning.txt
        #[arg(default_value = ".")]
        directory: PathBuf,

        /// Locale of the provisioning device
        #[arg(long)]
        locale: Option<String>,

        /// Time zone of the provisioning device
        #[arg(long)]
        time_zone: Option<String>,

        /// SSID of the connected Wi-Fi network
        #[arg(long)]
        wifi_ssid: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration file
    InitConfig {
        /// Destination (defaults to the per-user config file)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// app_restrictions.xml to resolve (defaults to the bundled sample)
    #[arg(long, value_name = "PATH")]
    schema: Option<PathBuf>,

    /// Values resource file the schema refers to
    #[arg(long, value_name = "PATH")]
    resources: Option<PathBuf>,

    /// JSON file with the administrator overrides
    #[arg(long, value_name = "PATH")]
    overrides: Option<PathBuf>,
}

impl From<SourceArgs> for Inputs {
    fn from(args: SourceArgs) -> Self {
        Inputs {
            config: args.config,
            schema: args.schema,
            resources: args.resources,
            overrides: args.overrides,
        }
    }
}

/// Main entry point
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("{} v{} starting...", APP_NAME, VERSION);

    if let Err(e) = run(cli.command).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Resolve { sources, json } => {
            ResolveCommand {
                inputs: sources.into(),
                json,
            }
            .execute()
            .await?;
        }
        Command::SayHello { sources } => {
            SayHelloCommand {
                inputs: sources.into(),
            }
            .execute()
            .await?;
        }
        Command::Watch {
            sources,
            interval_ms,
            max_polls,
        } => {
            let handled = WatchCommand {
                inputs: sources.into(),
                interval: Duration::from_millis(interval_ms.max(1)),
                max_polls,
            }
            .execute()
            .await?;
            info!("Handled {} change notification(s)", handled);
        }
        Command::Provision {
            directory,
            locale,
            time_zone,
            wifi_ssid,
            json,
        } => {
            let defaults = SystemValues::default();
            let system = SystemValues {
                locale: locale.unwrap_or(defaults.locale),
                time_zone: time_zone.unwrap_or(defaults.time_zone),
                wifi_ssid,
                ..SystemValues::default()
            };
            ProvisionCommand {
                directory,
                system,
                json,
            }
            .execute()
            .await?;
        }
        Command::InitConfig { path, force } => {
            InitConfigCommand { path, force }.execute().await?;
        }
    }

    Ok(())
}
