//! Keyvault CLI
//!
//! Command-line interface for Keyvault - license key management.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use keyvault_core::{Config, KeyStore, Tier};

mod commands;
mod logging;
mod menu;
mod output;

use commands::api::StartOptions;
use menu::Menu;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "keyvault")]
#[command(about = "Keyvault - License key management")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Without a command, the interactive menu starts
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import keys from a text file, one key per line
    #[command(name = "import_file")]
    ImportFile {
        /// File to read
        path: PathBuf,
        /// Key type: 1 Daily, 2 Weekly, 3 Monthly, 4 Lifetime (others import as Daily)
        #[arg(allow_negative_numbers = true)]
        key_type: i64,
    },
    /// Copy the key file to a backup
    #[command(name = "backup_db")]
    BackupDb {
        /// Backup destination
        path: PathBuf,
    },
    /// Replace the key file with a backup
    #[command(name = "restore_db")]
    RestoreDb {
        /// Backup to restore from
        path: PathBuf,
    },
    /// Remove malformed lines from the key file
    #[command(name = "repair_db")]
    RepairDb,
    /// Run the REST API until interrupted
    #[command(name = "start_api")]
    StartApi {
        /// Port to listen on (defaults to api_port from the config)
        port: Option<u16>,
        /// "true" or "1" to request HTTPS
        use_https: Option<String>,
        /// TLS certificate file
        cert_file: Option<String>,
        /// TLS private key file
        key_file: Option<String>,
    },
    /// List keys
    #[command(alias = "ls")]
    List {
        /// Only keys of this type (1-4)
        #[arg(short, long, value_parser = clap::value_parser!(i64).range(1..=4))]
        tier: Option<i64>,
    },
    /// Show key statistics
    Stats,
    /// Find keys by Discord username
    Search {
        /// Username, or part of one
        user: String,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, data_file, api_key, api_host, api_port, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work even when the config file is broken
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    logging::init_logging(&config, output.is_quiet());

    let Some(command) = cli.command else {
        return run_menu(&config);
    };

    match command {
        Commands::ImportFile { path, key_type } => {
            let store = KeyStore::open(&config);
            commands::keys::import(&store, &path, key_type, &output)
        }
        Commands::BackupDb { path } => commands::maintenance::backup(&config, &path, &output),
        Commands::RestoreDb { path } => commands::maintenance::restore(&config, &path, &output),
        Commands::RepairDb => commands::maintenance::repair(&config, &output),
        Commands::StartApi {
            port,
            use_https,
            cert_file,
            key_file,
        } => {
            let options = StartOptions {
                port,
                use_https: use_https.as_deref().is_some_and(commands::api::parse_flag),
                cert_file,
                key_file,
            };
            commands::api::start(&config, options, &output).await
        }
        Commands::List { tier } => {
            let store = KeyStore::open(&config);
            commands::keys::list(&store, tier.map(Tier::from_choice), &output)
        }
        Commands::Stats => commands::keys::stats(&KeyStore::open(&config), &output),
        Commands::Search { user } => {
            commands::keys::search(&KeyStore::open(&config), &user, &output)
        }
        Commands::Config { command } => handle_config_command(command, config_path, &output),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

fn run_menu(config: &Config) -> Result<()> {
    let store = KeyStore::open(config);
    let stdin = io::stdin();
    Menu::new(&store, stdin.lock(), io::stdout())
        .run()
        .context("Console I/O failed")
}
