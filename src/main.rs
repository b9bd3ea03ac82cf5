use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use pgbatch::cli::handle_run_command;
use pgbatch::config::{paths::BatchPaths, settings::Settings};
use pgbatch::models::Mode;

#[derive(Parser)]
#[command(
    name = "pgbatch",
    version,
    about = "Per-tenant PostgreSQL backup and restore orchestrator",
    long_about = "pgbatch reads a properties file describing one database server \
                  and a list of tenant credentials, runs pg_dump or psql once per \
                  tenant, archives and uploads the dumps, and mails a single report.\n\n\
                  Exit codes: 0 all good, 1 fatal error, 2 usage error, 3 some databases \
                  failed, 4 archive/upload failed, 5 both."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump every database listed in a properties file
    Backup {
        /// Path to the properties file
        config: PathBuf,
    },

    /// Restore every database listed in a properties file
    Restore {
        /// Path to the properties file
        config: PathBuf,
    },

    /// Show configuration paths and effective settings
    Config {
        /// Write the effective settings to the settings file
        #[arg(long)]
        init: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let paths = BatchPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Commands::Backup { config } => {
            let status = handle_run_command(&settings, Mode::Backup, &config)?;
            Ok(ExitCode::from(status.exit_code()))
        }
        Commands::Restore { config } => {
            let status = handle_run_command(&settings, Mode::Restore, &config)?;
            Ok(ExitCode::from(status.exit_code()))
        }
        Commands::Config { init } => {
            if init {
                settings.save(&paths)?;
                println!("Wrote {}", paths.settings_file().display());
                println!();
            }
            println!("pgbatch Configuration");
            println!("=====================");
            println!("Config directory: {}", paths.base_dir().display());
            println!("Settings file:    {}", paths.settings_file().display());
            println!();
            println!("Settings:");
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
