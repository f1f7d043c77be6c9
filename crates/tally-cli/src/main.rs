mod app;

use anyhow::Result;
use app::App;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tally_core::models::Config;
use tally_core::storage::{init_config_dir, init_data_dir, ConfigStorage};

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Tally - track time against companies", long_about = None)]
struct Args {
    /// Log level (overrides the config file)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account
    Signup(CredentialArgs),
    /// Sign in to an existing account
    Signin(CredentialArgs),
    Signout,
    /// Show the signed-in identity
    Whoami,
    /// Manage companies
    #[command(subcommand)]
    Company(CompanyCommand),
    /// Start timing a company, recording any running timer first
    Start {
        /// Company id or exact name
        company: String,
    },
    /// Stop the running timer and record it
    Stop,
    /// Show the running timer
    Status,
    /// Live view of the running timer until Ctrl-C
    Watch,
    /// Record time worked without the timer
    Add {
        #[arg(short, long)]
        company: String,
        /// YYYY-MM-DD, today when omitted
        #[arg(short, long)]
        date: Option<String>,
        /// HH:MM
        #[arg(long)]
        from: String,
        /// HH:MM
        #[arg(long)]
        to: String,
    },
    /// List recorded entries, newest first
    Entries,
    /// Move an entry to new start and end times on its own date
    EditEntry {
        id: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    DeleteEntry {
        id: String,
    },
    /// Write every entry to a CSV file
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
pub struct CredentialArgs {
    #[arg(short, long)]
    pub email: String,
    /// Read from stdin when omitted
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum CompanyCommand {
    Add { name: String },
    Rename { company: String, name: String },
    /// Delete a company and all of its entries
    Delete { company: String },
    List,
}

fn load_config() -> Result<Config> {
    let storage = ConfigStorage::new(init_config_dir()?);
    let mut config = storage.load()?;

    if let Ok(url) = std::env::var("TALLY_URL") {
        config.backend.url = Some(url);
    }
    if let Ok(key) = std::env::var("TALLY_ANON_KEY") {
        config.backend.anon_key = Some(key);
    }
    config.validate()?;

    Ok(config)
}

fn setup_logging(data_dir: &std::path::Path, level: &str) -> Result<()> {
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join("tally.log"))?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(level)
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config()?;
    let data_dir = init_data_dir()?;

    let level = args.log_level.as_deref().unwrap_or(&config.log_level);
    setup_logging(&data_dir, level)?;
    tracing::debug!("Data directory: {}", data_dir.display());

    let app = App::connect(config, data_dir).await?;
    app.run(args.command).await
}
