mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    edit, format, login, reload, save, search, show, validate, EditArgs, FormatArgs, LoginArgs,
    SaveArgs, SearchArgs, ShowArgs, ValidateArgs,
};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Sitefile CLI - edit web server site files as sites or as text
#[derive(Parser, Debug)]
#[command(name = "sitefile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the service URL from sitefile.config.json
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the stored configuration as a site list
    Show(ShowArgs),

    /// Rank sites by a keyword
    Search(SearchArgs),

    /// Format a local site file
    Format(FormatArgs),

    /// Validate the stored configuration or a local file
    Validate(ValidateArgs),

    /// Save the stored configuration, or replace it with a local file
    Save(SaveArgs),

    /// Ask the server to reload its configuration
    Reload,

    /// Sign in and remember the token
    Login(LoginArgs),

    /// Interactive editing session
    Edit(EditArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, cwd: &str) -> anyhow::Result<()> {
    let mut config = Config::load(cwd)?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }

    match cli.command {
        Command::Show(args) => show(args, &config, cwd).await,
        Command::Search(args) => search(args, &config, cwd).await,
        Command::Format(args) => format(args, &config, cwd),
        Command::Validate(args) => validate(args, &config, cwd).await,
        Command::Save(args) => save(args, &config, cwd).await,
        Command::Reload => reload(&config, cwd).await,
        Command::Login(args) => login(args, &config, cwd).await,
        Command::Edit(args) => edit(args, &config, cwd).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cli, &cwd).await {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
