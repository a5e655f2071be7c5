mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ai_optimizer_common::{init_logging, load_config, Result};

#[derive(Parser)]
#[command(name = "ai-optimizer", version, about = "AI-guided host optimization")]
struct Cli {
    /// 配置文件路径（不存在时使用默认配置）
    #[arg(short, long, default_value = "ai-optimizer.toml")]
    config: PathBuf,

    /// Only log what would change; touch nothing.
    #[arg(long, global = true)]
    dry_run: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full optimization session.
    Run,
    /// Scan for junk files and print the report as JSON.
    Scan,
    /// Remove empty directories under the configured roots.
    Reclaim {
        /// Override the configured roots.
        #[arg(long = "root")]
        roots: Vec<String>,
    },
    /// Validate a plan file offline against the knowledge base.
    Validate {
        plan: PathBuf,
        /// Active user profile; may be repeated.
        #[arg(long = "profile")]
        profiles: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(if cli.verbose { "debug" } else { "info" });

    if let Err(err) = run(cli).await {
        log::error!("{}", err);
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli.config)?;
    if cli.dry_run {
        config.dry_run = true;
    }
    match cli.command {
        Command::Run => commands::run::run_session(&config).await,
        Command::Scan => commands::scan::scan(&config).await,
        Command::Reclaim { roots } => commands::reclaim::reclaim(&config, &roots).await,
        Command::Validate { plan, profiles } => {
            commands::validate::validate(&config, &plan, &profiles)
        }
    }
}
