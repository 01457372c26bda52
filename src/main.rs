use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use cotacao::core::deadline::DeadlinePolicy;
use cotacao::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for cotacao::AppCommand {
    fn from(cmd: Commands) -> cotacao::AppCommand {
        match cmd {
            Commands::Server { deadline_policy } => cotacao::AppCommand::Server { deadline_policy },
            Commands::Client => cotacao::AppCommand::Client,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Serve USD-BRL quotes on GET /cotacao
    Server {
        /// Override how stage deadlines are derived (per-stage, anchored, chained)
        #[arg(long)]
        deadline_policy: Option<DeadlinePolicy>,
    },
    /// Fetch one quote from the server and save it to the output file
    Client,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => cotacao::setup::setup(),
        Some(cmd) => cotacao::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
