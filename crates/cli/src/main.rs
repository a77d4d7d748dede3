//! orderdesk CLI: the main entry point.
//!
//! Commands:
//! - `serve`     Start the HTTP server (spawns the tool host)
//! - `tool-host` Serve the shop tools over stdin/stdout
//! - `seed`      Recreate the shop database with sample data
//! - `ask`       Ask one question on a thread (`--resume` finishes a cut-short turn)
//! - `tools`     List the tools the tool host advertises
//! - `status`    Show configuration and health

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "orderdesk",
    about = "orderdesk: answer questions about customer orders",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.orderdesk/config.toml)
    #[arg(short, long, global = true, env = "ORDERDESK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Serve the shop tools over stdin/stdout (spawned by `serve`)
    ToolHost {
        /// Shop database to read
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Recreate the shop database with sample customers and orders
    Seed {
        /// Where to write the database
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Ask a single question
    Ask {
        /// Conversation thread to continue
        #[arg(short, long, default_value = "cli")]
        thread: String,

        /// Finish the thread's interrupted turn instead of asking
        #[arg(long, conflicts_with = "question")]
        resume: bool,

        /// The question
        #[arg(required_unless_present = "resume")]
        question: Option<String>,
    },

    /// List the tools advertised by the tool host
    Tools,

    /// Show system status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    // Logs go to stderr: the tool host's stdout carries protocol frames
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::ToolHost { db } => commands::tool_host::run(config, db).await?,
        Commands::Seed { db } => commands::seed::run(config, db).await?,
        Commands::Ask {
            thread,
            resume: _,
            question,
        } => commands::ask::run(config, &thread, question.as_deref()).await?,
        Commands::Tools => commands::tools::run(config).await?,
        Commands::Status => commands::status::run(config).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_takes_a_question_or_resume() {
        let cli = Cli::try_parse_from(["orderdesk", "ask", "-t", "t1", "order 1?"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ask { resume: false, question: Some(ref q), .. } if q == "order 1?"
        ));

        let cli = Cli::try_parse_from(["orderdesk", "ask", "-t", "t1", "--resume"]).unwrap();
        assert!(matches!(cli.command, Commands::Ask { resume: true, question: None, .. }));

        assert!(Cli::try_parse_from(["orderdesk", "ask"]).is_err());
        assert!(Cli::try_parse_from(["orderdesk", "ask", "--resume", "order 1?"]).is_err());
    }
}
