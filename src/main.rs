mod cli;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{LogLevel, Verbosity};
use lovelink::helpers::FAIL;

#[derive(Copy, Clone, Debug, Default)]
struct NoneLevel;
impl LogLevel for NoneLevel {
    fn default() -> Option<log::Level> {
        None
    }
}

#[derive(Parser)]
#[command(version, about = "Lovelink notification client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[clap(flatten)]
    verbose: Verbosity<NoneLevel>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the session token used to authenticate the socket
    #[command(visible_alias = "auth")]
    Login {
        /// Session token issued by the server
        token: String,
    },
    /// Remove the stored session token
    Logout,
    /// Show credential and server status
    #[command(visible_alias = "info")]
    Status,
    /// Connect and print notifications as they arrive
    #[command(visible_alias = "watch")]
    Listen {
        /// Stop after this many notifications
        #[arg(short, long)]
        limit: Option<u64>,
        /// Override the configured server address
        #[arg(short, long)]
        server: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    let mut env = env_logger::Builder::new();
    env.filter_level(cli.verbose.log_level_filter()).init();

    let mut config = lovelink::config::read();

    let result = match cli.command {
        Commands::Login { token } => cli::login(&config, &token),
        Commands::Logout => cli::logout(&config),
        Commands::Status => cli::status(&config),
        Commands::Listen { limit, server } => {
            if let Some(server) = server {
                config.server_url = server;
            }
            cli::listen(&config, limit)
        }
    };

    if let Err(err) = result {
        eprintln!("{} {err}", *FAIL);
        std::process::exit(1);
    }
}
