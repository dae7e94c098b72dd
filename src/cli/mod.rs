pub mod keys;
pub mod replay;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "account_evaluator")]
#[command(about = "Account operation evaluator CLI", long_about = None)]
pub struct Cli {
    /// Chain config (TOML). Created with defaults when missing.
    #[arg(long, default_value = "chain.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay blocks on top of a genesis file and write a state snapshot
    Replay {
        #[arg(long)]
        genesis: String,
        /// JSON array of blocks
        #[arg(long)]
        blocks: String,
        #[arg(long, default_value = "state.json")]
        output: String,
    },
    /// Generate an ed25519 key pair
    Keygen {
        /// 32-byte hex seed for a deterministic key
        #[arg(long)]
        seed: Option<String>,
    },
    /// Print an account from a state snapshot
    Inspect {
        #[arg(long, default_value = "state.json")]
        snapshot: String,
        name: String,
    },
}
