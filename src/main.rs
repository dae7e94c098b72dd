use clap::Parser;
use tracing_subscriber::EnvFilter;

use account_evaluator::cli::{keys, replay, Cli, Commands};
use account_evaluator::config::ChainConfig;

fn main() {
    let cli = Cli::parse();
    let config = ChainConfig::load_or_default(&cli.config);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let ok = match cli.command {
        Commands::Replay {
            genesis,
            blocks,
            output,
        } => replay::handle_replay(&config, &genesis, &blocks, &output),
        Commands::Keygen { seed } => {
            keys::handle_keygen(seed);
            true
        }
        Commands::Inspect { snapshot, name } => replay::handle_inspect(&snapshot, &name),
    };

    if !ok {
        std::process::exit(1);
    }
}
