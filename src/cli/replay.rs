use thiserror::Error;
use tracing::info;

use crate::block::Block;
use crate::chain::Chain;
use crate::config::{ChainConfig, ConfigError};
use crate::error::ChainError;
use crate::genesis::{GenesisConfig, GenesisError};

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Genesis(#[from] GenesisError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid blocks JSON: {0}")]
    Blocks(#[from] serde_json::Error),
}

/// Build genesis state, apply every block in order and return the chain.
pub fn replay(
    config: &ChainConfig,
    genesis_path: &str,
    blocks_path: &str,
) -> Result<Chain, ReplayError> {
    let genesis = GenesisConfig::load(genesis_path)?;
    let state = genesis.build_state(config.parameters.clone(), config.hardfork_schedule()?)?;
    let mut chain = Chain::new(state);

    let blocks: Vec<Block> = serde_json::from_str(&std::fs::read_to_string(blocks_path)?)?;
    for block in &blocks {
        chain.apply_block(block)?;
    }
    info!(blocks = blocks.len(), height = chain.height(), "replay finished");
    Ok(chain)
}

pub fn handle_replay(config: &ChainConfig, genesis: &str, blocks: &str, output: &str) -> bool {
    match replay(config, genesis, blocks).and_then(|chain| {
        chain.save_to_json(output)?;
        Ok(chain)
    }) {
        Ok(chain) => {
            println!("Replayed to height {}", chain.height());
            println!("Accounts: {}", chain.state().accounts().count());
            println!("Snapshot written to {}", output);
            true
        }
        Err(e) => {
            println!("Error: {}", e);
            false
        }
    }
}

pub fn handle_inspect(snapshot: &str, name: &str) -> bool {
    let chain = match Chain::load_from_json(snapshot) {
        Ok(chain) => chain,
        Err(e) => {
            println!("Error: {}", e);
            return false;
        }
    };
    match chain.state().account_by_name(name) {
        Some(account) => match serde_json::to_string_pretty(account) {
            Ok(json) => {
                println!("{}", json);
                true
            }
            Err(e) => {
                println!("Error: {}", e);
                false
            }
        },
        None => {
            println!("Account '{}' not found", name);
            false
        }
    }
}
