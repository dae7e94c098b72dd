use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{error, info, warn};

use crate::block::{apply_transaction_in_place, Block};
use crate::error::ChainError;
use crate::evaluator::OperationResult;
use crate::state::LedgerState;

/// Ledger state plus the head of the block sequence that produced it.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Chain {
    state: LedgerState,
    height: u64,
    head_hash: Option<String>,
}

impl Chain {
    pub fn new(state: LedgerState) -> Self {
        let height = state.head_block_num();
        Chain {
            state,
            height,
            head_hash: None,
        }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn head_hash(&self) -> Option<String> {
        self.head_hash.clone()
    }

    /// Apply every transaction of `block` in order. The block commits as a
    /// whole; on any error the chain is left unchanged.
    pub fn apply_block(&mut self, block: &Block) -> Result<Vec<Vec<OperationResult>>, ChainError> {
        let header = &block.header;
        let expected = self.height + 1;
        if header.height != expected {
            return Err(ChainError::HeightMismatch {
                expected,
                got: header.height,
            });
        }
        if header.prev_hash != self.head_hash {
            return Err(ChainError::PrevHashMismatch {
                height: header.height,
                expected: self.head_hash.clone(),
            });
        }
        let head_time = self.state.head_block_time();
        if header.timestamp < head_time {
            return Err(ChainError::TimeWentBackwards {
                head: head_time,
                got: header.timestamp,
            });
        }
        let hash = block.calculate_hash()?;
        if header.hash.as_deref() != Some(hash.as_str()) {
            return Err(ChainError::BlockHashMismatch {
                height: header.height,
            });
        }
        if !block.verify_signature() {
            return Err(ChainError::BadSignature {
                height: header.height,
            });
        }

        let mut scratch = self.state.clone();
        scratch.set_head_block(header.height, header.timestamp);

        let mut results = Vec::with_capacity(block.transactions.len());
        for (tx_index, tx) in block.transactions.iter().enumerate() {
            match apply_transaction_in_place(&mut scratch, tx) {
                Ok(r) => results.push(r),
                Err(failure) if failure.error.is_fatal() => {
                    error!(height = header.height, tx_index, op_index = failure.op_index, error = %failure.error, "invariant violated, block aborted");
                    return Err(ChainError::InvariantViolated {
                        height: header.height,
                        source: failure.error,
                    });
                }
                Err(failure) => {
                    warn!(height = header.height, tx_index, op_index = failure.op_index, error = %failure.error, "transaction rejected");
                    return Err(ChainError::TransactionFailed {
                        tx_index,
                        op_index: failure.op_index,
                        source: failure.error,
                    });
                }
            }
        }

        self.state = scratch;
        self.height = header.height;
        self.head_hash = Some(hash);
        info!(
            height = self.height,
            transactions = block.transactions.len(),
            "block applied"
        );
        Ok(results)
    }

    pub fn save_to_json(&self, path: &str) -> Result<(), ChainError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ChainError::Serialization(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a snapshot and rebuild the secondary indexes it omits.
    pub fn load_from_json(path: &str) -> Result<Self, ChainError> {
        let contents = fs::read_to_string(path)?;
        let mut chain: Chain = serde_json::from_str(&contents)
            .map_err(|e| ChainError::Serialization(e.to_string()))?;
        chain.state.rebuild_indexes();
        Ok(chain)
    }
}
