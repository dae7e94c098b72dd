use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::crypto::{KeyPair, PublicKey};
use crate::error::{ChainError, EvaluatorError};
use crate::evaluator::{apply_operation, OperationResult};
use crate::operations::Operation;
use crate::state::LedgerState;
use crate::types::Timestamp;

/// Ordered list of operations applied all-or-nothing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
    pub operations: Vec<Operation>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("operation {op_index} failed: {error}")]
pub struct OperationFailure {
    pub op_index: usize,
    #[source]
    pub error: EvaluatorError,
}

impl Transaction {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    /// SHA-256 over the wire encoding of each operation.
    pub fn digest(&self) -> Result<String, ChainError> {
        let mut hasher = Sha256::new();
        for op in &self.operations {
            hasher.update(op.to_wire_bytes()?);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Apply `tx` to `state`, committing only if every operation succeeds.
pub fn apply_transaction(
    state: &mut LedgerState,
    tx: &Transaction,
) -> Result<Vec<OperationResult>, OperationFailure> {
    let mut scratch = state.clone();
    let results = apply_transaction_in_place(&mut scratch, tx)?;
    *state = scratch;
    Ok(results)
}

/// Apply without a scratch copy. On error `state` is partially modified and
/// must be discarded by the caller.
pub(crate) fn apply_transaction_in_place(
    state: &mut LedgerState,
    tx: &Transaction,
) -> Result<Vec<OperationResult>, OperationFailure> {
    tx.operations
        .iter()
        .enumerate()
        .map(|(op_index, op)| {
            apply_operation(state, op).map_err(|error| OperationFailure { op_index, error })
        })
        .collect()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub height: u64,
    pub timestamp: Timestamp,
    pub prev_hash: Option<String>,
    pub hash: Option<String>,
    #[serde(default)]
    pub producer: Option<PublicKey>,
    #[serde(default)]
    pub signature_hex: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        height: u64,
        timestamp: Timestamp,
        prev_hash: Option<String>,
        transactions: Vec<Transaction>,
    ) -> Result<Self, ChainError> {
        let mut block = Block {
            header: BlockHeader {
                height,
                timestamp,
                prev_hash,
                hash: None,
                producer: None,
                signature_hex: None,
            },
            transactions,
        };
        block.header.hash = Some(block.calculate_hash()?);
        Ok(block)
    }

    /// SHA-256 of the header fields and transaction digests. Excludes the
    /// signature and the hash itself.
    pub fn calculate_hash(&self) -> Result<String, ChainError> {
        let mut data = format!(
            "{}:{}:{}",
            self.header.height,
            self.header.timestamp.secs(),
            self.header.prev_hash.clone().unwrap_or_default()
        );
        for tx in &self.transactions {
            data.push(':');
            data.push_str(&tx.digest()?);
        }
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn sign(&mut self, producer: &KeyPair) -> Result<(), ChainError> {
        let hash = self.calculate_hash()?;
        self.header.signature_hex = Some(producer.sign_hex(hash.as_bytes()));
        self.header.producer = Some(producer.public_key());
        self.header.hash = Some(hash);
        debug!(height = self.header.height, "block signed");
        Ok(())
    }

    /// Unsigned blocks pass; a present signature must verify against the
    /// stored hash.
    pub fn verify_signature(&self) -> bool {
        match (&self.header.producer, &self.header.signature_hex, &self.header.hash) {
            (None, None, _) => true,
            (Some(key), Some(sig), Some(hash)) => key.verify_hex(hash.as_bytes(), sig),
            _ => false,
        }
    }
}
