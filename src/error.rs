use thiserror::Error;

use crate::crypto::PublicKey;
use crate::hardfork::Hardfork;
use crate::types::{AccountId, AssetId, Timestamp, VoteId};

/// Outcome of checking an authority against chain limits and ledger state.
/// Never surfaced directly; each operation recodes it through its
/// `AuthorityErrorMap`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    #[error("Maximum authority membership exceeded: {count} > {max}")]
    MaxAuthorityExceeded { count: usize, max: usize },
    #[error("Account {0} specified in authority does not exist")]
    AccountNotFound(AccountId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbuseLimitError {
    #[error("Key {key} is already referenced by {count} accounts")]
    KeyOverused { key: PublicKey, count: usize },
    #[error("Account {account} is already referenced by {count} accounts")]
    AccountOverused { account: AccountId, count: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoteError {
    #[error("Voted for more witnesses than currently allowed ({max})")]
    TooManyWitnessVotes { max: u16 },
    #[error("Voted for more committee members than currently allowed ({max})")]
    TooManyCommitteeVotes { max: u16 },
    #[error("Vote {vote} is beyond the next available vote id {next}")]
    VoteIdOutOfRange { vote: VoteId, next: u32 },
    #[error("Vote {0} refers to a worker's vote-against id")]
    VoteForRejectedWorker(VoteId),
}

/// Public error surface of the account evaluators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluatorError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Field {field} is not accepted before the {gate} hardfork")]
    UnsupportedExtension { field: &'static str, gate: Hardfork },

    #[error("Account create: maximum authority membership exceeded ({count} > {max})")]
    AccountCreateMaxAuthExceeded { count: usize, max: usize },
    #[error("Account create: authority references missing account {0}")]
    AccountCreateAuthAccountNotFound(AccountId),
    #[error("Account update: maximum authority membership exceeded ({count} > {max})")]
    AccountUpdateMaxAuthExceeded { count: usize, max: usize },
    #[error("Account update: authority references missing account {0}")]
    AccountUpdateAuthAccountNotFound(AccountId),

    #[error("Account {0} not found")]
    AccountNotFound(AccountId),
    #[error("Asset {0} not found")]
    AssetNotFound(AssetId),
    #[error("Invalid proxy account {0} specified")]
    ProxyAccountNotFound(AccountId),
    #[error("Account name '{0}' is already taken")]
    NameTaken(String),
    #[error("Registrar {0} is not allowed to register accounts")]
    RegistrarNotReferrer(AccountId),
    #[error(transparent)]
    AbuseLimit(#[from] AbuseLimitError),
    #[error(transparent)]
    Votes(#[from] VoteError),

    #[error("Special authority: top holders count {0} out of range")]
    InvalidTopHolders(u8),
    #[error("Buyback asset issuer does not match {expected}")]
    BuybackIncorrectIssuer { expected: AccountId },
    #[error("Buyback account already exists for asset {0}")]
    BuybackAlreadyExists(AssetId),

    #[error("Account {0} can't create addresses")]
    AddressCreationDisabled(AccountId),
    #[error("Account {0} must be a lifetime member to maintain lists")]
    NotLifetimeMember(AccountId),
    #[error("Account {0} is already a lifetime member")]
    AlreadyLifetimeMember(AccountId),
    #[error("Annual memberships are no longer available")]
    AnnualMembershipSunset,
    #[error("May not extend annual membership past {limit}")]
    MembershipExtensionTooFar { limit: Timestamp },
    #[error("Account {0} has no restriction to restore")]
    NoRestriction(AccountId),
    #[error("Account {0} has no create-asset permission to revoke")]
    NoCreateAssetPermission(AccountId),
    #[error("Account {0} has no referral properties to disallow")]
    NoReferralEntry(AccountId),

    /// Apply-phase state that evaluate should have ruled out. Fatal.
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

impl EvaluatorError {
    /// Fatal errors abort block processing instead of rejecting one transaction.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EvaluatorError::Invariant(_))
    }
}

/// Translation of authority-verification failures into one operation's
/// public error kinds.
#[derive(Clone, Copy)]
pub struct AuthorityErrorMap {
    pub max_auth_exceeded: fn(usize, usize) -> EvaluatorError,
    pub account_not_found: fn(AccountId) -> EvaluatorError,
}

impl AuthorityErrorMap {
    pub fn recode(&self, err: AuthorityError) -> EvaluatorError {
        match err {
            AuthorityError::MaxAuthorityExceeded { count, max } => (self.max_auth_exceeded)(count, max),
            AuthorityError::AccountNotFound(id) => (self.account_not_found)(id),
        }
    }
}

pub const ACCOUNT_CREATE_AUTH_ERRORS: AuthorityErrorMap = AuthorityErrorMap {
    max_auth_exceeded: |count, max| EvaluatorError::AccountCreateMaxAuthExceeded { count, max },
    account_not_found: EvaluatorError::AccountCreateAuthAccountNotFound,
};

pub const ACCOUNT_UPDATE_AUTH_ERRORS: AuthorityErrorMap = AuthorityErrorMap {
    max_auth_exceeded: |count, max| EvaluatorError::AccountUpdateMaxAuthExceeded { count, max },
    account_not_found: EvaluatorError::AccountUpdateAuthAccountNotFound,
};

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Block height mismatch: expected {expected}, got {got}")]
    HeightMismatch { expected: u64, got: u64 },
    #[error("Block timestamp {got} is before head time {head}")]
    TimeWentBackwards { head: Timestamp, got: Timestamp },
    #[error("Block {height} does not link to head {expected:?}")]
    PrevHashMismatch { height: u64, expected: Option<String> },
    #[error("Block {height} hash does not match its contents")]
    BlockHashMismatch { height: u64 },
    #[error("Block {height} carries an invalid producer signature")]
    BadSignature { height: u64 },
    #[error("Transaction {tx_index} operation {op_index} failed: {source}")]
    TransactionFailed {
        tx_index: usize,
        op_index: usize,
        source: EvaluatorError,
    },
    #[error("Block {height} aborted on invariant violation: {source}")]
    InvariantViolated { height: u64, source: EvaluatorError },
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recode_tables_are_operation_specific() {
        let err = AuthorityError::AccountNotFound(AccountId(42));
        assert_eq!(
            ACCOUNT_CREATE_AUTH_ERRORS.recode(err.clone()),
            EvaluatorError::AccountCreateAuthAccountNotFound(AccountId(42))
        );
        assert_eq!(
            ACCOUNT_UPDATE_AUTH_ERRORS.recode(err),
            EvaluatorError::AccountUpdateAuthAccountNotFound(AccountId(42))
        );

        let err = AuthorityError::MaxAuthorityExceeded { count: 11, max: 10 };
        assert_eq!(
            ACCOUNT_UPDATE_AUTH_ERRORS.recode(err),
            EvaluatorError::AccountUpdateMaxAuthExceeded { count: 11, max: 10 }
        );
    }

    #[test]
    fn test_only_invariants_are_fatal() {
        assert!(EvaluatorError::Invariant("x".into()).is_fatal());
        assert!(!EvaluatorError::AccountNotFound(AccountId(1)).is_fatal());
    }
}
