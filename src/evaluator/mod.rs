//! Two-phase evaluators for account operations.
//!
//! `evaluate` reads ledger state and returns a context value; `apply` is the
//! only phase that mutates state and receives that context. Ids carried in
//! the context are resolved again in `apply`, never held as live references.

pub mod account_create;
pub mod account_update;
pub mod add_address;
pub mod allow_create_asset;
pub mod allow_referrals;
pub mod restrict;
pub mod settings;
pub mod upgrade;
pub mod whitelist;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EvaluatorError;
use crate::hardfork::Hardfork;
use crate::operations::Operation;
use crate::state::LedgerState;
use crate::types::{AccountId, AllowCreateAssetId, RestrictedAccountId};

pub use account_create::AccountCreateEvaluator;
pub use account_update::AccountUpdateEvaluator;
pub use add_address::AddAddressEvaluator;
pub use allow_create_asset::AllowCreateAssetEvaluator;
pub use allow_referrals::AllowReferralsEvaluator;
pub use restrict::AccountRestrictEvaluator;
pub use settings::{
    AllowCreateAddressesEvaluator, SetOnlineTimeEvaluator, SetVerificationIsRequiredEvaluator,
};
pub use upgrade::AccountUpgradeEvaluator;
pub use whitelist::AccountWhitelistEvaluator;

/// Id of the object an operation created, if any.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum OperationResult {
    Void,
    Account(AccountId),
    RestrictedAccount(RestrictedAccountId),
    AllowCreateAsset(AllowCreateAssetId),
}

pub trait Evaluator {
    type Operation;
    /// Values found during evaluate and consumed by apply.
    type Context;

    fn evaluate(
        state: &LedgerState,
        op: &Self::Operation,
    ) -> Result<Self::Context, EvaluatorError>;

    fn apply(
        state: &mut LedgerState,
        op: &Self::Operation,
        ctx: Self::Context,
    ) -> Result<OperationResult, EvaluatorError>;
}

/// Reject a populated extension field while its gate is inactive.
pub(crate) fn require_gate(
    state: &LedgerState,
    gate: Hardfork,
    field: &'static str,
    present: bool,
) -> Result<(), EvaluatorError> {
    if present && !state.is_active(gate) {
        return Err(EvaluatorError::UnsupportedExtension { field, gate });
    }
    Ok(())
}

fn run<E: Evaluator>(
    state: &mut LedgerState,
    op: &E::Operation,
) -> Result<OperationResult, EvaluatorError> {
    let ctx = E::evaluate(state, op)?;
    E::apply(state, op, ctx)
}

fn check<E: Evaluator>(state: &LedgerState, op: &E::Operation) -> Result<(), EvaluatorError> {
    E::evaluate(state, op).map(|_| ())
}

macro_rules! dispatch {
    ($op:expr, $call:ident, $state:expr) => {
        match $op {
            Operation::AccountCreate(o) => $call::<AccountCreateEvaluator>($state, o),
            Operation::AccountUpdate(o) => $call::<AccountUpdateEvaluator>($state, o),
            Operation::AddAddress(o) => $call::<AddAddressEvaluator>($state, o),
            Operation::AccountWhitelist(o) => $call::<AccountWhitelistEvaluator>($state, o),
            Operation::AccountUpgrade(o) => $call::<AccountUpgradeEvaluator>($state, o),
            Operation::AccountRestrict(o) => $call::<AccountRestrictEvaluator>($state, o),
            Operation::AllowCreateAsset(o) => $call::<AllowCreateAssetEvaluator>($state, o),
            Operation::AccountAllowReferrals(o) => $call::<AllowReferralsEvaluator>($state, o),
            Operation::SetOnlineTime(o) => $call::<SetOnlineTimeEvaluator>($state, o),
            Operation::SetVerificationIsRequired(o) => {
                $call::<SetVerificationIsRequiredEvaluator>($state, o)
            }
            Operation::AllowCreateAddresses(o) => $call::<AllowCreateAddressesEvaluator>($state, o),
        }
    };
}

/// Run the read-only phase only, e.g. to screen a candidate against a
/// snapshot.
pub fn evaluate_operation(state: &LedgerState, op: &Operation) -> Result<(), EvaluatorError> {
    op.validate()?;
    dispatch!(op, check, state)
}

/// Validate, evaluate and apply one operation.
///
/// An `Err` from evaluate leaves `state` untouched. An `Err` from apply is
/// always fatal and the caller must discard `state`.
pub fn apply_operation(
    state: &mut LedgerState,
    op: &Operation,
) -> Result<OperationResult, EvaluatorError> {
    op.validate()?;
    let result = dispatch!(op, run, state)?;
    debug!(op = op.name(), ?result, "operation applied");
    Ok(result)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::crypto::{KeyPair, PublicKey};
    use crate::genesis::{GenesisAccount, GenesisAsset, GenesisConfig};
    use crate::hardfork::HardforkSchedule;
    use crate::objects::ChainParameters;
    use crate::operations::AccountCreateOperation;
    use crate::types::{AccountOptions, AssetId, Authority, Timestamp};

    /// After every gate in the mainnet table.
    pub const AFTER_GATES: u64 = 1_600_000_000;
    /// Before every gate in the mainnet table.
    pub const BEFORE_GATES: u64 = 1_400_000_000;

    pub fn key(seed: u8) -> PublicKey {
        KeyPair::from_seed([seed; 32]).public_key()
    }

    pub struct Fixture {
        pub state: LedgerState,
        /// Lifetime member, eligible referrer.
        pub registrar: AccountId,
        /// Basic account, not a referrer.
        pub nathan: AccountId,
        pub gold: AssetId,
    }

    pub fn fixture_with(time: u64, parameters: ChainParameters) -> Fixture {
        let mut genesis = GenesisConfig::new("unit-test", time);
        genesis.initial_accounts.push(GenesisAccount {
            name: "init0".into(),
            owner_key: key(200),
            active_key: None,
            is_lifetime_member: true,
            can_be_referrer: true,
            can_create_addresses: false,
        });
        genesis.initial_accounts.push(GenesisAccount {
            name: "nathan".into(),
            owner_key: key(201),
            active_key: None,
            is_lifetime_member: false,
            can_be_referrer: false,
            can_create_addresses: false,
        });
        genesis.initial_assets.push(GenesisAsset {
            symbol: "GOLD".into(),
            issuer: "init0".into(),
        });
        genesis.initial_workers.push("payroll".into());

        let mut state = genesis
            .build_state(parameters, HardforkSchedule::mainnet())
            .unwrap();
        state.set_head_block(1, Timestamp(time));
        let registrar = state.account_by_name("init0").unwrap().id;
        let nathan = state.account_by_name("nathan").unwrap().id;
        Fixture {
            state,
            registrar,
            nathan,
            gold: AssetId(0),
        }
    }

    pub fn fixture(time: u64) -> Fixture {
        fixture_with(time, ChainParameters::default())
    }

    pub fn create_op(registrar: AccountId, name: &str, owner_key: PublicKey) -> AccountCreateOperation {
        AccountCreateOperation {
            registrar,
            referrer: registrar,
            referrer_percent: 0,
            name: name.to_string(),
            owner: Authority::from_key(owner_key),
            active: Authority::from_key(owner_key),
            options: AccountOptions::new(owner_key),
            extensions: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::operations::{AccountUpgradeOperation, AddAddressOperation};

    #[test]
    fn test_evaluate_operation_does_not_mutate() {
        let f = fixture(AFTER_GATES);
        let before = f.state.clone();
        let op = Operation::AccountCreate(create_op(f.registrar, "carol", key(1)));
        evaluate_operation(&f.state, &op).unwrap();
        assert_eq!(f.state, before);
    }

    #[test]
    fn test_failed_evaluate_leaves_state_untouched() {
        let mut f = fixture(AFTER_GATES);
        let before = f.state.clone();
        let op = Operation::AddAddress(AddAddressOperation { to_account: f.nathan });
        assert_eq!(
            apply_operation(&mut f.state, &op),
            Err(EvaluatorError::AddressCreationDisabled(f.nathan))
        );
        assert_eq!(f.state, before);
    }

    #[test]
    fn test_dispatch_returns_effect_ids() {
        let mut f = fixture(AFTER_GATES);
        let op = Operation::AccountCreate(create_op(f.registrar, "carol", key(1)));
        let result = apply_operation(&mut f.state, &op).unwrap();
        let carol = f.state.account_by_name("carol").unwrap().id;
        assert_eq!(result, OperationResult::Account(carol));

        let op = Operation::AccountUpgrade(AccountUpgradeOperation {
            account_to_upgrade: carol,
            upgrade_to_lifetime_member: true,
        });
        assert_eq!(apply_operation(&mut f.state, &op), Ok(OperationResult::Void));
    }
}
