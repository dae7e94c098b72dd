//! Single-field account and chain settings.

use tracing::debug;

use super::{Evaluator, OperationResult};
use crate::error::EvaluatorError;
use crate::operations::{
    AllowCreateAddressesOperation, SetOnlineTimeOperation, SetVerificationIsRequiredOperation,
};
use crate::state::LedgerState;

pub struct SetOnlineTimeEvaluator;

impl Evaluator for SetOnlineTimeEvaluator {
    type Operation = SetOnlineTimeOperation;
    type Context = ();

    fn evaluate(_state: &LedgerState, _op: &SetOnlineTimeOperation) -> Result<(), EvaluatorError> {
        Ok(())
    }

    fn apply(
        state: &mut LedgerState,
        op: &SetOnlineTimeOperation,
        _ctx: (),
    ) -> Result<OperationResult, EvaluatorError> {
        state.set_online_info(op.online_info.clone());
        debug!(entries = op.online_info.len(), "online info replaced");
        Ok(OperationResult::Void)
    }
}

pub struct SetVerificationIsRequiredEvaluator;

impl Evaluator for SetVerificationIsRequiredEvaluator {
    type Operation = SetVerificationIsRequiredOperation;
    type Context = ();

    fn evaluate(
        state: &LedgerState,
        op: &SetVerificationIsRequiredOperation,
    ) -> Result<(), EvaluatorError> {
        state.account(op.target)?;
        Ok(())
    }

    fn apply(
        state: &mut LedgerState,
        op: &SetVerificationIsRequiredOperation,
        _ctx: (),
    ) -> Result<OperationResult, EvaluatorError> {
        state.modify_account(op.target, |a| {
            a.verification_is_required = op.verification_is_required
        })?;
        Ok(OperationResult::Void)
    }
}

pub struct AllowCreateAddressesEvaluator;

impl Evaluator for AllowCreateAddressesEvaluator {
    type Operation = AllowCreateAddressesOperation;
    type Context = ();

    fn evaluate(
        state: &LedgerState,
        op: &AllowCreateAddressesOperation,
    ) -> Result<(), EvaluatorError> {
        state.account(op.account_id)?;
        Ok(())
    }

    fn apply(
        state: &mut LedgerState,
        op: &AllowCreateAddressesOperation,
        _ctx: (),
    ) -> Result<OperationResult, EvaluatorError> {
        state.modify_account(op.account_id, |a| a.can_create_addresses = op.allow)?;
        Ok(OperationResult::Void)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::apply_operation;
    use crate::evaluator::testing::*;
    use crate::operations::Operation;
    use crate::types::AccountId;
    use std::collections::BTreeMap;

    #[test]
    fn test_online_info_is_overwritten() {
        let mut f = fixture(AFTER_GATES);
        let first = BTreeMap::from([(f.nathan, 30), (f.registrar, 60)]);
        let op = Operation::SetOnlineTime(SetOnlineTimeOperation { online_info: first });
        apply_operation(&mut f.state, &op).unwrap();

        let second = BTreeMap::from([(f.nathan, 5)]);
        let op = Operation::SetOnlineTime(SetOnlineTimeOperation {
            online_info: second.clone(),
        });
        apply_operation(&mut f.state, &op).unwrap();
        assert_eq!(f.state.accounts_online().online_info, second);
    }

    #[test]
    fn test_verification_flag() {
        let mut f = fixture(AFTER_GATES);
        let op = Operation::SetVerificationIsRequired(SetVerificationIsRequiredOperation {
            target: f.nathan,
            verification_is_required: true,
        });
        apply_operation(&mut f.state, &op).unwrap();
        assert!(f.state.account(f.nathan).unwrap().verification_is_required);

        let op = Operation::SetVerificationIsRequired(SetVerificationIsRequiredOperation {
            target: AccountId(999),
            verification_is_required: true,
        });
        assert_eq!(
            apply_operation(&mut f.state, &op),
            Err(EvaluatorError::AccountNotFound(AccountId(999)))
        );
    }

    #[test]
    fn test_allow_create_addresses_requires_account() {
        let mut f = fixture(AFTER_GATES);
        let op = Operation::AllowCreateAddresses(AllowCreateAddressesOperation {
            account_id: AccountId(999),
            allow: true,
        });
        assert_eq!(
            apply_operation(&mut f.state, &op),
            Err(EvaluatorError::AccountNotFound(AccountId(999)))
        );
    }
}
