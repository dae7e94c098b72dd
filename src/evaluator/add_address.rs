use tracing::debug;

use super::{Evaluator, OperationResult};
use crate::error::EvaluatorError;
use crate::operations::AddAddressOperation;
use crate::state::LedgerState;

pub struct AddAddressEvaluator;

impl Evaluator for AddAddressEvaluator {
    type Operation = AddAddressOperation;
    type Context = ();

    fn evaluate(state: &LedgerState, op: &AddAddressOperation) -> Result<(), EvaluatorError> {
        let account = state.account(op.to_account)?;
        if !account.can_create_addresses {
            return Err(EvaluatorError::AddressCreationDisabled(op.to_account));
        }
        Ok(())
    }

    fn apply(
        state: &mut LedgerState,
        op: &AddAddressOperation,
        _ctx: (),
    ) -> Result<OperationResult, EvaluatorError> {
        let address = state.mint_address();
        debug!(account = %op.to_account, %address, "address added");
        state.modify_account(op.to_account, |a| a.addresses.push(address))?;
        Ok(OperationResult::Void)
    }
}
