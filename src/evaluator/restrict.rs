use tracing::info;

use super::{Evaluator, OperationResult};
use crate::error::EvaluatorError;
use crate::objects::restriction;
use crate::operations::AccountRestrictOperation;
use crate::satellite;
use crate::state::LedgerState;

pub struct AccountRestrictEvaluator;

impl Evaluator for AccountRestrictEvaluator {
    type Operation = AccountRestrictOperation;
    /// Whether the action lifts the restriction.
    type Context = bool;

    fn evaluate(state: &LedgerState, op: &AccountRestrictOperation) -> Result<bool, EvaluatorError> {
        state.account(op.target)?;
        let restore = op.action & restriction::RESTORE != 0;
        if restore && state.find_restriction(op.target).is_none() {
            return Err(EvaluatorError::NoRestriction(op.target));
        }
        Ok(restore)
    }

    fn apply(
        state: &mut LedgerState,
        op: &AccountRestrictOperation,
        restore: bool,
    ) -> Result<OperationResult, EvaluatorError> {
        if restore {
            satellite::lift_restriction(state, op.target)?;
            info!(account = %op.target, "restriction lifted");
            return Ok(OperationResult::Void);
        }
        let created = satellite::impose_restriction(state, op.target, op.action)?;
        info!(account = %op.target, action = op.action, "restriction imposed");
        Ok(created.map_or(OperationResult::Void, OperationResult::RestrictedAccount))
    }
}
