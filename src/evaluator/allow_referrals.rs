use super::{Evaluator, OperationResult};
use crate::error::EvaluatorError;
use crate::operations::{referral, AccountAllowReferralsOperation};
use crate::referral::set_referrer_eligibility;
use crate::state::LedgerState;

pub struct AllowReferralsEvaluator;

impl Evaluator for AllowReferralsEvaluator {
    type Operation = AccountAllowReferralsOperation;
    type Context = ();

    fn evaluate(
        state: &LedgerState,
        op: &AccountAllowReferralsOperation,
    ) -> Result<(), EvaluatorError> {
        state.account(op.target)?;
        if op.action & referral::DISALLOW != 0 && state.account_properties(op.target).is_none() {
            return Err(EvaluatorError::NoReferralEntry(op.target));
        }
        Ok(())
    }

    fn apply(
        state: &mut LedgerState,
        op: &AccountAllowReferralsOperation,
        _ctx: (),
    ) -> Result<OperationResult, EvaluatorError> {
        set_referrer_eligibility(state, op.target, op.action & referral::ALLOW != 0);
        Ok(OperationResult::Void)
    }
}
