use tracing::debug;

use super::{Evaluator, OperationResult};
use crate::error::EvaluatorError;
use crate::operations::{listing, AccountWhitelistOperation};
use crate::state::LedgerState;

pub struct AccountWhitelistEvaluator;

impl Evaluator for AccountWhitelistEvaluator {
    type Operation = AccountWhitelistOperation;
    type Context = ();

    fn evaluate(state: &LedgerState, op: &AccountWhitelistOperation) -> Result<(), EvaluatorError> {
        state.account(op.account_to_list)?;
        let authorizing = state.account(op.authorizing_account)?;
        if !state.parameters().allow_non_member_whitelists && !authorizing.is_lifetime_member() {
            return Err(EvaluatorError::NotLifetimeMember(op.authorizing_account));
        }
        Ok(())
    }

    fn apply(
        state: &mut LedgerState,
        op: &AccountWhitelistOperation,
        _ctx: (),
    ) -> Result<OperationResult, EvaluatorError> {
        let white = op.new_listing & listing::WHITE_LISTED != 0;
        let black = op.new_listing & listing::BLACK_LISTED != 0;
        let authorizer = op.authorizing_account;
        let listed = op.account_to_list;

        state.modify_account(listed, |a| {
            set_membership(&mut a.whitelisting_accounts, authorizer, white);
            set_membership(&mut a.blacklisting_accounts, authorizer, black);
        })?;
        state.modify_account(authorizer, |a| {
            set_membership(&mut a.whitelisted_accounts, listed, white);
            set_membership(&mut a.blacklisted_accounts, listed, black);
        })?;

        debug!(%authorizer, %listed, white, black, "listing updated");
        Ok(OperationResult::Void)
    }
}

fn set_membership<T: Ord>(set: &mut std::collections::BTreeSet<T>, item: T, present: bool) {
    if present {
        set.insert(item);
    } else {
        set.remove(&item);
    }
}
