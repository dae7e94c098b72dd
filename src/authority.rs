//! Authority and special-authority checks shared by create and update.

use crate::error::{AuthorityError, EvaluatorError};
use crate::state::LedgerState;
use crate::types::{Authority, SpecialAuthority};

/// Check membership size against chain limits and that every referenced
/// account exists.
pub fn verify_authority_accounts(
    state: &LedgerState,
    authority: &Authority,
) -> Result<(), AuthorityError> {
    let max = usize::from(state.parameters().maximum_authority_membership);
    let count = authority.num_auths();
    if count > max {
        return Err(AuthorityError::MaxAuthorityExceeded { count, max });
    }
    for account in authority.accounts() {
        if state.find_account(account).is_none() {
            return Err(AuthorityError::AccountNotFound(account));
        }
    }
    Ok(())
}

pub fn evaluate_special_authority(
    state: &LedgerState,
    special: &SpecialAuthority,
) -> Result<(), EvaluatorError> {
    match special {
        SpecialAuthority::NoSpecialAuthority => Ok(()),
        SpecialAuthority::TopHolders {
            asset,
            num_top_holders,
        } => {
            let max = state.parameters().maximum_authority_membership;
            if *num_top_holders == 0 || u16::from(*num_top_holders) > max {
                return Err(EvaluatorError::InvalidTopHolders(*num_top_holders));
            }
            state.asset(*asset)?;
            Ok(())
        }
    }
}
