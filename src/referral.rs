//! Registrar / referrer eligibility table.
//!
//! Entries are created on first grant and never deleted: a disallow flips
//! `can_be_referrer` to false and keeps the entry so referrer history stays
//! tracked.

use tracing::debug;

use crate::abuse::abuse_accounting_applies;
use crate::error::EvaluatorError;
use crate::state::LedgerState;
use crate::types::AccountId;

pub fn can_be_referrer(state: &LedgerState, account: AccountId) -> bool {
    state
        .account_properties(account)
        .is_some_and(|p| p.can_be_referrer)
}

/// Registrars must be eligible referrers once abuse accounting is active,
/// unless referrer mode is on.
pub fn ensure_registrar_eligible(
    state: &LedgerState,
    registrar: AccountId,
) -> Result<(), EvaluatorError> {
    if abuse_accounting_applies(state) && !can_be_referrer(state, registrar) {
        return Err(EvaluatorError::RegistrarNotReferrer(registrar));
    }
    Ok(())
}

pub fn set_referrer_eligibility(state: &mut LedgerState, account: AccountId, allow: bool) {
    let created = state.account_properties(account).is_none();
    state.set_can_be_referrer(account, allow);
    debug!(%account, allow, created, "referrer eligibility updated");
}
