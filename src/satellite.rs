//! Satellite-object lifecycle.
//!
//! Special-authority, buyback, restriction and create-asset-permission
//! records only ever change here, as a side effect of an account mutation.

use tracing::debug;

use crate::error::EvaluatorError;
use crate::state::LedgerState;
use crate::types::{
    AccountId, AllowCreateAssetId, BuybackId, BuybackOptions, RestrictedAccountId,
    COMMITTEE_ACCOUNT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatelliteChange {
    Created,
    Removed,
    Unchanged,
}

/// Bring the special-authority object of `account` in line with the
/// account's override fields. `had` is whether an override was set before
/// the mutation, `wants` whether one is set after it.
pub fn reconcile_special_authority(
    state: &mut LedgerState,
    account: AccountId,
    had: bool,
    wants: bool,
) -> Result<SatelliteChange, EvaluatorError> {
    let present = state.find_special_authority(account).is_some();
    if present != had {
        return Err(EvaluatorError::Invariant(format!(
            "special authority object for {account} out of sync (present={present}, expected={had})"
        )));
    }
    let change = match (had, wants) {
        (false, true) => {
            state.create_special_authority(account)?;
            SatelliteChange::Created
        }
        (true, false) => {
            state.remove_special_authority(account)?;
            SatelliteChange::Removed
        }
        _ => SatelliteChange::Unchanged,
    };
    if change != SatelliteChange::Unchanged {
        debug!(%account, ?change, "special authority reconciled");
    }
    Ok(change)
}

/// Every account with an override has exactly one special-authority object
/// and no object exists without an override.
pub fn verify_special_authority_bijection(state: &LedgerState) -> Result<(), EvaluatorError> {
    let mut with_override = 0usize;
    for account in state.accounts() {
        let has = account.has_special_authority();
        if has != state.find_special_authority(account.id).is_some() {
            return Err(EvaluatorError::Invariant(format!(
                "special authority object for {} does not match account fields",
                account.id
            )));
        }
        with_override += usize::from(has);
    }
    if with_override != state.special_authority_count() {
        return Err(EvaluatorError::Invariant(
            "orphaned special authority objects".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_buyback(state: &LedgerState, options: &BuybackOptions) -> Result<(), EvaluatorError> {
    let asset = state.asset(options.asset_to_buy)?;
    if asset.issuer == COMMITTEE_ACCOUNT || asset.issuer != options.asset_to_buy_issuer {
        return Err(EvaluatorError::BuybackIncorrectIssuer {
            expected: options.asset_to_buy_issuer,
        });
    }
    if asset.buyback_account.is_some() || state.find_buyback(asset.id).is_some() {
        return Err(EvaluatorError::BuybackAlreadyExists(asset.id));
    }
    for market in &options.markets {
        state.asset(*market)?;
    }
    Ok(())
}

/// Create the buyback object and link the asset back to `account`.
pub fn attach_buyback(
    state: &mut LedgerState,
    account: AccountId,
    options: &BuybackOptions,
) -> Result<BuybackId, EvaluatorError> {
    let id = state.create_buyback(options.asset_to_buy)?;
    state.modify_asset(options.asset_to_buy, |asset| {
        asset.buyback_account = Some(account);
    })?;
    Ok(id)
}

/// Create or overwrite the restriction record. Returns the id when a new
/// record was created.
pub fn impose_restriction(
    state: &mut LedgerState,
    account: AccountId,
    restriction_type: u8,
) -> Result<Option<RestrictedAccountId>, EvaluatorError> {
    if state.find_restriction(account).is_some() {
        state.modify_restriction(account, restriction_type)?;
        Ok(None)
    } else {
        state.create_restriction(account, restriction_type).map(Some)
    }
}

pub fn lift_restriction(state: &mut LedgerState, account: AccountId) -> Result<(), EvaluatorError> {
    state.remove_restriction(account)
}

/// Grant or revoke the create-asset capability. Revocation deletes the
/// record outright.
pub fn set_create_asset_permission(
    state: &mut LedgerState,
    account: AccountId,
    allow: bool,
) -> Result<Option<AllowCreateAssetId>, EvaluatorError> {
    if !allow {
        state.remove_create_asset_permission(account)?;
        return Ok(None);
    }
    if state.find_create_asset_permission(account).is_some() {
        state.modify_create_asset_permission(account, true)?;
        Ok(None)
    } else {
        state.create_create_asset_permission(account, true).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_reconcile_transitions() {
        let mut state = LedgerState::default();
        let account = AccountId(3);

        assert_eq!(
            reconcile_special_authority(&mut state, account, false, false).unwrap(),
            SatelliteChange::Unchanged
        );
        assert_eq!(
            reconcile_special_authority(&mut state, account, false, true).unwrap(),
            SatelliteChange::Created
        );
        assert_eq!(
            reconcile_special_authority(&mut state, account, true, true).unwrap(),
            SatelliteChange::Unchanged
        );
        assert_eq!(
            reconcile_special_authority(&mut state, account, true, false).unwrap(),
            SatelliteChange::Removed
        );
        assert!(state.find_special_authority(account).is_none());
    }

    #[test]
    fn test_reconcile_detects_desync() {
        let mut state = LedgerState::default();
        let err = reconcile_special_authority(&mut state, AccountId(3), true, false).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_buyback_validation() {
        let mut state = LedgerState::default();
        let issuer = AccountId(8);
        let asset = state.create_asset("BUY", issuer);
        let committee_asset = state.create_asset("CORE", COMMITTEE_ACCOUNT);

        let options = BuybackOptions {
            asset_to_buy: asset,
            asset_to_buy_issuer: issuer,
            markets: BTreeSet::from([committee_asset]),
        };
        assert!(validate_buyback(&state, &options).is_ok());

        let wrong_issuer = BuybackOptions {
            asset_to_buy_issuer: AccountId(9),
            ..options.clone()
        };
        assert_eq!(
            validate_buyback(&state, &wrong_issuer),
            Err(EvaluatorError::BuybackIncorrectIssuer { expected: AccountId(9) })
        );

        attach_buyback(&mut state, AccountId(20), &options).unwrap();
        assert_eq!(state.find_asset(asset).unwrap().buyback_account, Some(AccountId(20)));
        assert_eq!(
            validate_buyback(&state, &options),
            Err(EvaluatorError::BuybackAlreadyExists(asset))
        );
    }

    #[test]
    fn test_create_asset_permission_toggle_leaves_no_residue() {
        let mut state = LedgerState::default();
        let account = AccountId(4);
        let first = set_create_asset_permission(&mut state, account, true).unwrap().unwrap();
        set_create_asset_permission(&mut state, account, false).unwrap();
        assert!(state.find_create_asset_permission(account).is_none());

        let second = set_create_asset_permission(&mut state, account, true).unwrap().unwrap();
        assert_ne!(first, second);
        assert!(state.find_create_asset_permission(account).unwrap().allow);
    }
}
