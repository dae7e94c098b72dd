use std::collections::BTreeSet;
use tracing::{info, warn};

use super::{require_gate, Evaluator, OperationResult};
use crate::abuse;
use crate::authority::{evaluate_special_authority, verify_authority_accounts};
use crate::error::{EvaluatorError, ACCOUNT_CREATE_AUTH_ERRORS};
use crate::hardfork::Hardfork;
use crate::objects::AccountObject;
use crate::operations::AccountCreateOperation;
use crate::referral;
use crate::satellite;
use crate::state::LedgerState;
use crate::types::{AccountId, Timestamp, PERCENT_1, PERCENT_100};
use crate::votes::verify_account_votes;

pub struct AccountCreateEvaluator;

pub struct AccountCreateContext {
    /// Inherited from the referrer.
    pub lifetime_referrer: AccountId,
}

impl Evaluator for AccountCreateEvaluator {
    type Operation = AccountCreateOperation;
    type Context = AccountCreateContext;

    fn evaluate(
        state: &LedgerState,
        op: &AccountCreateOperation,
    ) -> Result<AccountCreateContext, EvaluatorError> {
        let ext = &op.extensions;
        require_gate(
            state,
            Hardfork::SpecialAuthority,
            "owner_special_authority",
            ext.owner_special_authority.is_some(),
        )?;
        require_gate(
            state,
            Hardfork::SpecialAuthority,
            "active_special_authority",
            ext.active_special_authority.is_some(),
        )?;
        require_gate(state, Hardfork::ExtensionFields, "null_ext", ext.null_ext.is_some())?;
        require_gate(
            state,
            Hardfork::ExtensionFields,
            "owner_special_authority",
            ext.owner_special_authority.is_some(),
        )?;
        require_gate(
            state,
            Hardfork::ExtensionFields,
            "active_special_authority",
            ext.active_special_authority.is_some(),
        )?;
        require_gate(
            state,
            Hardfork::ExtensionFields,
            "buyback_options",
            ext.buyback_options.is_some(),
        )?;
        require_gate(
            state,
            Hardfork::Buyback,
            "buyback_options",
            ext.buyback_options.is_some(),
        )?;

        abuse::enforce_usage_limits(state, [&op.owner, &op.active])?;
        referral::ensure_registrar_eligible(state, op.registrar)?;

        state.account(op.registrar)?;
        let referrer = state.account(op.referrer)?;

        if state.find_account(op.options.voting_account).is_none() {
            return Err(EvaluatorError::ProxyAccountNotFound(op.options.voting_account));
        }

        verify_authority_accounts(state, &op.owner)
            .and_then(|()| verify_authority_accounts(state, &op.active))
            .map_err(|e| ACCOUNT_CREATE_AUTH_ERRORS.recode(e))?;

        if let Some(special) = &ext.owner_special_authority {
            evaluate_special_authority(state, special)?;
        }
        if let Some(special) = &ext.active_special_authority {
            evaluate_special_authority(state, special)?;
        }
        if let Some(buyback) = &ext.buyback_options {
            satellite::validate_buyback(state, buyback)?;
        }

        verify_account_votes(state, &op.options)?;

        if !op.name.is_empty() && state.account_by_name(&op.name).is_some() {
            return Err(EvaluatorError::NameTaken(op.name.clone()));
        }

        Ok(AccountCreateContext {
            lifetime_referrer: referrer.lifetime_referrer,
        })
    }

    fn apply(
        state: &mut LedgerState,
        op: &AccountCreateOperation,
        ctx: AccountCreateContext,
    ) -> Result<OperationResult, EvaluatorError> {
        let referrer_percent = effective_referrer_percent(state, op);
        let params = state.parameters().clone();
        let ext = &op.extensions;

        let id = state.create_account(|id, statistics| AccountObject {
            id,
            name: op.name.clone(),
            registrar: op.registrar,
            referrer: op.referrer,
            lifetime_referrer: ctx.lifetime_referrer,
            network_fee_percentage: params.network_percent_of_fee,
            lifetime_referrer_fee_percentage: params.lifetime_referrer_percent_of_fee,
            referrer_rewards_percentage: referrer_percent,
            membership_expiration_date: Timestamp::default(),
            owner: op.owner.clone(),
            active: op.active.clone(),
            options: op.options.clone(),
            owner_special_authority: ext.owner_special_authority.clone().unwrap_or_default(),
            active_special_authority: ext.active_special_authority.clone().unwrap_or_default(),
            top_n_control_flags: 0,
            allowed_assets: ext.buyback_options.as_ref().map(|b| {
                let mut allowed: BTreeSet<_> = b.markets.clone();
                allowed.insert(b.asset_to_buy);
                allowed
            }),
            whitelisting_accounts: Default::default(),
            blacklisting_accounts: Default::default(),
            whitelisted_accounts: Default::default(),
            blacklisted_accounts: Default::default(),
            can_create_addresses: false,
            verification_is_required: false,
            addresses: Vec::new(),
            statistics,
        })?;

        let wants_special = state.account(id)?.has_special_authority();
        satellite::reconcile_special_authority(state, id, false, wants_special)?;
        if let Some(buyback) = &ext.buyback_options {
            satellite::attach_buyback(state, id, buyback)?;
        }

        let registered = state.modify_dynamic(|d| {
            d.accounts_registered_this_interval += 1;
            d.accounts_registered_this_interval
        });
        escalate_account_fee(state, registered);

        info!(account = %id, name = %op.name, registrar = %op.registrar, "account created");
        Ok(OperationResult::Account(id))
    }
}

/// Before the percent fix, clients sent whole percents where basis points
/// were meant. Rescale those so the stored value is in basis points.
fn effective_referrer_percent(state: &LedgerState, op: &AccountCreateOperation) -> u16 {
    let legacy = !state.is_active(Hardfork::ReferrerPercentFix)
        && op.referrer != op.registrar
        && op.referrer_percent != 0
        && op.referrer_percent <= 0x100;
    if !legacy {
        return op.referrer_percent;
    }
    if op.referrer_percent >= 100 {
        warn!(
            referrer_percent = op.referrer_percent,
            "referrer percent between 100% and 0x100%, capping at 100%"
        );
    }
    let scaled = u32::from(op.referrer_percent) * u32::from(PERCENT_1);
    let corrected = scaled.min(u32::from(PERCENT_100)) as u16;
    warn!(
        from = op.referrer_percent,
        to = corrected,
        "rescaled legacy referrer percent"
    );
    corrected
}

/// Every `accounts_per_fee_scale` registrations, the basic account fee is
/// shifted left by `account_fee_scale_bitshifts`.
fn escalate_account_fee(state: &mut LedgerState, registered: u32) {
    let params = state.parameters();
    let period = u32::from(params.accounts_per_fee_scale);
    if period == 0 || registered % period != 0 {
        return;
    }
    let shift = u32::from(params.account_fee_scale_bitshifts);
    let (old, new) = state.modify_global(|g| {
        let fee = &mut g.parameters.account_create_fee.basic_fee;
        let old = *fee;
        *fee = 1u64
            .checked_shl(shift)
            .map_or(u64::MAX, |factor| old.saturating_mul(factor));
        (old, *fee)
    });
    info!(registered, old, new, "account creation fee escalated");
}
