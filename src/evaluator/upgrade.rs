//! Membership upgrades: basic -> annual, annual renewal, and lifetime.

use tracing::info;

use super::{Evaluator, OperationResult};
use crate::error::EvaluatorError;
use crate::hardfork::Hardfork;
use crate::objects::AccountObject;
use crate::operations::AccountUpgradeOperation;
use crate::state::LedgerState;
use crate::types::{Timestamp, PERCENT_100};

pub const ANNUAL_MEMBERSHIP_DAYS: u64 = 365;
/// Renewals may not push expiration further than this past head time.
pub const MAX_MEMBERSHIP_LOOKAHEAD_DAYS: u64 = 3650;

/// Branch chosen during evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradePlan {
    Lifetime,
    RenewAnnual { new_expiration: Timestamp },
    BasicToAnnual { new_expiration: Timestamp },
}

pub struct AccountUpgradeEvaluator;

impl AccountUpgradeEvaluator {
    pub fn plan(
        state: &LedgerState,
        account: &AccountObject,
        to_lifetime: bool,
    ) -> Result<UpgradePlan, EvaluatorError> {
        if account.is_lifetime_member() {
            return Err(EvaluatorError::AlreadyLifetimeMember(account.id));
        }
        if to_lifetime {
            return Ok(UpgradePlan::Lifetime);
        }
        if state.is_active(Hardfork::AnnualMembershipSunset) {
            return Err(EvaluatorError::AnnualMembershipSunset);
        }

        let now = state.head_block_time();
        if account.is_annual_member(now) {
            let new_expiration = account
                .membership_expiration_date
                .plus_days(ANNUAL_MEMBERSHIP_DAYS);
            let limit = now.plus_days(MAX_MEMBERSHIP_LOOKAHEAD_DAYS);
            if new_expiration > limit {
                return Err(EvaluatorError::MembershipExtensionTooFar { limit });
            }
            Ok(UpgradePlan::RenewAnnual { new_expiration })
        } else {
            Ok(UpgradePlan::BasicToAnnual {
                new_expiration: now.plus_days(ANNUAL_MEMBERSHIP_DAYS),
            })
        }
    }
}

impl Evaluator for AccountUpgradeEvaluator {
    type Operation = AccountUpgradeOperation;
    type Context = UpgradePlan;

    fn evaluate(
        state: &LedgerState,
        op: &AccountUpgradeOperation,
    ) -> Result<UpgradePlan, EvaluatorError> {
        let account = state.account(op.account_to_upgrade)?;
        Self::plan(state, account, op.upgrade_to_lifetime_member)
    }

    fn apply(
        state: &mut LedgerState,
        op: &AccountUpgradeOperation,
        plan: UpgradePlan,
    ) -> Result<OperationResult, EvaluatorError> {
        let id = op.account_to_upgrade;
        let statistics = state.account(id)?.statistics;

        match plan {
            UpgradePlan::Lifetime => {
                let settled = state.modify_statistics(statistics, |s| s.process_fees())?;
                let network = state.parameters().network_percent_of_fee;
                state.modify_account(id, |a| {
                    a.membership_expiration_date = Timestamp::MAXIMUM;
                    a.registrar = id;
                    a.lifetime_referrer = id;
                    a.lifetime_referrer_fee_percentage = PERCENT_100.saturating_sub(network);
                })?;
                info!(account = %id, settled, "upgraded to lifetime member");
            }
            UpgradePlan::RenewAnnual { new_expiration } => {
                state.modify_account(id, |a| a.membership_expiration_date = new_expiration)?;
                info!(account = %id, expires = %new_expiration, "annual membership renewed");
            }
            UpgradePlan::BasicToAnnual { new_expiration } => {
                let settled = state.modify_statistics(statistics, |s| s.process_fees())?;
                state.modify_account(id, |a| a.membership_expiration_date = new_expiration)?;
                info!(account = %id, settled, expires = %new_expiration, "upgraded to annual member");
            }
        }
        Ok(OperationResult::Void)
    }
}
