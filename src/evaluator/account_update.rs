use tracing::info;

use super::{require_gate, Evaluator, OperationResult};
use crate::abuse;
use crate::authority::{evaluate_special_authority, verify_authority_accounts};
use crate::error::{EvaluatorError, ACCOUNT_UPDATE_AUTH_ERRORS};
use crate::hardfork::Hardfork;
use crate::operations::AccountUpdateOperation;
use crate::satellite;
use crate::state::LedgerState;
use crate::votes::verify_account_votes;

pub struct AccountUpdateEvaluator;

impl Evaluator for AccountUpdateEvaluator {
    type Operation = AccountUpdateOperation;
    type Context = ();

    fn evaluate(state: &LedgerState, op: &AccountUpdateOperation) -> Result<(), EvaluatorError> {
        let ext = &op.extensions;
        for gate in [Hardfork::SpecialAuthority, Hardfork::ExtensionFields] {
            require_gate(
                state,
                gate,
                "owner_special_authority",
                ext.owner_special_authority.is_some(),
            )?;
            require_gate(
                state,
                gate,
                "active_special_authority",
                ext.active_special_authority.is_some(),
            )?;
        }
        require_gate(state, Hardfork::ExtensionFields, "null_ext", ext.null_ext.is_some())?;

        abuse::enforce_usage_limits(state, op.owner.iter().chain(op.active.iter()))?;

        for authority in op.owner.iter().chain(op.active.iter()) {
            verify_authority_accounts(state, authority)
                .map_err(|e| ACCOUNT_UPDATE_AUTH_ERRORS.recode(e))?;
        }
        if let Some(special) = &ext.owner_special_authority {
            evaluate_special_authority(state, special)?;
        }
        if let Some(special) = &ext.active_special_authority {
            evaluate_special_authority(state, special)?;
        }

        state.account(op.account)?;
        if let Some(options) = &op.new_options {
            verify_account_votes(state, options)?;
        }
        Ok(())
    }

    fn apply(
        state: &mut LedgerState,
        op: &AccountUpdateOperation,
        _ctx: (),
    ) -> Result<OperationResult, EvaluatorError> {
        let ext = &op.extensions;
        let (had_special, wants_special) = state.modify_account(op.account, |a| {
            let had = a.has_special_authority();
            if let Some(owner) = &op.owner {
                a.owner = owner.clone();
                a.top_n_control_flags = 0;
            }
            if let Some(active) = &op.active {
                a.active = active.clone();
                a.top_n_control_flags = 0;
            }
            if let Some(options) = &op.new_options {
                a.options = options.clone();
            }
            if let Some(special) = &ext.owner_special_authority {
                a.owner_special_authority = special.clone();
                a.top_n_control_flags = 0;
            }
            if let Some(special) = &ext.active_special_authority {
                a.active_special_authority = special.clone();
                a.top_n_control_flags = 0;
            }
            (had, a.has_special_authority())
        })?;
        satellite::reconcile_special_authority(state, op.account, had_special, wants_special)?;

        info!(account = %op.account, "account updated");
        Ok(OperationResult::Void)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AbuseLimitError;
    use crate::evaluator::apply_operation;
    use crate::evaluator::testing::*;
    use crate::operations::{AccountUpdateExtensions, Operation};
    use crate::satellite::verify_special_authority_bijection;
    use crate::types::{AccountId, Authority, SpecialAuthority, VoteId, VoteType};

    fn update(account: AccountId) -> AccountUpdateOperation {
        AccountUpdateOperation {
            account,
            owner: None,
            active: None,
            new_options: None,
            extensions: AccountUpdateExtensions::default(),
        }
    }

    fn top_holders(f: &Fixture) -> SpecialAuthority {
        SpecialAuthority::TopHolders {
            asset: f.gold,
            num_top_holders: 2,
        }
    }

    #[test]
    fn test_key_rotation_resets_control_flags() {
        let mut f = fixture(AFTER_GATES);
        f.state
            .modify_account(f.nathan, |a| a.top_n_control_flags = 3)
            .unwrap();

        let mut op = update(f.nathan);
        op.active = Some(Authority::from_key(key(9)));
        apply_operation(&mut f.state, &Operation::AccountUpdate(op)).unwrap();

        let account = f.state.account(f.nathan).unwrap();
        assert_eq!(account.active, Authority::from_key(key(9)));
        assert_eq!(account.top_n_control_flags, 0);
    }

    #[test]
    fn test_options_only_keeps_control_flags() {
        let mut f = fixture(AFTER_GATES);
        f.state
            .modify_account(f.nathan, |a| a.top_n_control_flags = 3)
            .unwrap();

        let mut options = f.state.account(f.nathan).unwrap().options.clone();
        options.voting_account = f.registrar;
        let mut op = update(f.nathan);
        op.new_options = Some(options);
        apply_operation(&mut f.state, &Operation::AccountUpdate(op)).unwrap();

        let account = f.state.account(f.nathan).unwrap();
        assert_eq!(account.options.voting_account, f.registrar);
        assert_eq!(account.top_n_control_flags, 3);
    }

    #[test]
    fn test_special_authority_set_then_cleared() {
        let mut f = fixture(AFTER_GATES);
        let mut op = update(f.nathan);
        op.extensions.owner_special_authority = Some(top_holders(&f));
        apply_operation(&mut f.state, &Operation::AccountUpdate(op)).unwrap();
        assert!(f.state.find_special_authority(f.nathan).is_some());

        let mut op = update(f.nathan);
        op.extensions.active_special_authority = Some(top_holders(&f));
        apply_operation(&mut f.state, &Operation::AccountUpdate(op)).unwrap();
        assert_eq!(f.state.special_authority_count(), 1);

        let mut op = update(f.nathan);
        op.extensions.owner_special_authority = Some(SpecialAuthority::NoSpecialAuthority);
        op.extensions.active_special_authority = Some(SpecialAuthority::NoSpecialAuthority);
        apply_operation(&mut f.state, &Operation::AccountUpdate(op)).unwrap();
        assert!(f.state.find_special_authority(f.nathan).is_none());
        verify_special_authority_bijection(&f.state).unwrap();
    }

    #[test]
    fn test_special_authority_rejected_before_gate() {
        let mut f = fixture(BEFORE_GATES);
        let mut op = update(f.nathan);
        op.extensions.active_special_authority = Some(top_holders(&f));
        assert_eq!(
            apply_operation(&mut f.state, &Operation::AccountUpdate(op)),
            Err(EvaluatorError::UnsupportedExtension {
                field: "active_special_authority",
                gate: Hardfork::SpecialAuthority,
            })
        );
    }

    #[test]
    fn test_authority_errors_recoded_for_update() {
        let mut f = fixture(AFTER_GATES);
        let mut op = update(f.nathan);
        op.owner = Some(Authority::from_key(key(9)).with_account(AccountId(999), 1));
        assert_eq!(
            apply_operation(&mut f.state, &Operation::AccountUpdate(op)),
            Err(EvaluatorError::AccountUpdateAuthAccountNotFound(AccountId(999)))
        );
    }

    #[test]
    fn test_unknown_account() {
        let mut f = fixture(AFTER_GATES);
        let mut op = update(AccountId(999));
        op.active = Some(Authority::from_key(key(9)));
        assert_eq!(
            apply_operation(&mut f.state, &Operation::AccountUpdate(op)),
            Err(EvaluatorError::AccountNotFound(AccountId(999)))
        );
    }

    #[test]
    fn test_abuse_limit_applies_to_new_keys() {
        let mut f = fixture(AFTER_GATES);
        let shared = key(200);
        let mut op = update(f.nathan);
        op.active = Some(Authority::from_key(shared));
        apply_operation(&mut f.state, &Operation::AccountUpdate(op.clone())).unwrap();
        // init0 and nathan reference it; give it a third holder.
        f.state
            .modify_account(crate::types::TEMP_ACCOUNT, |a| {
                a.owner = Authority::from_key(shared)
            })
            .unwrap();
        let err = apply_operation(&mut f.state, &Operation::AccountUpdate(op)).unwrap_err();
        assert_eq!(
            err,
            EvaluatorError::AbuseLimit(AbuseLimitError::KeyOverused { key: shared, count: 3 })
        );
    }

    #[test]
    fn test_abuse_limit_applies_to_new_account_references() {
        let mut f = fixture(AFTER_GATES);
        let mut holders = Vec::new();
        for (name, seed) in [("alice", 1), ("bob", 2), ("carol", 3)] {
            let mut op = create_op(f.registrar, name, key(seed));
            op.active = op.active.with_account(f.nathan, 1);
            apply_operation(&mut f.state, &Operation::AccountCreate(op)).unwrap();
            holders.push(f.state.account_by_name(name).unwrap().id);
        }
        assert_eq!(f.state.members().account_references(f.nathan), 3);

        let mut op = update(f.registrar);
        op.active = Some(Authority::from_key(key(9)).with_account(f.nathan, 1));
        assert_eq!(
            apply_operation(&mut f.state, &Operation::AccountUpdate(op.clone())),
            Err(EvaluatorError::AbuseLimit(AbuseLimitError::AccountOverused {
                account: f.nathan,
                count: 3
            }))
        );

        // Dropping one reference frees a slot.
        let mut release = update(holders[0]);
        release.active = Some(Authority::from_key(key(1)));
        apply_operation(&mut f.state, &Operation::AccountUpdate(release)).unwrap();
        assert_eq!(f.state.members().account_references(f.nathan), 2);

        apply_operation(&mut f.state, &Operation::AccountUpdate(op)).unwrap();
        assert_eq!(f.state.members().account_references(f.nathan), 3);
    }

    #[test]
    fn test_vote_for_unknown_id_rejected() {
        let mut f = fixture(AFTER_GATES);
        let mut options = f.state.account(f.nathan).unwrap().options.clone();
        options.votes.insert(VoteId::new(VoteType::Worker, 500));
        let mut op = update(f.nathan);
        op.new_options = Some(options);
        assert!(matches!(
            apply_operation(&mut f.state, &Operation::AccountUpdate(op)),
            Err(EvaluatorError::Votes(_))
        ));
    }
}
