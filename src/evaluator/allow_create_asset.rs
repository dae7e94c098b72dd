use tracing::info;

use super::{Evaluator, OperationResult};
use crate::error::EvaluatorError;
use crate::operations::AllowCreateAssetOperation;
use crate::satellite;
use crate::state::LedgerState;

pub struct AllowCreateAssetEvaluator;

impl Evaluator for AllowCreateAssetEvaluator {
    type Operation = AllowCreateAssetOperation;
    type Context = ();

    fn evaluate(state: &LedgerState, op: &AllowCreateAssetOperation) -> Result<(), EvaluatorError> {
        state.account(op.to_account)?;
        if !op.value && state.find_create_asset_permission(op.to_account).is_none() {
            return Err(EvaluatorError::NoCreateAssetPermission(op.to_account));
        }
        Ok(())
    }

    fn apply(
        state: &mut LedgerState,
        op: &AllowCreateAssetOperation,
        _ctx: (),
    ) -> Result<OperationResult, EvaluatorError> {
        let created = satellite::set_create_asset_permission(state, op.to_account, op.value)?;
        info!(account = %op.to_account, allow = op.value, "create-asset permission set");
        Ok(created.map_or(OperationResult::Void, OperationResult::AllowCreateAsset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::apply_operation;
    use crate::evaluator::testing::*;
    use crate::operations::Operation;
    use crate::types::AccountId;

    fn allow(to_account: AccountId, value: bool) -> Operation {
        Operation::AllowCreateAsset(AllowCreateAssetOperation { to_account, value })
    }

    #[test]
    fn test_toggle_round_trip() {
        let mut f = fixture(AFTER_GATES);
        let first = apply_operation(&mut f.state, &allow(f.nathan, true)).unwrap();
        assert!(matches!(first, OperationResult::AllowCreateAsset(_)));

        // A second grant reuses the record.
        assert_eq!(
            apply_operation(&mut f.state, &allow(f.nathan, true)),
            Ok(OperationResult::Void)
        );

        apply_operation(&mut f.state, &allow(f.nathan, false)).unwrap();
        assert!(f.state.find_create_asset_permission(f.nathan).is_none());

        let second = apply_operation(&mut f.state, &allow(f.nathan, true)).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_revoke_requires_record() {
        let mut f = fixture(AFTER_GATES);
        assert_eq!(
            apply_operation(&mut f.state, &allow(f.nathan, false)),
            Err(EvaluatorError::NoCreateAssetPermission(f.nathan))
        );
    }
}
