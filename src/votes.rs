use crate::error::VoteError;
use crate::hardfork::Hardfork;
use crate::state::LedgerState;
use crate::types::{AccountOptions, VoteType};

/// Checks on an account's votes that need chain state. Count consistency of
/// the options themselves is checked by `Operation::validate`.
pub fn verify_account_votes(state: &LedgerState, options: &AccountOptions) -> Result<(), VoteError> {
    let global = state.global();
    let params = &global.parameters;

    if options.num_witness > params.maximum_witness_count {
        return Err(VoteError::TooManyWitnessVotes {
            max: params.maximum_witness_count,
        });
    }
    if options.num_committee > params.maximum_committee_count {
        return Err(VoteError::TooManyCommitteeVotes {
            max: params.maximum_committee_count,
        });
    }

    let next = global.next_available_vote_id;
    let mut has_worker_votes = false;
    for vote in &options.votes {
        if vote.instance() >= next {
            return Err(VoteError::VoteIdOutOfRange { vote: *vote, next });
        }
        has_worker_votes |= vote.vote_type() == Some(VoteType::Worker);
    }

    if has_worker_votes && state.is_active(Hardfork::WorkerAgainstVotes) {
        let rejected = options
            .votes
            .iter()
            .filter(|v| v.vote_type() == Some(VoteType::Worker))
            .find(|v| state.is_worker_vote_against(**v));
        if let Some(vote) = rejected {
            return Err(VoteError::VoteForRejectedWorker(*vote));
        }
    }

    Ok(())
}
