//! Anti-abuse accounting over authority membership.
//!
//! `AccountMemberIndex` maps every key and account to the accounts whose
//! owner or active authority names it. Lookups touch only the entry for
//! the candidate key/account.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::crypto::PublicKey;
use crate::error::AbuseLimitError;
use crate::hardfork::Hardfork;
use crate::objects::AccountObject;
use crate::state::LedgerState;
use crate::types::{AccountId, Authority};

/// Existing references at which a key or account can no longer be named.
pub const ABUSE_REFERENCE_LIMIT: usize = 3;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountMemberIndex {
    account_to_account_memberships: BTreeMap<AccountId, BTreeSet<AccountId>>,
    account_to_key_memberships: BTreeMap<PublicKey, BTreeSet<AccountId>>,
}

impl AccountMemberIndex {
    pub fn insert(&mut self, account: &AccountObject) {
        for member in Self::account_members(account) {
            self.account_to_account_memberships
                .entry(member)
                .or_default()
                .insert(account.id);
        }
        for key in Self::key_members(account) {
            self.account_to_key_memberships
                .entry(key)
                .or_default()
                .insert(account.id);
        }
    }

    pub fn remove(&mut self, account: &AccountObject) {
        for member in Self::account_members(account) {
            if let Some(set) = self.account_to_account_memberships.get_mut(&member) {
                set.remove(&account.id);
                if set.is_empty() {
                    self.account_to_account_memberships.remove(&member);
                }
            }
        }
        for key in Self::key_members(account) {
            if let Some(set) = self.account_to_key_memberships.get_mut(&key) {
                set.remove(&account.id);
                if set.is_empty() {
                    self.account_to_key_memberships.remove(&key);
                }
            }
        }
    }

    /// Accounts whose authorities name `key`.
    pub fn key_references(&self, key: &PublicKey) -> usize {
        self.account_to_key_memberships.get(key).map_or(0, BTreeSet::len)
    }

    /// Accounts whose authorities name `account`.
    pub fn account_references(&self, account: AccountId) -> usize {
        self.account_to_account_memberships
            .get(&account)
            .map_or(0, BTreeSet::len)
    }

    fn account_members(account: &AccountObject) -> BTreeSet<AccountId> {
        account.owner.accounts().chain(account.active.accounts()).collect()
    }

    fn key_members(account: &AccountObject) -> BTreeSet<PublicKey> {
        account
            .owner
            .keys()
            .chain(account.active.keys())
            .copied()
            .collect()
    }
}

/// Accounts and keys named by a set of authorities, deduplicated.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AuthorityMembers {
    pub accounts: BTreeSet<AccountId>,
    pub keys: BTreeSet<PublicKey>,
}

impl AuthorityMembers {
    pub fn collect<'a>(authorities: impl IntoIterator<Item = &'a Authority>) -> Self {
        let mut members = AuthorityMembers::default();
        for authority in authorities {
            members.accounts.extend(authority.accounts());
            members.keys.extend(authority.keys().copied());
        }
        members
    }
}

/// Reject candidates already referenced by `ABUSE_REFERENCE_LIMIT` accounts.
///
/// Only the forward-going limit is enforced; data that predates the gate
/// may exceed it.
pub fn check_accounts_usage(
    index: &AccountMemberIndex,
    members: &AuthorityMembers,
) -> Result<(), AbuseLimitError> {
    for key in &members.keys {
        let count = index.key_references(key);
        if count >= ABUSE_REFERENCE_LIMIT {
            return Err(AbuseLimitError::KeyOverused { key: *key, count });
        }
    }
    for account in &members.accounts {
        let count = index.account_references(*account);
        if count >= ABUSE_REFERENCE_LIMIT {
            return Err(AbuseLimitError::AccountOverused {
                account: *account,
                count,
            });
        }
    }
    Ok(())
}

/// Apply the usage check when the gate is active and referrer mode is off.
pub fn enforce_usage_limits<'a>(
    state: &LedgerState,
    authorities: impl IntoIterator<Item = &'a Authority>,
) -> Result<(), AbuseLimitError> {
    if !abuse_accounting_applies(state) {
        return Ok(());
    }
    let members = AuthorityMembers::collect(authorities);
    check_accounts_usage(state.members(), &members)
}

pub fn abuse_accounting_applies(state: &LedgerState) -> bool {
    state.is_active(Hardfork::AbuseAccounting) && !state.parameters().referrer_mode_enabled
}
