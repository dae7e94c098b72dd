//! In-memory ledger state accessor.
//!
//! Typed create/read/modify/remove per entity kind plus the secondary
//! indexes the evaluators query. Secondary indexes are derived data: they
//! are skipped on serialization and rebuilt with `rebuild_indexes`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use crate::abuse::AccountMemberIndex;
use crate::crypto::derive_address;
use crate::error::EvaluatorError;
use crate::hardfork::{Hardfork, HardforkSchedule};
use crate::objects::{
    AccountObject, AccountProperties, AccountStatistics, AccountsOnline, AllowCreateAssetObject,
    AssetObject, BuybackObject, ChainParameters, DynamicGlobalProperties, GlobalProperties,
    RestrictedAccountObject, SpecialAuthorityObject, WorkerObject,
};
use crate::types::{
    AccountId, Address, AllowCreateAssetId, AssetId, BuybackId, RestrictedAccountId,
    SpecialAuthorityId, StatisticsId, Timestamp, VoteId, VoteType, WorkerId,
};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
struct NextIds {
    account: u64,
    statistics: u64,
    asset: u64,
    worker: u64,
    special_authority: u64,
    buyback: u64,
    restricted_account: u64,
    create_asset_permission: u64,
}

fn take(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter += 1;
    id
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct SecondaryIndexes {
    account_by_name: BTreeMap<String, AccountId>,
    members: AccountMemberIndex,
    special_authority_by_account: BTreeMap<AccountId, SpecialAuthorityId>,
    buyback_by_asset: BTreeMap<AssetId, BuybackId>,
    restriction_by_account: BTreeMap<AccountId, RestrictedAccountId>,
    restrictions_by_type: BTreeMap<u8, BTreeSet<RestrictedAccountId>>,
    create_asset_by_account: BTreeMap<AccountId, AllowCreateAssetId>,
    worker_by_vote_against: BTreeMap<VoteId, WorkerId>,
}

fn missing(kind: &str, id: impl Display) -> EvaluatorError {
    EvaluatorError::Invariant(format!("{kind} for {id} does not exist"))
}

fn duplicate(kind: &str, id: impl Display) -> EvaluatorError {
    EvaluatorError::Invariant(format!("{kind} for {id} already exists"))
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerState {
    global: GlobalProperties,
    dynamic: DynamicGlobalProperties,
    hardforks: HardforkSchedule,
    accounts: BTreeMap<AccountId, AccountObject>,
    statistics: BTreeMap<StatisticsId, AccountStatistics>,
    assets: BTreeMap<AssetId, AssetObject>,
    workers: BTreeMap<WorkerId, WorkerObject>,
    special_authorities: BTreeMap<SpecialAuthorityId, SpecialAuthorityObject>,
    buybacks: BTreeMap<BuybackId, BuybackObject>,
    restricted_accounts: BTreeMap<RestrictedAccountId, RestrictedAccountObject>,
    create_asset_permissions: BTreeMap<AllowCreateAssetId, AllowCreateAssetObject>,
    account_properties: BTreeMap<AccountId, AccountProperties>,
    accounts_online: AccountsOnline,
    next_ids: NextIds,
    #[serde(skip)]
    indexes: SecondaryIndexes,
}

impl LedgerState {
    pub fn new(parameters: ChainParameters, hardforks: HardforkSchedule) -> Self {
        Self {
            global: GlobalProperties {
                parameters,
                next_available_vote_id: 0,
            },
            hardforks,
            ..Default::default()
        }
    }

    /// Recompute every secondary index from primary data.
    pub fn rebuild_indexes(&mut self) {
        let mut indexes = SecondaryIndexes::default();
        for account in self.accounts.values() {
            if !account.name.is_empty() {
                indexes.account_by_name.insert(account.name.clone(), account.id);
            }
            indexes.members.insert(account);
        }
        for sa in self.special_authorities.values() {
            indexes.special_authority_by_account.insert(sa.account, sa.id);
        }
        for bb in self.buybacks.values() {
            indexes.buyback_by_asset.insert(bb.asset_to_buy, bb.id);
        }
        for r in self.restricted_accounts.values() {
            indexes.restriction_by_account.insert(r.account, r.id);
            indexes
                .restrictions_by_type
                .entry(r.restriction_type)
                .or_default()
                .insert(r.id);
        }
        for p in self.create_asset_permissions.values() {
            indexes.create_asset_by_account.insert(p.account, p.id);
        }
        for w in self.workers.values() {
            indexes.worker_by_vote_against.insert(w.vote_against, w.id);
        }
        self.indexes = indexes;
    }

    // --- Chain time and parameters ---

    pub fn head_block_time(&self) -> Timestamp {
        self.dynamic.time
    }

    pub fn head_block_num(&self) -> u64 {
        self.dynamic.head_block_number
    }

    pub fn set_head_block(&mut self, number: u64, time: Timestamp) {
        self.dynamic.head_block_number = number;
        self.dynamic.time = time;
    }

    pub fn hardforks(&self) -> &HardforkSchedule {
        &self.hardforks
    }

    pub fn is_active(&self, hardfork: Hardfork) -> bool {
        self.hardforks.is_active(hardfork, self.head_block_time())
    }

    pub fn global(&self) -> &GlobalProperties {
        &self.global
    }

    pub fn parameters(&self) -> &ChainParameters {
        &self.global.parameters
    }

    pub fn modify_global<R>(&mut self, f: impl FnOnce(&mut GlobalProperties) -> R) -> R {
        f(&mut self.global)
    }

    pub fn dynamic(&self) -> &DynamicGlobalProperties {
        &self.dynamic
    }

    pub fn modify_dynamic<R>(&mut self, f: impl FnOnce(&mut DynamicGlobalProperties) -> R) -> R {
        f(&mut self.dynamic)
    }

    /// Next address of the chain-wide address sequence.
    pub fn mint_address(&mut self) -> Address {
        let index = take(&mut self.dynamic.next_address_index);
        derive_address(index)
    }

    // --- Accounts ---

    pub fn find_account(&self, id: AccountId) -> Option<&AccountObject> {
        self.accounts.get(&id)
    }

    pub fn account(&self, id: AccountId) -> Result<&AccountObject, EvaluatorError> {
        self.accounts.get(&id).ok_or(EvaluatorError::AccountNotFound(id))
    }

    pub fn account_by_name(&self, name: &str) -> Option<&AccountObject> {
        self.indexes
            .account_by_name
            .get(name)
            .and_then(|id| self.accounts.get(id))
    }

    pub fn accounts(&self) -> impl Iterator<Item = &AccountObject> + '_ {
        self.accounts.values()
    }

    pub fn members(&self) -> &AccountMemberIndex {
        &self.indexes.members
    }

    /// Create an account and its statistics companion. `build` receives the
    /// ids allocated for both.
    pub fn create_account(
        &mut self,
        build: impl FnOnce(AccountId, StatisticsId) -> AccountObject,
    ) -> Result<AccountId, EvaluatorError> {
        let id = AccountId(take(&mut self.next_ids.account));
        let stats_id = StatisticsId(take(&mut self.next_ids.statistics));
        let mut account = build(id, stats_id);
        account.id = id;
        account.statistics = stats_id;

        if !account.name.is_empty() {
            if self.indexes.account_by_name.contains_key(&account.name) {
                return Err(EvaluatorError::Invariant(format!(
                    "account name '{}' already indexed",
                    account.name
                )));
            }
            self.indexes.account_by_name.insert(account.name.clone(), id);
        }
        self.statistics.insert(
            stats_id,
            AccountStatistics {
                id: stats_id,
                owner: id,
                ..Default::default()
            },
        );
        self.indexes.members.insert(&account);
        self.accounts.insert(id, account);
        Ok(id)
    }

    /// Mutate an account in place, keeping the member index in sync.
    pub fn modify_account<R>(
        &mut self,
        id: AccountId,
        f: impl FnOnce(&mut AccountObject) -> R,
    ) -> Result<R, EvaluatorError> {
        let account = self.accounts.get_mut(&id).ok_or_else(|| missing("account", id))?;
        let name = account.name.clone();
        self.indexes.members.remove(account);
        let out = f(account);
        self.indexes.members.insert(account);
        if account.name != name || account.id != id {
            return Err(EvaluatorError::Invariant(format!(
                "account {id} identity changed during modify"
            )));
        }
        Ok(out)
    }

    pub fn statistics(&self, id: StatisticsId) -> Result<&AccountStatistics, EvaluatorError> {
        self.statistics.get(&id).ok_or_else(|| missing("statistics", id))
    }

    pub fn modify_statistics<R>(
        &mut self,
        id: StatisticsId,
        f: impl FnOnce(&mut AccountStatistics) -> R,
    ) -> Result<R, EvaluatorError> {
        let stats = self.statistics.get_mut(&id).ok_or_else(|| missing("statistics", id))?;
        Ok(f(stats))
    }

    // --- Assets and workers ---

    pub fn create_asset(&mut self, symbol: impl Into<String>, issuer: AccountId) -> AssetId {
        let id = AssetId(take(&mut self.next_ids.asset));
        self.assets.insert(
            id,
            AssetObject {
                id,
                symbol: symbol.into(),
                issuer,
                buyback_account: None,
            },
        );
        id
    }

    pub fn find_asset(&self, id: AssetId) -> Option<&AssetObject> {
        self.assets.get(&id)
    }

    pub fn asset(&self, id: AssetId) -> Result<&AssetObject, EvaluatorError> {
        self.assets.get(&id).ok_or(EvaluatorError::AssetNotFound(id))
    }

    pub fn modify_asset<R>(
        &mut self,
        id: AssetId,
        f: impl FnOnce(&mut AssetObject) -> R,
    ) -> Result<R, EvaluatorError> {
        let asset = self.assets.get_mut(&id).ok_or_else(|| missing("asset", id))?;
        Ok(f(asset))
    }

    /// Register a worker, allocating its for/against vote ids.
    pub fn create_worker(&mut self, name: impl Into<String>) -> WorkerId {
        let id = WorkerId(take(&mut self.next_ids.worker));
        let next = &mut self.global.next_available_vote_id;
        let vote_for = VoteId::new(VoteType::Worker, *next);
        let vote_against = VoteId::new(VoteType::Worker, *next + 1);
        *next += 2;
        self.workers.insert(
            id,
            WorkerObject {
                id,
                name: name.into(),
                vote_for,
                vote_against,
            },
        );
        self.indexes.worker_by_vote_against.insert(vote_against, id);
        id
    }

    pub fn worker(&self, id: WorkerId) -> Option<&WorkerObject> {
        self.workers.get(&id)
    }

    pub fn is_worker_vote_against(&self, vote: VoteId) -> bool {
        self.indexes.worker_by_vote_against.contains_key(&vote)
    }

    // --- Special authorities ---

    pub fn find_special_authority(&self, account: AccountId) -> Option<&SpecialAuthorityObject> {
        self.indexes
            .special_authority_by_account
            .get(&account)
            .and_then(|id| self.special_authorities.get(id))
    }

    pub fn create_special_authority(
        &mut self,
        account: AccountId,
    ) -> Result<SpecialAuthorityId, EvaluatorError> {
        if self.indexes.special_authority_by_account.contains_key(&account) {
            return Err(duplicate("special authority", account));
        }
        let id = SpecialAuthorityId(take(&mut self.next_ids.special_authority));
        self.special_authorities
            .insert(id, SpecialAuthorityObject { id, account });
        self.indexes.special_authority_by_account.insert(account, id);
        Ok(id)
    }

    pub fn remove_special_authority(&mut self, account: AccountId) -> Result<(), EvaluatorError> {
        let id = self
            .indexes
            .special_authority_by_account
            .remove(&account)
            .ok_or_else(|| missing("special authority", account))?;
        self.special_authorities.remove(&id);
        Ok(())
    }

    pub fn special_authority_count(&self) -> usize {
        self.special_authorities.len()
    }

    // --- Buybacks ---

    pub fn find_buyback(&self, asset: AssetId) -> Option<&BuybackObject> {
        self.indexes
            .buyback_by_asset
            .get(&asset)
            .and_then(|id| self.buybacks.get(id))
    }

    pub fn create_buyback(&mut self, asset_to_buy: AssetId) -> Result<BuybackId, EvaluatorError> {
        if self.indexes.buyback_by_asset.contains_key(&asset_to_buy) {
            return Err(duplicate("buyback", asset_to_buy));
        }
        let id = BuybackId(take(&mut self.next_ids.buyback));
        self.buybacks.insert(id, BuybackObject { id, asset_to_buy });
        self.indexes.buyback_by_asset.insert(asset_to_buy, id);
        Ok(id)
    }

    // --- Restrictions ---

    pub fn find_restriction(&self, account: AccountId) -> Option<&RestrictedAccountObject> {
        self.indexes
            .restriction_by_account
            .get(&account)
            .and_then(|id| self.restricted_accounts.get(id))
    }

    /// Restriction records with any of the `mask` bits set.
    pub fn restrictions_matching(
        &self,
        mask: u8,
    ) -> impl Iterator<Item = &RestrictedAccountObject> + '_ {
        self.indexes
            .restrictions_by_type
            .iter()
            .filter(move |(restriction_type, _)| *restriction_type & mask != 0)
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.restricted_accounts.get(id))
    }

    fn index_restriction_type(&mut self, restriction_type: u8, id: RestrictedAccountId) {
        self.indexes
            .restrictions_by_type
            .entry(restriction_type)
            .or_default()
            .insert(id);
    }

    fn unindex_restriction_type(&mut self, restriction_type: u8, id: RestrictedAccountId) {
        if let Some(ids) = self.indexes.restrictions_by_type.get_mut(&restriction_type) {
            ids.remove(&id);
            if ids.is_empty() {
                self.indexes.restrictions_by_type.remove(&restriction_type);
            }
        }
    }

    pub fn create_restriction(
        &mut self,
        account: AccountId,
        restriction_type: u8,
    ) -> Result<RestrictedAccountId, EvaluatorError> {
        if self.indexes.restriction_by_account.contains_key(&account) {
            return Err(duplicate("restriction", account));
        }
        let id = RestrictedAccountId(take(&mut self.next_ids.restricted_account));
        self.restricted_accounts.insert(
            id,
            RestrictedAccountObject {
                id,
                account,
                restriction_type,
            },
        );
        self.indexes.restriction_by_account.insert(account, id);
        self.index_restriction_type(restriction_type, id);
        Ok(id)
    }

    pub fn modify_restriction(
        &mut self,
        account: AccountId,
        restriction_type: u8,
    ) -> Result<(), EvaluatorError> {
        let record = self
            .indexes
            .restriction_by_account
            .get(&account)
            .and_then(|id| self.restricted_accounts.get_mut(id))
            .ok_or_else(|| missing("restriction", account))?;
        let (id, previous) = (record.id, record.restriction_type);
        record.restriction_type = restriction_type;
        self.unindex_restriction_type(previous, id);
        self.index_restriction_type(restriction_type, id);
        Ok(())
    }

    pub fn remove_restriction(&mut self, account: AccountId) -> Result<(), EvaluatorError> {
        let id = self
            .indexes
            .restriction_by_account
            .remove(&account)
            .ok_or_else(|| missing("restriction", account))?;
        if let Some(record) = self.restricted_accounts.remove(&id) {
            self.unindex_restriction_type(record.restriction_type, id);
        }
        Ok(())
    }

    // --- Create-asset permissions ---

    pub fn find_create_asset_permission(
        &self,
        account: AccountId,
    ) -> Option<&AllowCreateAssetObject> {
        self.indexes
            .create_asset_by_account
            .get(&account)
            .and_then(|id| self.create_asset_permissions.get(id))
    }

    pub fn create_create_asset_permission(
        &mut self,
        account: AccountId,
        allow: bool,
    ) -> Result<AllowCreateAssetId, EvaluatorError> {
        if self.indexes.create_asset_by_account.contains_key(&account) {
            return Err(duplicate("create-asset permission", account));
        }
        let id = AllowCreateAssetId(take(&mut self.next_ids.create_asset_permission));
        self.create_asset_permissions
            .insert(id, AllowCreateAssetObject { id, account, allow });
        self.indexes.create_asset_by_account.insert(account, id);
        Ok(id)
    }

    pub fn modify_create_asset_permission(
        &mut self,
        account: AccountId,
        allow: bool,
    ) -> Result<(), EvaluatorError> {
        let record = self
            .indexes
            .create_asset_by_account
            .get(&account)
            .and_then(|id| self.create_asset_permissions.get_mut(id))
            .ok_or_else(|| missing("create-asset permission", account))?;
        record.allow = allow;
        Ok(())
    }

    pub fn remove_create_asset_permission(
        &mut self,
        account: AccountId,
    ) -> Result<(), EvaluatorError> {
        let id = self
            .indexes
            .create_asset_by_account
            .remove(&account)
            .ok_or_else(|| missing("create-asset permission", account))?;
        self.create_asset_permissions.remove(&id);
        Ok(())
    }

    // --- Account properties (referrer eligibility) ---

    pub fn account_properties(&self, account: AccountId) -> Option<&AccountProperties> {
        self.account_properties.get(&account)
    }

    pub fn set_can_be_referrer(&mut self, account: AccountId, can_be_referrer: bool) {
        self.account_properties
            .entry(account)
            .or_default()
            .can_be_referrer = can_be_referrer;
    }

    // --- Online time ---

    pub fn accounts_online(&self) -> &AccountsOnline {
        &self.accounts_online
    }

    pub fn set_online_info(&mut self, online_info: BTreeMap<AccountId, u16>) {
        self.accounts_online.online_info = online_info;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::types::{AccountOptions, Authority, PROXY_TO_SELF_ACCOUNT};

    fn blank_account(name: &str, seed: u8) -> impl FnOnce(AccountId, StatisticsId) -> AccountObject {
        let key = KeyPair::from_seed([seed; 32]).public_key();
        let name = name.to_string();
        move |id, statistics| AccountObject {
            id,
            name,
            registrar: id,
            referrer: id,
            lifetime_referrer: id,
            network_fee_percentage: 0,
            lifetime_referrer_fee_percentage: 0,
            referrer_rewards_percentage: 0,
            membership_expiration_date: Timestamp::default(),
            owner: Authority::from_key(key),
            active: Authority::from_key(key),
            options: AccountOptions {
                voting_account: PROXY_TO_SELF_ACCOUNT,
                ..AccountOptions::new(key)
            },
            owner_special_authority: Default::default(),
            active_special_authority: Default::default(),
            top_n_control_flags: 0,
            allowed_assets: None,
            whitelisting_accounts: Default::default(),
            blacklisting_accounts: Default::default(),
            whitelisted_accounts: Default::default(),
            blacklisted_accounts: Default::default(),
            can_create_addresses: false,
            verification_is_required: false,
            addresses: Vec::new(),
            statistics,
        }
    }

    #[test]
    fn test_create_account_indexes_name_and_members() {
        let mut state = LedgerState::default();
        let id = state.create_account(blank_account("alice", 1)).unwrap();

        assert_eq!(state.account_by_name("alice").map(|a| a.id), Some(id));
        let key = KeyPair::from_seed([1; 32]).public_key();
        assert_eq!(state.members().key_references(&key), 1);
        let stats = state.statistics(state.account(id).unwrap().statistics).unwrap();
        assert_eq!(stats.owner, id);
    }

    #[test]
    fn test_modify_account_reindexes_members() {
        let mut state = LedgerState::default();
        let id = state.create_account(blank_account("", 1)).unwrap();
        let old_key = KeyPair::from_seed([1; 32]).public_key();
        let new_key = KeyPair::from_seed([2; 32]).public_key();

        state
            .modify_account(id, |a| {
                a.owner = Authority::from_key(new_key);
                a.active = Authority::from_key(new_key);
            })
            .unwrap();
        assert_eq!(state.members().key_references(&old_key), 0);
        assert_eq!(state.members().key_references(&new_key), 1);
    }

    #[test]
    fn test_rebuild_indexes_matches_incremental() {
        let mut state = LedgerState::default();
        let id = state.create_account(blank_account("bob", 3)).unwrap();
        state.create_special_authority(id).unwrap();
        state.create_restriction(id, 1).unwrap();

        let json = serde_json::to_string(&state).unwrap();
        let mut restored: LedgerState = serde_json::from_str(&json).unwrap();
        restored.rebuild_indexes();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_restriction_type_index_follows_records() {
        let mut state = LedgerState::default();
        state.create_restriction(AccountId(1), 1).unwrap();
        state.create_restriction(AccountId(2), 2).unwrap();
        state.create_restriction(AccountId(3), 3).unwrap();
        let accounts = |state: &LedgerState, mask| {
            state
                .restrictions_matching(mask)
                .map(|r| r.account)
                .collect::<BTreeSet<_>>()
        };
        assert_eq!(accounts(&state, 1), BTreeSet::from([AccountId(1), AccountId(3)]));
        assert_eq!(accounts(&state, 2), BTreeSet::from([AccountId(2), AccountId(3)]));

        state.modify_restriction(AccountId(1), 2).unwrap();
        state.remove_restriction(AccountId(3)).unwrap();
        assert!(accounts(&state, 1).is_empty());
        assert_eq!(accounts(&state, 2), BTreeSet::from([AccountId(1), AccountId(2)]));

        let mut restored = state.clone();
        restored.rebuild_indexes();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_satellite_records_are_unique_per_account() {
        let mut state = LedgerState::default();
        let id = AccountId(1);
        state.create_restriction(id, 1).unwrap();
        assert!(state.create_restriction(id, 2).unwrap_err().is_fatal());
        assert!(state.remove_special_authority(id).unwrap_err().is_fatal());
    }

    #[test]
    fn test_worker_vote_ids() {
        let mut state = LedgerState::default();
        let worker = state.create_worker("w");
        let w = state.worker(worker).unwrap().clone();
        assert!(state.is_worker_vote_against(w.vote_against));
        assert!(!state.is_worker_vote_against(w.vote_for));
        assert_eq!(state.global().next_available_vote_id, 2);
    }
}
