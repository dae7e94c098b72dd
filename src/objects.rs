//! Ledger entities touched by the account evaluators.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::ConfigError;
use crate::types::{
    AccountId, AccountOptions, Address, AllowCreateAssetId, AssetId, Authority, BuybackId,
    RestrictedAccountId, SpecialAuthority, SpecialAuthorityId, StatisticsId, Timestamp, VoteId,
    WorkerId, PERCENT_1, PERCENT_100,
};

/// Main account structure
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountObject {
    pub id: AccountId,
    pub name: String,

    pub registrar: AccountId,
    pub referrer: AccountId,
    pub lifetime_referrer: AccountId,
    pub network_fee_percentage: u16,
    pub lifetime_referrer_fee_percentage: u16,
    pub referrer_rewards_percentage: u16,
    pub membership_expiration_date: Timestamp,

    pub owner: Authority,
    pub active: Authority,
    pub options: AccountOptions,
    #[serde(default)]
    pub owner_special_authority: SpecialAuthority,
    #[serde(default)]
    pub active_special_authority: SpecialAuthority,
    #[serde(default)]
    pub top_n_control_flags: u8,

    /// Buyback accounts may only trade these assets.
    #[serde(default)]
    pub allowed_assets: Option<BTreeSet<AssetId>>,

    #[serde(default)]
    pub whitelisting_accounts: BTreeSet<AccountId>,
    #[serde(default)]
    pub blacklisting_accounts: BTreeSet<AccountId>,
    /// Bookkeeping mirrors of the lists this account maintains on others.
    #[serde(default)]
    pub whitelisted_accounts: BTreeSet<AccountId>,
    #[serde(default)]
    pub blacklisted_accounts: BTreeSet<AccountId>,

    #[serde(default)]
    pub can_create_addresses: bool,
    #[serde(default)]
    pub verification_is_required: bool,
    #[serde(default)]
    pub addresses: Vec<Address>,

    pub statistics: StatisticsId,
}

impl AccountObject {
    pub fn is_lifetime_member(&self) -> bool {
        self.membership_expiration_date == Timestamp::MAXIMUM
    }

    pub fn is_annual_member(&self, now: Timestamp) -> bool {
        !self.is_lifetime_member() && self.membership_expiration_date > now
    }

    pub fn is_basic_account(&self, now: Timestamp) -> bool {
        now >= self.membership_expiration_date
    }

    pub fn has_special_authority(&self) -> bool {
        self.owner_special_authority.is_set() || self.active_special_authority.is_set()
    }
}

/// One-to-one companion of an account holding fee counters.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountStatistics {
    pub id: StatisticsId,
    pub owner: AccountId,
    pub lifetime_fees_paid: u64,
    pub pending_fees: u64,
    pub pending_vested_fees: u64,
}

impl AccountStatistics {
    /// Settle pending fee counters into the lifetime total, returning the
    /// amount settled.
    pub fn process_fees(&mut self) -> u64 {
        let settled = self.pending_fees.saturating_add(self.pending_vested_fees);
        self.lifetime_fees_paid = self.lifetime_fees_paid.saturating_add(settled);
        self.pending_fees = 0;
        self.pending_vested_fees = 0;
        settled
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SpecialAuthorityObject {
    pub id: SpecialAuthorityId,
    pub account: AccountId,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BuybackObject {
    pub id: BuybackId,
    pub asset_to_buy: AssetId,
}

/// Restriction bits of `RestrictedAccountObject::restriction_type`.
pub mod restriction {
    pub const RESTRICT_IN: u8 = 0x01;
    pub const RESTRICT_OUT: u8 = 0x02;
    pub const RESTRICT_ALL: u8 = RESTRICT_IN | RESTRICT_OUT;
    /// Lift the current restriction instead of imposing one.
    pub const RESTORE: u8 = 0x04;
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RestrictedAccountObject {
    pub id: RestrictedAccountId,
    pub account: AccountId,
    pub restriction_type: u8,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AllowCreateAssetObject {
    pub id: AllowCreateAssetId,
    pub account: AccountId,
    pub allow: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountProperties {
    pub can_be_referrer: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AssetObject {
    pub id: AssetId,
    pub symbol: String,
    pub issuer: AccountId,
    #[serde(default)]
    pub buyback_account: Option<AccountId>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WorkerObject {
    pub id: WorkerId,
    pub name: String,
    pub vote_for: VoteId,
    pub vote_against: VoteId,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountCreateFee {
    pub basic_fee: u64,
    pub premium_fee: u64,
}

/// Consensus parameters consulted by the account evaluators.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ChainParameters {
    pub maximum_authority_membership: u16,
    pub maximum_witness_count: u16,
    pub maximum_committee_count: u16,
    pub network_percent_of_fee: u16,
    pub lifetime_referrer_percent_of_fee: u16,
    /// Registrations per fee-scale step; 0 disables escalation.
    pub accounts_per_fee_scale: u16,
    pub account_fee_scale_bitshifts: u8,
    pub account_create_fee: AccountCreateFee,
    pub allow_non_member_whitelists: bool,
    /// Referrer mode bypasses registrar eligibility and abuse accounting.
    pub referrer_mode_enabled: bool,
}

const CORE_PRECISION: u64 = 100_000;

impl Default for ChainParameters {
    fn default() -> Self {
        Self {
            maximum_authority_membership: 10,
            maximum_witness_count: 1001,
            maximum_committee_count: 1001,
            network_percent_of_fee: 20 * PERCENT_1,
            lifetime_referrer_percent_of_fee: 30 * PERCENT_1,
            accounts_per_fee_scale: 1000,
            account_fee_scale_bitshifts: 4,
            account_create_fee: AccountCreateFee {
                basic_fee: 5 * CORE_PRECISION,
                premium_fee: 2000 * CORE_PRECISION,
            },
            allow_non_member_whitelists: false,
            referrer_mode_enabled: false,
        }
    }
}

impl ChainParameters {
    /// Reject parameter sets the fee split and fee escalation cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let percent = |name, value: u16| {
            if value > PERCENT_100 {
                Err(ConfigError::InvalidParameter {
                    name,
                    reason: format!("{value} exceeds {PERCENT_100} basis points"),
                })
            } else {
                Ok(())
            }
        };
        percent("network_percent_of_fee", self.network_percent_of_fee)?;
        percent(
            "lifetime_referrer_percent_of_fee",
            self.lifetime_referrer_percent_of_fee,
        )?;

        let shared = u32::from(self.network_percent_of_fee)
            + u32::from(self.lifetime_referrer_percent_of_fee);
        if shared > u32::from(PERCENT_100) {
            return Err(ConfigError::InvalidParameter {
                name: "lifetime_referrer_percent_of_fee",
                reason: format!("network plus lifetime referrer share is {shared} basis points"),
            });
        }

        if u32::from(self.account_fee_scale_bitshifts) >= u64::BITS {
            return Err(ConfigError::InvalidParameter {
                name: "account_fee_scale_bitshifts",
                reason: format!(
                    "shift of {} would overflow the fee",
                    self.account_fee_scale_bitshifts
                ),
            });
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalProperties {
    pub parameters: ChainParameters,
    /// Watermark: every vote id in use has a smaller instance.
    pub next_available_vote_id: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DynamicGlobalProperties {
    pub head_block_number: u64,
    pub time: Timestamp,
    pub accounts_registered_this_interval: u32,
    pub next_address_index: u64,
}

/// Per-account online minutes reported by the committee.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountsOnline {
    pub online_info: BTreeMap<AccountId, u16>,
}
