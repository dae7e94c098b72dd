//! Identifiers, timestamps and the authority / options value types shared by
//! every account operation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::crypto::PublicKey;

/// 100% expressed in basis points, the unit of every fee-share percentage.
pub const PERCENT_100: u16 = 10_000;
pub const PERCENT_1: u16 = 100;

pub const SECONDS_PER_DAY: u64 = 86_400;

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident, $space:expr, $kind:expr) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn instance(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}.{}", $space, $kind, self.0)
            }
        }
    };
}

object_id!(
    /// Account entity id (`1.2.N`).
    AccountId, 1, 2
);
object_id!(AssetId, 1, 3);
object_id!(WorkerId, 1, 14);
object_id!(SpecialAuthorityId, 1, 15);
object_id!(BuybackId, 1, 16);
object_id!(RestrictedAccountId, 1, 17);
object_id!(AllowCreateAssetId, 1, 18);
object_id!(StatisticsId, 2, 6);

/// Reserved accounts created by genesis, in id order.
pub const COMMITTEE_ACCOUNT: AccountId = AccountId(0);
pub const WITNESS_ACCOUNT: AccountId = AccountId(1);
pub const RELAXED_COMMITTEE_ACCOUNT: AccountId = AccountId(2);
pub const NULL_ACCOUNT: AccountId = AccountId(3);
pub const TEMP_ACCOUNT: AccountId = AccountId(4);
pub const PROXY_TO_SELF_ACCOUNT: AccountId = AccountId(5);

/// Ledger time in whole seconds since the unix epoch.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Membership expiration of lifetime members.
    pub const MAXIMUM: Timestamp = Timestamp(u64::MAX);

    pub fn secs(self) -> u64 {
        self.0
    }

    pub fn plus_days(self, days: u64) -> Self {
        Timestamp(self.0.saturating_add(days.saturating_mul(SECONDS_PER_DAY)))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Timestamp::MAXIMUM {
            return f.write_str("never");
        }
        match i64::try_from(self.0)
            .ok()
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            None => write!(f, "{}s", self.0),
        }
    }
}

/// Weighted threshold set of accounts and keys.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Authority {
    pub weight_threshold: u32,
    #[serde(default)]
    pub account_auths: BTreeMap<AccountId, u16>,
    #[serde(default)]
    pub key_auths: BTreeMap<PublicKey, u16>,
}

impl Authority {
    /// Single-key authority with threshold 1.
    pub fn from_key(key: PublicKey) -> Self {
        let mut key_auths = BTreeMap::new();
        key_auths.insert(key, 1);
        Self {
            weight_threshold: 1,
            account_auths: BTreeMap::new(),
            key_auths,
        }
    }

    pub fn with_account(mut self, account: AccountId, weight: u16) -> Self {
        self.account_auths.insert(account, weight);
        self
    }

    pub fn with_key(mut self, key: PublicKey, weight: u16) -> Self {
        self.key_auths.insert(key, weight);
        self
    }

    pub fn num_auths(&self) -> usize {
        self.account_auths.len() + self.key_auths.len()
    }

    pub fn accounts(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.account_auths.keys().copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PublicKey> + '_ {
        self.key_auths.keys()
    }

    /// True when the summed weights can never reach the threshold.
    pub fn is_impossible(&self) -> bool {
        let total: u64 = self
            .account_auths
            .values()
            .chain(self.key_auths.values())
            .map(|w| u64::from(*w))
            .sum();
        total < u64::from(self.weight_threshold)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteType {
    Committee = 0,
    Witness = 1,
    Worker = 2,
}

/// Packed vote identifier: vote type in the low 8 bits, instance above.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct VoteId(pub u32);

impl VoteId {
    pub fn new(vote_type: VoteType, instance: u32) -> Self {
        VoteId((instance << 8) | vote_type as u32)
    }

    pub fn vote_type(self) -> Option<VoteType> {
        match self.0 & 0xff {
            0 => Some(VoteType::Committee),
            1 => Some(VoteType::Witness),
            2 => Some(VoteType::Worker),
            _ => None,
        }
    }

    pub fn instance(self) -> u32 {
        self.0 >> 8
    }
}

impl fmt::Display for VoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0 & 0xff, self.instance())
    }
}

/// Voting configuration carried by every account.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountOptions {
    pub memo_key: PublicKey,
    pub voting_account: AccountId,
    #[serde(default)]
    pub num_witness: u16,
    #[serde(default)]
    pub num_committee: u16,
    #[serde(default)]
    pub votes: BTreeSet<VoteId>,
}

impl AccountOptions {
    pub fn new(memo_key: PublicKey) -> Self {
        Self {
            memo_key,
            voting_account: PROXY_TO_SELF_ACCOUNT,
            num_witness: 0,
            num_committee: 0,
            votes: BTreeSet::new(),
        }
    }

    pub fn count_votes(&self, vote_type: VoteType) -> usize {
        self.votes
            .iter()
            .filter(|v| v.vote_type() == Some(vote_type))
            .count()
    }
}

/// Override that lets an external rule govern an owner or active permission.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum SpecialAuthority {
    #[default]
    NoSpecialAuthority,
    TopHolders { asset: AssetId, num_top_holders: u8 },
}

impl SpecialAuthority {
    pub fn is_set(&self) -> bool {
        !matches!(self, SpecialAuthority::NoSpecialAuthority)
    }
}

/// Designates a new account as the buyback account for `asset_to_buy`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BuybackOptions {
    pub asset_to_buy: AssetId,
    pub asset_to_buy_issuer: AccountId,
    #[serde(default)]
    pub markets: BTreeSet<AssetId>,
}

/// Hex-encoded address attached to an account.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Address(pub String);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
