//! Account operations: wire structures and stateless validation.
//!
//! Field order is part of the replay contract; new fields go into the
//! extension structs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ChainError, EvaluatorError};
use crate::objects::restriction;
use crate::types::{
    AccountId, AccountOptions, Authority, BuybackOptions, SpecialAuthority, VoteType, PERCENT_100,
};

pub const MIN_ACCOUNT_NAME_LENGTH: usize = 1;
pub const MAX_ACCOUNT_NAME_LENGTH: usize = 63;

/// Listing bits of `AccountWhitelistOperation::new_listing`.
pub mod listing {
    pub const NO_LISTING: u8 = 0x0;
    pub const WHITE_LISTED: u8 = 0x1;
    pub const BLACK_LISTED: u8 = 0x2;
    pub const WHITE_AND_BLACK_LISTED: u8 = WHITE_LISTED | BLACK_LISTED;
}

/// Action bits of `AccountAllowReferralsOperation::action`.
pub mod referral {
    pub const ALLOW: u8 = 0x1;
    pub const DISALLOW: u8 = 0x2;
}

/// Placeholder extension reserved by the protocol; carries no data.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NullExtension {}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountCreateExtensions {
    #[serde(default)]
    pub null_ext: Option<NullExtension>,
    #[serde(default)]
    pub owner_special_authority: Option<SpecialAuthority>,
    #[serde(default)]
    pub active_special_authority: Option<SpecialAuthority>,
    #[serde(default)]
    pub buyback_options: Option<BuybackOptions>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountCreateOperation {
    pub registrar: AccountId,
    pub referrer: AccountId,
    pub referrer_percent: u16,
    pub name: String,
    pub owner: Authority,
    pub active: Authority,
    pub options: AccountOptions,
    #[serde(default)]
    pub extensions: AccountCreateExtensions,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountUpdateExtensions {
    #[serde(default)]
    pub null_ext: Option<NullExtension>,
    #[serde(default)]
    pub owner_special_authority: Option<SpecialAuthority>,
    #[serde(default)]
    pub active_special_authority: Option<SpecialAuthority>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountUpdateOperation {
    pub account: AccountId,
    #[serde(default)]
    pub owner: Option<Authority>,
    #[serde(default)]
    pub active: Option<Authority>,
    #[serde(default)]
    pub new_options: Option<AccountOptions>,
    #[serde(default)]
    pub extensions: AccountUpdateExtensions,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AddAddressOperation {
    pub to_account: AccountId,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountWhitelistOperation {
    pub authorizing_account: AccountId,
    pub account_to_list: AccountId,
    pub new_listing: u8,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountUpgradeOperation {
    pub account_to_upgrade: AccountId,
    pub upgrade_to_lifetime_member: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountRestrictOperation {
    pub target: AccountId,
    pub action: u8,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AllowCreateAssetOperation {
    pub to_account: AccountId,
    pub value: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountAllowReferralsOperation {
    pub target: AccountId,
    pub action: u8,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SetOnlineTimeOperation {
    pub online_info: BTreeMap<AccountId, u16>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SetVerificationIsRequiredOperation {
    pub target: AccountId,
    pub verification_is_required: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AllowCreateAddressesOperation {
    pub account_id: AccountId,
    pub allow: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    AccountCreate(AccountCreateOperation),
    AccountUpdate(AccountUpdateOperation),
    AddAddress(AddAddressOperation),
    AccountWhitelist(AccountWhitelistOperation),
    AccountUpgrade(AccountUpgradeOperation),
    AccountRestrict(AccountRestrictOperation),
    AllowCreateAsset(AllowCreateAssetOperation),
    AccountAllowReferrals(AccountAllowReferralsOperation),
    SetOnlineTime(SetOnlineTimeOperation),
    SetVerificationIsRequired(SetVerificationIsRequiredOperation),
    AllowCreateAddresses(AllowCreateAddressesOperation),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::AccountCreate(_) => "account_create",
            Operation::AccountUpdate(_) => "account_update",
            Operation::AddAddress(_) => "add_address",
            Operation::AccountWhitelist(_) => "account_whitelist",
            Operation::AccountUpgrade(_) => "account_upgrade",
            Operation::AccountRestrict(_) => "account_restrict",
            Operation::AllowCreateAsset(_) => "allow_create_asset",
            Operation::AccountAllowReferrals(_) => "account_allow_referrals",
            Operation::SetOnlineTime(_) => "set_online_time",
            Operation::SetVerificationIsRequired(_) => "set_verification_is_required",
            Operation::AllowCreateAddresses(_) => "allow_create_addresses",
        }
    }

    /// Checks that need no ledger state.
    pub fn validate(&self) -> Result<(), EvaluatorError> {
        match self {
            Operation::AccountCreate(op) => {
                if !op.name.is_empty() && !is_valid_name(&op.name) {
                    return Err(invalid(format!("invalid account name '{}'", op.name)));
                }
                if op.referrer_percent > PERCENT_100 {
                    return Err(invalid("referrer percent exceeds 100%"));
                }
                validate_authority("owner", &op.owner)?;
                validate_authority("active", &op.active)?;
                validate_options(&op.options)
            }
            Operation::AccountUpdate(op) => {
                let ext = &op.extensions;
                if op.owner.is_none()
                    && op.active.is_none()
                    && op.new_options.is_none()
                    && ext.owner_special_authority.is_none()
                    && ext.active_special_authority.is_none()
                {
                    return Err(invalid("account update changes nothing"));
                }
                if let Some(owner) = &op.owner {
                    validate_authority("owner", owner)?;
                }
                if let Some(active) = &op.active {
                    validate_authority("active", active)?;
                }
                match &op.new_options {
                    Some(options) => validate_options(options),
                    None => Ok(()),
                }
            }
            Operation::AccountWhitelist(op) => {
                if op.new_listing & !listing::WHITE_AND_BLACK_LISTED != 0 {
                    return Err(invalid("unknown listing bits"));
                }
                Ok(())
            }
            Operation::AccountRestrict(op) => {
                let known = restriction::RESTRICT_ALL | restriction::RESTORE;
                if op.action == 0 || op.action & !known != 0 {
                    return Err(invalid("invalid restriction action"));
                }
                Ok(())
            }
            Operation::AccountAllowReferrals(op) => {
                if op.action != referral::ALLOW && op.action != referral::DISALLOW {
                    return Err(invalid("referral action must be allow or disallow"));
                }
                Ok(())
            }
            Operation::AddAddress(_)
            | Operation::AccountUpgrade(_)
            | Operation::AllowCreateAsset(_)
            | Operation::SetOnlineTime(_)
            | Operation::SetVerificationIsRequired(_)
            | Operation::AllowCreateAddresses(_) => Ok(()),
        }
    }

    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, ChainError> {
        bincode::serialize(self).map_err(|e| ChainError::Serialization(e.to_string()))
    }

    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        bincode::deserialize(bytes).map_err(|e| ChainError::Serialization(e.to_string()))
    }
}

fn invalid(msg: impl Into<String>) -> EvaluatorError {
    EvaluatorError::InvalidOperation(msg.into())
}

fn validate_authority(which: &str, authority: &Authority) -> Result<(), EvaluatorError> {
    if authority.is_impossible() {
        return Err(invalid(format!("{which} authority can never be satisfied")));
    }
    Ok(())
}

fn validate_options(options: &AccountOptions) -> Result<(), EvaluatorError> {
    if options.count_votes(VoteType::Witness) < usize::from(options.num_witness) {
        return Err(invalid("num_witness exceeds witness votes cast"));
    }
    if options.count_votes(VoteType::Committee) < usize::from(options.num_committee) {
        return Err(invalid("num_committee exceeds committee votes cast"));
    }
    Ok(())
}

/// Dot-separated labels: each starts with a lowercase letter, ends with a
/// letter or digit, and otherwise holds letters, digits and hyphens.
pub fn is_valid_name(name: &str) -> bool {
    if name.len() < MIN_ACCOUNT_NAME_LENGTH || name.len() > MAX_ACCOUNT_NAME_LENGTH {
        return false;
    }
    name.split('.').all(|label| {
        let bytes = label.as_bytes();
        match (bytes.first(), bytes.last()) {
            (Some(first), Some(last)) => {
                first.is_ascii_lowercase()
                    && (last.is_ascii_lowercase() || last.is_ascii_digit())
                    && bytes
                        .iter()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == b'-')
            }
            _ => false,
        }
    })
}
