use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::config::ConfigError;
use crate::crypto::{KeyPair, PublicKey};
use crate::error::EvaluatorError;
use crate::hardfork::HardforkSchedule;
use crate::objects::{AccountObject, ChainParameters};
use crate::state::LedgerState;
use crate::types::{
    AccountId, AccountOptions, Authority, StatisticsId, Timestamp, COMMITTEE_ACCOUNT, PERCENT_100,
    PROXY_TO_SELF_ACCOUNT,
};

#[derive(Error, Debug)]
pub enum GenesisError {
    #[error("Genesis file not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid genesis JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Duplicate genesis account name '{0}'")]
    DuplicateName(String),
    #[error("Genesis references unknown account '{0}'")]
    UnknownAccount(String),
    #[error(transparent)]
    Parameters(#[from] ConfigError),
    #[error(transparent)]
    Ledger(#[from] EvaluatorError),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GenesisConfig {
    pub chain_id: String,
    pub initial_timestamp: u64,
    #[serde(default)]
    pub initial_accounts: Vec<GenesisAccount>,
    #[serde(default)]
    pub initial_assets: Vec<GenesisAsset>,
    #[serde(default)]
    pub initial_workers: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GenesisAccount {
    pub name: String,
    pub owner_key: PublicKey,
    #[serde(default)]
    pub active_key: Option<PublicKey>,
    #[serde(default)]
    pub is_lifetime_member: bool,
    #[serde(default)]
    pub can_be_referrer: bool,
    #[serde(default)]
    pub can_create_addresses: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GenesisAsset {
    pub symbol: String,
    pub issuer: String,
}

/// Reserved accounts, created first so they get ids 0..=5.
const RESERVED_ACCOUNTS: [&str; 6] = [
    "committee-account",
    "witness-account",
    "relaxed-committee-account",
    "null-account",
    "temp-account",
    "proxy-to-self",
];

impl GenesisConfig {
    pub fn load(path: &str) -> Result<Self, GenesisError> {
        if !Path::new(path).exists() {
            return Err(GenesisError::NotFound(path.to_string()));
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn new(chain_id: impl Into<String>, initial_timestamp: u64) -> Self {
        Self {
            chain_id: chain_id.into(),
            initial_timestamp,
            initial_accounts: Vec::new(),
            initial_assets: Vec::new(),
            initial_workers: Vec::new(),
        }
    }

    /// Build the ledger state at block 0.
    pub fn build_state(
        &self,
        parameters: ChainParameters,
        hardforks: HardforkSchedule,
    ) -> Result<LedgerState, GenesisError> {
        parameters.validate()?;
        let mut state = LedgerState::new(parameters, hardforks);
        let now = Timestamp(self.initial_timestamp);
        state.set_head_block(0, now);

        // Memo key of reserved accounts; nothing is ever encrypted to it.
        let null_key = KeyPair::from_seed([0; 32]).public_key();
        let params = state.parameters().clone();
        for name in RESERVED_ACCOUNTS {
            let template = GenesisAccount {
                name: name.to_string(),
                owner_key: null_key,
                active_key: None,
                is_lifetime_member: true,
                can_be_referrer: false,
                can_create_addresses: false,
            };
            state.create_account(|id, statistics| {
                let mut account = genesis_account(&template, id, statistics, &params, now);
                account.owner = Authority::default();
                account.active = Authority::default();
                account
            })?;
        }
        state.set_can_be_referrer(COMMITTEE_ACCOUNT, true);

        for entry in &self.initial_accounts {
            if state.account_by_name(&entry.name).is_some() {
                return Err(GenesisError::DuplicateName(entry.name.clone()));
            }
            let id = state.create_account(|id, statistics| {
                genesis_account(entry, id, statistics, &params, now)
            })?;
            if entry.can_be_referrer {
                state.set_can_be_referrer(id, true);
            }
        }

        for asset in &self.initial_assets {
            let issuer = state
                .account_by_name(&asset.issuer)
                .map(|a| a.id)
                .ok_or_else(|| GenesisError::UnknownAccount(asset.issuer.clone()))?;
            state.create_asset(asset.symbol.clone(), issuer);
        }

        for worker in &self.initial_workers {
            state.create_worker(worker.clone());
        }

        info!(
            chain_id = %self.chain_id,
            accounts = state.accounts().count(),
            "genesis state built"
        );
        Ok(state)
    }
}

fn genesis_account(
    entry: &GenesisAccount,
    id: AccountId,
    statistics: StatisticsId,
    params: &ChainParameters,
    now: Timestamp,
) -> AccountObject {
    let active_key = entry.active_key.unwrap_or(entry.owner_key);
    let (registrar, expiration, ltr_percentage) = if entry.is_lifetime_member {
        (
            id,
            Timestamp::MAXIMUM,
            PERCENT_100 - params.network_percent_of_fee,
        )
    } else {
        (COMMITTEE_ACCOUNT, now, params.lifetime_referrer_percent_of_fee)
    };
    AccountObject {
        id,
        name: entry.name.clone(),
        registrar,
        referrer: registrar,
        lifetime_referrer: registrar,
        network_fee_percentage: params.network_percent_of_fee,
        lifetime_referrer_fee_percentage: ltr_percentage,
        referrer_rewards_percentage: 0,
        membership_expiration_date: expiration,
        owner: Authority::from_key(entry.owner_key),
        active: Authority::from_key(active_key),
        options: AccountOptions {
            voting_account: PROXY_TO_SELF_ACCOUNT,
            ..AccountOptions::new(active_key)
        },
        owner_special_authority: Default::default(),
        active_special_authority: Default::default(),
        top_n_control_flags: 0,
        allowed_assets: None,
        whitelisting_accounts: Default::default(),
        blacklisting_accounts: Default::default(),
        whitelisted_accounts: Default::default(),
        blacklisted_accounts: Default::default(),
        can_create_addresses: entry.can_create_addresses,
        verification_is_required: false,
        addresses: Vec::new(),
        statistics,
    }
}
