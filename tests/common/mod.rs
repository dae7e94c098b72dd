#![allow(dead_code)]

use account_evaluator::block::{Block, Transaction};
use account_evaluator::chain::Chain;
use account_evaluator::crypto::{KeyPair, PublicKey};
use account_evaluator::genesis::{GenesisAccount, GenesisAsset, GenesisConfig};
use account_evaluator::hardfork::{Hardfork, HardforkSchedule};
use account_evaluator::objects::ChainParameters;
use account_evaluator::operations::{AccountCreateOperation, Operation};
use account_evaluator::types::{AccountId, AccountOptions, Authority, Timestamp};

pub fn key(seed: u8) -> PublicKey {
    KeyPair::from_seed([seed; 32]).public_key()
}

/// Activation second of a mainnet gate.
pub fn gate_time(hardfork: Hardfork) -> u64 {
    HardforkSchedule::mainnet().gate(hardfork).activation.secs()
}

pub fn genesis(initial_timestamp: u64) -> GenesisConfig {
    let mut genesis = GenesisConfig::new("scenario", initial_timestamp);
    genesis.initial_accounts.push(GenesisAccount {
        name: "registrar".into(),
        owner_key: key(100),
        active_key: None,
        is_lifetime_member: true,
        can_be_referrer: true,
        can_create_addresses: false,
    });
    genesis.initial_accounts.push(GenesisAccount {
        name: "nathan".into(),
        owner_key: key(101),
        active_key: None,
        is_lifetime_member: false,
        can_be_referrer: false,
        can_create_addresses: true,
    });
    genesis.initial_assets.push(GenesisAsset {
        symbol: "GOLD".into(),
        issuer: "registrar".into(),
    });
    genesis
}

pub fn chain_with(initial_timestamp: u64, parameters: ChainParameters) -> Chain {
    let state = genesis(initial_timestamp)
        .build_state(parameters, HardforkSchedule::mainnet())
        .unwrap();
    Chain::new(state)
}

pub fn chain_at(initial_timestamp: u64) -> Chain {
    chain_with(initial_timestamp, ChainParameters::default())
}

pub fn account_id(chain: &Chain, name: &str) -> AccountId {
    chain.state().account_by_name(name).unwrap().id
}

pub fn create_op(registrar: AccountId, name: &str, owner_key: PublicKey) -> Operation {
    Operation::AccountCreate(AccountCreateOperation {
        registrar,
        referrer: registrar,
        referrer_percent: 0,
        name: name.to_string(),
        owner: Authority::from_key(owner_key),
        active: Authority::from_key(owner_key),
        options: AccountOptions::new(owner_key),
        extensions: Default::default(),
    })
}

/// Next block on `chain` holding one transaction per operation.
pub fn block(chain: &Chain, secs: u64, operations: Vec<Operation>) -> Block {
    let transactions = operations
        .into_iter()
        .map(|op| Transaction::new(vec![op]))
        .collect();
    Block::new(chain.height() + 1, Timestamp(secs), chain.head_hash(), transactions).unwrap()
}
