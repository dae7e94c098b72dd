pub mod abuse;
pub mod authority;
pub mod block;
pub mod chain;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod evaluator;
pub mod genesis;
pub mod hardfork;
pub mod objects;
pub mod operations;
pub mod referral;
pub mod satellite;
pub mod state;
pub mod types;
pub mod votes;
