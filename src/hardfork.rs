//! Protocol version gates.
//!
//! Every historical rule change consulted by the evaluators is listed here
//! with its activation time and the comparison it was introduced with.
//! Evaluators ask `LedgerState::is_active(Hardfork::..)` and never compare
//! raw timestamps, so replaying old blocks stays bit-identical.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Timestamp;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Hardfork {
    /// Referrer percentages are taken as basis points, no legacy rescale.
    ReferrerPercentFix,
    /// Owner/active special-authority overrides accepted.
    SpecialAuthority,
    /// Operation extension fields accepted.
    ExtensionFields,
    /// Buyback account options accepted on create.
    Buyback,
    /// Votes naming a worker's vote-against id are rejected.
    WorkerAgainstVotes,
    /// Annual memberships can no longer be bought or renewed.
    AnnualMembershipSunset,
    /// Key/account fan-out limit and registrar eligibility enforced.
    AbuseAccounting,
}

impl Hardfork {
    pub const ALL: [Hardfork; 7] = [
        Hardfork::ReferrerPercentFix,
        Hardfork::SpecialAuthority,
        Hardfork::ExtensionFields,
        Hardfork::Buyback,
        Hardfork::WorkerAgainstVotes,
        Hardfork::AnnualMembershipSunset,
        Hardfork::AbuseAccounting,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Hardfork::ReferrerPercentFix => "referrer_percent_fix",
            Hardfork::SpecialAuthority => "special_authority",
            Hardfork::ExtensionFields => "extension_fields",
            Hardfork::Buyback => "buyback",
            Hardfork::WorkerAgainstVotes => "worker_against_votes",
            Hardfork::AnnualMembershipSunset => "annual_membership_sunset",
            Hardfork::AbuseAccounting => "abuse_accounting",
        }
    }

    pub fn from_name(name: &str) -> Option<Hardfork> {
        Hardfork::ALL.into_iter().find(|h| h.name() == name)
    }
}

impl fmt::Display for Hardfork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether the activation instant itself already runs the new rule.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    AtOrAfter,
    After,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateSpec {
    pub activation: Timestamp,
    pub boundary: Boundary,
}

impl GateSpec {
    pub const fn at_or_after(secs: u64) -> Self {
        GateSpec {
            activation: Timestamp(secs),
            boundary: Boundary::AtOrAfter,
        }
    }

    pub const fn after(secs: u64) -> Self {
        GateSpec {
            activation: Timestamp(secs),
            boundary: Boundary::After,
        }
    }

    pub fn is_active(&self, now: Timestamp) -> bool {
        match self.boundary {
            Boundary::AtOrAfter => now >= self.activation,
            Boundary::After => now > self.activation,
        }
    }
}

/// Mainnet activation table, indexed in `Hardfork::ALL` order.
const MAINNET_GATES: [GateSpec; 7] = [
    GateSpec::after(1_450_378_800),        // 2015-12-17T19:00:00Z
    GateSpec::at_or_after(1_456_250_400),  // 2016-02-23T18:00:00Z
    GateSpec::at_or_after(1_459_789_200),  // 2016-04-04T17:00:00Z
    GateSpec::at_or_after(1_456_250_400),  // 2016-02-23T18:00:00Z
    GateSpec::at_or_after(1_458_752_400),  // 2016-03-23T17:00:00Z
    GateSpec::after(1_458_752_400),        // 2016-03-23T17:00:00Z
    GateSpec::after(1_514_764_800),        // 2018-01-01T00:00:00Z
];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HardforkSchedule {
    gates: [GateSpec; 7],
}

impl Default for HardforkSchedule {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl HardforkSchedule {
    pub fn mainnet() -> Self {
        Self {
            gates: MAINNET_GATES,
        }
    }

    pub fn gate(&self, hardfork: Hardfork) -> GateSpec {
        self.gates[hardfork.index()]
    }

    /// Move one activation time, keeping its historical boundary.
    pub fn with_activation(mut self, hardfork: Hardfork, activation: Timestamp) -> Self {
        self.gates[hardfork.index()].activation = activation;
        self
    }

    pub fn is_active(&self, hardfork: Hardfork, now: Timestamp) -> bool {
        self.gate(hardfork).is_active(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_follow_table() {
        let schedule = HardforkSchedule::mainnet();
        let t = schedule.gate(Hardfork::AbuseAccounting).activation;
        assert!(!schedule.is_active(Hardfork::AbuseAccounting, t));
        assert!(schedule.is_active(Hardfork::AbuseAccounting, Timestamp(t.0 + 1)));

        let t = schedule.gate(Hardfork::SpecialAuthority).activation;
        assert!(!schedule.is_active(Hardfork::SpecialAuthority, Timestamp(t.0 - 1)));
        assert!(schedule.is_active(Hardfork::SpecialAuthority, t));
    }

    #[test]
    fn test_override_keeps_boundary() {
        let schedule =
            HardforkSchedule::mainnet().with_activation(Hardfork::AnnualMembershipSunset, Timestamp(10));
        assert_eq!(schedule.gate(Hardfork::AnnualMembershipSunset).boundary, Boundary::After);
        assert!(!schedule.is_active(Hardfork::AnnualMembershipSunset, Timestamp(10)));
        assert!(schedule.is_active(Hardfork::AnnualMembershipSunset, Timestamp(11)));
    }

    #[test]
    fn test_names_round_trip() {
        for hardfork in Hardfork::ALL {
            assert_eq!(Hardfork::from_name(hardfork.name()), Some(hardfork));
        }
        assert_eq!(Hardfork::from_name("unknown"), None);
    }
}
