//! Degraded-mode snapshot served whenever the live path fails.

use chrono::{DateTime, Utc};

use crate::transform::transform;
use crate::types::{DelegatorEntry, MetricsSnapshot, RawValidatorRecord, ValidatorInfo};

/// Validator's own stake in the fallback snapshot, smallest unit
pub const FALLBACK_OWNED_STAKE: u64 = 296_099_000_000_000;

/// Delegated stake in the fallback snapshot, smallest unit
pub const FALLBACK_DELEGATOR_STAKE: u64 = 1_183_396_000_000_000;

pub const FALLBACK_UPTIME: f64 = 99.99;
pub const FALLBACK_DELEGATION_FEE: f64 = 2.0;
pub const FALLBACK_POTENTIAL_REWARD: u64 = 12_500_000_000;
pub const FALLBACK_NAME: &str = "Primary Validator";
pub const FALLBACK_VERSION: &str = "1.11.13";

/// The fixed record behind the fallback snapshot.
///
/// No staking term is set, so progress and duration take the transformer's
/// degenerate-term defaults.
pub fn fallback_record() -> RawValidatorRecord {
    RawValidatorRecord {
        name: FALLBACK_NAME.to_string(),
        uptime: FALLBACK_UPTIME,
        delegators: vec![DelegatorEntry {
            stake_amount: FALLBACK_DELEGATOR_STAKE,
        }],
        delegation_fee: FALLBACK_DELEGATION_FEE,
        potential_reward: FALLBACK_POTENTIAL_REWARD,
        connected: true,
        version: FALLBACK_VERSION.to_string(),
        start_time: 0,
        end_time: 0,
        stake_amount: FALLBACK_OWNED_STAKE,
    }
}

/// Fallback snapshot stamped with `now`. Never fails.
///
/// Runs through the same transformer as live data, so it holds the same
/// invariants.
pub fn fallback(now: DateTime<Utc>) -> (MetricsSnapshot, ValidatorInfo) {
    transform(&fallback_record(), now)
}
