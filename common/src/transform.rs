//! Raw validator record -> display metrics.
//!
//! [`transform`] is pure and total: a record with every field missing still
//! produces a complete snapshot, and the total stake shown is always the sum of
//! the owned and delegated stake read from that same record.

use chrono::{DateTime, Utc};

use crate::format::{format_long_date, format_reward, format_stake};
use crate::timing::{round2, term_duration_days, term_progress};
use crate::types::{
    Metric, MetricStatus, MetricsSnapshot, RawValidatorRecord, StakeTotals, ValidatorInfo,
    ValidatorStatus,
};

/// Uptime at or above this is healthy
pub const UPTIME_GOOD_THRESHOLD: f64 = 98.0;

/// Uptime at or above this (but below good) is degraded
pub const UPTIME_WARNING_THRESHOLD: f64 = 90.0;

/// Health of the uptime metric. The only metric with a real threshold.
pub fn classify_uptime(uptime: f64) -> MetricStatus {
    if uptime >= UPTIME_GOOD_THRESHOLD {
        MetricStatus::Good
    } else if uptime >= UPTIME_WARNING_THRESHOLD {
        MetricStatus::Warning
    } else {
        MetricStatus::Error
    }
}

/// Derive the metric snapshot and validator info from one record read.
///
/// All six metrics share `now` as their `last_updated`.
pub fn transform(
    record: &RawValidatorRecord,
    now: DateTime<Utc>,
) -> (MetricsSnapshot, ValidatorInfo) {
    let uptime = record.uptime;
    let delegator_count = record.delegators.len();
    let stake = StakeTotals::from_record(record);

    let snapshot = MetricsSnapshot {
        uptime: Metric::new(format!("{:.2}%", uptime), "Uptime", classify_uptime(uptime), now),
        delegators: Metric::new(
            delegator_count.to_string(),
            "Delegators",
            MetricStatus::Good,
            now,
        ),
        total_stake: Metric::new(
            format_stake(stake.total()),
            "Total Stake",
            MetricStatus::Good,
            now,
        ),
        owned_stake: Metric::new(
            format_stake(stake.owned()),
            "Owned Stake",
            MetricStatus::Good,
            now,
        ),
        delegator_stake: Metric::new(
            format_stake(stake.delegated()),
            "Delegator Stake",
            MetricStatus::Good,
            now,
        ),
        delegation_fee: Metric::new(
            format!("{}%", record.delegation_fee),
            "Delegation Fee",
            MetricStatus::Good,
            now,
        ),
    };

    let info = ValidatorInfo {
        name: record.name.clone(),
        version: record.version.clone(),
        status: ValidatorStatus::from_connected(record.connected),
        duration: format!("{} days", term_duration_days(record.start_time, record.end_time)),
        start_date: format_long_date(record.start_time),
        end_date: format_long_date(record.end_time),
        progress: round2(term_progress(record.start_time, record.end_time, now)),
        connected: record.connected,
        potential_reward: format_reward(record.potential_reward),
    };

    (snapshot, info)
}
