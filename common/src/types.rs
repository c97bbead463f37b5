use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Validator record as returned by the explorer API.
///
/// Nothing about the upstream payload is trusted: every field is optional and
/// falls back to zero / empty / false. Numeric fields also accept numeric strings
/// and `null`, anything else decodes as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawValidatorRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,

    /// Uptime percentage, 0-100
    #[serde(default, deserialize_with = "lenient_f64")]
    pub uptime: f64,

    #[serde(default, deserialize_with = "lenient_delegators")]
    pub delegators: Vec<DelegatorEntry>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub delegation_fee: f64,

    /// Potential reward in the smallest unit
    #[serde(default, deserialize_with = "lenient_u64")]
    pub potential_reward: u64,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub connected: bool,

    #[serde(default, deserialize_with = "lenient_string")]
    pub version: String,

    /// Unix seconds
    #[serde(default, deserialize_with = "lenient_i64")]
    pub start_time: i64,

    /// Unix seconds
    #[serde(default, deserialize_with = "lenient_i64")]
    pub end_time: i64,

    /// Validator's own stake in the smallest unit
    #[serde(default, deserialize_with = "lenient_u64")]
    pub stake_amount: u64,
}

/// A single delegation to the validator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatorEntry {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub stake_amount: u64,
}

impl RawValidatorRecord {
    /// Parse an already-decoded JSON value into a record.
    ///
    /// Only a JSON object is accepted; field-level garbage is defaulted, not rejected.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if !value.is_object() {
            return Err(serde::de::Error::custom("expected a JSON object"));
        }
        serde_json::from_value(value)
    }
}

/// Health classification of a single metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Good,
    Warning,
    Error,
}

impl fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricStatus::Good => write!(f, "good"),
            MetricStatus::Warning => write!(f, "warning"),
            MetricStatus::Error => write!(f, "error"),
        }
    }
}

/// A display-ready metric. Built once per refresh cycle and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub value: String,
    pub label: String,
    pub status: MetricStatus,
    pub last_updated: DateTime<Utc>,
}

impl Metric {
    pub fn new(
        value: impl Into<String>,
        label: impl Into<String>,
        status: MetricStatus,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            status,
            last_updated,
        }
    }

    /// Same metric with a different timestamp
    pub fn restamped(&self, last_updated: DateTime<Utc>) -> Self {
        Self {
            last_updated,
            ..self.clone()
        }
    }
}

/// The six metrics shown on the dashboard, all derived from one record read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub uptime: Metric,
    pub delegators: Metric,
    pub total_stake: Metric,
    pub owned_stake: Metric,
    pub delegator_stake: Metric,
    pub delegation_fee: Metric,
}

impl MetricsSnapshot {
    /// All metrics in a fixed order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Metric)> {
        [
            ("uptime", &self.uptime),
            ("delegators", &self.delegators),
            ("totalStake", &self.total_stake),
            ("ownedStake", &self.owned_stake),
            ("delegatorStake", &self.delegator_stake),
            ("delegationFee", &self.delegation_fee),
        ]
        .into_iter()
    }

    /// Copy of the snapshot with every `last_updated` replaced.
    ///
    /// Used to compare two snapshots by value while ignoring when they were built.
    pub fn restamped(&self, last_updated: DateTime<Utc>) -> Self {
        Self {
            uptime: self.uptime.restamped(last_updated),
            delegators: self.delegators.restamped(last_updated),
            total_stake: self.total_stake.restamped(last_updated),
            owned_stake: self.owned_stake.restamped(last_updated),
            delegator_stake: self.delegator_stake.restamped(last_updated),
            delegation_fee: self.delegation_fee.restamped(last_updated),
        }
    }
}

/// Stake amounts in the smallest unit.
///
/// `total` is only ever produced by [`StakeTotals::new`], so it is always
/// `owned + delegated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeTotals {
    owned: u128,
    delegated: u128,
    total: u128,
}

impl StakeTotals {
    pub fn new(owned: u128, delegated: u128) -> Self {
        Self {
            owned,
            delegated,
            total: owned + delegated,
        }
    }

    pub fn from_record(record: &RawValidatorRecord) -> Self {
        let delegated = record
            .delegators
            .iter()
            .map(|d| u128::from(d.stake_amount))
            .sum();
        Self::new(u128::from(record.stake_amount), delegated)
    }

    pub fn owned(&self) -> u128 {
        self.owned
    }

    pub fn delegated(&self) -> u128 {
        self.delegated
    }

    pub fn total(&self) -> u128 {
        self.total
    }
}

/// Validator activity status derived from connectivity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorStatus {
    Active,
    Inactive,
}

impl ValidatorStatus {
    pub fn from_connected(connected: bool) -> Self {
        if connected {
            ValidatorStatus::Active
        } else {
            ValidatorStatus::Inactive
        }
    }
}

/// Validator identity and staking-term information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorInfo {
    pub name: String,
    pub version: String,
    pub status: ValidatorStatus,
    /// Human-readable term length, e.g. "100 days"
    pub duration: String,
    pub start_date: String,
    pub end_date: String,
    /// Percent of the staking term elapsed, 0-100
    pub progress: f64,
    pub connected: bool,
    /// Potential reward in whole tokens, two decimals
    pub potential_reward: String,
}

/// Payload of every `/metrics` response, live or fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeData {
    pub metrics_snapshot: MetricsSnapshot,
    pub validator_info: ValidatorInfo,
    pub last_updated: DateTime<Utc>,
    pub note: String,
}

/// Outward response document.
///
/// `success == false` means exactly that the fallback snapshot is being served;
/// `data` is populated either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub success: bool,
    pub data: EnvelopeData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn live(data: EnvelopeData) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn fallback(data: EnvelopeData, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
        }
    }
}

// Lenient field decoders

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value)
        .filter(|n| n.is_finite())
        .unwrap_or(0.0))
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(parsed.unwrap_or(0))
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(parsed.unwrap_or(0))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_delegators<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<DelegatorEntry>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    // A delegator entry that is not an object still counts as a delegator with no stake
    Ok(items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect())
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
