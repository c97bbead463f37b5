//! Client-side poll state, owned and written only by the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use valpulse_common::EnvelopeData;

/// Outcome of the most recent poll as shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    /// No poll has completed yet
    Loading,
    /// Live data from the explorer
    Success,
    /// The service answered with its fallback snapshot
    Fallback,
    /// The service itself could not be reached or decoded
    Error,
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApiStatus::Loading => "loading",
            ApiStatus::Success => "success",
            ApiStatus::Fallback => "fallback",
            ApiStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerPhase {
    Idle,
    Polling,
    Displaying,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPollState {
    /// Timestamp of the data on display. Survives failed polls.
    pub last_updated: Option<DateTime<Utc>>,
    pub is_refreshing: bool,
    pub api_status: ApiStatus,
    pub error_message: Option<String>,
    pub phase: SchedulerPhase,
    /// Start of the most recent poll, successful or not
    pub last_attempt: Option<DateTime<Utc>>,
    pub data: Option<EnvelopeData>,
}

impl Default for ClientPollState {
    fn default() -> Self {
        Self {
            last_updated: None,
            is_refreshing: false,
            api_status: ApiStatus::Loading,
            error_message: None,
            phase: SchedulerPhase::Idle,
            last_attempt: None,
            data: None,
        }
    }
}

impl ClientPollState {
    /// True once a poll has finished and nothing is in flight
    pub fn is_settled(&self) -> bool {
        !self.is_refreshing && self.api_status != ApiStatus::Loading
    }
}
