//! Text rendering of the poll state.

use chrono::{DateTime, Local, Utc};
use std::fmt;
use valpulse_common::{fallback, EnvelopeData, MetricStatus};

use crate::scheduler::staleness;
use crate::state::{ApiStatus, ClientPollState};

/// One rendered frame: badge, timestamps and a complete metrics panel
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub badge: &'static str,
    pub last_updated: String,
    pub stale_secs: Option<i64>,
    pub error_message: Option<String>,
    pub validator: String,
    pub rows: Vec<MetricRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub label: String,
    pub value: String,
    pub status: MetricStatus,
}

pub fn badge(status: ApiStatus) -> &'static str {
    match status {
        ApiStatus::Loading => "LOADING",
        ApiStatus::Success => "LIVE",
        ApiStatus::Fallback => "FALLBACK",
        ApiStatus::Error => "ERROR",
    }
}

/// Build the view for `state`. Without any data yet the panel shows the
/// built-in fallback snapshot, so it is never empty.
pub fn render(state: &ClientPollState, now: DateTime<Utc>) -> StatusView {
    let placeholder;
    let data: &EnvelopeData = match &state.data {
        Some(data) => data,
        None => {
            let (metrics_snapshot, validator_info) = fallback(now);
            placeholder = EnvelopeData {
                metrics_snapshot,
                validator_info,
                last_updated: now,
                note: String::new(),
            };
            &placeholder
        }
    };

    let info = &data.validator_info;
    let validator = format!(
        "{} v{} [{:?}] term {} ({:.2}% elapsed), reward {}",
        info.name, info.version, info.status, info.duration, info.progress, info.potential_reward
    );

    let rows = data
        .metrics_snapshot
        .iter()
        .map(|(_, metric)| MetricRow {
            label: metric.label.clone(),
            value: metric.value.clone(),
            status: metric.status,
        })
        .collect();

    StatusView {
        badge: badge(state.api_status),
        last_updated: state
            .last_updated
            .map(|at| {
                at.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| "Never".to_string()),
        stale_secs: staleness(state, now).map(|age| age.num_seconds()),
        error_message: state.error_message.clone(),
        validator,
        rows,
    }
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] last updated {}", self.badge, self.last_updated)?;
        if let Some(secs) = self.stale_secs {
            write!(f, " ({}s ago)", secs)?;
        }
        writeln!(f)?;
        if let Some(error) = &self.error_message {
            writeln!(f, "  reason: {}", error)?;
        }
        writeln!(f, "  {}", self.validator)?;
        for row in &self.rows {
            writeln!(f, "  {:<16} {:>14}  {}", row.label, row.value, row.status)?;
        }
        Ok(())
    }
}
