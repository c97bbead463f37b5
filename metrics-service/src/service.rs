//! Orchestration: one upstream attempt, one transform, one complete envelope.

use chrono::{DateTime, Utc};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;
use valpulse_common::{
    fallback, transform, Clock, EnvelopeData, MetricsSnapshot, PulseError, PulseResult,
    RawValidatorRecord, ResponseEnvelope, SystemClock, TransformError, ValidatorInfo,
};

use crate::telemetry::Telemetry;
use crate::upstream::ValidatorSource;

pub const LIVE_NOTE: &str = "Live data from the explorer API";
pub const FALLBACK_NOTE: &str = "Fallback data: the explorer API is currently unavailable";

/// Signature of the record -> metrics derivation
pub type TransformFn = fn(&RawValidatorRecord, DateTime<Utc>) -> (MetricsSnapshot, ValidatorInfo);

/// Builds the `/metrics` envelope. Holds no per-request state, so one instance is
/// shared by every request handler.
pub struct MetricsService {
    source: Arc<dyn ValidatorSource>,
    clock: Arc<dyn Clock>,
    transform: TransformFn,
    telemetry: Option<Arc<Telemetry>>,
}

impl MetricsService {
    pub fn new(source: Arc<dyn ValidatorSource>) -> Self {
        Self {
            source,
            clock: Arc::new(SystemClock),
            transform,
            telemetry: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_transform(mut self, transform: TransformFn) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Produce a complete envelope. Never fails: any error on the live path is
    /// logged and answered with the fallback snapshot.
    pub async fn get_metrics(&self) -> ResponseEnvelope {
        let correlation_id = Uuid::new_v4();

        let envelope = match self.live_metrics(correlation_id).await {
            Ok((metrics_snapshot, validator_info)) => {
                debug!(correlation_id = %correlation_id, "Serving live metrics");
                ResponseEnvelope::live(EnvelopeData {
                    metrics_snapshot,
                    validator_info,
                    last_updated: self.clock.now(),
                    note: LIVE_NOTE.to_string(),
                })
            }
            Err(e) => {
                warn!(
                    correlation_id = %correlation_id,
                    kind = e.kind(),
                    error = %e,
                    "Serving fallback metrics"
                );
                let now = self.clock.now();
                let (metrics_snapshot, validator_info) = fallback(now);
                ResponseEnvelope::fallback(
                    EnvelopeData {
                        metrics_snapshot,
                        validator_info,
                        last_updated: now,
                        note: FALLBACK_NOTE.to_string(),
                    },
                    e.describe(),
                )
            }
        };

        if let Some(telemetry) = &self.telemetry {
            telemetry.record_envelope(envelope.success);
        }
        envelope
    }

    async fn live_metrics(
        &self,
        correlation_id: Uuid,
    ) -> PulseResult<(MetricsSnapshot, ValidatorInfo)> {
        let started = Instant::now();
        let fetched = self.source.fetch(correlation_id).await;

        if let Some(telemetry) = &self.telemetry {
            let outcome = match &fetched {
                Ok(_) => "ok",
                Err(e) => e.kind(),
            };
            telemetry.record_fetch(outcome, started.elapsed());
        }

        let record = fetched?;
        let now = self.clock.now();
        let derive = self.transform;
        catch_unwind(AssertUnwindSafe(|| derive(&record, now)))
            .map_err(|payload| PulseError::from(TransformError::Panicked(panic_message(payload))))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use valpulse_common::{DelegatorEntry, FetchError, ManualClock};

    struct StaticSource {
        result: Result<RawValidatorRecord, FetchError>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(result: Result<RawValidatorRecord, FetchError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ValidatorSource for StaticSource {
        async fn fetch(&self, _correlation_id: Uuid) -> Result<RawValidatorRecord, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn scenario_record() -> RawValidatorRecord {
        RawValidatorRecord {
            name: "live-validator".to_string(),
            stake_amount: 296_099_000_000_000,
            delegators: vec![DelegatorEntry {
                stake_amount: 1_183_396_000_000_000,
            }],
            uptime: 99.999,
            connected: true,
            ..Default::default()
        }
    }

    fn pinned_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.timestamp_opt(1_750_000_000, 0).unwrap()))
    }

    #[tokio::test]
    async fn test_live_envelope() {
        let source = StaticSource::new(Ok(scenario_record()));
        let service = MetricsService::new(source.clone()).with_clock(pinned_clock());

        let envelope = service.get_metrics().await;
        assert!(envelope.success);
        assert!(envelope.error.is_none());
        assert_eq!(envelope.data.note, LIVE_NOTE);
        assert_eq!(envelope.data.validator_info.name, "live-validator");
        assert_eq!(envelope.data.metrics_snapshot.total_stake.value, "1,479,495");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_each_failure_kind_degrades_to_fallback() {
        let failures = vec![
            FetchError::Timeout(15),
            FetchError::UpstreamStatus(502),
            FetchError::MalformedBody("eof".into()),
            FetchError::UnsuccessfulBusinessStatus("nope".into()),
            FetchError::Transport("refused".into()),
        ];

        for failure in failures {
            let kind = failure.kind();
            let source = StaticSource::new(Err(failure));
            let service = MetricsService::new(source.clone());

            let envelope = service.get_metrics().await;
            assert!(!envelope.success);
            assert!(envelope.error.as_deref().unwrap().starts_with(kind));
            assert_eq!(envelope.data.note, FALLBACK_NOTE);
            assert_eq!(envelope.data.metrics_snapshot.owned_stake.value, "296,099");
            assert_eq!(envelope.data.metrics_snapshot.delegator_stake.value, "1,183,396");
            // No retries at this level
            assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        }
    }

    fn exploding_transform(
        _record: &RawValidatorRecord,
        _now: DateTime<Utc>,
    ) -> (MetricsSnapshot, ValidatorInfo) {
        panic!("derivation bug")
    }

    #[tokio::test]
    async fn test_transform_panic_degrades_to_fallback() {
        let source = StaticSource::new(Ok(scenario_record()));
        let service = MetricsService::new(source).with_transform(exploding_transform);

        let envelope = service.get_metrics().await;
        assert!(!envelope.success);
        let error = envelope.error.unwrap();
        assert!(error.starts_with("transform"));
        assert!(error.contains("derivation bug"));
    }

    #[tokio::test]
    async fn test_envelope_round_trips_to_direct_transform() {
        let clock = pinned_clock();
        let record = scenario_record();
        let service =
            MetricsService::new(StaticSource::new(Ok(record.clone()))).with_clock(clock.clone());

        let envelope = service.get_metrics().await;
        let json = serde_json::to_string(&envelope).unwrap();
        let decoded: ResponseEnvelope = serde_json::from_str(&json).unwrap();

        let (expected, expected_info) = transform(&record, clock.now());
        assert_eq!(decoded.data.metrics_snapshot, expected);
        assert_eq!(decoded.data.validator_info, expected_info);
        assert_eq!(decoded, envelope);
    }

    #[tokio::test]
    async fn test_fallback_is_stamped_with_current_time() {
        let clock = pinned_clock();
        let service = MetricsService::new(StaticSource::new(Err(FetchError::Timeout(15))))
            .with_clock(clock.clone());

        let envelope = service.get_metrics().await;
        assert_eq!(envelope.data.last_updated, clock.now());
        assert_eq!(envelope.data.metrics_snapshot.uptime.last_updated, clock.now());
    }

    #[tokio::test]
    async fn test_telemetry_counts_outcomes() {
        let telemetry = Arc::new(Telemetry::new().unwrap());
        let service = MetricsService::new(StaticSource::new(Err(FetchError::UpstreamStatus(500))))
            .with_telemetry(telemetry.clone());

        service.get_metrics().await;
        let text = telemetry.encode().unwrap();
        assert!(text.contains("valpulse_upstream_fetch_total{outcome=\"upstream_status\"} 1"));
        assert!(text.contains("valpulse_envelope_total{success=\"false\"} 1"));
    }
}
