use async_trait::async_trait;
use valpulse_common::ResponseEnvelope;
use valpulse_sdk::{MetricsClient, SdkError};

/// The metrics boundary as seen by the scheduler
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn get_metrics(&self) -> Result<ResponseEnvelope, SdkError>;
}

#[async_trait]
impl MetricsSource for MetricsClient {
    async fn get_metrics(&self) -> Result<ResponseEnvelope, SdkError> {
        MetricsClient::get_metrics(self).await
    }
}
