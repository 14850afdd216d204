//! Auto Scaling `SetInstanceHealth` publisher

use super::{FaultKind, HealthPublisher, InstanceIdentity, PublishError};
use crate::controller::Verdict;
use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_autoscaling::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_autoscaling::Client;
use std::time::Duration;
use tracing::info;

/// Error codes that clear up on their own
///
/// `ResourceContention` is the code behind `ResourceContentionFault`.
const TRANSIENT_CODES: &[&str] = &[
    "ResourceContention",
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "ServiceUnavailable",
    "InternalFailure",
];

/// Classify an Auto Scaling error code
///
/// Unknown and missing codes are permanent so they reach the operator.
pub fn classify_error_code(code: Option<&str>) -> FaultKind {
    match code {
        Some(code) if TRANSIENT_CODES.contains(&code) => FaultKind::Transient,
        _ => FaultKind::Permanent,
    }
}

fn classify_sdk_error<E, R>(err: SdkError<E, R>) -> PublishError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();

    let kind = match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            FaultKind::Transient
        }
        SdkError::ServiceError(context) => classify_error_code(context.err().code()),
        _ => FaultKind::Permanent,
    };

    PublishError::new(kind, message)
}

/// Publishes verdicts to the instance's Auto Scaling group
pub struct AutoScalingPublisher {
    client: Client,
}

impl AutoScalingPublisher {
    /// Build a publisher for `region` using the default credential chain
    ///
    /// `timeout` bounds each `SetInstanceHealth` call end to end.
    pub async fn new(region: &str, timeout: Duration) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build())
            .load()
            .await;

        AutoScalingPublisher {
            client: Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl HealthPublisher for AutoScalingPublisher {
    async fn publish(
        &self,
        verdict: Verdict,
        identity: &InstanceIdentity,
    ) -> Result<(), PublishError> {
        let status = verdict.as_health_status();

        info!(
            instance_id = %identity.instance_id,
            region = %identity.region,
            status,
            "Attempting to set instance health"
        );

        self.client
            .set_instance_health()
            .instance_id(&identity.instance_id)
            .health_status(status)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        info!(
            instance_id = %identity.instance_id,
            status,
            "Instance health set"
        );
        Ok(())
    }
}
