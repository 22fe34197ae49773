//! AWS SDK adapters.
//!
//! - Lambda for functions
//! - Step Functions for state machines
//! - SSM Automation for automation documents
//! - SNS for topics
//! - SQS for queues
//!
//! All clients share one SDK config built from `AwsConfig`.

mod automation;
mod lambda;
mod sns;
mod sqs;
mod step_functions;

use std::sync::Arc;

use aws_config::BehaviorVersion;
use tracing::info;

pub use automation::SsmAutomation;
pub use lambda::LambdaFunctions;
pub use sns::SnsTopics;
pub use sqs::SqsQueues;
pub use step_functions::StepFunctions;

use super::Backends;
use crate::config::AwsConfig;

/// Load the shared SDK config, applying region/endpoint overrides.
pub async fn load_sdk_config(config: &AwsConfig) -> aws_config::SdkConfig {
    let mut builder = aws_config::defaults(BehaviorVersion::latest());

    if let Some(ref region) = config.region {
        builder = builder.region(aws_config::Region::new(region.clone()));
    }

    if let Some(ref endpoint) = config.endpoint_url {
        builder = builder.endpoint_url(endpoint);
    }

    let sdk_config = builder.load().await;

    info!(
        region = ?config.region,
        endpoint = ?config.endpoint_url,
        "Loaded AWS SDK config"
    );

    sdk_config
}

/// Builder for a `Backends` set backed entirely by AWS.
pub struct AwsBackends;

impl AwsBackends {
    /// Every adapter over one SDK config.
    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Backends {
        Backends::new()
            .with_functions(Arc::new(LambdaFunctions::from_sdk_config(sdk_config)))
            .with_state_machines(Arc::new(StepFunctions::from_sdk_config(sdk_config)))
            .with_automation(Arc::new(SsmAutomation::from_sdk_config(sdk_config)))
            .with_topics(Arc::new(SnsTopics::from_sdk_config(sdk_config)))
            .with_queues(Arc::new(SqsQueues::from_sdk_config(sdk_config)))
    }

    pub async fn new(config: &AwsConfig) -> Backends {
        let sdk_config = load_sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }
}
