//! Step Functions execution start.

use async_trait::async_trait;
use aws_sdk_sfn::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::adapters::{AdapterError, Result, StateMachineStarter};

pub struct StepFunctions {
    client: Client,
}

impl StepFunctions {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(sdk_config))
    }
}

#[async_trait]
impl StateMachineStarter for StepFunctions {
    /// Returns `{"executionArn", "startDate"}` (start date in epoch seconds).
    async fn start_execution(&self, arn: &str, input: &Value) -> Result<Value> {
        let input = serde_json::to_string(input)?;

        let output = self
            .client
            .start_execution()
            .state_machine_arn(arn)
            .input(input)
            .send()
            .await
            .map_err(|e| AdapterError::StartExecution(format!("{}: {}", arn, e)))?;

        debug!(
            arn = %arn,
            execution_arn = %output.execution_arn(),
            "Started state machine execution"
        );

        Ok(json!({
            "executionArn": output.execution_arn(),
            "startDate": output.start_date().secs(),
        }))
    }
}
