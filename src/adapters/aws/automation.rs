//! SSM Automation document runs.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_ssm::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::adapters::{AdapterError, AutomationRunner, Result};

pub struct SsmAutomation {
    client: Client,
}

impl SsmAutomation {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(sdk_config))
    }
}

/// Automation parameters are string lists keyed by name.
///
/// Arrays map element-wise, strings map to a single value, other JSON values
/// are rendered as JSON text. A non-object body carries no parameters.
fn to_parameters(body: &Value) -> HashMap<String, Vec<String>> {
    let Value::Object(fields) = body else {
        return HashMap::new();
    };

    fields
        .iter()
        .map(|(name, value)| {
            let values = match value {
                Value::Array(items) => items.iter().map(render).collect(),
                other => vec![render(other)],
            };
            (name.clone(), values)
        })
        .collect()
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl AutomationRunner for SsmAutomation {
    /// Returns `{"AutomationExecutionId"}`.
    async fn run(&self, document: &str, parameters: &Value) -> Result<Value> {
        let output = self
            .client
            .start_automation_execution()
            .document_name(document)
            .set_parameters(Some(to_parameters(parameters)))
            .send()
            .await
            .map_err(|e| AdapterError::Automation(format!("{}: {}", document, e)))?;

        let execution_id = output.automation_execution_id().unwrap_or_default();
        debug!(document = %document, execution_id = %execution_id, "Started automation");

        Ok(json!({ "AutomationExecutionId": execution_id }))
    }
}
