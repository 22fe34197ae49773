//! Lambda function invocation.

use async_trait::async_trait;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::Client;
use serde_json::Value;
use tracing::debug;

use crate::adapters::{AdapterError, FunctionInvoker, Result};

/// Request/response Lambda invocation.
///
/// The response payload is parsed as JSON; a non-JSON payload is returned
/// as a JSON string. A reported function error becomes
/// `AdapterError::FunctionError`.
pub struct LambdaFunctions {
    client: Client,
}

impl LambdaFunctions {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(sdk_config))
    }
}

fn decode_payload(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[async_trait]
impl FunctionInvoker for LambdaFunctions {
    async fn invoke(&self, arn: &str, body: &Value) -> Result<Value> {
        let payload = serde_json::to_vec(body)?;

        let output = self
            .client
            .invoke()
            .function_name(arn)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| AdapterError::Invoke(format!("{}: {}", arn, e)))?;

        let response = output
            .payload()
            .map(|blob| decode_payload(blob.as_ref()))
            .unwrap_or(Value::Null);

        if let Some(kind) = output.function_error() {
            return Err(AdapterError::FunctionError {
                kind: kind.to_string(),
                payload: response.to_string(),
            });
        }

        debug!(arn = %arn, status = output.status_code(), "Invoked function");
        Ok(response)
    }
}
