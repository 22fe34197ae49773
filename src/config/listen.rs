//! Listen session and AWS client configuration types.

use serde::Deserialize;

use crate::adapters::ReceiveSettings;

/// Long-poll parameters used by listen sessions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Messages per receive, 1 to 10.
    pub max_messages: i32,
    /// Long-poll wait in seconds, 0 to 20.
    pub wait_time_secs: i32,
    /// Visibility timeout applied to received messages.
    pub visibility_timeout_secs: Option<i32>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            max_messages: 10,
            wait_time_secs: 20,
            visibility_timeout_secs: Some(30),
        }
    }
}

impl ListenConfig {
    /// Receive settings with values clamped to what SQS accepts.
    pub fn to_receive_settings(&self) -> ReceiveSettings {
        ReceiveSettings {
            max_messages: self.max_messages.clamp(1, 10),
            wait_time_secs: self.wait_time_secs.clamp(0, 20),
            visibility_timeout_secs: self.visibility_timeout_secs,
        }
    }
}

/// Shared AWS client settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Region override; the SDK default chain applies otherwise.
    pub region: Option<String>,
    /// Endpoint override (LocalStack and similar).
    pub endpoint_url: Option<String>,
}
