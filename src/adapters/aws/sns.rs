//! SNS topic publishing.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_sns::types::MessageAttributeValue;
use aws_sdk_sns::Client;
use serde_json::Value;
use tracing::debug;

use crate::adapters::{
    message_body, AdapterError, PublishReceipt, Result, SendOptions, TopicPublisher,
};

pub struct SnsTopics {
    client: Client,
}

impl SnsTopics {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(sdk_config))
    }
}

fn build_attributes(options: &SendOptions) -> Result<HashMap<String, MessageAttributeValue>> {
    options
        .attributes
        .iter()
        .map(|(name, value)| {
            let attr = MessageAttributeValue::builder()
                .data_type("String")
                .string_value(value)
                .build()
                .map_err(|e| AdapterError::Publish(format!("Failed to build attribute: {}", e)))?;
            Ok((name.clone(), attr))
        })
        .collect()
}

#[async_trait]
impl TopicPublisher for SnsTopics {
    async fn publish(
        &self,
        arn: &str,
        event: &Value,
        options: &SendOptions,
    ) -> Result<PublishReceipt> {
        let message = message_body(event)?;
        let attrs = build_attributes(options)?;

        let output = self
            .client
            .publish()
            .topic_arn(arn)
            .message(message)
            .set_message_attributes((!attrs.is_empty()).then_some(attrs))
            .set_message_group_id(options.group_id.clone())
            .set_message_deduplication_id(options.deduplication_id.clone())
            .send()
            .await
            .map_err(|e| AdapterError::Publish(format!("{}: {}", arn, e)))?;

        let message_id = output
            .message_id()
            .ok_or_else(|| AdapterError::Publish("SNS publish returned no MessageId".to_string()))?
            .to_string();

        debug!(topic_arn = %arn, message_id = %message_id, "Published to SNS");
        Ok(PublishReceipt::new(message_id))
    }
}
