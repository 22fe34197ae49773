//! SQS send, receive and delete.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_sqs::types::MessageAttributeValue;
use aws_sdk_sqs::Client;
use serde_json::Value;
use tracing::debug;

use crate::adapters::{
    message_body, AdapterError, PublishReceipt, QueueClient, ReceiveSettings, ReceivedMessage,
    Result, SendOptions,
};

pub struct SqsQueues {
    client: Client,
}

impl SqsQueues {
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
                .map_err(|e| AdapterError::Send(format!("Failed to build attribute: {}", e)))?;
            Ok((name.clone(), attr))
        })
        .collect()
}

#[async_trait]
impl QueueClient for SqsQueues {
    async fn send(
        &self,
        url: &str,
        message: &Value,
        options: &SendOptions,
    ) -> Result<PublishReceipt> {
        let body = message_body(message)?;
        let attrs = build_attributes(options)?;

        let output = self
            .client
            .send_message()
            .queue_url(url)
            .message_body(body)
            .set_message_attributes((!attrs.is_empty()).then_some(attrs))
            .set_message_group_id(options.group_id.clone())
            .set_message_deduplication_id(options.deduplication_id.clone())
            .set_delay_seconds(options.delay_seconds)
            .send()
            .await
            .map_err(|e| AdapterError::Send(format!("{}: {}", url, e)))?;

        let message_id = output
            .message_id()
            .ok_or_else(|| AdapterError::Send("SQS send returned no MessageId".to_string()))?
            .to_string();

        debug!(queue_url = %url, message_id = %message_id, "Sent message to SQS");
        Ok(PublishReceipt::new(message_id))
    }

    async fn receive(
        &self,
        url: &str,
        settings: &ReceiveSettings,
    ) -> Result<Vec<ReceivedMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(url)
            .max_number_of_messages(settings.max_messages)
            .wait_time_seconds(settings.wait_time_secs)
            .set_visibility_timeout(settings.visibility_timeout_secs)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| AdapterError::Receive(format!("{}: {}", url, e)))?;

        let messages = output
            .messages()
            .iter()
            .map(|message| ReceivedMessage {
                message_id: message.message_id().unwrap_or_default().to_string(),
                receipt_handle: message.receipt_handle().map(str::to_string),
                body: message.body().unwrap_or_default().to_string(),
                attributes: message
                    .message_attributes()
                    .map(|attrs| {
                        attrs
                            .iter()
                            .filter_map(|(k, v)| {
                                v.string_value().map(|s| (k.clone(), s.to_string()))
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect::<Vec<_>>();

        debug!(queue_url = %url, count = messages.len(), "Received messages from SQS");
        Ok(messages)
    }

    async fn delete(&self, url: &str, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| AdapterError::Delete(format!("{}: {}", url, e)))?;
        Ok(())
    }
}
