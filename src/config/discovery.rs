//! Discovery configuration types.

use std::collections::HashMap;

use serde::Deserialize;

use crate::address::DEFAULT_NAMESPACE;
use crate::discovery::instance::{ARN_ATTR, NAME_ATTR, TYPE_ATTR, URL_ATTR};
use crate::discovery::DiscoveredInstance;

/// Discovery type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryType {
    /// Instances listed in configuration and `SVCDISPATCH_INSTANCES`.
    #[default]
    Static,
    /// AWS Cloud Map (`aws` feature).
    CloudMap,
}

/// Discovery configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    #[serde(rename = "type")]
    pub discovery_type: DiscoveryType,
    /// Static instances (static discovery only).
    pub services: Vec<StaticInstanceConfig>,
    pub cache: CacheConfig,
}

/// Discovery cache. Disabled unless configured.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: 30,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_secs)
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// One statically registered instance.
///
/// `type` plus the locator field matching it (`arn`, `url` or `name`) become
/// instance attributes; `attributes` carries anything else verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StaticInstanceConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub service: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl StaticInstanceConfig {
    pub fn to_instance(&self) -> DiscoveredInstance {
        let mut instance = DiscoveredInstance {
            id: self.id.clone(),
            attributes: self.attributes.clone(),
        };
        instance = instance.with_attribute(TYPE_ATTR, self.kind.clone());
        for (attr, value) in [(ARN_ATTR, &self.arn), (URL_ATTR, &self.url), (NAME_ATTR, &self.name)] {
            if let Some(value) = value {
                instance = instance.with_attribute(attr, value.clone());
            }
        }
        instance
    }
}
