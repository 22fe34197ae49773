//! Discovered instances and the backend kinds they declare.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Attribute naming the backend kind.
pub const TYPE_ATTR: &str = "type";
/// Attribute carrying an ARN locator.
pub const ARN_ATTR: &str = "arn";
/// Attribute carrying a URL locator.
pub const URL_ATTR: &str = "url";
/// Attribute carrying a plain resource name.
pub const NAME_ATTR: &str = "name";

/// Backend kinds the router knows how to dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Function,
    StateMachine,
    Automation,
    Sns,
    Queue,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Function => "function",
            BackendKind::StateMachine => "state-machine",
            BackendKind::Automation => "automation",
            BackendKind::Sns => "sns",
            BackendKind::Queue => "queue",
        }
    }

    /// Locator attributes to try, in order of preference.
    pub(crate) fn locator_attrs(&self) -> &'static [&'static str] {
        match self {
            BackendKind::Function | BackendKind::StateMachine | BackendKind::Sns => &[ARN_ATTR],
            BackendKind::Automation => &[ARN_ATTR, NAME_ATTR],
            BackendKind::Queue => &[URL_ATTR],
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `type` attribute value that names no known backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl FromStr for BackendKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function" | "lambda" => Ok(BackendKind::Function),
            "state-machine" | "stateMachine" | "sfn" => Ok(BackendKind::StateMachine),
            "automation" | "ssm" => Ok(BackendKind::Automation),
            "sns" | "topic" => Ok(BackendKind::Sns),
            "queue" | "sqs" => Ok(BackendKind::Queue),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// One backend resource returned by discovery.
///
/// Attributes are kept exactly as the registry returned them; the router
/// interprets them but never rewrites them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredInstance {
    pub id: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl DiscoveredInstance {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn function(id: impl Into<String>, arn: impl Into<String>) -> Self {
        Self::new(id)
            .with_attribute(TYPE_ATTR, BackendKind::Function.as_str())
            .with_attribute(ARN_ATTR, arn)
    }

    pub fn state_machine(id: impl Into<String>, arn: impl Into<String>) -> Self {
        Self::new(id)
            .with_attribute(TYPE_ATTR, BackendKind::StateMachine.as_str())
            .with_attribute(ARN_ATTR, arn)
    }

    pub fn automation(id: impl Into<String>, document: impl Into<String>) -> Self {
        Self::new(id)
            .with_attribute(TYPE_ATTR, BackendKind::Automation.as_str())
            .with_attribute(NAME_ATTR, document)
    }

    pub fn sns(id: impl Into<String>, arn: impl Into<String>) -> Self {
        Self::new(id)
            .with_attribute(TYPE_ATTR, BackendKind::Sns.as_str())
            .with_attribute(ARN_ATTR, arn)
    }

    pub fn queue(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(id)
            .with_attribute(TYPE_ATTR, BackendKind::Queue.as_str())
            .with_attribute(URL_ATTR, url)
    }

    /// Raw `type` attribute, if any.
    pub fn type_tag(&self) -> Option<&str> {
        self.attributes.get(TYPE_ATTR).map(String::as_str)
    }

    /// Declared backend kind; `None` when missing or unrecognized.
    pub fn kind(&self) -> Option<BackendKind> {
        self.type_tag().and_then(|t| t.parse().ok())
    }

    /// Connection detail for the given kind.
    pub fn locator(&self, kind: BackendKind) -> Option<&str> {
        kind.locator_attrs()
            .iter()
            .find_map(|attr| self.attributes.get(*attr))
            .map(String::as_str)
    }
}

/// Ordered instances discovered for one `(namespace, service)` pair.
pub type InstanceSet = Vec<DiscoveredInstance>;
