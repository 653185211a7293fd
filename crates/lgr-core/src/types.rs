//! Core types for LGR
//!
//! Defines the inputs of a single invocation:
//! - The event envelope delivered by the orchestrator
//! - The desired component definition
//! - The previously recorded state
//! - Deployment coordinates (region, account)

use crate::error::HandlerError;
use crate::identifiers;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Tag map (key → value), ordered for stable output
pub type Tags = BTreeMap<String, String>;

/// Free-form attribute map used for props and links
pub type AttributeMap = Map<String, Value>;

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Operation requested by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create or converge the log group
    Upsert,
    /// Remove the log group
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upsert => f.write_str("upsert"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// How far the orchestrator trusts the previous result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrustLevel {
    /// Unchanged definitions are not re-verified against the service
    Full,
    /// Any other declared level; always re-verified
    Other(String),
}

impl From<String> for TrustLevel {
    fn from(value: String) -> Self {
        if value == "full" {
            Self::Full
        } else {
            Self::Other(value)
        }
    }
}

impl From<TrustLevel> for String {
    fn from(value: TrustLevel) -> Self {
        match value {
            TrustLevel::Full => "full".to_string(),
            TrustLevel::Other(other) => other,
        }
    }
}

/// Desired state of the log group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    /// Explicit log group name; derived from naming coordinates when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Trust level of the previous result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_level: Option<TrustLevel>,
    /// Encryption key; immutable once the log group exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    /// Desired tags
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Tags,
}

impl ComponentDefinition {
    /// Decode from the raw `component_def` value
    ///
    /// # Errors
    /// Returns `HandlerError::InvalidDefinition` if a known field has the wrong shape
    pub fn from_value(value: &Value) -> Result<Self, HandlerError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(value).map_err(|e| HandlerError::InvalidDefinition(e.to_string()))
    }

    /// Whether full trust was declared
    #[inline]
    #[must_use]
    pub fn is_full_trust(&self) -> bool {
        matches!(self.trust_level, Some(TrustLevel::Full))
    }
}

/// Last recorded output of a successful reconciliation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviousState {
    /// Recorded attributes (`name`, `kms_key_id`, `def_hash`, ...)
    #[serde(default, deserialize_with = "null_as_default")]
    pub props: AttributeMap,
    /// Recorded links
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: AttributeMap,
}

impl PreviousState {
    fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    /// Previously recorded log group name
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.prop_str("name").filter(|name| !name.is_empty())
    }

    /// Previously recorded key id (`null` reads as absent)
    #[inline]
    #[must_use]
    pub fn kms_key_id(&self) -> Option<&str> {
        self.prop_str("kms_key_id")
    }

    /// Previously recorded definition hash
    #[inline]
    #[must_use]
    pub fn def_hash(&self) -> Option<&str> {
        self.prop_str("def_hash")
    }
}

/// Event envelope delivered by the orchestrator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationEvent {
    /// Requested operation
    #[serde(default)]
    pub op: Option<Operation>,
    /// Raw desired definition; hashed as-is, so unknown fields count
    #[serde(default)]
    pub component_def: Value,
    /// Previous state, absent on first creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_state: Option<PreviousState>,
    /// Project code, used for default naming
    #[serde(default)]
    pub project_code: Option<String>,
    /// Repository id, used for default naming
    #[serde(default)]
    pub repo_id: Option<String>,
    /// Component name, used for default naming
    #[serde(default)]
    pub component_name: Option<String>,
    /// Continuation data from a previous retryable invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_back_data: Option<Value>,
}

impl InvocationEvent {
    /// Decode from the raw event value
    ///
    /// # Errors
    /// Returns `HandlerError::MalformedEvent` when the envelope cannot be decoded
    pub fn from_value(value: &Value) -> Result<Self, HandlerError> {
        Self::deserialize(value).map_err(|e| HandlerError::MalformedEvent(e.to_string()))
    }

    /// Pass-back data, ignoring `null` and empty objects
    #[must_use]
    pub fn continuation(&self) -> Option<&Value> {
        self.pass_back_data.as_ref().filter(|data| match data {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            _ => true,
        })
    }
}

/// Region and account the log group lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentContext {
    /// Region code (e.g. `us-east-1`)
    pub region: String,
    /// Twelve-digit account number
    pub account_number: String,
}

impl DeploymentContext {
    /// Create new deployment context
    #[inline]
    pub fn new(region: impl Into<String>, account_number: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_number: account_number.into(),
        }
    }

    /// Canonical ARN of `name`
    #[inline]
    #[must_use]
    pub fn arn(&self, name: &str) -> String {
        identifiers::log_group_arn(name, &self.region, &self.account_number)
    }

    /// Wildcard ARN of `name`
    #[inline]
    #[must_use]
    pub fn star_arn(&self, name: &str) -> String {
        identifiers::log_group_star_arn(name, &self.region, &self.account_number)
    }

    /// Console link of `name`
    #[inline]
    #[must_use]
    pub fn console_link(&self, name: &str) -> String {
        identifiers::log_group_console_link(&self.region, name)
    }
}

/// Resolved desired state for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredLogGroup {
    /// Final log group name
    pub name: String,
    /// Desired encryption key
    pub kms_key_id: Option<String>,
    /// Desired tags
    pub tags: Tags,
}
