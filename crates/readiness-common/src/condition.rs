//! Status conditions and the readiness evaluator
//!
//! Backends report resource health as a list of Kubernetes-style conditions
//! (`type`, `status`, plus optional reason/message). The evaluator looks only
//! at the condition whose type matches the configured target and decides
//! whether the resource is ready.
//!
//! When the same type appears more than once, the first entry wins. Later
//! duplicates are ignored so the verdict never depends on how far a scan ran.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The "Ready" condition type
pub const CONDITION_READY: &str = "Ready";
/// The "True" status value for conditions
pub const STATUS_TRUE: &str = "True";
/// The "False" status value for conditions
pub const STATUS_FALSE: &str = "False";
/// The "Unknown" status value for conditions
pub const STATUS_UNKNOWN: &str = "Unknown";

/// Condition status following Kubernetes conventions
///
/// Parsing is lenient: any value other than exactly `True` or `False`,
/// including a missing or null one, becomes `Unknown`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "Option<String>")]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl ConditionStatus {
    /// Parse a backend status string
    pub fn parse(value: &str) -> Self {
        match value {
            STATUS_TRUE => Self::True,
            STATUS_FALSE => Self::False,
            _ => Self::Unknown,
        }
    }

    /// The wire representation of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::True => STATUS_TRUE,
            Self::False => STATUS_FALSE,
            Self::Unknown => STATUS_UNKNOWN,
        }
    }
}

impl From<Option<String>> for ConditionStatus {
    fn from(value: Option<String>) -> Self {
        value.as_deref().map(Self::parse).unwrap_or_default()
    }
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kubernetes-style condition as reported by a backend
///
/// Only `type_` and `status` take part in evaluation. The remaining fields
/// are carried for reporting.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g., Ready, Issuing)
    #[serde(rename = "type", default)]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    #[serde(default)]
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    /// Create a condition with just a type and status
    pub fn new(type_: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            type_: type_.into(),
            status,
            ..Default::default()
        }
    }

    /// Attach a reason and message
    pub fn with_reason(mut self, reason: impl Into<String>, message: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self.message = Some(message.into());
        self
    }
}

/// Trait for types that have condition-like fields (type and status)
///
/// Lets the evaluator run directly over backend condition types without
/// converting them first.
pub trait HasConditionFields {
    /// Get the condition type field value
    fn type_field(&self) -> &str;
    /// Get the condition status field value
    fn status_field(&self) -> &str;
}

impl HasConditionFields for Condition {
    fn type_field(&self) -> &str {
        &self.type_
    }
    fn status_field(&self) -> &str {
        self.status.as_str()
    }
}

/// Find the first condition of the given type
pub fn find_condition<'a, T>(conditions: &'a [T], condition_type: &str) -> Option<&'a T>
where
    T: HasConditionFields,
{
    conditions
        .iter()
        .find(|c| c.type_field() == condition_type)
}

/// Check whether the first condition of the given type has status "True"
///
/// # Arguments
/// * `conditions` - Conditions reported by the backend, in backend order
/// * `condition_type` - The condition type to check (e.g., "Ready")
///
/// # Returns
/// `true` if a condition with the given type exists and its first occurrence
/// has status "True". An empty list or a list without the type is not ready.
pub fn is_ready<T>(conditions: &[T], condition_type: &str) -> bool
where
    T: HasConditionFields,
{
    find_condition(conditions, condition_type)
        .map(|c| c.status_field() == STATUS_TRUE)
        .unwrap_or(false)
}
