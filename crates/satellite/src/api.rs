//! Management API trait and the records it exchanges.

use async_trait::async_trait;
use satprep_xmlrpc::{RpcError, Value};
use serde::{Deserialize, Serialize};

/// Error raised by a management API call.
pub type ApiError = RpcError;

/// Result type alias for management API calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Numeric system (profile) ID on the server.
pub type SystemId = i64;

/// A system profile as returned by lookups and group listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRef {
    pub id: SystemId,
    pub name: String,
}

/// A system group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemGroup {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// A software channel subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub label: String,
    pub name: Option<String>,
}

impl ChannelRef {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            name: None,
        }
    }

    /// Parse a channel struct; an empty struct means "no channel".
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        let label = value
            .get("label")
            .and_then(Value::as_str)
            .filter(|label| !label.is_empty())?;
        let name = value.get("name").and_then(Value::as_str).map(str::to_string);
        Some(Self {
            label: label.to_string(),
            name,
        })
    }
}

/// Details of a channel clone request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneDetails {
    pub name: String,
    pub label: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_label: Option<String>,
}

impl CloneDetails {
    pub(crate) fn to_value(&self) -> Value {
        let mut members = vec![
            ("name", Value::from(self.name.as_str())),
            ("label", Value::from(self.label.as_str())),
            ("summary", Value::from(self.summary.as_str())),
        ];
        if let Some(parent) = &self.parent_label {
            members.push(("parent_label", Value::from(parent.as_str())));
        }
        Value::structure(members)
    }
}

/// A custom system information key definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomInfoKey {
    pub label: String,
    pub description: String,
}

/// Operations satprep needs from the management server.
///
/// All calls run against an already authenticated session.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// API level reported by the server (`api.getVersion`).
    async fn api_version(&self) -> ApiResult<String>;

    /// All system groups visible to the session.
    async fn list_groups(&self) -> ApiResult<Vec<SystemGroup>>;

    /// Members of a system group.
    async fn list_group_systems(&self, group: &str) -> ApiResult<Vec<SystemRef>>;

    /// Profiles registered under `name`; empty if unknown.
    async fn system_ids(&self, name: &str) -> ApiResult<Vec<SystemRef>>;

    /// Subscribed base channel, `None` if the system has none.
    async fn subscribed_base_channel(&self, id: SystemId) -> ApiResult<Option<ChannelRef>>;

    async fn subscribed_child_channels(&self, id: SystemId) -> ApiResult<Vec<ChannelRef>>;

    /// Child channels the system could subscribe to but does not.
    async fn subscribable_child_channels(&self, id: SystemId) -> ApiResult<Vec<ChannelRef>>;

    /// Clone `original` as described by `details`, returning the new channel ID.
    async fn clone_channel(&self, original: &str, details: &CloneDetails) -> ApiResult<i64>;

    async fn delete_channel(&self, label: &str) -> ApiResult<i64>;

    async fn set_base_channel(&self, id: SystemId, label: &str) -> ApiResult<i64>;

    /// Replace the child channel subscriptions of a system.
    async fn set_child_channels(&self, id: SystemId, labels: &[String]) -> ApiResult<i64>;

    async fn list_custom_info_keys(&self) -> ApiResult<Vec<CustomInfoKey>>;

    async fn create_custom_info_key(&self, label: &str, description: &str) -> ApiResult<i64>;

    async fn update_custom_info_key(&self, label: &str, description: &str) -> ApiResult<i64>;

    async fn delete_custom_info_key(&self, label: &str) -> ApiResult<i64>;
}
