//! XML-RPC implementation of [`ManagementApi`].

use crate::api::{
    ApiError, ApiResult, ChannelRef, CloneDetails, CustomInfoKey, ManagementApi, SystemGroup,
    SystemId, SystemRef,
};
use async_trait::async_trait;
use satprep_common::Credentials;
use satprep_xmlrpc::{HttpTransport, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where and how to reach the management server.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Hostname (optionally with port) of the server.
    pub server: String,
    pub https: bool,
    pub timeout_seconds: u64,
}

impl ConnectionConfig {
    /// XML-RPC endpoint URL of the server.
    pub fn endpoint(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}/rpc/api", scheme, self.server)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            https: false,
            timeout_seconds: 300,
        }
    }
}

/// Authenticated session against the server's XML-RPC API.
pub struct SatelliteClient {
    transport: HttpTransport,
    session: String,
}

impl SatelliteClient {
    /// Log in and open a session.
    pub async fn login(config: &ConnectionConfig, credentials: &Credentials) -> ApiResult<Self> {
        let transport = HttpTransport::new(
            config.endpoint(),
            Duration::from_secs(config.timeout_seconds),
        )?;

        debug!(
            "Logging in to {} as {}",
            transport.endpoint(),
            credentials.username
        );
        let session = transport
            .call(
                "auth.login",
                &[
                    Value::from(credentials.username.as_str()),
                    Value::from(credentials.password.as_str()),
                ],
            )
            .await?
            .expect_str()?
            .to_string();
        info!("Logged in to {}", transport.endpoint());

        Ok(Self { transport, session })
    }

    /// Close the session. Failures are only logged.
    pub async fn logout(self) {
        if let Err(e) = self
            .transport
            .call("auth.logout", &[self.key()])
            .await
        {
            warn!("Logout from {} failed: {}", self.transport.endpoint(), e);
        }
    }

    fn key(&self) -> Value {
        Value::from(self.session.as_str())
    }

    /// Call a method that takes the session key as first parameter.
    async fn call(&self, method: &str, params: Vec<Value>) -> ApiResult<Value> {
        let mut all = Vec::with_capacity(params.len() + 1);
        all.push(self.key());
        all.extend(params);
        self.transport.call(method, &all).await
    }

    async fn channels(&self, method: &str, id: SystemId) -> ApiResult<Vec<ChannelRef>> {
        let value = self.call(method, vec![Value::from(id)]).await?;
        Ok(value
            .expect_array()?
            .iter()
            .filter_map(ChannelRef::from_value)
            .collect())
    }
}

fn system_refs(value: &Value, name_key: &str) -> ApiResult<Vec<SystemRef>> {
    value
        .expect_array()?
        .iter()
        .map(|item| {
            Ok(SystemRef {
                id: item.member_i64("id")?,
                name: item.member_str(name_key)?.to_string(),
            })
        })
        .collect()
}

fn result_code(value: Value) -> ApiResult<i64> {
    match value {
        Value::Int(code) => Ok(code),
        // Some server versions answer void calls with an empty response.
        Value::Nil => Ok(1),
        other => Err(ApiError::UnexpectedType {
            expected: "int",
            found: other.type_name().to_string(),
        }),
    }
}

#[async_trait]
impl ManagementApi for SatelliteClient {
    async fn api_version(&self) -> ApiResult<String> {
        let value = self.transport.call("api.getVersion", &[]).await?;
        match value {
            Value::String(version) => Ok(version),
            Value::Double(version) => Ok(version.to_string()),
            Value::Int(version) => Ok(version.to_string()),
            other => Err(ApiError::UnexpectedType {
                expected: "string",
                found: other.type_name().to_string(),
            }),
        }
    }

    async fn list_groups(&self) -> ApiResult<Vec<SystemGroup>> {
        let value = self.call("systemgroup.listAllGroups", vec![]).await?;
        value
            .expect_array()?
            .iter()
            .map(|item| {
                Ok(SystemGroup {
                    id: item.member_i64("id")?,
                    name: item.member_str("name")?.to_string(),
                    description: item
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect()
    }

    async fn list_group_systems(&self, group: &str) -> ApiResult<Vec<SystemRef>> {
        let value = self
            .call("systemgroup.listSystems", vec![Value::from(group)])
            .await?;
        system_refs(&value, "profile_name")
    }

    async fn system_ids(&self, name: &str) -> ApiResult<Vec<SystemRef>> {
        let value = self.call("system.getId", vec![Value::from(name)]).await?;
        system_refs(&value, "name")
    }

    async fn subscribed_base_channel(&self, id: SystemId) -> ApiResult<Option<ChannelRef>> {
        let value = self
            .call("system.getSubscribedBaseChannel", vec![Value::from(id)])
            .await?;
        Ok(ChannelRef::from_value(&value))
    }

    async fn subscribed_child_channels(&self, id: SystemId) -> ApiResult<Vec<ChannelRef>> {
        self.channels("system.listSubscribedChildChannels", id).await
    }

    async fn subscribable_child_channels(&self, id: SystemId) -> ApiResult<Vec<ChannelRef>> {
        self.channels("system.listSubscribableChildChannels", id)
            .await
    }

    async fn clone_channel(&self, original: &str, details: &CloneDetails) -> ApiResult<i64> {
        let value = self
            .call(
                "channel.software.clone",
                vec![Value::from(original), details.to_value(), Value::from(false)],
            )
            .await?;
        result_code(value)
    }

    async fn delete_channel(&self, label: &str) -> ApiResult<i64> {
        let value = self
            .call("channel.software.delete", vec![Value::from(label)])
            .await?;
        result_code(value)
    }

    async fn set_base_channel(&self, id: SystemId, label: &str) -> ApiResult<i64> {
        let value = self
            .call(
                "system.setBaseChannel",
                vec![Value::from(id), Value::from(label)],
            )
            .await?;
        result_code(value)
    }

    async fn set_child_channels(&self, id: SystemId, labels: &[String]) -> ApiResult<i64> {
        let labels = labels.iter().map(|l| Value::from(l.as_str())).collect();
        let value = self
            .call(
                "system.setChildChannels",
                vec![Value::from(id), Value::Array(labels)],
            )
            .await?;
        result_code(value)
    }

    async fn list_custom_info_keys(&self) -> ApiResult<Vec<CustomInfoKey>> {
        let value = self.call("system.custominfo.listAllKeys", vec![]).await?;
        value
            .expect_array()?
            .iter()
            .map(|item| {
                Ok(CustomInfoKey {
                    label: item.member_str("label")?.to_string(),
                    description: item
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect()
    }

    async fn create_custom_info_key(&self, label: &str, description: &str) -> ApiResult<i64> {
        let value = self
            .call(
                "system.custominfo.createKey",
                vec![Value::from(label), Value::from(description)],
            )
            .await?;
        result_code(value)
    }

    async fn update_custom_info_key(&self, label: &str, description: &str) -> ApiResult<i64> {
        let value = self
            .call(
                "system.custominfo.updateKey",
                vec![Value::from(label), Value::from(description)],
            )
            .await?;
        result_code(value)
    }

    async fn delete_custom_info_key(&self, label: &str) -> ApiResult<i64> {
        let value = self
            .call("system.custominfo.deleteKey", vec![Value::from(label)])
            .await?;
        result_code(value)
    }
}
