//! In-memory management server.
//!
//! Mirrors the server-side rules satprep depends on: clones need an existing
//! source and a free label, child clones need an existing parent, changing a
//! base channel drops child subscriptions, and channels with children or
//! subscribers cannot be deleted.

use crate::api::{
    ApiError, ApiResult, ChannelRef, CloneDetails, CustomInfoKey, ManagementApi, SystemGroup,
    SystemId, SystemRef,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// A state-changing call received by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CloneChannel {
        original: String,
        label: String,
        parent_label: Option<String>,
    },
    DeleteChannel {
        label: String,
    },
    SetBaseChannel {
        system: SystemId,
        label: String,
    },
    SetChildChannels {
        system: SystemId,
        labels: Vec<String>,
    },
    CreateCustomInfoKey {
        label: String,
    },
    UpdateCustomInfoKey {
        label: String,
    },
    DeleteCustomInfoKey {
        label: String,
    },
}

/// A managed system held by the in-memory server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySystem {
    pub name: String,
    pub base: Option<String>,
    pub children: Vec<String>,
}

#[derive(Debug, Clone)]
struct MemoryChannel {
    parent: Option<String>,
}

#[derive(Debug)]
struct State {
    api_version: String,
    channels: BTreeMap<String, MemoryChannel>,
    systems: BTreeMap<SystemId, MemorySystem>,
    groups: BTreeMap<String, Vec<SystemId>>,
    custom_keys: BTreeMap<String, String>,
    mutations: Vec<Mutation>,
    failures: HashMap<String, ApiError>,
    spurious_child_fault: bool,
    next_channel_id: i64,
}

/// In-memory implementation of [`ManagementApi`].
pub struct MemorySatellite {
    state: Mutex<State>,
}

impl Default for MemorySatellite {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySatellite {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                api_version: "15".to_string(),
                channels: BTreeMap::new(),
                systems: BTreeMap::new(),
                groups: BTreeMap::new(),
                custom_keys: BTreeMap::new(),
                mutations: Vec::new(),
                failures: HashMap::new(),
                spurious_child_fault: false,
                next_channel_id: 100,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_api_version(self, version: &str) -> Self {
        self.lock().api_version = version.to_string();
        self
    }

    /// Add a channel; `parent` makes it a child channel.
    pub fn with_channel(self, label: &str, parent: Option<&str>) -> Self {
        self.lock().channels.insert(
            label.to_string(),
            MemoryChannel {
                parent: parent.map(str::to_string),
            },
        );
        self
    }

    pub fn with_system(
        self,
        id: SystemId,
        name: &str,
        base: Option<&str>,
        children: &[&str],
    ) -> Self {
        self.lock().systems.insert(
            id,
            MemorySystem {
                name: name.to_string(),
                base: base.map(str::to_string),
                children: children.iter().map(|c| c.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_group(self, name: &str, members: &[SystemId]) -> Self {
        self.lock()
            .groups
            .insert(name.to_string(), members.to_vec());
        self
    }

    pub fn with_custom_key(self, label: &str, description: &str) -> Self {
        self.lock()
            .custom_keys
            .insert(label.to_string(), description.to_string());
        self
    }

    /// Make every call of `method` (XML-RPC method name) fail with `error`.
    pub fn fail_method(&self, method: &str, error: ApiError) {
        self.lock().failures.insert(method.to_string(), error);
    }

    /// Apply `system.setChildChannels` but answer with a fault anyway.
    pub fn spurious_child_channel_fault(&self, enabled: bool) {
        self.lock().spurious_child_fault = enabled;
    }

    pub fn system(&self, id: SystemId) -> Option<MemorySystem> {
        self.lock().systems.get(&id).cloned()
    }

    pub fn channel_labels(&self) -> Vec<String> {
        self.lock().channels.keys().cloned().collect()
    }

    pub fn channel_parent(&self, label: &str) -> Option<String> {
        self.lock()
            .channels
            .get(label)
            .and_then(|c| c.parent.clone())
    }

    pub fn custom_keys(&self) -> BTreeMap<String, String> {
        self.lock().custom_keys.clone()
    }

    /// State-changing calls received so far, in order.
    pub fn mutations(&self) -> Vec<Mutation> {
        self.lock().mutations.clone()
    }

    fn check(state: &State, method: &str) -> ApiResult<()> {
        match state.failures.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn system_mut<'a>(state: &'a mut State, id: SystemId) -> ApiResult<&'a mut MemorySystem> {
        state
            .systems
            .get_mut(&id)
            .ok_or_else(|| ApiError::fault(-210, format!("No such system - sid = {}", id)))
    }
}

fn no_such_channel(label: &str) -> ApiError {
    ApiError::fault(1200, format!("No such channel: {}", label))
}

#[async_trait]
impl ManagementApi for MemorySatellite {
    async fn api_version(&self) -> ApiResult<String> {
        let state = self.lock();
        Self::check(&state, "api.getVersion")?;
        Ok(state.api_version.clone())
    }

    async fn list_groups(&self) -> ApiResult<Vec<SystemGroup>> {
        let state = self.lock();
        Self::check(&state, "systemgroup.listAllGroups")?;
        Ok(state
            .groups
            .keys()
            .enumerate()
            .map(|(i, name)| SystemGroup {
                id: i as i64 + 1,
                name: name.clone(),
                description: String::new(),
            })
            .collect())
    }

    async fn list_group_systems(&self, group: &str) -> ApiResult<Vec<SystemRef>> {
        let state = self.lock();
        Self::check(&state, "systemgroup.listSystems")?;
        let members = state
            .groups
            .get(group)
            .ok_or_else(|| ApiError::fault(2201, format!("Unable to locate system group {}", group)))?;
        Ok(members
            .iter()
            .filter_map(|id| {
                state.systems.get(id).map(|s| SystemRef {
                    id: *id,
                    name: s.name.clone(),
                })
            })
            .collect())
    }

    async fn system_ids(&self, name: &str) -> ApiResult<Vec<SystemRef>> {
        let state = self.lock();
        Self::check(&state, "system.getId")?;
        Ok(state
            .systems
            .iter()
            .filter(|(_, s)| s.name == name)
            .map(|(id, s)| SystemRef {
                id: *id,
                name: s.name.clone(),
            })
            .collect())
    }

    async fn subscribed_base_channel(&self, id: SystemId) -> ApiResult<Option<ChannelRef>> {
        let mut state = self.lock();
        Self::check(&state, "system.getSubscribedBaseChannel")?;
        let system = Self::system_mut(&mut state, id)?;
        Ok(system.base.as_deref().map(ChannelRef::new))
    }

    async fn subscribed_child_channels(&self, id: SystemId) -> ApiResult<Vec<ChannelRef>> {
        let mut state = self.lock();
        Self::check(&state, "system.listSubscribedChildChannels")?;
        let system = Self::system_mut(&mut state, id)?;
        Ok(system.children.iter().map(ChannelRef::new).collect())
    }

    async fn subscribable_child_channels(&self, id: SystemId) -> ApiResult<Vec<ChannelRef>> {
        let mut state = self.lock();
        Self::check(&state, "system.listSubscribableChildChannels")?;
        let system = Self::system_mut(&mut state, id)?.clone();
        let base = match system.base {
            Some(base) => base,
            None => return Ok(Vec::new()),
        };
        Ok(state
            .channels
            .iter()
            .filter(|(label, c)| {
                c.parent.as_deref() == Some(base.as_str()) && !system.children.contains(*label)
            })
            .map(|(label, _)| ChannelRef::new(label.as_str()))
            .collect())
    }

    async fn clone_channel(&self, original: &str, details: &CloneDetails) -> ApiResult<i64> {
        let mut state = self.lock();
        Self::check(&state, "channel.software.clone")?;
        state.mutations.push(Mutation::CloneChannel {
            original: original.to_string(),
            label: details.label.clone(),
            parent_label: details.parent_label.clone(),
        });

        if !state.channels.contains_key(original) {
            return Err(no_such_channel(original));
        }
        if state.channels.contains_key(&details.label) {
            return Err(ApiError::fault(
                1201,
                format!("Channel label already in use: {}", details.label),
            ));
        }
        if let Some(parent) = &details.parent_label {
            if !state.channels.contains_key(parent) {
                return Err(no_such_channel(parent));
            }
        }

        let id = state.next_channel_id;
        state.next_channel_id += 1;
        state.channels.insert(
            details.label.clone(),
            MemoryChannel {
                parent: details.parent_label.clone(),
            },
        );
        debug!("Cloned {} as {} (id {})", original, details.label, id);
        Ok(id)
    }

    async fn delete_channel(&self, label: &str) -> ApiResult<i64> {
        let mut state = self.lock();
        Self::check(&state, "channel.software.delete")?;
        state.mutations.push(Mutation::DeleteChannel {
            label: label.to_string(),
        });

        if !state.channels.contains_key(label) {
            return Err(no_such_channel(label));
        }
        if state
            .channels
            .values()
            .any(|c| c.parent.as_deref() == Some(label))
        {
            return Err(ApiError::fault(
                1202,
                format!("Channel {} still has child channels", label),
            ));
        }
        if state
            .systems
            .values()
            .any(|s| s.base.as_deref() == Some(label) || s.children.iter().any(|c| c == label))
        {
            return Err(ApiError::fault(
                1203,
                format!("Channel {} still has subscribed systems", label),
            ));
        }

        state.channels.remove(label);
        Ok(1)
    }

    async fn set_base_channel(&self, id: SystemId, label: &str) -> ApiResult<i64> {
        let mut state = self.lock();
        Self::check(&state, "system.setBaseChannel")?;
        state.mutations.push(Mutation::SetBaseChannel {
            system: id,
            label: label.to_string(),
        });

        match state.channels.get(label) {
            Some(channel) if channel.parent.is_none() => {}
            Some(_) => {
                return Err(ApiError::fault(
                    1204,
                    format!("{} is not a base channel", label),
                ))
            }
            None => return Err(no_such_channel(label)),
        }

        let system = Self::system_mut(&mut state, id)?;
        system.base = Some(label.to_string());
        system.children.clear();
        Ok(1)
    }

    async fn set_child_channels(&self, id: SystemId, labels: &[String]) -> ApiResult<i64> {
        let mut state = self.lock();
        Self::check(&state, "system.setChildChannels")?;
        state.mutations.push(Mutation::SetChildChannels {
            system: id,
            labels: labels.to_vec(),
        });

        let base = Self::system_mut(&mut state, id)?.base.clone();
        for label in labels {
            let channel = state.channels.get(label).ok_or_else(|| no_such_channel(label))?;
            if channel.parent.is_none() || channel.parent != base {
                return Err(ApiError::fault(
                    1205,
                    format!("{} is not a child of the system's base channel", label),
                ));
            }
        }

        Self::system_mut(&mut state, id)?.children = labels.to_vec();
        if state.spurious_child_fault {
            return Err(ApiError::fault(
                -1,
                "java.lang.NullPointerException",
            ));
        }
        Ok(1)
    }

    async fn list_custom_info_keys(&self) -> ApiResult<Vec<CustomInfoKey>> {
        let state = self.lock();
        Self::check(&state, "system.custominfo.listAllKeys")?;
        Ok(state
            .custom_keys
            .iter()
            .map(|(label, description)| CustomInfoKey {
                label: label.clone(),
                description: description.clone(),
            })
            .collect())
    }

    async fn create_custom_info_key(&self, label: &str, description: &str) -> ApiResult<i64> {
        let mut state = self.lock();
        Self::check(&state, "system.custominfo.createKey")?;
        state.mutations.push(Mutation::CreateCustomInfoKey {
            label: label.to_string(),
        });
        if state.custom_keys.contains_key(label) {
            return Err(ApiError::fault(
                1100,
                format!("Custom info key already exists: {}", label),
            ));
        }
        state
            .custom_keys
            .insert(label.to_string(), description.to_string());
        Ok(1)
    }

    async fn update_custom_info_key(&self, label: &str, description: &str) -> ApiResult<i64> {
        let mut state = self.lock();
        Self::check(&state, "system.custominfo.updateKey")?;
        state.mutations.push(Mutation::UpdateCustomInfoKey {
            label: label.to_string(),
        });
        match state.custom_keys.get_mut(label) {
            Some(existing) => {
                *existing = description.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_custom_info_key(&self, label: &str) -> ApiResult<i64> {
        let mut state = self.lock();
        Self::check(&state, "system.custominfo.deleteKey")?;
        state.mutations.push(Mutation::DeleteCustomInfoKey {
            label: label.to_string(),
        });
        Ok(if state.custom_keys.remove(label).is_some() {
            1
        } else {
            0
        })
    }
}
