//! Channel discovery.
//!
//! Reads the base and child channel subscriptions of every target system and
//! folds them into a [`ChannelTopology`] keyed by original (unfrozen) labels.

use crate::naming::ChannelNaming;
use satprep_common::{Error, Result};
use satprep_satellite::{ApiResult, ManagementApi, SystemId, SystemRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, error, warn};

/// Base channel label -> child channel labels, all in original form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelTopology(BTreeMap<String, BTreeSet<String>>);

impl ChannelTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_base(&mut self, base: &str) {
        if !self.0.contains_key(base) {
            debug!("Adding base channel '{}'", base);
            self.0.insert(base.to_string(), BTreeSet::new());
        }
    }

    pub fn add_child(&mut self, base: &str, child: &str) {
        self.add_base(base);
        if let Some(children) = self.0.get_mut(base) {
            if children.insert(child.to_string()) {
                debug!("Adding child channel '{}' below '{}'", child, base);
            }
        }
    }

    /// Base channels in label order.
    pub fn bases(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Children of `base` in label order.
    pub fn children(&self, base: &str) -> impl Iterator<Item = &str> {
        self.0
            .get(base)
            .into_iter()
            .flat_map(|c| c.iter().map(String::as_str))
    }

    /// Number of base and child channels.
    pub fn channel_count(&self) -> usize {
        self.0.len() + self.0.values().map(BTreeSet::len).sum::<usize>()
    }
}

impl fmt::Display for ChannelTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (base, children)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: [", base)?;
            for (j, child) in children.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(child)?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// A target system with its current subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSystem {
    pub id: SystemId,
    pub name: String,
    /// Base channel as currently subscribed.
    pub subscribed_base: String,
    /// Original identity of the base channel.
    pub base: String,
    /// Original identities of the subscribed child channels.
    pub children: Vec<String>,
}

/// Discovery switches.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryOptions {
    /// Also collect child channels the systems could subscribe to.
    pub all_subchannels: bool,
    /// Report systems without base channel as errors.
    pub require_base_channel: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            all_subchannels: false,
            require_base_channel: true,
        }
    }
}

/// Result of discovery: scanned systems and their channel tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Discovery {
    pub systems: Vec<TargetSystem>,
    pub topology: ChannelTopology,
}

struct Inspection {
    system: TargetSystem,
    /// Subscribable, not subscribed children (all-subchannels mode only).
    extra_children: Vec<String>,
}

/// Scan `targets` and build the channel topology.
///
/// Systems that cannot be scanned or have no base channel are logged and
/// left out. Fails if no system is left.
pub async fn discover(
    api: &dyn ManagementApi,
    targets: &[SystemRef],
    naming: &ChannelNaming,
    options: &DiscoveryOptions,
) -> Result<Discovery> {
    if targets.is_empty() {
        return Err(Error::Resolution("no target systems to scan".into()));
    }

    let mut discovery = Discovery::default();

    for target in targets {
        debug!("Checking channels of system '{}' (ID {})", target.name, target.id);
        match inspect(api, target, naming, options).await {
            Ok(Some(inspection)) => {
                let system = inspection.system;
                discovery.topology.add_base(&system.base);
                for child in system.children.iter().chain(&inspection.extra_children) {
                    discovery.topology.add_child(&system.base, child);
                }
                discovery.systems.push(system);
            }
            Ok(None) => {
                if options.require_base_channel {
                    error!(
                        "System '{}' has no base channel, excluding it",
                        target.name
                    );
                } else {
                    warn!(
                        "System '{}' has no base channel, skipping it",
                        target.name
                    );
                }
            }
            Err(e) => error!(
                "Unable to scan system '{}', check hostname and profile name: {}",
                target.name, e
            ),
        }
    }

    if discovery.systems.is_empty() {
        return Err(Error::Resolution(
            "none of the target systems could be scanned".into(),
        ));
    }

    debug!("Software channel tree: {}", discovery.topology);
    Ok(discovery)
}

async fn inspect(
    api: &dyn ManagementApi,
    target: &SystemRef,
    naming: &ChannelNaming,
    options: &DiscoveryOptions,
) -> ApiResult<Option<Inspection>> {
    let subscribed_base = match api.subscribed_base_channel(target.id).await? {
        Some(channel) => channel.label,
        None => return Ok(None),
    };
    let base = naming.original(&subscribed_base).to_string();

    let mut children: Vec<String> = Vec::new();
    for channel in api.subscribed_child_channels(target.id).await? {
        let child = naming.original(&channel.label).to_string();
        if !children.contains(&child) {
            children.push(child);
        }
    }

    let mut extra_children = Vec::new();
    if options.all_subchannels {
        for channel in api.subscribable_child_channels(target.id).await? {
            let child = naming.original(&channel.label).to_string();
            if !children.contains(&child) && !extra_children.contains(&child) {
                debug!("Adding non-subscribed child channel '{}'", child);
                extra_children.push(child);
            }
        }
    }

    Ok(Some(Inspection {
        system: TargetSystem {
            id: target.id,
            name: target.name.clone(),
            subscribed_base,
            base,
            children,
        },
        extra_children,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use satprep_satellite::{ApiError, MemorySatellite};
    use tracing_test::traced_test;

    fn naming() -> ChannelNaming {
        ChannelNaming::new("sp", "2024-01-15".parse().unwrap()).unwrap()
    }

    fn target(id: SystemId, name: &str) -> SystemRef {
        SystemRef {
            id,
            name: name.to_string(),
        }
    }

    fn server() -> MemorySatellite {
        MemorySatellite::new()
            .with_channel("rhel7-x86_64", None)
            .with_channel("rhel7-updates", Some("rhel7-x86_64"))
            .with_channel("rhel7-extras", Some("rhel7-x86_64"))
            .with_channel("rhel7-optional", Some("rhel7-x86_64"))
            .with_system(1, "web01", Some("rhel7-x86_64"), &["rhel7-updates"])
            .with_system(2, "web02", Some("rhel7-x86_64"), &["rhel7-extras"])
            .with_system(3, "bare01", None, &[])
    }

    fn tree(entries: &[(&str, &[&str])]) -> ChannelTopology {
        let mut topology = ChannelTopology::new();
        for (base, children) in entries {
            topology.add_base(base);
            for child in *children {
                topology.add_child(base, child);
            }
        }
        topology
    }

    #[tokio::test]
    async fn test_shared_base_merges_children() {
        let targets = [target(1, "web01"), target(2, "web02")];
        let discovery = discover(&server(), &targets, &naming(), &DiscoveryOptions::default())
            .await
            .unwrap();

        assert_eq!(
            discovery.topology,
            tree(&[("rhel7-x86_64", &["rhel7-extras", "rhel7-updates"])])
        );
        assert_eq!(discovery.systems.len(), 2);
        assert_eq!(discovery.systems[0].children, vec!["rhel7-updates"]);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_system_without_base_is_excluded() {
        let targets = [target(3, "bare01"), target(1, "web01")];
        let discovery = discover(&server(), &targets, &naming(), &DiscoveryOptions::default())
            .await
            .unwrap();

        let names: Vec<&str> = discovery.systems.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["web01"]);
        assert_eq!(
            discovery.topology,
            tree(&[("rhel7-x86_64", &["rhel7-updates"])])
        );
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .any(|l| l.contains("ERROR") && l.contains("System 'bare01' has no base channel"))
            {
                true => Ok(()),
                false => Err("no error line for the system without base channel".to_string()),
            }
        });
    }

    #[tokio::test]
    #[traced_test]
    async fn test_skipped_base_check_only_warns() {
        let options = DiscoveryOptions {
            require_base_channel: false,
            ..Default::default()
        };
        let targets = [target(3, "bare01"), target(1, "web01")];
        let discovery = discover(&server(), &targets, &naming(), &options)
            .await
            .unwrap();

        assert_eq!(discovery.systems.len(), 1);
        assert!(logs_contain("System 'bare01' has no base channel, skipping it"));
        logs_assert(|lines: &[&str]| match lines.iter().find(|l| l.contains("ERROR")) {
            Some(line) => Err(format!("unexpected error line: {}", line)),
            None => Ok(()),
        });
    }

    #[tokio::test]
    async fn test_only_systems_without_base_is_an_error() {
        let options = DiscoveryOptions {
            require_base_channel: false,
            ..Default::default()
        };
        let err = discover(&server(), &[target(3, "bare01")], &naming(), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[tokio::test]
    async fn test_empty_targets_rejected() {
        let err = discover(&server(), &[], &naming(), &DiscoveryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[tokio::test]
    async fn test_all_subchannels() {
        let options = DiscoveryOptions {
            all_subchannels: true,
            ..Default::default()
        };
        let discovery = discover(&server(), &[target(1, "web01")], &naming(), &options)
            .await
            .unwrap();

        assert_eq!(
            discovery.topology,
            tree(&[(
                "rhel7-x86_64",
                &["rhel7-extras", "rhel7-optional", "rhel7-updates"]
            )])
        );
        // The system keeps only its own subscriptions.
        assert_eq!(discovery.systems[0].children, vec!["rhel7-updates"]);
    }

    #[tokio::test]
    async fn test_frozen_systems_report_original_channels() {
        let sat = MemorySatellite::new()
            .with_channel("sp-2024-01-15.rhel7-x86_64", None)
            .with_channel(
                "sp-2024-01-15.rhel7-updates",
                Some("sp-2024-01-15.rhel7-x86_64"),
            )
            .with_system(
                1,
                "web01",
                Some("sp-2024-01-15.rhel7-x86_64"),
                &["sp-2024-01-15.rhel7-updates"],
            );

        let discovery = discover(&sat, &[target(1, "web01")], &naming(), &DiscoveryOptions::default())
            .await
            .unwrap();

        let system = &discovery.systems[0];
        assert_eq!(system.subscribed_base, "sp-2024-01-15.rhel7-x86_64");
        assert_eq!(system.base, "rhel7-x86_64");
        assert_eq!(system.children, vec!["rhel7-updates"]);
        assert_eq!(
            discovery.topology,
            tree(&[("rhel7-x86_64", &["rhel7-updates"])])
        );
    }

    #[tokio::test]
    async fn test_scan_failure_skips_system() {
        let sat = server();
        sat.fail_method(
            "system.listSubscribedChildChannels",
            ApiError::fault(-210, "No such system"),
        );
        let err = discover(&sat, &[target(1, "web01")], &naming(), &DiscoveryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[test]
    fn test_topology_display() {
        let topology = tree(&[("a", &["a1", "a2"]), ("b", &[])]);
        assert_eq!(topology.to_string(), "a: [a1, a2]; b: []");
        assert_eq!(topology.channel_count(), 4);
    }
}
