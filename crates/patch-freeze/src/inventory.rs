//! Target system resolution.

use satprep_common::{Error, Result};
use satprep_satellite::{ManagementApi, SystemRef};
use std::collections::BTreeSet;
use tracing::{debug, error, warn};

/// Systems and groups named on the command line.
#[derive(Debug, Clone, Default)]
pub struct TargetSelection {
    pub systems: Vec<String>,
    pub groups: Vec<String>,
    /// Profile names never to touch.
    pub exclude: Vec<String>,
}

impl TargetSelection {
    /// Check that at least one system or group was requested.
    pub fn validate(&self) -> Result<()> {
        if self.systems.is_empty() && self.groups.is_empty() {
            return Err(Error::Config(
                "at least one system or system group must be specified".into(),
            ));
        }
        Ok(())
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|e| e.eq_ignore_ascii_case(name))
    }
}

/// Resolve the selection into system profiles known to the server.
///
/// Unknown systems and groups are logged and skipped. Fails if nothing is
/// left after resolution and exclusion.
pub async fn resolve_targets(
    api: &dyn ManagementApi,
    selection: &TargetSelection,
) -> Result<Vec<SystemRef>> {
    selection.validate()?;

    let known_groups: BTreeSet<String> = api
        .list_groups()
        .await
        .map_err(|e| Error::Resolution(format!("unable to list system groups: {}", e)))?
        .into_iter()
        .map(|g| g.name)
        .collect();
    debug!("Server system groups: {:?}", known_groups);

    let mut candidates: Vec<SystemRef> = Vec::new();

    for name in &selection.systems {
        match api.system_ids(name).await {
            Ok(ids) => match ids.as_slice() {
                [] => error!("System '{}' appears not to be a valid host", name),
                [first, rest @ ..] => {
                    if !rest.is_empty() {
                        warn!(
                            "System '{}' has {} profiles, using ID {}",
                            name,
                            ids.len(),
                            first.id
                        );
                    }
                    candidates.push(first.clone());
                }
            },
            Err(e) => error!("Unable to look up system '{}': {}", name, e),
        }
    }

    for group in &selection.groups {
        if !known_groups.contains(group) {
            error!("Group '{}' appears not to be a valid group", group);
            continue;
        }
        match api.list_group_systems(group).await {
            Ok(members) => {
                for member in members {
                    debug!("Adding system '{}' from group '{}'", member.name, group);
                    candidates.push(member);
                }
            }
            Err(e) => error!("Unable to list systems of group '{}': {}", group, e),
        }
    }

    let mut seen = BTreeSet::new();
    let mut targets = Vec::new();
    for system in candidates {
        if selection.is_excluded(&system.name) {
            debug!("System '{}' is excluded", system.name);
            continue;
        }
        if seen.insert(system.id) {
            targets.push(system);
        }
    }

    if targets.is_empty() {
        return Err(Error::Resolution(
            "no valid target systems left after resolution".into(),
        ));
    }

    debug!(
        "Validated systems: {:?}",
        targets.iter().map(|s| s.name.as_str()).collect::<Vec<_>>()
    );
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use satprep_satellite::{ApiError, MemorySatellite};

    fn server() -> MemorySatellite {
        MemorySatellite::new()
            .with_channel("rhel7", None)
            .with_system(1, "web01", Some("rhel7"), &[])
            .with_system(2, "web02", Some("rhel7"), &[])
            .with_system(3, "db01", Some("rhel7"), &[])
            .with_group("web", &[1, 2])
    }

    fn names(systems: &[SystemRef]) -> Vec<&str> {
        systems.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_empty_selection_is_config_error() {
        let err = TargetSelection::default().validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_systems_and_groups_deduplicated() {
        let selection = TargetSelection {
            systems: vec!["web01".into(), "db01".into()],
            groups: vec!["web".into()],
            exclude: vec![],
        };
        let targets = resolve_targets(&server(), &selection).await.unwrap();
        assert_eq!(names(&targets), vec!["web01", "db01", "web02"]);
    }

    #[tokio::test]
    async fn test_unknown_entries_dropped() {
        let selection = TargetSelection {
            systems: vec!["ghost".into(), "db01".into()],
            groups: vec!["nope".into()],
            exclude: vec![],
        };
        let targets = resolve_targets(&server(), &selection).await.unwrap();
        assert_eq!(names(&targets), vec!["db01"]);
    }

    #[tokio::test]
    async fn test_exclusion_is_case_insensitive() {
        let selection = TargetSelection {
            systems: vec![],
            groups: vec!["web".into()],
            exclude: vec!["WEB02".into()],
        };
        let targets = resolve_targets(&server(), &selection).await.unwrap();
        assert_eq!(names(&targets), vec!["web01"]);
    }

    #[tokio::test]
    async fn test_nothing_left_is_an_error() {
        let selection = TargetSelection {
            systems: vec!["web01".into()],
            groups: vec![],
            exclude: vec!["web01".into()],
        };
        let err = resolve_targets(&server(), &selection).await.unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_fatal() {
        let sat = server();
        sat.fail_method("system.getId", ApiError::transport("timeout"));
        let selection = TargetSelection {
            systems: vec!["web01".into()],
            groups: vec!["web".into()],
            exclude: vec![],
        };
        let targets = resolve_targets(&sat, &selection).await.unwrap();
        assert_eq!(names(&targets), vec!["web01", "web02"]);
    }
}
