//! Cloning and deleting frozen channels.

use crate::naming::ChannelNaming;
use crate::outcome::{Action, ActionLog, CallOutcome};
use crate::topology::ChannelTopology;
use satprep_satellite::{CloneDetails, ManagementApi};
use tracing::{debug, error, info};

/// Summary of every clone made by satprep.
pub const CLONE_SUMMARY: &str = "Software channel cloned by satprep";

/// Clone every channel of `topology` under its frozen name.
///
/// Base channels are cloned before their children so each child clone can be
/// attached to the frozen base.
pub async fn clone_channels(
    api: &dyn ManagementApi,
    topology: &ChannelTopology,
    naming: &ChannelNaming,
    dry_run: bool,
    log: &mut ActionLog,
) {
    for base in topology.bases() {
        let frozen_base = naming.freeze(base);
        clone_one(api, naming, base, None, dry_run, log).await;

        for child in topology.children(base) {
            clone_one(api, naming, child, Some(frozen_base.as_str()), dry_run, log).await;
        }
    }
}

async fn clone_one(
    api: &dyn ManagementApi,
    naming: &ChannelNaming,
    original: &str,
    parent: Option<&str>,
    dry_run: bool,
    log: &mut ActionLog,
) {
    let details = CloneDetails {
        name: naming.clone_name(original),
        label: naming.freeze(original),
        summary: CLONE_SUMMARY.to_string(),
        parent_label: parent.map(str::to_string),
    };
    let action = Action::CloneChannel {
        original: original.to_string(),
        clone: details.label.clone(),
        parent: details.parent_label.clone(),
    };

    if dry_run {
        info!("I'd like to {}", action);
        log.record(action, CallOutcome::Simulated);
        return;
    }

    debug!("Cloning '{}' as '{}'", original, details.label);
    let result = api.clone_channel(original, &details).await;
    match &result {
        Ok(id) => info!("Cloned '{}' as '{}' (ID {})", original, details.label, id),
        Err(e) => error!("Unable to clone '{}' as '{}': {}", original, details.label, e),
    }
    log.record(action, CallOutcome::from_result(&result));
}

/// Delete the frozen clones of every channel of `topology`.
///
/// Children go first; the server refuses to delete a base channel that still
/// has child channels.
pub async fn delete_channels(
    api: &dyn ManagementApi,
    topology: &ChannelTopology,
    naming: &ChannelNaming,
    dry_run: bool,
    log: &mut ActionLog,
) {
    for base in topology.bases() {
        for child in topology.children(base) {
            delete_one(api, &naming.freeze(child), dry_run, log).await;
        }
        delete_one(api, &naming.freeze(base), dry_run, log).await;
    }
}

async fn delete_one(api: &dyn ManagementApi, label: &str, dry_run: bool, log: &mut ActionLog) {
    let action = Action::DeleteChannel {
        label: label.to_string(),
    };

    if dry_run {
        info!("I'd like to {}", action);
        log.record(action, CallOutcome::Simulated);
        return;
    }

    let result = api.delete_channel(label).await;
    match &result {
        Ok(_) => info!("Deleted channel '{}'", label),
        Err(e) => error!("Unable to delete channel '{}': {}", label, e),
    }
    log.record(action, CallOutcome::from_result(&result));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use satprep_satellite::{MemorySatellite, Mutation};

    fn naming() -> ChannelNaming {
        ChannelNaming::new("sp", "2024-01-15".parse().unwrap()).unwrap()
    }

    fn topology() -> ChannelTopology {
        let mut topology = ChannelTopology::new();
        topology.add_child("rhel7-x86_64", "rhel7-updates");
        topology.add_child("rhel7-x86_64", "rhel7-extras");
        topology
    }

    fn server() -> MemorySatellite {
        MemorySatellite::new()
            .with_channel("rhel7-x86_64", None)
            .with_channel("rhel7-updates", Some("rhel7-x86_64"))
            .with_channel("rhel7-extras", Some("rhel7-x86_64"))
    }

    #[tokio::test]
    async fn test_clone_base_before_children() {
        let sat = server();
        let mut log = ActionLog::new();
        clone_channels(&sat, &topology(), &naming(), false, &mut log).await;

        let base = "sp-2024-01-15.rhel7-x86_64".to_string();
        assert_eq!(
            sat.mutations(),
            vec![
                Mutation::CloneChannel {
                    original: "rhel7-x86_64".into(),
                    label: base.clone(),
                    parent_label: None,
                },
                Mutation::CloneChannel {
                    original: "rhel7-extras".into(),
                    label: "sp-2024-01-15.rhel7-extras".into(),
                    parent_label: Some(base.clone()),
                },
                Mutation::CloneChannel {
                    original: "rhel7-updates".into(),
                    label: "sp-2024-01-15.rhel7-updates".into(),
                    parent_label: Some(base.clone()),
                },
            ]
        );
        assert_eq!(log.summary().applied, 3);
        assert_eq!(
            sat.channel_parent("sp-2024-01-15.rhel7-updates"),
            Some(base)
        );
    }

    #[tokio::test]
    async fn test_clone_failure_continues() {
        let sat = server().with_channel("sp-2024-01-15.rhel7-extras", Some("rhel7-x86_64"));
        let mut log = ActionLog::new();
        clone_channels(&sat, &topology(), &naming(), false, &mut log).await;

        let summary = log.summary();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.applied, 2);
        assert!(sat
            .channel_labels()
            .contains(&"sp-2024-01-15.rhel7-updates".to_string()));
    }

    #[tokio::test]
    async fn test_delete_children_first() {
        let sat = server();
        let mut log = ActionLog::new();
        clone_channels(&sat, &topology(), &naming(), false, &mut log).await;

        let mut log = ActionLog::new();
        delete_channels(&sat, &topology(), &naming(), false, &mut log).await;

        let deleted: Vec<String> = log
            .actions()
            .map(|a| match a {
                Action::DeleteChannel { label } => label.clone(),
                other => panic!("unexpected action {:?}", other),
            })
            .collect();
        assert_eq!(
            deleted,
            vec![
                "sp-2024-01-15.rhel7-extras",
                "sp-2024-01-15.rhel7-updates",
                "sp-2024-01-15.rhel7-x86_64",
            ]
        );
        assert_eq!(log.summary().failed, 0);
        assert_eq!(
            sat.channel_labels(),
            vec!["rhel7-extras", "rhel7-updates", "rhel7-x86_64"]
        );
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_calls() {
        let sat = server();
        let mut log = ActionLog::new();
        clone_channels(&sat, &topology(), &naming(), true, &mut log).await;
        delete_channels(&sat, &topology(), &naming(), true, &mut log).await;

        assert!(sat.mutations().is_empty());
        assert_eq!(log.summary().simulated, 6);
    }
}
