//! Moving systems between original and frozen channels.

use crate::naming::ChannelNaming;
use crate::outcome::{Action, ActionLog, CallOutcome};
use crate::topology::TargetSystem;
use crate::FreezeMode;
use satprep_satellite::ManagementApi;
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

/// Subscribe every system to the frozen (freeze) or original (unfreeze)
/// channels.
pub async fn remap_systems(
    api: &dyn ManagementApi,
    systems: &[TargetSystem],
    naming: &ChannelNaming,
    mode: FreezeMode,
    dry_run: bool,
    log: &mut ActionLog,
) {
    for system in systems {
        let (base, children) = match mode {
            FreezeMode::Freeze => (
                naming.freeze(&system.base),
                system
                    .children
                    .iter()
                    .map(|c| naming.freeze(c))
                    .collect::<Vec<_>>(),
            ),
            FreezeMode::Unfreeze => (system.base.clone(), system.children.clone()),
        };
        remap_one(api, system, base, children, dry_run, log).await;
    }
}

async fn remap_one(
    api: &dyn ManagementApi,
    system: &TargetSystem,
    base: String,
    children: Vec<String>,
    dry_run: bool,
    log: &mut ActionLog,
) {
    let base_action = Action::SetBaseChannel {
        system: system.name.clone(),
        from: system.subscribed_base.clone(),
        to: base.clone(),
    };
    let child_action = Action::SetChildChannels {
        system: system.name.clone(),
        channels: children.clone(),
    };

    if dry_run {
        info!("I'd like to {}", base_action);
        info!("I'd like to {}", child_action);
        log.record(base_action, CallOutcome::Simulated);
        log.record(child_action, CallOutcome::Simulated);
        return;
    }

    let result = api.set_base_channel(system.id, &base).await;
    let outcome = CallOutcome::from_result(&result);
    match &result {
        Ok(_) => info!("Changed base channel of '{}' to '{}'", system.name, base),
        Err(e) => error!(
            "Unable to change base channel of '{}' to '{}': {}",
            system.name, base, e
        ),
    }
    let base_failed = outcome.is_failure();
    log.record(base_action, outcome);

    if base_failed {
        warn!(
            "Not changing child channels of '{}' as its base channel is unchanged",
            system.name
        );
        return;
    }

    let result = api.set_child_channels(system.id, &children).await;
    let took_effect = match &result {
        Err(e) if e.is_fault() => children_applied(api, system, &children).await,
        _ => false,
    };
    let outcome = CallOutcome::from_child_channels_result(&result, took_effect);
    match &outcome {
        CallOutcome::Applied => info!(
            "Changed child channels of '{}' to [{}]",
            system.name,
            children.join(", ")
        ),
        CallOutcome::Benign(fault) => debug!(
            "Ignoring fault on child channel change of '{}': {}",
            system.name, fault
        ),
        CallOutcome::Failed(e) => error!(
            "Unable to change child channels of '{}': {}",
            system.name, e
        ),
        CallOutcome::Simulated => {}
    }
    log.record(child_action, outcome);
}

/// Read back the child subscriptions of `system` and compare them to
/// `requested`.
async fn children_applied(
    api: &dyn ManagementApi,
    system: &TargetSystem,
    requested: &[String],
) -> bool {
    match api.subscribed_child_channels(system.id).await {
        Ok(current) => {
            let current: BTreeSet<&str> = current.iter().map(|c| c.label.as_str()).collect();
            let requested: BTreeSet<&str> = requested.iter().map(String::as_str).collect();
            current == requested
        }
        Err(e) => {
            debug!(
                "Unable to read back child channels of '{}': {}",
                system.name, e
            );
            false
        }
    }
}
