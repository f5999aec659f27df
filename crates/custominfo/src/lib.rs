//! Installer for the custom system information keys satprep reports read.
//!
//! The keys only need to be created once per server, e.g. before the first
//! use or after a reinstallation.

pub mod keys;

pub use keys::{KeyDefinition, CUSTOM_KEYS};

use satprep_common::{Error, Result};
use satprep_satellite::{ApiResult, ManagementApi};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

/// Settings of one installer run.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallConfig {
    pub dry_run: bool,
    /// Overwrite the description of keys that already exist.
    pub force: bool,
    pub uninstall: bool,
}

/// What happened to one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum KeyStatus {
    Created,
    Updated,
    /// Already defined and not forced.
    Skipped,
    Removed,
    /// Uninstall found no such key.
    Missing,
    Failed(String),
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOutcome {
    pub label: String,
    #[serde(flatten)]
    pub status: KeyStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallReport {
    pub uninstall: bool,
    pub dry_run: bool,
    pub keys: Vec<KeyOutcome>,
}

impl InstallReport {
    fn push(&mut self, label: &str, status: KeyStatus) {
        self.keys.push(KeyOutcome {
            label: label.to_string(),
            status,
        });
    }

    pub fn count(&self, status: &KeyStatus) -> usize {
        self.keys.iter().filter(|k| &k.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.keys
            .iter()
            .any(|k| matches!(k.status, KeyStatus::Failed(_)))
    }
}

/// Describe what a run would do without contacting the server.
pub fn preview(config: &InstallConfig) -> InstallReport {
    let verb = if config.uninstall { "uninstall" } else { "create" };
    let mut report = InstallReport {
        uninstall: config.uninstall,
        dry_run: true,
        keys: Vec::new(),
    };
    for key in CUSTOM_KEYS {
        info!(
            "I'd like to {} system information key '{}' ({})",
            verb, key.label, key.description
        );
        report.push(key.label, KeyStatus::Simulated);
    }
    report
}

/// Install or uninstall the custom info keys.
pub async fn run(api: &dyn ManagementApi, config: &InstallConfig) -> Result<InstallReport> {
    if config.dry_run {
        return Ok(preview(config));
    }
    if config.uninstall {
        info!("Removing system information keys used by satprep");
        Ok(uninstall_keys(api).await)
    } else {
        install_keys(api, config.force).await
    }
}

/// Create every missing key; existing keys are updated only with `force`.
pub async fn install_keys(api: &dyn ManagementApi, force: bool) -> Result<InstallReport> {
    let defined: BTreeSet<String> = api
        .list_custom_info_keys()
        .await
        .map_err(|e| Error::Other(format!("unable to list custom info keys: {}", e)))?
        .into_iter()
        .map(|k| k.label)
        .collect();
    debug!("Defined custom info keys: {:?}", defined);

    let mut report = InstallReport::default();
    for key in CUSTOM_KEYS {
        let status = if defined.contains(key.label) {
            if !force {
                warn!(
                    "Key '{}' already exists, use --force to overwrite it",
                    key.label
                );
                KeyStatus::Skipped
            } else {
                info!("Overwriting existing key '{}'", key.label);
                let result = api.update_custom_info_key(key.label, key.description).await;
                classify(key.label, result, KeyStatus::Updated)
            }
        } else {
            debug!("Adding key '{}' ({})", key.label, key.description);
            let result = api.create_custom_info_key(key.label, key.description).await;
            classify(key.label, result, KeyStatus::Created)
        };
        report.push(key.label, status);
    }
    Ok(report)
}

/// Delete every key satprep defines.
pub async fn uninstall_keys(api: &dyn ManagementApi) -> InstallReport {
    let mut report = InstallReport {
        uninstall: true,
        ..Default::default()
    };
    for key in CUSTOM_KEYS {
        debug!("Removing key '{}'", key.label);
        let status = match api.delete_custom_info_key(key.label).await {
            Ok(1) => {
                info!("Removed system information key '{}'", key.label);
                KeyStatus::Removed
            }
            Ok(_) => {
                warn!(
                    "Unable to remove key '{}': check your account permissions",
                    key.label
                );
                KeyStatus::Missing
            }
            Err(e) => {
                error!("Unable to remove key '{}': {}", key.label, e);
                KeyStatus::Failed(e.to_string())
            }
        };
        report.push(key.label, status);
    }
    report
}

fn classify(label: &str, result: ApiResult<i64>, success: KeyStatus) -> KeyStatus {
    let (done, verb) = match success {
        KeyStatus::Updated => ("Updated", "update"),
        _ => ("Created", "create"),
    };
    match result {
        Ok(1) => {
            info!("{} system information key '{}'", done, label);
            success
        }
        Ok(code) => {
            warn!(
                "Unable to {} key '{}': check your account permissions",
                verb, label
            );
            KeyStatus::Failed(format!("result code {}", code))
        }
        Err(e) => {
            error!("Unable to {} key '{}': {}", verb, label, e);
            KeyStatus::Failed(e.to_string())
        }
    }
}
