//! Patch freeze workflow.
//!
//! Freezing clones the software channels of a set of systems under a dated
//! label and moves the systems onto the clones, so that later upstream
//! updates do not reach them. Unfreezing moves the systems back and removes
//! the clones.

pub mod channels;
pub mod inventory;
pub mod naming;
pub mod outcome;
pub mod remap;
pub mod topology;

pub use inventory::{resolve_targets, TargetSelection};
pub use naming::{normalize_label, ChannelNaming, DEFAULT_LABEL};
pub use outcome::{Action, ActionLog, ActionRecord, CallOutcome, OutcomeSummary};
pub use topology::{discover, ChannelTopology, Discovery, DiscoveryOptions, TargetSystem};

use satprep_common::{FreezeDate, Result};
use satprep_satellite::ManagementApi;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info};

/// Direction of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreezeMode {
    Freeze,
    Unfreeze,
}

impl fmt::Display for FreezeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreezeMode::Freeze => write!(f, "freeze"),
            FreezeMode::Unfreeze => write!(f, "unfreeze"),
        }
    }
}

/// Settings of one patch freeze run.
#[derive(Debug, Clone)]
pub struct FreezeConfig {
    pub selection: TargetSelection,
    pub label: String,
    pub date: FreezeDate,
    pub mode: FreezeMode,
    pub dry_run: bool,
    /// Move systems between original and frozen channels.
    pub remap: bool,
    pub all_subchannels: bool,
    pub require_base_channel: bool,
}

impl Default for FreezeConfig {
    fn default() -> Self {
        Self {
            selection: TargetSelection::default(),
            label: DEFAULT_LABEL.to_string(),
            date: FreezeDate::today(),
            mode: FreezeMode::Freeze,
            dry_run: false,
            remap: true,
            all_subchannels: false,
            require_base_channel: true,
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreezeReport {
    pub mode: FreezeMode,
    pub label: String,
    pub date: FreezeDate,
    pub dry_run: bool,
    pub systems: Vec<TargetSystem>,
    pub topology: ChannelTopology,
    pub actions: ActionLog,
    pub summary: OutcomeSummary,
}

impl FreezeReport {
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }
}

/// A validated patch freeze run.
#[derive(Debug, Clone)]
pub struct PatchFreeze {
    config: FreezeConfig,
    naming: ChannelNaming,
}

impl PatchFreeze {
    /// Validate `config`; fails before any remote call is made.
    pub fn new(config: FreezeConfig) -> Result<Self> {
        config.selection.validate()?;
        let naming = ChannelNaming::new(&config.label, config.date.clone())?;
        Ok(Self { config, naming })
    }

    pub fn config(&self) -> &FreezeConfig {
        &self.config
    }

    pub fn naming(&self) -> &ChannelNaming {
        &self.naming
    }

    /// Resolve targets, discover channels and apply the freeze or unfreeze.
    pub async fn run(&self, api: &dyn ManagementApi) -> Result<FreezeReport> {
        let config = &self.config;
        let targets = resolve_targets(api, &config.selection).await?;

        let options = DiscoveryOptions {
            all_subchannels: config.all_subchannels,
            require_base_channel: config.require_base_channel,
        };
        let discovery = discover(api, &targets, &self.naming, &options).await?;
        info!(
            "{} {} system(s), {} channel(s) using prefix '{}'",
            if config.dry_run { "Would process" } else { "Processing" },
            discovery.systems.len(),
            discovery.topology.channel_count(),
            self.naming.prefix()
        );

        let mut log = ActionLog::new();
        match config.mode {
            FreezeMode::Freeze => {
                channels::clone_channels(
                    api,
                    &discovery.topology,
                    &self.naming,
                    config.dry_run,
                    &mut log,
                )
                .await;
                self.remap(api, &discovery, &mut log).await;
            }
            FreezeMode::Unfreeze => {
                self.remap(api, &discovery, &mut log).await;
                channels::delete_channels(
                    api,
                    &discovery.topology,
                    &self.naming,
                    config.dry_run,
                    &mut log,
                )
                .await;
            }
        }

        let summary = log.summary();
        if summary.failed > 0 {
            error!(
                "{} finished with {} failed call(s) ({} applied, {} ignored faults)",
                config.mode, summary.failed, summary.applied, summary.benign
            );
        } else {
            info!(
                "{} finished: {} applied, {} ignored faults, {} simulated",
                config.mode, summary.applied, summary.benign, summary.simulated
            );
        }

        Ok(FreezeReport {
            mode: config.mode,
            label: self.naming.label().to_string(),
            date: self.naming.date().clone(),
            dry_run: config.dry_run,
            systems: discovery.systems,
            topology: discovery.topology,
            actions: log,
            summary,
        })
    }

    async fn remap(&self, api: &dyn ManagementApi, discovery: &Discovery, log: &mut ActionLog) {
        if !self.config.remap {
            info!("Not remapping system channels");
            return;
        }
        remap::remap_systems(
            api,
            &discovery.systems,
            &self.naming,
            self.config.mode,
            self.config.dry_run,
            log,
        )
        .await;
    }
}
