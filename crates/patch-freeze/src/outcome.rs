//! Action log for everything a run changes (or would change) on the server.

use satprep_satellite::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A state-changing call issued by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    CloneChannel {
        original: String,
        clone: String,
        parent: Option<String>,
    },
    DeleteChannel {
        label: String,
    },
    SetBaseChannel {
        system: String,
        from: String,
        to: String,
    },
    SetChildChannels {
        system: String,
        channels: Vec<String>,
    },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CloneChannel {
                original,
                clone,
                parent: Some(parent),
            } => write!(
                f,
                "clone child channel '{}' as '{}' below '{}'",
                original, clone, parent
            ),
            Action::CloneChannel {
                original, clone, ..
            } => write!(f, "clone base channel '{}' as '{}'", original, clone),
            Action::DeleteChannel { label } => write!(f, "delete channel '{}'", label),
            Action::SetBaseChannel { system, from, to } => write!(
                f,
                "remap base channel of '{}' from '{}' to '{}'",
                system, from, to
            ),
            Action::SetChildChannels { system, channels } => write!(
                f,
                "set child channels of '{}' to [{}]",
                system,
                channels.join(", ")
            ),
        }
    }
}

/// How a call ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CallOutcome {
    Applied,
    /// The server raised its known spurious fault on a call that took effect.
    Benign(String),
    Failed(String),
    /// Dry-run; the call was not issued.
    Simulated,
}

impl CallOutcome {
    /// Plain success/failure classification.
    pub fn from_result<T>(result: &ApiResult<T>) -> Self {
        match result {
            Ok(_) => CallOutcome::Applied,
            Err(e) => CallOutcome::Failed(e.to_string()),
        }
    }

    /// Classification for `set_child_channels`.
    ///
    /// Some servers raise a fault on that call even though the subscription
    /// change is applied. A fault counts as success only if `took_effect`
    /// (the subscriptions were read back and match the request); transport
    /// and protocol errors always fail.
    pub fn from_child_channels_result<T>(result: &ApiResult<T>, took_effect: bool) -> Self {
        match result {
            Ok(_) => CallOutcome::Applied,
            Err(e @ ApiError::Fault { .. }) if took_effect => CallOutcome::Benign(e.to_string()),
            Err(e) => CallOutcome::Failed(e.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CallOutcome::Failed(_))
    }
}

/// A single action log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Sequence number in call order.
    pub seq: u64,
    pub action: Action,
    pub outcome: CallOutcome,
}

/// Counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub applied: usize,
    pub benign: usize,
    pub failed: usize,
    pub simulated: usize,
}

/// Ordered log of actions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionLog {
    entries: Vec<ActionRecord>,
    #[serde(skip)]
    next_seq: u64,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: Action, outcome: CallOutcome) {
        self.entries.push(ActionRecord {
            seq: self.next_seq,
            action,
            outcome,
        });
        self.next_seq += 1;
    }

    pub fn entries(&self) -> &[ActionRecord] {
        &self.entries
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.entries.iter().map(|e| &e.action)
    }

    pub fn summary(&self) -> OutcomeSummary {
        let mut summary = OutcomeSummary::default();
        for entry in &self.entries {
            match entry.outcome {
                CallOutcome::Applied => summary.applied += 1,
                CallOutcome::Benign(_) => summary.benign += 1,
                CallOutcome::Failed(_) => summary.failed += 1,
                CallOutcome::Simulated => summary.simulated += 1,
            }
        }
        summary
    }
}
