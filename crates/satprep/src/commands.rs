//! Subcommand runners.

use crate::OutputFormat;
use anyhow::{bail, Context, Result};
use satprep_common::Credentials;
use satprep_custominfo::{InstallConfig, InstallReport, KeyStatus};
use satprep_patch_freeze::{CallOutcome, FreezeConfig, FreezeReport, PatchFreeze};
use satprep_satellite::{check_api_level, ConnectionConfig, SatelliteClient};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Log in and verify the API level of the server.
async fn connect(connection: &ConnectionConfig, auth_file: Option<&Path>) -> Result<SatelliteClient> {
    let credentials = Credentials::resolve(auth_file).context("Unable to read credentials")?;
    let client = SatelliteClient::login(connection, &credentials)
        .await
        .with_context(|| format!("Unable to log in to {}", connection.endpoint()))?;

    if let Err(e) = check_api_level(&client).await {
        client.logout().await;
        return Err(e.into());
    }
    Ok(client)
}

pub async fn patch_freeze(
    connection: &ConnectionConfig,
    auth_file: Option<&Path>,
    config: FreezeConfig,
    format: OutputFormat,
) -> Result<()> {
    // Validate before asking for credentials.
    let freeze = PatchFreeze::new(config)?;
    info!(
        "Starting {} of channels labelled '{}'",
        freeze.config().mode,
        freeze.naming().prefix()
    );

    let client = connect(connection, auth_file).await?;
    let result = freeze.run(&client).await;
    client.logout().await;
    let report = result?;

    print_freeze_report(&report, format)?;
    if report.has_failures() {
        bail!(
            "{} of {} call(s) failed",
            report.summary.failed,
            report.actions.entries().len()
        );
    }
    Ok(())
}

pub async fn install_custominfos(
    connection: &ConnectionConfig,
    auth_file: Option<&Path>,
    config: InstallConfig,
    format: OutputFormat,
) -> Result<()> {
    let report = if config.dry_run {
        satprep_custominfo::preview(&config)
    } else {
        let client = connect(connection, auth_file).await?;
        let result = satprep_custominfo::run(&client, &config).await;
        client.logout().await;
        result?
    };

    print_install_report(&report, format)?;
    if report.has_failures() {
        bail!("Not all custom information keys could be changed");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

fn print_freeze_report(report: &FreezeReport, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }

    println!(
        "{} '{}-{}' on {} system(s){}",
        report.mode,
        report.label,
        report.date,
        report.systems.len(),
        if report.dry_run { " (dry run)" } else { "" }
    );
    for entry in report.actions.entries() {
        let status = match &entry.outcome {
            CallOutcome::Applied => "ok".to_string(),
            CallOutcome::Benign(_) => "ok (fault ignored)".to_string(),
            CallOutcome::Failed(e) => format!("FAILED: {}", e),
            CallOutcome::Simulated => "skipped".to_string(),
        };
        println!("  {:>3}. {} [{}]", entry.seq + 1, entry.action, status);
    }
    let s = report.summary;
    println!(
        "{} applied, {} ignored faults, {} failed, {} simulated",
        s.applied, s.benign, s.failed, s.simulated
    );
    Ok(())
}

fn print_install_report(report: &InstallReport, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }

    for key in &report.keys {
        let status = match &key.status {
            KeyStatus::Created => "created".to_string(),
            KeyStatus::Updated => "updated".to_string(),
            KeyStatus::Skipped => "exists, skipped".to_string(),
            KeyStatus::Removed => "removed".to_string(),
            KeyStatus::Missing => "not removed".to_string(),
            KeyStatus::Failed(e) => format!("FAILED: {}", e),
            KeyStatus::Simulated => "dry run".to_string(),
        };
        println!("  {} [{}]", key.label, status);
    }
    Ok(())
}
