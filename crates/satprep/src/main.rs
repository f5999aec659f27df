//! satprep - freeze software channels for patch maintenance.

mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use satprep_common::FreezeDate;
use satprep_patch_freeze::{FreezeConfig, FreezeMode, TargetSelection, DEFAULT_LABEL};
use satprep_satellite::ConnectionConfig;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "satprep")]
#[command(
    author,
    version,
    about = "Freeze and unfreeze software channels on Spacewalk, Red Hat Satellite and SUSE Manager",
    long_about = "Freeze and unfreeze software channels on Spacewalk, Red Hat Satellite and SUSE Manager.\n\n\
Login credentials are read from an auth file (mode 0600, first line username, \
second line password), from the SATELLITE_LOGIN and SATELLITE_PASSWORD \
environment variables, or prompted for."
)]
struct Cli {
    /// Enable debugging output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Management server to use
    #[arg(short, long, global = true, default_value = "localhost")]
    server: String,

    /// Auth file to read credentials from
    #[arg(short, long, global = true, value_name = "FILE")]
    authfile: Option<PathBuf>,

    /// Talk to the server over HTTPS
    #[arg(long, global = true)]
    https: bool,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value = "300")]
    timeout: u64,

    /// Output format of the run report
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone channels of systems and pin the systems to the clones
    PatchFreeze(PatchFreezeArgs),

    /// Create the custom system information keys satprep uses
    InstallCustominfos(CustominfoArgs),
}

#[derive(Args, Debug)]
struct PatchFreezeArgs {
    /// Systems to freeze (comma separated or repeated)
    #[arg(short = 'S', long = "system", value_delimiter = ',')]
    systems: Vec<String>,

    /// System groups to freeze (comma separated or repeated)
    #[arg(short = 'g', long = "group", value_delimiter = ',')]
    groups: Vec<String>,

    /// Systems to leave alone (comma separated or repeated)
    #[arg(short = 'e', long = "exclude", value_delimiter = ',')]
    exclude: Vec<String>,

    /// Label of the frozen channels
    #[arg(short, long, default_value = DEFAULT_LABEL)]
    label: String,

    /// Date of the frozen channels (default: today)
    #[arg(short = 'D', long)]
    date: Option<FreezeDate>,

    /// Only show what would be done
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Move systems back to the original channels and remove the clones
    #[arg(short, long)]
    unfreeze: bool,

    /// Do not change the channel subscriptions of the systems
    #[arg(short = 'i', long)]
    no_remap: bool,

    /// Also clone child channels the systems are not subscribed to
    #[arg(short = 'A', long)]
    all_subchannels: bool,

    /// Do not treat systems without base channel as errors
    #[arg(long)]
    skip_base_check: bool,
}

impl PatchFreezeArgs {
    fn into_config(self) -> FreezeConfig {
        FreezeConfig {
            selection: TargetSelection {
                systems: self.systems,
                groups: self.groups,
                exclude: self.exclude,
            },
            label: self.label,
            date: self.date.unwrap_or_else(FreezeDate::today),
            mode: if self.unfreeze {
                FreezeMode::Unfreeze
            } else {
                FreezeMode::Freeze
            },
            dry_run: self.dry_run,
            remap: !self.no_remap,
            all_subchannels: self.all_subchannels,
            require_base_channel: !self.skip_base_check,
        }
    }
}

#[derive(Args, Debug)]
struct CustominfoArgs {
    /// Only show which keys would be changed
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Overwrite existing keys
    #[arg(short, long)]
    force: bool,

    /// Remove the keys again
    #[arg(short, long)]
    uninstall: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let connection = ConnectionConfig {
        server: cli.server,
        https: cli.https,
        timeout_seconds: cli.timeout,
    };

    match cli.command {
        Commands::PatchFreeze(args) => {
            commands::patch_freeze(
                &connection,
                cli.authfile.as_deref(),
                args.into_config(),
                cli.format,
            )
            .await?;
        }

        Commands::InstallCustominfos(args) => {
            let config = satprep_custominfo::InstallConfig {
                dry_run: args.dry_run,
                force: args.force,
                uninstall: args.uninstall,
            };
            commands::install_custominfos(
                &connection,
                cli.authfile.as_deref(),
                config,
                cli.format,
            )
            .await?;
        }
    }

    Ok(())
}
