use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cloud-sync")]
#[command(author = "Cloud Sync Developers")]
#[command(version)]
#[command(about = "Reconcile mailboxes and their delegations into a SCIM directory", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (default: ~/.config/cloud-sync/config.toml)
    #[arg(long, global = true, env = "CLOUD_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch both directories, show the plan and apply it
    Sync(SyncArgs),

    /// Plan offline from snapshot files
    Plan(PlanArgs),

    /// Inspect settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Sync
// ============================================================================

#[derive(Args)]
pub struct SyncArgs {
    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Show the plan without applying it
    #[arg(long)]
    pub dry_run: bool,

    /// Write the fetched snapshots to this directory
    #[arg(long, value_name = "DIR")]
    pub dump: Option<PathBuf>,
}

// ============================================================================
// Plan
// ============================================================================

#[derive(Args)]
pub struct PlanArgs {
    /// Source snapshot (mailboxes with permissions)
    #[arg(long, value_name = "FILE")]
    pub source: PathBuf,

    /// Target snapshot (SCIM users and groups)
    #[arg(long, value_name = "FILE")]
    pub target: PathBuf,

    /// Claimed domain; repeat for several (default: from settings)
    #[arg(long = "claimed-domain", value_name = "DOMAIN")]
    pub claimed_domains: Vec<String>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective settings with secrets redacted
    Show,
}
