use anyhow::{Context as AnyhowContext, Result, bail};
use connectors::{ExchangeClient, ScimClient, SourceDirectory, TargetDirectory};
use reconcile::{ClaimedDomains, SourceSnapshot, TargetSnapshot};
use std::path::PathBuf;

use crate::Context;
use crate::cli::SyncArgs;
use crate::config::Settings;
use crate::engine::{self, ApplySummary};
use crate::snapshot::{self, SourceFile, TargetFile};
use crate::ui;

/// Options for a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Skip the confirmation prompt
    pub yes: bool,
    /// Stop after showing the plan
    pub dry_run: bool,
    /// Write the fetched snapshots here
    pub dump: Option<PathBuf>,
    pub quiet: bool,
}

pub fn run(ctx: &Context, args: SyncArgs) -> Result<()> {
    let settings = Settings::load(ctx.config.as_deref())?;

    let token = connectors::auth::resolve_access_token(settings.access_token.as_deref())
        .context("Could not obtain an access token for the mailbox directory")?;
    let source = ExchangeClient::new(&settings.source_url, token)?
        .with_batch_size(settings.permission_batch_size)
        .with_limit(settings.mailbox_limit);
    let target = ScimClient::new(&settings.api_url, &settings.api_key)?;

    let opts = SyncOptions {
        yes: args.yes,
        dry_run: args.dry_run,
        dump: args.dump,
        quiet: ctx.quiet,
    };
    let summary = sync(&source, &target, &settings.claimed_domains, &opts)?;

    if !summary.is_success() {
        bail!("{} failed", ui::count(summary.failed, "action"));
    }
    Ok(())
}

/// Fetch both directories, reconcile them and apply the plan.
pub fn sync(
    source: &dyn SourceDirectory,
    target: &dyn TargetDirectory,
    claimed: &ClaimedDomains,
    opts: &SyncOptions,
) -> Result<ApplySummary> {
    if !opts.quiet {
        ui::info("Fetching mailboxes and permissions...");
    }
    let mailboxes = source
        .fetch_mailboxes()
        .context("Could not fetch the source directory")?;

    if !opts.quiet {
        ui::info("Fetching SCIM users and groups...");
    }
    let users = target
        .list_users()
        .context("Could not list target users")?;
    let groups = target
        .list_groups()
        .context("Could not list target groups")?;

    let source_file = SourceFile { mailboxes };
    let target_file = TargetFile { users, groups };
    if let Some(dir) = &opts.dump {
        let (source_path, target_path) = snapshot::dump(dir, &source_file, &target_file)?;
        ui::success(&format!(
            "Wrote {} and {}",
            source_path.display(),
            target_path.display()
        ));
    }

    let source_snapshot = SourceSnapshot::from_mailboxes(&source_file.mailboxes);
    let mut target_snapshot =
        TargetSnapshot::from_resources(&target_file.users, &target_file.groups);
    let actions = reconcile::reconcile(&source_snapshot, &target_snapshot, claimed)
        .context("Could not build a plan")?;

    if !opts.quiet {
        engine::display_plan(&actions);
    }
    if actions.is_empty() {
        return Ok(ApplySummary::default());
    }

    if opts.dry_run {
        println!();
        ui::info("Dry run; nothing applied");
        return Ok(ApplySummary::default());
    }

    if !opts.yes && !engine::confirm_proceed()? {
        println!();
        ui::warn("Aborted");
        return Ok(ApplySummary::default());
    }

    let summary = engine::apply(target, &actions, &mut target_snapshot.ids, !opts.quiet);
    if !opts.quiet {
        engine::print_summary(&summary);
    }
    Ok(summary)
}
