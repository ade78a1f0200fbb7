//! Applies a reconciliation plan to the target directory

use anyhow::Result;
use colored::Colorize;
use connectors::{GroupRequest, TargetDirectory, UserRequest};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use reconcile::target::MemberRef;
use reconcile::{Action, CreateAction, EmailAddress, TargetIds, UpdateAction};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Summary of apply results
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    /// Updates for accounts the target has no id for
    pub skipped: usize,
}

impl ApplySummary {
    pub fn total_changes(&self) -> usize {
        self.created + self.updated
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Apply `actions` to `target`.
///
/// User creates run first so that group creates can reference the new user
/// ids; every new id is added to `ids`. Updates follow, one at a time. A
/// failed call is logged and counted and does not stop the run.
pub fn apply(
    target: &dyn TargetDirectory,
    actions: &[Action],
    ids: &mut TargetIds,
    show_progress: bool,
) -> ApplySummary {
    let pb = progress_bar(actions.len(), show_progress);
    let mut summary = ApplySummary::default();

    let (groups, users): (Vec<&CreateAction>, Vec<&CreateAction>) = actions
        .iter()
        .filter_map(Action::as_create)
        .partition(|create| create.account().is_functional());

    for create in users.into_iter().chain(groups) {
        let address = create.account().email_address();
        pb.set_message(address.to_string());

        match create_one(target, create, ids) {
            Ok(id) => {
                debug!("Created {address} as {id}");
                ids.insert(address.clone(), id);
                summary.created += 1;
            }
            Err(e) => {
                report("create", address, &e);
                summary.failed += 1;
            }
        }
        pb.inc(1);
    }

    for update in actions.iter().filter_map(Action::as_update) {
        let address = update.account.email_address();
        pb.set_message(address.to_string());

        let Some(&id) = ids.get(address) else {
            warn!("Skipping update of {address}: no target id");
            summary.skipped += 1;
            pb.inc(1);
            continue;
        };

        match update_one(target, id, update, ids) {
            Ok(()) => summary.updated += 1,
            Err(e) => {
                report("update", address, &e);
                summary.failed += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    summary
}

fn report(verb: &str, address: &EmailAddress, e: &connectors::Error) {
    let category = e.category();
    error!("Failed to {verb} {address}: {e}");
    info!("{category}: {}", category.advice());
}

fn create_one(
    target: &dyn TargetDirectory,
    create: &CreateAction,
    ids: &TargetIds,
) -> connectors::Result<Uuid> {
    let account = create.account();
    if account.is_functional() {
        let members = member_refs(account.delegations(), ids);
        target.create_group(&GroupRequest::create(account, members))
    } else {
        target.create_user(&UserRequest::create(create))
    }
}

fn update_one(
    target: &dyn TargetDirectory,
    id: Uuid,
    update: &UpdateAction,
    ids: &TargetIds,
) -> connectors::Result<()> {
    let diff = &update.diff;
    if !update.account.is_functional() {
        return target.replace_user(id, &UserRequest::update(diff));
    }

    let members = diff
        .delegations
        .as_ref()
        .map(|delegations| member_refs(delegations, ids));
    target.replace_group(id, &GroupRequest::update(diff, members))?;

    // an empty member list is ignored by the target
    if diff.clears_delegations() {
        target.remove_all_members(id)?;
    }
    Ok(())
}

/// Target ids of `delegations`; addresses without an id are dropped.
fn member_refs(delegations: &BTreeSet<EmailAddress>, ids: &TargetIds) -> Vec<MemberRef> {
    delegations
        .iter()
        .filter_map(|address| match ids.get(address) {
            Some(&value) => Some(MemberRef { value }),
            None => {
                warn!("Dropping member {address}: no target id");
                None
            }
        })
        .collect()
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

/// Ask the user to confirm
pub fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Apply these changes?")
        .default(false)
        .interact()?;

    Ok(confirmed)
}

pub fn print_summary(summary: &ApplySummary) {
    println!();
    if summary.is_success() {
        println!(
            "  {} Target directory updated ({} changes)",
            "✓".green().bold(),
            summary.total_changes()
        );
    } else {
        println!("  {} Target directory updated with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} accounts created", summary.created);
    }
    if summary.updated > 0 {
        println!("    • {} accounts updated", summary.updated);
    }
    if summary.skipped > 0 {
        println!("    • {} accounts skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "actions".red());
    }
}
