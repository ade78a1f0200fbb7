//! Plan display

use colored::Colorize;
use reconcile::{Action, CreateAction, EmailAddress, PlanSummary, UpdateAction};
use std::collections::BTreeSet;
use std::fmt;

/// One line of an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Field {
        name: &'static str,
        old: String,
        new: String,
    },
    Added {
        set: &'static str,
        address: EmailAddress,
    },
    Removed {
        set: &'static str,
        address: EmailAddress,
    },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Field { name, old, new } => write!(f, "{name}: {old} -> {new}"),
            Change::Added { set, address } => write!(f, "+ {set} {address}"),
            Change::Removed { set, address } => write!(f, "- {set} {address}"),
        }
    }
}

/// The changes an update makes to the target account, field by field
pub fn changes(update: &UpdateAction) -> Vec<Change> {
    let account = &update.account;
    let diff = &update.diff;
    let mut changes = Vec::new();

    if let Some(full_name) = &diff.full_name {
        changes.push(Change::Field {
            name: "full_name",
            old: format!("{:?}", account.full_name()),
            new: format!("{full_name:?}"),
        });
    }
    if let Some(is_active) = diff.is_active {
        changes.push(Change::Field {
            name: "active",
            old: account.is_active().to_string(),
            new: is_active.to_string(),
        });
    }
    if let Some(aliases) = &diff.aliases {
        set_changes(&mut changes, "alias", account.aliases(), aliases);
    }
    if let Some(delegations) = &diff.delegations {
        set_changes(&mut changes, "delegation", account.delegations(), delegations);
    }
    changes
}

fn set_changes(
    changes: &mut Vec<Change>,
    set: &'static str,
    old: &BTreeSet<EmailAddress>,
    new: &BTreeSet<EmailAddress>,
) {
    changes.extend(new.difference(old).map(|address| Change::Added {
        set,
        address: address.clone(),
    }));
    changes.extend(old.difference(new).map(|address| Change::Removed {
        set,
        address: address.clone(),
    }));
}

/// `(field, value)` pairs describing an account to be created
pub fn create_details(create: &CreateAction) -> Vec<(&'static str, String)> {
    let account = create.account();
    let join = |set: &BTreeSet<EmailAddress>| {
        if set.is_empty() {
            "-".to_string()
        } else {
            set.iter().map(EmailAddress::as_str).collect::<Vec<_>>().join(", ")
        }
    };

    let mut details = vec![
        ("kind", account.kind().to_string()),
        ("full_name", account.full_name().to_string()),
        ("active", account.is_active().to_string()),
        ("aliases", join(account.aliases())),
        ("delegations", join(account.delegations())),
    ];
    if let Some(key) = create.sso_key() {
        details.push(("sso_key", key.to_string()));
    }
    details
}

/// Print a plan in a user-friendly format
pub fn display_plan(actions: &[Action]) {
    if actions.is_empty() {
        println!();
        println!("  {} Directories are in sync", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Reconciliation Plan".bold()
    );
    println!("│");

    let creates: Vec<&CreateAction> = actions.iter().filter_map(Action::as_create).collect();
    if !creates.is_empty() {
        println!("│ {}", "Create".bold());
        for create in creates {
            println!("│   {} {}", "+".green(), create.account().email_address());
            for (field, value) in create_details(create) {
                println!("│       {:<12} {}", field.dimmed(), value);
            }
        }
        println!("│");
    }

    let updates: Vec<&UpdateAction> = actions.iter().filter_map(Action::as_update).collect();
    if !updates.is_empty() {
        println!("│ {}", "Update".bold());
        for update in updates {
            let marker = if update.is_disable() {
                format!(" {}", "(disable)".red())
            } else {
                String::new()
            };
            println!(
                "│   {} {}{}",
                "~".yellow(),
                update.account.email_address(),
                marker
            );
            for change in changes(update) {
                let line = change.to_string();
                let line = match change {
                    Change::Field { .. } => line.dimmed(),
                    Change::Added { .. } => line.green(),
                    Change::Removed { .. } => line.red(),
                };
                println!("│       {line}");
            }
        }
        println!("│");
    }

    let summary = PlanSummary::from_actions(actions);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} creates, {} updates ({} disables)",
        summary.creates.to_string().green(),
        summary.updates.to_string().yellow(),
        summary.disables.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Print a plan as JSON
pub fn display_json(actions: &[Action]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(actions)?);
    Ok(())
}
