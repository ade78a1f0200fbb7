use anyhow::{Context as AnyhowContext, Result, bail};
use reconcile::{Action, ClaimedDomains, SourceSnapshot, TargetSnapshot};

use crate::Context;
use crate::cli::PlanArgs;
use crate::config::RawSettings;
use crate::engine;
use crate::snapshot::{self, SourceFile, TargetFile};
use crate::ui;

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let source: SourceFile = snapshot::read(&args.source)?;
    let target: TargetFile = snapshot::read(&args.target)?;

    let claimed = if args.claimed_domains.is_empty() {
        RawSettings::load(ctx.config.as_deref())?.claimed()
    } else {
        ClaimedDomains::new(&args.claimed_domains)
    };
    if claimed.is_empty() {
        bail!("No claimed domains: pass --claimed-domain or set claimed_domains");
    }

    let actions = plan_snapshots(&source, &target, &claimed)?;

    if args.json {
        return engine::display_json(&actions);
    }
    if !ctx.quiet {
        ui::header("Offline Plan");
        ui::kv(
            "Source",
            &format!(
                "{} ({})",
                args.source.display(),
                ui::count(source.mailboxes.len(), "mailbox record")
            ),
        );
        ui::kv(
            "Target",
            &format!(
                "{} ({}, {})",
                args.target.display(),
                ui::count(target.users.len(), "user"),
                ui::count(target.groups.len(), "group")
            ),
        );
        ui::kv("Claimed", &claimed.iter().collect::<Vec<_>>().join(", "));
    }
    engine::display_plan(&actions);
    Ok(())
}

/// Build both snapshots and reconcile them
pub fn plan_snapshots(
    source: &SourceFile,
    target: &TargetFile,
    claimed: &ClaimedDomains,
) -> Result<Vec<Action>> {
    let source = SourceSnapshot::from_mailboxes(&source.mailboxes);
    let target = TargetSnapshot::from_resources(&target.users, &target.groups);
    log::info!(
        "Planning {} source accounts against {} target accounts",
        source.accounts.len(),
        target.accounts.len()
    );
    reconcile::reconcile(&source, &target, claimed).context("Could not build a plan")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> SourceFile {
        serde_json::from_value(json!({
            "mailboxes": [
                {
                    "mailbox": {
                        "PrimarySmtpAddress": "alice@acme.com",
                        "DisplayName": "Alice",
                        "EmailAddresses": ["SMTP:alice@acme.com", "smtp:al@acme.org"],
                        "RecipientTypeDetails": "UserMailbox",
                        "AccountDisabled": false,
                        "ExternalDirectoryObjectId": "9f4c7a52-2f0c-4f0e-9a43-5a1c6a0b8d11"
                    },
                    "permissions": []
                },
                {
                    "mailbox": {
                        "PrimarySmtpAddress": "bob@elsewhere.com",
                        "DisplayName": "Bob",
                        "EmailAddresses": ["SMTP:bob@elsewhere.com"],
                        "RecipientTypeDetails": "UserMailbox",
                        "AccountDisabled": false,
                        "ExternalDirectoryObjectId": "0e7d1c55-3a5b-4d27-b8d0-0f1e2d3c4b5a"
                    },
                    "permissions": []
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_plan_snapshots_prunes_unclaimed() {
        let actions =
            plan_snapshots(&source(), &TargetFile::default(), &ClaimedDomains::new(["acme.com"]))
                .unwrap();

        assert_eq!(actions.len(), 1);
        let create = actions[0].as_create().unwrap();
        assert_eq!(create.account().email_address().as_str(), "alice@acme.com");
        // the alias on the unclaimed domain is gone as well
        assert!(create.account().aliases().is_empty());
    }

    #[test]
    fn test_plan_snapshots_json_shape() {
        let actions =
            plan_snapshots(&source(), &TargetFile::default(), &ClaimedDomains::new(["acme.com"]))
                .unwrap();
        let value = serde_json::to_value(&actions).unwrap();

        assert_eq!(value[0]["action"], "create");
    }
}
