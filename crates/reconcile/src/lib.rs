//! # Reconcile
//!
//! Pure reconciliation of a mailbox directory (the source of truth) against
//! a SCIM identity directory (the target).
//!
//! Nothing in this crate performs I/O. Callers fetch raw records, hand them
//! in, and get back an ordered list of actions to apply.
//!
//! ## Pipeline
//!
//! - **Ingestion**: raw mailbox and SCIM records become [`Account`] values
//!   ([`SourceSnapshot`], [`TargetSnapshot`])
//! - **Delegation**: shared mailboxes are flattened away so each account
//!   carries its effective delegates ([`DelegationGraph`])
//! - **Pruning**: dangling delegations and addresses on unclaimed domains are
//!   dropped ([`prune`])
//! - **Diffing**: a sparse per-field [`Diff`] between the two sides
//! - **Planning**: creates first, then updates ([`plan`])
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{ClaimedDomains, SourceSnapshot, TargetSnapshot, reconcile};
//!
//! let source = SourceSnapshot::from_mailboxes(&mailboxes);
//! let target = TargetSnapshot::from_resources(&users, &groups);
//! let claimed = ClaimedDomains::new(["acme.com"]);
//!
//! for action in reconcile(&source, &target, &claimed)? {
//!     println!("{}", action.email_address());
//! }
//! ```
//!
//! ## Errors
//!
//! Data-quality problems (delegation cycles, unknown delegates, unclaimed
//! domains, kind mismatches, malformed records) are logged and skipped.
//! Only structural violations are returned as [`Error`].

pub mod account;
pub mod action;
pub mod delegation;
pub mod diff;
pub mod error;
pub mod planner;
pub mod prune;
pub mod source;
pub mod target;

// Re-export main types at crate root
pub use account::{Account, AccountKind, EmailAddress};
pub use action::{Action, CreateAction, PlanSummary, SsoKey, UpdateAction};
pub use delegation::{DelegationGraph, MAX_DEPTH};
pub use diff::Diff;
pub use error::{Error, Result};
pub use planner::plan;
pub use prune::{ClaimedDomains, prune};
pub use source::{MailboxWithPermissions, SourceSnapshot, SsoKeys};
pub use target::{ScimGroup, ScimUser, TargetIds, TargetSnapshot};

/// Prune the source accounts and plan against the target
pub fn reconcile(
    source: &SourceSnapshot,
    target: &TargetSnapshot,
    claimed: &ClaimedDomains,
) -> Result<Vec<Action>> {
    let accounts = prune(&source.accounts, claimed);
    plan(&accounts, &target.accounts, &source.sso_keys)
}
