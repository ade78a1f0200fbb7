//! Field-level diff between a target account and its source counterpart

use crate::account::{Account, AccountKind, EmailAddress};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sparse overlay on an existing account.
///
/// `None` means "leave as is". `Some(empty set)` for `delegations` means
/// "remove every member", which the applier has to handle with a dedicated
/// call, so the two must never be folded together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<BTreeSet<EmailAddress>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegations: Option<BTreeSet<EmailAddress>>,
}

impl Diff {
    /// Identity diff: nothing to update
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.is_active.is_none()
            && self.aliases.is_none()
            && self.delegations.is_none()
    }

    /// Deactivate a user account
    pub fn disable_user() -> Self {
        Self {
            is_active: Some(false),
            ..Self::default()
        }
    }

    /// Deactivate a functional account.
    ///
    /// The target ignores `is_active` for groups; a group counts as active
    /// while it has members, so the members are cleared as well.
    pub fn disable_functional() -> Self {
        Self {
            is_active: Some(false),
            delegations: Some(BTreeSet::new()),
            ..Self::default()
        }
    }

    /// True when the diff asks for every delegation to be removed
    pub fn clears_delegations(&self) -> bool {
        self.delegations.as_ref().is_some_and(BTreeSet::is_empty)
    }

    /// Number of fields that are set
    pub fn len(&self) -> usize {
        usize::from(self.full_name.is_some())
            + usize::from(self.is_active.is_some())
            + usize::from(self.aliases.is_some())
            + usize::from(self.delegations.is_some())
    }
}

/// Compute the changes needed to turn `old` (target) into `new` (source).
///
/// Both accounts must share the same address.
pub fn compute(old: &Account, new: &Account) -> Result<Diff> {
    if old.email_address() != new.email_address() {
        return Err(Error::AddressMismatch {
            old: old.email_address().to_string(),
            new: new.email_address().to_string(),
        });
    }

    if old.kind() == AccountKind::Functional
        && new.kind() == AccountKind::Functional
        && old.is_active()
        && !new.is_active()
    {
        return Ok(Diff::disable_functional());
    }

    Ok(Diff {
        full_name: (old.full_name() != new.full_name()).then(|| new.full_name().to_string()),
        is_active: (old.is_active() != new.is_active()).then_some(new.is_active()),
        aliases: (old.aliases() != new.aliases()).then(|| new.aliases().clone()),
        delegations: (old.delegations() != new.delegations()).then(|| new.delegations().clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(s: &str) -> EmailAddress {
        EmailAddress::parse(s).unwrap()
    }

    fn user(address: &str) -> Account {
        Account::new(email(address), "Someone", AccountKind::User)
    }

    fn group(address: &str) -> Account {
        Account::new(email(address), "Shared", AccountKind::Functional)
    }

    #[test]
    fn test_same_account_is_identity() {
        let account = user("a@acme.com")
            .with_aliases([email("a2@acme.com")])
            .with_delegations([email("b@acme.com")]);
        let diff = compute(&account, &account).unwrap();
        assert!(diff.is_empty());
        assert_eq!(diff, Diff::default());
    }

    #[test]
    fn test_single_field_changes() {
        let base = user("a@acme.com");

        let diff = compute(&base, &base.clone().with_full_name("Other")).unwrap();
        assert_eq!(diff.full_name.as_deref(), Some("Other"));
        assert_eq!(diff.len(), 1);

        let diff = compute(&base, &base.clone().with_active(false)).unwrap();
        assert_eq!(diff.is_active, Some(false));
        assert_eq!(diff.len(), 1);

        let aliases = [email("alias@acme.com")];
        let diff = compute(&base, &base.clone().with_aliases(aliases.clone())).unwrap();
        assert_eq!(diff.aliases, Some(aliases.into_iter().collect()));
        assert_eq!(diff.len(), 1);

        let delegates = [email("d@acme.com")];
        let diff = compute(&base, &base.clone().with_delegations(delegates.clone())).unwrap();
        assert_eq!(diff.delegations, Some(delegates.into_iter().collect()));
        assert_eq!(diff.len(), 1);
    }

    #[test]
    fn test_address_mismatch_is_error() {
        let result = compute(&user("a@acme.com"), &user("b@acme.com"));
        assert!(matches!(result, Err(Error::AddressMismatch { .. })));
    }

    #[test]
    fn test_disabling_functional_clears_delegations() {
        let old = group("shared@acme.com").with_delegations([email("x@acme.com")]);
        let new = old.clone().with_active(false).with_full_name("Renamed");

        let diff = compute(&old, &new).unwrap();
        assert_eq!(diff, Diff::disable_functional());
        assert_eq!(diff.is_active, Some(false));
        assert!(diff.clears_delegations());
        // short-circuits the per-field comparison
        assert!(diff.full_name.is_none());
    }

    #[test]
    fn test_disabling_user_keeps_generic_rule() {
        let old = user("a@acme.com").with_delegations([email("x@acme.com")]);
        let new = old.clone().with_active(false);

        let diff = compute(&old, &new).unwrap();
        assert_eq!(diff, Diff::disable_user());
        assert!(!diff.clears_delegations());
    }

    #[test]
    fn test_empty_delegations_differ_from_unset() {
        let old = group("shared@acme.com").with_delegations([email("x@acme.com")]);
        let new = old.clone().with_delegations([]);

        let diff = compute(&old, &new).unwrap();
        assert_eq!(diff.delegations, Some(BTreeSet::new()));
        assert!(diff.clears_delegations());
        assert!(!Diff::default().clears_delegations());
    }

    #[test]
    fn test_reactivating_functional_uses_generic_rule() {
        let old = group("shared@acme.com").with_active(false);
        let new = group("shared@acme.com").with_delegations([email("x@acme.com")]);

        let diff = compute(&old, &new).unwrap();
        assert_eq!(diff.is_active, Some(true));
        assert_eq!(diff.delegations.map(|d| d.len()), Some(1));
    }
}
