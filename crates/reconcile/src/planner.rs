//! Action planner - turns two account lists into an ordered action list

use crate::account::{Account, EmailAddress};
use crate::action::{Action, CreateAction, UpdateAction};
use crate::diff::{self, Diff};
use crate::error::Result;
use crate::source::SsoKeys;
use log::{debug, warn};
use std::collections::HashMap;

/// Plan the actions that bring `target` in line with `source`.
///
/// Creates come first, in source order, followed by updates in target
/// order: disables for accounts gone from the source, then field updates for
/// accounts present on both sides. Accounts whose kind differs between the
/// two directories are skipped with a warning.
///
/// Fails only on structural errors, such as a user account to create that
/// has no SSO key.
pub fn plan(source: &[Account], target: &[Account], sso_keys: &SsoKeys) -> Result<Vec<Action>> {
    let source_index = index(source);
    let target_index = index(target);

    let mut actions = creates(source, &target_index, sso_keys)?;
    actions.extend(disables(target, &source_index));
    actions.extend(updates(target, &source_index)?);

    debug!(
        "Planned {} actions from {} source and {} target accounts",
        actions.len(),
        source.len(),
        target.len()
    );
    Ok(actions)
}

fn index(accounts: &[Account]) -> HashMap<&EmailAddress, &Account> {
    accounts.iter().map(|a| (a.email_address(), a)).collect()
}

fn creates(
    source: &[Account],
    target: &HashMap<&EmailAddress, &Account>,
    sso_keys: &SsoKeys,
) -> Result<Vec<Action>> {
    source
        .iter()
        .filter(|account| !target.contains_key(account.email_address()))
        .map(|account| {
            let sso_key = if account.is_functional() {
                None
            } else {
                sso_keys.get(account.email_address()).copied()
            };
            CreateAction::new(account.clone(), sso_key).map(Action::Create)
        })
        .collect()
}

fn disables(target: &[Account], source: &HashMap<&EmailAddress, &Account>) -> Vec<Action> {
    target
        .iter()
        .filter(|account| !source.contains_key(account.email_address()))
        .filter(|account| account.is_active())
        .map(|account| {
            let diff = if account.is_functional() {
                Diff::disable_functional()
            } else {
                Diff::disable_user()
            };
            Action::Update(UpdateAction::new(account.clone(), diff))
        })
        .collect()
}

fn updates(target: &[Account], source: &HashMap<&EmailAddress, &Account>) -> Result<Vec<Action>> {
    let mut actions = Vec::new();

    for old in target {
        let Some(new) = source.get(old.email_address()) else {
            continue;
        };
        if old.kind() != new.kind() {
            warn!(
                "Skipping {}: {} in target but {} in source",
                old.email_address(),
                old.kind(),
                new.kind()
            );
            continue;
        }

        let diff = diff::compute(old, new)?;
        if !diff.is_empty() {
            actions.push(Action::Update(UpdateAction::new(old.clone(), diff)));
        }
    }

    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountKind;
    use crate::error::Error;
    use std::collections::{BTreeSet, HashSet};
    use uuid::Uuid;

    fn email(s: &str) -> EmailAddress {
        EmailAddress::parse(s).unwrap()
    }

    fn user(address: &str) -> Account {
        Account::new(email(address), address, AccountKind::User)
    }

    fn group(address: &str) -> Account {
        Account::new(email(address), address, AccountKind::Functional)
    }

    fn keys(addresses: &[&str]) -> SsoKeys {
        addresses
            .iter()
            .enumerate()
            .map(|(i, a)| (email(a), Uuid::from_u128(i as u128 + 1)))
            .collect()
    }

    #[test]
    fn test_creates_precede_updates() {
        let source = vec![
            user("keep@acme.com").with_full_name("Renamed"),
            user("new1@acme.com"),
            group("new2@acme.com"),
        ];
        let target = vec![user("keep@acme.com"), user("gone@acme.com")];

        let actions = plan(&source, &target, &keys(&["new1@acme.com"])).unwrap();
        let kinds: Vec<_> = actions
            .iter()
            .map(|a| (a.as_create().is_some(), a.email_address().as_str()))
            .collect();

        assert_eq!(
            kinds,
            vec![
                (true, "new1@acme.com"),
                (true, "new2@acme.com"),
                (false, "gone@acme.com"),
                (false, "keep@acme.com"),
            ]
        );
    }

    #[test]
    fn test_functional_create_has_no_sso_key() {
        // a stray key for a shared mailbox is ignored
        let source = vec![group("shared@acme.com")];
        let actions = plan(&source, &[], &keys(&["shared@acme.com"])).unwrap();

        let create = actions[0].as_create().unwrap();
        assert_eq!(create.sso_key(), None);
    }

    #[test]
    fn test_user_create_without_sso_key_fails() {
        let result = plan(&[user("nokey@acme.com")], &[], &SsoKeys::new());
        assert_eq!(result, Err(Error::MissingSsoKey("nokey@acme.com".to_string())));
    }

    #[test]
    fn test_disable_only_active_target_accounts() {
        let target = vec![
            user("active@acme.com"),
            user("inactive@acme.com").with_active(false),
            group("team@acme.com").with_delegations([email("x@acme.com")]),
            group("empty@acme.com").with_active(false),
        ];

        let actions = plan(&[], &target, &SsoKeys::new()).unwrap();
        assert_eq!(actions.len(), 2);

        let user_disable = actions[0].as_update().unwrap();
        assert_eq!(user_disable.account.email_address(), &email("active@acme.com"));
        assert_eq!(user_disable.diff, Diff::disable_user());

        let group_disable = actions[1].as_update().unwrap();
        assert_eq!(group_disable.account.email_address(), &email("team@acme.com"));
        assert_eq!(group_disable.diff.is_active, Some(false));
        assert_eq!(group_disable.diff.delegations, Some(BTreeSet::new()));
    }

    #[test]
    fn test_kind_mismatch_is_skipped() {
        let source = vec![group("both@acme.com").with_full_name("Changed")];
        let target = vec![user("both@acme.com")];

        let actions = plan(&source, &target, &SsoKeys::new()).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_identity_diff_emits_nothing() {
        let account = user("same@acme.com").with_aliases([email("alias@acme.com")]);
        let actions = plan(
            std::slice::from_ref(&account),
            std::slice::from_ref(&account),
            &SsoKeys::new(),
        )
        .unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_update_carries_target_account() {
        let source = vec![user("a@acme.com").with_full_name("New")];
        let target = vec![user("a@acme.com").with_full_name("Old")];

        let actions = plan(&source, &target, &SsoKeys::new()).unwrap();
        let update = actions[0].as_update().unwrap();
        assert_eq!(update.account.full_name(), "Old");
        assert_eq!(update.diff.full_name.as_deref(), Some("New"));
    }

    #[test]
    fn test_no_address_gets_create_and_update() {
        let source = vec![
            user("a@acme.com"),
            user("b@acme.com").with_full_name("B"),
            group("c@acme.com").with_active(false),
        ];
        let target = vec![
            user("b@acme.com"),
            group("c@acme.com").with_delegations([email("a@acme.com")]),
            user("d@acme.com"),
        ];

        let actions = plan(&source, &target, &keys(&["a@acme.com"])).unwrap();
        let mut seen = HashSet::new();
        for action in &actions {
            assert!(seen.insert(action.email_address().clone()));
        }
        assert_eq!(actions.len(), 4);
    }
}
