//! Pruning of source accounts before planning
//!
//! Two passes, in order: delegations pointing outside the loaded source
//! directory are dropped, then accounts, aliases and delegations on domains
//! the organization has not claimed are dropped.

use crate::account::{Account, EmailAddress};
use log::warn;
use std::collections::{BTreeSet, HashSet};

/// Email domains the organization asserts ownership of
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimedDomains(BTreeSet<String>);

impl ClaimedDomains {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        )
    }

    /// Whether the address's domain is claimed
    pub fn owns(&self, address: &EmailAddress) -> bool {
        self.0.contains(address.domain().trim())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Run both pruning passes
pub fn prune(accounts: &[Account], claimed: &ClaimedDomains) -> Vec<Account> {
    let known = prune_dangling_delegations(accounts);
    prune_unowned(&known, claimed)
}

/// Drop delegations to addresses that are not source accounts
pub fn prune_dangling_delegations(accounts: &[Account]) -> Vec<Account> {
    let known: HashSet<&EmailAddress> = accounts.iter().map(Account::email_address).collect();

    accounts
        .iter()
        .map(|account| {
            let (kept, dropped): (Vec<_>, Vec<_>) = account
                .delegations()
                .iter()
                .cloned()
                .partition(|delegate| known.contains(delegate));

            if !dropped.is_empty() {
                warn!(
                    "Pruned {} delegations for {}: {}",
                    dropped.len(),
                    account.email_address(),
                    join(&dropped)
                );
            }
            account.clone().with_delegations(kept)
        })
        .collect()
}

/// Drop accounts, aliases and delegations on unclaimed domains
pub fn prune_unowned(accounts: &[Account], claimed: &ClaimedDomains) -> Vec<Account> {
    accounts
        .iter()
        .filter(|account| {
            let owned = claimed.owns(account.email_address());
            if !owned {
                warn!(
                    "Pruned {} as it is not owned by the organization",
                    account.email_address()
                );
            }
            owned
        })
        .map(|account| {
            let aliases: Vec<_> = account
                .aliases()
                .iter()
                .filter(|alias| claimed.owns(alias))
                .cloned()
                .collect();
            let delegations: Vec<_> = account
                .delegations()
                .iter()
                .filter(|delegate| claimed.owns(delegate))
                .cloned()
                .collect();
            account
                .clone()
                .with_aliases(aliases)
                .with_delegations(delegations)
        })
        .collect()
}

fn join(addresses: &[EmailAddress]) -> String {
    addresses
        .iter()
        .map(EmailAddress::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountKind;

    fn email(s: &str) -> EmailAddress {
        EmailAddress::parse(s).unwrap()
    }

    fn user(address: &str) -> Account {
        Account::new(email(address), "Name", AccountKind::User)
    }

    fn acme() -> ClaimedDomains {
        ClaimedDomains::new([" ACME.com "])
    }

    #[test]
    fn test_claimed_domains_normalized() {
        let claimed = acme();
        assert!(claimed.owns(&email("a@acme.com")));
        assert!(claimed.owns(&email("a@Acme.COM")));
        assert!(!claimed.owns(&email("a@sub.acme.com")));
        assert!(!claimed.owns(&email("a@external.com")));
        assert_eq!(claimed.iter().collect::<Vec<_>>(), vec!["acme.com"]);
    }

    #[test]
    fn test_dangling_delegations_dropped() {
        let accounts = vec![
            user("a@acme.com").with_delegations([email("b@acme.com"), email("ghost@acme.com")]),
            user("b@acme.com"),
        ];

        let pruned = prune_dangling_delegations(&accounts);
        assert_eq!(
            pruned[0].delegations().iter().collect::<Vec<_>>(),
            vec![&email("b@acme.com")]
        );
        // input untouched
        assert_eq!(accounts[0].delegations().len(), 2);
    }

    #[test]
    fn test_unowned_accounts_and_addresses_dropped() {
        let accounts = vec![
            user("a@acme.com")
                .with_aliases([email("a@acme.com.evil"), email("a2@acme.com")])
                .with_delegations([email("b@external.com"), email("c@acme.com")]),
            user("b@external.com"),
            user("c@acme.com"),
        ];

        let pruned = prune_unowned(&accounts, &acme());
        assert_eq!(pruned.len(), 2);
        assert_eq!(
            pruned[0].aliases().iter().collect::<Vec<_>>(),
            vec![&email("a2@acme.com")]
        );
        assert_eq!(
            pruned[0].delegations().iter().collect::<Vec<_>>(),
            vec![&email("c@acme.com")]
        );
        assert_eq!(pruned[1].email_address(), &email("c@acme.com"));
    }

    #[test]
    fn test_prune_is_idempotent() {
        let accounts = vec![
            user("a@acme.com")
                .with_aliases([email("x@other.org")])
                .with_delegations([email("b@external.com"), email("c@acme.com"), email("gone@acme.com")]),
            user("b@external.com").with_delegations([email("a@acme.com")]),
            user("c@acme.com"),
        ];

        let once = prune(&accounts, &acme());
        let twice = prune(&once, &acme());
        assert_eq!(once, twice);

        let unowned_once = prune_unowned(&accounts, &acme());
        assert_eq!(prune_unowned(&unowned_once, &acme()), unowned_once);
    }

    #[test]
    fn test_empty_claim_drops_everything() {
        let pruned = prune(&[user("a@acme.com")], &ClaimedDomains::default());
        assert!(pruned.is_empty());
    }
}
