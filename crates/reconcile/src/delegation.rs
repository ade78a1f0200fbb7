//! Effective delegation resolution over the source directory
//!
//! Direct grants are read from each mailbox's permission list. Functional
//! (shared) mailboxes act as pass-through groups: they are replaced by their
//! own delegates, recursively, so only terminal principals end up in an
//! account's effective delegation set.

use crate::account::{AccountKind, EmailAddress};
use crate::source::PermissionGrant;
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Maximum group nesting followed from any one account
pub const MAX_DEPTH: usize = 10;

/// Principal used by the source system for built-in grants
const SYSTEM_PRINCIPAL: &str = "NT AUTHORITY";

/// Access right that counts as a delegation
const FULL_ACCESS: &str = "FullAccess";

/// Principals holding full access in a mailbox's grant list.
///
/// The system principal and principals that are not email addresses are
/// ignored.
pub fn direct_delegates(grants: &[PermissionGrant]) -> BTreeSet<EmailAddress> {
    grants
        .iter()
        .filter(|grant| !grant.user.contains(SYSTEM_PRINCIPAL))
        .filter(|grant| {
            grant
                .permission_list
                .iter()
                .any(|entry| entry.access_rights.iter().any(|right| right == FULL_ACCESS))
        })
        .filter_map(|grant| match EmailAddress::parse(&grant.user) {
            Ok(address) => Some(address),
            Err(_) => {
                debug!("Ignoring non-email principal {:?}", grant.user);
                None
            }
        })
        .collect()
}

/// Direct delegation edges keyed by account address
#[derive(Debug, Clone, Default)]
pub struct DelegationGraph {
    direct: HashMap<EmailAddress, BTreeSet<EmailAddress>>,
    groups: HashSet<EmailAddress>,
}

impl DelegationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account and its direct delegates
    pub fn add(
        &mut self,
        address: EmailAddress,
        kind: AccountKind,
        delegates: BTreeSet<EmailAddress>,
    ) {
        if kind == AccountKind::Functional {
            self.groups.insert(address.clone());
        } else {
            self.groups.remove(&address);
        }
        self.direct.insert(address, delegates);
    }

    pub fn direct(&self, address: &EmailAddress) -> Option<&BTreeSet<EmailAddress>> {
        self.direct.get(address)
    }

    pub fn is_group(&self, address: &EmailAddress) -> bool {
        self.groups.contains(address)
    }

    pub fn len(&self) -> usize {
        self.direct.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty()
    }

    /// Effective delegation set of one account.
    ///
    /// Addresses unknown to the graph are returned as-is. Cycles and
    /// branches deeper than [`MAX_DEPTH`] are cut off with a warning.
    pub fn resolve(&self, address: &EmailAddress) -> BTreeSet<EmailAddress> {
        self.walk(address, &[], 0)
    }

    /// Effective delegation sets of every registered account
    pub fn resolve_all(&self) -> HashMap<EmailAddress, BTreeSet<EmailAddress>> {
        self.direct
            .keys()
            .map(|address| (address.clone(), self.resolve(address)))
            .collect()
    }

    fn walk(
        &self,
        account: &EmailAddress,
        path: &[EmailAddress],
        depth: usize,
    ) -> BTreeSet<EmailAddress> {
        if depth > MAX_DEPTH {
            warn!(
                "Max delegation depth reached at {} (depth {}, path {})",
                account,
                depth,
                format_path(path)
            );
            return BTreeSet::new();
        }

        if path.contains(account) {
            warn!(
                "Circular delegation detected at {} (depth {}, path {})",
                account,
                depth,
                format_path(path)
            );
            return BTreeSet::new();
        }

        let Some(delegates) = self.direct.get(account) else {
            return BTreeSet::new();
        };

        // Each branch gets its own copy of the path: siblings must not see
        // each other's visits.
        let mut branch = path.to_vec();
        branch.push(account.clone());

        let mut resolved = BTreeSet::new();
        for delegate in delegates {
            if self.groups.contains(delegate) {
                resolved.extend(self.walk(delegate, &branch, depth + 1));
            } else {
                resolved.insert(delegate.clone());
            }
        }
        resolved
    }
}

fn format_path(path: &[EmailAddress]) -> String {
    path.iter()
        .map(EmailAddress::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
