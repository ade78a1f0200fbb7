//! Source directory records and their ingestion into accounts
//!
//! Records mirror the mailbox admin API payloads (PascalCase fields). They
//! are kept raw here and validated during ingestion, where a malformed
//! record is skipped with a warning instead of failing the pass.

use crate::account::{Account, AccountKind, EmailAddress};
use crate::action::SsoKey;
use crate::delegation::{DelegationGraph, direct_delegates};
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;
use uuid::Uuid;

/// Address -> SSO key, for user mailboxes that carry one
pub type SsoKeys = HashMap<EmailAddress, SsoKey>;

/// At least one `@` and a dot somewhere in the domain
static VALID_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").expect("valid address regex"));

/// Mailbox kind as reported by the source system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientType {
    UserMailbox,
    SharedMailbox,
    #[serde(other)]
    Other,
}

/// A mailbox as listed by the source directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MailboxRecord {
    pub primary_smtp_address: String,
    pub display_name: String,
    /// Proxy addresses, bare or `SMTP:`-prefixed
    #[serde(default)]
    pub email_addresses: Vec<String>,
    pub recipient_type_details: RecipientType,
    #[serde(default)]
    pub account_disabled: bool,
    #[serde(default)]
    pub external_directory_object_id: Option<Uuid>,
    #[serde(default)]
    pub guid: Option<Uuid>,
}

/// One access-rights entry of a grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionEntry {
    #[serde(default)]
    pub access_rights: Vec<String>,
}

/// A principal and the rights it holds on a mailbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionGrant {
    pub user: String,
    #[serde(default)]
    pub permission_list: Vec<PermissionEntry>,
}

/// A mailbox together with its permission grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxWithPermissions {
    pub mailbox: MailboxRecord,
    #[serde(default)]
    pub permissions: Vec<PermissionGrant>,
}

/// Source accounts plus the data collected alongside them
#[derive(Debug, Clone, Default)]
pub struct SourceSnapshot {
    pub accounts: Vec<Account>,
    pub sso_keys: SsoKeys,
}

impl SourceSnapshot {
    /// Validate mailboxes, resolve delegations and build accounts.
    ///
    /// Input order is preserved. Records that cannot be turned into an
    /// account are logged and dropped.
    pub fn from_mailboxes(mailboxes: &[MailboxWithPermissions]) -> Self {
        let mut seen = HashSet::new();
        let valid: Vec<ValidMailbox> = mailboxes
            .iter()
            .filter_map(ValidMailbox::from_record)
            .filter(|mailbox| {
                let fresh = seen.insert(mailbox.address.clone());
                if !fresh {
                    warn!("Skipping duplicate mailbox {}", mailbox.address);
                }
                fresh
            })
            .collect();

        let mut graph = DelegationGraph::new();
        for mailbox in &valid {
            graph.add(mailbox.address.clone(), mailbox.kind, mailbox.grants.clone());
        }

        let sso_keys = valid
            .iter()
            .filter(|mailbox| mailbox.kind == AccountKind::User)
            .filter_map(|mailbox| mailbox.sso_key.map(|key| (mailbox.address.clone(), key)))
            .collect();

        let accounts = valid
            .into_iter()
            .map(|mailbox| {
                // A disabled shared mailbox should not hand out access
                let delegations = if mailbox.kind == AccountKind::User || !mailbox.disabled {
                    graph.resolve(&mailbox.address)
                } else {
                    BTreeSet::new()
                };
                Account::new(mailbox.address, mailbox.display_name, mailbox.kind)
                    .with_active(!mailbox.disabled)
                    .with_aliases(mailbox.aliases)
                    .with_delegations(delegations)
            })
            .collect();

        Self { accounts, sso_keys }
    }
}

/// A mailbox record that passed validation
struct ValidMailbox {
    address: EmailAddress,
    display_name: String,
    kind: AccountKind,
    disabled: bool,
    aliases: BTreeSet<EmailAddress>,
    grants: BTreeSet<EmailAddress>,
    sso_key: Option<SsoKey>,
}

impl ValidMailbox {
    fn from_record(entry: &MailboxWithPermissions) -> Option<Self> {
        let record = &entry.mailbox;

        let address = match EmailAddress::parse(&record.primary_smtp_address) {
            Ok(address) => address,
            Err(e) => {
                warn!("Skipping mailbox {:?}: {}", record.display_name, e);
                return None;
            }
        };

        let kind = match record.recipient_type_details {
            RecipientType::UserMailbox => AccountKind::User,
            RecipientType::SharedMailbox => AccountKind::Functional,
            RecipientType::Other => {
                warn!("Skipping mailbox {address}: unsupported recipient type");
                return None;
            }
        };

        let addresses = smtp_addresses(&record.email_addresses);
        if addresses.is_empty() {
            warn!("Skipping mailbox {address}: no SMTP addresses");
            return None;
        }

        let aliases = addresses
            .into_iter()
            .filter(|alias| *alias != address)
            .collect();

        Some(Self {
            display_name: record.display_name.clone(),
            kind,
            disabled: record.account_disabled,
            aliases,
            grants: direct_delegates(&entry.permissions),
            sso_key: record.external_directory_object_id,
            address,
        })
    }
}

/// Keep SMTP entries of a proxy address list, normalized.
///
/// Entries with another `type:` prefix (X500, SIP, ...) are ignored. Entries
/// that do not look like `local@domain.tld` are dropped with a warning.
pub fn smtp_addresses(raw: &[String]) -> Vec<EmailAddress> {
    raw.iter()
        .filter_map(|entry| {
            let entry = entry.trim();
            match entry.split_once(':') {
                None => Some(entry),
                Some((prefix, rest)) if prefix.eq_ignore_ascii_case("smtp") => Some(rest),
                Some(_) => None,
            }
        })
        .filter_map(|entry| {
            let candidate = entry.trim().to_lowercase();
            if !VALID_ADDRESS.is_match(&candidate) {
                warn!("Invalid email address: {candidate}, skipping from aliases");
                return None;
            }
            EmailAddress::parse(&candidate).ok()
        })
        .collect()
}
