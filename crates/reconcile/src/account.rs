//! Canonical account model shared by both directories

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A normalized (trimmed, lower-cased) email address with a domain part.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Normalize and validate a raw address.
    ///
    /// The address must contain exactly one `@` with a non-empty local part
    /// and a non-empty domain.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        match normalized.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(normalized))
            }
            _ => Err(Error::InvalidEmail(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after the `@`
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map(|(_, d)| d).unwrap_or_default()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EmailAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether an account is an individual or a functional (group) entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    User,
    Functional,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::User => write!(f, "user"),
            AccountKind::Functional => write!(f, "functional"),
        }
    }
}

/// A directory entry in either the source or the target directory.
///
/// Accounts are values: every transformation goes through one of the
/// consuming `with_*` methods and yields a new account, so an instance held
/// elsewhere is never changed behind its owner's back. The address is fixed
/// at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    email_address: EmailAddress,
    full_name: String,
    is_active: bool,
    aliases: BTreeSet<EmailAddress>,
    delegations: BTreeSet<EmailAddress>,
    kind: AccountKind,
}

impl Account {
    /// Create an active account with no aliases and no delegations
    pub fn new(email_address: EmailAddress, full_name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            email_address,
            full_name: full_name.into(),
            is_active: true,
            aliases: BTreeSet::new(),
            delegations: BTreeSet::new(),
            kind,
        }
    }

    pub fn with_full_name(self, full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            ..self
        }
    }

    pub fn with_active(self, is_active: bool) -> Self {
        Self { is_active, ..self }
    }

    pub fn with_aliases(self, aliases: impl IntoIterator<Item = EmailAddress>) -> Self {
        Self {
            aliases: aliases.into_iter().collect(),
            ..self
        }
    }

    pub fn with_delegations(self, delegations: impl IntoIterator<Item = EmailAddress>) -> Self {
        Self {
            delegations: delegations.into_iter().collect(),
            ..self
        }
    }

    pub fn email_address(&self) -> &EmailAddress {
        &self.email_address
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn aliases(&self) -> &BTreeSet<EmailAddress> {
        &self.aliases
    }

    pub fn delegations(&self) -> &BTreeSet<EmailAddress> {
        &self.delegations
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn is_functional(&self) -> bool {
        self.kind == AccountKind::Functional
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(s: &str) -> EmailAddress {
        EmailAddress::parse(s).unwrap()
    }

    #[test]
    fn test_email_is_normalized() {
        let address = email("  Alice.Smith@ACME.com ");
        assert_eq!(address.as_str(), "alice.smith@acme.com");
        assert_eq!(address.domain(), "acme.com");
    }

    #[test]
    fn test_email_requires_domain_part() {
        assert!(EmailAddress::parse("alice").is_err());
        assert!(EmailAddress::parse("alice@").is_err());
        assert!(EmailAddress::parse("@acme.com").is_err());
        assert!(EmailAddress::parse("a@b@acme.com").is_err());
        assert!(EmailAddress::parse("NT AUTHORITY\\SELF").is_err());
    }

    #[test]
    fn test_email_serde_validates() {
        let parsed: EmailAddress = serde_json::from_str("\"Bob@Acme.com\"").unwrap();
        assert_eq!(parsed, email("bob@acme.com"));
        assert!(serde_json::from_str::<EmailAddress>("\"bob\"").is_err());
    }

    #[test]
    fn test_with_methods_leave_original_untouched() {
        let original = Account::new(email("carol@acme.com"), "Carol", AccountKind::User);
        let changed = original
            .clone()
            .with_active(false)
            .with_delegations([email("dave@acme.com")]);

        assert!(original.is_active());
        assert!(original.delegations().is_empty());
        assert!(!changed.is_active());
        assert_eq!(changed.delegations().len(), 1);
        assert_eq!(changed.email_address(), original.email_address());
    }

    #[test]
    fn test_equality_covers_all_fields() {
        let a = Account::new(email("x@acme.com"), "X", AccountKind::User);
        let b = a.clone().with_aliases([email("x2@acme.com")]);
        let c = Account::new(email("x@acme.com"), "X", AccountKind::Functional);

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(AccountKind::User.to_string(), "user");
        assert_eq!(AccountKind::Functional.to_string(), "functional");
    }
}
