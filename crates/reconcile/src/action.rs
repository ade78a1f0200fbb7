//! Reconciliation actions handed to the applier

use crate::account::{Account, AccountKind, EmailAddress};
use crate::diff::Diff;
use crate::error::{Error, Result};
use serde::Serialize;
use uuid::Uuid;

/// External identity key of a user mailbox
pub type SsoKey = Uuid;

/// Create an account that only exists in the source directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateAction {
    account: Account,
    sso_key: Option<SsoKey>,
}

impl CreateAction {
    /// Build a create action.
    ///
    /// User accounts require an SSO key and functional accounts must not
    /// have one.
    pub fn new(account: Account, sso_key: Option<SsoKey>) -> Result<Self> {
        match (account.kind(), sso_key) {
            (AccountKind::User, None) => {
                Err(Error::MissingSsoKey(account.email_address().to_string()))
            }
            (AccountKind::Functional, Some(_)) => {
                Err(Error::UnexpectedSsoKey(account.email_address().to_string()))
            }
            _ => Ok(Self { account, sso_key }),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn sso_key(&self) -> Option<SsoKey> {
        self.sso_key
    }
}

/// Apply a diff to an account that exists in the target directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateAction {
    /// The target-directory account as it is now
    pub account: Account,
    pub diff: Diff,
}

impl UpdateAction {
    pub fn new(account: Account, diff: Diff) -> Self {
        Self { account, diff }
    }

    /// Whether this update deactivates the account
    pub fn is_disable(&self) -> bool {
        self.diff.is_active == Some(false)
    }
}

/// One step of a reconciliation plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    Create(CreateAction),
    Update(UpdateAction),
}

impl Action {
    pub fn account(&self) -> &Account {
        match self {
            Action::Create(create) => create.account(),
            Action::Update(update) => &update.account,
        }
    }

    pub fn email_address(&self) -> &EmailAddress {
        self.account().email_address()
    }

    pub fn as_create(&self) -> Option<&CreateAction> {
        match self {
            Action::Create(create) => Some(create),
            Action::Update(_) => None,
        }
    }

    pub fn as_update(&self) -> Option<&UpdateAction> {
        match self {
            Action::Create(_) => None,
            Action::Update(update) => Some(update),
        }
    }
}

/// Counts over a plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub creates: usize,
    pub updates: usize,
    /// Subset of `updates` that deactivate an account
    pub disables: usize,
}

impl PlanSummary {
    pub fn from_actions(actions: &[Action]) -> Self {
        let mut summary = Self::default();
        for action in actions {
            match action {
                Action::Create(_) => summary.creates += 1,
                Action::Update(update) => {
                    summary.updates += 1;
                    if update.is_disable() {
                        summary.disables += 1;
                    }
                }
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.creates + self.updates
    }

    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(address: &str, kind: AccountKind) -> Account {
        Account::new(EmailAddress::parse(address).unwrap(), "Name", kind)
    }

    #[test]
    fn test_user_create_requires_sso_key() {
        let result = CreateAction::new(account("a@acme.com", AccountKind::User), None);
        assert_eq!(result, Err(Error::MissingSsoKey("a@acme.com".to_string())));

        let key = Uuid::nil();
        let create = CreateAction::new(account("a@acme.com", AccountKind::User), Some(key)).unwrap();
        assert_eq!(create.sso_key(), Some(key));
    }

    #[test]
    fn test_functional_create_rejects_sso_key() {
        let result = CreateAction::new(
            account("shared@acme.com", AccountKind::Functional),
            Some(Uuid::nil()),
        );
        assert!(matches!(result, Err(Error::UnexpectedSsoKey(_))));

        let create =
            CreateAction::new(account("shared@acme.com", AccountKind::Functional), None).unwrap();
        assert_eq!(create.sso_key(), None);
    }

    #[test]
    fn test_plan_summary() {
        let actions = vec![
            Action::Create(
                CreateAction::new(account("new@acme.com", AccountKind::Functional), None).unwrap(),
            ),
            Action::Update(UpdateAction::new(
                account("old@acme.com", AccountKind::User),
                Diff::disable_user(),
            )),
            Action::Update(UpdateAction::new(
                account("renamed@acme.com", AccountKind::User),
                Diff {
                    full_name: Some("New".to_string()),
                    ..Diff::default()
                },
            )),
        ];

        let summary = PlanSummary::from_actions(&actions);
        assert_eq!(summary.creates, 1);
        assert_eq!(summary.updates, 2);
        assert_eq!(summary.disables, 1);
        assert_eq!(summary.total(), 3);
        assert!(summary.has_changes());
        assert!(!PlanSummary::default().has_changes());
    }

    #[test]
    fn test_action_accessors() {
        let update = Action::Update(UpdateAction::new(
            account("old@acme.com", AccountKind::User),
            Diff::disable_user(),
        ));
        assert_eq!(update.email_address().as_str(), "old@acme.com");
        assert!(update.as_create().is_none());
        assert!(update.as_update().is_some_and(UpdateAction::is_disable));
    }
}
