//! Directory traits and their implementations.
//!
//! [`SourceDirectory`] is the mailbox directory the accounts come from and
//! [`TargetDirectory`] is the SCIM directory kept in sync with it. The live
//! implementations are [`exchange::ExchangeClient`] and [`scim::ScimClient`].
//!
//! # Testing
//!
//! Use [`MockSource`] and [`MockTarget`] to run without network access:
//!
//! ```
//! use connectors::backend::{MockTarget, TargetDirectory};
//!
//! let target = MockTarget::new();
//! assert!(target.list_users().unwrap().is_empty());
//! ```

pub mod exchange;
pub mod scim;

use crate::error::{Error, Result};
use crate::types::{GroupRequest, UserRequest};
use reconcile::source::MailboxWithPermissions;
use reconcile::target::{ScimGroup, ScimUser};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// The directory accounts are read from.
pub trait SourceDirectory: Send + Sync {
    /// Every mailbox together with its permission grants, in listing order.
    fn fetch_mailboxes(&self) -> Result<Vec<MailboxWithPermissions>>;
}

/// The SCIM directory being reconciled.
pub trait TargetDirectory: Send + Sync {
    fn list_users(&self) -> Result<Vec<ScimUser>>;

    fn list_groups(&self) -> Result<Vec<ScimGroup>>;

    /// Create a user and return its id.
    fn create_user(&self, request: &UserRequest) -> Result<Uuid>;

    /// Create a group and return its id.
    fn create_group(&self, request: &GroupRequest) -> Result<Uuid>;

    /// Replace the fields present in `request`.
    fn replace_user(&self, id: Uuid, request: &UserRequest) -> Result<()>;

    /// Replace the fields present in `request`.
    ///
    /// An empty member list is not honored by the target; use
    /// [`TargetDirectory::remove_all_members`] for that.
    fn replace_group(&self, id: Uuid, request: &GroupRequest) -> Result<()>;

    /// Drop every member of a group.
    fn remove_all_members(&self, id: Uuid) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory source directory.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    mailboxes: Arc<Mutex<Vec<MailboxWithPermissions>>>,
}

impl MockSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mailboxes(mailboxes: Vec<MailboxWithPermissions>) -> Self {
        Self {
            mailboxes: Arc::new(Mutex::new(mailboxes)),
        }
    }

    pub fn add_mailbox(&mut self, mailbox: MailboxWithPermissions) {
        lock(&self.mailboxes).push(mailbox);
    }
}

impl SourceDirectory for MockSource {
    fn fetch_mailboxes(&self) -> Result<Vec<MailboxWithPermissions>> {
        Ok(lock(&self.mailboxes).clone())
    }
}

/// In-memory SCIM directory.
///
/// Applies requests the way the live target does, including ignoring an
/// empty member list on replace, and records every call so tests can check
/// their order.
#[derive(Debug, Clone, Default)]
pub struct MockTarget {
    users: Arc<Mutex<Vec<ScimUser>>>,
    groups: Arc<Mutex<Vec<ScimGroup>>>,
    calls: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MockTarget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(users: Vec<ScimUser>, groups: Vec<ScimGroup>) -> Self {
        Self {
            users: Arc::new(Mutex::new(users)),
            groups: Arc::new(Mutex::new(groups)),
            ..Self::default()
        }
    }

    /// Make every write touching `key` (an address or id) fail.
    pub fn fail_on(&self, key: impl Into<String>) {
        lock(&self.failing).insert(key.into());
    }

    /// Calls made so far, as `method key`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn record(&self, method: &str, key: &str) -> Result<()> {
        lock(&self.calls).push(format!("{method} {key}"));
        if lock(&self.failing).contains(key) {
            return Err(Error::http(format!("{method} {key} rejected"), Some(500)));
        }
        Ok(())
    }

    fn not_found(id: Uuid) -> Error {
        Error::http(format!("resource {id} not found"), Some(404))
    }
}

impl TargetDirectory for MockTarget {
    fn list_users(&self) -> Result<Vec<ScimUser>> {
        Ok(lock(&self.users).clone())
    }

    fn list_groups(&self) -> Result<Vec<ScimGroup>> {
        Ok(lock(&self.groups).clone())
    }

    fn create_user(&self, request: &UserRequest) -> Result<Uuid> {
        let user_name = request.user_name.clone().unwrap_or_default();
        self.record("create_user", &user_name)?;

        let id = Uuid::new_v4();
        let extension = request.extension.clone().unwrap_or_default();
        lock(&self.users).push(ScimUser {
            id,
            user_name,
            name: request.name.clone().unwrap_or_default(),
            active: request.active.unwrap_or(true),
            extension: reconcile::target::UserExtension {
                aliases: extension.aliases.unwrap_or_default(),
                delegates: extension.delegates.unwrap_or_default(),
            },
        });
        Ok(id)
    }

    fn create_group(&self, request: &GroupRequest) -> Result<Uuid> {
        let external_id = request.external_id.clone().unwrap_or_default();
        self.record("create_group", &external_id)?;

        let id = Uuid::new_v4();
        lock(&self.groups).push(ScimGroup {
            id,
            external_id,
            display_name: request.display_name.clone().unwrap_or_default(),
            members: request.members.clone().unwrap_or_default(),
            extension: reconcile::target::GroupExtension {
                aliases: request
                    .extension
                    .as_ref()
                    .map(|e| e.aliases.clone())
                    .unwrap_or_default(),
            },
        });
        Ok(id)
    }

    fn replace_user(&self, id: Uuid, request: &UserRequest) -> Result<()> {
        self.record("replace_user", &id.to_string())?;

        let mut users = lock(&self.users);
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| Self::not_found(id))?;

        if let Some(name) = &request.name {
            user.name = name.clone();
        }
        if let Some(active) = request.active {
            user.active = active;
        }
        if let Some(extension) = &request.extension {
            if let Some(aliases) = &extension.aliases {
                user.extension.aliases.clone_from(aliases);
            }
            if let Some(delegates) = &extension.delegates {
                user.extension.delegates.clone_from(delegates);
            }
        }
        Ok(())
    }

    fn replace_group(&self, id: Uuid, request: &GroupRequest) -> Result<()> {
        self.record("replace_group", &id.to_string())?;

        let mut groups = lock(&self.groups);
        let group = groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| Self::not_found(id))?;

        if let Some(display_name) = &request.display_name {
            group.display_name.clone_from(display_name);
        }
        // the live target silently keeps the members when sent none
        if let Some(members) = request.members.as_ref().filter(|m| !m.is_empty()) {
            group.members.clone_from(members);
        }
        if let Some(extension) = &request.extension {
            group.extension.aliases.clone_from(&extension.aliases);
        }
        Ok(())
    }

    fn remove_all_members(&self, id: Uuid) -> Result<()> {
        self.record("remove_all_members", &id.to_string())?;

        let mut groups = lock(&self.groups);
        let group = groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        group.members.clear();
        Ok(())
    }
}
