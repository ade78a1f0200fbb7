//! Target directory (SCIM) records and their ingestion into accounts

use crate::account::{Account, AccountKind, EmailAddress};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Vendor extension schema carried by SCIM users
pub const USER_EXTENSION_SCHEMA: &str = "urn:ietf:params:scim:schemas:zivver:0.1:User";

/// Vendor extension schema carried by SCIM groups
pub const GROUP_EXTENSION_SCHEMA: &str = "urn:ietf:params:scim:schemas:zivver:0.1:Group";

/// Address -> SCIM resource id
pub type TargetIds = HashMap<EmailAddress, Uuid>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedName {
    #[serde(default)]
    pub formatted: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserExtension {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub delegates: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupExtension {
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// SCIM user resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    pub id: Uuid,
    pub user_name: String,
    #[serde(default)]
    pub name: FormattedName,
    pub active: bool,
    #[serde(rename = "urn:ietf:params:scim:schemas:zivver:0.1:User", default)]
    pub extension: UserExtension,
}

/// SCIM group member reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    pub value: Uuid,
}

/// SCIM group resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimGroup {
    pub id: Uuid,
    pub external_id: String,
    pub display_name: String,
    #[serde(default)]
    pub members: Vec<MemberRef>,
    #[serde(rename = "urn:ietf:params:scim:schemas:zivver:0.1:Group", default)]
    pub extension: GroupExtension,
}

/// Target accounts plus the resource ids the applier needs
#[derive(Debug, Clone, Default)]
pub struct TargetSnapshot {
    pub accounts: Vec<Account>,
    pub ids: TargetIds,
}

impl TargetSnapshot {
    /// Build accounts from SCIM users and groups, users first.
    pub fn from_resources(users: &[ScimUser], groups: &[ScimGroup]) -> Self {
        let mut accounts = Vec::with_capacity(users.len() + groups.len());
        let mut ids = TargetIds::new();
        let mut seen = HashSet::new();

        let user_names: HashMap<Uuid, EmailAddress> = users
            .iter()
            .filter_map(|user| {
                EmailAddress::parse(&user.user_name)
                    .ok()
                    .map(|address| (user.id, address))
            })
            .collect();

        for user in users {
            let Some(address) = user_names.get(&user.id) else {
                warn!("Skipping SCIM user {}: invalid userName {:?}", user.id, user.user_name);
                continue;
            };
            if !seen.insert(address.clone()) {
                warn!("Skipping duplicate SCIM resource {address}");
                continue;
            }
            ids.insert(address.clone(), user.id);
            accounts.push(
                Account::new(address.clone(), user.name.formatted.clone(), AccountKind::User)
                    .with_active(user.active)
                    .with_aliases(parse_addresses(address, &user.extension.aliases))
                    .with_delegations(parse_addresses(address, &user.extension.delegates)),
            );
        }

        for group in groups {
            let address = match EmailAddress::parse(&group.external_id) {
                Ok(address) => address,
                Err(e) => {
                    warn!("Skipping SCIM group {}: {}", group.id, e);
                    continue;
                }
            };
            if !seen.insert(address.clone()) {
                warn!("Skipping duplicate SCIM resource {address}");
                continue;
            }
            ids.insert(address.clone(), group.id);

            let members = group
                .members
                .iter()
                .filter(|member| member.value != group.id)
                .filter_map(|member| user_names.get(&member.value).cloned());

            accounts.push(
                Account::new(address.clone(), group.display_name.clone(), AccountKind::Functional)
                    .with_active(!group.members.is_empty())
                    .with_aliases(parse_addresses(&address, &group.extension.aliases))
                    .with_delegations(members),
            );
        }

        Self { accounts, ids }
    }
}

fn parse_addresses(owner: &EmailAddress, raw: &[String]) -> Vec<EmailAddress> {
    raw.iter()
        .filter_map(|value| match EmailAddress::parse(value) {
            Ok(address) => Some(address),
            Err(e) => {
                warn!("Ignoring address on {owner}: {e}");
                None
            }
        })
        .collect()
}
