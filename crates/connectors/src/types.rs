//! Wire types for the SCIM target directory.

use reconcile::target::{FormattedName, MemberRef};
use reconcile::{Account, CreateAction, Diff, EmailAddress};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

const CORE_USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
const CORE_GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
const PATCH_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// SCIM list envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default)]
    pub total_results: Option<usize>,
    #[serde(rename = "Resources", default = "Vec::new")]
    pub resources: Vec<T>,
}

/// The id the target assigned to a created resource
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Created {
    pub id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserExtensionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegates: Option<Vec<String>>,
    #[serde(rename = "SsoAccountKey", skip_serializing_if = "Option::is_none")]
    pub sso_account_key: Option<String>,
}

/// Body of a user create or replace. Unset fields are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub schemas: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<FormattedName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(
        rename = "urn:ietf:params:scim:schemas:zivver:0.1:User",
        skip_serializing_if = "Option::is_none"
    )]
    pub extension: Option<UserExtensionRequest>,
}

impl UserRequest {
    /// Full body for a new user
    pub fn create(action: &CreateAction) -> Self {
        let account = action.account();
        Self {
            schemas: user_schemas(),
            user_name: Some(account.email_address().to_string()),
            name: Some(formatted(account.full_name())),
            active: Some(account.is_active()),
            extension: Some(UserExtensionRequest {
                aliases: Some(strings(account.aliases())),
                delegates: Some(strings(account.delegations())),
                sso_account_key: action.sso_key().map(|key| key.to_string()),
            }),
        }
    }

    /// Partial body carrying only the fields set in `diff`.
    ///
    /// The address and SSO key are never changed by an update.
    pub fn update(diff: &Diff) -> Self {
        let extension = (diff.aliases.is_some() || diff.delegations.is_some()).then(|| {
            UserExtensionRequest {
                aliases: diff.aliases.as_ref().map(strings),
                delegates: diff.delegations.as_ref().map(strings),
                sso_account_key: None,
            }
        });

        Self {
            schemas: user_schemas(),
            user_name: None,
            name: diff.full_name.as_deref().map(formatted),
            active: diff.is_active,
            extension,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupExtensionRequest {
    pub aliases: Vec<String>,
}

/// Body of a group create or replace. Unset fields are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequest {
    pub schemas: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberRef>>,
    #[serde(
        rename = "urn:ietf:params:scim:schemas:zivver:0.1:Group",
        skip_serializing_if = "Option::is_none"
    )]
    pub extension: Option<GroupExtensionRequest>,
}

impl GroupRequest {
    /// Full body for a new group with already-resolved members
    pub fn create(account: &Account, members: Vec<MemberRef>) -> Self {
        Self {
            schemas: group_schemas(),
            external_id: Some(account.email_address().to_string()),
            display_name: Some(account.full_name().to_string()),
            members: Some(members),
            extension: Some(GroupExtensionRequest {
                aliases: strings(account.aliases()),
            }),
        }
    }

    /// Partial body for `diff`; `members` is the resolved delegation set, if
    /// the diff has one.
    pub fn update(diff: &Diff, members: Option<Vec<MemberRef>>) -> Self {
        Self {
            schemas: group_schemas(),
            external_id: None,
            display_name: diff.full_name.clone(),
            members,
            extension: diff.aliases.as_ref().map(|aliases| GroupExtensionRequest {
                aliases: strings(aliases),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
}

/// SCIM PATCH body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchRequest {
    pub schemas: Vec<String>,
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    /// Drop every member of a group
    pub fn remove_all_members() -> Self {
        Self {
            schemas: vec![PATCH_SCHEMA.to_string()],
            operations: vec![PatchOperation {
                op: "remove".to_string(),
                path: "members".to_string(),
            }],
        }
    }
}

fn user_schemas() -> Vec<String> {
    vec![
        CORE_USER_SCHEMA.to_string(),
        reconcile::target::USER_EXTENSION_SCHEMA.to_string(),
    ]
}

fn group_schemas() -> Vec<String> {
    vec![
        CORE_GROUP_SCHEMA.to_string(),
        reconcile::target::GROUP_EXTENSION_SCHEMA.to_string(),
    ]
}

fn formatted(name: &str) -> FormattedName {
    FormattedName {
        formatted: name.to_string(),
    }
}

fn strings(addresses: &BTreeSet<EmailAddress>) -> Vec<String> {
    addresses.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::AccountKind;
    use serde_json::json;

    fn email(s: &str) -> EmailAddress {
        EmailAddress::parse(s).unwrap()
    }

    #[test]
    fn test_user_create_body() {
        let account = Account::new(email("alice@acme.com"), "Alice", AccountKind::User)
            .with_aliases([email("al@acme.com")]);
        let action = CreateAction::new(account, Some(Uuid::from_u128(7))).unwrap();

        let body = serde_json::to_value(UserRequest::create(&action)).unwrap();
        assert_eq!(body["userName"], "alice@acme.com");
        assert_eq!(body["name"]["formatted"], "Alice");
        assert_eq!(body["active"], true);

        let extension = &body["urn:ietf:params:scim:schemas:zivver:0.1:User"];
        assert_eq!(extension["aliases"], json!(["al@acme.com"]));
        assert_eq!(extension["delegates"], json!([]));
        assert_eq!(
            extension["SsoAccountKey"],
            Uuid::from_u128(7).to_string().as_str()
        );
    }

    #[test]
    fn test_user_update_omits_unset_fields() {
        let body = serde_json::to_value(UserRequest::update(&Diff::disable_user())).unwrap();
        let object = body.as_object().unwrap();

        assert_eq!(body["active"], false);
        assert!(!object.contains_key("userName"));
        assert!(!object.contains_key("name"));
        assert!(!object.contains_key("urn:ietf:params:scim:schemas:zivver:0.1:User"));
    }

    #[test]
    fn test_user_update_extension_only_with_set_sets() {
        let diff = Diff {
            delegations: Some(BTreeSet::new()),
            ..Diff::default()
        };
        let body = serde_json::to_value(UserRequest::update(&diff)).unwrap();

        let extension = &body["urn:ietf:params:scim:schemas:zivver:0.1:User"];
        assert_eq!(extension["delegates"], json!([]));
        assert!(extension.get("aliases").is_none());
        assert!(extension.get("SsoAccountKey").is_none());
    }

    #[test]
    fn test_group_bodies() {
        let account = Account::new(email("team@acme.com"), "Team", AccountKind::Functional);
        let members = vec![MemberRef {
            value: Uuid::from_u128(1),
        }];

        let body = serde_json::to_value(GroupRequest::create(&account, members)).unwrap();
        assert_eq!(body["externalId"], "team@acme.com");
        assert_eq!(body["displayName"], "Team");
        assert_eq!(body["members"][0]["value"], Uuid::from_u128(1).to_string().as_str());

        let body = serde_json::to_value(GroupRequest::update(&Diff::default(), None)).unwrap();
        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object.contains_key("schemas"));
    }

    #[test]
    fn test_remove_all_members_body() {
        let body = serde_json::to_value(PatchRequest::remove_all_members()).unwrap();
        assert_eq!(body["Operations"], json!([{"op": "remove", "path": "members"}]));
    }

    #[test]
    fn test_list_envelope() {
        let list: ListResponse<Created> = serde_json::from_value(json!({
            "totalResults": 1,
            "Resources": [{"id": Uuid::from_u128(3)}]
        }))
        .unwrap();
        assert_eq!(list.resources.len(), 1);

        let empty: ListResponse<Created> = serde_json::from_value(json!({})).unwrap();
        assert!(empty.resources.is_empty());
    }
}
