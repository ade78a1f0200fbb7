//! Mailbox admin API backend.
//!
//! Lists mailboxes, then fetches the permission grants of each mailbox.
//! Grants are fetched in fixed-size batches; the requests of one batch run
//! in parallel.

use crate::auth;
use crate::backend::SourceDirectory;
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, info, warn};
use rayon::prelude::*;
use reconcile::source::{MailboxRecord, MailboxWithPermissions, PermissionGrant};
use serde::Deserialize;

/// Default admin API host.
pub const DEFAULT_BASE_URL: &str = "https://outlook.office365.com";

/// Default number of permission requests in flight.
pub const DEFAULT_BATCH_SIZE: usize = 10;

const SELECTED_PROPERTIES: &[&str] = &[
    "PrimarySmtpAddress",
    "DisplayName",
    "EmailAddresses",
    "RecipientTypeDetails",
    "Guid",
    "AccountDisabled",
    "ExternalDirectoryObjectId",
];

#[derive(Debug, Deserialize)]
struct ODataList<T> {
    value: Option<Vec<T>>,
}

/// Source directory backed by the mailbox admin API.
pub struct ExchangeClient {
    agent: ureq::Agent,
    base_url: String,
    access_token: String,
    tenant_id: String,
    batch_size: usize,
    limit: Option<usize>,
}

impl ExchangeClient {
    /// Create a client; the tenant is read from the token.
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let access_token = access_token.into();
        let tenant_id = auth::tenant_id(&access_token)?;
        debug!("Using tenant {tenant_id}");

        Ok(Self {
            agent: ureq::Agent::new_with_defaults(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
            tenant_id,
            batch_size: DEFAULT_BATCH_SIZE,
            limit: None,
        })
    }

    /// Set the number of permission requests per batch (at least 1).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Only process the first `limit` mailboxes.
    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn mailboxes_url(&self) -> String {
        format!("{}/adminapi/beta/{}/Mailbox", self.base_url, self.tenant_id)
    }

    fn permissions_url(&self, address: &str) -> String {
        format!(
            "{}/adminapi/beta/{}/Mailbox('{}')/MailboxPermission",
            self.base_url,
            self.tenant_id,
            STANDARD.encode(address)
        )
    }

    fn get(&self, url: &str) -> ureq::RequestBuilder<ureq::typestate::WithoutBody> {
        self.agent
            .get(url)
            .header("Accept", "application/json;odata.metadata=minimal")
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Prefer", "odata.maxpagesize=1000;")
            .header("OData-Version", "4.0")
            .header("OData-MaxVersion", "4.0")
    }

    /// List mailboxes. Entries that do not parse are logged and skipped.
    pub fn list_mailboxes(&self) -> Result<Vec<MailboxRecord>> {
        let response: ODataList<serde_json::Value> = self
            .get(&self.mailboxes_url())
            .query("$select", SELECTED_PROPERTIES.join(","))
            .call()?
            .body_mut()
            .read_json()?;

        let entries = response
            .value
            .ok_or_else(|| Error::InvalidResponse("mailbox list has no value".to_string()))?;
        let mailboxes = parse_mailboxes(entries);

        if mailboxes.is_empty() {
            return Err(Error::InvalidResponse(
                "no valid mailbox could be parsed from the response".to_string(),
            ));
        }
        Ok(mailboxes)
    }

    /// Permission grants on one mailbox.
    pub fn mailbox_permissions(&self, address: &str) -> Result<Vec<PermissionGrant>> {
        let response: ODataList<PermissionGrant> = self
            .get(&self.permissions_url(address))
            .query("isEncoded", "true")
            .call()?
            .body_mut()
            .read_json()?;

        Ok(response.value.unwrap_or_default())
    }
}

impl SourceDirectory for ExchangeClient {
    fn fetch_mailboxes(&self) -> Result<Vec<MailboxWithPermissions>> {
        let mut mailboxes = self.list_mailboxes()?;
        if let Some(limit) = self.limit {
            mailboxes.truncate(limit);
        }
        info!("Fetching permissions for {} mailboxes", mailboxes.len());

        let mut result = Vec::with_capacity(mailboxes.len());
        for (index, batch) in mailboxes.chunks(self.batch_size).enumerate() {
            debug!("Permission batch {} ({} mailboxes)", index + 1, batch.len());

            let fetched: Vec<MailboxWithPermissions> = batch
                .par_iter()
                .map(|mailbox| {
                    let permissions = self.mailbox_permissions(&mailbox.primary_smtp_address)?;
                    Ok(MailboxWithPermissions {
                        mailbox: mailbox.clone(),
                        permissions,
                    })
                })
                .collect::<Result<_>>()?;
            result.extend(fetched);
        }
        Ok(result)
    }
}

fn parse_mailboxes(entries: Vec<serde_json::Value>) -> Vec<MailboxRecord> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<MailboxRecord>(entry) {
            Ok(mailbox) => Some(mailbox),
            Err(e) => {
                warn!("Failed to parse mailbox: {e}");
                None
            }
        })
        .collect()
}
