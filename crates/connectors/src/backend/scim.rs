//! SCIM 2.0 target backend.

use crate::backend::TargetDirectory;
use crate::error::{Error, Result};
use crate::types::{Created, GroupRequest, ListResponse, PatchRequest, UserRequest};
use log::debug;
use reconcile::target::{ScimGroup, ScimUser};
use serde::Serialize;
use uuid::Uuid;

const SCIM_CONTENT_TYPE: &str = "application/scim+json";

#[derive(Debug, Clone, Copy)]
enum Method {
    Post,
    Put,
    Patch,
}

/// Target directory backed by a SCIM 2.0 API.
pub struct ScimClient {
    agent: ureq::Agent,
    api_url: String,
    api_key: String,
    user_agent: String,
}

impl ScimClient {
    /// Create a client for `api_url` (without the `/scim/v2` suffix).
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let api_url = api_url.into();
        if !api_url.starts_with("http") {
            return Err(Error::Config(format!("API URL must start with http: {api_url}")));
        }
        if api_url.ends_with('/') {
            return Err(Error::Config(format!(
                "API URL must not end with a trailing slash: {api_url}"
            )));
        }

        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            agent,
            api_url,
            api_key: api_key.into(),
            user_agent: format!("CloudSync/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    fn users_url(&self) -> String {
        format!("{}/scim/v2/Users", self.api_url)
    }

    fn groups_url(&self) -> String {
        format!("{}/scim/v2/Groups", self.api_url)
    }

    fn list<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let mut response = self
            .agent
            .get(url)
            .header("Accept", SCIM_CONTENT_TYPE)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("User-Agent", &self.user_agent)
            .call()?;
        expect_status(&mut response, 200)?;

        let list: ListResponse<T> = response.body_mut().read_json()?;
        Ok(list.resources)
    }

    fn send<B: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: &B,
        expected: u16,
    ) -> Result<ureq::http::Response<ureq::Body>> {
        let payload = serde_json::to_string(body)?;
        debug!("{method:?} {url} {payload}");

        let request = match method {
            Method::Post => self.agent.post(url),
            Method::Put => self.agent.put(url),
            Method::Patch => self.agent.patch(url),
        };
        let mut response = request
            .header("Accept", SCIM_CONTENT_TYPE)
            .header("Content-Type", SCIM_CONTENT_TYPE)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("User-Agent", &self.user_agent)
            .send(payload.as_bytes())?;

        expect_status(&mut response, expected)?;
        Ok(response)
    }
}

/// Fail with the response body unless the status is `expected`.
fn expect_status(response: &mut ureq::http::Response<ureq::Body>, expected: u16) -> Result<()> {
    let status = response.status().as_u16();
    if status == expected {
        return Ok(());
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(Error::http(
        format!("expected HTTP {expected}, got {status}: {body}"),
        Some(status),
    ))
}

impl TargetDirectory for ScimClient {
    fn list_users(&self) -> Result<Vec<ScimUser>> {
        self.list(&self.users_url())
    }

    fn list_groups(&self) -> Result<Vec<ScimGroup>> {
        self.list(&self.groups_url())
    }

    fn create_user(&self, request: &UserRequest) -> Result<Uuid> {
        let created: Created = self
            .send(Method::Post, &self.users_url(), request, 201)?
            .body_mut()
            .read_json()?;
        Ok(created.id)
    }

    fn create_group(&self, request: &GroupRequest) -> Result<Uuid> {
        let created: Created = self
            .send(Method::Post, &self.groups_url(), request, 201)?
            .body_mut()
            .read_json()?;
        Ok(created.id)
    }

    fn replace_user(&self, id: Uuid, request: &UserRequest) -> Result<()> {
        let url = format!("{}/{id}", self.users_url());
        self.send(Method::Put, &url, request, 200).map(drop)
    }

    fn replace_group(&self, id: Uuid, request: &GroupRequest) -> Result<()> {
        let url = format!("{}/{id}", self.groups_url());
        self.send(Method::Put, &url, request, 200).map(drop)
    }

    fn remove_all_members(&self, id: Uuid) -> Result<()> {
        let url = format!("{}/{id}", self.groups_url());
        self.send(Method::Patch, &url, &PatchRequest::remove_all_members(), 200)
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_validation() {
        assert!(ScimClient::new("https://app.example.test", "key").is_ok());
        assert!(matches!(
            ScimClient::new("app.example.test", "key"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ScimClient::new("https://app.example.test/", "key"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_resource_urls() {
        let client = ScimClient::new("https://app.example.test", "key").unwrap();
        assert_eq!(client.users_url(), "https://app.example.test/scim/v2/Users");
        assert_eq!(client.groups_url(), "https://app.example.test/scim/v2/Groups");
        assert!(client.user_agent.starts_with("CloudSync/"));
    }
}
