use anyhow::{Context, Result, bail};
use connectors::DEFAULT_BATCH_SIZE;
use reconcile::ClaimedDomains;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of the environment variables that override the settings file
pub const ENV_PREFIX: &str = "CLOUD_SYNC__";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("cloud-sync"))
}

/// Get the default settings file path
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

fn default_source_url() -> String {
    connectors::DEFAULT_BASE_URL.to_string()
}

// ============================================================================
// Raw Settings
// ============================================================================

/// Settings as read, before validation. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub access_token: Option<String>,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub claimed_domains: Option<Vec<String>>,
    pub source_url: Option<String>,
    pub permission_batch_size: Option<usize>,
    pub mailbox_limit: Option<usize>,
}

impl RawSettings {
    /// Read the settings file, then `.env`, then the environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut raw = match path {
            Some(path) => Self::read(&expand(path))?,
            None => {
                let path = default_config_path()?;
                if path.exists() {
                    Self::read(&path)?
                } else {
                    log::debug!("No settings file at {}", path.display());
                    Self::default()
                }
            }
        };

        load_dotenv();
        raw.merge_env(|key| std::env::var(key).ok());
        Ok(raw)
    }

    /// Read a TOML settings file
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Override fields with the prefixed variables `lookup` knows about.
    /// Empty values count as unset.
    pub fn merge_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = var("ACCESS_TOKEN") {
            self.access_token = Some(value);
        }
        if let Some(value) = var("API_KEY") {
            self.api_key = Some(value);
        }
        if let Some(value) = var("API_URL") {
            self.api_url = Some(value);
        }
        if let Some(value) = var("SOURCE_URL") {
            self.source_url = Some(value);
        }
        if let Some(value) = var("CLAIMED_DOMAINS") {
            self.claimed_domains = Some(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|domain| !domain.is_empty())
                    .map(String::from)
                    .collect(),
            );
        }
    }

    /// Claimed domains, normalized
    pub fn claimed(&self) -> ClaimedDomains {
        ClaimedDomains::new(self.claimed_domains.iter().flatten())
    }

    /// `(name, value)` pairs for display, with secrets hidden
    pub fn redacted(&self) -> Vec<(&'static str, String)> {
        let secret = |value: &Option<String>| match value {
            Some(_) => "<redacted>".to_string(),
            None => "<unset>".to_string(),
        };
        let plain = |value: Option<String>| value.unwrap_or_else(|| "<unset>".to_string());

        vec![
            ("access_token", secret(&self.access_token)),
            ("api_key", secret(&self.api_key)),
            ("api_url", plain(self.api_url.clone())),
            (
                "claimed_domains",
                plain(self.claimed_domains.as_ref().map(|d| d.join(", "))),
            ),
            (
                "source_url",
                self.source_url.clone().unwrap_or_else(default_source_url),
            ),
            (
                "permission_batch_size",
                self.permission_batch_size
                    .unwrap_or(DEFAULT_BATCH_SIZE)
                    .to_string(),
            ),
            (
                "mailbox_limit",
                plain(self.mailbox_limit.map(|limit| limit.to_string())),
            ),
        ]
    }
}

fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).as_ref())
}

fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => log::debug!("Loaded {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring .env file: {e}"),
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Validated settings for a sync run
#[derive(Debug, Clone)]
pub struct Settings {
    /// When unset, a managed-identity token is requested
    pub access_token: Option<String>,
    pub api_key: String,
    pub api_url: String,
    pub claimed_domains: ClaimedDomains,
    pub source_url: String,
    pub permission_batch_size: usize,
    pub mailbox_limit: Option<usize>,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        RawSettings::load(path)?.try_into()
    }
}

impl TryFrom<RawSettings> for Settings {
    type Error = anyhow::Error;

    fn try_from(raw: RawSettings) -> Result<Self> {
        let claimed_domains = raw.claimed();
        let Some(api_key) = raw.api_key.filter(|key| !key.trim().is_empty()) else {
            bail!("api_key is not set (or set {ENV_PREFIX}API_KEY)");
        };
        let Some(api_url) = raw.api_url else {
            bail!("api_url is not set (or set {ENV_PREFIX}API_URL)");
        };
        if !api_url.starts_with("http") {
            bail!("api_url must start with http: {api_url}");
        }
        if api_url.ends_with('/') {
            bail!("api_url must not end with a trailing slash: {api_url}");
        }
        if claimed_domains.is_empty() {
            bail!("claimed_domains is empty (or set {ENV_PREFIX}CLAIMED_DOMAINS)");
        }
        if raw.permission_batch_size == Some(0) {
            bail!("permission_batch_size must be at least 1");
        }

        Ok(Self {
            access_token: raw.access_token,
            api_key,
            api_url,
            claimed_domains,
            source_url: raw.source_url.unwrap_or_else(default_source_url),
            permission_batch_size: raw.permission_batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            mailbox_limit: raw.mailbox_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn complete() -> RawSettings {
        RawSettings {
            api_key: Some("secret".to_string()),
            api_url: Some("https://app.example.test".to_string()),
            claimed_domains: Some(vec!["Acme.com".to_string()]),
            ..RawSettings::default()
        }
    }

    #[test]
    fn test_read_toml_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
api_key = "secret"
api_url = "https://app.example.test"
claimed_domains = ["acme.com", "acme.org"]
permission_batch_size = 4
"#,
        )
        .unwrap();

        let raw = RawSettings::read(&path).unwrap();
        assert_eq!(raw.permission_batch_size, Some(4));
        assert_eq!(raw.claimed().iter().count(), 2);
        assert!(raw.access_token.is_none());
    }

    #[test]
    fn test_read_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "api_key = [").unwrap();

        assert!(RawSettings::read(&path).is_err());
        assert!(RawSettings::read(&temp.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<String, String> = [
            ("CLOUD_SYNC__API_URL", "https://other.example.test"),
            ("CLOUD_SYNC__CLAIMED_DOMAINS", " acme.com, ,acme.org "),
            ("CLOUD_SYNC__API_KEY", "  "),
            ("API_URL", "https://ignored.example.test"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut raw = complete();
        raw.merge_env(|key| env.get(key).cloned());

        assert_eq!(raw.api_url.as_deref(), Some("https://other.example.test"));
        assert_eq!(
            raw.claimed_domains,
            Some(vec!["acme.com".to_string(), "acme.org".to_string()])
        );
        // blank values do not clear the file value
        assert_eq!(raw.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_validation_defaults() {
        let settings = Settings::try_from(complete()).unwrap();
        assert_eq!(settings.source_url, connectors::DEFAULT_BASE_URL);
        assert_eq!(settings.permission_batch_size, DEFAULT_BATCH_SIZE);
        assert!(settings.mailbox_limit.is_none());
        assert_eq!(settings.claimed_domains.iter().collect::<Vec<_>>(), vec!["acme.com"]);
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            RawSettings {
                api_key: None,
                ..complete()
            },
            RawSettings {
                api_url: Some("app.example.test".to_string()),
                ..complete()
            },
            RawSettings {
                api_url: Some("https://app.example.test/".to_string()),
                ..complete()
            },
            RawSettings {
                claimed_domains: Some(vec![" ".to_string()]),
                ..complete()
            },
            RawSettings {
                permission_batch_size: Some(0),
                ..complete()
            },
        ];

        for raw in cases {
            assert!(Settings::try_from(raw.clone()).is_err(), "{raw:?}");
        }
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let raw = RawSettings {
            access_token: Some("token".to_string()),
            ..complete()
        };
        let shown = raw.redacted();

        assert!(shown.iter().all(|(_, value)| value != "secret" && value != "token"));
        assert!(shown.contains(&("api_key", "<redacted>".to_string())));
        assert!(shown.contains(&("mailbox_limit", "<unset>".to_string())));
    }
}
