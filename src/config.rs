use std::time::Duration;

use serde::{de::Error, Deserialize, Deserializer, Serialize};
use url::Url;

use crate::{keys::Keys, normalize::normalize_url};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// what we are allowed to do on a relay; `None` means we don't know, which allows it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayPermissions {
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub write: Option<bool>,
}

impl RelayPermissions {
    pub fn read_only() -> Self {
        Self {
            read: Some(true),
            write: Some(false),
        }
    }

    pub fn write_only() -> Self {
        Self {
            read: Some(false),
            write: Some(true),
        }
    }

    pub fn can_read(&self) -> bool {
        self.read != Some(false)
    }

    pub fn can_write(&self) -> bool {
        self.write != Some(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(deserialize_with = "deserialize_relay_url")]
    pub url: Url,
    #[serde(default)]
    pub permissions: RelayPermissions,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    /// fetch the NIP-11 document on every connect
    #[serde(default = "default_fetch_capabilities")]
    pub fetch_capabilities: bool,
}

/// loaded urls go through the same normalization as [`RelayConfig::new`]
fn deserialize_relay_url<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Url, D::Error> {
    let raw = String::deserialize(deserializer)?;
    normalize_url(&raw).map_err(D::Error::custom)
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_fetch_capabilities() -> bool {
    true
}

impl RelayConfig {
    pub fn new(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: normalize_url(url)?,
            permissions: RelayPermissions::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            fetch_capabilities: true,
        })
    }

    pub fn with_permissions(mut self, permissions: RelayPermissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_fetch_capabilities(mut self, fetch: bool) -> Self {
        self.fetch_capabilities = fetch;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolOptions {
    /// used to sign what the pool publishes and authenticates with, given as npub or nsec
    #[serde(default, deserialize_with = "deserialize_keys")]
    pub keys: Option<Keys>,
}

fn deserialize_keys<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Keys>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => Keys::parse_optional(&raw).map_err(D::Error::custom),
        None => Ok(None),
    }
}
