use std::time::Duration;

use crate::normalize::normalize_url;

#[derive(thiserror::Error, Debug)]
pub enum RelayInformationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay answered with status {0}")]
    Status(reqwest::StatusCode),

    #[error("URL normalization error")]
    Normalize(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, RelayInformationError>;

const FETCH_TIMEOUT: Duration = Duration::from_secs(7);

/// NIP-11 relay information document
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, Default)]
pub struct RelayInformationDocument {
    #[serde(skip)]
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pubkey: Option<crate::PubKey>,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub software: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub supported_nips: Vec<u32>,
    #[serde(default)]
    pub icon: String,
}

impl RelayInformationDocument {
    pub fn supports(&self, nip: u32) -> bool {
        self.supported_nips.contains(&nip)
    }
}

/// fetch the information document of a relay over http(s)
pub async fn fetch(url: &str) -> Result<RelayInformationDocument> {
    let normalized_url = normalize_url(url)?;

    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;

    // ws://host -> http://host, wss://host -> https://host
    let response = client
        .get(format!("http{}", &normalized_url.as_str()[2..]))
        .header("Accept", "application/nostr+json")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(RelayInformationError::Status(response.status()));
    }

    let mut info: RelayInformationDocument = response.json().await?;
    info.url = normalized_url.to_string();
    if info.name.is_empty() {
        info.name = normalized_url.host_str().unwrap_or_default().to_string();
    }

    Ok(info)
}
