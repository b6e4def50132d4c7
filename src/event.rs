use crate::{
    nip04::{self, DecryptionError},
    keys::SharedSecret,
    Kind, PubKey, SecretKey, Signature, Tags, Timestamp, ID,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{fmt, future::Future};

/// represents a signed nostr event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: ID,
    pub pubkey: PubKey,
    pub created_at: Timestamp,
    pub kind: Kind,
    pub tags: Tags,
    pub content: String,
    pub sig: Signature,
}

/// the exact bytes that get hashed into an event id:
/// `[0,"<pubkey hex>",<created_at>,<kind>,<tags>,"<content>"]` with no whitespace
pub fn canonical_form(
    pubkey: &PubKey,
    created_at: Timestamp,
    kind: Kind,
    tags: &Tags,
    content: &str,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&(0, pubkey, created_at, kind, tags, content))
}

pub fn compute_id(
    pubkey: &PubKey,
    created_at: Timestamp,
    kind: Kind,
    tags: &Tags,
    content: &str,
) -> Result<ID, serde_json::Error> {
    let serialized = canonical_form(pubkey, created_at, kind, tags, content)?;
    Ok(ID::from_bytes(Sha256::digest(&serialized).into()))
}

impl Event {
    /// serialize the event for ID computation
    pub fn serialize(&self) -> Result<Vec<u8>, serde_json::Error> {
        canonical_form(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )
    }

    pub fn compute_id(&self) -> Result<ID, serde_json::Error> {
        compute_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )
    }

    /// check if the event ID matches the computed ID
    pub fn check_id(&self) -> bool {
        self.compute_id().is_ok_and(|id| id == self.id)
    }

    /// check the signature against the id we recompute, not the one we were given
    pub fn verify_signature(&self) -> bool {
        match self.compute_id() {
            Ok(id) => self.pubkey.verify(&self.sig, id.as_bytes()),
            Err(_) => false,
        }
    }

    /// id matches the content and the signature is valid
    pub fn verify(&self) -> bool {
        self.check_id() && self.pubkey.verify(&self.sig, self.id.as_bytes())
    }

    /// `<kind>:<pubkey>:<d tag>`, the address of replaceable events
    pub fn coordinates(&self) -> String {
        format!("{}:{}:{}", self.kind, self.pubkey.to_hex(), self.tags.get_d())
    }

    /// decrypt NIP-04 content, works for both the author and the tagged recipient
    pub fn decrypt(&self, secret_key: &SecretKey) -> Result<String, DecryptionError> {
        let other = nip04::counterparty(&self.pubkey, &self.tags, secret_key)?;
        nip04::decrypt(secret_key, &other, &self.content)
    }

    /// like [`Event::decrypt`] but the AES-CBC step is performed by `cipher`
    pub async fn decrypt_with<F, Fut>(
        &self,
        secret_key: &SecretKey,
        cipher: F,
    ) -> Result<String, DecryptionError>
    where
        F: FnOnce(SharedSecret, [u8; nip04::IV_LEN], Vec<u8>) -> Fut,
        Fut: Future<Output = Result<Vec<u8>, DecryptionError>>,
    {
        let other = nip04::counterparty(&self.pubkey, &self.tags, secret_key)?;
        nip04::decrypt_with(secret_key, &other, &self.content, cipher).await
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{}", json),
            Err(err) => write!(f, "Event({} >> {})", self.id, err),
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl std::hash::Hash for Event {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
