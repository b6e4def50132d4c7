use std::future::Future;

use crate::{
    event::{canonical_form, compute_id},
    keys::{SharedSecret, SigningError},
    nip04::{self, DecryptionError, EncryptionError},
    Event, Kind, PubKey, SecretKey, Tags, Timestamp,
};

/// an event that hasn't been signed yet
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct EventTemplate {
    pub created_at: Timestamp,
    pub kind: Kind,
    pub tags: Tags,
    pub content: String,
}

impl EventTemplate {
    /// tags outside 1 to 5 strings and repeated (key, value) pairs are dropped here
    pub fn new(kind: impl Into<Kind>, tags: impl Into<Tags>, content: impl Into<String>) -> Self {
        Self {
            created_at: Timestamp::now(),
            kind: kind.into(),
            tags: tags.into().deduplicated(),
            content: content.into(),
        }
    }

    /// NIP-42 authentication event answering `challenge` from `relay_url`
    pub fn auth(relay_url: &str, challenge: &str) -> Self {
        Self::new(
            Kind(22242),
            vec![
                vec!["relay".to_string(), relay_url.to_string()],
                vec!["challenge".to_string(), challenge.to_string()],
            ],
            "",
        )
    }

    pub fn serialize(&self, pubkey: &PubKey) -> Result<Vec<u8>, serde_json::Error> {
        canonical_form(pubkey, self.created_at, self.kind, &self.tags, &self.content)
    }

    /// returns a signed event with id, pubkey and sig, keeping `created_at` as it is
    pub fn finalize(self, secret_key: &SecretKey) -> Result<Event, SigningError> {
        let pubkey = secret_key.pubkey();
        finalize_as(self, pubkey, secret_key)
    }

    /// stamps the current time and signs
    pub fn sign(mut self, secret_key: &SecretKey) -> Result<Event, SigningError> {
        self.created_at = Timestamp::now();
        self.finalize(secret_key)
    }

    /// first `p` tag
    pub fn recipient(&self) -> Option<&str> {
        self.tags.find("p").map(|tag| tag[1].as_str())
    }

    /// NIP-04 encrypt the content to the first `p` tag; `self` is left as it was
    pub fn encrypt(&self, sender: &SecretKey) -> Result<EncryptedTemplate, EncryptionError> {
        let recipient = self.recipient_key()?;
        let content = nip04::encrypt(sender, &recipient, &self.content)?;
        Ok(self.encrypted(sender.pubkey(), content))
    }

    /// like [`EventTemplate::encrypt`] but the AES-CBC step is performed by `cipher`
    pub async fn encrypt_with<F, Fut>(
        &self,
        sender: &SecretKey,
        cipher: F,
    ) -> Result<EncryptedTemplate, EncryptionError>
    where
        F: FnOnce(SharedSecret, [u8; nip04::IV_LEN], Vec<u8>) -> Fut,
        Fut: Future<Output = Result<Vec<u8>, EncryptionError>>,
    {
        let recipient = self.recipient_key()?;
        let content = nip04::encrypt_with(sender, &recipient, &self.content, cipher).await?;
        Ok(self.encrypted(sender.pubkey(), content))
    }

    fn recipient_key(&self) -> Result<PubKey, EncryptionError> {
        let recipient = self.recipient().ok_or(EncryptionError::NoRecipient)?;
        Ok(PubKey::from_hex(recipient)?)
    }

    fn encrypted(&self, pubkey: PubKey, content: String) -> EncryptedTemplate {
        EncryptedTemplate {
            pubkey,
            template: EventTemplate {
                created_at: Timestamp::now(),
                kind: self.kind,
                tags: self.tags.clone(),
                content,
            },
        }
    }
}

impl std::fmt::Display for EventTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EventTemplate({}, {}, {}, {})",
            self.kind, self.created_at, self.tags, self.content
        )
    }
}

/// a template whose content is already NIP-04 ciphertext, bound to its sender
#[derive(Debug, Clone)]
pub struct EncryptedTemplate {
    pubkey: PubKey,
    template: EventTemplate,
}

impl EncryptedTemplate {
    pub fn pubkey(&self) -> &PubKey {
        &self.pubkey
    }

    pub fn created_at(&self) -> Timestamp {
        self.template.created_at
    }

    pub fn kind(&self) -> Kind {
        self.template.kind
    }

    pub fn tags(&self) -> &Tags {
        &self.template.tags
    }

    pub fn content(&self) -> &str {
        &self.template.content
    }

    /// sign keeping the encryption timestamp; only the sender can do it
    pub fn finalize(self, secret_key: &SecretKey) -> Result<Event, SigningError> {
        if secret_key.pubkey() != self.pubkey {
            return Err(SigningError::KeyMismatch);
        }
        finalize_as(self.template, self.pubkey, secret_key)
    }

    /// stamps the current time and signs
    pub fn sign(mut self, secret_key: &SecretKey) -> Result<Event, SigningError> {
        self.template.created_at = Timestamp::now();
        self.finalize(secret_key)
    }

    pub fn decrypt(&self, secret_key: &SecretKey) -> Result<String, DecryptionError> {
        let other = nip04::counterparty(&self.pubkey, &self.template.tags, secret_key)?;
        nip04::decrypt(secret_key, &other, &self.template.content)
    }

    pub async fn decrypt_with<F, Fut>(
        &self,
        secret_key: &SecretKey,
        cipher: F,
    ) -> Result<String, DecryptionError>
    where
        F: FnOnce(SharedSecret, [u8; nip04::IV_LEN], Vec<u8>) -> Fut,
        Fut: Future<Output = Result<Vec<u8>, DecryptionError>>,
    {
        let other = nip04::counterparty(&self.pubkey, &self.template.tags, secret_key)?;
        nip04::decrypt_with(secret_key, &other, &self.template.content, cipher).await
    }
}

fn finalize_as(
    template: EventTemplate,
    pubkey: PubKey,
    secret_key: &SecretKey,
) -> Result<Event, SigningError> {
    // no signature is attempted if the id can't be computed
    let id = compute_id(
        &pubkey,
        template.created_at,
        template.kind,
        &template.tags,
        &template.content,
    )?;

    let sig = secret_key.sign(id.as_bytes());
    if !pubkey.verify(&sig, id.as_bytes()) {
        return Err(SigningError::Verification);
    }

    Ok(Event {
        id,
        pubkey,
        sig,
        kind: template.kind,
        tags: template.tags,
        created_at: template.created_at,
        content: template.content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dm_to(recipient: &PubKey, content: &str) -> EventTemplate {
        EventTemplate::new(
            Kind(4),
            vec![vec!["p".to_string(), recipient.to_hex()]],
            content,
        )
    }

    #[test]
    fn test_new_deduplicates_tags() {
        let template = EventTemplate::new(
            Kind(1),
            vec![
                vec!["p".to_string(), "aa".to_string()],
                vec!["p".to_string(), "aa".to_string(), "wss://relay".to_string()],
                vec![],
            ],
            "hi",
        );
        assert_eq!(template.tags.0, vec![vec!["p".to_string(), "aa".to_string()]]);
    }

    #[test]
    fn test_new_drops_oversized_tags() {
        let tag = |n: usize| -> Vec<String> { (0..n).map(|i| format!("v{}", i)).collect() };
        let template = EventTemplate::new(Kind(1), vec![tag(6), tag(1), tag(5)], "");
        assert_eq!(template.tags.0, vec![tag(1), tag(5)]);
    }

    #[test]
    fn test_finalize_keeps_timestamp() {
        let sk = SecretKey::generate();
        let mut template = EventTemplate::new(Kind(1), Tags::default(), "old");
        template.created_at = Timestamp(1234);

        let event = template.clone().finalize(&sk).unwrap();
        assert_eq!(event.created_at, Timestamp(1234));
        assert!(event.verify());

        let event = template.sign(&sk).unwrap();
        assert!(event.created_at.0 > 1234);
        assert!(event.verify());
    }

    #[test]
    fn test_encrypt_sign_decrypt() {
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();

        let template = dm_to(&bob.pubkey(), "hi bob");
        let encrypted = template.encrypt(&alice).unwrap();

        // the template itself is untouched
        assert_eq!(template.content, "hi bob");
        assert_ne!(encrypted.content(), "hi bob");
        assert!(encrypted.content().contains("?iv="));
        assert_eq!(encrypted.pubkey(), &alice.pubkey());

        // readable before signing
        assert_eq!(encrypted.decrypt(&bob).unwrap(), "hi bob");

        let event = encrypted.sign(&alice).unwrap();
        assert!(event.verify());
        assert_eq!(event.decrypt(&bob).unwrap(), "hi bob");
        assert_eq!(event.decrypt(&alice).unwrap(), "hi bob");
    }

    #[test]
    fn test_encrypt_needs_recipient() {
        let alice = SecretKey::generate();
        let template = EventTemplate::new(Kind(4), Tags::default(), "to nobody");
        assert!(matches!(
            template.encrypt(&alice),
            Err(EncryptionError::NoRecipient)
        ));

        let template = EventTemplate::new(
            Kind(4),
            vec![vec!["p".to_string(), "not-a-key".to_string()]],
            "to garbage",
        );
        assert!(matches!(template.encrypt(&alice), Err(EncryptionError::Key(_))));
    }

    #[test]
    fn test_only_sender_signs_encrypted() {
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();
        let encrypted = dm_to(&bob.pubkey(), "x").encrypt(&alice).unwrap();
        assert!(matches!(
            encrypted.sign(&bob),
            Err(SigningError::KeyMismatch)
        ));
    }

    #[test]
    fn test_decrypt_key_mismatch() {
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();
        let eve = SecretKey::generate();

        let event = dm_to(&bob.pubkey(), "private")
            .encrypt(&alice)
            .unwrap()
            .sign(&alice)
            .unwrap();
        assert!(matches!(
            event.decrypt(&eve),
            Err(DecryptionError::KeyMismatch)
        ));
    }

    #[test]
    fn test_decrypt_missing_recipient() {
        let alice = SecretKey::generate();
        let event = EventTemplate::new(Kind(4), Tags::default(), "abc?iv=def")
            .sign(&alice)
            .unwrap();
        assert!(matches!(
            event.decrypt(&alice),
            Err(DecryptionError::MissingRecipient)
        ));
    }

    #[tokio::test]
    async fn test_hooks() {
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();

        let event = dm_to(&bob.pubkey(), "via hooks")
            .encrypt_with(&alice, |shared, iv, plain| async move {
                nip04::encrypt_bytes(&shared, &iv, &plain)
            })
            .await
            .unwrap()
            .sign(&alice)
            .unwrap();

        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let plaintext = event
            .decrypt_with(&bob, |shared, iv, ct| async move {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                tokio::task::yield_now().await;
                nip04::decrypt_bytes(&shared, &iv, &ct)
            })
            .await
            .unwrap();

        assert_eq!(plaintext, "via hooks");
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_auth_template() {
        let template = EventTemplate::auth("wss://relay.example.com/", "chall3nge");
        assert_eq!(template.kind, Kind(22242));
        assert_eq!(
            template.tags.find("relay").unwrap()[1],
            "wss://relay.example.com/"
        );
        assert_eq!(template.tags.find("challenge").unwrap()[1], "chall3nge");
        assert_eq!(template.content, "");
    }
}
