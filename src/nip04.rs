//! NIP-04: encrypted direct messages
//!
//! AES-256-CBC keyed with the raw ECDH x coordinate, content shaped as `base64(ct)?iv=base64(iv)`.

use aes::Aes256;
use base64::{engine::general_purpose, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use secp256k1::rand::RngCore;
use std::future::Future;
use thiserror::Error;

use crate::{
    keys::{KeyError, SharedSecret},
    PubKey, SecretKey, Tags,
};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

pub const IV_SEPARATOR: &str = "?iv=";
pub const IV_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("no 'p' tag to encrypt to")]
    NoRecipient,

    #[error("key error: {0}")]
    Key(#[from] KeyError),

    #[error("cipher failure: {0}")]
    Cipher(String),
}

#[derive(Error, Debug)]
pub enum DecryptionError {
    #[error("no 'p' tag to decrypt with")]
    MissingRecipient,

    #[error("content has no iv")]
    MissingIv,

    #[error("content has no ciphertext")]
    MissingCiphertext,

    #[error("iv should be 16 bytes, got {0}")]
    InvalidIvLength(usize),

    #[error("invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("key mismatch: secret key is neither the sender nor the recipient")]
    KeyMismatch,

    #[error("key error: {0}")]
    Key(#[from] KeyError),

    #[error("cipher failure: {0}")]
    Cipher(String),

    #[error("plaintext is not utf-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// encrypt `plaintext` from `sender` to `recipient`, returning the NIP-04 content string
pub fn encrypt(
    sender: &SecretKey,
    recipient: &PubKey,
    plaintext: &str,
) -> Result<String, EncryptionError> {
    let shared = sender.shared_secret(recipient)?;
    let iv = random_iv();
    let ciphertext = encrypt_bytes(&shared, &iv, plaintext.as_bytes())?;
    Ok(format_content(&ciphertext, &iv))
}

/// same as [`encrypt`] but the cipher itself is supplied by the caller
pub async fn encrypt_with<F, Fut>(
    sender: &SecretKey,
    recipient: &PubKey,
    plaintext: &str,
    cipher: F,
) -> Result<String, EncryptionError>
where
    F: FnOnce(SharedSecret, [u8; IV_LEN], Vec<u8>) -> Fut,
    Fut: Future<Output = Result<Vec<u8>, EncryptionError>>,
{
    let shared = sender.shared_secret(recipient)?;
    let iv = random_iv();
    let ciphertext = cipher(shared, iv, plaintext.as_bytes().to_vec()).await?;
    Ok(format_content(&ciphertext, &iv))
}

/// decrypt NIP-04 `content` exchanged with `counterparty`
pub fn decrypt(
    secret: &SecretKey,
    counterparty: &PubKey,
    content: &str,
) -> Result<String, DecryptionError> {
    let (ciphertext, iv) = split_content(content)?;
    let shared = secret.shared_secret(counterparty)?;
    let plaintext = decrypt_bytes(&shared, &iv, &ciphertext)?;
    Ok(String::from_utf8(plaintext)?)
}

/// same as [`decrypt`] but the cipher itself is supplied by the caller
pub async fn decrypt_with<F, Fut>(
    secret: &SecretKey,
    counterparty: &PubKey,
    content: &str,
    cipher: F,
) -> Result<String, DecryptionError>
where
    F: FnOnce(SharedSecret, [u8; IV_LEN], Vec<u8>) -> Fut,
    Fut: Future<Output = Result<Vec<u8>, DecryptionError>>,
{
    let (ciphertext, iv) = split_content(content)?;
    let shared = secret.shared_secret(counterparty)?;
    let plaintext = cipher(shared, iv, ciphertext).await?;
    Ok(String::from_utf8(plaintext)?)
}

/// figure out who is on the other side of a message between `author` and its first `p` tag
pub fn counterparty(
    author: &PubKey,
    tags: &Tags,
    secret: &SecretKey,
) -> Result<PubKey, DecryptionError> {
    let recipient_tag = tags.find("p").ok_or(DecryptionError::MissingRecipient)?;
    let recipient = PubKey::from_hex(&recipient_tag[1])?;

    let ours = secret.pubkey();
    if ours == *author {
        Ok(recipient)
    } else if ours == recipient {
        Ok(*author)
    } else {
        Err(DecryptionError::KeyMismatch)
    }
}

pub fn encrypt_bytes(
    shared: &SharedSecret,
    iv: &[u8; IV_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let cipher = Aes256CbcEnc::new_from_slices(shared.as_bytes(), iv)
        .map_err(|err| EncryptionError::Cipher(err.to_string()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

pub fn decrypt_bytes(
    shared: &SharedSecret,
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, DecryptionError> {
    let cipher = Aes256CbcDec::new_from_slices(shared.as_bytes(), iv)
        .map_err(|err| DecryptionError::Cipher(err.to_string()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| DecryptionError::Cipher("bad padding".to_string()))
}

pub fn format_content(ciphertext: &[u8], iv: &[u8]) -> String {
    format!(
        "{}{}{}",
        general_purpose::STANDARD.encode(ciphertext),
        IV_SEPARATOR,
        general_purpose::STANDARD.encode(iv)
    )
}

/// split into (ciphertext, iv)
pub fn split_content(content: &str) -> Result<(Vec<u8>, [u8; IV_LEN]), DecryptionError> {
    let (ciphertext, iv) = content
        .split_once(IV_SEPARATOR)
        .ok_or(DecryptionError::MissingIv)?;
    if ciphertext.is_empty() {
        return Err(DecryptionError::MissingCiphertext);
    }
    if iv.is_empty() {
        return Err(DecryptionError::MissingIv);
    }

    let ciphertext = general_purpose::STANDARD.decode(ciphertext)?;
    let iv = general_purpose::STANDARD.decode(iv)?;
    let iv: [u8; IV_LEN] = iv
        .as_slice()
        .try_into()
        .map_err(|_| DecryptionError::InvalidIvLength(iv.len()))?;

    Ok((ciphertext, iv))
}

fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    secp256k1::rand::thread_rng().fill_bytes(&mut iv);
    iv
}
