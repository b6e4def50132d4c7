use crate::{
    encoding::{self, EncodingError},
    Signature,
};
use secp256k1::{
    ecdh, global::SECP256K1, rand::RngCore, schnorr, Keypair, Message, XOnlyPublicKey,
};
use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroize;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("invalid hex encoding")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("key should be 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid secret key")]
    InvalidSecretKey,

    #[error("public key not in curve")]
    NotInCurve,

    #[error("failed to derive key material: {0}")]
    Derivation(secp256k1::Error),

    #[error("bech32 error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("expected {expected} prefix, got '{got}'")]
    WrongPrefix { expected: &'static str, got: String },
}

#[derive(Error, Debug)]
pub enum SigningError {
    #[error("failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("produced signature did not verify")]
    Verification,

    #[error("content was encrypted by a different key")]
    KeyMismatch,
}

/// a secp256k1 secret key, erased when dropped
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(secp256k1::SecretKey);

impl SecretKey {
    /// generate a new random secret key
    pub fn generate() -> Self {
        let mut rng = secp256k1::rand::thread_rng();
        let mut bytes = [0u8; 32];
        loop {
            rng.fill_bytes(&mut bytes);
            // a draw outside the curve order is astronomically unlikely but possible
            if let Ok(sk) = secp256k1::SecretKey::from_slice(&bytes) {
                bytes.zeroize();
                return Self(sk);
            }
        }
    }

    pub fn from_bytes(mut bytes: [u8; 32]) -> Result<Self, KeyError> {
        let sk = secp256k1::SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidSecretKey);
        bytes.zeroize();
        Ok(Self(sk?))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != 32 {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        secp256k1::SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| KeyError::InvalidSecretKey)
    }

    /// import from hex, shorter strings are left-padded with zeroes
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let hex_str = hex_str.trim();
        if hex_str.len() > 64 {
            return Err(KeyError::InvalidLength(hex_str.len() / 2));
        }
        let mut padded = format!("{:0>64}", hex_str);

        let mut bytes = [0u8; 32];
        let decoded = hex::decode_to_slice(&padded, &mut bytes);
        padded.zeroize();
        decoded?;

        Self::from_bytes(bytes)
    }

    /// import an `nsec1...` string
    pub fn from_bech32(nsec: &str) -> Result<Self, KeyError> {
        let (prefix, mut data) = encoding::decode(nsec)?;
        if prefix != "nsec" {
            return Err(KeyError::WrongPrefix {
                expected: "nsec",
                got: prefix,
            });
        }
        let sk = Self::from_slice(&data);
        data.zeroize();
        sk
    }

    /// explicit export
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.secret_bytes())
    }

    /// explicit export as `nsec1...`
    pub fn to_bech32(&self) -> Result<String, KeyError> {
        let mut bytes = self.0.secret_bytes();
        let encoded = encoding::encode("nsec", &bytes);
        bytes.zeroize();
        Ok(encoded?)
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.0.secret_bytes()
    }

    /// get the public key for this secret key
    pub fn pubkey(&self) -> PubKey {
        let keypair = Keypair::from_secret_key(SECP256K1, &self.0);
        let (xonly_pk, _) = XOnlyPublicKey::from_keypair(&keypair);
        PubKey(xonly_pk.serialize())
    }

    /// NIP-04 style ECDH: the peer is assumed to have an even y and only x is kept
    pub fn shared_secret(&self, peer: &PubKey) -> Result<SharedSecret, KeyError> {
        let mut point = ecdh::shared_secret_point(&peer.to_ecdsa_key()?, &self.0);
        let mut x = [0u8; 32];
        x.copy_from_slice(&point[..32]);
        point.zeroize();
        Ok(SharedSecret(x))
    }

    /// BIP-340 signature over a 32-byte hash
    pub fn sign(&self, hash: &[u8; 32]) -> Signature {
        let keypair = Keypair::from_secret_key(SECP256K1, &self.0);
        let signature = SECP256K1.sign_schnorr(&Message::from_digest(*hash), &keypair);
        Signature::from_bytes(signature.serialize())
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.non_secure_erase();
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<sk:{}>", self.pubkey().to_hex())
    }
}

/// a 32-byte x-only public key
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PubKey(pub [u8; 32]);

impl PubKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, KeyError> {
        // ensure the public key is valid
        let _ = XOnlyPublicKey::from_slice(&bytes).map_err(|_| KeyError::NotInCurve)?;
        Ok(Self(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// accepts either case
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        if hex_str.len() != 64 {
            return Err(KeyError::InvalidLength(hex_str.len() / 2));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex_str, &mut bytes)?;
        Self::from_bytes(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// import an `npub1...` string
    pub fn from_bech32(npub: &str) -> Result<Self, KeyError> {
        let (prefix, data) = encoding::decode(npub)?;
        if prefix != "npub" {
            return Err(KeyError::WrongPrefix {
                expected: "npub",
                got: prefix,
            });
        }
        Self::from_slice(&data)
    }

    pub fn to_bech32(&self) -> Result<String, KeyError> {
        Ok(encoding::encode("npub", &self.0)?)
    }

    /// full point with the 0x02 (even y) prefix
    pub fn to_ecdsa_key(&self) -> Result<secp256k1::PublicKey, KeyError> {
        let mut buf = [0u8; 33];
        buf[0] = 2;
        buf[1..].copy_from_slice(&self.0);
        secp256k1::PublicKey::from_slice(&buf).map_err(KeyError::Derivation)
    }

    /// never fails, malformed input just doesn't verify
    pub fn verify(&self, signature: &Signature, hash: &[u8; 32]) -> bool {
        let Ok(pubkey) = XOnlyPublicKey::from_slice(&self.0) else {
            return false;
        };
        let Ok(signature) = schnorr::Signature::from_slice(signature.as_bytes()) else {
            return false;
        };
        SECP256K1
            .verify_schnorr(&signature, &Message::from_digest(*hash), &pubkey)
            .is_ok()
    }
}

impl Serialize for PubKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PubKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PubKey::from_hex(&s).map_err(Error::custom)
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<pk:{}>", self.to_hex())
    }
}

impl fmt::Display for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// x coordinate of an ECDH point, used directly as the NIP-04 AES key
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<shared secret>")
    }
}

/// what we know about an identity: only its public key, or its secret too
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keys {
    PublicOnly(PubKey),
    WithSecret(SecretKey),
}

impl Keys {
    pub fn generate() -> Self {
        Keys::WithSecret(SecretKey::generate())
    }

    pub fn public_from_hex(hex_str: &str) -> Result<Self, KeyError> {
        PubKey::from_hex(hex_str).map(Keys::PublicOnly)
    }

    pub fn secret_from_hex(hex_str: &str) -> Result<Self, KeyError> {
        SecretKey::from_hex(hex_str).map(Keys::WithSecret)
    }

    /// the bech32 prefix decides which variant we get
    pub fn parse(bech32: &str) -> Result<Self, KeyError> {
        let (prefix, mut data) = encoding::decode(bech32)?;
        let keys = match prefix.as_str() {
            "npub" => PubKey::from_slice(&data).map(Keys::PublicOnly),
            "nsec" => SecretKey::from_slice(&data).map(Keys::WithSecret),
            _ => Err(KeyError::WrongPrefix {
                expected: "npub or nsec",
                got: prefix,
            }),
        };
        data.zeroize();
        keys
    }

    /// empty input means no key was configured
    pub fn parse_optional(bech32: &str) -> Result<Option<Self>, KeyError> {
        let Some((prefix, mut data)) = encoding::decode_optional(bech32)? else {
            return Ok(None);
        };
        let keys = match prefix.as_str() {
            "npub" => PubKey::from_slice(&data).map(Keys::PublicOnly),
            "nsec" => SecretKey::from_slice(&data).map(Keys::WithSecret),
            _ => Err(KeyError::WrongPrefix {
                expected: "npub or nsec",
                got: prefix,
            }),
        };
        data.zeroize();
        keys.map(Some)
    }

    pub fn pubkey(&self) -> PubKey {
        match self {
            Keys::PublicOnly(pk) => *pk,
            Keys::WithSecret(sk) => sk.pubkey(),
        }
    }

    pub fn secret_key(&self) -> Option<&SecretKey> {
        match self {
            Keys::PublicOnly(_) => None,
            Keys::WithSecret(sk) => Some(sk),
        }
    }

    pub fn can_sign(&self) -> bool {
        matches!(self, Keys::WithSecret(_))
    }
}

impl From<SecretKey> for Keys {
    fn from(sk: SecretKey) -> Self {
        Keys::WithSecret(sk)
    }
}

impl From<PubKey> for Keys {
    fn from(pk: PubKey) -> Self {
        Keys::PublicOnly(pk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    const SK_HEX: &str = "fe20f3381b9404e9a35afb49b3dc070a4dc1ffd321ab8f3eae979ab96f601e3a";
    const NSEC: &str = "nsec1lcs0xwqmjszwng66ldym8hq8pfxurl7nyx4c704wj7dtjmmqrcaqazp4dg";
    const PK_HEX: &str = "d91191e30e00444b942c0e82cad470b32af171764c2275bee0bd99377efd4075";
    const NPUB: &str = "npub1mygerccwqpzyh9pvp6pv44rskv40zutkfs38t0hqhkvnwlhagp6s3psn5p";

    #[test]
    fn test_secret_key_import_export() {
        let sk = SecretKey::from_hex(SK_HEX).unwrap();
        assert_eq!(sk.to_hex(), SK_HEX);
        assert_eq!(sk.to_bech32().unwrap(), NSEC);
        assert_eq!(SecretKey::from_bech32(NSEC).unwrap(), sk);
        assert_eq!(SecretKey::from_hex(&SK_HEX.to_uppercase()).unwrap(), sk);
    }

    #[test]
    fn test_secret_key_rejects_bad_input() {
        assert!(SecretKey::from_hex(&"00".repeat(32)).is_err());
        assert!(SecretKey::from_hex(&"ff".repeat(32)).is_err());
        assert!(SecretKey::from_hex(&"a".repeat(65)).is_err());
        assert!(SecretKey::from_hex("zz").is_err());
        assert!(SecretKey::from_bech32(NPUB).is_err());
    }

    #[test]
    fn test_short_hex_is_padded() {
        let sk = SecretKey::from_hex("1").unwrap();
        assert_eq!(sk.to_hex(), format!("{}1", "0".repeat(63)));
    }

    #[test]
    fn test_debug_does_not_leak() {
        let sk = SecretKey::from_hex(SK_HEX).unwrap();
        let debug = format!("{:?}", sk);
        assert!(!debug.contains(SK_HEX));
        let keys = Keys::WithSecret(sk);
        assert!(!format!("{:?}", keys).contains(SK_HEX));
    }

    #[test]
    fn test_pubkey_import_export() {
        let pk = PubKey::from_hex(PK_HEX).unwrap();
        assert_eq!(pk.to_bech32().unwrap(), NPUB);
        assert_eq!(PubKey::from_bech32(NPUB).unwrap(), pk);

        // equality is over the bytes, so hex case does not matter
        assert_eq!(PubKey::from_hex(&PK_HEX.to_uppercase()).unwrap(), pk);
        assert!(PubKey::from_hex("d91191e3").is_err());
        assert!(PubKey::from_bech32(NSEC).is_err());
    }

    #[test]
    fn test_generate_and_derive() {
        for _ in 0..8 {
            let sk = SecretKey::generate();
            let pk = sk.pubkey();
            assert_eq!(pk, sk.pubkey());
            assert_eq!(SecretKey::from_hex(&sk.to_hex()).unwrap().pubkey(), pk);
        }
    }

    #[test]
    fn test_shared_secret_symmetry() {
        for _ in 0..8 {
            let a = SecretKey::generate();
            let b = SecretKey::generate();
            let ab = a.shared_secret(&b.pubkey()).unwrap();
            let ba = b.shared_secret(&a.pubkey()).unwrap();
            assert_eq!(ab, ba);
            assert_eq!(ab.as_bytes().len(), 32);
        }
    }

    #[test]
    fn test_sign_verify() {
        let sk = SecretKey::generate();
        let pk = sk.pubkey();
        let hash: [u8; 32] = Sha256::digest(b"hello").into();

        let sig = sk.sign(&hash);
        assert!(pk.verify(&sig, &hash));

        let mut tampered = sig;
        tampered.0[10] ^= 1;
        assert!(!pk.verify(&tampered, &hash));

        let other: [u8; 32] = Sha256::digest(b"hellp").into();
        assert!(!pk.verify(&sig, &other));

        let stranger = SecretKey::generate().pubkey();
        assert!(!stranger.verify(&sig, &hash));

        // malformed signature bytes never panic
        assert!(!pk.verify(&Signature::from_bytes([0xff; 64]), &hash));
    }

    #[test]
    fn test_keys_variants() {
        let keys = Keys::parse(NPUB).unwrap();
        assert!(!keys.can_sign());
        assert_eq!(keys.pubkey().to_hex(), PK_HEX);
        assert!(keys.secret_key().is_none());

        let keys = Keys::parse(NSEC).unwrap();
        assert!(keys.can_sign());
        assert_eq!(keys.secret_key().unwrap().to_hex(), SK_HEX);

        assert!(Keys::public_from_hex(PK_HEX).is_ok());
        assert!(Keys::secret_from_hex(SK_HEX).unwrap().can_sign());

        let note = encoding::encode("note", &[1u8; 32]).unwrap();
        assert!(matches!(
            Keys::parse(&note),
            Err(KeyError::WrongPrefix { .. })
        ));
    }

    #[test]
    fn test_keys_parse_optional() {
        assert!(Keys::parse_optional("").unwrap().is_none());
        assert!(Keys::parse_optional("   ").unwrap().is_none());
        assert!(Keys::parse_optional(NPUB).unwrap().is_some());
        assert!(Keys::parse_optional("npub1nope").is_err());

        // outside of the optional helper an empty key is an error
        assert!(Keys::parse("").is_err());
    }
}
