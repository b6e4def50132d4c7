//! NIP-19: bech32-encoded entities
//!
//! `npub`, `nsec` and `note` carry a bare 32-byte payload. the shareable identifiers
//! (`nprofile`, `nevent`, `nrelay`, `naddr`) carry a TLV payload and map to a [`Pointer`].

use std::str::FromStr;

use thiserror::Error;

use crate::{
    encoding::{self, EncodingError},
    keys::KeyError,
    pointers::*,
    tlv::{self, TlvEntry, TLV_AUTHOR, TLV_KIND, TLV_RELAY, TLV_SPECIAL},
    Kind, PubKey, SecretKey, ID,
};

#[derive(Error, Debug)]
pub enum Nip19Error {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("unsupported identifier prefix '{0}'")]
    UnsupportedIdentifier(String),

    #[error("{prefix} is missing its {field}")]
    MissingField {
        prefix: &'static str,
        field: &'static str,
    },

    #[error("{prefix} has an invalid {field}")]
    InvalidField {
        prefix: &'static str,
        field: &'static str,
    },

    #[error("invalid key: {0}")]
    Key(#[from] KeyError),

    #[error("kind {0} doesn't fit in 16 bits")]
    KindOutOfRange(u32),
}

/// anything a NIP-19 string can decode to
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    SecretKey(SecretKey),
    PubKey(PubKey),
    Note(ID),
    Pointer(Pointer),
}

/// decode any NIP-19 string
pub fn decode(code: &str) -> Result<Decoded, Nip19Error> {
    let (prefix, data) = encoding::decode(code)?;
    match prefix.as_str() {
        "nsec" => Ok(Decoded::SecretKey(SecretKey::from_slice(&data)?)),
        "npub" => Ok(Decoded::PubKey(PubKey::from_slice(&data)?)),
        "note" => Ok(Decoded::Note(bare_id("note", &data)?)),
        _ => Ok(Decoded::Pointer(pointer_from_payload(&prefix, &data)?)),
    }
}

pub fn encode_nsec(sk: &SecretKey) -> Result<String, Nip19Error> {
    Ok(encoding::encode("nsec", &sk.secret_bytes())?)
}

pub fn encode_npub(pk: &PubKey) -> Result<String, Nip19Error> {
    Ok(encoding::encode("npub", pk.as_bytes())?)
}

pub fn encode_note(id: &ID) -> Result<String, Nip19Error> {
    Ok(encoding::encode("note", id.as_bytes())?)
}

impl Pointer {
    /// parse a shareable identifier
    ///
    /// `npub` and `note` are accepted as pointers without relays. secret keys and unknown
    /// prefixes fail with [`Nip19Error::UnsupportedIdentifier`].
    pub fn parse(code: &str) -> Result<Pointer, Nip19Error> {
        let (prefix, data) = encoding::decode(code)?;
        pointer_from_payload(&prefix, &data)
    }

    /// like [`Pointer::parse`] but swallows the reason
    pub fn try_parse(code: &str) -> Option<Pointer> {
        Self::parse(code).ok()
    }

    /// encode as `nprofile`, `nevent`, `nrelay` or `naddr`
    ///
    /// entries are written as special, relays, author, kind.
    pub fn to_bech32(&self) -> Result<String, Nip19Error> {
        let mut entries = vec![TlvEntry::new(TLV_SPECIAL, self.special_bytes())];
        for relay in self.relays() {
            entries.push(TlvEntry::new(TLV_RELAY, relay.as_bytes()));
        }
        if let Some(author) = self.author() {
            entries.push(TlvEntry::new(TLV_AUTHOR, author.as_bytes().as_slice()));
        }
        if let Some(kind) = self.kind() {
            entries.push(TlvEntry::new(TLV_KIND, tlv::write_kind(kind.0 as u32)));
        }

        Ok(encoding::encode(self.prefix(), &tlv::build(&entries))?)
    }

    fn special_bytes(&self) -> Vec<u8> {
        match self {
            Pointer::Profile(p) => p.public_key.as_bytes().to_vec(),
            Pointer::Event(p) => p.id.as_bytes().to_vec(),
            Pointer::Relay(p) => p.url.as_bytes().to_vec(),
            Pointer::Address(p) => p.identifier.as_bytes().to_vec(),
        }
    }
}

impl FromStr for Pointer {
    type Err = Nip19Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pointer::parse(s)
    }
}

fn pointer_from_payload(prefix: &str, data: &[u8]) -> Result<Pointer, Nip19Error> {
    match prefix {
        "npub" => Ok(Pointer::Profile(ProfilePointer {
            public_key: PubKey::from_slice(data)?,
            relays: Vec::new(),
        })),
        "note" => Ok(Pointer::Event(EventPointer {
            id: bare_id("note", data)?,
            relays: Vec::new(),
            author: None,
            kind: None,
        })),
        "nprofile" => {
            let fields = Fields::parse("nprofile", data)?;
            Ok(Pointer::Profile(ProfilePointer {
                public_key: PubKey::from_slice(fields.special()?)
                    .map_err(|_| fields.invalid("pubkey"))?,
                relays: fields.relays,
            }))
        }
        "nevent" => {
            let fields = Fields::parse("nevent", data)?;
            Ok(Pointer::Event(EventPointer {
                id: ID::from_slice(fields.special()?).map_err(|_| fields.invalid("event id"))?,
                relays: fields.relays,
                author: fields.author,
                kind: fields.kind,
            }))
        }
        "nrelay" => {
            let fields = Fields::parse("nrelay", data)?;
            let url = String::from_utf8(fields.special()?.to_vec())
                .map_err(|_| fields.invalid("relay url"))?;
            Ok(Pointer::Relay(RelayPointer { url }))
        }
        "naddr" => {
            let fields = Fields::parse("naddr", data)?;
            let identifier = String::from_utf8(fields.special()?.to_vec())
                .map_err(|_| fields.invalid("identifier"))?;
            Ok(Pointer::Address(AddressPointer {
                identifier,
                relays: fields.relays,
                author: fields.author,
                kind: fields.kind,
            }))
        }
        other => Err(Nip19Error::UnsupportedIdentifier(other.to_string())),
    }
}

fn bare_id(prefix: &'static str, data: &[u8]) -> Result<ID, Nip19Error> {
    ID::from_slice(data).map_err(|_| Nip19Error::InvalidField {
        prefix,
        field: "event id",
    })
}

/// TLV entries sorted by meaning; the first special wins, unknown tags are skipped
struct Fields {
    prefix: &'static str,
    special: Option<Vec<u8>>,
    relays: Vec<String>,
    author: Option<PubKey>,
    kind: Option<Kind>,
}

impl Fields {
    fn parse(prefix: &'static str, data: &[u8]) -> Result<Self, Nip19Error> {
        let mut fields = Fields {
            prefix,
            special: None,
            relays: Vec::new(),
            author: None,
            kind: None,
        };

        for entry in tlv::parse(data)? {
            match entry.tag {
                TLV_SPECIAL => {
                    if fields.special.is_none() {
                        fields.special = Some(entry.value);
                    }
                }
                TLV_RELAY => {
                    let relay =
                        String::from_utf8(entry.value).map_err(|_| fields.invalid("relay"))?;
                    fields.relays.push(relay);
                }
                TLV_AUTHOR => {
                    let author =
                        PubKey::from_slice(&entry.value).map_err(|_| fields.invalid("author"))?;
                    fields.author = Some(author);
                }
                TLV_KIND => {
                    let kind = tlv::read_kind(&entry.value)?;
                    let kind = u16::try_from(kind).map_err(|_| Nip19Error::KindOutOfRange(kind))?;
                    fields.kind = Some(Kind(kind));
                }
                _ => {}
            }
        }

        Ok(fields)
    }

    fn special(&self) -> Result<&[u8], Nip19Error> {
        self.special.as_deref().ok_or(Nip19Error::MissingField {
            prefix: self.prefix,
            field: "special entry",
        })
    }

    fn invalid(&self, field: &'static str) -> Nip19Error {
        Nip19Error::InvalidField {
            prefix: self.prefix,
            field,
        }
    }
}
