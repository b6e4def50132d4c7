use crate::{Kind, PubKey, ID};

/// anything a NIP-19 identifier can point at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pointer {
    Profile(ProfilePointer),
    Event(EventPointer),
    Relay(RelayPointer),
    Address(AddressPointer),
}

/// pointer to a nostr profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePointer {
    pub public_key: PubKey,
    pub relays: Vec<String>,
}

/// pointer to a nostr event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPointer {
    pub id: ID,
    pub relays: Vec<String>,
    pub author: Option<PubKey>,
    pub kind: Option<Kind>,
}

/// pointer to a relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPointer {
    pub url: String,
}

/// pointer to an addressable event by its `d` identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPointer {
    pub identifier: String,
    pub relays: Vec<String>,
    pub author: Option<PubKey>,
    pub kind: Option<Kind>,
}

impl Pointer {
    /// bech32 prefix this pointer is encoded under
    pub fn prefix(&self) -> &'static str {
        match self {
            Pointer::Profile(_) => "nprofile",
            Pointer::Event(_) => "nevent",
            Pointer::Relay(_) => "nrelay",
            Pointer::Address(_) => "naddr",
        }
    }

    /// the primary value: pubkey hex, event id hex, relay url or `d` identifier
    pub fn special(&self) -> String {
        match self {
            Pointer::Profile(p) => p.public_key.to_hex(),
            Pointer::Event(p) => p.id.to_hex(),
            Pointer::Relay(p) => p.url.clone(),
            Pointer::Address(p) => p.identifier.clone(),
        }
    }

    pub fn relays(&self) -> &[String] {
        match self {
            Pointer::Profile(p) => &p.relays,
            Pointer::Event(p) => &p.relays,
            Pointer::Relay(_) => &[],
            Pointer::Address(p) => &p.relays,
        }
    }

    pub fn author(&self) -> Option<&PubKey> {
        match self {
            Pointer::Event(p) => p.author.as_ref(),
            Pointer::Address(p) => p.author.as_ref(),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<Kind> {
        match self {
            Pointer::Event(p) => p.kind,
            Pointer::Address(p) => p.kind,
            _ => None,
        }
    }
}
