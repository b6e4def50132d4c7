//! # nostr-session
//!
//! nostr events, NIP-19 identifiers and relay sessions
//!
//! this library signs, verifies and NIP-04 encrypts events, encodes and decodes shareable
//! bech32 identifiers, and drives websocket sessions with one or many relays.

pub mod config;
pub mod encoding;
pub mod envelopes;
pub mod event;
pub mod event_template;
pub mod filter;
pub mod keys;
pub mod kinds;
pub mod nip04;
pub mod nip19;
pub mod normalize;
pub mod observers;
pub mod pointers;
pub mod pool;
pub mod relay;
pub mod relay_information;
pub mod tlv;
pub mod types;

mod tags;

// re-export commonly used types
pub use config::{PoolOptions, RelayConfig, RelayPermissions};
pub use envelopes::{CloseRequest, CountRequest, ReqRequest};
pub use event::Event;
pub use event_template::{EncryptedTemplate, EventTemplate};
pub use filter::{Filter, TagQuery};
pub use keys::{Keys, PubKey, SecretKey, SharedSecret};
pub use kinds::KnownKind;
pub use nip19::Decoded;
pub use normalize::normalize_url;
pub use pointers::{AddressPointer, EventPointer, Pointer, ProfilePointer, RelayPointer};
pub use pool::{Occurrence, Pool, PoolError, RelayFailure, SubscriptionOutcome};
pub use relay::{ConnectionState, Notification, Relay, RelayError};
pub use tags::{Tag, Tags, MAX_TAG_LEN};
pub use types::{Kind, Signature, Timestamp, ID};
