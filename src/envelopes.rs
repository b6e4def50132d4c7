//! wire messages exchanged with relays
//!
//! outgoing requests serialize to the JSON arrays relays expect, incoming frames go through
//! [`classify`].

use crate::{types::IDError, Event, Filter, ID};
use serde::{ser::SerializeSeq, Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// most filters a single REQ may carry
pub const MAX_FILTERS: usize = 4;

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {0} message")]
    Invalid(&'static str),

    #[error("invalid event id: {0}")]
    Id(#[from] IDError),
}

/// `["EVENT", <event>]`
#[derive(Debug, Clone)]
pub struct EventRequest {
    pub event: Event,
}

/// `["AUTH", <event>]`
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub event: Event,
}

/// `["REQ", <subscription id>, <filter>...]`
///
/// an empty subscription id is filled in by the relay session.
#[derive(Debug, Clone, Default)]
pub struct ReqRequest {
    pub subscription_id: String,
    pub filters: Vec<Filter>,
}

/// `["COUNT", <subscription id>, <filter>]`
#[derive(Debug, Clone, Default)]
pub struct CountRequest {
    pub subscription_id: String,
    pub filter: Filter,
}

/// `["CLOSE", <subscription id>]`
#[derive(Debug, Clone, Default)]
pub struct CloseRequest {
    pub subscription_id: String,
}

impl ReqRequest {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self {
            subscription_id: String::new(),
            filters,
        }
    }
}

impl CountRequest {
    pub fn new(filter: Filter) -> Self {
        Self {
            subscription_id: String::new(),
            filter,
        }
    }
}

impl CloseRequest {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
        }
    }
}

impl Serialize for EventRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ("EVENT", &self.event).serialize(serializer)
    }
}

impl Serialize for AuthRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ("AUTH", &self.event).serialize(serializer)
    }
}

impl Serialize for ReqRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2 + self.filters.len()))?;
        seq.serialize_element("REQ")?;
        seq.serialize_element(&self.subscription_id)?;
        for filter in &self.filters {
            seq.serialize_element(filter)?;
        }
        seq.end()
    }
}

impl Serialize for CountRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ("COUNT", &self.subscription_id, &self.filter).serialize(serializer)
    }
}

impl Serialize for CloseRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ("CLOSE", &self.subscription_id).serialize(serializer)
    }
}

/// a frame received from a relay
#[derive(Debug, Clone, PartialEq)]
pub enum RelayMessage {
    Event {
        subscription_id: String,
        event: Event,
    },
    Ok {
        event_id: ID,
        accepted: bool,
        message: String,
    },
    Eose {
        subscription_id: String,
    },
    Notice(String),
    Count {
        subscription_id: String,
        count: u64,
        approximate: bool,
    },
    AuthChallenge(String),
    /// anything we don't understand, kept verbatim
    Unknown(String),
}

impl RelayMessage {
    pub fn label(&self) -> &'static str {
        match self {
            RelayMessage::Event { .. } => "EVENT",
            RelayMessage::Ok { .. } => "OK",
            RelayMessage::Eose { .. } => "EOSE",
            RelayMessage::Notice(_) => "NOTICE",
            RelayMessage::Count { .. } => "COUNT",
            RelayMessage::AuthChallenge(_) => "AUTH",
            RelayMessage::Unknown(_) => "UNKNOWN",
        }
    }
}

#[derive(Deserialize)]
struct CountResult {
    count: u64,
    #[serde(default)]
    approximate: bool,
}

/// classify a text frame by its label, matched case-insensitively
///
/// frames that aren't arrays or carry a label we don't know become [`RelayMessage::Unknown`].
/// an error means the label was known but the rest of the frame didn't fit.
pub fn classify(frame: &str) -> Result<RelayMessage, EnvelopeError> {
    let trimmed = frame.trim();
    if !trimmed.starts_with('[') {
        return Ok(RelayMessage::Unknown(frame.to_string()));
    }

    let mut arr: Vec<Value> = serde_json::from_str(trimmed)?;
    let Some(label) = arr.first().and_then(Value::as_str).map(str::to_ascii_uppercase) else {
        return Ok(RelayMessage::Unknown(frame.to_string()));
    };

    match label.as_str() {
        "EVENT" => {
            if arr.len() < 3 {
                return Err(EnvelopeError::Invalid("EVENT"));
            }
            Ok(RelayMessage::Event {
                subscription_id: string_at(&arr, 1, "EVENT")?,
                event: serde_json::from_value(arr[2].take())?,
            })
        }
        "OK" => {
            if arr.len() < 3 {
                return Err(EnvelopeError::Invalid("OK"));
            }
            let event_id = ID::from_hex(arr[1].as_str().ok_or(EnvelopeError::Invalid("OK"))?)?;
            let accepted = arr[2].as_bool().ok_or(EnvelopeError::Invalid("OK"))?;
            // some relays leave the message out when accepting
            let message = match arr.get(3) {
                None => String::new(),
                Some(_) => string_at(&arr, 3, "OK")?,
            };
            Ok(RelayMessage::Ok {
                event_id,
                accepted,
                message,
            })
        }
        "EOSE" => Ok(RelayMessage::Eose {
            subscription_id: string_at(&arr, 1, "EOSE")?,
        }),
        "NOTICE" => Ok(RelayMessage::Notice(string_at(&arr, 1, "NOTICE")?)),
        "COUNT" => {
            if arr.len() < 3 {
                return Err(EnvelopeError::Invalid("COUNT"));
            }
            let subscription_id = string_at(&arr, 1, "COUNT")?;
            let result: CountResult = serde_json::from_value(arr[2].take())?;
            Ok(RelayMessage::Count {
                subscription_id,
                count: result.count,
                approximate: result.approximate,
            })
        }
        "AUTH" => Ok(RelayMessage::AuthChallenge(string_at(&arr, 1, "AUTH")?)),
        _ => Ok(RelayMessage::Unknown(frame.to_string())),
    }
}

fn string_at(arr: &[Value], index: usize, label: &'static str) -> Result<String, EnvelopeError> {
    arr.get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(EnvelopeError::Invalid(label))
}
