//! Translation of backend events into canonical change notifications.
//!
//! Translation is stateless. Events the receiving session issued itself are
//! dropped here: the adapter already announced those when it performed the
//! mutation, so forwarding the echo would notify subscribers twice.

use crate::change::{MapChange, StringChange};
use crate::error::BridgeError;
use crate::remote::{TextEvent, TextEventKind, ValueChangedEvent};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Translate a text event, or `None` for a local echo.
#[must_use]
pub fn translate_text_event(event: &TextEvent) -> Option<StringChange> {
    if event.is_local {
        tracing::trace!(index = event.index, kind = ?event.kind, "Suppressed local text echo");
        return None;
    }

    let change = match event.kind {
        TextEventKind::Inserted => StringChange::insert(event.index, event.text.as_str()),
        TextEventKind::Deleted => StringChange::remove(event.index, event.text.as_str()),
    };
    Some(change)
}

/// Translate a map value change, decoding each side as `V`.
///
/// A side that does not decode is logged and treated as absent, so replacing
/// a malformed value with a valid one reads as an `Add` and the reverse as a
/// `Remove`. Returns `None` for local echoes, for events that do not change
/// the stored value, and when neither side decodes.
#[must_use]
pub fn translate_value_changed<V: DeserializeOwned>(
    event: &ValueChangedEvent,
) -> Option<MapChange<V>> {
    if event.is_local {
        tracing::trace!(property = %event.property, "Suppressed local value echo");
        return None;
    }
    if event.old_value == event.new_value {
        return None;
    }

    let old_value = decode_side(&event.property, event.old_value.clone());
    let new_value = decode_side(&event.property, event.new_value.clone());
    MapChange::classify(event.property.as_str(), old_value, new_value)
}

fn decode_side<V: DeserializeOwned>(key: &str, value: Option<Value>) -> Option<V> {
    match decode_value(key, value?) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            tracing::warn!(error = %err, key, "Ignoring undecodable map value");
            None
        }
    }
}

/// Decode a stored map value.
///
/// # Errors
///
/// Returns [`BridgeError::Decode`] if `value` is not a valid `V`.
pub fn decode_value<V: DeserializeOwned>(key: &str, value: Value) -> Result<V, BridgeError> {
    serde_json::from_value(value).map_err(|source| BridgeError::Decode {
        key: key.to_string(),
        source,
    })
}

/// Encode a record for storage in a map.
///
/// # Errors
///
/// Returns [`BridgeError::Encode`] if serialization fails.
pub fn encode_value<V: Serialize>(value: &V) -> Result<Value, BridgeError> {
    serde_json::to_value(value).map_err(BridgeError::Encode)
}
