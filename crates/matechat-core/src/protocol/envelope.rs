//! Wire envelope (JSON text frame).
//!
//! Inbound `Data` is stored as `RawValue` so the message layer can narrow it
//! once the `Type` is known.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

use crate::error::{MateChatError, Result};

/// Inbound envelope. `"Data": null` and a missing `Data` both decode to `None`.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    /// Message type (field name is `Type` in JSON).
    #[serde(rename = "Type")]
    pub msg_type: String,
    /// Optional payload, stored as raw JSON (lazy parsing).
    #[serde(rename = "Data", default)]
    pub data: Option<Box<RawValue>>,
}

impl Envelope {
    /// Decode one text frame.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| MateChatError::InvalidEnvelope(format!("invalid envelope json: {e}")))
    }

    /// Raw `Data` text, if any.
    pub fn data_str(&self) -> Option<&str> {
        self.data.as_deref().map(RawValue::get)
    }
}

/// Outbound envelope.
#[derive(Debug, Serialize)]
pub struct OutEnvelope<'a> {
    #[serde(rename = "Type")]
    pub msg_type: &'a str,
    #[serde(rename = "Data")]
    pub data: Value,
}

impl OutEnvelope<'_> {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| MateChatError::Internal(format!("json encode failed: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn null_and_missing_data_are_absent() {
        let a = Envelope::parse(r#"{"Type":"Logged","Data":null}"#).unwrap();
        let b = Envelope::parse(r#"{"Type":"Logged"}"#).unwrap();
        assert!(a.data.is_none());
        assert!(b.data.is_none());
    }

    #[test]
    fn not_an_envelope_is_rejected() {
        let err = Envelope::parse(r#"{"Data":"x"}"#).unwrap_err();
        assert!(matches!(err, MateChatError::InvalidEnvelope(_)));
        assert!(Envelope::parse("ping").is_err());
    }

    #[test]
    fn out_envelope_uses_capitalised_fields() {
        let out = OutEnvelope {
            msg_type: "Invite",
            data: Value::from("bob"),
        };
        assert_eq!(out.to_json().unwrap(), r#"{"Type":"Invite","Data":"bob"}"#);
    }
}
