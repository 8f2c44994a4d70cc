//! Game server events from the Agones SDK watch stream
//!
//! Each line of `/watch/gameserver` is a JSON object shaped like
//! `{"result": {"object_meta": {"name": .., "labels": {..}}, "status": {..}}}`,
//! or `{"error": {..}}` when the SDK side fails. Lookups are optional-chained:
//! a missing `result`, `object_meta` or `labels` simply means the label is
//! not there yet.

use serde_json::Value;
use std::fmt;

use crate::errors::{Result, SidecarError};
use crate::utils::validate_segment;

/// User identifier taken from a game server label.
///
/// Always a single safe path segment, so it can be joined onto the mount
/// root without escaping it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self> {
        validate_segment(raw).map_err(|e| {
            SidecarError::validation(format!("invalid user id {:?}: {}", raw, e))
        })?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of looking up one label on an event
#[derive(Debug, PartialEq, Eq)]
pub enum LabelLookup<'a> {
    Found(&'a str),
    /// The key exists but its value is not a JSON string
    NotAString,
    Missing,
}

/// One parsed line of the watch stream
#[derive(Debug, Clone)]
pub struct GameServerEvent {
    value: Value,
}

impl GameServerEvent {
    /// Parse a single line; anything that is not valid JSON is an error
    pub fn parse(line: &[u8]) -> Result<Self> {
        let value = serde_json::from_slice(line).map_err(|e| {
            SidecarError::serialization(format!(
                "malformed watch event ({}): {}",
                e,
                String::from_utf8_lossy(line)
            ))
        })?;
        Ok(Self { value })
    }

    pub fn label(&self, key: &str) -> LabelLookup<'_> {
        match self
            .value
            .pointer("/result/object_meta/labels")
            .and_then(|labels| labels.get(key))
        {
            Some(Value::String(s)) => LabelLookup::Found(s),
            Some(_) => LabelLookup::NotAString,
            None => LabelLookup::Missing,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.value
            .pointer("/result/object_meta/name")
            .and_then(Value::as_str)
    }

    pub fn state(&self) -> Option<&str> {
        self.value
            .pointer("/result/status/state")
            .and_then(Value::as_str)
    }

    /// Error envelope sent by the SDK gateway instead of a result
    pub fn error(&self) -> Option<&Value> {
        self.value.get("error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_found() {
        let event = GameServerEvent::parse(
            br#"{"result":{"object_meta":{"name":"comfy-abc","labels":{"user":"alice"}},"status":{"state":"Allocated"}}}"#,
        )
        .unwrap();
        assert_eq!(event.label("user"), LabelLookup::Found("alice"));
        assert_eq!(event.name(), Some("comfy-abc"));
        assert_eq!(event.state(), Some("Allocated"));
        assert!(event.error().is_none());
    }

    #[test]
    fn test_label_missing_from_map() {
        let event =
            GameServerEvent::parse(br#"{"result":{"object_meta":{"labels":{"foo":"bar"}}}}"#)
                .unwrap();
        assert_eq!(event.label("user"), LabelLookup::Missing);
    }

    #[test]
    fn test_missing_nested_path_is_not_an_error() {
        let lines: [&[u8]; 6] = [
            br#"{}"#,
            br#"{"result":{}}"#,
            br#"{"result":{"object_meta":{}}}"#,
            br#"{"result":{"object_meta":{"labels":null}}}"#,
            br#"{"result":"weird"}"#,
            br#"[1,2,3]"#,
        ];
        for line in lines {
            let event = GameServerEvent::parse(line).unwrap();
            assert_eq!(event.label("user"), LabelLookup::Missing);
        }
    }

    #[test]
    fn test_non_string_label() {
        let event =
            GameServerEvent::parse(br#"{"result":{"object_meta":{"labels":{"user":42}}}}"#)
                .unwrap();
        assert_eq!(event.label("user"), LabelLookup::NotAString);
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = GameServerEvent::parse(b"not json at all").unwrap_err();
        assert!(matches!(err, SidecarError::Serialization(_)));
        assert!(err.message().contains("not json at all"));
    }

    #[test]
    fn test_error_envelope() {
        let event =
            GameServerEvent::parse(br#"{"error":{"code":2,"message":"boom"}}"#).unwrap();
        assert!(event.error().is_some());
        assert_eq!(event.label("user"), LabelLookup::Missing);
    }

    #[test]
    fn test_user_id_validation() {
        assert_eq!(UserId::parse("alice").unwrap().as_str(), "alice");
        for bad in ["", "..", ".", "../evil", "a/b", "a\\b", "ali\0ce"] {
            let err = UserId::parse(bad).unwrap_err();
            assert!(matches!(err, SidecarError::Validation(_)), "{:?}", bad);
        }
    }
}
