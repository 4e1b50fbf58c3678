//! Core block types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a block inside one document.
///
/// Ids minted by the editor are non-negative integers. Documents loaded from
/// elsewhere may use any JSON number or a string; those are kept exactly as
/// written so the document saves back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockId {
    Number(u64),
    /// Negative or fractional number
    OtherNumber(serde_json::Number),
    Text(String),
}

impl BlockId {
    /// An empty string is not a usable identifier.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::OtherNumber(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for BlockId {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One block as it is stored in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Assigned at creation, never changes
    pub id: BlockId,
    /// Registered block type name
    pub name: String,
    /// Schema revision that produced `data`
    #[serde(default)]
    pub version: String,
    /// Semantic content, validated against the type's schema
    pub data: Map<String, Value>,
    /// UI-only fields, never validated
    #[serde(rename = "state", default)]
    pub local_state: Map<String, Value>,
}

/// A block type descriptor as supplied by a plugin.
///
/// Fields are kept as raw JSON so that a descriptor read from a file can be
/// checked by [`BlockTypeRegistry::register`](super::BlockTypeRegistry::register)
/// rather than failing inside serde with a less useful message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockType {
    pub name: String,
    pub version: String,
    pub schema: Value,
    pub initial_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<Value>,
}

impl BlockType {
    /// Create a descriptor without an initial local state.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        schema: Value,
        initial_data: Value,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            schema,
            initial_data,
            initial_state: None,
        }
    }

    /// Set the local state new blocks of this type start with.
    #[must_use]
    pub fn with_initial_state(mut self, initial_state: Value) -> Self {
        self.initial_state = Some(initial_state);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_id_deserializes_numbers_and_strings() {
        let ids: Vec<BlockId> = serde_json::from_value(json!([3, "abc"])).unwrap();
        assert_eq!(ids, vec![BlockId::Number(3), BlockId::from("abc")]);
    }

    #[test]
    fn test_negative_and_fractional_ids_are_kept_exactly() {
        let raw = json!([-1, 1.5, 18_446_744_073_709_551_615_u64]);
        let ids: Vec<BlockId> = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(ids[0], BlockId::OtherNumber(_)));
        assert!(matches!(ids[1], BlockId::OtherNumber(_)));
        assert_eq!(ids[2], BlockId::Number(u64::MAX));
        assert_eq!(ids[0].to_string(), "-1");
        assert_eq!(ids[1].to_string(), "1.5");
        assert_eq!(serde_json::to_value(&ids).unwrap(), raw);
    }

    #[test]
    fn test_block_record_defaults_missing_version_and_state() {
        let record: BlockRecord =
            serde_json::from_value(json!({ "id": 0, "name": "text", "data": { "text": "foo" } }))
                .unwrap();
        assert_eq!(record.version, "");
        assert!(record.local_state.is_empty());
    }

    #[test]
    fn test_block_record_persists_local_state_as_state() {
        let mut local_state = Map::new();
        local_state.insert("editing".to_string(), json!(true));
        let record = BlockRecord {
            id: BlockId::Number(1),
            name: "text".to_string(),
            version: "1.0.0".to_string(),
            data: Map::new(),
            local_state,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["state"], json!({ "editing": true }));
    }

    #[test]
    fn test_block_type_reads_camel_case_descriptor() {
        let ty: BlockType = serde_json::from_value(json!({
            "name": "quote",
            "version": "2",
            "schema": { "type": "object" },
            "initialData": { "text": "" },
            "initialState": { "editing": false }
        }))
        .unwrap();
        assert_eq!(ty.initial_data, json!({ "text": "" }));
        assert_eq!(ty.initial_state, Some(json!({ "editing": false })));
    }
}
