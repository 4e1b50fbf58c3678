//! Registered block types and their compiled validators.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::BlockType;
use crate::error::EditorError;
use crate::schema::CompiledSchema;

/// A block type accepted by the registry, with its schema compiled.
#[derive(Debug, Clone)]
pub struct RegisteredType {
    descriptor: BlockType,
    initial_data: Map<String, Value>,
    initial_state: Map<String, Value>,
    validator: CompiledSchema,
}

impl RegisteredType {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn version(&self) -> &str {
        &self.descriptor.version
    }

    pub fn schema(&self) -> &Value {
        &self.descriptor.schema
    }

    /// Data a new block of this type starts with.
    pub const fn initial_data(&self) -> &Map<String, Value> {
        &self.initial_data
    }

    /// Local state a new block of this type starts with (empty if the
    /// descriptor did not provide one).
    pub const fn initial_state(&self) -> &Map<String, Value> {
        &self.initial_state
    }

    pub const fn validator(&self) -> &CompiledSchema {
        &self.validator
    }

    /// The descriptor exactly as it was registered.
    pub const fn descriptor(&self) -> &BlockType {
        &self.descriptor
    }
}

/// The set of block types one editor knows about.
///
/// Types are never removed. Iteration follows registration order, which is
/// the order a block-creation toolbar lists them in.
#[derive(Debug, Clone, Default)]
pub struct BlockTypeRegistry {
    types: Vec<RegisteredType>,
    by_name: HashMap<String, usize>,
}

impl BlockTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and add a block type.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidBlockType`] if the name or version is
    /// empty, if the schema, initial data or initial state are not objects,
    /// if the schema does not compile, or if the name is already taken.
    pub fn register(&mut self, descriptor: BlockType) -> Result<&RegisteredType, EditorError> {
        let name = descriptor.name.clone();
        let invalid = |reason: &str| EditorError::invalid_block_type(&name, reason);

        if descriptor.name.trim().is_empty() {
            return Err(invalid("name must be a non-empty string"));
        }
        if descriptor.version.trim().is_empty() {
            return Err(invalid("version must be a non-empty string"));
        }
        if !descriptor.schema.is_object() {
            return Err(invalid("schema must be an object"));
        }
        let Some(initial_data) = descriptor.initial_data.as_object().cloned() else {
            return Err(invalid("initial data must be an object"));
        };
        let initial_state = match &descriptor.initial_state {
            None => Map::new(),
            Some(Value::Object(state)) => state.clone(),
            Some(_) => return Err(invalid("initial state must be an object")),
        };
        if self.by_name.contains_key(&name) {
            return Err(invalid("a block type with this name is already registered"));
        }
        let validator = CompiledSchema::compile(&descriptor.schema)
            .map_err(|err| EditorError::invalid_block_type(&name, format!("schema {err}")))?;

        tracing::debug!(name = %name, version = %descriptor.version, "registered block type");
        let index = self.types.len();
        self.by_name.insert(name, index);
        self.types.push(RegisteredType {
            descriptor,
            initial_data,
            initial_state,
            validator,
        });
        Ok(&self.types[index])
    }

    /// Resolve a block type by name.
    ///
    /// # Errors
    /// Returns [`EditorError::UnknownBlockType`] if `name` was never registered.
    pub fn lookup(&self, name: &str) -> Result<&RegisteredType, EditorError> {
        self.by_name
            .get(name)
            .map(|&index| &self.types[index])
            .ok_or_else(|| EditorError::unknown_block_type(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registered types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_type() -> BlockType {
        BlockType::new(
            "text",
            "1.0.0",
            json!({ "properties": { "text": { "type": "string" } } }),
            json!({ "text": "" }),
        )
    }

    #[test]
    fn test_register_then_lookup() {
        let mut registry = BlockTypeRegistry::new();
        registry.register(text_type()).unwrap();

        let ty = registry.lookup("text").unwrap();
        assert_eq!(ty.name(), "text");
        assert_eq!(ty.version(), "1.0.0");
        assert_eq!(ty.initial_data().get("text"), Some(&json!("")));
        assert!(ty.initial_state().is_empty());
    }

    #[test]
    fn test_lookup_unknown_name_fails() {
        let registry = BlockTypeRegistry::new();
        assert_eq!(
            registry.lookup("video").unwrap_err(),
            EditorError::UnknownBlockType {
                name: "video".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_name_is_rejected_and_original_kept() {
        let mut registry = BlockTypeRegistry::new();
        registry.register(text_type()).unwrap();

        let mut shadow = text_type();
        shadow.version = "9.9.9".to_string();
        let err = registry.register(shadow).unwrap_err();
        assert!(matches!(err, EditorError::InvalidBlockType { ref name, .. } if name == "text"));
        assert_eq!(registry.lookup("text").unwrap().version(), "1.0.0");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_descriptor_under_new_name_is_independent() {
        let mut registry = BlockTypeRegistry::new();
        registry.register(text_type()).unwrap();
        let mut quote = text_type();
        quote.name = "quote".to_string();
        quote.initial_data = json!({ "text": "", "cite": "" });
        registry.register(quote).unwrap();

        assert_eq!(registry.lookup("text").unwrap().initial_data().len(), 1);
        assert_eq!(registry.lookup("quote").unwrap().initial_data().len(), 2);
    }

    #[test]
    fn test_malformed_descriptors_are_rejected() {
        let cases = [
            BlockType::new("", "1", json!({}), json!({})),
            BlockType::new("text", " ", json!({}), json!({})),
            BlockType::new("text", "1", json!([]), json!({})),
            BlockType::new("text", "1", json!({}), json!("")),
            BlockType::new("text", "1", json!({}), json!({})).with_initial_state(json!(3)),
            BlockType::new("text", "1", json!({ "type": "paragraph" }), json!({})),
        ];
        for descriptor in cases {
            let mut registry = BlockTypeRegistry::new();
            assert!(
                matches!(
                    registry.register(descriptor.clone()),
                    Err(EditorError::InvalidBlockType { .. })
                ),
                "should reject {descriptor:?}"
            );
            assert!(registry.is_empty());
        }
    }

    #[test]
    fn test_schema_error_names_the_keyword() {
        let mut registry = BlockTypeRegistry::new();
        let err = registry
            .register(BlockType::new(
                "text",
                "1",
                json!({ "properties": { "text": { "pattern": "(" } } }),
                json!({}),
            ))
            .unwrap_err();
        assert!(err.to_string().contains("#/properties/text/pattern"), "{err}");
    }

    #[test]
    fn test_iteration_follows_registration_order() {
        let mut registry = BlockTypeRegistry::new();
        for name in ["text", "image", "code"] {
            let mut ty = text_type();
            ty.name = name.to_string();
            registry.register(ty).unwrap();
        }
        let names: Vec<_> = registry.iter().map(RegisteredType::name).collect();
        assert_eq!(names, vec!["text", "image", "code"]);
    }
}
