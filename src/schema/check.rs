//! Walking a value against a compiled [`Node`].
//!
//! Compilation rejects `$ref` cycles that stay on one value, so every
//! recursive call here either moves into a child value or into a smaller
//! part of the schema.

use serde_json::{Map, Value};

use super::compile::{Additional, Bound, Items, Node, Reference};
use super::{CompiledSchema, FieldError, json_eq};

/// Tolerance for `multipleOf` on fractional divisors.
const REMAINDER_EPSILON: f64 = 1e-9;

impl CompiledSchema {
    pub(super) fn check(
        &self,
        node: &Node,
        value: &Value,
        field: &str,
        errors: &mut Vec<FieldError>,
    ) {
        if node.reject_all {
            errors.push(FieldError::new(field, "is not allowed"));
            return;
        }

        match &node.reference {
            Some(Reference::Root) => self.check(&self.root, value, field, errors),
            Some(Reference::Definition(name)) => {
                if let Some(target) = self.definitions.get(name) {
                    self.check(target, value, field, errors);
                }
            }
            None => {}
        }

        if node
            .types
            .as_ref()
            .is_some_and(|types| !types.iter().any(|ty| ty.matches(value)))
        {
            errors.push(FieldError::new(field, "is the wrong type"));
            return;
        }

        if node
            .constant
            .as_ref()
            .is_some_and(|constant| !json_eq(constant, value))
        {
            errors.push(FieldError::new(field, "must be the constant value"));
        }
        if node
            .enumeration
            .as_ref()
            .is_some_and(|options| !options.iter().any(|option| json_eq(option, value)))
        {
            errors.push(FieldError::new(field, "must be an enum value"));
        }

        match value {
            Value::String(s) => check_string(node, s, field, errors),
            Value::Number(n) => {
                if let Some(n) = n.as_f64() {
                    check_number(node, n, field, errors);
                }
            }
            Value::Array(items) => self.check_array(node, items, field, errors),
            Value::Object(map) => self.check_object(node, map, field, errors),
            Value::Null | Value::Bool(_) => {}
        }

        self.check_combinators(node, value, field, errors);
    }

    fn check_array(
        &self,
        node: &Node,
        items: &[Value],
        field: &str,
        errors: &mut Vec<FieldError>,
    ) {
        if node.min_items.is_some_and(|min| items.len() < min) {
            errors.push(FieldError::new(field, "has less items than allowed"));
        }
        if node.max_items.is_some_and(|max| items.len() > max) {
            errors.push(FieldError::new(field, "has more items than allowed"));
        }
        if node.unique_items && has_duplicates(items) {
            errors.push(FieldError::new(field, "must be unique"));
        }

        match &node.items {
            Items::Any => {}
            Items::Each(schema) => {
                for (i, item) in items.iter().enumerate() {
                    self.check(schema, item, &index_field(field, i), errors);
                }
            }
            Items::Tuple(schemas) => {
                for (i, (schema, item)) in schemas.iter().zip(items).enumerate() {
                    self.check(schema, item, &index_field(field, i), errors);
                }
                let extra = items.iter().enumerate().skip(schemas.len());
                match &node.additional_items {
                    Additional::Allow => {}
                    Additional::Deny => {
                        if items.len() > schemas.len() {
                            errors.push(FieldError::new(field, "has additional items"));
                        }
                    }
                    Additional::Schema(schema) => {
                        for (i, item) in extra {
                            self.check(schema, item, &index_field(field, i), errors);
                        }
                    }
                }
            }
        }
    }

    fn check_object(
        &self,
        node: &Node,
        map: &Map<String, Value>,
        field: &str,
        errors: &mut Vec<FieldError>,
    ) {
        if node.min_properties.is_some_and(|min| map.len() < min) {
            errors.push(FieldError::new(field, "has less properties than allowed"));
        }
        if node.max_properties.is_some_and(|max| map.len() > max) {
            errors.push(FieldError::new(field, "has more properties than allowed"));
        }

        for name in &node.required {
            if !map.contains_key(name) {
                errors.push(FieldError::new(key_field(field, name), "is required"));
            }
        }

        for (name, schema) in &node.properties {
            if let Some(child) = map.get(name) {
                self.check(schema, child, &key_field(field, name), errors);
            }
        }

        for (key, child) in map {
            let mut covered = node.properties.iter().any(|(name, _)| name == key);
            for (pattern, schema) in &node.pattern_properties {
                if pattern.is_match(key) {
                    covered = true;
                    self.check(schema, child, &key_field(field, key), errors);
                }
            }
            if covered {
                continue;
            }
            match &node.additional_properties {
                Additional::Allow => {}
                Additional::Deny => {
                    errors.push(FieldError::new(key_field(field, key), "is not allowed"));
                }
                Additional::Schema(schema) => {
                    self.check(schema, child, &key_field(field, key), errors);
                }
            }
        }
    }

    fn check_combinators(
        &self,
        node: &Node,
        value: &Value,
        field: &str,
        errors: &mut Vec<FieldError>,
    ) {
        for schema in &node.all_of {
            self.check(schema, value, field, errors);
        }

        if !node.any_of.is_empty()
            && !node
                .any_of
                .iter()
                .any(|schema| self.passes(schema, value, field))
        {
            errors.push(FieldError::new(field, "no schemas match"));
        }

        if !node.one_of.is_empty() {
            let matching = node
                .one_of
                .iter()
                .filter(|schema| self.passes(schema, value, field))
                .count();
            if matching != 1 {
                errors.push(FieldError::new(field, "no (or more than one) schemas match"));
            }
        }

        if node
            .not
            .as_ref()
            .is_some_and(|schema| self.passes(schema, value, field))
        {
            errors.push(FieldError::new(field, "negative schema matches"));
        }
    }

    fn passes(&self, node: &Node, value: &Value, field: &str) -> bool {
        let mut scratch = Vec::new();
        self.check(node, value, field, &mut scratch);
        scratch.is_empty()
    }
}

fn check_string(node: &Node, s: &str, field: &str, errors: &mut Vec<FieldError>) {
    if node.min_length.is_some() || node.max_length.is_some() {
        let len = s.chars().count();
        if node.min_length.is_some_and(|min| len < min) {
            errors.push(FieldError::new(field, "has less length than allowed"));
        }
        if node.max_length.is_some_and(|max| len > max) {
            errors.push(FieldError::new(field, "has longer length than allowed"));
        }
    }
    if node.pattern.as_ref().is_some_and(|pattern| !pattern.is_match(s)) {
        errors.push(FieldError::new(field, "pattern mismatch"));
    }
    if let Some(format) = node.format {
        if !format.matches(s) {
            errors.push(FieldError::new(
                field,
                format!("must be {} format", format.name()),
            ));
        }
    }
}

fn check_number(node: &Node, n: f64, field: &str, errors: &mut Vec<FieldError>) {
    if node.minimum.is_some_and(|Bound { value, exclusive }| {
        n < value || (exclusive && n <= value)
    }) {
        errors.push(FieldError::new(field, "is less than minimum"));
    }
    if node.maximum.is_some_and(|Bound { value, exclusive }| {
        n > value || (exclusive && n >= value)
    }) {
        errors.push(FieldError::new(field, "is more than maximum"));
    }
    if let Some(divisor) = node.multiple_of {
        let quotient = n / divisor;
        if (quotient - quotient.round()).abs() > REMAINDER_EPSILON {
            errors.push(FieldError::new(field, "has a remainder"));
        }
    }
}

fn has_duplicates(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, a)| items[i + 1..].iter().any(|b| json_eq(a, b)))
}

fn key_field(field: &str, key: &str) -> String {
    format!("{field}.{key}")
}

fn index_field(field: &str, index: usize) -> String {
    format!("{field}[{index}]")
}
