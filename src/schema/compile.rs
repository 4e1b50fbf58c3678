//! Schema document to [`Node`] tree.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::{CompiledSchema, SchemaError};

/// JSON value kinds a `type` keyword can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum JsonType {
    Null,
    Boolean,
    Object,
    Array,
    Number,
    Integer,
    String,
}

impl JsonType {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "null" => Some(Self::Null),
            "boolean" => Some(Self::Boolean),
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    pub(super) fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (Self::Null, Value::Null)
            | (Self::Boolean, Value::Bool(_))
            | (Self::Object, Value::Object(_))
            | (Self::Array, Value::Array(_))
            | (Self::Number, Value::Number(_))
            | (Self::String, Value::String(_)) => true,
            (Self::Integer, Value::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        }
    }
}

/// String formats understood by the `format` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Format {
    DateTime,
    Date,
    Time,
    Email,
    Uri,
    Ipv4,
    Hostname,
}

static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[tT ]\d{2}:\d{2}:\d{2}(\.\d+)?([zZ]|[+-]\d{2}:\d{2})$")
        .expect("date-time regex")
});
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date regex"));
static TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}(\.\d+)?$").expect("time regex"));
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+$").expect("email regex"));
static URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:[^\s]*$").expect("uri regex"));
static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:25[0-5]|2[0-4][0-9]|1?[0-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1?[0-9]?[0-9])$")
        .expect("ipv4 regex")
});
static HOSTNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("hostname regex")
});

impl Format {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "date-time" => Some(Self::DateTime),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            "email" => Some(Self::Email),
            "uri" => Some(Self::Uri),
            "ipv4" => Some(Self::Ipv4),
            "hostname" => Some(Self::Hostname),
            _ => None,
        }
    }

    pub(super) const fn name(self) -> &'static str {
        match self {
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Time => "time",
            Self::Email => "email",
            Self::Uri => "uri",
            Self::Ipv4 => "ipv4",
            Self::Hostname => "hostname",
        }
    }

    pub(super) fn matches(self, s: &str) -> bool {
        let regex = match self {
            Self::DateTime => &DATE_TIME,
            Self::Date => &DATE,
            Self::Time => &TIME,
            Self::Email => &EMAIL,
            Self::Uri => &URI,
            Self::Ipv4 => &IPV4,
            Self::Hostname => &HOSTNAME,
        };
        regex.is_match(s)
    }
}

/// A numeric bound from `minimum`/`maximum` and their exclusive forms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Bound {
    pub value: f64,
    pub exclusive: bool,
}

/// What to do with object keys or array items no other keyword covers.
#[derive(Debug, Clone, Default)]
pub(super) enum Additional {
    #[default]
    Allow,
    Deny,
    Schema(Box<Node>),
}

#[derive(Debug, Clone, Default)]
pub(super) enum Items {
    #[default]
    Any,
    Each(Box<Node>),
    Tuple(Vec<Node>),
}

/// Target of a `$ref`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) enum Reference {
    Root,
    Definition(String),
}

impl Reference {
    fn pointer(&self) -> String {
        match self {
            Self::Root => "#".to_string(),
            Self::Definition(name) => format!("#/definitions/{name}"),
        }
    }
}

/// One compiled schema.
#[derive(Debug, Clone, Default)]
pub(super) struct Node {
    pub reject_all: bool,
    pub reference: Option<Reference>,
    pub types: Option<Vec<JsonType>>,
    pub enumeration: Option<Vec<Value>>,
    pub constant: Option<Value>,
    // strings
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub format: Option<Format>,
    // numbers
    pub minimum: Option<Bound>,
    pub maximum: Option<Bound>,
    pub multiple_of: Option<f64>,
    // arrays
    pub items: Items,
    pub additional_items: Additional,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: bool,
    // objects
    pub min_properties: Option<usize>,
    pub max_properties: Option<usize>,
    pub required: Vec<String>,
    pub properties: Vec<(String, Node)>,
    pub pattern_properties: Vec<(Regex, Node)>,
    pub additional_properties: Additional,
    // combinators
    pub all_of: Vec<Node>,
    pub any_of: Vec<Node>,
    pub one_of: Vec<Node>,
    pub not: Option<Box<Node>>,
}

pub(super) fn compile_document(schema: &Value) -> Result<CompiledSchema, SchemaError> {
    let mut compiler = Compiler::default();
    let root = compiler.node(schema, "#")?;

    let mut definitions = HashMap::new();
    if let Some(obj) = schema.as_object() {
        for key in ["definitions", "$defs"] {
            let Some(defs) = obj.get(key) else {
                continue;
            };
            let pointer = format!("#/{key}");
            let defs = defs.as_object().ok_or_else(|| bad(&pointer, "must be an object"))?;
            for (name, def) in defs {
                let node = compiler.node(def, &child_pointer(&pointer, name))?;
                definitions.insert(name.clone(), node);
            }
        }
    }

    for (pointer, name) in compiler.references {
        if !definitions.contains_key(&name) {
            return Err(SchemaError::UnresolvedRef {
                pointer,
                reference: format!("#/definitions/{name}"),
            });
        }
    }

    let mut finished = HashSet::new();
    let starts =
        std::iter::once(Reference::Root).chain(definitions.keys().cloned().map(Reference::Definition));
    for start in starts {
        let mut path = Vec::new();
        visit_in_place(&start, &root, &definitions, &mut path, &mut finished)?;
    }

    Ok(CompiledSchema { root, definitions })
}

/// Follow the references a node reaches while staying on the same value
/// (its own `$ref` and those of its combinator branches). Coming back to a
/// reference already on `path` means checking would never terminate.
fn visit_in_place(
    reference: &Reference,
    root: &Node,
    definitions: &HashMap<String, Node>,
    path: &mut Vec<Reference>,
    finished: &mut HashSet<Reference>,
) -> Result<(), SchemaError> {
    if finished.contains(reference) {
        return Ok(());
    }
    if path.contains(reference) {
        return Err(SchemaError::CyclicRef {
            pointer: reference.pointer(),
        });
    }
    let target = match reference {
        Reference::Root => Some(root),
        Reference::Definition(name) => definitions.get(name),
    };
    if let Some(target) = target {
        let mut next = Vec::new();
        in_place_references(target, &mut next);
        path.push(reference.clone());
        for next in next {
            visit_in_place(next, root, definitions, path, finished)?;
        }
        path.pop();
    }
    finished.insert(reference.clone());
    Ok(())
}

fn in_place_references<'a>(node: &'a Node, out: &mut Vec<&'a Reference>) {
    if let Some(reference) = &node.reference {
        out.push(reference);
    }
    let branches = node
        .all_of
        .iter()
        .chain(&node.any_of)
        .chain(&node.one_of)
        .chain(node.not.as_deref());
    for branch in branches {
        in_place_references(branch, out);
    }
}

#[derive(Default)]
struct Compiler {
    /// Definition references seen so far, checked once all definitions exist
    references: Vec<(String, String)>,
}

impl Compiler {
    fn node(&mut self, schema: &Value, pointer: &str) -> Result<Node, SchemaError> {
        let obj = match schema {
            Value::Bool(true) => return Ok(Node::default()),
            Value::Bool(false) => {
                return Ok(Node {
                    reject_all: true,
                    ..Node::default()
                });
            }
            Value::Object(obj) => obj,
            _ => {
                return Err(SchemaError::NotASchema {
                    pointer: pointer.to_string(),
                });
            }
        };

        let mut node = Node {
            reference: self.reference(obj, pointer)?,
            types: types(obj, pointer)?,
            constant: obj.get("const").cloned(),
            min_length: count(obj, "minLength", pointer)?,
            max_length: count(obj, "maxLength", pointer)?,
            min_items: count(obj, "minItems", pointer)?,
            max_items: count(obj, "maxItems", pointer)?,
            min_properties: count(obj, "minProperties", pointer)?,
            max_properties: count(obj, "maxProperties", pointer)?,
            unique_items: flag(obj, "uniqueItems", pointer)?,
            minimum: bound(obj, "minimum", "exclusiveMinimum", pointer)?,
            maximum: bound(obj, "maximum", "exclusiveMaximum", pointer)?,
            ..Node::default()
        };

        if let Some(values) = obj.get("enum") {
            let values = values
                .as_array()
                .ok_or_else(|| bad(&child_pointer(pointer, "enum"), "must be an array"))?;
            node.enumeration = Some(values.clone());
        }

        if let Some(pattern) = obj.get("pattern") {
            node.pattern = Some(compile_regex(pattern, &child_pointer(pointer, "pattern"))?);
        }

        if let Some(format) = obj.get("format") {
            let at = child_pointer(pointer, "format");
            let name = format.as_str().ok_or_else(|| bad(&at, "must be a string"))?;
            node.format = Some(Format::parse(name).ok_or_else(|| SchemaError::UnknownFormat {
                pointer: at.clone(),
                format: name.to_string(),
            })?);
        }

        if let Some(divisor) = obj.get("multipleOf") {
            let at = child_pointer(pointer, "multipleOf");
            let divisor = divisor
                .as_f64()
                .filter(|d| *d > 0.0)
                .ok_or_else(|| bad(&at, "must be a number greater than 0"))?;
            node.multiple_of = Some(divisor);
        }

        match obj.get("items") {
            None => {}
            Some(Value::Array(list)) => {
                let at = child_pointer(pointer, "items");
                node.items = Items::Tuple(self.list(list, &at)?);
            }
            Some(single) => {
                let at = child_pointer(pointer, "items");
                node.items = Items::Each(Box::new(self.node(single, &at)?));
            }
        }
        node.additional_items = self.additional(obj, "additionalItems", pointer)?;

        match obj.get("required") {
            None | Some(Value::Bool(_)) => {}
            Some(Value::Array(names)) => {
                for name in names {
                    let name = name.as_str().ok_or_else(|| {
                        bad(&child_pointer(pointer, "required"), "must list property names")
                    })?;
                    node.required.push(name.to_string());
                }
            }
            Some(_) => {
                return Err(bad(
                    &child_pointer(pointer, "required"),
                    "must be an array of strings",
                ));
            }
        }

        if let Some(properties) = obj.get("properties") {
            let at = child_pointer(pointer, "properties");
            let properties = properties
                .as_object()
                .ok_or_else(|| bad(&at, "must be an object"))?;
            for (name, schema) in properties {
                if schema.get("required") == Some(&Value::Bool(true))
                    && !node.required.contains(name)
                {
                    node.required.push(name.clone());
                }
                let child = self.node(schema, &child_pointer(&at, name))?;
                node.properties.push((name.clone(), child));
            }
        }

        if let Some(patterns) = obj.get("patternProperties") {
            let at = child_pointer(pointer, "patternProperties");
            let patterns = patterns
                .as_object()
                .ok_or_else(|| bad(&at, "must be an object"))?;
            for (pattern, schema) in patterns {
                let child_at = child_pointer(&at, pattern);
                let compiled = compile_regex(&Value::String(pattern.clone()), &child_at)?;
                let child = self.node(schema, &child_at)?;
                node.pattern_properties.push((compiled, child));
            }
        }
        node.additional_properties = self.additional(obj, "additionalProperties", pointer)?;

        node.all_of = self.combinator(obj, "allOf", pointer)?;
        node.any_of = self.combinator(obj, "anyOf", pointer)?;
        node.one_of = self.combinator(obj, "oneOf", pointer)?;
        if let Some(negated) = obj.get("not") {
            let at = child_pointer(pointer, "not");
            node.not = Some(Box::new(self.node(negated, &at)?));
        }

        Ok(node)
    }

    fn list(&mut self, schemas: &[Value], pointer: &str) -> Result<Vec<Node>, SchemaError> {
        schemas
            .iter()
            .enumerate()
            .map(|(i, schema)| self.node(schema, &format!("{pointer}/{i}")))
            .collect()
    }

    fn combinator(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        pointer: &str,
    ) -> Result<Vec<Node>, SchemaError> {
        let Some(value) = obj.get(key) else {
            return Ok(Vec::new());
        };
        let at = child_pointer(pointer, key);
        match value {
            Value::Array(list) if !list.is_empty() => self.list(list, &at),
            _ => Err(bad(&at, "must be a non-empty array of schemas")),
        }
    }

    fn additional(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        pointer: &str,
    ) -> Result<Additional, SchemaError> {
        match obj.get(key) {
            None | Some(Value::Bool(true)) => Ok(Additional::Allow),
            Some(Value::Bool(false)) => Ok(Additional::Deny),
            Some(schema) => {
                let at = child_pointer(pointer, key);
                Ok(Additional::Schema(Box::new(self.node(schema, &at)?)))
            }
        }
    }

    fn reference(
        &mut self,
        obj: &Map<String, Value>,
        pointer: &str,
    ) -> Result<Option<Reference>, SchemaError> {
        let Some(target) = obj.get("$ref") else {
            return Ok(None);
        };
        let at = child_pointer(pointer, "$ref");
        let target = target.as_str().ok_or_else(|| bad(&at, "must be a string"))?;
        if target == "#" {
            return Ok(Some(Reference::Root));
        }
        let name = target
            .strip_prefix("#/definitions/")
            .or_else(|| target.strip_prefix("#/$defs/"))
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .ok_or_else(|| SchemaError::UnresolvedRef {
                pointer: at.clone(),
                reference: target.to_string(),
            })?;
        let name = unescape_pointer(name);
        self.references.push((at, name.clone()));
        Ok(Some(Reference::Definition(name)))
    }
}

fn types(obj: &Map<String, Value>, pointer: &str) -> Result<Option<Vec<JsonType>>, SchemaError> {
    let Some(value) = obj.get("type") else {
        return Ok(None);
    };
    let at = child_pointer(pointer, "type");
    let parse = |name: &Value| -> Result<Option<JsonType>, SchemaError> {
        let name = name.as_str().ok_or_else(|| bad(&at, "must name a type"))?;
        if name == "any" {
            return Ok(None);
        }
        JsonType::parse(name)
            .map(Some)
            .ok_or_else(|| bad(&at, format!("unknown type '{name}'")))
    };
    match value {
        Value::Array(names) => {
            let mut types = Vec::with_capacity(names.len());
            for name in names {
                match parse(name)? {
                    Some(ty) => types.push(ty),
                    None => return Ok(None),
                }
            }
            Ok(Some(types))
        }
        single => Ok(parse(single)?.map(|ty| vec![ty])),
    }
}

fn count(obj: &Map<String, Value>, key: &str, pointer: &str) -> Result<Option<usize>, SchemaError> {
    let Some(value) = obj.get(key) else {
        return Ok(None);
    };
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| bad(&child_pointer(pointer, key), "must be a non-negative integer"))
}

fn flag(obj: &Map<String, Value>, key: &str, pointer: &str) -> Result<bool, SchemaError> {
    match obj.get(key) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(bad(&child_pointer(pointer, key), "must be a boolean")),
    }
}

/// Read `minimum`-style bounds in both draft-4 (boolean exclusive flag) and
/// draft-6 (numeric exclusive bound) spellings. When both an inclusive and a
/// numeric exclusive bound are present the stricter one wins.
fn bound(
    obj: &Map<String, Value>,
    inclusive_key: &str,
    exclusive_key: &str,
    pointer: &str,
) -> Result<Option<Bound>, SchemaError> {
    let inclusive = match obj.get(inclusive_key) {
        None => None,
        Some(v) => Some(
            v.as_f64()
                .ok_or_else(|| bad(&child_pointer(pointer, inclusive_key), "must be a number"))?,
        ),
    };
    let lower = inclusive_key == "minimum";
    match (inclusive, obj.get(exclusive_key)) {
        (inclusive, None) => Ok(inclusive.map(|value| Bound {
            value,
            exclusive: false,
        })),
        (inclusive, Some(Value::Bool(exclusive))) => Ok(inclusive.map(|value| Bound {
            value,
            exclusive: *exclusive,
        })),
        (inclusive, Some(Value::Number(n))) => {
            let exclusive = Bound {
                value: n.as_f64().unwrap_or_default(),
                exclusive: true,
            };
            let Some(value) = inclusive else {
                return Ok(Some(exclusive));
            };
            let stricter_exclusive = if lower {
                exclusive.value >= value
            } else {
                exclusive.value <= value
            };
            Ok(Some(if stricter_exclusive {
                exclusive
            } else {
                Bound {
                    value,
                    exclusive: false,
                }
            }))
        }
        (_, Some(_)) => Err(bad(
            &child_pointer(pointer, exclusive_key),
            "must be a boolean or a number",
        )),
    }
}

fn compile_regex(pattern: &Value, pointer: &str) -> Result<Regex, SchemaError> {
    let pattern = pattern.as_str().ok_or_else(|| bad(pointer, "must be a string"))?;
    Regex::new(pattern).map_err(|err| SchemaError::BadPattern {
        pointer: pointer.to_string(),
        reason: err.to_string(),
    })
}

fn bad(pointer: &str, reason: impl Into<String>) -> SchemaError {
    SchemaError::BadKeyword {
        pointer: pointer.to_string(),
        reason: reason.into(),
    }
}

fn child_pointer(pointer: &str, key: &str) -> String {
    format!("{pointer}/{}", key.replace('~', "~0").replace('/', "~1"))
}

fn unescape_pointer(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}
