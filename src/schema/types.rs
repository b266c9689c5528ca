//! Typed view of the schema metadata the cache layer consumes
//!
//! The query engine owns the schema. The cache only needs to know, for every
//! object type, whether it carries an `@key` identity directive and which
//! field that directive names. That is resolved once, when the type is built,
//! so key derivation never walks directive lists on the hot path.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name of the identity directive
pub const KEY_DIRECTIVE: &str = "key";

/// Argument of the identity directive naming the identifying field
pub const KEY_FIELDS_ARGUMENT: &str = "fields";

/// SDL declaration of the identity directive, for schemas that need to declare it
pub const KEY_DIRECTIVE_TYPE_DEF: &str =
    "directive @key(fields: String!) repeatable on OBJECT | INTERFACE";

/// A directive applied to a type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    /// Directive name without the leading `@`
    pub name: String,
    /// Arguments in declaration order
    #[serde(default)]
    pub arguments: Vec<DirectiveArgument>,
}

impl Directive {
    /// Create a directive without arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    /// Add an argument
    pub fn argument(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.arguments.push(DirectiveArgument {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// `@key(fields: "<fields>")`
    pub fn key(fields: impl Into<String>) -> Self {
        let fields: String = fields.into();
        Self::new(KEY_DIRECTIVE).argument(KEY_FIELDS_ARGUMENT, fields)
    }

    /// Look up an argument value by name
    pub fn get_argument(&self, name: &str) -> Option<&JsonValue> {
        self.arguments
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }
}

/// A single directive argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveArgument {
    pub name: String,
    pub value: JsonValue,
}

/// Identity descriptor of a node type
///
/// `key_fields` is `None` when the `@key` directive is present but its
/// `fields` argument is missing or not a string. Such a type is still a node,
/// it just never yields an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeIdentity {
    key_fields: Option<String>,
}

impl TypeIdentity {
    /// Identity keyed by the given field
    pub fn new(key_fields: impl Into<String>) -> Self {
        Self {
            key_fields: Some(key_fields.into()),
        }
    }

    /// Resolve the identity of a type from its directives
    ///
    /// The first `@key` directive wins; later ones are ignored.
    pub fn from_directives(directives: &[Directive]) -> Option<Self> {
        let key = directives.iter().find(|dir| dir.name == KEY_DIRECTIVE)?;
        let key_fields = match key.get_argument(KEY_FIELDS_ARGUMENT) {
            Some(JsonValue::String(fields)) => Some(fields.clone()),
            _ => None,
        };
        Some(Self { key_fields })
    }

    /// Name of the identifying field
    pub fn key_fields(&self) -> Option<&str> {
        self.key_fields.as_deref()
    }
}

/// An object type of the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectType {
    name: String,
    identity: Option<TypeIdentity>,
}

impl ObjectType {
    /// Plain object type without identity
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: None,
        }
    }

    /// Node type identified by `key_fields`
    pub fn node(name: impl Into<String>, key_fields: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: Some(TypeIdentity::new(key_fields)),
        }
    }

    /// Build a type from its definition, resolving identity from the directives
    pub fn from_definition(name: impl Into<String>, directives: &[Directive]) -> Self {
        Self {
            name: name.into(),
            identity: TypeIdentity::from_directives(directives),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identity(&self) -> Option<&TypeIdentity> {
        self.identity.as_ref()
    }

    /// Whether the type is identity-bearing
    pub fn is_node(&self) -> bool {
        self.identity.is_some()
    }

    /// Identifying field, if this is a node with a usable `@key`
    pub fn key_fields(&self) -> Option<&str> {
        self.identity.as_ref().and_then(TypeIdentity::key_fields)
    }
}

/// Output type of a field as seen by the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputType {
    Object(Arc<ObjectType>),
    Scalar(String),
    List(Box<OutputType>),
    NonNull(Box<OutputType>),
}

impl OutputType {
    pub fn object(object: Arc<ObjectType>) -> Self {
        OutputType::Object(object)
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        OutputType::Scalar(name.into())
    }

    /// Wrap in a non-null modifier
    pub fn non_null(self) -> Self {
        OutputType::NonNull(Box::new(self))
    }

    /// Wrap in a list modifier
    pub fn list(self) -> Self {
        OutputType::List(Box::new(self))
    }

    /// Strip one non-null modifier
    pub fn nullable(&self) -> &OutputType {
        match self {
            OutputType::NonNull(inner) => inner,
            other => other,
        }
    }

    /// The object type, if this is an object or a non-null object
    pub fn as_object(&self) -> Option<&Arc<ObjectType>> {
        match self.nullable() {
            OutputType::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The node type, if this is a node or a non-null node
    pub fn as_node(&self) -> Option<&Arc<ObjectType>> {
        self.as_object().filter(|object| object.is_node())
    }

    pub fn is_node(&self) -> bool {
        self.as_node().is_some()
    }
}

impl From<Arc<ObjectType>> for OutputType {
    fn from(object: Arc<ObjectType>) -> Self {
        OutputType::Object(object)
    }
}

impl From<ObjectType> for OutputType {
    fn from(object: ObjectType) -> Self {
        OutputType::Object(Arc::new(object))
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputType::Object(object) => write!(f, "{}", object.name()),
            OutputType::Scalar(name) => write!(f, "{}", name),
            OutputType::List(inner) => write!(f, "[{}]", inner),
            OutputType::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

/// Object type definition as delivered by the schema loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectTypeDefinition {
    pub name: String,
    #[serde(default)]
    pub directives: Vec<Directive>,
}

/// Object types of one schema load, with identities resolved up front
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<ObjectType>>,
}

impl TypeRegistry {
    /// Resolve every definition once
    pub fn from_definitions<'a>(
        definitions: impl IntoIterator<Item = &'a ObjectTypeDefinition>,
    ) -> Self {
        let types = definitions
            .into_iter()
            .map(|def| {
                let object = ObjectType::from_definition(def.name.clone(), &def.directives);
                (def.name.clone(), Arc::new(object))
            })
            .collect();
        Self { types }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ObjectType>> {
        self.types.get(name).cloned()
    }

    /// Names of all node types
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.types
            .values()
            .filter(|object| object.is_node())
            .map(|object| object.name())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
