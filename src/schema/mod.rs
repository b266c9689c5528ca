//! Schema metadata consumed by the cache layer
//!
//! This module provides:
//! - Object and output types with their `@key` identity resolved up front
//! - A registry built once per schema load
//! - Per-call resolve info and the invocation handed to resolvers

pub mod info;
pub mod types;

pub use info::{FieldInvocation, ResolveInfo, RESOLVE_REFERENCE_FIELD};
pub use types::{
    Directive, DirectiveArgument, ObjectType, ObjectTypeDefinition, OutputType, TypeIdentity,
    TypeRegistry, KEY_DIRECTIVE, KEY_DIRECTIVE_TYPE_DEF, KEY_FIELDS_ARGUMENT,
};
