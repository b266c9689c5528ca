//! Per-call metadata handed to field resolvers by the query engine

use crate::cache::types::{CacheHint, JsonMap};
use crate::schema::types::{ObjectType, OutputType};
use std::sync::Arc;

/// Field name of the reference-resolution entry point of node types
pub const RESOLVE_REFERENCE_FIELD: &str = "__resolveReference";

/// Position of the resolved field in the schema plus its cache hint
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveInfo {
    /// Name of the field being resolved
    pub field_name: String,
    /// Type that declares the field
    pub parent_type: Arc<ObjectType>,
    /// Declared return type of the field
    pub return_type: OutputType,
    /// Hint computed by the engine from schema cache annotations
    pub cache_hint: CacheHint,
}

impl ResolveInfo {
    /// Create resolve info with an uncached hint
    pub fn new(
        field_name: impl Into<String>,
        parent_type: Arc<ObjectType>,
        return_type: impl Into<OutputType>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            parent_type,
            return_type: return_type.into(),
            cache_hint: CacheHint::uncached(),
        }
    }

    /// Attach the engine's cache hint
    pub fn with_cache_hint(mut self, hint: CacheHint) -> Self {
        self.cache_hint = hint;
        self
    }

    /// Same position, resolved through the reference entry point
    pub fn for_reference(mut self) -> Self {
        self.field_name = RESOLVE_REFERENCE_FIELD.to_string();
        self
    }

    pub fn is_reference_resolution(&self) -> bool {
        self.field_name == RESOLVE_REFERENCE_FIELD
    }
}

/// Everything a field resolver receives for one call
#[derive(Debug)]
pub struct FieldInvocation<C> {
    /// Resolved value of the parent object
    pub parent: JsonMap,
    /// Field arguments
    pub args: JsonMap,
    /// Request context
    pub context: Arc<C>,
    /// Field metadata
    pub info: ResolveInfo,
}

impl<C> FieldInvocation<C> {
    pub fn new(parent: JsonMap, args: JsonMap, context: Arc<C>, info: ResolveInfo) -> Self {
        Self {
            parent,
            args,
            context,
            info,
        }
    }
}

impl<C> Clone for FieldInvocation<C> {
    fn clone(&self) -> Self {
        Self {
            parent: self.parent.clone(),
            args: self.args.clone(),
            context: Arc::clone(&self.context),
            info: self.info.clone(),
        }
    }
}
