//! Cache key derivation
//!
//! Every cacheable field invocation maps to exactly one of two key shapes:
//!
//! - **node-id**: `Type.id`. Used when the field returns a node; the entry is
//!   addressed by the identity of the returned entity, so every query path
//!   reaching the same entity shares one slot.
//! - **parent-field**: `Parent{id}.field(args)`. Used when the returned value
//!   has no identity of its own; the entry is addressed relative to its parent
//!   node and the exact arguments that produced it.
//!
//! Both shapes get a `<session>` prefix when the entry is privately scoped.
//! The literals are part of the public contract; external tooling parses them.

use crate::cache::types::{CacheKey, CacheKeyType, JsonMap};
use crate::schema::ResolveInfo;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// Override for identifier extraction: `(parent, args, context) -> id`
pub type NodeIdFn<C> = Arc<dyn Fn(&JsonMap, &JsonMap, &C) -> Option<String> + Send + Sync>;

/// Override for the whole key: `(session, info, parent, args, context) -> key`
pub type CacheKeyFn<C> =
    Arc<dyn Fn(Option<&str>, &ResolveInfo, &JsonMap, &JsonMap, &C) -> Option<CacheKey> + Send + Sync>;

/// Per-field key derivation settings
pub struct KeyStrategy<C> {
    /// Forced key type; automatic classification when `None`
    pub cache_key_type: Option<CacheKeyType>,
    /// Identifier extraction override
    pub node_id: Option<NodeIdFn<C>>,
}

impl<C> Default for KeyStrategy<C> {
    fn default() -> Self {
        Self {
            cache_key_type: None,
            node_id: None,
        }
    }
}

impl<C> Clone for KeyStrategy<C> {
    fn clone(&self) -> Self {
        Self {
            cache_key_type: self.cache_key_type,
            node_id: self.node_id.clone(),
        }
    }
}

impl<C> fmt::Debug for KeyStrategy<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStrategy")
            .field("cache_key_type", &self.cache_key_type)
            .field("node_id", &self.node_id.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Automatic key type: node-id for node return types, parent-field otherwise
pub fn classify(info: &ResolveInfo) -> CacheKeyType {
    if info.return_type.is_node() {
        CacheKeyType::NodeId
    } else {
        CacheKeyType::ParentField
    }
}

fn string_field(map: &JsonMap, field: &str) -> Option<String> {
    map.get(field)?.as_str().map(str::to_owned)
}

/// Extract the raw identifier for the given key type
///
/// The type addressed by the key type (the return type for node-id, the
/// parent type for parent-field) has to be a node before any extraction is
/// attempted. This includes the `node_id` override.
pub fn resolve_node_id<C>(
    key_type: CacheKeyType,
    node_id: Option<&NodeIdFn<C>>,
    info: &ResolveInfo,
    parent: &JsonMap,
    args: &JsonMap,
    context: &C,
) -> Option<String> {
    match key_type {
        CacheKeyType::NodeId => {
            let node = info.return_type.as_node()?;
            if let Some(f) = node_id {
                return f(parent, args, context);
            }
            let key_fields = node.key_fields()?;
            if info.is_reference_resolution() {
                string_field(parent, key_fields)
            } else {
                string_field(args, key_fields)
            }
        }
        CacheKeyType::ParentField => {
            if !info.parent_type.is_node() {
                return None;
            }
            if let Some(f) = node_id {
                return f(parent, args, context);
            }
            string_field(parent, info.parent_type.key_fields()?)
        }
    }
}

/// Derive the cache key of one invocation, `None` when it is not cacheable
pub fn resolve_cache_key<C>(
    strategy: &KeyStrategy<C>,
    session: Option<&str>,
    info: &ResolveInfo,
    parent: &JsonMap,
    args: &JsonMap,
    context: &C,
) -> Option<CacheKey> {
    let key_type = strategy.cache_key_type.unwrap_or_else(|| classify(info));
    let id = resolve_node_id(key_type, strategy.node_id.as_ref(), info, parent, args, context)?;

    match key_type {
        CacheKeyType::NodeId => {
            let node = info.return_type.as_node()?;
            Some(node_id_cache_key(node.name(), &id, session))
        }
        CacheKeyType::ParentField => Some(parent_field_cache_key(
            info.parent_type.name(),
            &id,
            &info.field_name,
            args,
            session,
        )),
    }
}

fn session_prefix(session: Option<&str>) -> String {
    match session {
        Some(token) if !token.is_empty() => format!("<{}>", token),
        _ => String::new(),
    }
}

/// `{<session>}Type.id`
pub fn node_id_cache_key(type_name: &str, node_id: &str, session: Option<&str>) -> CacheKey {
    format!("{}{}.{}", session_prefix(session), type_name, node_id)
}

/// `{<session>}Parent{id}.field(args)`
pub fn parent_field_cache_key(
    parent_type_name: &str,
    parent_id: &str,
    field_name: &str,
    args: &JsonMap,
    session: Option<&str>,
) -> CacheKey {
    format!(
        "{}{}{{{}}}.{}({})",
        session_prefix(session),
        parent_type_name,
        parent_id,
        field_name,
        canonical_arguments(args)
    )
}

/// Compact JSON of the arguments with object keys sorted at every depth
pub fn canonical_arguments(args: &JsonMap) -> String {
    let mut out = String::new();
    write_object(&mut out, args);
    out
}

/// Compact JSON of any value with object keys sorted at every depth
pub fn canonical_json(value: &JsonValue) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &JsonValue) {
    match value {
        JsonValue::Object(map) => write_object(out, map),
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_object(out: &mut String, map: &JsonMap) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    out.push('{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&JsonValue::from(key.as_str()).to_string());
        out.push(':');
        write_value(out, &map[key.as_str()]);
    }
    out.push('}');
}
