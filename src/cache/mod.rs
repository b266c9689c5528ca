//! # Field-Level Cache-Aside Layer
//!
//! This module wraps graph query field resolvers so that their results are
//! read from and written to a key-value store.
//!
//! ## Features
//!
//! - **Identity-Based Keys**: Results of node-returning fields are keyed by the
//!   node identity (`User.42`), everything else relative to its parent node and
//!   arguments (`User{42}.friends({"first":10})`)
//! - **Session Scoping**: Private hints prefix keys with a session token
//!   (`<abc>User.42`) and bypass the cache when no session is known
//! - **TTL-Based Expiration**: Entries live for the hint's max-age
//! - **Pluggable Stores**: In-memory store with lazy expiry and optional LRU
//!   bound, Redis store behind the `redis` feature
//! - **Fail-Open**: Store failures are treated as misses and never change
//!   whether a resolution succeeds
//!
//! ## Example
//!
//! ```rust
//! use ouroboros_field_cache::cache::{CacheHint, FieldCache};
//! use ouroboros_field_cache::schema::{FieldInvocation, ObjectType, ResolveInfo};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache = FieldCache::<()>::default();
//!
//! let user = cache.decorate(|inv: FieldInvocation<()>| async move {
//!     Ok::<_, anyhow::Error>(json!({ "id": inv.args["id"], "name": "Ada" }))
//! });
//!
//! let info = ResolveInfo::new("user", Arc::new(ObjectType::new("Query")), ObjectType::node("User", "id"))
//!     .with_cache_hint(CacheHint::public(60));
//! let args = json!({ "id": "42" }).as_object().cloned().unwrap_or_default();
//!
//! // First call resolves and stores `User.42`, the second one is served from the store
//! let value = user.resolve(FieldInvocation::new(Default::default(), args, Arc::new(()), info)).await?;
//! println!("Resolved: {}", value);
//!
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod events;
pub mod key;
pub mod memory;
pub mod options;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod resolver;
pub mod session;
pub mod store;
pub mod types;

pub use config::{MemoryStoreConfig, MemoryStoreConfigBuilder};
pub use events::{CacheEvent, CacheEventSink, NoopSink, SharedSink, TracingSink};
pub use key::{
    canonical_arguments, canonical_json, node_id_cache_key, parent_field_cache_key, resolve_cache_key,
    CacheKeyFn, KeyStrategy, NodeIdFn,
};
pub use memory::InMemoryStore;
pub use options::{
    CacheDefaults, CacheHintFn, CacheOption, CacheOptionKind, CacheOptions, CacheSource, ResolvedOptions,
    StoreSelector,
};
#[cfg(feature = "redis")]
pub use redis_store::{RedisStore, RedisStoreConfig};
pub use resolver::{CachedFieldResolver, CachedReferenceResolver, FieldCache, FieldDecorator};
pub use session::{resolve_session_scope, PrivateScopePolicy, SessionIdSource, SessionScope};
pub use store::{KeyValueStore, SharedStore};
pub use types::{CacheHint, CacheKey, CacheKeyType, CacheScope, CacheStats, CacheValue, JsonMap};
