//! # Ouroboros Field Cache (ouroboros-field-cache)
//!
//! A cache-aside layer for graph query field resolvers.
//!
//! ## Features
//!
//! - Resolver decoration that keeps the wrapped resolver's inputs and outputs
//! - Deterministic keys derived from `@key` entity identity
//! - Per-session scoping of private results
//! - In-memory store with lazy TTL expiry and optional LRU bound
//! - Redis store (`redis` feature)
//! - Failures of the store never fail a resolution
//!
//! ## Key Formats
//!
//! | Kind           | Literal                                   |
//! |----------------|-------------------------------------------|
//! | node-id        | `{<session>}Type.id`                      |
//! | parent-field   | `{<session>}Parent{id}.field(argsJSON)`   |
//!
//! `argsJSON` is compact JSON with object keys sorted at every depth, so
//! identical argument sets always produce identical keys.
//!
//! ## Decorating a Resolver
//!
//! ```no_run
//! use ouroboros_field_cache::{CacheHint, CacheOptions, CacheSettings, FieldCache, SessionIdSource};
//! use ouroboros_field_cache::schema::{FieldInvocation, ObjectType, ResolveInfo};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct RequestContext {
//!     session_id: Option<String>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = CacheSettings::from_env()?;
//!     let store = settings.build_store().await?;
//!     let cache = FieldCache::new(settings.defaults::<RequestContext>(store));
//!
//!     let options = CacheOptions::new()
//!         .session_id(SessionIdSource::resolve(|ctx: &RequestContext| ctx.session_id.clone()));
//!
//!     let me = cache.decorate_with(options, |inv: FieldInvocation<RequestContext>| async move {
//!         Ok::<_, anyhow::Error>(json!({ "id": inv.args["id"], "email": "ada@example.com" }))
//!     });
//!
//!     let info = ResolveInfo::new("me", Arc::new(ObjectType::new("Query")), ObjectType::node("User", "id"))
//!         .with_cache_hint(CacheHint::private(30));
//!     let args = json!({ "id": "1" }).as_object().cloned().unwrap_or_default();
//!     let context = Arc::new(RequestContext {
//!         session_id: Some("abc".to_string()),
//!     });
//!
//!     // Stored under `<abc>User.1`
//!     let user = me
//!         .resolve(FieldInvocation::new(Default::default(), args, context, info))
//!         .await?;
//!     println!("{}", user);
//!     Ok(())
//! }
//! ```
//!
//! ## Entity References
//!
//! Reference resolvers receive the reference object in place of the parent;
//! node-id keys then read the identifier from the reference instead of the
//! arguments:
//!
//! ```no_run
//! use ouroboros_field_cache::cache::JsonMap;
//! use ouroboros_field_cache::{CacheHint, FieldCache};
//! use ouroboros_field_cache::schema::{ObjectType, ResolveInfo};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = FieldCache::<()>::default();
//!     let user = Arc::new(ObjectType::node("User", "id"));
//!
//!     let resolve_user = cache.decorate_reference(|reference: JsonMap, _ctx: Arc<()>, _info: ResolveInfo| async move {
//!         Ok::<_, anyhow::Error>(json!({ "id": reference["id"], "name": "Grace" }))
//!     });
//!
//!     let info = ResolveInfo::new("user", user.clone(), user).with_cache_hint(CacheHint::public(300));
//!     let reference = json!({ "id": "7" }).as_object().cloned().unwrap_or_default();
//!
//!     // Stored under `User.7`
//!     let value = resolve_user.resolve_reference(reference, Arc::new(()), info).await?;
//!     println!("{}", value);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod schema;
pub mod settings;

// Re-export main types for convenience
pub use cache::{
    CacheDefaults, CacheEvent, CacheEventSink, CacheHint, CacheKey, CacheKeyType, CacheOption,
    CacheOptionKind, CacheOptions, CacheScope, CacheStats, CacheValue, CachedFieldResolver,
    CachedReferenceResolver, FieldCache, FieldDecorator, InMemoryStore, KeyValueStore,
    MemoryStoreConfig, PrivateScopePolicy, SessionIdSource, SharedStore, TracingSink,
};
#[cfg(feature = "redis")]
pub use cache::{RedisStore, RedisStoreConfig};
pub use error::{CacheError, Result};
pub use settings::CacheSettings;
