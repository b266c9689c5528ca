//! Field Cache Demo Application
//!
//! Decorates a few resolvers and shows hits, misses, session scoping and
//! reference resolution.
//!
//! Usage:
//!   cargo run --example field_cache_demo
//!   cargo run --example field_cache_demo --features redis
//!
//! Environment variables:
//!   RUST_LOG                   - Log filter (default: info,ouroboros_field_cache=debug)
//!   FIELD_CACHE_REDIS_URL      - Use Redis instead of the in-memory store
//!   FIELD_CACHE_MAX_ENTRIES    - LRU bound of the in-memory store
//!   FIELD_CACHE_PRIVATE_SCOPE  - bypass | unscoped

use ouroboros_field_cache::cache::JsonMap;
use ouroboros_field_cache::schema::{
    Directive, FieldInvocation, ObjectTypeDefinition, OutputType, ResolveInfo, TypeRegistry,
};
use ouroboros_field_cache::{CacheHint, CacheOptions, CacheSettings, FieldCache, SessionIdSource};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct RequestContext {
    session_id: Option<String>,
}

fn object(value: serde_json::Value) -> JsonMap {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ouroboros_field_cache=debug")),
        )
        .init();

    info!("=== Field Cache Demo ===");

    let settings = CacheSettings::from_env()?;
    info!("Settings: {:?}", settings);

    let store = settings.build_store().await?;
    let cache = FieldCache::new(settings.defaults::<RequestContext>(store));

    let registry = TypeRegistry::from_definitions(&[
        ObjectTypeDefinition {
            name: "Query".to_string(),
            directives: vec![],
        },
        ObjectTypeDefinition {
            name: "User".to_string(),
            directives: vec![Directive::key("id")],
        },
    ]);
    let query = registry
        .get("Query")
        .ok_or_else(|| anyhow::anyhow!("Query type missing"))?;
    let user = registry
        .get("User")
        .ok_or_else(|| anyhow::anyhow!("User type missing"))?;

    let calls = Arc::new(AtomicUsize::new(0));

    info!("\n--- Node-id caching (Query.user) ---");
    let counter = calls.clone();
    let user_resolver = cache.decorate(move |inv: FieldInvocation<RequestContext>| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(json!({ "id": inv.args["id"], "name": "Ada Lovelace" }))
        }
    });

    let user_info = ResolveInfo::new("user", query.clone(), OutputType::from(user.clone()))
        .with_cache_hint(CacheHint::public(60));
    for attempt in 1..=2 {
        let context = Arc::new(RequestContext { session_id: None });
        let invocation =
            FieldInvocation::new(JsonMap::new(), object(json!({ "id": "1" })), context, user_info.clone());
        let value = user_resolver.resolve(invocation).await?;
        info!(
            "Attempt {}: {} (resolver calls so far: {})",
            attempt,
            value,
            calls.load(Ordering::SeqCst)
        );
    }

    info!("\n--- Parent-field caching (User.posts) ---");
    let posts_resolver = cache.decorate(|inv: FieldInvocation<RequestContext>| async move {
        let first = inv.args["first"].as_u64().unwrap_or(10);
        Ok::<_, anyhow::Error>((1..=first).map(|n| format!("post-{}", n)).collect::<Vec<_>>())
    });
    let posts_info = ResolveInfo::new("posts", user.clone(), OutputType::scalar("String").list())
        .with_cache_hint(CacheHint::public(30));
    let invocation = FieldInvocation::new(
        object(json!({ "id": "1" })),
        object(json!({ "first": 3 })),
        Arc::new(RequestContext { session_id: None }),
        posts_info,
    );
    let posts = posts_resolver.resolve(invocation).await?;
    info!("Posts: {:?}", posts);

    info!("\n--- Private scope (Query.me) ---");
    let options = CacheOptions::new()
        .session_id(SessionIdSource::resolve(|ctx: &RequestContext| ctx.session_id.clone()));
    let me_resolver = cache.decorate_with(options, |inv: FieldInvocation<RequestContext>| async move {
        Ok::<_, anyhow::Error>(json!({ "id": inv.args["id"], "email": "ada@example.com" }))
    });
    let me_info = ResolveInfo::new("me", query.clone(), OutputType::from(user.clone()))
        .with_cache_hint(CacheHint::private(30));

    for session_id in [Some("session-a".to_string()), None] {
        let has_session = session_id.is_some();
        let invocation = FieldInvocation::new(
            JsonMap::new(),
            object(json!({ "id": "1" })),
            Arc::new(RequestContext { session_id }),
            me_info.clone(),
        );
        let value = me_resolver.resolve(invocation).await?;
        info!("With session: {} -> {}", has_session, value);
    }

    info!("\n--- Reference resolution (User.__resolveReference) ---");
    let counter = calls.clone();
    let reference_resolver = cache.decorate_reference(
        move |reference: JsonMap, _ctx: Arc<RequestContext>, _info: ResolveInfo| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(json!({ "id": reference["id"], "name": "Ada Lovelace" }))
            }
        },
    );
    let reference_info =
        ResolveInfo::new("user", user.clone(), OutputType::from(user)).with_cache_hint(CacheHint::public(60));
    let value = reference_resolver
        .resolve_reference(
            object(json!({ "id": "1" })),
            Arc::new(RequestContext { session_id: None }),
            reference_info,
        )
        .await?;
    info!(
        "Reference: {} (resolver calls so far: {})",
        value,
        calls.load(Ordering::SeqCst)
    );

    info!("\n=== Demo Complete ===");
    Ok(())
}
