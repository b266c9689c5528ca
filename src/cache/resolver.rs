//! Cache-aside decoration of field resolvers
//!
//! A decorated resolver accepts the same [`FieldInvocation`] and produces the
//! same `Result<T, E>` as the resolver it wraps. Per call it:
//!
//! 1. picks the store and the cache hint
//! 2. resolves the session scope and bypasses the cache when a private hint
//!    has no session (unless the unscoped policy is configured)
//! 3. derives the key and bypasses the cache when there is none
//! 4. serves a decodable stored value without calling the wrapped resolver
//! 5. otherwise calls the wrapped resolver, propagating its error unchanged
//! 6. writes the result back when the hint allows it
//!
//! Store failures are reported as events and treated as misses. They never
//! change whether a resolution succeeds.

use crate::cache::{
    events::CacheEvent,
    key::resolve_cache_key,
    memory::InMemoryStore,
    options::{CacheDefaults, CacheOption, CacheOptionKind, CacheOptions, ResolvedOptions},
    session::{resolve_session_scope, PrivateScopePolicy, SessionScope},
    store::{KeyValueStore, SharedStore},
    types::{CacheKey, CacheValue, JsonMap},
};
use crate::schema::{FieldInvocation, ResolveInfo};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Entry point for decorating resolvers against a set of defaults
pub struct FieldCache<C> {
    defaults: CacheDefaults<C>,
    fallback_store: OnceLock<SharedStore>,
}

impl<C: Send + Sync + 'static> Default for FieldCache<C> {
    fn default() -> Self {
        Self::new(CacheDefaults::default())
    }
}

impl<C> fmt::Debug for FieldCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCache")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl<C> FieldCache<C>
where
    C: Send + Sync + 'static,
{
    pub fn new(defaults: CacheDefaults<C>) -> Self {
        Self {
            defaults,
            fallback_store: OnceLock::new(),
        }
    }

    pub fn defaults(&self) -> &CacheDefaults<C> {
        &self.defaults
    }

    /// Set or replace one default for resolvers decorated from now on
    pub fn set_default(&mut self, option: CacheOption<C>) {
        self.defaults.set_default(option);
    }

    /// Set one default unless it is already set
    pub fn append_default(&mut self, option: CacheOption<C>) -> bool {
        self.defaults.append_default(option)
    }

    pub fn clear_default(&mut self, kind: CacheOptionKind) {
        self.defaults.clear_default(kind);
    }

    /// Bind per-field overrides; the returned decorator can wrap many resolvers
    pub fn with_options(&self, options: CacheOptions<C>) -> FieldDecorator<C> {
        let resolved = self
            .defaults
            .resolve(&options, || Arc::clone(self.fallback_store()));
        debug!("Resolved field cache options: {:?}", resolved);

        FieldDecorator {
            options: Arc::new(resolved),
        }
    }

    /// Wrap a field resolver using the defaults only
    pub fn decorate<F>(&self, resolver: F) -> CachedFieldResolver<C, F> {
        self.with_options(CacheOptions::default()).decorate(resolver)
    }

    /// Wrap a field resolver with per-field overrides
    pub fn decorate_with<F>(&self, options: CacheOptions<C>, resolver: F) -> CachedFieldResolver<C, F> {
        self.with_options(options).decorate(resolver)
    }

    /// Wrap a reference resolver using the defaults only
    pub fn decorate_reference<F>(&self, resolver: F) -> CachedReferenceResolver<C, F> {
        self.with_options(CacheOptions::default())
            .decorate_reference(resolver)
    }

    /// Wrap a reference resolver with overrides
    pub fn decorate_reference_with<F>(
        &self,
        options: CacheOptions<C>,
        resolver: F,
    ) -> CachedReferenceResolver<C, F> {
        self.with_options(options).decorate_reference(resolver)
    }

    fn fallback_store(&self) -> &SharedStore {
        self.fallback_store
            .get_or_init(|| Arc::new(InMemoryStore::new()))
    }
}

/// Options bound once, applied to any number of resolvers
pub struct FieldDecorator<C> {
    options: Arc<ResolvedOptions<C>>,
}

impl<C> Clone for FieldDecorator<C> {
    fn clone(&self) -> Self {
        Self {
            options: Arc::clone(&self.options),
        }
    }
}

impl<C> fmt::Debug for FieldDecorator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDecorator")
            .field("options", &self.options)
            .finish()
    }
}

impl<C> FieldDecorator<C> {
    pub fn options(&self) -> &ResolvedOptions<C> {
        &self.options
    }

    pub fn decorate<F>(&self, resolver: F) -> CachedFieldResolver<C, F> {
        CachedFieldResolver {
            options: Arc::clone(&self.options),
            resolver: Arc::new(resolver),
        }
    }

    pub fn decorate_reference<F>(&self, resolver: F) -> CachedReferenceResolver<C, F> {
        CachedReferenceResolver {
            options: Arc::clone(&self.options),
            resolver: Arc::new(resolver),
        }
    }
}

/// Field resolver wrapped with cache-aside behaviour
pub struct CachedFieldResolver<C, F> {
    options: Arc<ResolvedOptions<C>>,
    resolver: Arc<F>,
}

impl<C, F> Clone for CachedFieldResolver<C, F> {
    fn clone(&self) -> Self {
        Self {
            options: Arc::clone(&self.options),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<C, F> fmt::Debug for CachedFieldResolver<C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedFieldResolver")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<C, F> CachedFieldResolver<C, F>
where
    C: Send + Sync + 'static,
{
    pub fn options(&self) -> &ResolvedOptions<C> {
        &self.options
    }

    /// Resolve one field invocation through the cache
    pub async fn resolve<Fut, T, E>(&self, invocation: FieldInvocation<C>) -> Result<T, E>
    where
        F: Fn(FieldInvocation<C>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize + DeserializeOwned,
    {
        let resolver = self.resolver.as_ref();
        cache_aside(&self.options, invocation, |invocation| resolver(invocation)).await
    }
}

/// Reference resolver wrapped with cache-aside behaviour
///
/// The reference takes the place of the parent and arguments are empty, so a
/// node-id key reads its identifier from the reference itself.
pub struct CachedReferenceResolver<C, F> {
    options: Arc<ResolvedOptions<C>>,
    resolver: Arc<F>,
}

impl<C, F> Clone for CachedReferenceResolver<C, F> {
    fn clone(&self) -> Self {
        Self {
            options: Arc::clone(&self.options),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<C, F> fmt::Debug for CachedReferenceResolver<C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedReferenceResolver")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<C, F> CachedReferenceResolver<C, F>
where
    C: Send + Sync + 'static,
{
    pub fn options(&self) -> &ResolvedOptions<C> {
        &self.options
    }

    /// Resolve one entity reference through the cache
    pub async fn resolve_reference<Fut, T, E>(
        &self,
        reference: JsonMap,
        context: Arc<C>,
        info: ResolveInfo,
    ) -> Result<T, E>
    where
        F: Fn(JsonMap, Arc<C>, ResolveInfo) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize + DeserializeOwned,
    {
        let invocation = FieldInvocation::new(reference, JsonMap::new(), context, info.for_reference());
        let resolver = self.resolver.as_ref();

        cache_aside(&self.options, invocation, |invocation| {
            resolver(invocation.parent, invocation.context, invocation.info)
        })
        .await
    }
}

async fn cache_aside<C, T, E, Fut, R>(
    options: &ResolvedOptions<C>,
    invocation: FieldInvocation<C>,
    call: R,
) -> Result<T, E>
where
    R: FnOnce(FieldInvocation<C>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    T: Serialize + DeserializeOwned,
{
    let store = options.cache.resolve(&invocation.context);
    let hint = options.hint(&invocation.context, &invocation.info);
    let scope = resolve_session_scope(options.session_id.as_ref(), invocation.context.as_ref(), &hint);

    if scope == SessionScope::Unavailable && options.private_scope_policy == PrivateScopePolicy::Bypass {
        options.logger.record(&CacheEvent::SkipNoSession {
            field: invocation.info.field_name.clone(),
        });
        return call(invocation).await;
    }

    let Some(key) = derive_key(options, scope.token(), &invocation).filter(|key| !key.is_empty()) else {
        options.logger.record(&CacheEvent::SkipNoKey {
            field: invocation.info.field_name.clone(),
        });
        return call(invocation).await;
    };

    if scope == SessionScope::Unavailable {
        options.logger.record(&CacheEvent::UnscopedPrivate {
            field: invocation.info.field_name.clone(),
            key: key.clone(),
        });
    }

    if let Some(cached) = read_cached::<C, T>(options, &*store, &key).await {
        return Ok(cached);
    }

    let result = call(invocation).await?;

    if let Some(ttl_seconds) = hint.ttl_seconds() {
        if let Some(text) = encode(options, &key, &result) {
            write_back(options, &*store, &key, text, ttl_seconds).await;
        }
    }

    Ok(result)
}

fn derive_key<C>(
    options: &ResolvedOptions<C>,
    session: Option<&str>,
    invocation: &FieldInvocation<C>,
) -> Option<CacheKey> {
    let context = invocation.context.as_ref();
    match &options.cache_key {
        Some(f) => f(session, &invocation.info, &invocation.parent, &invocation.args, context),
        None => resolve_cache_key(
            &options.key,
            session,
            &invocation.info,
            &invocation.parent,
            &invocation.args,
            context,
        ),
    }
}

async fn read_cached<C, T>(options: &ResolvedOptions<C>, store: &dyn KeyValueStore, key: &str) -> Option<T>
where
    T: DeserializeOwned,
{
    let text = match store.get(key).await {
        Ok(Some(text)) => text,
        Ok(None) => {
            options.logger.record(&CacheEvent::Miss { key: key.to_string() });
            return None;
        }
        Err(e) => {
            options.logger.record(&CacheEvent::StoreReadError {
                key: key.to_string(),
                error: e.to_string(),
            });
            return None;
        }
    };

    let value: JsonValue = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            options.logger.record(&CacheEvent::ParseError {
                key: key.to_string(),
                error: e.to_string(),
            });
            return None;
        }
    };

    if value.is_null() && !options.cache_null {
        options.logger.record(&CacheEvent::Miss { key: key.to_string() });
        return None;
    }

    match serde_json::from_value(value) {
        Ok(cached) => {
            options.logger.record(&CacheEvent::Hit { key: key.to_string() });
            Some(cached)
        }
        Err(e) => {
            options.logger.record(&CacheEvent::ParseError {
                key: key.to_string(),
                error: e.to_string(),
            });
            None
        }
    }
}

/// JSON text to store, `None` when the result may not be stored
fn encode<C, T: Serialize>(options: &ResolvedOptions<C>, key: &str, result: &T) -> Option<CacheValue> {
    let value = match serde_json::to_value(result) {
        Ok(value) => value,
        Err(e) => {
            options.logger.record(&CacheEvent::StoreWriteError {
                key: key.to_string(),
                error: e.to_string(),
            });
            return None;
        }
    };

    if value.is_null() && !options.cache_null {
        return None;
    }
    Some(value.to_string())
}

async fn write_back<C>(
    options: &ResolvedOptions<C>,
    store: &dyn KeyValueStore,
    key: &str,
    text: CacheValue,
    ttl_seconds: u64,
) {
    match store.set(key, text, ttl_seconds).await {
        Ok(()) => options.logger.record(&CacheEvent::Stored {
            key: key.to_string(),
            ttl_seconds,
        }),
        Err(e) => options.logger.record(&CacheEvent::StoreWriteError {
            key: key.to_string(),
            error: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::events::CacheEventSink;
    use crate::cache::session::SessionIdSource;
    use crate::cache::types::{CacheHint, CacheKeyType};
    use crate::error::{CacheError, Result as CacheResult};
    use crate::schema::{ObjectType, OutputType};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Ctx {
        session: Option<String>,
    }

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<CacheEvent>>>);

    impl RecordingSink {
        fn events(&self) -> Vec<CacheEvent> {
            self.0.lock().unwrap().clone()
        }
    }

    impl CacheEventSink for RecordingSink {
        fn record(&self, event: &CacheEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<CacheValue>> {
            Err(CacheError::Store("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: CacheValue, _ttl_seconds: u64) -> CacheResult<()> {
            Err(CacheError::Store("connection refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            Err(CacheError::Store("connection refused".to_string()))
        }
    }

    fn map(value: JsonValue) -> JsonMap {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn user_field(hint: CacheHint) -> ResolveInfo {
        ResolveInfo::new("user", Arc::new(ObjectType::new("Query")), ObjectType::node("User", "id"))
            .with_cache_hint(hint)
    }

    fn user_call(id: &str, ctx: Ctx, hint: CacheHint) -> FieldInvocation<Ctx> {
        FieldInvocation::new(JsonMap::new(), map(json!({ "id": id })), Arc::new(ctx), user_field(hint))
    }

    fn setup() -> (Arc<InMemoryStore>, RecordingSink, FieldCache<Ctx>) {
        let store = Arc::new(InMemoryStore::new());
        let sink = RecordingSink::default();
        let mut defaults = CacheDefaults::with_store(store.clone());
        defaults.set_default(CacheOption::Logger(Arc::new(sink.clone())));
        (store, sink, FieldCache::new(defaults))
    }

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (calls.clone(), calls)
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_store() {
        let (store, sink, cache) = setup();
        let (calls, seen) = counter();

        let resolver = cache.decorate(move |inv: FieldInvocation<Ctx>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(json!({ "id": inv.args["id"], "name": "Ada" }))
            }
        });

        let first = resolver.resolve(user_call("1", Ctx::default(), CacheHint::public(60))).await.unwrap();
        let second = resolver.resolve(user_call("1", Ctx::default(), CacheHint::public(60))).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.get("User.1").await.unwrap().as_deref(),
            Some("{\"id\":\"1\",\"name\":\"Ada\"}")
        );

        let events = sink.events();
        assert!(events.contains(&CacheEvent::Miss { key: "User.1".to_string() }));
        assert!(events.contains(&CacheEvent::Stored {
            key: "User.1".to_string(),
            ttl_seconds: 60
        }));
        assert!(events.contains(&CacheEvent::Hit { key: "User.1".to_string() }));
    }

    #[tokio::test]
    async fn test_resolver_error_propagates_and_is_not_cached() {
        let (store, _sink, cache) = setup();
        let resolver = cache.decorate(|_inv: FieldInvocation<Ctx>| async {
            Err::<JsonValue, _>("upstream failed".to_string())
        });

        let result = resolver.resolve(user_call("1", Ctx::default(), CacheHint::public(60))).await;
        assert_eq!(result, Err("upstream failed".to_string()));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_null_is_not_cached_by_default() {
        let (store, _sink, cache) = setup();
        let (calls, seen) = counter();
        let resolver = cache.decorate(move |_inv: FieldInvocation<Ctx>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<Option<JsonValue>, String>(None)
            }
        });

        for _ in 0..2 {
            let value = resolver.resolve(user_call("1", Ctx::default(), CacheHint::public(60))).await;
            assert_eq!(value, Ok(None));
        }
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_stored_null_is_ignored_without_cache_null() {
        let (store, _sink, cache) = setup();
        store.set("User.1", "null".to_string(), 60).await.unwrap();

        let (calls, seen) = counter();
        let resolver = cache.decorate(move |_inv: FieldInvocation<Ctx>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Some(json!({ "id": "1" })))
            }
        });

        let value = resolver.resolve(user_call("1", Ctx::default(), CacheHint::public(60))).await;
        assert_eq!(value, Ok(Some(json!({ "id": "1" }))));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_null_stores_and_serves_null() {
        let (store, _sink, cache) = setup();
        let (calls, seen) = counter();
        let resolver = cache.decorate_with(CacheOptions::new().cache_null(true), move |_inv: FieldInvocation<Ctx>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<Option<JsonValue>, String>(None)
            }
        });

        for _ in 0..2 {
            let value = resolver.resolve(user_call("1", Ctx::default(), CacheHint::public(60))).await;
            assert_eq!(value, Ok(None));
        }
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("User.1").await.unwrap().as_deref(), Some("null"));
    }

    #[tokio::test]
    async fn test_zero_max_age_never_stores() {
        let (store, _sink, cache) = setup();
        let (calls, seen) = counter();
        let resolver = cache.decorate(move |_inv: FieldInvocation<Ctx>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(json!(1))
            }
        });

        resolver.resolve(user_call("1", Ctx::default(), CacheHint::public(0))).await.unwrap();
        resolver.resolve(user_call("1", Ctx::default(), CacheHint::uncached())).await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_uncached_hint_still_reads_store() {
        let (store, _sink, cache) = setup();
        let (calls, seen) = counter();
        let resolver = cache.decorate(move |inv: FieldInvocation<Ctx>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(json!({ "id": inv.args["id"], "name": "fresh" }))
            }
        });

        store
            .set("User.1", "{\"id\":\"1\",\"name\":\"shared\"}".to_string(), 60)
            .await
            .unwrap();

        let value = resolver.resolve(user_call("1", Ctx::default(), CacheHint::uncached())).await.unwrap();
        assert_eq!(value["name"], "shared");
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        let value = resolver.resolve(user_call("2", Ctx::default(), CacheHint::uncached())).await.unwrap();
        assert_eq!(value["name"], "fresh");
        assert!(store.get("User.2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_private_without_session_bypasses_cache() {
        let (store, sink, cache) = setup();
        let (calls, seen) = counter();
        let options = CacheOptions::new().session_id(SessionIdSource::resolve(|ctx: &Ctx| ctx.session.clone()));
        let resolver = cache.decorate_with(options, move |_inv: FieldInvocation<Ctx>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(json!({ "id": "1" }))
            }
        });

        for _ in 0..2 {
            let value = resolver.resolve(user_call("1", Ctx::default(), CacheHint::private(60))).await;
            assert!(value.is_ok());
        }

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(store.is_empty().await);
        assert!(sink.events().contains(&CacheEvent::SkipNoSession {
            field: "user".to_string()
        }));
    }

    #[tokio::test]
    async fn test_private_with_session_is_prefixed() {
        let (store, _sink, cache) = setup();
        let options = CacheOptions::new().session_id(SessionIdSource::resolve(|ctx: &Ctx| ctx.session.clone()));
        let resolver = cache.decorate_with(options, |_inv: FieldInvocation<Ctx>| async {
            Ok::<_, String>(json!({ "id": "1" }))
        });

        let ctx = Ctx {
            session: Some("abc".to_string()),
        };
        resolver.resolve(user_call("1", ctx, CacheHint::private(60))).await.unwrap();

        assert!(store.contains_key("<abc>User.1").await);
        assert!(!store.contains_key("User.1").await);
    }

    #[tokio::test]
    async fn test_unscoped_policy_caches_without_prefix() {
        let (store, sink, cache) = setup();
        let options = CacheOptions::new().private_scope_policy(PrivateScopePolicy::Unscoped);
        let resolver = cache.decorate_with(options, |_inv: FieldInvocation<Ctx>| async {
            Ok::<_, String>(json!({ "id": "1" }))
        });

        resolver.resolve(user_call("1", Ctx::default(), CacheHint::private(60))).await.unwrap();

        assert!(store.contains_key("User.1").await);
        assert!(sink.events().contains(&CacheEvent::UnscopedPrivate {
            field: "user".to_string(),
            key: "User.1".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_missing_key_calls_through() {
        let (store, sink, cache) = setup();
        let (calls, seen) = counter();
        let resolver = cache.decorate(move |_inv: FieldInvocation<Ctx>| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(json!("1.2.0"))
            }
        });

        let info = ResolveInfo::new("version", Arc::new(ObjectType::new("Query")), OutputType::scalar("String"))
            .with_cache_hint(CacheHint::public(60));
        for _ in 0..2 {
            let call = FieldInvocation::new(JsonMap::new(), JsonMap::new(), Arc::new(Ctx::default()), info.clone());
            assert_eq!(resolver.resolve(call).await, Ok(json!("1.2.0")));
        }

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(store.is_empty().await);
        assert!(sink.events().contains(&CacheEvent::SkipNoKey {
            field: "version".to_string()
        }));
    }

    #[tokio::test]
    async fn test_failing_store_is_a_miss() {
        let sink = RecordingSink::default();
        let cache = FieldCache::<Ctx>::default();
        let options = CacheOptions::new().cache(FailingStore).logger(sink.clone());
        let resolver = cache.decorate_with(options, |_inv: FieldInvocation<Ctx>| async {
            Ok::<_, String>(json!({ "id": "1" }))
        });

        let value = resolver.resolve(user_call("1", Ctx::default(), CacheHint::public(60))).await;
        assert_eq!(value, Ok(json!({ "id": "1" })));

        let events = sink.events();
        assert!(matches!(events[0], CacheEvent::StoreReadError { .. }));
        assert!(matches!(events[1], CacheEvent::StoreWriteError { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_replaced() {
        let (store, sink, cache) = setup();
        store.set("User.1", "{not json".to_string(), 60).await.unwrap();

        let resolver = cache.decorate(|_inv: FieldInvocation<Ctx>| async {
            Ok::<_, String>(json!({ "id": "1" }))
        });
        let value = resolver.resolve(user_call("1", Ctx::default(), CacheHint::public(60))).await;

        assert_eq!(value, Ok(json!({ "id": "1" })));
        assert_eq!(store.get("User.1").await.unwrap().as_deref(), Some("{\"id\":\"1\"}"));
        assert!(matches!(sink.events()[0], CacheEvent::ParseError { .. }));
    }

    #[tokio::test]
    async fn test_reference_resolver_reads_reference() {
        let (store, _sink, cache) = setup();
        let (calls, seen) = counter();
        let resolver = cache.decorate_reference(move |reference: JsonMap, _ctx: Arc<Ctx>, info: ResolveInfo| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                assert!(info.is_reference_resolution());
                Ok::<_, String>(json!({ "id": reference["id"], "name": "Grace" }))
            }
        });

        let info = ResolveInfo::new("user", Arc::new(ObjectType::node("User", "id")), ObjectType::node("User", "id"))
            .with_cache_hint(CacheHint::public(30));
        for _ in 0..2 {
            let value = resolver
                .resolve_reference(map(json!({ "id": "7" })), Arc::new(Ctx::default()), info.clone())
                .await
                .unwrap();
            assert_eq!(value["name"], "Grace");
        }

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(store.contains_key("User.7").await);
    }

    #[tokio::test]
    async fn test_parent_field_arguments_are_part_of_key() {
        let (store, _sink, cache) = setup();
        let decorator = cache.with_options(CacheOptions::new().cache_key_type(CacheKeyType::ParentField));
        let resolver = decorator.decorate(|inv: FieldInvocation<Ctx>| async move {
            Ok::<_, String>(json!(inv.args["first"]))
        });

        let info = ResolveInfo::new("friends", Arc::new(ObjectType::node("User", "id")), OutputType::scalar("Int"))
            .with_cache_hint(CacheHint::public(60));
        for first in [1, 2] {
            let call = FieldInvocation::new(
                map(json!({ "id": "42" })),
                map(json!({ "first": first })),
                Arc::new(Ctx::default()),
                info.clone(),
            );
            assert_eq!(resolver.resolve(call).await, Ok(json!(first)));
        }

        assert!(store.contains_key("User{42}.friends({\"first\":1})").await);
        assert!(store.contains_key("User{42}.friends({\"first\":2})").await);
    }

    #[tokio::test]
    async fn test_cache_key_override() {
        let (store, _sink, cache) = setup();
        let options = CacheOptions::new().cache_key(
            |session: Option<&str>, info: &ResolveInfo, _: &JsonMap, _: &JsonMap, _: &Ctx| {
                Some(format!("{}custom:{}", session.unwrap_or(""), info.field_name))
            },
        );
        let resolver = cache.decorate_with(options, |_inv: FieldInvocation<Ctx>| async {
            Ok::<_, String>(json!(true))
        });

        resolver.resolve(user_call("1", Ctx::default(), CacheHint::public(60))).await.unwrap();
        assert!(store.contains_key("custom:user").await);
    }

    #[tokio::test]
    async fn test_store_selector_uses_context() {
        let cache = FieldCache::<Ctx>::default();
        let alpha = Arc::new(InMemoryStore::new());
        let beta = Arc::new(InMemoryStore::new());
        let a: SharedStore = alpha.clone();
        let b: SharedStore = beta.clone();

        let options = CacheOptions::new().cache_selector(move |ctx: &Ctx| {
            if ctx.session.as_deref() == Some("beta") {
                b.clone()
            } else {
                a.clone()
            }
        });
        let resolver = cache.decorate_with(options, |_inv: FieldInvocation<Ctx>| async {
            Ok::<_, String>(json!({ "id": "1" }))
        });

        let ctx = Ctx {
            session: Some("beta".to_string()),
        };
        resolver.resolve(user_call("1", ctx, CacheHint::public(60))).await.unwrap();

        assert!(beta.contains_key("User.1").await);
        assert!(alpha.is_empty().await);
    }

    #[tokio::test]
    async fn test_defaults_are_merged_at_decoration_time() {
        let (store, _sink, mut cache) = setup();
        let before = cache.decorate(|_inv: FieldInvocation<Ctx>| async { Ok::<Option<JsonValue>, String>(None) });

        cache.set_default(CacheOption::CacheNull(true));
        let after = cache.decorate(|_inv: FieldInvocation<Ctx>| async { Ok::<Option<JsonValue>, String>(None) });

        assert!(!before.options().cache_null);
        assert!(after.options().cache_null);

        before.resolve(user_call("1", Ctx::default(), CacheHint::public(60))).await.unwrap();
        assert!(store.is_empty().await);
        after.resolve(user_call("2", Ctx::default(), CacheHint::public(60))).await.unwrap();
        assert!(store.contains_key("User.2").await);
    }
}
