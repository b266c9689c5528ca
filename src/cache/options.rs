//! Decorator options and the process defaults they merge over
//!
//! Options are merged once, when a resolver is decorated. Later changes to a
//! [`CacheDefaults`] do not reach resolvers that were already decorated.

use crate::cache::{
    events::{CacheEventSink, SharedSink, TracingSink},
    key::{CacheKeyFn, KeyStrategy, NodeIdFn},
    memory::InMemoryStore,
    session::{PrivateScopePolicy, SessionIdSource},
    store::{KeyValueStore, SharedStore},
    types::{CacheHint, CacheKey, CacheKeyType, JsonMap},
};
use crate::schema::ResolveInfo;
use std::fmt;
use std::sync::Arc;

/// Override for the cache hint: `(context, info) -> hint`
pub type CacheHintFn<C> = Arc<dyn Fn(&C, &ResolveInfo) -> CacheHint + Send + Sync>;

/// Per-call store selection
pub type StoreSelector<C> = Arc<dyn Fn(&C) -> SharedStore + Send + Sync>;

/// Store a decorated resolver reads and writes
pub enum CacheSource<C> {
    /// Same store for every call
    Store(SharedStore),
    /// Store chosen from the request context
    Select(StoreSelector<C>),
}

impl<C> CacheSource<C> {
    pub fn store<S>(store: S) -> Self
    where
        S: KeyValueStore + 'static,
    {
        CacheSource::Store(Arc::new(store))
    }

    pub fn select<F>(f: F) -> Self
    where
        F: Fn(&C) -> SharedStore + Send + Sync + 'static,
    {
        CacheSource::Select(Arc::new(f))
    }

    /// Store for one call
    pub fn resolve(&self, context: &C) -> SharedStore {
        match self {
            CacheSource::Store(store) => Arc::clone(store),
            CacheSource::Select(f) => f(context),
        }
    }
}

impl<C> Clone for CacheSource<C> {
    fn clone(&self) -> Self {
        match self {
            CacheSource::Store(store) => CacheSource::Store(Arc::clone(store)),
            CacheSource::Select(f) => CacheSource::Select(Arc::clone(f)),
        }
    }
}

impl<C> fmt::Debug for CacheSource<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheSource::Store(_) => f.write_str("Store(<store>)"),
            CacheSource::Select(_) => f.write_str("Select(<fn>)"),
        }
    }
}

/// Partial set of decorator options
///
/// Every field is optional. Unset fields fall back to the defaults the
/// resolver is decorated against.
pub struct CacheOptions<C> {
    pub cache_key_type: Option<CacheKeyType>,
    pub node_id: Option<NodeIdFn<C>>,
    pub cache_key: Option<CacheKeyFn<C>>,
    pub cache_hint: Option<CacheHintFn<C>>,
    pub session_id: Option<SessionIdSource<C>>,
    pub cache: Option<CacheSource<C>>,
    pub cache_null: Option<bool>,
    pub logger: Option<SharedSink>,
    pub private_scope_policy: Option<PrivateScopePolicy>,
}

impl<C> Default for CacheOptions<C> {
    fn default() -> Self {
        Self {
            cache_key_type: None,
            node_id: None,
            cache_key: None,
            cache_hint: None,
            session_id: None,
            cache: None,
            cache_null: None,
            logger: None,
            private_scope_policy: None,
        }
    }
}

impl<C> Clone for CacheOptions<C> {
    fn clone(&self) -> Self {
        Self {
            cache_key_type: self.cache_key_type,
            node_id: self.node_id.clone(),
            cache_key: self.cache_key.clone(),
            cache_hint: self.cache_hint.clone(),
            session_id: self.session_id.clone(),
            cache: self.cache.clone(),
            cache_null: self.cache_null,
            logger: self.logger.clone(),
            private_scope_policy: self.private_scope_policy,
        }
    }
}

impl<C> fmt::Debug for CacheOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("cache_key_type", &self.cache_key_type)
            .field("node_id", &self.node_id.as_ref().map(|_| "<fn>"))
            .field("cache_key", &self.cache_key.as_ref().map(|_| "<fn>"))
            .field("cache_hint", &self.cache_hint.as_ref().map(|_| "<fn>"))
            .field("session_id", &self.session_id)
            .field("cache", &self.cache)
            .field("cache_null", &self.cache_null)
            .field("logger", &self.logger.as_ref().map(|_| "<sink>"))
            .field("private_scope_policy", &self.private_scope_policy)
            .finish()
    }
}

impl<C> CacheOptions<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the key shape instead of classifying by return type
    pub fn cache_key_type(mut self, key_type: CacheKeyType) -> Self {
        self.cache_key_type = Some(key_type);
        self
    }

    /// Replace identifier extraction
    pub fn node_id<F>(mut self, f: F) -> Self
    where
        F: Fn(&JsonMap, &JsonMap, &C) -> Option<String> + Send + Sync + 'static,
    {
        self.node_id = Some(Arc::new(f));
        self
    }

    /// Replace key derivation entirely
    pub fn cache_key<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&str>, &ResolveInfo, &JsonMap, &JsonMap, &C) -> Option<CacheKey>
            + Send
            + Sync
            + 'static,
    {
        self.cache_key = Some(Arc::new(f));
        self
    }

    /// Replace the engine-supplied cache hint
    pub fn cache_hint<F>(mut self, f: F) -> Self
    where
        F: Fn(&C, &ResolveInfo) -> CacheHint + Send + Sync + 'static,
    {
        self.cache_hint = Some(Arc::new(f));
        self
    }

    pub fn session_id(mut self, source: SessionIdSource<C>) -> Self {
        self.session_id = Some(source);
        self
    }

    /// Use a fixed store
    pub fn cache<S>(mut self, store: S) -> Self
    where
        S: KeyValueStore + 'static,
    {
        self.cache = Some(CacheSource::store(store));
        self
    }

    /// Use an already shared store
    pub fn shared_cache(mut self, store: SharedStore) -> Self {
        self.cache = Some(CacheSource::Store(store));
        self
    }

    /// Choose the store per call
    pub fn cache_selector<F>(mut self, f: F) -> Self
    where
        F: Fn(&C) -> SharedStore + Send + Sync + 'static,
    {
        self.cache = Some(CacheSource::select(f));
        self
    }

    /// Whether null results are stored and served
    pub fn cache_null(mut self, cache_null: bool) -> Self {
        self.cache_null = Some(cache_null);
        self
    }

    pub fn logger<S>(mut self, sink: S) -> Self
    where
        S: CacheEventSink + 'static,
    {
        self.logger = Some(Arc::new(sink));
        self
    }

    pub fn private_scope_policy(mut self, policy: PrivateScopePolicy) -> Self {
        self.private_scope_policy = Some(policy);
        self
    }

    /// Field-wise merge; fields set on `self` win
    pub fn merged_over(&self, base: &CacheOptions<C>) -> CacheOptions<C> {
        CacheOptions {
            cache_key_type: self.cache_key_type.or(base.cache_key_type),
            node_id: self.node_id.clone().or_else(|| base.node_id.clone()),
            cache_key: self.cache_key.clone().or_else(|| base.cache_key.clone()),
            cache_hint: self.cache_hint.clone().or_else(|| base.cache_hint.clone()),
            session_id: self.session_id.clone().or_else(|| base.session_id.clone()),
            cache: self.cache.clone().or_else(|| base.cache.clone()),
            cache_null: self.cache_null.or(base.cache_null),
            logger: self.logger.clone().or_else(|| base.logger.clone()),
            private_scope_policy: self.private_scope_policy.or(base.private_scope_policy),
        }
    }

    fn is_set(&self, kind: CacheOptionKind) -> bool {
        match kind {
            CacheOptionKind::CacheKeyType => self.cache_key_type.is_some(),
            CacheOptionKind::NodeId => self.node_id.is_some(),
            CacheOptionKind::CacheKey => self.cache_key.is_some(),
            CacheOptionKind::CacheHint => self.cache_hint.is_some(),
            CacheOptionKind::SessionId => self.session_id.is_some(),
            CacheOptionKind::Cache => self.cache.is_some(),
            CacheOptionKind::CacheNull => self.cache_null.is_some(),
            CacheOptionKind::Logger => self.logger.is_some(),
            CacheOptionKind::PrivateScopePolicy => self.private_scope_policy.is_some(),
        }
    }

    fn apply(&mut self, option: CacheOption<C>) {
        match option {
            CacheOption::CacheKeyType(v) => self.cache_key_type = Some(v),
            CacheOption::NodeId(v) => self.node_id = Some(v),
            CacheOption::CacheKey(v) => self.cache_key = Some(v),
            CacheOption::CacheHint(v) => self.cache_hint = Some(v),
            CacheOption::SessionId(v) => self.session_id = Some(v),
            CacheOption::Cache(v) => self.cache = Some(v),
            CacheOption::CacheNull(v) => self.cache_null = Some(v),
            CacheOption::Logger(v) => self.logger = Some(v),
            CacheOption::PrivateScopePolicy(v) => self.private_scope_policy = Some(v),
        }
    }

    fn unset(&mut self, kind: CacheOptionKind) {
        match kind {
            CacheOptionKind::CacheKeyType => self.cache_key_type = None,
            CacheOptionKind::NodeId => self.node_id = None,
            CacheOptionKind::CacheKey => self.cache_key = None,
            CacheOptionKind::CacheHint => self.cache_hint = None,
            CacheOptionKind::SessionId => self.session_id = None,
            CacheOptionKind::Cache => self.cache = None,
            CacheOptionKind::CacheNull => self.cache_null = None,
            CacheOptionKind::Logger => self.logger = None,
            CacheOptionKind::PrivateScopePolicy => self.private_scope_policy = None,
        }
    }
}

/// A single option value, as stored in [`CacheDefaults`]
pub enum CacheOption<C> {
    CacheKeyType(CacheKeyType),
    NodeId(NodeIdFn<C>),
    CacheKey(CacheKeyFn<C>),
    CacheHint(CacheHintFn<C>),
    SessionId(SessionIdSource<C>),
    Cache(CacheSource<C>),
    CacheNull(bool),
    Logger(SharedSink),
    PrivateScopePolicy(PrivateScopePolicy),
}

impl<C> CacheOption<C> {
    pub fn kind(&self) -> CacheOptionKind {
        match self {
            CacheOption::CacheKeyType(_) => CacheOptionKind::CacheKeyType,
            CacheOption::NodeId(_) => CacheOptionKind::NodeId,
            CacheOption::CacheKey(_) => CacheOptionKind::CacheKey,
            CacheOption::CacheHint(_) => CacheOptionKind::CacheHint,
            CacheOption::SessionId(_) => CacheOptionKind::SessionId,
            CacheOption::Cache(_) => CacheOptionKind::Cache,
            CacheOption::CacheNull(_) => CacheOptionKind::CacheNull,
            CacheOption::Logger(_) => CacheOptionKind::Logger,
            CacheOption::PrivateScopePolicy(_) => CacheOptionKind::PrivateScopePolicy,
        }
    }
}

/// Name of an option, used to clear or test a default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOptionKind {
    CacheKeyType,
    NodeId,
    CacheKey,
    CacheHint,
    SessionId,
    Cache,
    CacheNull,
    Logger,
    PrivateScopePolicy,
}

/// Process-wide defaults every decorated resolver starts from
///
/// The default set holds one shared [`InMemoryStore`], `cache_null = false`,
/// the [`TracingSink`] and [`PrivateScopePolicy::Bypass`].
pub struct CacheDefaults<C> {
    options: CacheOptions<C>,
}

impl<C> Default for CacheDefaults<C> {
    fn default() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()))
    }
}

impl<C> Clone for CacheDefaults<C> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
        }
    }
}

impl<C> fmt::Debug for CacheDefaults<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheDefaults")
            .field("options", &self.options)
            .finish()
    }
}

impl<C> CacheDefaults<C> {
    /// Standard defaults around the given store
    pub fn with_store(store: SharedStore) -> Self {
        Self {
            options: CacheOptions {
                cache: Some(CacheSource::Store(store)),
                cache_null: Some(false),
                logger: Some(Arc::new(TracingSink)),
                private_scope_policy: Some(PrivateScopePolicy::Bypass),
                ..CacheOptions::default()
            },
        }
    }

    /// Defaults with nothing set
    pub fn empty() -> Self {
        Self {
            options: CacheOptions::default(),
        }
    }

    pub fn options(&self) -> &CacheOptions<C> {
        &self.options
    }

    /// Set or replace one default
    pub fn set_default(&mut self, option: CacheOption<C>) {
        self.options.apply(option);
    }

    /// Set one default only if it is not already set; returns whether it was applied
    pub fn append_default(&mut self, option: CacheOption<C>) -> bool {
        if self.options.is_set(option.kind()) {
            return false;
        }
        self.options.apply(option);
        true
    }

    /// Remove one default
    pub fn clear_default(&mut self, kind: CacheOptionKind) {
        self.options.unset(kind);
    }

    pub fn is_set(&self, kind: CacheOptionKind) -> bool {
        self.options.is_set(kind)
    }

    /// New defaults with the given overrides applied on top
    pub fn with_overrides(&self, overrides: &CacheOptions<C>) -> CacheDefaults<C> {
        CacheDefaults {
            options: overrides.merged_over(&self.options),
        }
    }

    /// Final option set of one decorated resolver
    ///
    /// `fallback_store` is only called when neither the overrides nor the
    /// defaults name a store.
    pub fn resolve<F>(&self, overrides: &CacheOptions<C>, fallback_store: F) -> ResolvedOptions<C>
    where
        F: FnOnce() -> SharedStore,
    {
        let merged = overrides.merged_over(&self.options);

        ResolvedOptions {
            key: KeyStrategy {
                cache_key_type: merged.cache_key_type,
                node_id: merged.node_id,
            },
            cache_key: merged.cache_key,
            cache_hint: merged.cache_hint,
            session_id: merged.session_id,
            cache: merged
                .cache
                .unwrap_or_else(|| CacheSource::Store(fallback_store())),
            cache_null: merged.cache_null.unwrap_or(false),
            logger: merged.logger.unwrap_or_else(|| Arc::new(TracingSink)),
            private_scope_policy: merged.private_scope_policy.unwrap_or_default(),
        }
    }
}

/// Fully merged options of one decorated resolver
pub struct ResolvedOptions<C> {
    pub key: KeyStrategy<C>,
    pub cache_key: Option<CacheKeyFn<C>>,
    pub cache_hint: Option<CacheHintFn<C>>,
    pub session_id: Option<SessionIdSource<C>>,
    pub cache: CacheSource<C>,
    pub cache_null: bool,
    pub logger: SharedSink,
    pub private_scope_policy: PrivateScopePolicy,
}

impl<C> ResolvedOptions<C> {
    /// Hint for one call
    pub fn hint(&self, context: &C, info: &ResolveInfo) -> CacheHint {
        match &self.cache_hint {
            Some(f) => f(context, info),
            None => info.cache_hint,
        }
    }
}

impl<C> fmt::Debug for ResolvedOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedOptions")
            .field("key", &self.key)
            .field("cache_key", &self.cache_key.as_ref().map(|_| "<fn>"))
            .field("cache_hint", &self.cache_hint.as_ref().map(|_| "<fn>"))
            .field("session_id", &self.session_id)
            .field("cache", &self.cache)
            .field("cache_null", &self.cache_null)
            .field("private_scope_policy", &self.private_scope_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::events::NoopSink;
    use crate::cache::types::CacheScope;
    use crate::schema::{ObjectType, OutputType};

    fn fallback() -> SharedStore {
        Arc::new(InMemoryStore::new())
    }

    #[test]
    fn test_standard_defaults() {
        let defaults = CacheDefaults::<()>::default();
        assert!(defaults.is_set(CacheOptionKind::Cache));
        assert!(defaults.is_set(CacheOptionKind::Logger));
        assert!(!defaults.is_set(CacheOptionKind::SessionId));

        let resolved = defaults.resolve(&CacheOptions::new(), fallback);
        assert!(!resolved.cache_null);
        assert_eq!(resolved.private_scope_policy, PrivateScopePolicy::Bypass);
        assert!(resolved.key.cache_key_type.is_none());
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let mut defaults = CacheDefaults::<()>::default();
        defaults.set_default(CacheOption::CacheKeyType(CacheKeyType::NodeId));
        defaults.set_default(CacheOption::CacheNull(true));

        let overrides = CacheOptions::new().cache_key_type(CacheKeyType::ParentField);
        let resolved = defaults.resolve(&overrides, fallback);

        assert_eq!(resolved.key.cache_key_type, Some(CacheKeyType::ParentField));
        assert!(resolved.cache_null);
    }

    #[test]
    fn test_append_default_only_if_absent() {
        let mut defaults = CacheDefaults::<()>::empty();

        assert!(defaults.append_default(CacheOption::CacheNull(true)));
        assert!(!defaults.append_default(CacheOption::CacheNull(false)));
        assert_eq!(defaults.options().cache_null, Some(true));
    }

    #[test]
    fn test_clear_default() {
        let mut defaults = CacheDefaults::<()>::default();
        defaults.clear_default(CacheOptionKind::Logger);
        assert!(!defaults.is_set(CacheOptionKind::Logger));

        defaults.clear_default(CacheOptionKind::Cache);
        let store = fallback();
        let handle = store.clone();
        let resolved = defaults.resolve(&CacheOptions::new(), move || handle);
        match resolved.cache {
            CacheSource::Store(s) => assert!(Arc::ptr_eq(&s, &store)),
            CacheSource::Select(_) => panic!("expected fixed store"),
        }
    }

    #[test]
    fn test_with_overrides_leaves_original_untouched() {
        let defaults = CacheDefaults::<()>::default();
        let derived = defaults.with_overrides(&CacheOptions::new().cache_null(true).logger(NoopSink));

        assert_eq!(derived.options().cache_null, Some(true));
        assert_eq!(defaults.options().cache_null, Some(false));
    }

    #[test]
    fn test_selector_receives_context() {
        let a: SharedStore = Arc::new(InMemoryStore::new());
        let b: SharedStore = Arc::new(InMemoryStore::new());
        let (sa, sb) = (a.clone(), b.clone());
        let source = CacheSource::select(move |tenant: &u8| if *tenant == 0 { sa.clone() } else { sb.clone() });

        assert!(Arc::ptr_eq(&source.resolve(&0), &a));
        assert!(Arc::ptr_eq(&source.resolve(&1), &b));
    }

    #[test]
    fn test_hint_override() {
        let defaults = CacheDefaults::<()>::default();
        let options = CacheOptions::new().cache_hint(|_: &(), _: &ResolveInfo| CacheHint::private(5));
        let resolved = defaults.resolve(&options, fallback);

        let info = ResolveInfo::new("age", Arc::new(ObjectType::node("User", "id")), OutputType::scalar("Int"))
            .with_cache_hint(CacheHint::public(60));
        let hint = resolved.hint(&(), &info);
        assert_eq!(hint.scope, CacheScope::Private);
        assert_eq!(hint.max_age, Some(5));

        let plain = defaults.resolve(&CacheOptions::new(), fallback);
        assert_eq!(plain.hint(&(), &info), CacheHint::public(60));
    }
}
