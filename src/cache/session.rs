//! Session scoping of privately cached values

use crate::cache::types::{CacheHint, CacheScope};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Per-call session id resolver
pub type SessionIdFn<C> = Arc<dyn Fn(&C) -> Option<String> + Send + Sync>;

/// Where the session token of a private entry comes from
pub enum SessionIdSource<C> {
    /// Fixed token
    Literal(String),
    /// Token derived from the request context
    Resolve(SessionIdFn<C>),
}

impl<C> SessionIdSource<C> {
    pub fn literal(id: impl Into<String>) -> Self {
        SessionIdSource::Literal(id.into())
    }

    pub fn resolve<F>(f: F) -> Self
    where
        F: Fn(&C) -> Option<String> + Send + Sync + 'static,
    {
        SessionIdSource::Resolve(Arc::new(f))
    }

    fn evaluate(&self, context: &C) -> Option<String> {
        match self {
            SessionIdSource::Literal(id) => Some(id.clone()),
            SessionIdSource::Resolve(f) => f(context),
        }
    }
}

impl<C> Clone for SessionIdSource<C> {
    fn clone(&self) -> Self {
        match self {
            SessionIdSource::Literal(id) => SessionIdSource::Literal(id.clone()),
            SessionIdSource::Resolve(f) => SessionIdSource::Resolve(Arc::clone(f)),
        }
    }
}

impl<C> fmt::Debug for SessionIdSource<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionIdSource::Literal(id) => f.debug_tuple("Literal").field(id).finish(),
            SessionIdSource::Resolve(_) => f.write_str("Resolve(<fn>)"),
        }
    }
}

/// What to do with a private hint when no session id can be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivateScopePolicy {
    /// Do not cache; call the wrapped resolver directly
    #[default]
    Bypass,

    /// Cache without a session prefix. Private data may then be served to
    /// other sessions.
    Unscoped,
}

/// Outcome of session scope resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionScope {
    /// Entry is shared; no token
    Public,
    /// Entry belongs to the given session
    Private(String),
    /// Entry is private but no usable session id exists
    Unavailable,
}

impl SessionScope {
    /// Token to embed in the key, if any
    pub fn token(&self) -> Option<&str> {
        match self {
            SessionScope::Private(token) => Some(token),
            _ => None,
        }
    }
}

/// Decide the session scope of one invocation
///
/// Public hints never carry a token. Private hints evaluate the source; an
/// absent source, a `None` result or an empty string leave the scope
/// unavailable.
pub fn resolve_session_scope<C>(
    source: Option<&SessionIdSource<C>>,
    context: &C,
    hint: &CacheHint,
) -> SessionScope {
    if hint.scope != CacheScope::Private {
        return SessionScope::Public;
    }

    match source.and_then(|source| source.evaluate(context)) {
        Some(token) if !token.is_empty() => SessionScope::Private(token),
        _ => SessionScope::Unavailable,
    }
}
