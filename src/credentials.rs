//! Read-only bearer token lookup.
//!
//! Tokens live in one of two storage scopes owned by the host application;
//! the streaming core only reads them, once per session start. Token
//! issuance, refresh, and expiry are outside this crate.

use std::collections::HashMap;

use crate::options::SecretString;

/// Storage scope a token may be found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    /// Survives across application restarts
    Persistent,
    /// Valid for the current application session only
    Session,
}

/// Read-only credential lookup capability.
///
/// Injected into [`StreamClient`](crate::client::StreamClient) at
/// construction; implement it over whatever token storage the host
/// application uses.
pub trait CredentialStore: Send + Sync {
    /// Look up the bearer token held in the given scope, if any.
    fn bearer_token(&self, scope: TokenScope) -> Option<SecretString>;
}

/// Resolve a bearer token, preferring the persistent scope.
pub fn resolve_bearer_token(store: &dyn CredentialStore) -> Option<SecretString> {
    store
        .bearer_token(TokenScope::Persistent)
        .or_else(|| store.bearer_token(TokenScope::Session))
}

/// Fixed in-memory credential store.
#[derive(Default)]
pub struct StaticTokens {
    tokens: HashMap<TokenScope, SecretString>,
}

impl StaticTokens {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token under the given scope.
    pub fn with_token(mut self, scope: TokenScope, token: impl Into<SecretString>) -> Self {
        self.tokens.insert(scope, token.into());
        self
    }
}

impl CredentialStore for StaticTokens {
    fn bearer_token(&self, scope: TokenScope) -> Option<SecretString> {
        self.tokens.get(&scope).cloned()
    }
}
