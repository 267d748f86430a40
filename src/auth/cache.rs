//! In-memory token cache shared by all sign-in calls of one run.
//!
//! Never persisted, never evicted.

use super::AuthenticationResult;
use azure_core::auth::Secret;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Access tokens closer than this to expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenCacheKey {
    pub authority: String,
    pub resource: String,
    pub client_id: String,
    pub user_id: String,
}

impl TokenCacheKey {
    pub fn new(authority: &str, resource: &str, client_id: &str, user_id: &str) -> TokenCacheKey {
        TokenCacheKey {
            authority: authority.trim_end_matches('/').to_lowercase(),
            resource: resource.to_string(),
            client_id: client_id.to_string(),
            user_id: user_id.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub access_token: Secret,
    pub refresh_token: Option<Secret>,
    pub expires_on: DateTime<Utc>,
    pub tenant_id: String,
    /// User as the identity provider spelled it, the key holds it lowercased.
    pub user_id: String,
}

impl CachedToken {
    pub fn is_expired(&self) -> bool {
        self.expires_on <= Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

#[derive(Debug, Default)]
pub struct TokenCache {
    entries: HashMap<TokenCacheKey, CachedToken>,
}

impl TokenCache {
    pub fn new() -> TokenCache {
        TokenCache::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store the outcome of a sign-in, replacing any previous entry for the key.
    pub fn insert(&mut self, key: TokenCacheKey, token: CachedToken) {
        log::debug!(
            "cache insert authority={} user={} expires_on={}",
            key.authority,
            key.user_id,
            token.expires_on
        );
        self.entries.insert(key, token);
    }

    /// A still valid access token for exactly this key.
    pub fn lookup(&self, key: &TokenCacheKey) -> Option<AuthenticationResult> {
        let token = self.entries.get(key)?;
        if token.is_expired() {
            log::debug!("cache entry for {} expired {}", key.authority, token.expires_on);
            return None;
        }
        Some(AuthenticationResult {
            access_token: token.access_token.clone(),
            expires_on: token.expires_on,
            user_id: token.user_id.clone(),
            tenant_id: token.tenant_id.clone(),
        })
    }

    /// Any refresh token issued to `user_id` for this client, under any authority.
    ///
    /// Prefers the exact authority when it has one.
    pub fn refresh_token_for(&self, key: &TokenCacheKey) -> Option<Secret> {
        if let Some(rt) = self.entries.get(key).and_then(|t| t.refresh_token.clone()) {
            return Some(rt);
        }
        self.entries
            .iter()
            .filter(|(k, _)| k.user_id == key.user_id && k.client_id == key.client_id)
            .find_map(|(_, t)| t.refresh_token.clone())
    }
}
