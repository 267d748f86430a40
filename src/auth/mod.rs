//! Sign-in and token caching.
//!
//! - [`Authenticator`] - the sign-in backend interface
//! - [`DeviceCodeAuthenticator`] - OAuth2 device code grant against the identity endpoint
//! - [`AzCliAuthenticator`] - delegates to the `az` command line tool
//! - [`TokenCache`] - tokens reused between calls for the same user

mod az_cli;
mod cache;
mod claims;
mod device_code;

pub use az_cli::AzCliAuthenticator;
pub use cache::{CachedToken, TokenCache, TokenCacheKey};
pub use device_code::DeviceCodeAuthenticator;

use crate::config::{AuthMethod, Config};
use crate::output::console;
use azure_core::auth::Secret;
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::error::Error;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptBehavior {
    /// Reuse cached credentials for the user when possible.
    Auto,
    /// Always show the sign-in prompt.
    Always,
}

/// Everything needed to ask for a token for one tenant.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    /// `{login_url}{tenant}`
    pub authority: String,
    pub tenant_id: String,
    pub resource: String,
    pub client_id: String,
    pub user_id: Option<String>,
    pub prompt: PromptBehavior,
}

impl TokenRequest {
    /// A known user gets silent reuse, no user means an always-prompt sign-in.
    pub fn new(config: &Config, tenant_id: &str, user_id: Option<&str>) -> TokenRequest {
        let user_id = user_id.filter(|u| !u.is_empty()).map(str::to_string);
        TokenRequest {
            authority: format!("{}/{}", config.login_url.trim_end_matches('/'), tenant_id),
            tenant_id: tenant_id.to_string(),
            resource: config.resource.clone(),
            client_id: config.client_id.clone(),
            prompt: if user_id.is_some() {
                PromptBehavior::Auto
            } else {
                PromptBehavior::Always
            },
            user_id,
        }
    }

    pub fn cache_key(&self, user_id: &str) -> TokenCacheKey {
        TokenCacheKey::new(&self.authority, &self.resource, &self.client_id, user_id)
    }
}

/// A bearer token and the identity it was issued to.
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    pub access_token: Secret,
    pub expires_on: DateTime<Utc>,
    pub user_id: String,
    pub tenant_id: String,
}

/// Sign-in backend.
///
/// Implementations store what they obtain in `cache` so later calls for the same user stay silent.
#[allow(async_fn_in_trait)]
pub trait Authenticator {
    async fn acquire_token(
        &self,
        request: &TokenRequest,
        cache: &mut TokenCache,
    ) -> Result<AuthenticationResult, Box<dyn Error>>;
}

/// The backend selected by [`AuthMethod`].
#[derive(Debug)]
pub enum ConfiguredAuthenticator {
    DeviceCode(DeviceCodeAuthenticator),
    AzCli(AzCliAuthenticator),
}

impl ConfiguredAuthenticator {
    pub fn from_config(config: &Config) -> ConfiguredAuthenticator {
        match config.auth_method {
            AuthMethod::DeviceCode => ConfiguredAuthenticator::DeviceCode(
                DeviceCodeAuthenticator::new(&config.login_url),
            ),
            AuthMethod::AzCli => ConfiguredAuthenticator::AzCli(AzCliAuthenticator::new()),
        }
    }
}

impl Authenticator for ConfiguredAuthenticator {
    async fn acquire_token(
        &self,
        request: &TokenRequest,
        cache: &mut TokenCache,
    ) -> Result<AuthenticationResult, Box<dyn Error>> {
        match self {
            ConfiguredAuthenticator::DeviceCode(a) => a.acquire_token(request, cache).await,
            ConfiguredAuthenticator::AzCli(a) => a.acquire_token(request, cache).await,
        }
    }
}

/// Sign in for `request`, never failing the caller.
///
/// Finishes the open progress line on `out` with `done!` or `failed!`, a failure's message
/// follows on its own line. A valid cached token for the requested user is returned without
/// calling the backend. Any sign-in error is logged and `None` returned.
pub async fn get_authorization_result<A: Authenticator, W: Write>(
    authenticator: &A,
    request: &TokenRequest,
    cache: &mut TokenCache,
    out: &mut W,
) -> Option<AuthenticationResult> {
    if let (PromptBehavior::Auto, Some(user_id)) = (request.prompt, &request.user_id) {
        if let Some(result) = cache.lookup(&request.cache_key(user_id)) {
            log::info!("Using cached token for {} at {}", user_id, request.authority);
            let _ = console::done(out);
            return Some(result);
        }
    }

    match authenticator.acquire_token(request, cache).await {
        Ok(result) => {
            log::info!(
                "Token for {} at {} expires {}",
                result.user_id,
                request.authority,
                result.expires_on
            );
            let _ = console::done(out);
            Some(result)
        }
        Err(e) => {
            log::error!("Sign-in {} for {}: {}", "failed".on_red(), request.authority, e);
            let _ = console::failed(out);
            let _ = writeln!(out, "{e}");
            None
        }
    }
}
