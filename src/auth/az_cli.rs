//! Sign-in through the Azure command line tool.
//!
//! `az login` owns the interactive prompt and its own token store, `az account get-access-token`
//! then hands out tenant scoped tokens silently. The blocking subprocess runs on tokio's
//! blocking pool and is awaited in place.

use super::cache::{CachedToken, TokenCache};
use super::claims;
use super::{AuthenticationResult, Authenticator, PromptBehavior, TokenRequest};
use crate::azure::cli;
use crate::config::COMMON_TENANT;
use azure_core::auth::Secret;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::error::Error;

/// Output of `az account get-access-token`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzAccessToken {
    access_token: String,
    /// Local time, `2024-01-01 12:00:00.000000`.
    expires_on: Option<String>,
    /// Epoch seconds, newer `az` versions only.
    #[serde(rename = "expires_on")]
    expires_on_epoch: Option<i64>,
    tenant: Option<String>,
}

impl AzAccessToken {
    fn expiry(&self) -> DateTime<Utc> {
        if let Some(epoch) = self.expires_on_epoch {
            if let Some(at) = Utc.timestamp_opt(epoch, 0).single() {
                return at;
            }
        }
        self.expires_on
            .as_deref()
            .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
            .and_then(|naive| Local.from_local_datetime(&naive).single())
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc::now() + Duration::minutes(5))
    }
}

#[derive(Debug, Clone)]
pub struct AzCliAuthenticator {
    program: String,
}

impl Default for AzCliAuthenticator {
    fn default() -> Self {
        AzCliAuthenticator::new()
    }
}

impl AzCliAuthenticator {
    pub fn new() -> AzCliAuthenticator {
        AzCliAuthenticator::with_program("az")
    }

    /// Use a different executable, e.g. a wrapper script.
    pub fn with_program(program: &str) -> AzCliAuthenticator {
        AzCliAuthenticator {
            program: program.to_string(),
        }
    }

    fn tenant_arg(request: &TokenRequest) -> String {
        if request.tenant_id == COMMON_TENANT {
            String::new()
        } else {
            format!(" --tenant '{}'", request.tenant_id)
        }
    }

    fn login_command(&self, request: &TokenRequest) -> String {
        format!(
            "{} login --allow-no-subscriptions{} --output none",
            self.program,
            Self::tenant_arg(request)
        )
    }

    fn token_command(&self, request: &TokenRequest) -> String {
        format!(
            "{} account get-access-token --resource '{}'{} --output json",
            self.program,
            request.resource,
            Self::tenant_arg(request)
        )
    }

    async fn login(&self, request: &TokenRequest) -> Result<(), Box<dyn Error>> {
        let cmd = self.login_command(request);
        tokio::task::spawn_blocking(move || cli::run(&cmd).map_err(|e| e.to_string())).await??;
        Ok(())
    }

    async fn get_access_token(&self, request: &TokenRequest) -> Result<AzAccessToken, Box<dyn Error>> {
        let cmd = self.token_command(request);
        let token = tokio::task::spawn_blocking(move || {
            cli::run_json::<AzAccessToken>(&cmd).map_err(|e| e.to_string())
        })
        .await??;
        Ok(token)
    }
}

impl Authenticator for AzCliAuthenticator {
    async fn acquire_token(
        &self,
        request: &TokenRequest,
        cache: &mut TokenCache,
    ) -> Result<AuthenticationResult, Box<dyn Error>> {
        let token = match request.prompt {
            PromptBehavior::Always => {
                self.login(request).await?;
                self.get_access_token(request).await?
            }
            PromptBehavior::Auto => match self.get_access_token(request).await {
                Ok(token) => token,
                Err(e) => {
                    log::warn!("az has no token for {}, signing in: {e}", request.tenant_id);
                    self.login(request).await?;
                    self.get_access_token(request).await?
                }
            },
        };

        let expires_on = token.expiry();
        let user_id = claims::user_id(&token.access_token)
            .or_else(|| request.user_id.clone())
            .ok_or("az returned a token without a user identity")?;
        let tenant_id = token
            .tenant
            .clone()
            .unwrap_or_else(|| request.tenant_id.clone());
        let access_token = Secret::new(token.access_token);

        cache.insert(
            request.cache_key(&user_id),
            CachedToken {
                access_token: access_token.clone(),
                refresh_token: None,
                expires_on,
                tenant_id: tenant_id.clone(),
                user_id: user_id.clone(),
            },
        );

        Ok(AuthenticationResult {
            access_token,
            expires_on,
            user_id,
            tenant_id,
        })
    }
}
