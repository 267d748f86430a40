//! OAuth2 device code sign-in against the v1 (resource based) identity endpoint.
//!
//! The user is shown a short code to enter at the verification URL, this process polls the
//! token endpoint until sign-in completes. Known users are refreshed silently with a cached
//! refresh token, which is valid for every tenant the user belongs to.

use super::cache::{CachedToken, TokenCache};
use super::claims;
use super::{AuthenticationResult, Authenticator, PromptBehavior, TokenRequest};
use azure_core::auth::Secret;
use chrono::{DateTime, Duration, Utc};
use colored::Colorize;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::error::Error;
use std::time::Instant;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const SLOW_DOWN_INCREMENT_SECS: u64 = 5;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// When a token issued now with this `expires_in` expires, out of range lifetimes count as one hour.
fn expiry_from(expires_in: Option<u64>) -> DateTime<Utc> {
    let now = Utc::now();
    let default = now + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS);
    let Some(secs) = expires_in else {
        return default;
    };
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or_else(|| {
            log::warn!("expires_in={secs} out of range, assuming {DEFAULT_TOKEN_LIFETIME_SECS}s");
            default
        })
}

/// The v1 endpoint sends numbers as strings, the v2 endpoint as numbers.
fn u64_or_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Deserialize, Debug)]
struct DeviceCodeResponse {
    user_code: String,
    device_code: String,
    #[serde(alias = "verification_uri")]
    verification_url: Option<String>,
    #[serde(default, deserialize_with = "u64_or_string")]
    expires_in: Option<u64>,
    #[serde(default, deserialize_with = "u64_or_string")]
    interval: Option<u64>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    id_token: Option<String>,
    #[serde(default, deserialize_with = "u64_or_string")]
    expires_in: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeviceCodeAuthenticator {
    http: reqwest::Client,
    login_url: String,
}

impl DeviceCodeAuthenticator {
    pub fn new(login_url: &str) -> DeviceCodeAuthenticator {
        DeviceCodeAuthenticator {
            http: reqwest::Client::new(),
            login_url: login_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, request: &TokenRequest, name: &str) -> String {
        format!("{}/{}/oauth2/{}", self.login_url, request.tenant_id, name)
    }

    /// POST a form, returning the parsed success body or the OAuth error body.
    async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<Result<T, TokenErrorResponse>, Box<dyn Error>> {
        log::debug!("POST {url}");
        let response = self
            .http
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| format!("POST {url} failed: {e}"))?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let mut de = serde_json::Deserializer::from_str(&body);
            let parsed: T = serde_path_to_error::deserialize(&mut de)
                .map_err(|e| format!("Error parsing {url} response: path={} error={}", e.path(), e))?;
            return Ok(Ok(parsed));
        }
        match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(error) => Ok(Err(error)),
            Err(_) => Err(format!("POST {url} returned {status}: {body}").into()),
        }
    }

    async fn sign_in_with_device_code(
        &self,
        request: &TokenRequest,
    ) -> Result<TokenResponse, Box<dyn Error>> {
        let device = match self
            .post_form::<DeviceCodeResponse>(
                &self.endpoint(request, "devicecode"),
                &[
                    ("client_id", request.client_id.as_str()),
                    ("resource", request.resource.as_str()),
                ],
            )
            .await?
        {
            Ok(device) => device,
            Err(e) => return Err(describe(&e).into()),
        };

        match &device.message {
            Some(message) => eprintln!("\n{}", message.yellow()),
            None => eprintln!(
                "\nTo sign in, open {} and enter the code {}",
                device.verification_url.as_deref().unwrap_or("the verification page"),
                device.user_code.yellow()
            ),
        }

        let deadline = Instant::now()
            + std::time::Duration::from_secs(device.expires_in.unwrap_or(900));
        let mut interval = device.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        let token_url = self.endpoint(request, "token");

        while Instant::now() < deadline {
            tokio::time::sleep(std::time::Duration::from_secs(interval)).await;

            let polled = self
                .post_form::<TokenResponse>(
                    &token_url,
                    &[
                        ("grant_type", "device_code"),
                        ("client_id", request.client_id.as_str()),
                        ("resource", request.resource.as_str()),
                        ("code", device.device_code.as_str()),
                    ],
                )
                .await?;

            match polled {
                Ok(token) => return Ok(token),
                Err(e) if e.error == "authorization_pending" => {
                    log::trace!("device code sign-in pending");
                }
                Err(e) if e.error == "slow_down" => {
                    interval += SLOW_DOWN_INCREMENT_SECS;
                    log::debug!("slow_down, polling every {interval}s");
                }
                Err(e) => return Err(describe(&e).into()),
            }
        }
        Err(format!("Device code {} expired before sign-in completed", device.user_code).into())
    }

    async fn redeem_refresh_token(
        &self,
        request: &TokenRequest,
        refresh_token: &Secret,
    ) -> Result<TokenResponse, Box<dyn Error>> {
        let result = self
            .post_form::<TokenResponse>(
                &self.endpoint(request, "token"),
                &[
                    ("grant_type", "refresh_token"),
                    ("client_id", request.client_id.as_str()),
                    ("resource", request.resource.as_str()),
                    ("refresh_token", refresh_token.secret()),
                ],
            )
            .await?;
        result.map_err(|e| describe(&e).into())
    }

    /// Turn a token response into a result and remember it in the cache.
    fn store(
        &self,
        request: &TokenRequest,
        response: TokenResponse,
        cache: &mut TokenCache,
    ) -> Result<AuthenticationResult, Box<dyn Error>> {
        let user_id = response
            .id_token
            .as_deref()
            .and_then(claims::user_id)
            .or_else(|| claims::user_id(&response.access_token))
            .or_else(|| request.user_id.clone())
            .ok_or("Token response carried no user identity")?;

        if let Some(expected) = &request.user_id {
            if !expected.eq_ignore_ascii_case(&user_id) {
                log::warn!("Signed in as {user_id}, expected {expected}");
            }
        }

        let tenant_id = claims::tenant_id(&response.access_token)
            .unwrap_or_else(|| request.tenant_id.clone());
        let expires_on = expiry_from(response.expires_in);
        let access_token = Secret::new(response.access_token);

        cache.insert(
            request.cache_key(&user_id),
            CachedToken {
                access_token: access_token.clone(),
                refresh_token: response.refresh_token.map(Secret::new),
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

fn describe(error: &TokenErrorResponse) -> String {
    match &error.error_description {
        Some(description) => format!("{}: {}", error.error, description),
        None => error.error.clone(),
    }
}

impl Authenticator for DeviceCodeAuthenticator {
    async fn acquire_token(
        &self,
        request: &TokenRequest,
        cache: &mut TokenCache,
    ) -> Result<AuthenticationResult, Box<dyn Error>> {
        if let (PromptBehavior::Auto, Some(user_id)) = (request.prompt, &request.user_id) {
            if let Some(refresh_token) = cache.refresh_token_for(&request.cache_key(user_id)) {
                match self.redeem_refresh_token(request, &refresh_token).await {
                    Ok(response) => return self.store(request, response, cache),
                    Err(e) => log::warn!(
                        "Silent sign-in for {user_id} at {} failed, prompting: {e}",
                        request.authority
                    ),
                }
            }
        }

        let response = self.sign_in_with_device_code(request).await?;
        self.store(request, response, cache)
    }
}
