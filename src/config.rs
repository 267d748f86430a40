//! Endpoint constants and environment overrides.
//!
//! `.env` is loaded by `main` via dotenv, so every value below can also be set there.

use std::env;
use std::error::Error;

/// Identity provider authority base, the tenant is appended.
pub const AAD_URL: &str = "https://login.windows.net/";
/// Azure Resource Manager endpoint.
pub const CSM_URL: &str = "https://management.azure.com/";
pub const CSM_API_VERSION: &str = "2014-01-01";
/// Resource the management token is scoped to.
pub const CSM_RESOURCE: &str = "https://management.core.windows.net/";
/// Public client id of the Azure command line tools.
pub const AZURE_TOOL_CLIENT_ID: &str = "1950a258-227b-4e31-a9cf-717495945fc2";
/// Tenant used before the user's tenants are known.
pub const COMMON_TENANT: &str = "common";

/// Which sign-in backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    DeviceCode,
    AzCli,
}

impl AuthMethod {
    pub fn parse(value: &str) -> Result<AuthMethod, Box<dyn Error>> {
        match value.trim().to_ascii_lowercase().as_str() {
            "device-code" | "devicecode" => Ok(AuthMethod::DeviceCode),
            "az-cli" | "azcli" | "cli" => Ok(AuthMethod::AzCli),
            other => Err(format!(
                "Unknown AZURE_SITES_AUTH value '{other}', expected 'device-code' or 'az-cli'"
            )
            .into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub login_url: String,
    pub management_url: String,
    pub api_version: String,
    pub client_id: String,
    pub resource: String,
    pub auth_method: AuthMethod,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            login_url: AAD_URL.to_string(),
            management_url: CSM_URL.to_string(),
            api_version: CSM_API_VERSION.to_string(),
            client_id: AZURE_TOOL_CLIENT_ID.to_string(),
            resource: CSM_RESOURCE.to_string(),
            auth_method: AuthMethod::DeviceCode,
        }
    }
}

impl Config {
    /// Build from the process environment, falling back to the constants above.
    pub fn from_env() -> Result<Config, Box<dyn Error>> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Config, Box<dyn Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = value("AZURE_SITES_LOGIN_URL") {
            config.login_url = v;
        }
        if let Some(v) = value("AZURE_SITES_MANAGEMENT_URL") {
            config.management_url = v;
        }
        if let Some(v) = value("AZURE_SITES_API_VERSION") {
            config.api_version = v;
        }
        if let Some(v) = value("AZURE_SITES_CLIENT_ID") {
            config.client_id = v;
        }
        if let Some(v) = value("AZURE_SITES_AUTH") {
            config.auth_method = AuthMethod::parse(&v)?;
        }
        log::debug!("config: {:?}", config);
        Ok(config)
    }
}
