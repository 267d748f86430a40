//! List the web sites of every subscription in every tenant the signed-in user can reach.
//!
//! Flow: tenant-less token, tenants, one token per tenant, subscriptions, sites.

pub mod auth;
pub mod azure;
pub mod config;
pub mod models;
pub mod output;

use auth::{get_authorization_result, AuthenticationResult, Authenticator, TokenCache, TokenRequest};
use azure::ManagementClient;
use config::{Config, COMMON_TENANT};
use output::console;
use std::error::Error;
use std::io::Write;

/// Counts of what one run listed.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub user_id: String,
    pub tenants: usize,
    /// Tenants skipped because no token could be acquired.
    pub failed_tenants: Vec<String>,
    pub subscriptions: usize,
    pub sites: usize,
}

/// A tenant id and its token, `None` when sign-in for the tenant failed.
pub type TenantToken = (String, Option<AuthenticationResult>);

/// List the user's tenants and sign in to each of them silently as the same user.
pub async fn get_token_for_tenants<A: Authenticator, W: Write>(
    config: &Config,
    client: &ManagementClient,
    authenticator: &A,
    auth_result: &AuthenticationResult,
    cache: &mut TokenCache,
    out: &mut W,
) -> Result<Vec<TenantToken>, Box<dyn Error>> {
    let tenants = azure::get_tenants(client, &auth_result.access_token).await?;
    console::user_tenants(out, &auth_result.user_id, tenants.len())?;

    let mut results = Vec::with_capacity(tenants.len());
    for tenant in tenants {
        console::progress(out, &format!("Getting token for tenant {}", tenant.tenant_id))?;
        let request = TokenRequest::new(config, &tenant.tenant_id, Some(&auth_result.user_id));
        let result = get_authorization_result(authenticator, &request, cache, out).await;
        results.push((tenant.tenant_id, result));
    }
    Ok(results)
}

/// List subscriptions and their sites for one tenant token.
async fn list_tenant<W: Write>(
    client: &ManagementClient,
    tenant_id: &str,
    token: &AuthenticationResult,
    summary: &mut RunSummary,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    console::list_subscriptions(out, tenant_id)?;
    let subscriptions = azure::get_subscriptions(client, &token.access_token).await?;
    console::subscriptions_found(out, &subscriptions)?;
    summary.subscriptions += subscriptions.len();

    for subscription in &subscriptions {
        console::list_sites(out, subscription)?;
        let sites =
            azure::get_sites(client, &token.access_token, &subscription.subscription_id).await?;
        console::sites_found(out, &sites)?;
        summary.sites += sites.len();
    }
    Ok(())
}

/// Run the whole listing, writing progress and results to `out`.
///
/// A tenant whose token can't be acquired is skipped, any other error ends the run.
///
/// # Returns
/// * `Ok(RunSummary)` - what was listed
/// * `Err` - no tenant-less token, or a listing call failed
pub async fn list_all_sites<A: Authenticator, W: Write>(
    config: &Config,
    client: &ManagementClient,
    authenticator: &A,
    cache: &mut TokenCache,
    out: &mut W,
) -> Result<RunSummary, Box<dyn Error>> {
    log::info!("#Start list_all_sites()");

    console::progress(out, "Getting tenant-less token")?;
    let request = TokenRequest::new(config, COMMON_TENANT, None);
    let auth_result = match get_authorization_result(authenticator, &request, cache, out).await {
        Some(result) => result,
        None => return Err("Unable to acquire a tenant-less token".into()),
    };

    let tenant_tokens =
        get_token_for_tenants(config, client, authenticator, &auth_result, cache, out).await?;

    let mut summary = RunSummary {
        user_id: auth_result.user_id.clone(),
        tenants: tenant_tokens.len(),
        ..Default::default()
    };

    for (tenant_id, token) in &tenant_tokens {
        match token {
            Some(token) => list_tenant(client, tenant_id, token, &mut summary, out).await?,
            None => {
                log::warn!("Skipping tenant {tenant_id}, no token");
                writeln!(out, "Skipping tenant {tenant_id}, no token")?;
                summary.failed_tenants.push(tenant_id.clone());
            }
        }
        writeln!(out)?;
    }

    log::info!(
        "#End list_all_sites() tenants={} failed={} subscriptions={} sites={}",
        summary.tenants,
        summary.failed_tenants.len(),
        summary.subscriptions,
        summary.sites
    );
    Ok(summary)
}
