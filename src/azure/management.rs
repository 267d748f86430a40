//! Tenant, subscription and site listings.

use super::rest::ManagementClient;
use crate::models::{Site, Subscription, Tenant};
use azure_core::auth::Secret;
use std::error::Error;

pub fn tenants_url(client: &ManagementClient) -> String {
    client.url("tenants")
}

pub fn subscriptions_url(client: &ManagementClient) -> String {
    client.url("subscriptions")
}

pub fn sites_url(client: &ManagementClient, subscription_id: &str) -> String {
    client.url(&format!(
        "subscriptions/{subscription_id}/providers/Microsoft.Web/sites"
    ))
}

/// List the tenants the token's user belongs to, in service order.
pub async fn get_tenants(
    client: &ManagementClient,
    token: &Secret,
) -> Result<Vec<Tenant>, Box<dyn Error>> {
    client.get_list(&tenants_url(client), token).await
}

/// List subscriptions visible with a tenant scoped token.
pub async fn get_subscriptions(
    client: &ManagementClient,
    token: &Secret,
) -> Result<Vec<Subscription>, Box<dyn Error>> {
    client.get_list(&subscriptions_url(client), token).await
}

/// List the `Microsoft.Web/sites` resources of one subscription.
pub async fn get_sites(
    client: &ManagementClient,
    token: &Secret,
    subscription_id: &str,
) -> Result<Vec<Site>, Box<dyn Error>> {
    client
        .get_list(&sites_url(client, subscription_id), token)
        .await
}
