//! Azure Resource Manager and Azure CLI interaction.
//!
//! - [`cli`] - Command execution for the Azure CLI
//! - [`rest`] - Bearer-authenticated, paginated GET
//! - [`management`] - Tenant, subscription and site listings

pub mod cli;
mod management;
mod rest;

// Re-export public types and functions
pub use management::{
    get_sites, get_subscriptions, get_tenants, sites_url, subscriptions_url, tenants_url,
};
pub use rest::{ArmList, ManagementClient};
