//! Domain models for the management API responses.
//!
//! - [`Tenant`] - Azure AD tenant visible to the user
//! - [`Subscription`] - Subscription within a tenant
//! - [`Site`] - Web site resource within a subscription

mod site;
mod subscription;
mod tenant;

// Re-export public types
pub use site::Site;
pub use subscription::Subscription;
pub use tenant::Tenant;
