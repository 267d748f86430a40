//! Azure subscription data model.

use serde::{Deserialize, Serialize};

/// A subscription visible to the signed-in user within one tenant.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Resource id, e.g. `/subscriptions/<subscription_id>`.
    #[serde(default)]
    pub id: String,
    pub subscription_id: String,
    #[serde(default)]
    pub display_name: String,
    /// Enabled, Disabled, Warned, PastDue ...
    #[serde(default)]
    pub state: String,
}
