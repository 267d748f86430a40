//! Tenant record returned by the management endpoint.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// Resource id, e.g. `/tenants/<tenant_id>`.
    #[serde(default)]
    pub id: String,
    pub tenant_id: String,
}
