use serde::{Deserialize, Serialize};
use std::fmt;

/// Web site (App Service) resource.
///
/// Only the fields that are printed are kept, the rest of the ARM resource is ignored.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Site {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.location)
    }
}
