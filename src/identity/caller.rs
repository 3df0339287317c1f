use serde::{Deserialize, Serialize};

/// The authenticated principal attached to an inbound request by the
/// transport layer. Absent entirely when authentication is disabled or the
/// request carried no credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallerIdentity {
    pub name: String,
}

impl CallerIdentity {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }
}
