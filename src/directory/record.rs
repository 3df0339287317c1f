use serde::{Deserialize, Serialize};

/// One account as held by the directory. The credential is a PHC-format
/// argon2 hash; plaintext passwords are never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountRecord {
    pub username: String,
    pub credential_hash: String,
    pub password_change_required: bool,
}
