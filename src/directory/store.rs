use thiserror::Error;

use crate::directory::AccountRecord;

/// Faults from the account directory. Every variant surfaces to HTTP callers
/// as a 500 with the fault detail in the error envelope.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("account store I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("account store encoding failure: {0}")]
    Encoding(#[from] serde_json::Error),
    /// Credentials the directory refuses to hold, e.g. illegal usernames.
    #[error("{0}")]
    IllegalCredentials(String),
    #[error("credential hashing failure: {0}")]
    Hashing(String),
}

/// Commands and queries the annex issues against the host credential store.
/// Object-safe so servers and tests can inject alternatives (a remote
/// directory, a failing stub) behind `Arc<dyn AccountDirectory>`.
pub trait AccountDirectory: Send + Sync {
    /// Create `username` with `password`. Answers `Ok(None)` when the name is
    /// already taken, the created record otherwise.
    fn new_user(
        &self,
        username: &str,
        password: &str,
        require_password_change: bool,
    ) -> Result<Option<AccountRecord>, DirectoryError>;

    /// Remove `username`. Answers `Ok(false)` when no such account exists.
    fn delete_user(&self, username: &str) -> Result<bool, DirectoryError>;

    fn find_user(&self, username: &str) -> Result<Option<AccountRecord>, DirectoryError>;

    /// Verify `password` for `username`. Unknown names and wrong passwords
    /// both answer `Ok(None)`; callers cannot tell the two apart.
    fn authenticate(&self, username: &str, password: &str) -> Result<Option<AccountRecord>, DirectoryError>;

    /// Replace the stored credential and clear the password-change flag.
    /// Answers `Ok(false)` when no such account exists.
    fn set_password(&self, username: &str, password: &str) -> Result<bool, DirectoryError>;
}
