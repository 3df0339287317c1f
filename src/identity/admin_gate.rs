use crate::identity::CallerIdentity;

/// Decides whether a caller may issue account-administration commands.
/// Pure comparison against the configured administrative account name; the
/// gate performs no I/O and never consults the directory.
#[derive(Debug, Clone)]
pub struct AdminGate {
    admin_user: String,
}

impl AdminGate {
    pub fn new<S: Into<String>>(admin_user: S) -> Self {
        Self { admin_user: admin_user.into() }
    }

    pub fn admin_user(&self) -> &str {
        &self.admin_user
    }

    /// An anonymous caller is never the administrator; the name comparison is
    /// exact and case-sensitive.
    pub fn is_admin(&self, caller: Option<&CallerIdentity>) -> bool {
        match caller {
            Some(identity) => identity.name == self.admin_user,
            None => false,
        }
    }
}
