//! JSON-file-backed reference directory used by standalone annex runs and
//! tests. Hosts embedding the annex against their own credential store
//! provide their own `AccountDirectory` instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use password_hash::{PasswordHash, SaltString};
use regex::Regex;

use crate::directory::{AccountDirectory, AccountRecord, DirectoryError};
use crate::tprintln;

static LEGAL_USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.@-]+$").unwrap());

fn legal_username(username: &str) -> bool {
    LEGAL_USERNAME.is_match(username)
}

fn hash_password(password: &str) -> Result<String, DirectoryError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| DirectoryError::Hashing(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| DirectoryError::Hashing(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DirectoryError::Hashing(e.to_string()))?
        .to_string();
    Ok(phc)
}

fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}

/// Accounts live in `<db_root>/accounts.json`, loaded whole on open and
/// written back whole on every mutation. Small account populations only.
pub struct LocalDirectory {
    path: PathBuf,
    accounts: RwLock<HashMap<String, AccountRecord>>,
}

impl LocalDirectory {
    pub fn open(db_root: &str) -> Result<Self, DirectoryError> {
        std::fs::create_dir_all(db_root)?;
        let path = Path::new(db_root).join("accounts.json");
        let accounts = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let records: Vec<AccountRecord> = serde_json::from_str(&raw)?;
            records.into_iter().map(|r| (r.username.clone(), r)).collect()
        } else {
            HashMap::new()
        };
        Ok(Self { path, accounts: RwLock::new(accounts) })
    }

    /// Seed `admin_user` with its name as the initial password and a forced
    /// password change, but only while the directory holds no accounts at
    /// all. Answers whether the account was created.
    pub fn ensure_default_admin(&self, admin_user: &str) -> Result<bool, DirectoryError> {
        if !self.accounts.read().is_empty() {
            return Ok(false);
        }
        Ok(self.new_user(admin_user, admin_user, true)?.is_some())
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }

    fn save(&self, accounts: &HashMap<String, AccountRecord>) -> Result<(), DirectoryError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).ok();
        }
        // Sort for a stable file layout across rewrites.
        let mut records: Vec<&AccountRecord> = accounts.values().collect();
        records.sort_by(|a, b| a.username.cmp(&b.username));
        std::fs::write(&self.path, serde_json::to_string_pretty(&records)?)?;
        Ok(())
    }
}

impl AccountDirectory for LocalDirectory {
    fn new_user(
        &self,
        username: &str,
        password: &str,
        require_password_change: bool,
    ) -> Result<Option<AccountRecord>, DirectoryError> {
        if !legal_username(username) {
            return Err(DirectoryError::IllegalCredentials("Username contains illegal characters.".to_string()));
        }
        // Hash outside the lock; argon2 is deliberately slow.
        let credential_hash = hash_password(password)?;
        let mut accounts = self.accounts.write();
        if accounts.contains_key(username) {
            return Ok(None);
        }
        let record = AccountRecord {
            username: username.to_string(),
            credential_hash,
            password_change_required: require_password_change,
        };
        // Stage, persist, then commit; a failed write leaves the live map
        // exactly as it was.
        let mut staged = accounts.clone();
        staged.insert(username.to_string(), record.clone());
        self.save(&staged)?;
        *accounts = staged;
        tprintln!("directory.new_user name={} require_change={}", username, require_password_change);
        Ok(Some(record))
    }

    fn delete_user(&self, username: &str) -> Result<bool, DirectoryError> {
        let mut accounts = self.accounts.write();
        let mut staged = accounts.clone();
        if staged.remove(username).is_none() {
            return Ok(false);
        }
        self.save(&staged)?;
        *accounts = staged;
        tprintln!("directory.delete_user name={}", username);
        Ok(true)
    }

    fn find_user(&self, username: &str) -> Result<Option<AccountRecord>, DirectoryError> {
        Ok(self.accounts.read().get(username).cloned())
    }

    fn authenticate(&self, username: &str, password: &str) -> Result<Option<AccountRecord>, DirectoryError> {
        // Verify outside the lock; argon2 is deliberately slow.
        let Some(record) = self.accounts.read().get(username).cloned() else {
            return Ok(None);
        };
        if verify_password(&record.credential_hash, password) {
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    fn set_password(&self, username: &str, password: &str) -> Result<bool, DirectoryError> {
        let credential_hash = hash_password(password)?;
        let mut accounts = self.accounts.write();
        let mut staged = accounts.clone();
        let Some(record) = staged.get_mut(username) else {
            return Ok(false);
        };
        record.credential_hash = credential_hash;
        record.password_change_required = false;
        self.save(&staged)?;
        *accounts = staged;
        Ok(true)
    }
}
