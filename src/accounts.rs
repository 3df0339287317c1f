//! Account-administration command handlers: admin-gated create and delete
//! against the Account Directory.
//!
//! Ordering is observable and fixed: the gate is consulted before the
//! payload is parsed, and a denied caller gets a bare 404, never a 403.
//! Validation runs only after the gate passes; the directory hears about a
//! command only after validation. These handlers never log; surfacing
//! faults is the transport layer's concern.

use serde_json::{Map, Value};

use crate::directory::AccountDirectory;
use crate::error::{AnnexError, AnnexResult, ErrorKind};
use crate::identity::{AdminGate, CallerIdentity};

pub const PASSWORD_PARAM: &str = "password";

/// Parse a request body as a JSON object. Anything else, including truncated
/// or non-object JSON, is a 400 carrying the parser's own message.
pub fn parse_payload(raw: &str) -> AnnexResult<Map<String, Value>> {
    serde_json::from_str::<Map<String, Value>>(raw)
        .map_err(|e| AnnexError::bad_request(ErrorKind::InvalidFormat, e.to_string()))
}

/// Extract the mandatory `password` field. An explicit JSON `null` counts as
/// missing, matching how absent map keys read.
pub fn required_password(payload: &Map<String, Value>) -> AnnexResult<&str> {
    let password = match payload.get(PASSWORD_PARAM) {
        None | Some(Value::Null) => {
            return Err(AnnexError::unprocessable(
                ErrorKind::InvalidFormat,
                format!("Required parameter '{}' is missing.", PASSWORD_PARAM),
            ))
        }
        Some(Value::String(s)) => s.as_str(),
        Some(_) => {
            return Err(AnnexError::unprocessable(
                ErrorKind::InvalidFormat,
                format!("Expected '{}' to be a string.", PASSWORD_PARAM),
            ))
        }
    };
    if password.is_empty() {
        return Err(AnnexError::unprocessable(ErrorKind::Invalid, "Password cannot be empty."));
    }
    Ok(password)
}

/// Create `username` from a raw JSON body of the form `{"password": ...}`.
/// New accounts always start with a forced password change. A name collision
/// is answered exactly like a denied caller: bare 404.
pub fn create_account(
    gate: &AdminGate,
    directory: &dyn AccountDirectory,
    username: &str,
    raw_body: &str,
    caller: Option<&CallerIdentity>,
) -> AnnexResult<()> {
    if !gate.is_admin(caller) {
        return Err(AnnexError::NotFound);
    }
    let payload = parse_payload(raw_body)?;
    let password = required_password(&payload)?;
    match directory.new_user(username, password, true) {
        Err(fault) => Err(AnnexError::internal(fault.to_string())),
        Ok(None) => Err(AnnexError::NotFound),
        Ok(Some(_)) => Ok(()),
    }
}

/// Delete `username`. Deleting an unknown account is a 422, so the command
/// is not idempotent from the caller's point of view.
pub fn delete_account(
    gate: &AdminGate,
    directory: &dyn AccountDirectory,
    username: &str,
    caller: Option<&CallerIdentity>,
) -> AnnexResult<()> {
    if !gate.is_admin(caller) {
        return Err(AnnexError::NotFound);
    }
    match directory.delete_user(username) {
        Err(fault) => Err(AnnexError::internal(fault.to_string())),
        Ok(false) => Err(AnnexError::unprocessable(
            ErrorKind::InvalidFormat,
            format!("Unable to delete user '{}'.", username),
        )),
        Ok(true) => Ok(()),
    }
}
