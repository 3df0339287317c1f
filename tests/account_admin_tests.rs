//! Account-administration protocol tests: the admin gate, the payload
//! validation ladder, and how directory outcomes read back to callers.
//! These call the command handlers directly; transport-level behavior is
//! covered by the HTTP suites.

use std::io;

use tempfile::{tempdir, TempDir};

use arbor_annex::accounts;
use arbor_annex::directory::{AccountDirectory, AccountRecord, DirectoryError, LocalDirectory};
use arbor_annex::error::{AnnexError, ErrorKind};
use arbor_annex::identity::{AdminGate, CallerIdentity};

fn open_directory(tmp: &TempDir) -> LocalDirectory {
    LocalDirectory::open(tmp.path().to_str().unwrap()).unwrap()
}

fn gate() -> AdminGate {
    AdminGate::new("arbor")
}

fn admin() -> CallerIdentity {
    CallerIdentity::new("arbor")
}

#[test]
fn anonymous_caller_reads_as_not_found() {
    let tmp = tempdir().unwrap();
    let directory = open_directory(&tmp);

    let err = accounts::create_account(&gate(), &directory, "alice", r#"{"password":"secret"}"#, None).unwrap_err();
    assert_eq!(err, AnnexError::NotFound);
    let err = accounts::delete_account(&gate(), &directory, "alice", None).unwrap_err();
    assert_eq!(err, AnnexError::NotFound);

    // The command never reached the directory.
    assert!(directory.find_user("alice").unwrap().is_none());
}

#[test]
fn non_admin_caller_reads_as_not_found() {
    let tmp = tempdir().unwrap();
    let directory = open_directory(&tmp);
    let mallory = CallerIdentity::new("mallory");

    let err = accounts::create_account(&gate(), &directory, "alice", r#"{"password":"secret"}"#, Some(&mallory)).unwrap_err();
    assert_eq!(err, AnnexError::NotFound);
    let err = accounts::delete_account(&gate(), &directory, "alice", Some(&mallory)).unwrap_err();
    assert_eq!(err, AnnexError::NotFound);
    assert!(directory.find_user("alice").unwrap().is_none());
}

#[test]
fn gate_runs_before_payload_validation() {
    let tmp = tempdir().unwrap();
    let directory = open_directory(&tmp);
    let mallory = CallerIdentity::new("mallory");

    // Garbage payload, but the caller is denied first: 404, not 400.
    let err = accounts::create_account(&gate(), &directory, "alice", "{", Some(&mallory)).unwrap_err();
    assert_eq!(err, AnnexError::NotFound);
}

#[test]
fn malformed_payload_is_bad_request_with_parser_detail() {
    let tmp = tempdir().unwrap();
    let directory = open_directory(&tmp);

    for raw in ["", "{", "not json", "[1,2,3]", "\"password\""] {
        let err = accounts::create_account(&gate(), &directory, "alice", raw, Some(&admin())).unwrap_err();
        match err {
            AnnexError::BadRequest { kind, message } => {
                assert_eq!(kind, ErrorKind::InvalidFormat, "payload {:?}", raw);
                assert!(!message.is_empty(), "parser detail expected for {:?}", raw);
            }
            other => panic!("expected BadRequest for {:?}, got {:?}", raw, other),
        }
    }
    assert!(directory.find_user("alice").unwrap().is_none());
}

#[test]
fn missing_password_is_unprocessable() {
    let tmp = tempdir().unwrap();
    let directory = open_directory(&tmp);

    // The key is case-sensitive; "Password" does not count.
    for raw in ["{}", r#"{"Password":"secret"}"#, r#"{"user":"alice"}"#] {
        let err = accounts::create_account(&gate(), &directory, "alice", raw, Some(&admin())).unwrap_err();
        assert_eq!(
            err,
            AnnexError::unprocessable(ErrorKind::InvalidFormat, "Required parameter 'password' is missing."),
            "payload {:?}",
            raw
        );
    }
}

#[test]
fn null_password_counts_as_missing() {
    let tmp = tempdir().unwrap();
    let directory = open_directory(&tmp);

    let err = accounts::create_account(&gate(), &directory, "alice", r#"{"password":null}"#, Some(&admin())).unwrap_err();
    assert_eq!(
        err,
        AnnexError::unprocessable(ErrorKind::InvalidFormat, "Required parameter 'password' is missing.")
    );
}

#[test]
fn non_string_password_is_unprocessable() {
    let tmp = tempdir().unwrap();
    let directory = open_directory(&tmp);

    for raw in [
        r#"{"password":42}"#,
        r#"{"password":true}"#,
        r#"{"password":["secret"]}"#,
        r#"{"password":{"value":"secret"}}"#,
    ] {
        let err = accounts::create_account(&gate(), &directory, "alice", raw, Some(&admin())).unwrap_err();
        assert_eq!(
            err,
            AnnexError::unprocessable(ErrorKind::InvalidFormat, "Expected 'password' to be a string."),
            "payload {:?}",
            raw
        );
    }
}

#[test]
fn empty_password_is_invalid() {
    let tmp = tempdir().unwrap();
    let directory = open_directory(&tmp);

    let err = accounts::create_account(&gate(), &directory, "alice", r#"{"password":""}"#, Some(&admin())).unwrap_err();
    assert_eq!(err, AnnexError::unprocessable(ErrorKind::Invalid, "Password cannot be empty."));
    assert!(directory.find_user("alice").unwrap().is_none());
}

#[test]
fn created_accounts_start_with_a_forced_password_change() {
    let tmp = tempdir().unwrap();
    let directory = open_directory(&tmp);

    accounts::create_account(&gate(), &directory, "alice", r#"{"password":"secret"}"#, Some(&admin())).unwrap();
    let record = directory.find_user("alice").unwrap().expect("account exists");
    assert_eq!(record.username, "alice");
    assert!(record.password_change_required);
    assert!(directory.authenticate("alice", "secret").unwrap().is_some());
}

#[test]
fn duplicate_create_reads_as_not_found() {
    let tmp = tempdir().unwrap();
    let directory = open_directory(&tmp);

    accounts::create_account(&gate(), &directory, "alice", r#"{"password":"secret"}"#, Some(&admin())).unwrap();
    let err = accounts::create_account(&gate(), &directory, "alice", r#"{"password":"other"}"#, Some(&admin())).unwrap_err();
    assert_eq!(err, AnnexError::NotFound);

    // The original credential still stands.
    assert!(directory.authenticate("alice", "secret").unwrap().is_some());
    assert!(directory.authenticate("alice", "other").unwrap().is_none());
}

#[test]
fn delete_is_not_idempotent() {
    let tmp = tempdir().unwrap();
    let directory = open_directory(&tmp);

    accounts::create_account(&gate(), &directory, "alice", r#"{"password":"secret"}"#, Some(&admin())).unwrap();
    accounts::delete_account(&gate(), &directory, "alice", Some(&admin())).unwrap();
    assert!(directory.find_user("alice").unwrap().is_none());

    // Repeating the delete is a client error, with the username in the detail.
    let err = accounts::delete_account(&gate(), &directory, "alice", Some(&admin())).unwrap_err();
    assert_eq!(
        err,
        AnnexError::unprocessable(ErrorKind::InvalidFormat, "Unable to delete user 'alice'.")
    );
}

#[test]
fn deleting_an_unknown_account_is_unprocessable() {
    let tmp = tempdir().unwrap();
    let directory = open_directory(&tmp);

    let err = accounts::delete_account(&gate(), &directory, "ghost", Some(&admin())).unwrap_err();
    assert_eq!(
        err,
        AnnexError::unprocessable(ErrorKind::InvalidFormat, "Unable to delete user 'ghost'.")
    );
}

/// Directory stub whose every operation fails, for the fault-path contract.
struct FaultyDirectory;

impl AccountDirectory for FaultyDirectory {
    fn new_user(&self, _: &str, _: &str, _: bool) -> Result<Option<AccountRecord>, DirectoryError> {
        Err(DirectoryError::Io(io::Error::new(io::ErrorKind::Other, "disk offline")))
    }
    fn delete_user(&self, _: &str) -> Result<bool, DirectoryError> {
        Err(DirectoryError::Io(io::Error::new(io::ErrorKind::Other, "disk offline")))
    }
    fn find_user(&self, _: &str) -> Result<Option<AccountRecord>, DirectoryError> {
        Err(DirectoryError::Io(io::Error::new(io::ErrorKind::Other, "disk offline")))
    }
    fn authenticate(&self, _: &str, _: &str) -> Result<Option<AccountRecord>, DirectoryError> {
        Err(DirectoryError::Io(io::Error::new(io::ErrorKind::Other, "disk offline")))
    }
    fn set_password(&self, _: &str, _: &str) -> Result<bool, DirectoryError> {
        Err(DirectoryError::Io(io::Error::new(io::ErrorKind::Other, "disk offline")))
    }
}

#[test]
fn directory_faults_surface_as_internal_with_detail() {
    let directory = FaultyDirectory;

    let err = accounts::create_account(&gate(), &directory, "alice", r#"{"password":"secret"}"#, Some(&admin())).unwrap_err();
    assert_eq!(err.http_status().as_u16(), 500);
    assert!(err.message().contains("disk offline"), "detail lost: {}", err.message());

    let err = accounts::delete_account(&gate(), &directory, "alice", Some(&admin())).unwrap_err();
    assert_eq!(err.http_status().as_u16(), 500);
    assert!(err.message().contains("disk offline"));
}

#[test]
fn fault_path_still_respects_the_gate() {
    // Even against a broken directory, a non-admin sees only 404.
    let err = accounts::create_account(&gate(), &FaultyDirectory, "alice", r#"{"password":"secret"}"#, None).unwrap_err();
    assert_eq!(err, AnnexError::NotFound);
}
