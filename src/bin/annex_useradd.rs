//!
//! annex useradd binary
//! --------------------
//! Offline account bootstrap for the annex directory. Writes straight to the
//! account store under the database root, so it works without a running
//! server; useful for provisioning before first start or repairing a
//! locked-out admin.

use std::env;

use anyhow::{bail, Result};

use arbor_annex::directory::{AccountDirectory, LocalDirectory};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--db-folder PATH] [--require-change] <username> <password>\n\nOPTIONS:\n  --db-folder PATH    Database root folder (env: ANNEX_DB_FOLDER, default data)\n  --require-change    Force a password change on the account's first use\n\nExamples:\n  {program} alice s3cret\n  {program} --db-folder /var/lib/arbor --require-change ops-bot hunter2"
    );
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(|s| s.as_str()).unwrap_or("annex_useradd");

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage(program);
        return Ok(());
    }

    let mut db_root = env::var("ANNEX_DB_FOLDER").unwrap_or_else(|_| "data".to_string());
    let mut require_change = false;
    let mut positional: Vec<String> = Vec::new();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db-folder" => {
                if i + 1 < args.len() {
                    db_root = args[i + 1].clone();
                    i += 1;
                }
            }
            "--require-change" => require_change = true,
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    if positional.len() != 2 {
        print_usage(program);
        bail!("expected exactly <username> <password>");
    }
    let (username, password) = (&positional[0], &positional[1]);

    let directory = LocalDirectory::open(&db_root)?;
    match directory.new_user(username, password, require_change)? {
        Some(record) => {
            println!(
                "Created account '{}' under {} (password change required: {})",
                record.username, db_root, record.password_change_required
            );
            Ok(())
        }
        None => bail!("account '{}' already exists", username),
    }
}
