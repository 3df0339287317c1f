//!
//! arbor annex server binary
//! -------------------------
//! Command-line entry point for starting the annex HTTP server. Supports
//! configuration via CLI flags and environment variables.

use anyhow::Result;
use std::env;

fn parse_port_env(name: &str) -> Option<u16> {
    match env::var(name) {
        Ok(val) => val.parse::<u16>().ok(),
        Err(_) => None,
    }
}

fn parse_port_arg(args: &[String], flag: &str) -> Option<u16> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag
            && i + 1 < args.len() {
                return args[i + 1].parse::<u16>().ok();
            }
        i += 1;
    }
    None
}

fn parse_string_arg(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag
            && i + 1 < args.len() {
                return Some(args[i + 1].clone());
            }
        i += 1;
    }
    None
}

fn parse_bool_env(name: &str) -> Option<bool> {
    match env::var(name) {
        Ok(v) => {
            let s = v.to_lowercase();
            match s.as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            }
        }
        Err(_) => None,
    }
}

fn parse_auth_arg(args: &[String]) -> Option<bool> {
    let mut i = 0;
    while i < args.len() {
        let a = &args[i];
        if a == "--no-auth" {
            return Some(false);
        }
        if a == "--auth" {
            // If next token is present and not another flag, try parse bool; otherwise true
            if i + 1 < args.len() {
                let next = &args[i + 1];
                if !next.starts_with('-') {
                    let s = next.to_lowercase();
                    return match s.as_str() {
                        "1" | "true" | "yes" | "on" => Some(true),
                        "0" | "false" | "no" | "off" => Some(false),
                        _ => Some(true), // non-boolean, treat presence as enable
                    };
                }
            }
            return Some(true);
        }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<()> {
    println!(r"   ____ _ ____  ____  ___  _  __
  / __ `/ __ \/ __ \/ _ \| |/_/
 / /_/ / / / / / / /  __/>  <
 \__,_/_/ /_/_/ /_/\___/_/|_|   ");

    // Initialize tracing subscriber with env filter if provided, info otherwise
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("arbor annex server\n\nUSAGE:\n  annex_server [--http-port N] [--db-folder PATH] [--admin-user NAME] [--auth|--no-auth]\n\nOPTIONS:\n  --http-port N       HTTP port (env: ANNEX_HTTP_PORT, default 7575)\n  --db-folder PATH    Database root folder (env: ANNEX_DB_FOLDER, default data)\n  --admin-user NAME   Administrative account name (env: ANNEX_ADMIN_USER, default arbor)\n  --auth [bool]       Enable authentication (env: ANNEX_AUTH). Presence enables; or pass true/false.\n  --no-auth           Disable authentication explicitly.\n");
        return Ok(());
    }

    // Defaults
    let default_http: u16 = 7575;
    let default_root: &str = "data";
    let default_admin: &str = "arbor";

    // Environment variables
    let env_http = parse_port_env("ANNEX_HTTP_PORT");
    let env_root = env::var("ANNEX_DB_FOLDER").ok();
    let env_admin = env::var("ANNEX_ADMIN_USER").ok();
    let env_auth = parse_bool_env("ANNEX_AUTH");

    // CLI arguments override environment
    let arg_http = parse_port_arg(&args, "--http-port");
    let arg_root = parse_string_arg(&args, "--db-folder");
    let arg_admin = parse_string_arg(&args, "--admin-user");
    let arg_auth = parse_auth_arg(&args);

    let http_port = arg_http.or(env_http).unwrap_or(default_http);
    let db_root = arg_root.or(env_root).unwrap_or_else(|| default_root.to_string());
    let admin_user = arg_admin.or(env_admin).unwrap_or_else(|| default_admin.to_string());
    let auth_enabled = arg_auth.or(env_auth).unwrap_or(true);

    if auth_enabled {
        println!("annex starting: http={}, db_root={}, admin_user={}", http_port, db_root, admin_user);
        tracing::info!("Using port: http={}, db_root={}, admin_user={}", http_port, db_root, admin_user);
    } else {
        println!("annex starting with auth DISABLED: http={}, db_root={}", http_port, db_root);
        tracing::info!("auth disabled; Using port: http={}, db_root={}", http_port, db_root);
    }
    arbor_annex::server::run_with_options(http_port, &db_root, &admin_user, auth_enabled).await
}
