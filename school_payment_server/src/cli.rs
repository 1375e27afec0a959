use std::{env, env::VarError};

/// Variables whose values are safe to print.
const DISPLAY_ENVS: [&str; 12] = [
    "RUST_LOG",
    "SPG_HOST",
    "SPG_PORT",
    "SPG_DATABASE_URL",
    "SPG_GATEWAY_API_URL",
    "SPG_CALLBACK_URL",
    "SPG_GATEWAY_TIMEOUT_MS",
    "SPG_GATEWAY_MAX_ATTEMPTS",
    "SPG_GATEWAY_RETRY_DELAY_MS",
    "SPG_WEBHOOK_HMAC_CHECKS",
    "SPG_USE_X_FORWARDED_FOR",
    "SPG_USE_FORWARDED",
];

/// Only whether these are set gets printed, never their values.
const SECRET_ENVS: [&str; 4] =
    ["SPG_JWT_SECRET", "SPG_GATEWAY_API_KEY", "SPG_GATEWAY_PG_KEY", "SPG_WEBHOOK_HMAC_SECRET"];

/// There's no real CLI for the server. Any argument at all prints the help text and the current configuration.
///
/// Returns true if the help was printed, in which case the caller should exit.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    println!("Current environment values (secrets are only reported as set or not set):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    });
    SECRET_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) if !s.trim().is_empty() => "Set",
            Ok(_) => "Empty",
            Err(_) => "Not set",
        };
        println!("  {name:<35} {val:<15}");
    });
}
