use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
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
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 22] = [
        "RUST_LOG",
        "LMS_HOST",
        "LMS_PORT",
        "LMS_DATABASE_URL",
        "LMS_USE_X_FORWARDED_FOR",
        "LMS_USE_FORWARDED",
        "LMS_MPESA_IP_WHITELIST",
        "LMS_PAYMENT_POLL_INTERVAL",
        "LMS_STK_TIMEOUT",
        "LMS_BUSINESS_NAME",
        "LMS_VIP_THRESHOLD",
        "LMS_INACTIVE_DAYS",
        "LMS_SMS_NOTIFY_ORDER_CREATED",
        "LMS_SMS_NOTIFY_ORDER_READY",
        "LMS_SMS_NOTIFY_PAYMENT",
        "LMS_MPESA_ENVIRONMENT",
        "LMS_MPESA_SHORTCODE",
        "LMS_MPESA_CALLBACK_URL",
        "LMS_SMS_ENVIRONMENT",
        "LMS_SMS_USERNAME",
        "LMS_SMS_SENDER_ID",
        "LMS_SMS_ENABLED",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
