/// Centralized argument handling for lorascope
///
/// Consolidates command-line argument parsing and debug flag checking:
/// - Thread-safe CMD_ARGS storage (overridable from tests)
/// - Debug flag checking functions for all modules
/// - Lookup of flag values (e.g. --config <path>)
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage.
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Override the global argument list (used by tests).
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Copy of the current command-line arguments.
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Whether a specific argument is present.
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Value following a flag, e.g. `--config path/to/config.json`.
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

/// Configuration file path (defaults to ./config.json).
pub fn config_path() -> String {
    get_arg_value("--config").unwrap_or_else(|| "config.json".to_string())
}

// =============================================================================
// FLAG CHECKING FUNCTIONS
// =============================================================================

pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

/// Suppress info/warning output.
pub fn is_quiet_enabled() -> bool {
    has_arg("--quiet")
}

/// Enable debug output for every module.
pub fn is_verbose_enabled() -> bool {
    has_arg("--verbose")
}

/// Realtime poller debug mode.
pub fn is_debug_realtime_enabled() -> bool {
    has_arg("--debug-realtime")
}

/// Webserver and WebSocket hub debug mode.
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

/// Message store debug mode.
pub fn is_debug_store_enabled() -> bool {
    has_arg("--debug-store")
}

/// Statistics engine debug mode.
pub fn is_debug_stats_enabled() -> bool {
    has_arg("--debug-stats")
}

/// Print CLI usage.
pub fn print_help() {
    println!("lorascope - realtime LoRa uplink dashboard service");
    println!();
    println!("USAGE:");
    println!("  lorascope [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  --config <path>      Configuration file (default: config.json)");
    println!("  --quiet              Suppress info and warning output");
    println!("  --verbose            Enable debug output for all modules");
    println!("  --debug-realtime     Debug output for the realtime poller");
    println!("  --debug-webserver    Debug output for the webserver and WebSocket hub");
    println!("  --debug-store        Debug output for the message store");
    println!("  --debug-stats        Debug output for the statistics engine");
    println!("  -h, --help           Show this help");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_value_lookup() {
        let args = vec![
            "lorascope".to_string(),
            "--config".to_string(),
            "/tmp/test.json".to_string(),
        ];
        // Search a local copy of the logic; the global store is shared
        // between tests and must not be mutated here.
        let lookup = |flag: &str| -> Option<String> {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1).cloned())
        };
        assert_eq!(lookup("--config").as_deref(), Some("/tmp/test.json"));
        assert_eq!(lookup("--missing"), None);
    }
}
