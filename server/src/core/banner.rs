//! Startup banner

use super::constants::{API_PREFIX, APP_NAME};
use crate::domain::promql::{MetricKind, TableMapping};

/// Print the startup banner with the remote read URL and source tables
pub fn print_banner(host: &str, port: u16, clickhouse_url: &str, tables: &TableMapping) {
    // Use localhost for display when binding to all interfaces
    let display_host = if is_all_interfaces(host) {
        "localhost"
    } else {
        host
    };

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    println!();

    // Label width: "Remote read:" is 12 chars, pad to 14 for alignment
    const W: usize = 14;

    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m http://{}:{}{}/read",
        "Remote read:", display_host, port, API_PREFIX
    );
    println!(
        "  \x1b[33m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
        "ClickHouse:", clickhouse_url
    );

    let names: Vec<&str> = MetricKind::ALL
        .iter()
        .filter_map(|kind| tables.table(*kind))
        .collect();
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Tables:", names.join(", "));

    if host == "127.0.0.1" || host == "localhost" {
        println!(
            "  \x1b[90m➜  {:<W$} use --host 0.0.0.0 to expose\x1b[0m",
            "Network:"
        );
    }

    println!();
}

/// Check if host binds to all interfaces
pub fn is_all_interfaces(host: &str) -> bool {
    host == "0.0.0.0" || host == "::"
}
