//! Configuration view command: `issueboard config`.

use issueboard::config::BoardConfig;

const UNSET: &str = "(not set)";

pub fn cmd_config(config: &BoardConfig) {
    println!();
    println!("Issue Board Configuration");
    println!("=========================");
    println!();

    match &config.source {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: {}", console::style("none").dim()),
    }
    println!();

    println!("[store]");
    println!("  url = {}", config.store_url.as_deref().unwrap_or(UNSET));
    match &config.store_key {
        Some(key) => println!("  key = {}", key),
        None => println!("  key = {}", UNSET),
    }
    println!("  table = \"{}\"", config.table);
    println!("  timeout_secs = {}", config.timeout.as_secs());
    println!();

    println!("[server]");
    println!("  port = {}", config.port);
    println!();

    println!("[log]");
    println!("  level = \"{}\"", config.log_level);
    println!("  format = \"{}\"", config.log_format);
    println!();

    match config.store() {
        Ok(_) => println!("{}", console::style("Store configuration is complete.").green()),
        Err(e) => println!("{} {}", console::style("Warning:").yellow().bold(), e),
    }
}
