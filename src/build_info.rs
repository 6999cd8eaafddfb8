//! Build information module
//!
//! Contains compile-time constants for build number and timestamp.

use serde::Serialize;

use crate::config::ClientConfig;

/// Build number, incremented on each recompilation
pub const BUILD_NUMBER: u64 = match option_env!("NUTRIVIEW_BUILD_NUMBER") {
    Some(s) => match parse_u64(s) {
        Some(n) => n,
        None => 0,
    },
    None => 0,
};

/// Build timestamp in ISO 8601 format
pub const BUILD_TIMESTAMP: &str = match option_env!("NUTRIVIEW_BUILD_TIMESTAMP") {
    Some(s) => s,
    None => "unknown",
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Const function to parse u64 at compile time
const fn parse_u64(s: &str) -> Option<u64> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let mut result: u64 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b < b'0' || b > b'9' {
            return None;
        }
        result = result * 10 + (b - b'0') as u64;
        i += 1;
    }
    Some(result)
}

/// Build information structure for serialization
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub description: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: NAME,
            version: VERSION,
            build_number: BUILD_NUMBER,
            build_timestamp: BUILD_TIMESTAMP,
            description: DESCRIPTION,
        }
    }

    /// `User-Agent` sent with every backend request
    pub fn user_agent(&self) -> String {
        format!("{}/{} (build {})", self.name, self.version, self.build_number)
    }
}

/// Startup banner naming the build and the backend it talks to
pub fn startup_banner(config: &ClientConfig) -> String {
    let info = BuildInfo::current();
    let rule = "=".repeat(47);
    format!(
        "{rule}\n  NutriView Clinical Meal Analysis\n  Version: {} | Build: {} | Compiled: {}\n  Backend: {} (timeout {}s)\n{rule}",
        info.version,
        info.build_number,
        info.build_timestamp,
        config.api_url,
        config.request_timeout.as_secs(),
    )
}

/// Print the startup banner to stderr
pub fn print_startup_banner(config: &ClientConfig) {
    eprintln!("{}", startup_banner(config));
}
