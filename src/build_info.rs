//! Build metadata embedded by `build.rs`

use serde::Serialize;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const RAW_BUILD_NUMBER: Option<&str> = option_env!("MRPL_BUILD_NUMBER");
const RAW_BUILD_TIMESTAMP: Option<&str> = option_env!("MRPL_BUILD_TIMESTAMP");

/// Version and build stamp reported by the status tool
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub build_number: u64,
    pub build_timestamp: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            build_number: parse_build_number(RAW_BUILD_NUMBER),
            build_timestamp: RAW_BUILD_TIMESTAMP.unwrap_or("unknown"),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "mrp-labeling v{} (build {}, {})",
            self.version, self.build_number, self.build_timestamp
        )
    }
}

/// A missing or garbled build number reads as 0
fn parse_build_number(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

/// Print the startup banner to stderr
pub fn print_startup_banner() {
    eprintln!("MRP Labeling :: {}", BuildInfo::current().summary());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_number() {
        assert_eq!(parse_build_number(Some("42")), 42);
        assert_eq!(parse_build_number(Some(" 7\n")), 7);
        assert_eq!(parse_build_number(Some("4a")), 0);
        assert_eq!(parse_build_number(None), 0);
    }

    #[test]
    fn test_summary_mentions_version() {
        let info = BuildInfo::current();
        assert!(info.summary().contains(VERSION));
    }
}
