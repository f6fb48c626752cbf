//! Environment configuration shared by the binaries

use std::path::PathBuf;

use crate::labeling::{LabelingOptions, DEFAULT_MAX_DEPTH};

pub const DATABASE_PATH_VAR: &str = "MRPL_DATABASE_PATH";
pub const MAX_BOM_DEPTH_VAR: &str = "MRPL_MAX_BOM_DEPTH";

/// Database path from the environment, or `<project>/data/mrp_labeling.db`
pub fn database_path() -> PathBuf {
    std::env::var(DATABASE_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));

            // Go up from target/release or target/debug to project root
            if path.ends_with("release") || path.ends_with("debug") {
                if let Some(parent) = path.parent() {
                    if let Some(grandparent) = parent.parent() {
                        path = grandparent.to_path_buf();
                    }
                }
            }

            path.push("data");
            path.push("mrp_labeling.db");
            path
        })
}

/// Labeling options from the environment
pub fn labeling_options() -> LabelingOptions {
    LabelingOptions {
        max_depth: parse_max_depth(std::env::var(MAX_BOM_DEPTH_VAR).ok().as_deref()),
    }
}

fn parse_max_depth(raw: Option<&str>) -> usize {
    match raw.map(str::trim) {
        None | Some("") => DEFAULT_MAX_DEPTH,
        Some(value) => match value.parse::<usize>() {
            Ok(depth) if depth > 0 => depth,
            _ => {
                tracing::warn!(
                    "Ignoring invalid {}='{}', using {}",
                    MAX_BOM_DEPTH_VAR,
                    value,
                    DEFAULT_MAX_DEPTH
                );
                DEFAULT_MAX_DEPTH
            }
        },
    }
}
