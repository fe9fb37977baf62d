//! Locating `.sq.toml` files.
//!
//! Every ancestor of the working directory may hold a config file. The search ends at
//! the first file that sets `root = true`; otherwise `~/.sq.toml` is consulted last.

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use tracing::{debug, trace};

use crate::parse::is_root_config;

/// The configuration filename.
pub const CONFIG_FILENAME: &str = ".sq.toml";

/// Finds the config files that apply to `cwd`, closest first and global last.
pub fn discover_config_files(cwd: &Path) -> Vec<PathBuf> {
    let mut configs = Vec::new();

    for dir in cwd.ancestors() {
        let candidate = dir.join(CONFIG_FILENAME);
        if !candidate.is_file() {
            continue;
        }
        trace!(path = %candidate.display(), "found config");
        let stop = is_root_config(&candidate);
        configs.push(candidate);
        if stop {
            debug!(count = configs.len(), "discovery stopped at root config");
            return configs;
        }
    }

    if let Some(global) = global_config_path().filter(|p| p.is_file())
        && !configs.contains(&global)
    {
        configs.push(global);
    }

    debug!(count = configs.len(), "discovered config files");
    configs
}

/// Path of `~/.sq.toml`, or None without a home directory.
pub fn global_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_FILENAME))
}

/// Checks if a path is the global configuration file.
pub fn is_global_config(path: &Path) -> bool {
    global_config_path().is_some_and(|global| path == global)
}
