//! Configuration loading and management.

use std::path::{Path, PathBuf};

use bd_core::BreakdownConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Worker threads for per-context processing; rayon's default when unset.
    pub worker_threads: Option<usize>,
    /// State name used where no thread state covers a range.
    pub unknown_state: String,
}

impl Default for Config {
    fn default() -> Self {
        let defaults = BreakdownConfig::default();
        Self {
            worker_threads: defaults.worker_threads,
            unknown_state: defaults.unknown_state,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // BD_WORKER_THREADS, BD_UNKNOWN_STATE
        figment = figment.merge(Env::prefixed("BD_"));

        figment.extract()
    }

    /// Builds the pipeline configuration, letting `threads` override the file.
    pub fn breakdown_config(&self, threads: Option<usize>) -> BreakdownConfig {
        BreakdownConfig {
            worker_threads: threads.or(self.worker_threads),
            unknown_state: self.unknown_state.clone(),
        }
    }
}

/// Returns the platform-specific config directory for bd.
///
/// On Linux: `~/.config/bd`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("bd"))
}
