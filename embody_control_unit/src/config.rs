//! Board configuration loader with validation.
//!
//! Parses a single board TOML into [`BoardConfig`] and runs every
//! validation rule before anything touches the tick loop. A config that
//! fails here never reaches [`ControllerBank::new`](crate::state::bank::ControllerBank::new).

use std::path::Path;

use embody_common::config::{ConfigError, ConfigLoader};
use embody_common::control_unit::config::BoardConfig;
use tracing::debug;

// ─── Loaded Config Bundle ───────────────────────────────────────────

/// Validated board configuration, ready for runtime use.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub board: BoardConfig,
}

impl LoadedConfig {
    /// Tick period [ns].
    #[inline]
    pub fn cycle_time_ns(&self) -> i64 {
        self.board.cycle_time_us as i64 * 1000
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.board.joints.len()
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate a board configuration file.
pub fn load_board_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    debug!("Loading board config from {}", path.display());
    let board = BoardConfig::load(path)?;
    finish(board)
}

/// Load and validate a board configuration from a TOML string.
pub fn load_board_config_from_str(content: &str) -> Result<LoadedConfig, ConfigError> {
    let board = BoardConfig::from_toml_str(content)?;
    finish(board)
}

fn finish(board: BoardConfig) -> Result<LoadedConfig, ConfigError> {
    board.validate()?;
    Ok(LoadedConfig { board })
}

// ─── Tests ──────────────────────────────────────────────────────────
