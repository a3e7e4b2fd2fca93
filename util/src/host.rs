//! Host platform utility functions

use std::path::PathBuf;

/// Environment variable holding the root directory of the software.
pub const SW_ROOT_ENV_VAR: &str = "RACE_PLANNER_ROOT";

/// Get the root directory of the software, which contains the `params` and `data` directories.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
