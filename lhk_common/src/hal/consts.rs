//! HAL constants.

/// Maximum number of axes addressable by one topology (ids are `u8`).
pub const MAX_AXES: usize = 255;

/// Default homing budget, shared sequentially by all axes of one `home` call.
pub const DEFAULT_HOME_TIMEOUT_S: u64 = 30;

/// Default cap on concurrent X-axis homes across all arms.
pub const DEFAULT_X_HOMING_PERMITS: usize = 2;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/lhk/machine.toml";
