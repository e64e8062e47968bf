//! Stable exit codes for scriptfix CLI commands.

/// Command succeeded. For `run`, every attempted action was handled.
pub const OK: i32 = 0;
/// Invalid input, config, backend failure, or an unparseable response.
pub const INVALID: i32 = 1;
/// `scriptfix run` stopped the batch on an action it could not apply.
pub const HALTED: i32 = 2;
