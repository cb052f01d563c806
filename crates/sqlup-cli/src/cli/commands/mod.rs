//! CLI command handlers. Each command is in its own file.

mod apply;
mod checksum;

pub use apply::run_apply;
pub use checksum::run_checksum;
