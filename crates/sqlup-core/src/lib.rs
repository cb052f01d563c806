pub mod config;
pub mod logging;

pub mod checksum;
pub mod db;
pub mod env;
pub mod error;
pub mod script;
pub mod source;
pub mod status;
pub mod task;

pub use error::UpdateError;
pub use status::{StatusHandle, TaskStatus};
pub use task::{ScriptTaskConfig, SqliteScriptTask, UpdateTask};
