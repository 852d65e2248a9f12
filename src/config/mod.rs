//! Configuration.
//!
//! Tiers are merged field by field, later tiers winning:
//! 1. **Defaults** - `Config::default()`
//! 2. **Project** - `$CWD/hit-batch/config.yaml`
//! 3. **User** - `~/.hit-batch/config.yaml`
//! 4. **Environment** - `HIT_BATCH_DB_PATH`
//!
//! `HIT_BATCH_CONFIG_PATH` names one explicit file and skips the tiers.

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
