//! Configuration for a snapshot run.
//!
//! Settings are resolved once at startup from CLI overrides, the
//! `OSNAP_API_PASS` environment variable, an optional YAML file and built-in
//! defaults, in that order of precedence. The resulting [`Settings`] value is
//! immutable and passed to every component.

pub mod file;
pub mod loader;
pub mod settings;

pub use file::{ApiFileConfig, FileConfig};
pub use loader::ConfigLoader;
pub use settings::{
    ApiConfig, ConfigOverrides, PollPolicy, RunConfig, RunMode, SelectionConfig, Settings,
};
