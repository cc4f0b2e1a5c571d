//! Central registry for all user-facing message templates.
//!
//! - `run` - snapshot run progress and the final summary
//! - `common` - errors and banners shared by every entry point
//!
//! ```rust
//! use osnap_messages::MESSAGES;
//!
//! let line = MESSAGES.run.summary_selected;
//! let banner = MESSAGES.common.version_banner;
//! ```

mod common;
mod run;

pub use common::{CommonMessages, COMMON_MESSAGES};
pub use run::{RunMessages, RUN_MESSAGES};

pub struct Messages {
    pub run: RunMessages,
    pub common: CommonMessages,
}

pub const MESSAGES: Messages = Messages {
    run: RUN_MESSAGES,
    common: COMMON_MESSAGES,
};
