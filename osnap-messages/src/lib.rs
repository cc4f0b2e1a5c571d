//! osnap-messages
//!
//! User-facing message templates for the osnap CLI and the `msg!` macro that
//! fills them in.

pub mod builder;
pub mod macros;
pub mod messages;

pub use messages::MESSAGES;
