//! Command implementations for the blocktar CLI.

pub mod append;
pub mod create;
pub mod extract;
pub mod list;

pub use append::cmd_append;
pub use create::cmd_create;
pub use extract::{ExtractFlags, cmd_extract};
pub use list::cmd_list;
