//! Terminal front end
//!
//! Each part of the console is its own file in the commands/ directory:
//! command parsing, preview files and the interactive loop.

pub mod console;
pub mod operator;
pub mod previews;

pub use console::{Console, render_row};
pub use operator::{CommandParseError, HELP, OperatorCommand};
pub use previews::{sniff_extension, write_previews};
