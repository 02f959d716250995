//! CLI command handling

pub mod check;
pub mod listen;
pub mod output;
pub mod parse;

pub use check::*;
pub use listen::*;
pub use output::*;
pub use parse::*;
