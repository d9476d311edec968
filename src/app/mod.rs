//! Application layer - option parsing and the module listing itself

pub mod cli;
mod lister;

pub use cli::{Cli, Invocation};
pub use lister::list_modules;
