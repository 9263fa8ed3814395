//! I/O adapters for fanline commands.

pub mod companion;
pub mod config;
pub mod editor;
pub mod git;
pub mod process;
pub mod session_store;
pub mod test_runner;
