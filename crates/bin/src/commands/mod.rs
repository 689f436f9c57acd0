//! Subcommand implementations.

pub mod table;
pub mod tree;
