//! Subcommand implementations.

pub mod bench;
pub mod clip;
pub mod interactive;
pub mod serve;
