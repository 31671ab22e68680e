//! # memory-cli
//!
//! `turn-memory` binary: argument parsing, logging setup and the subcommand handlers.
//! Configuration comes from the environment (`.env` is loaded first).

pub mod cli;
pub mod commands;
pub mod logger;

pub use cli::{load_config, Cli, Commands};
pub use commands::execute;
pub use logger::init_tracing;
