//! Exclusive time breakdown CLI library.
//!
//! This crate provides the command-line interface over `bd-core`.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
