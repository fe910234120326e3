//! CLI module for hubstats.

pub mod args;
pub mod commands;

pub use args::{AuthCommands, Cli, Commands, FlowOverrides};
