//! CLI module for the Tizona deployment tool.
//!
//! This module provides the command-line interface for inspecting stacks,
//! deploying backend services and releasing the static front end.

mod commands;
mod output;

pub use commands::{
    Cli, Commands, OutputFormat, ServiceCommands, StackCommands, TemplateArgs, UiCommands,
};
pub use output::OutputFormatter;
