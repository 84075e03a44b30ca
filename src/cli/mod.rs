//! CLI module for mcp-gateway - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for serving the gateway
//! and for routing, comparing and benchmarking backend deployments.

pub mod commands;

pub use commands::Cli;
