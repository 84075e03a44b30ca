//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - serve: run the gateway HTTP server (default)
//! - route: send one payload to a single backend
//! - compare: send one payload to both backends and report the faster
//! - bench: run the batch harness and write a report

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MCP gateway - tool gateway and backend latency comparator
#[derive(Parser, Debug)]
#[command(name = "mcp-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the gateway HTTP server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send a gateway request to one backend
    Route {
        /// Backend to call (ec2 or lambda)
        backend: String,

        /// Gateway request as JSON (defaults to list_tools)
        #[arg(long)]
        payload: Option<String>,
    },

    /// Send a gateway request to both backends concurrently
    Compare {
        /// Gateway request as JSON (defaults to list_tools)
        #[arg(long)]
        payload: Option<String>,
    },

    /// Benchmark both backends and write a comparison report
    Bench {
        /// Requests per deployment
        #[arg(short = 'n', long)]
        requests: Option<usize>,

        /// Report output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// EC2 deployment base URL (overrides config)
        #[arg(long)]
        ec2_url: Option<String>,

        /// Lambda deployment base URL (overrides config)
        #[arg(long)]
        lambda_url: Option<String>,
    },
}
