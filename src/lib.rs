//! MCP gateway - a tool gateway with a dual-backend latency comparator
//!
//! A fixed catalog of tools is exposed behind one request/response endpoint.
//! The same requests can be sent to two deployments of the gateway to measure
//! which one answers faster.

pub mod compare;
pub mod config;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod id;
pub mod observability;
pub mod tools;

pub use error::{GatewayError, Result};
