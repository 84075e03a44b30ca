//! Gateway - action dispatch and its HTTP transport

mod dispatcher;
mod server;

pub use dispatcher::{Action, Gateway, GatewayRequest, GatewayResponse, Rejection, ToolRequest};
pub use server::{ApiError, AppState, router, serve, status_for};
