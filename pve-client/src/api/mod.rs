pub mod auth;
pub mod client;
pub mod common;
pub mod connection;
pub mod error;
pub mod nodes;
pub mod response;
mod transport;
pub mod version;

#[cfg(test)]
pub mod test_helpers;

pub use auth::{login, logout};
pub use client::Client;
pub use common::{ApiErrorDetails, ApiQueryParams, ApiResponse, ParameterSet, TaskId};
pub use connection::Connection;
pub use error::ApiError;
pub use response::ProxmoxResponseHandler;
pub use version::VersionInfo;
