//! HTTP transport construction for a connection

use super::connection::Connection;
use super::error::ApiError;

/// Build the HTTP client used for requests on `connection`.
///
/// Certificate validation is relaxed only on the returned client, and only
/// when the connection opted in over TLS. Other clients are unaffected.
pub(crate) fn build_http_client(connection: &Connection) -> Result<reqwest::Client, ApiError> {
    let insecure = connection.accepts_invalid_certs();
    if insecure {
        tracing::warn!(
            "Certificate validation disabled for {}:{}",
            connection.server(),
            connection.port()
        );
    }

    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(insecure)
        .build()?;
    Ok(client)
}
