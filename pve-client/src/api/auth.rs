//! Ticket-based login and logout against `/access/ticket`

use reqwest::header::COOKIE;
use serde::Deserialize;

use super::common::ApiResponse;
use super::connection::{auth_cookie, Connection, CSRF_HEADER};
use super::error::ApiError;
use super::transport::build_http_client;

const TICKET_ENDPOINT: &str = "access/ticket";

#[derive(Debug, Deserialize)]
struct TicketData {
    ticket: Option<String>,
    #[serde(rename = "CSRFPreventionToken")]
    csrf_prevention_token: Option<String>,
}

/// Log in with `password` and return a new, authenticated copy of
/// `connection`.
///
/// The password is sent once as a form field and is not kept or logged.
#[tracing::instrument(skip(connection, password), fields(user = %connection.user_id()))]
pub async fn login(connection: &Connection, password: &str) -> Result<Connection, ApiError> {
    let http_client = build_http_client(connection)?;
    let url = connection.endpoint_url(TICKET_ENDPOINT);

    tracing::debug!("POST request to: {}", url);

    let form = [
        ("username", connection.username()),
        ("password", password),
        ("realm", connection.realm()),
    ];

    let response = http_client.post(&url).form(&form).send().await?;
    let status = response.status();
    tracing::debug!("Login response status: {}", status);

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!("Login rejected ({}): {}", status, body);
        return Err(ApiError::Authentication(format!(
            "server returned {}: {}",
            status, body
        )));
    }

    let body = response.text().await?;
    let (ticket, csrf_token) = parse_ticket(&body)?;

    tracing::debug!("Obtained ticket for {}", connection.user_id());
    Ok(Connection::with_authentication(connection, ticket, csrf_token))
}

fn parse_ticket(body: &str) -> Result<(String, String), ApiError> {
    let envelope: ApiResponse<Option<TicketData>> = serde_json::from_str(body)
        .map_err(|e| ApiError::Authentication(format!("unparsable login response: {}", e)))?;

    let data = envelope
        .data
        .ok_or_else(|| ApiError::Authentication("login response carries no data".to_string()))?;

    let ticket = data
        .ticket
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Authentication("login response is missing ticket".to_string()))?;
    let csrf_token = data
        .csrf_prevention_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ApiError::Authentication("login response is missing CSRFPreventionToken".to_string())
        })?;

    Ok((ticket, csrf_token))
}

/// Ask the server to invalidate the session ticket.
///
/// Best effort: does nothing for an unauthenticated connection and never
/// fails. The connection value itself is left as it was.
pub async fn logout(connection: &Connection) {
    let Some((ticket, csrf_token)) = connection.session() else {
        tracing::debug!("Logout skipped, connection is not authenticated");
        return;
    };

    if let Err(e) = send_logout(connection, ticket, csrf_token).await {
        tracing::warn!("Logout for {} failed: {}", connection.user_id(), e);
    }
}

async fn send_logout(connection: &Connection, ticket: &str, csrf_token: &str) -> Result<(), ApiError> {
    let http_client = build_http_client(connection)?;
    let url = connection.endpoint_url(TICKET_ENDPOINT);

    tracing::debug!("DELETE request to: {}", url);

    let response = http_client
        .delete(&url)
        .header(COOKIE, auth_cookie(ticket))
        .header(CSRF_HEADER, csrf_token)
        .send()
        .await?;

    tracing::debug!("Logout response status: {}", response.status());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{authenticated_connection, test_connection};
    use mockito::{Matcher, Server};

    const TICKET_BODY: &str = r#"{"data":{"username":"root@pam","ticket":"PVE:root@pam:65F1A2B3::sig","CSRFPreventionToken":"65F1A2B3:csrf","cap":{}}}"#;

    #[tokio::test]
    async fn login_returns_authenticated_connection() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api2/json/access/ticket")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "root".into()),
                Matcher::UrlEncoded("password".into(), "s3cr&t pass".into()),
                Matcher::UrlEncoded("realm".into(), "pam".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(TICKET_BODY)
            .create_async()
            .await;

        let conn = test_connection(&server.url());
        let authed = login(&conn, "s3cr&t pass").await.unwrap();

        assert!(authed.is_authenticated());
        assert_eq!(authed.ticket(), Some("PVE:root@pam:65F1A2B3::sig"));
        assert_eq!(authed.csrf_token(), Some("65F1A2B3:csrf"));
        assert!(!conn.is_authenticated());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn login_sends_configured_realm() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api2/json/access/ticket")
            .match_body(Matcher::UrlEncoded("realm".into(), "pve".into()))
            .with_body(TICKET_BODY)
            .create_async()
            .await;

        let conn = test_connection(&server.url()).with_realm("pve");
        assert!(login(&conn, "pw").await.is_ok());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn login_fails_when_ticket_missing() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api2/json/access/ticket")
            .with_body(r#"{"data":{"CSRFPreventionToken":"csrf"}}"#)
            .create_async()
            .await;

        let result = login(&test_connection(&server.url()), "pw").await;
        assert!(matches!(result, Err(ApiError::Authentication(_))));
    }

    #[tokio::test]
    async fn login_fails_when_csrf_token_missing() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api2/json/access/ticket")
            .with_body(r#"{"data":{"ticket":"PVE:root@pam:ABC"}}"#)
            .create_async()
            .await;

        let result = login(&test_connection(&server.url()), "pw").await;
        match result {
            Err(ApiError::Authentication(msg)) => assert!(msg.contains("CSRFPreventionToken")),
            other => panic!("Expected Authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn login_fails_on_empty_or_null_payload() {
        let mut server = Server::new_async().await;
        let _null = server
            .mock("POST", "/api2/json/access/ticket")
            .with_body(r#"{"data":null}"#)
            .create_async()
            .await;

        let result = login(&test_connection(&server.url()), "pw").await;
        assert!(matches!(result, Err(ApiError::Authentication(_))));

        let mut server = Server::new_async().await;
        let _empty = server
            .mock("POST", "/api2/json/access/ticket")
            .with_body("")
            .create_async()
            .await;

        let result = login(&test_connection(&server.url()), "pw").await;
        assert!(matches!(result, Err(ApiError::Authentication(_))));
    }

    #[tokio::test]
    async fn login_rejected_carries_error_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api2/json/access/ticket")
            .with_status(401)
            .with_body("authentication failure")
            .create_async()
            .await;

        let result = login(&test_connection(&server.url()), "wrong").await;
        match result {
            Err(ApiError::Authentication(msg)) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("authentication failure"));
            }
            other => panic!("Expected Authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn login_transport_failure_is_reported() {
        let conn = test_connection("http://127.0.0.1:1");
        let result = login(&conn, "pw").await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }

    #[tokio::test]
    async fn logout_deletes_ticket_with_session_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api2/json/access/ticket")
            .match_header("cookie", "PVEAuthCookie=PVE:root@pam:TICKET")
            .match_header("csrfpreventiontoken", "CSRF-TOKEN")
            .with_body(r#"{"data":null}"#)
            .create_async()
            .await;

        let conn = authenticated_connection(&server.url());
        logout(&conn).await;

        assert!(conn.is_authenticated());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn logout_is_noop_for_unauthenticated_connection() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api2/json/access/ticket")
            .expect(0)
            .create_async()
            .await;

        logout(&test_connection(&server.url())).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn logout_swallows_failures() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/api2/json/access/ticket")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        logout(&authenticated_connection(&server.url())).await;
        logout(&authenticated_connection("http://127.0.0.1:1")).await;
    }
}
