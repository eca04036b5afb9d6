use reqwest::header::COOKIE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::common::{ApiQueryParams, ParameterSet};
use super::connection::{auth_cookie, Connection, CSRF_HEADER};
use super::error::ApiError;
use super::response::ProxmoxResponseHandler;
use super::transport::build_http_client;

/// Proxmox API client bound to one connection
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    connection: Connection,
}

impl Client {
    /// Create a client for `connection`.
    ///
    /// An unauthenticated connection is accepted here; every request made
    /// through the client then fails with `ApiError::NotAuthenticated`.
    pub fn new(connection: Connection) -> Result<Self, ApiError> {
        let http_client = build_http_client(&connection)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                connection,
            }),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// Execute a GET request and return the raw body
    pub async fn get(&self, endpoint: &str) -> Result<String, ApiError> {
        self.execute(Method::GET, endpoint, None).await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params(
        &self,
        endpoint: &str,
        params: &ApiQueryParams,
    ) -> Result<String, ApiError> {
        let full_path = format!("{}{}", endpoint, params.to_query_string());
        self.get(&full_path).await
    }

    /// Execute a POST request with form parameters
    pub async fn post(&self, endpoint: &str, params: &ParameterSet) -> Result<String, ApiError> {
        self.execute(Method::POST, endpoint, Some(params)).await
    }

    /// Execute a PUT request with form parameters
    pub async fn put(&self, endpoint: &str, params: &ParameterSet) -> Result<String, ApiError> {
        self.execute(Method::PUT, endpoint, Some(params)).await
    }

    /// Execute a DELETE request and return the raw body
    pub async fn delete(&self, endpoint: &str) -> Result<String, ApiError> {
        self.execute(Method::DELETE, endpoint, None).await
    }

    /// GET and decode the `data` member of the response
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let text = self.get(endpoint).await?;
        ProxmoxResponseHandler::decode_data(&text)
    }

    /// POST and decode the `data` member of the response
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &ParameterSet,
    ) -> Result<T, ApiError> {
        let text = self.post(endpoint, params).await?;
        ProxmoxResponseHandler::decode_data(&text)
    }

    /// DELETE and decode the `data` member of the response
    pub async fn delete_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let text = self.delete(endpoint).await?;
        ProxmoxResponseHandler::decode_data(&text)
    }

    /// Nodes API operations
    pub fn nodes(&self) -> crate::api::nodes::NodesApi<'_> {
        crate::api::nodes::NodesApi::new(self)
    }

    async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        params: Option<&ParameterSet>,
    ) -> Result<String, ApiError> {
        let (ticket, csrf_token) = self
            .inner
            .connection
            .session()
            .ok_or(ApiError::NotAuthenticated)?;

        let url = self.inner.connection.endpoint_url(endpoint);
        tracing::debug!("{} request to: {}", method, url);

        let mut request = self
            .inner
            .http_client
            .request(method.clone(), &url)
            .header(COOKIE, auth_cookie(ticket));

        // GET is exempt from CSRF protection on the server side.
        if method != Method::GET {
            request = request.header(CSRF_HEADER, csrf_token);
        }

        if let Some(params) = params.filter(|p| !p.is_empty()) {
            request = request.form(params);
        }

        let response = request.send().await?;
        ProxmoxResponseHandler::extract_body(response).await
    }
}

#[cfg(test)]
#[path = "./client_test.rs"]
mod client_test;
