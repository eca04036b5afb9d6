//! Response handling utilities for Proxmox API

use super::common::{ApiErrorDetails, ApiResponse};
use super::ApiError;
use serde::de::DeserializeOwned;

pub struct ProxmoxResponseHandler;

impl ProxmoxResponseHandler {
    /// Body of a successful response. A failure status becomes
    /// `ApiError::ApiRequest` carrying the body verbatim; a body that cannot
    /// be read becomes `ApiError::Transport`.
    pub async fn extract_body(response: reqwest::Response) -> Result<String, ApiError> {
        let status = response.status();
        tracing::debug!("Response status: {}", status);

        let text = response.text().await?;

        if status.is_success() {
            Ok(text)
        } else {
            tracing::error!("API error response ({}): {}", status, text);
            Err(Self::request_error(status.as_u16(), text))
        }
    }

    /// Decode the `data` member of a Proxmox response envelope.
    pub fn decode_data<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
        serde_json::from_str::<ApiResponse<T>>(text)
            .map(|wrapper| wrapper.data)
            .map_err(|e| {
                tracing::error!("Failed to parse response: {}, body: {}", e, text);
                ApiError::ParseError(format!("Failed to parse response: {}", e))
            })
    }

    fn request_error(status: u16, text: String) -> ApiError {
        let details = ApiErrorDetails::from_body(&text).map(Box::new);
        ApiError::ApiRequest {
            status,
            message: text,
            details,
        }
    }
}
