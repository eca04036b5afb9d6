//! Common types and utilities for Proxmox API

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Form parameters sent with POST/PUT requests, keyed by parameter name.
pub type ParameterSet = BTreeMap<String, String>;

/// UPID of a task started by the API, e.g. `UPID:pve1:0000ABCD:...`
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TaskId(pub String);

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub errors: Option<HashMap<String, String>>,
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("API error details: message={message:?}, field_errors={field_errors:?}")]
pub struct ApiErrorDetails {
    pub message: Option<String>,
    pub field_errors: Option<HashMap<String, String>>,
}

impl ApiErrorDetails {
    /// Best-effort decode of a Proxmox error payload. `None` when the body
    /// carries neither a message nor field errors.
    pub fn from_body(body: &str) -> Option<Self> {
        let response = serde_json::from_str::<ApiErrorResponse>(body).ok()?;
        if response.errors.is_none() && response.message.is_none() {
            return None;
        }
        Some(Self {
            message: response.message,
            field_errors: response.errors,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}
