//! Cluster nodes and the per-node QEMU endpoints

use crate::api::{client::Client, error::ApiError};
use serde::Deserialize;

mod qemu;
pub use qemu::{QemuApi, QemuVmInfo};

/// Entry point for `nodes/...` endpoints. Obtained from [`Client::nodes`].
pub struct NodesApi<'a> {
    client: &'a Client,
}

impl<'a> NodesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Every cluster member known to the server, online or not.
    pub async fn list(&self) -> Result<Vec<NodeStatus>, ApiError> {
        self.client.get_json("nodes").await
    }

    /// Scope further calls to one node. The name is not checked until a
    /// request is sent.
    pub fn node(&self, node: impl Into<String>) -> NodeApi<'a> {
        NodeApi {
            client: self.client,
            node: node.into(),
        }
    }
}

pub struct NodeApi<'a> {
    client: &'a Client,
    node: String,
}

impl<'a> NodeApi<'a> {
    pub fn name(&self) -> &str {
        &self.node
    }

    pub fn qemu(&self) -> QemuApi<'a> {
        QemuApi::new(self.client, &self.node)
    }
}

/// One row of `GET nodes`. Offline nodes report only `node` and `status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeStatus {
    pub node: String,
    pub status: String,
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(default)]
    pub maxcpu: Option<u32>,
    #[serde(default)]
    pub mem: Option<u64>,
    #[serde(default)]
    pub maxmem: Option<u64>,
    #[serde(default)]
    pub uptime: Option<u64>,
}

impl NodeStatus {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }

    /// Fraction of memory in use, when the node reports both figures.
    pub fn memory_usage(&self) -> Option<f64> {
        match (self.mem, self.maxmem) {
            (Some(used), Some(total)) if total > 0 => Some(used as f64 / total as f64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn list_decodes_online_and_offline_nodes() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/api2/json/nodes")
            .match_header("cookie", "PVEAuthCookie=PVE:root@pam:TICKET")
            .match_header("csrfpreventiontoken", Matcher::Missing)
            .with_body(
                r#"{"data":[
                    {"node":"pve1","status":"online","cpu":0.02,"maxcpu":8,"mem":4294967296,"maxmem":17179869184,"uptime":86400},
                    {"node":"pve2","status":"offline"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let nodes = client.nodes().list().await.unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].node, "pve1");
        assert!(nodes[0].is_online());
        assert_eq!(nodes[0].maxcpu, Some(8));
        assert_eq!(nodes[0].memory_usage(), Some(0.25));
        assert!(!nodes[1].is_online());
        assert_eq!(nodes[1].uptime, None);
        assert_eq!(nodes[1].memory_usage(), None);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn list_surfaces_undecodable_payload_as_parse_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api2/json/nodes")
            .with_body(r#"{"data":[{"status":"online"}]}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result = client.nodes().list().await;
        assert!(matches!(result, Err(ApiError::ParseError(_))));
    }

    #[test]
    fn node_scope_keeps_name() {
        let client = create_test_client("https://test.example.com:8006");
        let nodes = client.nodes();
        assert_eq!(nodes.node("pve1").name(), "pve1");
    }

    #[test]
    fn memory_usage_ignores_zero_total() {
        let status = NodeStatus {
            node: "pve1".into(),
            status: "online".into(),
            cpu: None,
            maxcpu: None,
            mem: Some(10),
            maxmem: Some(0),
            uptime: None,
        };
        assert_eq!(status.memory_usage(), None);
    }
}
