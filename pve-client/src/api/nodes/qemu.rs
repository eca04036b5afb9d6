//! QEMU/KVM virtual machine API implementation

use crate::api::{common::TaskId, error::ApiError, Client, ParameterSet};
use crate::builder::VmBuilder;
use serde::{Deserialize, Serialize};

/// QEMU API providing virtual machine operations
pub struct QemuApi<'a> {
    client: &'a Client,
    node: String,
}

impl<'a> QemuApi<'a> {
    pub fn new(client: &'a Client, node: &str) -> Self {
        Self {
            client,
            node: node.to_string(),
        }
    }

    /// GET /api2/json/nodes/{node}/qemu
    pub async fn list(&self) -> Result<Vec<QemuVmInfo>, ApiError> {
        let path = format!("nodes/{}/qemu", self.node);
        self.client.get_json(&path).await
    }

    /// POST /api2/json/nodes/{node}/qemu
    pub async fn create(&self, parameters: &ParameterSet) -> Result<TaskId, ApiError> {
        let path = format!("nodes/{}/qemu", self.node);
        self.client.post_json(&path, parameters).await
    }

    /// DELETE /api2/json/nodes/{node}/qemu/{vmid}
    pub async fn delete(&self, vmid: u32, purge: bool) -> Result<TaskId, ApiError> {
        let path = if purge {
            format!("nodes/{}/qemu/{}?purge=1", self.node, vmid)
        } else {
            format!("nodes/{}/qemu/{}", self.node, vmid)
        };
        self.client.delete_json(&path).await
    }

    /// POST /api2/json/nodes/{node}/qemu/{vmid}/status/start
    pub async fn start(&self, vmid: u32) -> Result<TaskId, ApiError> {
        let path = format!("nodes/{}/qemu/{}/status/start", self.node, vmid);
        self.client.post_json(&path, &ParameterSet::new()).await
    }

    /// POST /api2/json/nodes/{node}/qemu/{vmid}/status/stop
    pub async fn stop(&self, vmid: u32) -> Result<TaskId, ApiError> {
        let path = format!("nodes/{}/qemu/{}/status/stop", self.node, vmid);
        self.client.post_json(&path, &ParameterSet::new()).await
    }
}

impl Client {
    /// Create the VM described by `builder` on the builder's node.
    pub async fn create_vm(&self, builder: &VmBuilder) -> Result<TaskId, ApiError> {
        let node = builder
            .node()
            .ok_or_else(|| ApiError::InvalidArgument("node must be set to create a VM".into()))?;
        self.nodes().node(node).qemu().create(&builder.build()).await
    }
}

/// Item in VM list response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QemuVmInfo {
    pub vmid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxdisk: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxmem: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qmpstatus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
}

#[cfg(test)]
#[path = "./qemu_test.rs"]
mod qemu_test;
