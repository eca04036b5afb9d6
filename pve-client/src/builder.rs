//! Fluent construction of QEMU VM creation parameters

use crate::api::{ApiError, ParameterSet};

const DEFAULT_CPU: &str = "host";
const DEFAULT_OS_TYPE: &str = "l26";

/// Accumulates the form parameters for `POST nodes/{node}/qemu`.
///
/// Every setter validates its input immediately. Disks and network
/// interfaces take the next free `scsiN` / `netN` slot, starting at 0.
#[derive(Debug, Clone)]
pub struct VmBuilder {
    parameters: ParameterSet,
    node: Option<String>,
    next_disk: u32,
    next_network: u32,
    last_network: Option<String>,
}

impl VmBuilder {
    pub fn new(name: &str) -> Result<Self, ApiError> {
        let mut builder = Self {
            parameters: ParameterSet::new(),
            node: None,
            next_disk: 0,
            next_network: 0,
            last_network: None,
        };
        builder.set_name(name)?;
        Ok(builder)
    }

    /// Seed a builder from stored parameters, e.g. a saved template.
    ///
    /// New disks and interfaces continue after the highest existing slot.
    /// No interface counts as "most recently added", so `with_ip_config`
    /// needs a fresh `with_network` first.
    pub fn from_parameters(name: &str, parameters: &ParameterSet) -> Result<Self, ApiError> {
        let mut builder = Self::new(name)?;
        for (key, value) in parameters {
            if key != "name" {
                builder.parameters.insert(key.clone(), value.clone());
            }
        }
        builder.next_disk = next_slot(parameters, "scsi");
        builder.next_network = next_slot(parameters, "net");
        Ok(builder)
    }

    fn set_name(&mut self, name: &str) -> Result<(), ApiError> {
        if name.trim().is_empty() {
            return Err(ApiError::invalid_argument("VM name must not be empty"));
        }
        self.parameters.insert("name".to_string(), name.to_string());
        Ok(())
    }

    pub fn with_vmid(mut self, vmid: u32) -> Self {
        self.parameters.insert("vmid".to_string(), vmid.to_string());
        self
    }

    /// Target node. Used for the request path, not sent as a parameter.
    pub fn with_node(mut self, node: &str) -> Result<Self, ApiError> {
        if node.trim().is_empty() {
            return Err(ApiError::invalid_argument("node must not be empty"));
        }
        self.node = Some(node.to_string());
        Ok(self)
    }

    /// Memory in MiB.
    pub fn with_memory(mut self, memory_mb: i64) -> Result<Self, ApiError> {
        if memory_mb <= 0 {
            return Err(ApiError::invalid_argument(format!(
                "memory must be a positive integer, got {}",
                memory_mb
            )));
        }
        self.parameters
            .insert("memory".to_string(), memory_mb.to_string());
        Ok(self)
    }

    pub fn with_cores(mut self, cores: i64) -> Result<Self, ApiError> {
        if cores <= 0 {
            return Err(ApiError::invalid_argument(format!(
                "cores must be a positive integer, got {}",
                cores
            )));
        }
        self.parameters.insert("cores".to_string(), cores.to_string());
        Ok(self)
    }

    pub fn with_disk(mut self, size_gb: u32, storage: &str) -> Self {
        let key = format!("scsi{}", self.next_disk);
        self.next_disk += 1;
        self.parameters
            .insert(key, format!("{}:{},format=raw", storage, size_gb));
        self
    }

    pub fn with_network(mut self, model: &str, bridge: &str) -> Self {
        let key = format!("net{}", self.next_network);
        self.next_network += 1;
        self.parameters
            .insert(key.clone(), format!("{},bridge={}", model, bridge));
        self.last_network = Some(key);
        self
    }

    /// Append a static IP and gateway to the interface added by the most
    /// recent `with_network` call.
    ///
    /// The target is chosen by call order alone. Calling this after a
    /// second `with_network` configures the second interface, whichever one
    /// the caller had in mind.
    pub fn with_ip_config(mut self, ip: &str, gateway: &str) -> Result<Self, ApiError> {
        let key = self.last_network.as_ref().ok_or_else(|| {
            ApiError::invalid_argument("with_ip_config requires a preceding with_network")
        })?;
        if let Some(value) = self.parameters.get_mut(key) {
            value.push_str(&format!(",ip={},gw={}", ip, gateway));
        }
        Ok(self)
    }

    /// Devices joined with `;` in the given order, e.g. `disk;net`.
    pub fn with_boot_order<S: AsRef<str>>(mut self, devices: &[S]) -> Self {
        let order = devices
            .iter()
            .map(|d| d.as_ref())
            .collect::<Vec<_>>()
            .join(";");
        self.parameters.insert("boot".to_string(), order);
        self
    }

    pub fn with_vga(mut self, vga: &str) -> Self {
        self.parameters.insert("vga".to_string(), vga.to_string());
        self
    }

    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    /// Snapshot of the accumulated parameters with the fixed defaults
    /// applied. The builder keeps its state.
    pub fn build(&self) -> ParameterSet {
        let mut parameters = self.parameters.clone();
        parameters.insert("cpu".to_string(), DEFAULT_CPU.to_string());
        parameters.insert("ostype".to_string(), DEFAULT_OS_TYPE.to_string());
        parameters
    }
}

fn next_slot(parameters: &ParameterSet, prefix: &str) -> u32 {
    parameters
        .keys()
        .filter_map(|key| key.strip_prefix(prefix)?.parse::<u32>().ok())
        .max()
        .map_or(0, |highest| highest + 1)
}
