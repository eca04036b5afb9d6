//! Client for the Proxmox VE API using ticket-based sessions.
//!
//! ```no_run
//! # async fn run() -> Result<(), pve_client::ApiError> {
//! use pve_client::{login, logout, Client, Connection, VmBuilder};
//!
//! let connection = Connection::new("pve1.example.com", "root");
//! let session = login(&connection, "password").await?;
//! let client = Client::new(session.clone())?;
//!
//! let vm = VmBuilder::new("web-01")?
//!     .with_vmid(120)
//!     .with_node("pve1")?
//!     .with_memory(2048)?
//!     .with_disk(32, "local-lvm");
//! client.create_vm(&vm).await?;
//!
//! logout(&session).await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod builder;
pub mod templates;

pub use api::{login, logout, ApiError, Client, Connection, ParameterSet};
pub use builder::VmBuilder;
pub use templates::{
    JsonFileTemplateStore, MemoryTemplateStore, TemplateError, TemplateStore, VmTemplate,
};
