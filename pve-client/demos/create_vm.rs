use pve_client::{
    login, logout, Client, Connection, JsonFileTemplateStore, TemplateStore, VmBuilder, VmTemplate,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let connection = Connection::from_env()?;
    let password = std::env::var("PROXMOX_PASSWORD")
        .map_err(|_| "PROXMOX_PASSWORD environment variable is required")?;
    let node = std::env::var("PROXMOX_NODE").unwrap_or_else(|_| "pve".to_string());

    info!("Endpoint: {}", connection.api_base_url());
    info!("User: {}", connection.user_id());

    let registry = JsonFileTemplateStore::default_path()
        .ok_or("no configuration directory for the template registry")?;
    let mut store = JsonFileTemplateStore::new(registry);
    let template = match store.get("small-linux") {
        Ok(template) => template,
        Err(e) if e.is_not_found() => {
            let preset = VmBuilder::new("small-linux")?
                .with_memory(1024)?
                .with_cores(1)?
                .with_disk(16, "local-lvm")
                .with_boot_order(&["scsi0", "net0"])
                .with_vga("std");
            let template = VmTemplate::from_builder("small-linux", &preset)
                .with_description("1 core, 1 GiB, 16 GiB disk");
            store.create(template.clone())?;
            info!("Saved template to {}", store.path().display());
            template
        }
        Err(e) => return Err(e.into()),
    };

    let session = login(&connection, &password).await?;
    let client = Client::new(session.clone())?;

    let builder = template
        .to_builder("demo-vm")?
        .with_vmid(9999)
        .with_node(&node)?
        .with_network("virtio", "vmbr0");

    match client.create_vm(&builder).await {
        Ok(task) => info!("Create task: {}", task.0),
        Err(e) => error!("Failed to create VM: {}", e),
    }

    logout(&session).await;
    Ok(())
}
