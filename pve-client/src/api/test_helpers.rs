//! Test helpers for the Proxmox API

#[cfg(test)]
pub fn test_connection(url: &str) -> super::Connection {
    super::Connection::from_url(url, "root").unwrap()
}

#[cfg(test)]
pub fn authenticated_connection(url: &str) -> super::Connection {
    super::Connection::with_authentication(
        &test_connection(url),
        "PVE:root@pam:TICKET",
        "CSRF-TOKEN",
    )
}

#[cfg(test)]
#[allow(dead_code)]
pub fn create_test_client(url: &str) -> super::Client {
    super::Client::new(authenticated_connection(url)).unwrap()
}
