//! Connection descriptor for a Proxmox VE endpoint

use super::error::ApiError;
use std::fmt;

pub const DEFAULT_PORT: u16 = 8006;
pub const DEFAULT_REALM: &str = "pam";

/// Name of the session cookie carrying the login ticket.
pub const AUTH_COOKIE: &str = "PVEAuthCookie";
/// Header carrying the CSRF prevention token on state-changing requests.
pub const CSRF_HEADER: &str = "CSRFPreventionToken";

/// Where to reach a Proxmox VE server and, once logged in, the session
/// issued by it.
///
/// A `Connection` is never mutated after construction. Logging in produces a
/// new value carrying the ticket and CSRF token; both are set together or
/// not at all.
#[derive(Clone, PartialEq, Eq)]
pub struct Connection {
    server: String,
    port: u16,
    use_tls: bool,
    skip_certificate_validation: bool,
    username: String,
    realm: String,
    ticket: Option<String>,
    csrf_token: Option<String>,
}

impl Connection {
    /// Unauthenticated connection to `server` on port 8006 over HTTPS, realm `pam`.
    pub fn new(server: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port: DEFAULT_PORT,
            use_tls: true,
            skip_certificate_validation: false,
            username: username.into(),
            realm: DEFAULT_REALM.to_string(),
            ticket: None,
            csrf_token: None,
        }
    }

    /// Build a connection from an endpoint URL such as `https://pve1:8006`.
    ///
    /// Any path on the URL is ignored; requests are always rooted at
    /// `/api2/json`. Without an explicit port, 8006 is used.
    pub fn from_url(endpoint: &str, username: impl Into<String>) -> Result<Self, ApiError> {
        let url = url::Url::parse(endpoint)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", endpoint, e)))?;

        let use_tls = match url.scheme() {
            "https" => true,
            "http" => false,
            other => {
                return Err(ApiError::InvalidUrl(format!(
                    "unsupported scheme '{}' in {}",
                    other, endpoint
                )))
            }
        };

        let server = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ApiError::InvalidUrl(format!("missing host in {}", endpoint)))?;

        // `Url::port` drops a port equal to the scheme default, so `:443`
        // has to be detected in the endpoint text.
        let port = if has_explicit_port(endpoint) {
            url.port_or_known_default().unwrap_or(DEFAULT_PORT)
        } else {
            DEFAULT_PORT
        };

        Ok(Self::new(server, username).with_tls(use_tls).with_port(port))
    }

    /// Read connection settings from the environment.
    ///
    /// `PROXMOX_ENDPOINT` and `PROXMOX_USERNAME` are required;
    /// `PROXMOX_REALM` defaults to `pam` and `PROXMOX_INSECURE` to `false`.
    pub fn from_env() -> Result<Self, ApiError> {
        let endpoint = std::env::var("PROXMOX_ENDPOINT").map_err(|_| {
            ApiError::invalid_argument("PROXMOX_ENDPOINT environment variable is required")
        })?;
        let username = std::env::var("PROXMOX_USERNAME").map_err(|_| {
            ApiError::invalid_argument("PROXMOX_USERNAME environment variable is required")
        })?;
        let realm = std::env::var("PROXMOX_REALM").unwrap_or_else(|_| DEFAULT_REALM.to_string());
        let insecure = std::env::var("PROXMOX_INSECURE")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Ok(Self::from_url(&endpoint, username)?
            .with_realm(realm)
            .skip_certificate_validation(insecure))
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Accept any server certificate. Only takes effect over TLS.
    pub fn skip_certificate_validation(mut self, skip: bool) -> Self {
        self.skip_certificate_validation = skip;
        self
    }

    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    /// Return a copy of `connection` carrying the given session.
    pub fn with_authentication(
        connection: &Connection,
        ticket: impl Into<String>,
        csrf_token: impl Into<String>,
    ) -> Connection {
        Connection {
            ticket: Some(ticket.into()),
            csrf_token: Some(csrf_token.into()),
            ..connection.clone()
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn use_tls(&self) -> bool {
        self.use_tls
    }

    pub fn skips_certificate_validation(&self) -> bool {
        self.skip_certificate_validation
    }

    /// Whether the transport for this connection should accept invalid
    /// certificates. Plain HTTP never does.
    pub fn accepts_invalid_certs(&self) -> bool {
        self.use_tls && self.skip_certificate_validation
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// `username@realm`, or the username unchanged if it already names a realm.
    pub fn user_id(&self) -> String {
        if self.username.contains('@') {
            self.username.clone()
        } else {
            format!("{}@{}", self.username, self.realm)
        }
    }

    pub fn ticket(&self) -> Option<&str> {
        self.ticket.as_deref()
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// Ticket and CSRF token, present only as a pair.
    pub(crate) fn session(&self) -> Option<(&str, &str)> {
        match (&self.ticket, &self.csrf_token) {
            (Some(ticket), Some(csrf)) => Some((ticket, csrf)),
            _ => None,
        }
    }

    pub fn api_base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}/api2/json", scheme, self.server, self.port)
    }

    /// `{api_base_url}/{endpoint}`. The endpoint is joined as given.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_base_url(), endpoint)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("skip_certificate_validation", &self.skip_certificate_validation)
            .field("username", &self.username)
            .field("realm", &self.realm)
            .field("ticket", &self.ticket.as_ref().map(|_| "<redacted>"))
            .field("csrf_token", &self.csrf_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Whether the authority of `endpoint` spells out a port.
fn has_explicit_port(endpoint: &str) -> bool {
    let rest = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest);
    let authority = rest
        .split(['/', '\\', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    // IPv6 literals carry colons inside the brackets.
    let after_host = host_port
        .rfind(']')
        .map_or(host_port, |i| &host_port[i + 1..]);
    after_host
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty())
}

/// Value of the `Cookie` header for a session ticket.
pub(crate) fn auth_cookie(ticket: &str) -> String {
    format!("{}={}", AUTH_COOKIE, ticket)
}
