//! Device configuration.
//!
//! Loaded from a TOML file or built in code:
//!
//! ```
//! use clubby_client::config::ClientConfig;
//!
//! let config = ClientConfig::from_toml_str(r#"
//!     server_address = "ws://api.example.com:80"
//!     device_id = "device-1"
//!     device_psk = "secret"
//! "#).unwrap();
//!
//! assert_eq!(config.max_frame_size, 1024);
//! assert_eq!(config.backend, "//api.cesanta.com");
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::{Host, Url};

use crate::error::Result;
use crate::protocol::{Identity, DEFAULT_BACKEND, DEFAULT_MAX_FRAME_SIZE};

/// Everything the client needs to reach the broker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// WebSocket URL of the broker.
    pub server_address: String,
    /// Device identifier, sent as `src`.
    pub device_id: String,
    /// Pre-shared key, sent as `key`.
    pub device_psk: String,
    /// Largest frame payload; longer envelopes are fragmented. 0 disables
    /// fragmentation.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    /// Default destination for commands.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// TLS parameters.
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}

fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

impl ClientConfig {
    /// Config with defaults for everything but the required fields.
    pub fn new(
        server_address: impl Into<String>,
        device_id: impl Into<String>,
        device_psk: impl Into<String>,
    ) -> Self {
        Self {
            server_address: server_address.into(),
            device_id: device_id.into(),
            device_psk: device_psk.into(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            backend: DEFAULT_BACKEND.to_string(),
            tls: None,
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Addressing identity used to fill `src` and `key`.
    pub fn identity(&self) -> Identity {
        Identity::new(&self.device_id, &self.device_psk)
    }
}

/// TLS parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TlsConfig {
    /// CA bundle used to verify the broker.
    #[serde(default)]
    pub ca_file: Option<PathBuf>,
    /// Name to verify instead of the address host.
    #[serde(default)]
    pub server_name: Option<String>,
}

impl TlsConfig {
    /// Name the broker certificate must carry.
    ///
    /// The override when set, otherwise the host of `address`. `None` when
    /// there is no override and `address` is not a URL with a host.
    ///
    /// ```
    /// use clubby_client::config::TlsConfig;
    ///
    /// let tls = TlsConfig::default();
    /// assert_eq!(
    ///     tls.verify_name("wss://api.example.com:443/x").as_deref(),
    ///     Some("api.example.com")
    /// );
    /// ```
    pub fn verify_name(&self, address: &str) -> Option<String> {
        if let Some(name) = &self.server_name {
            return Some(name.clone());
        }
        let url = Url::parse(address).ok()?;
        match url.host()? {
            Host::Domain(domain) => Some(domain.to_string()),
            Host::Ipv4(ip) => Some(ip.to_string()),
            Host::Ipv6(ip) => Some(ip.to_string()),
        }
    }
}
