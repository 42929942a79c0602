//! The bootstrap configuration file read once by `src/bin/ippd.rs` at process
//! start (§6 "System bootstrap / configuration file"). A TOML document
//! describing the listen address, the HTTP and raw-socket port bases, the
//! spool directory, the TLS policy, and the printers to seed. Absence of the
//! file is not an error: `BootstrapConfig::default()` seeds nothing and binds
//! to the crate's built-in defaults, so the crate can still be embedded as a
//! library without ever touching this file.

use crate::system::SystemInfo;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// One printer to create at startup, mirroring the operation attributes
/// accepted by `system_handlers::create_printer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPrinterConfig {
    pub name: String,
    pub device_uri: String,
    pub driver: String,
    #[serde(default = "default_max_active_jobs")]
    pub max_active_jobs: usize,
}

fn default_max_active_jobs() -> usize {
    1
}

/// TLS policy for the HTTP listener. Plaintext by default; `CertFile` is
/// served via the `server-tls` feature's `tokio-rustls`/`rustls-pemfile` stack.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum TlsPolicy {
    #[default]
    Disabled,
    CertFile { cert_path: PathBuf, key_path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub listen_addr: IpAddr,
    /// The HTTP listener binds here; each seeded printer's raw-socket ingest
    /// binds to `9099 + printer_id` regardless of this value (§5).
    pub http_port: u16,
    pub spool_dir: PathBuf,
    #[serde(default)]
    pub tls: TlsPolicy,
    pub system_name: String,
    pub multi_queue: bool,
    #[serde(default)]
    pub printers: Vec<SeedPrinterConfig>,
}

impl Default for BootstrapConfig {
    fn default() -> BootstrapConfig {
        let info = SystemInfo::default();
        BootstrapConfig {
            listen_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: 631,
            spool_dir: info.spool_dir,
            tls: TlsPolicy::default(),
            system_name: info.name,
            multi_queue: info.multi_queue,
            printers: Vec::new(),
        }
    }
}

impl BootstrapConfig {
    /// Read and parse a TOML bootstrap file. Callers should fall back to
    /// `BootstrapConfig::default()` when the file is simply absent.
    pub fn from_toml_str(s: &str) -> anyhow::Result<BootstrapConfig> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_system_info(&self) -> SystemInfo {
        SystemInfo {
            name: self.system_name.clone(),
            hostname: "localhost".to_string(),
            spool_dir: self.spool_dir.clone(),
            multi_queue: self.multi_queue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_seed_printers() {
        let config = BootstrapConfig::default();
        assert!(config.printers.is_empty());
        assert_eq!(config.http_port, 631);
    }

    #[test]
    fn parses_a_minimal_toml_document() {
        let toml = r#"
            listen_addr = "0.0.0.0"
            http_port = 631
            spool_dir = "/var/spool/ippd"
            system_name = "ippd"
            multi_queue = true

            [[printers]]
            name = "office"
            device_uri = "socket://192.168.1.50:9100"
            driver = "null"
        "#;
        let config = BootstrapConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.printers.len(), 1);
        assert_eq!(config.printers[0].max_active_jobs, 1);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(BootstrapConfig::from_toml_str("not valid toml = [").is_err());
    }
}
