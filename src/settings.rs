use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::dns::DNS_PORT;

/// a.root-servers.net is the default root hint
pub const ROOT_SERVER: Ipv4Addr = Ipv4Addr::new(192, 33, 4, 12);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub root_server: SocketAddr,

    pub query_timeout_ms: u64,
    pub retries: u32,
    pub retry_backoff_ms: u64,

    pub max_referrals: usize,
    pub recursion_desired: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            root_server: SocketAddr::from((ROOT_SERVER, DNS_PORT)),
            query_timeout_ms: 2000,
            retries: 2,
            retry_backoff_ms: 100,
            max_referrals: 30,
            recursion_desired: false,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let env = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .add_source(File::with_name("/etc/iterdns/config.toml").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("iterdns").try_parsing(true))
            .build()?;

        config.try_deserialize()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
