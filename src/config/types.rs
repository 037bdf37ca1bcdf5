// src/config/types.rs
use crate::error::{BootstrapError, Result};
use crate::network::Cidr;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    net::IpAddr,
    path::{Path, PathBuf},
};
use url::Url;

const DEFAULT_USER_CONFIG_FILE: &str = "~/.microshift/config.yaml";
const DEFAULT_USER_DATA_DIR: &str = "~/.microshift/data";
const DEFAULT_GLOBAL_CONFIG_FILE: &str = "/etc/microshift/config.yaml";
pub const DEFAULT_GLOBAL_DATA_DIR: &str = "/var/lib/microshift";
pub const DEFAULT_API_SERVER_PORT: u16 = 6443;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    pub url: String,
    #[serde(rename = "clusterCIDR")]
    pub cluster_cidr: String,
    #[serde(rename = "serviceCIDR")]
    pub service_cidr: String,
    pub service_node_port_range: String,
    pub dns: String,
    pub domain: String,
    pub mtu: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            url: "https://127.0.0.1:6443".to_string(),
            cluster_cidr: "10.42.0.0/16".to_string(),
            service_cidr: "10.43.0.0/16".to_string(),
            service_node_port_range: "30000-32767".to_string(),
            dns: "10.43.0.10".to_string(),
            domain: "cluster.local".to_string(),
            mtu: "1400".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterConfig {
    pub data_dir: PathBuf,
    pub node_name: String,
    #[serde(rename = "nodeIP")]
    pub node_ip: String,
    pub cluster: NetworkConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            data_dir: find_data_dir(),
            node_name: default_node_name(),
            node_ip: "127.0.0.1".to_string(),
            cluster: NetworkConfig::default(),
        }
    }
}

/// Explicit values from the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub node_name: Option<String>,
    pub node_ip: Option<String>,
}

impl ClusterConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).map_err(|e| BootstrapError::io(path, e))?;
        serde_yaml::from_str(&config_str).map_err(|e| {
            BootstrapError::Config(format!("decoding config file {}: {}", path.display(), e))
        })
    }

    /// Defaults, then the config file (explicit or discovered), then
    /// `MICROSHIFT_*` environment variables, then `overrides`.
    pub fn load(config_file: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        Self::load_with_env(config_file, overrides, |key| env::var(key).ok())
    }

    /// [`ClusterConfig::load`] with the environment supplied by `lookup`.
    pub fn load_with_env<F>(
        config_file: Option<&Path>,
        overrides: &ConfigOverrides,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = config_file.map(Path::to_path_buf).or_else(find_config_file);
        let mut config = match file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup);
        config.apply_overrides(overrides);
        config.data_dir = expand_tilde(&config.data_dir);
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MICROSHIFT_DATADIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MICROSHIFT_NODENAME") {
            self.node_name = v;
        }
        if let Some(v) = lookup("MICROSHIFT_NODEIP") {
            self.node_ip = v;
        }
        if let Some(v) = lookup("MICROSHIFT_CLUSTER_URL") {
            self.cluster.url = v;
        }
        if let Some(v) = lookup("MICROSHIFT_CLUSTER_SERVICECIDR") {
            self.cluster.service_cidr = v;
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(dir) = &overrides.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(name) = &overrides.node_name {
            self.node_name = name.clone();
        }
        if let Some(ip) = &overrides.node_ip {
            self.node_ip = ip.clone();
        }
    }

    /// Port of the cluster URL, 6443 when the URL does not name one.
    pub fn api_server_port(&self) -> Result<u16> {
        let parsed = Url::parse(&self.cluster.url).map_err(|e| {
            BootstrapError::Config(format!("cluster url {:?}: {}", self.cluster.url, e))
        })?;
        Ok(parsed.port().unwrap_or(DEFAULT_API_SERVER_PORT))
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_name.trim().is_empty() {
            return Err(BootstrapError::Config("node name must not be empty".to_string()));
        }
        self.node_ip.parse::<IpAddr>().map_err(|_| {
            BootstrapError::Config(format!("node IP {:?} is not an IP address", self.node_ip))
        })?;
        let url = Url::parse(&self.cluster.url).map_err(|e| {
            BootstrapError::Config(format!("cluster url {:?}: {}", self.cluster.url, e))
        })?;
        if url.scheme() != "https" {
            return Err(BootstrapError::Config(format!(
                "cluster url {:?} must use https",
                self.cluster.url
            )));
        }
        Cidr::parse(&self.cluster.cluster_cidr)?;
        Cidr::parse(&self.cluster.service_cidr)?;
        Ok(())
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(
            shellexpand::tilde_with_context(s, || {
                dirs::home_dir().and_then(|p| p.to_str().map(str::to_string))
            })
            .to_string(),
        ),
        None => path.to_path_buf(),
    }
}

/// Effective uid from the `Uid:` line of `/proc/<pid>/status`
/// (real, effective, saved, filesystem).
fn effective_uid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Uid:"))
        .and_then(|ids| ids.split_whitespace().nth(1))
        .and_then(|euid| euid.parse().ok())
}

fn is_root() -> bool {
    fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| effective_uid(&status))
        .map_or(false, |uid| uid == 0)
}

/// The per-user data dir when it exists or the process is unprivileged,
/// the global one otherwise.
pub fn find_data_dir() -> PathBuf {
    choose_data_dir(expand_tilde(Path::new(DEFAULT_USER_DATA_DIR)), is_root())
}

fn choose_data_dir(user_data_dir: PathBuf, root: bool) -> PathBuf {
    if user_data_dir.exists() || !root {
        user_data_dir
    } else {
        PathBuf::from(DEFAULT_GLOBAL_DATA_DIR)
    }
}

/// The user config file, else the global one, else none.
pub fn find_config_file() -> Option<PathBuf> {
    first_existing([
        expand_tilde(Path::new(DEFAULT_USER_CONFIG_FILE)),
        PathBuf::from(DEFAULT_GLOBAL_CONFIG_FILE),
    ])
}

fn first_existing<I>(candidates: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    candidates.into_iter().find(|path| path.exists())
}

fn default_node_name() -> String {
    env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| {
            fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}
