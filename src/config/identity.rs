// src/config/identity.rs
use super::types::ClusterConfig;
use crate::error::{BootstrapError, Result};
use std::net::IpAddr;
use std::path::PathBuf;

/// Read-only node and network facts every issuance step needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub node_name: String,
    pub node_ip: IpAddr,
    pub data_dir: PathBuf,
    pub cluster_cidr: String,
    pub service_cidr: String,
    pub cluster_url: String,
    pub dns_domain: String,
}

impl NodeIdentity {
    pub fn new(
        node_name: impl Into<String>,
        node_ip: IpAddr,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        let network = super::types::NetworkConfig::default();
        Self {
            node_name: node_name.into(),
            node_ip,
            data_dir: data_dir.into(),
            cluster_cidr: network.cluster_cidr,
            service_cidr: network.service_cidr,
            cluster_url: network.url,
            dns_domain: network.domain,
        }
    }

    pub fn with_service_cidr(mut self, service_cidr: impl Into<String>) -> Self {
        self.service_cidr = service_cidr.into();
        self
    }
}

impl ClusterConfig {
    pub fn node_identity(&self) -> Result<NodeIdentity> {
        self.validate()?;
        let node_ip = self.node_ip.parse::<IpAddr>().map_err(|_| {
            BootstrapError::Config(format!("node IP {:?} is not an IP address", self.node_ip))
        })?;

        Ok(NodeIdentity {
            node_name: self.node_name.clone(),
            node_ip,
            data_dir: self.data_dir.clone(),
            cluster_cidr: self.cluster.cluster_cidr.clone(),
            service_cidr: self.cluster.service_cidr.clone(),
            cluster_url: self.cluster.url.clone(),
            dns_domain: self.cluster.domain.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_copies_config_values() {
        let mut config = ClusterConfig::default();
        config.node_name = "edge-1".to_string();
        config.node_ip = "192.168.1.10".to_string();
        config.data_dir = PathBuf::from("/srv/microshift");

        let identity = config.node_identity().unwrap();
        assert_eq!(identity.node_name, "edge-1");
        assert_eq!(identity.node_ip, "192.168.1.10".parse::<IpAddr>().unwrap());
        assert_eq!(identity.service_cidr, "10.43.0.0/16");
        assert_eq!(identity.cluster_url, "https://127.0.0.1:6443");
        assert_eq!(identity.dns_domain, "cluster.local");
    }
}
