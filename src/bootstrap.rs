// src/bootstrap.rs
use crate::cert::{
    key_pair_catalog, leaf_catalog, load_or_create_key_pair, load_or_create_leaf, BareKeyPair,
    CertificateAuthority, LeafCredential,
};
use crate::config::NodeIdentity;
use crate::error::Result;
use crate::kubeconfig::{kubeconfig_catalog, load_or_create_kubeconfig, Kubeconfig};
use crate::layout::DataLayout;
use crate::network::derive_api_server_service_ip;
use crate::utils::logging::Logger;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BootstrapStage {
    Start,
    CaReady,
    ServiceIpReady,
    CertsIssued,
    KeyPairsIssued,
    KubeconfigsIssued,
    Done,
    Aborted,
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapStage::Start => "start",
            BootstrapStage::CaReady => "CA-ready",
            BootstrapStage::ServiceIpReady => "service-IP-ready",
            BootstrapStage::CertsIssued => "certs-issued",
            BootstrapStage::KeyPairsIssued => "keypairs-issued",
            BootstrapStage::KubeconfigsIssued => "kubeconfigs-issued",
            BootstrapStage::Done => "done",
            BootstrapStage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Everything a completed bootstrap produced or reused.
#[derive(Debug)]
pub struct BootstrapArtifacts {
    pub ca: CertificateAuthority,
    pub service_ip: IpAddr,
    pub leaves: Vec<(&'static str, LeafCredential)>,
    pub key_pairs: Vec<(&'static str, BareKeyPair)>,
    pub kubeconfigs: Vec<(&'static str, Kubeconfig)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactPaths {
    pub name: String,
    pub kind: &'static str,
    pub paths: Vec<PathBuf>,
}

/// What launchers need to know after a run, in a form the binary can print.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub completed_at: DateTime<Utc>,
    pub data_dir: PathBuf,
    pub ca_fingerprint: String,
    pub service_ip: IpAddr,
    pub artifacts: Vec<ArtifactPaths>,
}

impl BootstrapArtifacts {
    pub fn leaf(&self, name: &str) -> Option<&LeafCredential> {
        self.leaves.iter().find(|(n, _)| *n == name).map(|(_, l)| l)
    }

    pub fn key_pair(&self, name: &str) -> Option<&BareKeyPair> {
        self.key_pairs.iter().find(|(n, _)| *n == name).map(|(_, k)| k)
    }

    pub fn kubeconfig(&self, name: &str) -> Option<&Kubeconfig> {
        self.kubeconfigs.iter().find(|(n, _)| *n == name).map(|(_, k)| k)
    }

    pub fn report(&self, layout: &DataLayout) -> Result<BootstrapReport> {
        let mut artifacts = vec![ArtifactPaths {
            name: "ca-bundle".to_string(),
            kind: "ca",
            paths: vec![self.ca.paths.cert.clone(), self.ca.paths.key.clone()],
        }];
        artifacts.extend(self.leaves.iter().map(|(name, leaf)| ArtifactPaths {
            name: name.to_string(),
            kind: "certificate",
            paths: vec![leaf.paths.cert.clone(), leaf.paths.key.clone()],
        }));
        artifacts.extend(self.key_pairs.iter().map(|(name, pair)| ArtifactPaths {
            name: name.to_string(),
            kind: "key-pair",
            paths: vec![pair.paths.public.clone(), pair.paths.private.clone()],
        }));
        artifacts.extend(self.kubeconfigs.iter().map(|(name, kubeconfig)| ArtifactPaths {
            name: name.to_string(),
            kind: "kubeconfig",
            paths: vec![kubeconfig.path.clone()],
        }));

        Ok(BootstrapReport {
            completed_at: Utc::now(),
            data_dir: layout.root().to_path_buf(),
            ca_fingerprint: self.ca.fingerprint()?,
            service_ip: self.service_ip,
            artifacts,
        })
    }
}

/// Runs the fixed bootstrap sequence against one data directory. Each step is
/// load-or-create, so rerunning after a failure resumes where it stopped.
pub struct BootstrapOrchestrator<'a> {
    identity: NodeIdentity,
    layout: DataLayout,
    logger: &'a mut dyn Logger,
    stage: BootstrapStage,
}

impl<'a> BootstrapOrchestrator<'a> {
    pub fn new(identity: NodeIdentity, logger: &'a mut dyn Logger) -> Self {
        let layout = DataLayout::new(&identity.data_dir);
        Self {
            identity,
            layout,
            logger,
            stage: BootstrapStage::Start,
        }
    }

    pub fn stage(&self) -> BootstrapStage {
        self.stage
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn run(&mut self) -> Result<BootstrapArtifacts> {
        self.logger.log(&format!(
            "Bootstrapping PKI for node {} ({}) in {}",
            self.identity.node_name,
            self.identity.node_ip,
            self.layout.root().display()
        ));

        match self.run_stages() {
            Ok(artifacts) => {
                self.advance(BootstrapStage::Done);
                Ok(artifacts)
            }
            Err(e) => {
                self.logger
                    .log(&format!("Bootstrap aborted after {}: {}", self.stage, e));
                self.stage = BootstrapStage::Aborted;
                Err(e)
            }
        }
    }

    fn advance(&mut self, next: BootstrapStage) {
        self.logger
            .debug_log(&format!("bootstrap stage {} -> {}", self.stage, next));
        self.stage = next;
    }

    fn run_stages(&mut self) -> Result<BootstrapArtifacts> {
        let ca = CertificateAuthority::load_or_create(&self.layout.ca(), self.logger)?;
        self.advance(BootstrapStage::CaReady);

        let service_ip = derive_api_server_service_ip(&self.identity.service_cidr)?;
        self.logger
            .debug_log(&format!("API server service IP is {}", service_ip));
        self.advance(BootstrapStage::ServiceIpReady);

        let mut leaves = Vec::new();
        for entry in leaf_catalog(&self.identity, &self.layout, service_ip) {
            let leaf = load_or_create_leaf(&ca, &entry.profile, &entry.paths, self.logger)?;
            leaves.push((entry.name, leaf));
        }
        self.advance(BootstrapStage::CertsIssued);

        let mut key_pairs = Vec::new();
        for entry in key_pair_catalog(&self.layout) {
            let pair = load_or_create_key_pair(&entry.paths, self.logger)?;
            key_pairs.push((entry.name, pair));
        }
        self.advance(BootstrapStage::KeyPairsIssued);

        let mut kubeconfigs = Vec::new();
        for entry in kubeconfig_catalog(&self.identity, &self.layout) {
            let kubeconfig = load_or_create_kubeconfig(
                &ca,
                &entry.path,
                &entry.username,
                &entry.groups,
                &self.identity.cluster_url,
                self.logger,
            )?;
            kubeconfigs.push((entry.name, kubeconfig));
        }
        self.advance(BootstrapStage::KubeconfigsIssued);

        Ok(BootstrapArtifacts {
            ca,
            service_ip,
            leaves,
            key_pairs,
            kubeconfigs,
        })
    }
}

pub fn bootstrap(identity: &NodeIdentity, logger: &mut dyn Logger) -> Result<BootstrapArtifacts> {
    BootstrapOrchestrator::new(identity.clone(), logger).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BootstrapError;
    use crate::utils::logging::MemoryLogger;
    use tempfile::TempDir;

    fn identity(dir: &TempDir) -> NodeIdentity {
        NodeIdentity::new("edge-1", "192.168.1.10".parse().unwrap(), dir.path())
    }

    #[test]
    fn completed_run_reaches_done() {
        let temp_dir = TempDir::new().unwrap();
        let mut logger = MemoryLogger::new();
        let mut orchestrator = BootstrapOrchestrator::new(identity(&temp_dir), &mut logger);

        let artifacts = orchestrator.run().unwrap();
        assert_eq!(orchestrator.stage(), BootstrapStage::Done);
        assert_eq!(artifacts.service_ip, "10.43.0.1".parse::<IpAddr>().unwrap());
        assert!(artifacts.leaf("kube-apiserver-serving").is_some());
        assert!(artifacts.key_pair("service-account-key").is_some());
        assert!(artifacts.kubeconfig("kubeadmin").is_some());
        assert!(logger.contains("kubeconfigs-issued -> done"));
    }

    #[test]
    fn invalid_service_cidr_aborts_after_ca() {
        let temp_dir = TempDir::new().unwrap();
        let mut logger = MemoryLogger::new();
        let identity = identity(&temp_dir).with_service_cidr("not-a-cidr");
        let mut orchestrator = BootstrapOrchestrator::new(identity, &mut logger);

        let err = orchestrator.run().unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidCidr { .. }));
        assert_eq!(orchestrator.stage(), BootstrapStage::Aborted);
        assert!(orchestrator.layout().ca().cert.exists());
        assert!(!orchestrator.layout().etcd_serving().cert.exists());
        assert!(logger.contains("Bootstrap aborted after CA-ready"));
    }

    #[test]
    fn report_lists_every_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let mut logger = MemoryLogger::new();
        let identity = identity(&temp_dir);
        let artifacts = bootstrap(&identity, &mut logger).unwrap();

        let report = artifacts.report(&DataLayout::new(temp_dir.path())).unwrap();
        assert_eq!(report.artifacts.len(), 1 + 9 + 2 + 5);
        assert_eq!(report.ca_fingerprint.len(), 64);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["service_ip"], "10.43.0.1");
        assert_eq!(json["artifacts"][0]["kind"], "ca");
    }
}
