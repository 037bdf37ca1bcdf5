// src/layout.rs
//! Where every artifact lives under the data directory. Launchers read these
//! paths and hand them to the control-plane binaries as flags.

use crate::cert::{CredentialPaths, KeyPairPaths};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn certs(&self, rel: &str) -> PathBuf {
        self.root.join("certs").join(rel)
    }

    fn resources(&self, rel: &str) -> PathBuf {
        self.root.join("resources").join(rel)
    }

    pub fn ca(&self) -> CredentialPaths {
        CredentialPaths::in_dir(self.certs("ca-bundle"), "ca-bundle.crt", "ca-bundle.key")
    }

    pub fn etcd_serving(&self) -> CredentialPaths {
        CredentialPaths::in_dir(self.certs("etcd"), "etcd-serving.crt", "etcd-serving.key")
    }

    pub fn etcd_peer(&self) -> CredentialPaths {
        CredentialPaths::in_dir(self.certs("etcd"), "etcd-peer.crt", "etcd-peer.key")
    }

    pub fn etcd_client(&self) -> CredentialPaths {
        CredentialPaths::tls(self.resources("kube-apiserver/secrets/etcd-client"))
    }

    pub fn api_server_serving(&self) -> CredentialPaths {
        CredentialPaths::tls(self.certs("kube-apiserver/secrets/service-network-serving-certkey"))
    }

    pub fn aggregator_client(&self) -> CredentialPaths {
        CredentialPaths::tls(self.certs("kube-apiserver/secrets/aggregator-client"))
    }

    pub fn kubelet_client(&self) -> CredentialPaths {
        CredentialPaths::tls(self.resources("kube-apiserver/secrets/kubelet-client"))
    }

    pub fn kubelet_serving(&self) -> CredentialPaths {
        CredentialPaths::tls(self.resources("kubelet/secrets/kubelet-serving"))
    }

    pub fn openshift_controller_manager_serving(&self) -> CredentialPaths {
        CredentialPaths::tls(self.resources("openshift-controller-manager/secrets"))
    }

    pub fn service_ca_serving(&self) -> CredentialPaths {
        CredentialPaths::tls(self.resources("service-ca/secrets/service-ca"))
    }

    pub fn service_account_key(&self) -> KeyPairPaths {
        KeyPairPaths::in_dir(
            self.resources("kube-apiserver/secrets/service-account-key"),
            "service-account.crt",
            "service-account.key",
        )
    }

    pub fn serving_ca_key(&self) -> KeyPairPaths {
        KeyPairPaths::in_dir(
            self.resources("kube-apiserver/sa-public-key"),
            "serving-ca.pub",
            "serving-ca.key",
        )
    }

    pub fn admin_kubeconfig(&self) -> PathBuf {
        self.resources("kubeadmin/kubeconfig")
    }

    /// `resources/<component>/kubeconfig`
    pub fn component_kubeconfig(&self, component: &str) -> PathBuf {
        self.resources(component).join("kubeconfig")
    }
}
