// src/cert/catalog.rs
//! The fixed set of certificates and key pairs a node needs, as data.
//! Adding a component means adding a row here.

use super::types::{AltName, CertificateProfile, CredentialPaths, KeyPairPaths};
use crate::config::NodeIdentity;
use crate::layout::DataLayout;
use std::net::{IpAddr, Ipv4Addr};

#[derive(Debug, Clone)]
pub struct LeafEntry {
    pub name: &'static str,
    pub profile: CertificateProfile,
    pub paths: CredentialPaths,
}

#[derive(Debug, Clone)]
pub struct KeyPairEntry {
    pub name: &'static str,
    pub paths: KeyPairPaths,
}

/// Loopback, `localhost`, node IP and node name: present on every
/// certificate served from this node.
pub fn node_alt_names(identity: &NodeIdentity) -> Vec<AltName> {
    vec![
        AltName::dns("localhost"),
        AltName::ip(identity.node_ip),
        AltName::ip(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        AltName::from_host(&identity.node_name),
    ]
}

/// Names the in-cluster `kubernetes` service resolves under.
pub fn kubernetes_service_names(dns_domain: &str) -> Vec<AltName> {
    vec![
        AltName::dns("kubernetes"),
        AltName::dns("kubernetes.default"),
        AltName::dns("kubernetes.default.svc"),
        AltName::dns(format!("kubernetes.default.svc.{}", dns_domain)),
    ]
}

pub fn leaf_catalog(
    identity: &NodeIdentity,
    layout: &DataLayout,
    api_server_service_ip: IpAddr,
) -> Vec<LeafEntry> {
    let node = node_alt_names(identity);
    let service = kubernetes_service_names(&identity.dns_domain);

    vec![
        LeafEntry {
            name: "etcd-serving",
            profile: CertificateProfile::server("etcd-server").with_alt_names(node.clone()),
            paths: layout.etcd_serving(),
        },
        LeafEntry {
            name: "etcd-peer",
            profile: CertificateProfile::peer("etcd-peer").with_alt_names(node.clone()),
            paths: layout.etcd_peer(),
        },
        LeafEntry {
            name: "etcd-client",
            profile: CertificateProfile::client("etcd-client", ["system:etcd-clients"]),
            paths: layout.etcd_client(),
        },
        LeafEntry {
            name: "kube-apiserver-serving",
            profile: CertificateProfile::server("kube-apiserver")
                .with_alt_names([AltName::dns("kube-apiserver")])
                .with_alt_names(node.clone())
                .with_alt_names(service.clone())
                .with_alt_names([AltName::ip(api_server_service_ip)]),
            paths: layout.api_server_serving(),
        },
        LeafEntry {
            // must match an allowed requestheader name of the aggregated API servers
            name: "aggregator-client",
            profile: CertificateProfile::client("system:openshift-aggregator", ["system:masters"]),
            paths: layout.aggregator_client(),
        },
        LeafEntry {
            name: "kubelet-client",
            profile: CertificateProfile::client("kube-apiserver-kubelet-client", ["system:masters"]),
            paths: layout.kubelet_client(),
        },
        LeafEntry {
            name: "kubelet-serving",
            profile: CertificateProfile::server(format!("system:node:{}", identity.node_name))
                .with_alt_names(node.clone()),
            paths: layout.kubelet_serving(),
        },
        LeafEntry {
            name: "openshift-controller-manager-serving",
            profile: CertificateProfile::server("openshift-controller-manager")
                .with_alt_names([AltName::dns("openshift-controller-manager")])
                .with_alt_names(node.clone())
                .with_alt_names(service),
            paths: layout.openshift_controller_manager_serving(),
        },
        LeafEntry {
            name: "service-ca-serving",
            profile: CertificateProfile::server("service-ca")
                .with_alt_names([AltName::dns("service-ca")])
                .with_alt_names(node)
                .with_alt_names([AltName::ip(api_server_service_ip)]),
            paths: layout.service_ca_serving(),
        },
    ]
}

pub fn key_pair_catalog(layout: &DataLayout) -> Vec<KeyPairEntry> {
    vec![
        KeyPairEntry {
            name: "service-account-key",
            paths: layout.service_account_key(),
        },
        KeyPairEntry {
            name: "serving-ca-key",
            paths: layout.serving_ca_key(),
        },
    ]
}
