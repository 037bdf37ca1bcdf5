// src/kubeconfig/mod.rs
mod catalog;
mod document;
mod kube;

pub use catalog::{kubeconfig_catalog, KubeconfigEntry};
pub use document::{
    ClusterEntry, ContextEntry, KubeConfigDocument, NamedCluster, NamedContext, NamedUser,
    UserEntry,
};
pub use kube::{
    load_or_create_kubeconfig, Kubeconfig, CLUSTER_NAME, CONTEXT_NAME, DEFAULT_NAMESPACE,
    USER_NAME,
};
