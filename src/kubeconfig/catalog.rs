// src/kubeconfig/catalog.rs
use crate::config::NodeIdentity;
use crate::layout::DataLayout;
use std::path::PathBuf;

/// A principal that gets its own kubeconfig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeconfigEntry {
    pub name: &'static str,
    pub username: String,
    pub groups: Vec<&'static str>,
    pub path: PathBuf,
}

impl KubeconfigEntry {
    fn component(layout: &DataLayout, name: &'static str, username: impl Into<String>, groups: Vec<&'static str>) -> Self {
        Self {
            name,
            username: username.into(),
            groups,
            path: layout.component_kubeconfig(name),
        }
    }
}

pub fn kubeconfig_catalog(identity: &NodeIdentity, layout: &DataLayout) -> Vec<KubeconfigEntry> {
    vec![
        KubeconfigEntry {
            name: "kubeadmin",
            username: "system:admin".to_string(),
            groups: vec!["system:masters"],
            path: layout.admin_kubeconfig(),
        },
        KubeconfigEntry::component(
            layout,
            "kube-apiserver",
            "system:kube-apiserver",
            vec!["kube-apiserver", "system:kube-apiserver", "system:masters"],
        ),
        KubeconfigEntry::component(
            layout,
            "kube-controller-manager",
            "system:kube-controller-manager",
            vec!["system:kube-controller-manager"],
        ),
        KubeconfigEntry::component(
            layout,
            "kube-scheduler",
            "system:kube-scheduler",
            vec!["system:kube-scheduler"],
        ),
        KubeconfigEntry::component(
            layout,
            "kubelet",
            format!("system:node:{}", identity.node_name),
            vec!["system:nodes"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kubelet_identity_tracks_node_name() {
        let identity = NodeIdentity::new("edge-1", "192.168.1.10".parse().unwrap(), "/data");
        let layout = DataLayout::new(&identity.data_dir);
        let catalog = kubeconfig_catalog(&identity, &layout);

        let kubelet = catalog.iter().find(|e| e.name == "kubelet").unwrap();
        assert_eq!(kubelet.username, "system:node:edge-1");
        assert_eq!(kubelet.groups, vec!["system:nodes"]);
        assert_eq!(kubelet.path, PathBuf::from("/data/resources/kubelet/kubeconfig"));

        let admin = &catalog[0];
        assert_eq!(admin.username, "system:admin");
        assert_eq!(admin.path, PathBuf::from("/data/resources/kubeadmin/kubeconfig"));
        assert_eq!(catalog.len(), 5);
    }
}
