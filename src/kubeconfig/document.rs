// src/kubeconfig/document.rs
use serde::{Deserialize, Serialize};

/// On-disk kubeconfig, the subset of `clientcmd/v1` written here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct KubeConfigDocument {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub clusters: Vec<NamedCluster>,
    pub contexts: Vec<NamedContext>,
    pub current_context: String,
    pub users: Vec<NamedUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterEntry {
    pub server: String,
    /// Base64 of the PEM CA bundle.
    pub certificate_authority_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedUser {
    pub name: String,
    pub user: UserEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct UserEntry {
    pub client_certificate_data: String,
    pub client_key_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextEntry {
    pub cluster: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl KubeConfigDocument {
    /// Resolves `current-context` to its cluster and user entries.
    pub fn current(&self) -> Result<(&NamedCluster, &NamedUser), String> {
        let context = self
            .contexts
            .iter()
            .find(|c| c.name == self.current_context)
            .ok_or_else(|| format!("current-context {:?} not found", self.current_context))?;
        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == context.context.cluster)
            .ok_or_else(|| format!("cluster {:?} not found", context.context.cluster))?;
        let user = self
            .users
            .iter()
            .find(|u| u.name == context.context.user)
            .ok_or_else(|| format!("user {:?} not found", context.context.user))?;
        Ok((cluster, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"apiVersion: v1
kind: Config
clusters:
- name: microshift
  cluster:
    server: https://127.0.0.1:6443
    certificate-authority-data: Q0E=
contexts:
- name: microshift
  context:
    cluster: microshift
    user: user
    namespace: default
current-context: microshift
users:
- name: user
  user:
    client-certificate-data: Q0VSVA==
    client-key-data: S0VZ
"#;

    #[test]
    fn parses_kubectl_style_keys() {
        let doc: KubeConfigDocument = serde_yaml::from_str(SAMPLE).unwrap();
        let (cluster, user) = doc.current().unwrap();
        assert_eq!(cluster.cluster.server, "https://127.0.0.1:6443");
        assert_eq!(user.user.client_key_data, "S0VZ");
    }

    #[test]
    fn dangling_context_is_reported() {
        let mut doc: KubeConfigDocument = serde_yaml::from_str(SAMPLE).unwrap();
        doc.current_context = "other".to_string();
        assert!(doc.current().unwrap_err().contains("other"));
    }
}
