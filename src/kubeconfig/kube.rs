// src/kubeconfig/kube.rs
use super::document::{
    ClusterEntry, ContextEntry, KubeConfigDocument, NamedCluster, NamedContext, NamedUser,
    UserEntry,
};
use crate::cert::issuer::issue;
use crate::cert::verification::{key_matches, summarize, verify_signed_by};
use crate::cert::{private_key_to_pem, CertificateAuthority, CertificateProfile};
use crate::error::{BootstrapError, Result};
use crate::utils::fs::{read_if_exists, write_atomic, PRIVATE_MODE};
use crate::utils::logging::Logger;
use base64::{engine::general_purpose, Engine as _};
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use std::fmt;
use std::path::{Path, PathBuf};

pub const CLUSTER_NAME: &str = "microshift";
pub const CONTEXT_NAME: &str = "microshift";
pub const USER_NAME: &str = "user";
pub const DEFAULT_NAMESPACE: &str = "default";

pub struct Kubeconfig {
    pub path: PathBuf,
    pub cluster_url: String,
    pub context_name: String,
    pub ca_bundle: Vec<u8>,
    pub client_certificate: X509,
    pub client_key: PKey<Private>,
    pub document: KubeConfigDocument,
}

impl fmt::Debug for Kubeconfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kubeconfig")
            .field("path", &self.path)
            .field("cluster_url", &self.cluster_url)
            .field("context_name", &self.context_name)
            .finish()
    }
}

impl Kubeconfig {
    /// Username and groups asserted by the embedded client certificate.
    pub fn client_identity(&self) -> Result<(String, Vec<String>)> {
        let summary = summarize(&self.client_certificate)
            .map_err(|reason| BootstrapError::malformed_kubeconfig(&self.path, reason))?;
        let username = summary.common_name.ok_or_else(|| {
            BootstrapError::malformed_kubeconfig(&self.path, "client certificate has no common name")
        })?;
        Ok((username, summary.organizations))
    }
}

/// Loads the kubeconfig at `path` or issues a client certificate for
/// `username`/`groups` and writes a new one pointing at `cluster_url`.
pub fn load_or_create_kubeconfig(
    ca: &CertificateAuthority,
    path: &Path,
    username: &str,
    groups: &[&str],
    cluster_url: &str,
    logger: &mut dyn Logger,
) -> Result<Kubeconfig> {
    match read_if_exists(path)? {
        Some(bytes) => {
            let kubeconfig = parse(ca, path, &bytes)?;
            if kubeconfig.cluster_url != cluster_url {
                logger.log(&format!(
                    "Kubeconfig {} points at {} instead of {}; leaving it unchanged",
                    path.display(),
                    kubeconfig.cluster_url,
                    cluster_url
                ));
            }
            logger.log(&format!("Using existing kubeconfig {}", path.display()));
            Ok(kubeconfig)
        }
        None => create(ca, path, username, groups, cluster_url, logger),
    }
}

fn decode_field(path: &Path, field: &str, value: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(value.trim())
        .map_err(|e| BootstrapError::malformed_kubeconfig(path, format!("{}: {}", field, e)))
}

fn parse(ca: &CertificateAuthority, path: &Path, bytes: &[u8]) -> Result<Kubeconfig> {
    let document: KubeConfigDocument = serde_yaml::from_slice(bytes)
        .map_err(|e| BootstrapError::malformed_kubeconfig(path, e.to_string()))?;
    let (cluster, user) = document
        .current()
        .map_err(|reason| BootstrapError::malformed_kubeconfig(path, reason))?;

    let ca_bundle = decode_field(
        path,
        "certificate-authority-data",
        &cluster.cluster.certificate_authority_data,
    )?;
    let cert_pem = decode_field(path, "client-certificate-data", &user.user.client_certificate_data)?;
    let key_pem = decode_field(path, "client-key-data", &user.user.client_key_data)?;

    let client_certificate = X509::from_pem(&cert_pem)
        .map_err(|e| BootstrapError::malformed_kubeconfig(path, format!("client certificate: {}", e)))?;
    let client_key = PKey::private_key_from_pem(&key_pem)
        .map_err(|e| BootstrapError::malformed_kubeconfig(path, format!("client key: {}", e)))?;
    let embedded_ca = X509::from_pem(&ca_bundle)
        .map_err(|e| BootstrapError::malformed_kubeconfig(path, format!("CA bundle: {}", e)))?;

    let embedded_der = embedded_ca.to_der().map_err(|e| BootstrapError::crypto(path, e))?;
    let current_der = ca.certificate.to_der().map_err(|e| BootstrapError::crypto(path, e))?;
    if embedded_der != current_der {
        return Err(BootstrapError::untrusted(
            path,
            "certificate-authority-data is not the current root CA",
        ));
    }

    verify_signed_by(&client_certificate, &ca.certificate)
        .map_err(|reason| BootstrapError::untrusted(path, reason))?;
    key_matches(&client_certificate, &client_key)
        .map_err(|reason| BootstrapError::malformed_kubeconfig(path, reason))?;

    let cluster_url = cluster.cluster.server.clone();
    let context_name = document.current_context.clone();
    Ok(Kubeconfig {
        path: path.to_path_buf(),
        cluster_url,
        context_name,
        ca_bundle,
        client_certificate,
        client_key,
        document,
    })
}

fn create(
    ca: &CertificateAuthority,
    path: &Path,
    username: &str,
    groups: &[&str],
    cluster_url: &str,
    logger: &mut dyn Logger,
) -> Result<Kubeconfig> {
    logger.log(&format!("Generating kubeconfig for {}", username));
    logger.debug_log(&format!(
        "kubeconfig {} groups {:?} server {}",
        path.display(),
        groups,
        cluster_url
    ));

    let profile = CertificateProfile::client(username, groups.iter().copied());
    let (client_certificate, client_key) =
        issue(ca, &profile).map_err(|e| BootstrapError::crypto(path, e))?;

    let ca_bundle = ca.bundle_pem()?;
    let cert_pem = client_certificate
        .to_pem()
        .map_err(|e| BootstrapError::crypto(path, e))?;
    let key_pem = private_key_to_pem(&client_key).map_err(|e| BootstrapError::crypto(path, e))?;

    let document = KubeConfigDocument {
        api_version: "v1".to_string(),
        kind: "Config".to_string(),
        clusters: vec![NamedCluster {
            name: CLUSTER_NAME.to_string(),
            cluster: ClusterEntry {
                server: cluster_url.to_string(),
                certificate_authority_data: general_purpose::STANDARD.encode(&ca_bundle),
            },
        }],
        contexts: vec![NamedContext {
            name: CONTEXT_NAME.to_string(),
            context: ContextEntry {
                cluster: CLUSTER_NAME.to_string(),
                user: USER_NAME.to_string(),
                namespace: Some(DEFAULT_NAMESPACE.to_string()),
            },
        }],
        current_context: CONTEXT_NAME.to_string(),
        users: vec![NamedUser {
            name: USER_NAME.to_string(),
            user: UserEntry {
                client_certificate_data: general_purpose::STANDARD.encode(&cert_pem),
                client_key_data: general_purpose::STANDARD.encode(&key_pem),
            },
        }],
    };

    let yaml = serde_yaml::to_string(&document)
        .map_err(|e| BootstrapError::malformed_kubeconfig(path, e.to_string()))?;
    write_atomic(path, yaml.as_bytes(), PRIVATE_MODE)?;

    Ok(Kubeconfig {
        path: path.to_path_buf(),
        cluster_url: cluster_url.to_string(),
        context_name: CONTEXT_NAME.to_string(),
        ca_bundle,
        client_certificate,
        client_key,
        document,
    })
}
