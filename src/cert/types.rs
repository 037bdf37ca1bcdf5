// src/cert/types.rs
use openssl::pkey::{PKey, Private, Public};
use openssl::x509::X509;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Leaf certificates are valid for a little over a year.
pub const DEFAULT_LEAF_VALIDITY_DAYS: u32 = 375;
/// The root CA outlives every leaf it signs.
pub const DEFAULT_CA_VALIDITY_DAYS: u32 = 3650;
pub const DEFAULT_KEY_SIZE: u32 = 2048;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CertificateUsage {
    ServerAuth,
    ClientAuth,
    /// Both sides of a mutually authenticated link, e.g. etcd peers.
    PeerAuth,
}

impl CertificateUsage {
    pub fn extended_key_usage(&self) -> &'static [&'static str] {
        match self {
            CertificateUsage::ServerAuth => &["serverAuth"],
            CertificateUsage::ClientAuth => &["clientAuth"],
            CertificateUsage::PeerAuth => &["serverAuth", "clientAuth"],
        }
    }

    pub fn serves(&self) -> bool {
        matches!(self, CertificateUsage::ServerAuth | CertificateUsage::PeerAuth)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AltName {
    Dns(String),
    Ip(IpAddr),
}

impl AltName {
    pub fn dns(name: impl Into<String>) -> Self {
        AltName::Dns(name.into())
    }

    pub fn ip(addr: IpAddr) -> Self {
        AltName::Ip(addr)
    }

    /// IP literals become IP entries, anything else a DNS entry.
    pub fn from_host(host: &str) -> Self {
        match host.parse::<IpAddr>() {
            Ok(addr) => AltName::Ip(addr),
            Err(_) => AltName::Dns(host.to_string()),
        }
    }
}

impl fmt::Display for AltName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AltName::Dns(name) => write!(f, "DNS:{}", name),
            AltName::Ip(addr) => write!(f, "IP:{}", addr),
        }
    }
}

/// Everything that determines the content of a leaf certificate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateProfile {
    pub common_name: String,
    pub organizations: Vec<String>,
    pub usage: CertificateUsage,
    pub alt_names: Vec<AltName>,
    pub validity_days: u32,
    pub key_size: u32,
}

impl CertificateProfile {
    pub fn new(common_name: impl Into<String>, usage: CertificateUsage) -> Self {
        Self {
            common_name: common_name.into(),
            organizations: Vec::new(),
            usage,
            alt_names: Vec::new(),
            validity_days: DEFAULT_LEAF_VALIDITY_DAYS,
            key_size: DEFAULT_KEY_SIZE,
        }
    }

    pub fn server(common_name: impl Into<String>) -> Self {
        Self::new(common_name, CertificateUsage::ServerAuth)
    }

    pub fn peer(common_name: impl Into<String>) -> Self {
        Self::new(common_name, CertificateUsage::PeerAuth)
    }

    /// A client identity; `groups` land in Subject O and become RBAC groups.
    pub fn client<I, S>(username: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(username, CertificateUsage::ClientAuth).with_organizations(groups)
    }

    pub fn with_organizations<I, S>(mut self, organizations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for org in organizations {
            let org = org.into();
            if !self.organizations.contains(&org) {
                self.organizations.push(org);
            }
        }
        self
    }

    /// Appends alt names, skipping ones already present.
    pub fn with_alt_names<I>(mut self, alt_names: I) -> Self
    where
        I: IntoIterator<Item = AltName>,
    {
        for name in alt_names {
            if !self.alt_names.contains(&name) {
                self.alt_names.push(name);
            }
        }
        self
    }

    pub fn has_alt_name(&self, name: &AltName) -> bool {
        self.alt_names.contains(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl CredentialPaths {
    pub fn in_dir(dir: impl AsRef<Path>, cert_name: &str, key_name: &str) -> Self {
        Self {
            cert: dir.as_ref().join(cert_name),
            key: dir.as_ref().join(key_name),
        }
    }

    /// `tls.crt` / `tls.key`, the layout of a Kubernetes TLS secret.
    pub fn tls(dir: impl AsRef<Path>) -> Self {
        Self::in_dir(dir, "tls.crt", "tls.key")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPairPaths {
    pub public: PathBuf,
    pub private: PathBuf,
}

impl KeyPairPaths {
    pub fn in_dir(dir: impl AsRef<Path>, public_name: &str, private_name: &str) -> Self {
        Self {
            public: dir.as_ref().join(public_name),
            private: dir.as_ref().join(private_name),
        }
    }
}

/// A certificate and key signed by the cluster CA.
#[derive(Clone)]
pub struct LeafCredential {
    pub certificate: X509,
    pub private_key: PKey<Private>,
    pub paths: CredentialPaths,
}

impl fmt::Debug for LeafCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafCredential")
            .field("paths", &self.paths)
            .finish()
    }
}

/// A key pair with no certificate, e.g. the service-account token signer.
#[derive(Clone)]
pub struct BareKeyPair {
    pub private_key: PKey<Private>,
    pub public_key: PKey<Public>,
    pub paths: KeyPairPaths,
}

impl fmt::Debug for BareKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BareKeyPair")
            .field("paths", &self.paths)
            .finish()
    }
}
