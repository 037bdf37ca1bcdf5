// src/error.rs
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BootstrapError>;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid service CIDR {cidr:?}: {reason}")]
    InvalidCidr { cidr: String, reason: String },

    #[error("malformed CA material at {}: {reason}", path.display())]
    MalformedCa { path: PathBuf, reason: String },

    #[error("existing certificate at {} is not trusted by the current CA: {reason}", path.display())]
    UntrustedExistingCert { path: PathBuf, reason: String },

    #[error("malformed kubeconfig at {}: {reason}", path.display())]
    MalformedKubeconfig { path: PathBuf, reason: String },

    #[error("malformed key pair at {}: {reason}", path.display())]
    MalformedKeyPair { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("crypto failure for {}: {source}", path.display())]
    Crypto {
        path: PathBuf,
        #[source]
        source: openssl::error::ErrorStack,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl BootstrapError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        BootstrapError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn crypto(path: impl AsRef<Path>, source: openssl::error::ErrorStack) -> Self {
        BootstrapError::Crypto {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn malformed_ca(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        BootstrapError::MalformedCa {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn untrusted(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        BootstrapError::UntrustedExistingCert {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn malformed_key_pair(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        BootstrapError::MalformedKeyPair {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn malformed_kubeconfig(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        BootstrapError::MalformedKubeconfig {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_path() {
        let err = BootstrapError::io(
            "/var/lib/microshift/certs/ca-bundle/ca-bundle.crt",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("/var/lib/microshift/certs/ca-bundle/ca-bundle.crt"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn invalid_cidr_names_the_input() {
        let err = BootstrapError::InvalidCidr {
            cidr: "not-a-cidr".to_string(),
            reason: "missing prefix length".to_string(),
        };
        assert!(err.to_string().contains("not-a-cidr"));
    }
}
