// src/cert/ca.rs
use super::{
    openssl::{build_ca_certificate, generate_private_key, private_key_to_pem, sha256_fingerprint},
    types::{CredentialPaths, DEFAULT_CA_VALIDITY_DAYS, DEFAULT_KEY_SIZE},
    verification::check_root_ca,
};
use crate::error::{BootstrapError, Result};
use crate::utils::fs::{read_if_exists, StagedFile, PRIVATE_MODE, PUBLIC_MODE};
use crate::utils::logging::Logger;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use std::fmt;

pub const ROOT_CA_COMMON_NAME: &str = "https://kubernetes.svc";
pub const ROOT_CA_ORGANIZATION: &str = "microshift";

/// The single trust anchor of a data directory.
pub struct CertificateAuthority {
    pub certificate: X509,
    pub private_key: PKey<Private>,
    pub paths: CredentialPaths,
}

impl fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateAuthority")
            .field("paths", &self.paths)
            .finish()
    }
}

impl CertificateAuthority {
    /// Loads the CA at `paths`, creating it when absent. Existing material is
    /// never replaced; anything unusable is a [`BootstrapError::MalformedCa`].
    pub fn load_or_create(paths: &CredentialPaths, logger: &mut dyn Logger) -> Result<Self> {
        let cert_pem = read_if_exists(&paths.cert)?;
        let key_pem = read_if_exists(&paths.key)?;

        match (cert_pem, key_pem) {
            (Some(cert_pem), Some(key_pem)) => {
                let ca = Self::parse(paths, &cert_pem, &key_pem)?;
                logger.log(&format!("Loaded existing root CA from {}", paths.cert.display()));
                Ok(ca)
            }
            (Some(_), None) => Err(BootstrapError::malformed_ca(
                &paths.key,
                "CA certificate exists but its private key is missing",
            )),
            (None, orphan_key) => {
                if orphan_key.is_some() {
                    logger.log(&format!(
                        "Replacing CA key {} left without a certificate",
                        paths.key.display()
                    ));
                }
                Self::create(paths, logger)
            }
        }
    }

    fn parse(paths: &CredentialPaths, cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        let certificate = X509::from_pem(cert_pem)
            .map_err(|e| BootstrapError::malformed_ca(&paths.cert, e.to_string()))?;
        let private_key = PKey::private_key_from_pem(key_pem)
            .map_err(|e| BootstrapError::malformed_ca(&paths.key, e.to_string()))?;
        check_root_ca(&certificate, &private_key)
            .map_err(|reason| BootstrapError::malformed_ca(&paths.cert, reason))?;

        Ok(Self {
            certificate,
            private_key,
            paths: paths.clone(),
        })
    }

    fn create(paths: &CredentialPaths, logger: &mut dyn Logger) -> Result<Self> {
        logger.log("Generating root CA certificate...");

        let private_key = generate_private_key(DEFAULT_KEY_SIZE)
            .map_err(|e| BootstrapError::crypto(&paths.key, e))?;
        let certificate = build_ca_certificate(
            &private_key,
            ROOT_CA_COMMON_NAME,
            ROOT_CA_ORGANIZATION,
            DEFAULT_CA_VALIDITY_DAYS,
        )
        .map_err(|e| BootstrapError::crypto(&paths.cert, e))?;

        let key_pem = private_key_to_pem(&private_key)
            .map_err(|e| BootstrapError::crypto(&paths.key, e))?;
        let cert_pem = certificate
            .to_pem()
            .map_err(|e| BootstrapError::crypto(&paths.cert, e))?;

        // Key first: a crash between the two renames leaves an orphan key,
        // which the next run replaces.
        let staged_key = StagedFile::write(&paths.key, &key_pem, PRIVATE_MODE)?;
        let staged_cert = StagedFile::write(&paths.cert, &cert_pem, PUBLIC_MODE)?;
        staged_key.commit()?;
        staged_cert.commit()?;

        logger.log("Root CA certificate generated successfully");
        logger.debug_log(&format!(
            "CA certificate: {}, key: {}",
            paths.cert.display(),
            paths.key.display()
        ));

        Ok(Self {
            certificate,
            private_key,
            paths: paths.clone(),
        })
    }

    pub fn bundle_pem(&self) -> Result<Vec<u8>> {
        self.certificate
            .to_pem()
            .map_err(|e| BootstrapError::crypto(&self.paths.cert, e))
    }

    pub fn fingerprint(&self) -> Result<String> {
        sha256_fingerprint(&self.certificate).map_err(|e| BootstrapError::crypto(&self.paths.cert, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::MemoryLogger;
    use std::fs;
    use tempfile::TempDir;

    fn ca_paths(dir: &TempDir) -> CredentialPaths {
        CredentialPaths::in_dir(dir.path().join("certs/ca-bundle"), "ca-bundle.crt", "ca-bundle.key")
    }

    #[test]
    fn second_load_reuses_existing_material() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let paths = ca_paths(&temp_dir);
        let mut logger = MemoryLogger::new();

        let first = CertificateAuthority::load_or_create(&paths, &mut logger)?;
        let cert_bytes = fs::read(&paths.cert).unwrap();
        let second = CertificateAuthority::load_or_create(&paths, &mut logger)?;

        assert_eq!(first.fingerprint()?, second.fingerprint()?);
        assert_eq!(fs::read(&paths.cert).unwrap(), cert_bytes);
        assert!(logger.contains("Loaded existing root CA"));
        Ok(())
    }

    #[test]
    fn garbage_certificate_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ca_paths(&temp_dir);
        let mut logger = MemoryLogger::new();
        CertificateAuthority::load_or_create(&paths, &mut logger).unwrap();

        fs::write(&paths.cert, b"not a certificate").unwrap();
        let err = CertificateAuthority::load_or_create(&paths, &mut logger).unwrap_err();
        assert!(matches!(err, BootstrapError::MalformedCa { .. }));
    }

    #[test]
    fn certificate_without_key_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ca_paths(&temp_dir);
        let mut logger = MemoryLogger::new();
        CertificateAuthority::load_or_create(&paths, &mut logger).unwrap();

        fs::remove_file(&paths.key).unwrap();
        let err = CertificateAuthority::load_or_create(&paths, &mut logger).unwrap_err();
        assert!(matches!(err, BootstrapError::MalformedCa { .. }));
    }

    #[test]
    fn orphan_key_is_replaced() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let paths = ca_paths(&temp_dir);
        fs::create_dir_all(paths.key.parent().unwrap()).unwrap();
        fs::write(&paths.key, b"half-finished").unwrap();

        let mut logger = MemoryLogger::new();
        let ca = CertificateAuthority::load_or_create(&paths, &mut logger)?;

        assert!(paths.cert.exists());
        assert!(check_root_ca(&ca.certificate, &ca.private_key).is_ok());
        assert!(logger.contains("left without a certificate"));
        Ok(())
    }
}
