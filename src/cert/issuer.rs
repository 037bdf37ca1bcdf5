// src/cert/issuer.rs
use super::{
    ca::CertificateAuthority,
    openssl::{generate_private_key, private_key_to_pem, sign_leaf_certificate},
    types::{CertificateProfile, CredentialPaths, LeafCredential},
    verification::{key_matches, verify_signed_by},
};
use crate::error::{BootstrapError, Result};
use crate::utils::fs::{read_if_exists, StagedFile, PRIVATE_MODE, PUBLIC_MODE};
use crate::utils::logging::Logger;
use openssl::error::ErrorStack;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;

/// Generates a fresh key and signs a certificate for `profile` without
/// touching the filesystem.
pub fn issue(
    ca: &CertificateAuthority,
    profile: &CertificateProfile,
) -> std::result::Result<(X509, PKey<Private>), ErrorStack> {
    let key = generate_private_key(profile.key_size)?;
    let cert = sign_leaf_certificate(profile, &key, &ca.certificate, &ca.private_key)?;
    Ok((cert, key))
}

/// Loads the leaf at `paths` or issues and persists a new one.
///
/// Existing material is only checked for its chain to `ca` and for a matching
/// key. Its content is not compared against `profile`; reissuing trusted
/// certificates in place is left to an explicit rotation.
pub fn load_or_create_leaf(
    ca: &CertificateAuthority,
    profile: &CertificateProfile,
    paths: &CredentialPaths,
    logger: &mut dyn Logger,
) -> Result<LeafCredential> {
    let cert_pem = read_if_exists(&paths.cert)?;
    let key_pem = read_if_exists(&paths.key)?;

    match (cert_pem, key_pem) {
        (Some(cert_pem), Some(key_pem)) => {
            let leaf = load_existing(ca, paths, &cert_pem, &key_pem)?;
            logger.log(&format!(
                "Using existing certificate for {} at {}",
                profile.common_name,
                paths.cert.display()
            ));
            Ok(leaf)
        }
        (Some(_), None) => Err(BootstrapError::untrusted(
            &paths.key,
            "certificate exists but its private key is missing",
        )),
        (None, orphan_key) => {
            if orphan_key.is_some() {
                logger.log(&format!(
                    "Replacing key {} left without a certificate",
                    paths.key.display()
                ));
            }
            create(ca, profile, paths, logger)
        }
    }
}

fn load_existing(
    ca: &CertificateAuthority,
    paths: &CredentialPaths,
    cert_pem: &[u8],
    key_pem: &[u8],
) -> Result<LeafCredential> {
    let certificate = X509::from_pem(cert_pem)
        .map_err(|e| BootstrapError::untrusted(&paths.cert, format!("unreadable certificate: {}", e)))?;
    let private_key = PKey::private_key_from_pem(key_pem)
        .map_err(|e| BootstrapError::untrusted(&paths.key, format!("unreadable private key: {}", e)))?;

    verify_signed_by(&certificate, &ca.certificate)
        .map_err(|reason| BootstrapError::untrusted(&paths.cert, reason))?;
    key_matches(&certificate, &private_key)
        .map_err(|reason| BootstrapError::untrusted(&paths.key, reason))?;

    Ok(LeafCredential {
        certificate,
        private_key,
        paths: paths.clone(),
    })
}

fn create(
    ca: &CertificateAuthority,
    profile: &CertificateProfile,
    paths: &CredentialPaths,
    logger: &mut dyn Logger,
) -> Result<LeafCredential> {
    logger.log(&format!("Generating certificate for {}", profile.common_name));
    logger.debug_log(&format!(
        "usage {:?}, organizations {:?}, alt names [{}]",
        profile.usage,
        profile.organizations,
        profile
            .alt_names
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    ));

    let (certificate, private_key) =
        issue(ca, profile).map_err(|e| BootstrapError::crypto(&paths.cert, e))?;

    let key_pem =
        private_key_to_pem(&private_key).map_err(|e| BootstrapError::crypto(&paths.key, e))?;
    let cert_pem = certificate
        .to_pem()
        .map_err(|e| BootstrapError::crypto(&paths.cert, e))?;

    let staged_key = StagedFile::write(&paths.key, &key_pem, PRIVATE_MODE)?;
    let staged_cert = StagedFile::write(&paths.cert, &cert_pem, PUBLIC_MODE)?;
    staged_key.commit()?;
    staged_cert.commit()?;

    logger.debug_log(&format!("Successfully signed certificate: {}", paths.cert.display()));

    Ok(LeafCredential {
        certificate,
        private_key,
        paths: paths.clone(),
    })
}
