// src/cert/keypair.rs
use super::{
    openssl::{generate_private_key, private_key_to_pem},
    types::{BareKeyPair, KeyPairPaths, DEFAULT_KEY_SIZE},
};
use crate::error::{BootstrapError, Result};
use crate::utils::fs::{read_if_exists, StagedFile, PRIVATE_MODE, PUBLIC_MODE};
use crate::utils::logging::Logger;
use openssl::pkey::PKey;

/// Loads or creates a bare RSA key pair, such as the service-account token
/// signer. Private key is written first, public key second.
pub fn load_or_create_key_pair(paths: &KeyPairPaths, logger: &mut dyn Logger) -> Result<BareKeyPair> {
    let private_pem = read_if_exists(&paths.private)?;
    let public_pem = read_if_exists(&paths.public)?;

    match (private_pem, public_pem) {
        (Some(private_pem), Some(public_pem)) => {
            let private_key = PKey::private_key_from_pem(&private_pem)
                .map_err(|e| BootstrapError::malformed_key_pair(&paths.private, e.to_string()))?;
            let public_key = PKey::public_key_from_pem(&public_pem)
                .map_err(|e| BootstrapError::malformed_key_pair(&paths.public, e.to_string()))?;
            if !public_key.public_eq(&private_key) {
                return Err(BootstrapError::malformed_key_pair(
                    &paths.public,
                    "public key does not belong to the private key",
                ));
            }

            logger.log(&format!("Using existing key pair at {}", paths.private.display()));
            Ok(BareKeyPair {
                private_key,
                public_key,
                paths: paths.clone(),
            })
        }
        (None, Some(_)) => Err(BootstrapError::malformed_key_pair(
            &paths.private,
            "public key exists but the private key is missing",
        )),
        (orphan, None) => {
            if orphan.is_some() {
                logger.log(&format!(
                    "Replacing private key {} left without a public key",
                    paths.private.display()
                ));
            }
            create(paths, logger)
        }
    }
}

fn create(paths: &KeyPairPaths, logger: &mut dyn Logger) -> Result<BareKeyPair> {
    logger.log(&format!("Generating key pair {}", paths.private.display()));

    let private_key = generate_private_key(DEFAULT_KEY_SIZE)
        .map_err(|e| BootstrapError::crypto(&paths.private, e))?;
    let private_pem =
        private_key_to_pem(&private_key).map_err(|e| BootstrapError::crypto(&paths.private, e))?;
    let public_pem = private_key
        .public_key_to_pem()
        .map_err(|e| BootstrapError::crypto(&paths.public, e))?;
    let public_key = PKey::public_key_from_pem(&public_pem)
        .map_err(|e| BootstrapError::crypto(&paths.public, e))?;

    let staged_private = StagedFile::write(&paths.private, &private_pem, PRIVATE_MODE)?;
    let staged_public = StagedFile::write(&paths.public, &public_pem, PUBLIC_MODE)?;
    staged_private.commit()?;
    staged_public.commit()?;

    logger.log("Key pair generated successfully");
    Ok(BareKeyPair {
        private_key,
        public_key,
        paths: paths.clone(),
    })
}
