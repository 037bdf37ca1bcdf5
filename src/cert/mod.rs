// src/cert/mod.rs
mod ca;
pub mod catalog;
pub mod issuer;
mod keypair;
mod openssl;
mod types;
pub mod verification;

pub use ca::{CertificateAuthority, ROOT_CA_COMMON_NAME, ROOT_CA_ORGANIZATION};
pub use catalog::{key_pair_catalog, leaf_catalog, KeyPairEntry, LeafEntry};
pub use issuer::load_or_create_leaf;
pub use keypair::load_or_create_key_pair;
pub(crate) use self::openssl::private_key_to_pem;
pub use types::{
    AltName, BareKeyPair, CertificateProfile, CertificateUsage, CredentialPaths, KeyPairPaths,
    LeafCredential, DEFAULT_CA_VALIDITY_DAYS, DEFAULT_KEY_SIZE, DEFAULT_LEAF_VALIDITY_DAYS,
};
