// src/cert/openssl.rs
//! Key generation and certificate signing through the openssl crate.
use super::types::{AltName, CertificateProfile, CertificateUsage};
use openssl::{
    asn1::{Asn1Integer, Asn1Time, Asn1TimeRef},
    bn::{BigNum, MsbOption},
    error::ErrorStack,
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, PKeyRef, Private},
    rsa::Rsa,
    x509::{
        extension::{
            AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage,
            SubjectAlternativeName, SubjectKeyIdentifier,
        },
        X509Builder, X509Name, X509NameBuilder, X509Ref, X509,
    },
};

pub fn generate_private_key(key_size: u32) -> Result<PKey<Private>, ErrorStack> {
    let rsa = Rsa::generate(key_size)?;
    PKey::from_rsa(rsa)
}

fn random_serial() -> Result<Asn1Integer, ErrorStack> {
    let mut serial = BigNum::new()?;
    serial.rand(127, MsbOption::MAYBE_ZERO, false)?;
    serial.to_asn1_integer()
}

fn build_name(common_name: &str, organizations: &[String]) -> Result<X509Name, ErrorStack> {
    let mut name = X509NameBuilder::new()?;
    for org in organizations {
        name.append_entry_by_nid(Nid::ORGANIZATIONNAME, org)?;
    }
    name.append_entry_by_nid(Nid::COMMONNAME, common_name)?;
    Ok(name.build())
}

pub fn build_ca_certificate(
    key: &PKeyRef<Private>,
    common_name: &str,
    organization: &str,
    validity_days: u32,
) -> Result<X509, ErrorStack> {
    let name = build_name(common_name, &[organization.to_string()])?;

    let mut builder = X509Builder::new()?;
    builder.set_version(2)?;
    let serial = random_serial()?;
    builder.set_serial_number(&serial)?;
    builder.set_subject_name(&name)?;
    builder.set_issuer_name(&name)?;
    builder.set_pubkey(key)?;
    builder.set_not_before(&*Asn1Time::days_from_now(0)?)?;
    builder.set_not_after(&*Asn1Time::days_from_now(validity_days)?)?;

    builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
    builder.append_extension(
        KeyUsage::new()
            .critical()
            .key_cert_sign()
            .crl_sign()
            .digital_signature()
            .build()?,
    )?;
    let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(None, None))?;
    builder.append_extension(ski)?;

    builder.sign(key, MessageDigest::sha256())?;
    Ok(builder.build())
}

/// Signs a leaf for `leaf_key` whose content is fully determined by `profile`.
pub fn sign_leaf_certificate(
    profile: &CertificateProfile,
    leaf_key: &PKeyRef<Private>,
    ca_cert: &X509Ref,
    ca_key: &PKeyRef<Private>,
) -> Result<X509, ErrorStack> {
    let not_before = Asn1Time::days_from_now(0)?;
    let not_after = Asn1Time::days_from_now(profile.validity_days)?;
    sign_leaf_between(profile, leaf_key, ca_cert, ca_key, &not_before, &not_after)
}

pub fn sign_leaf_between(
    profile: &CertificateProfile,
    leaf_key: &PKeyRef<Private>,
    ca_cert: &X509Ref,
    ca_key: &PKeyRef<Private>,
    not_before: &Asn1TimeRef,
    not_after: &Asn1TimeRef,
) -> Result<X509, ErrorStack> {
    // Subject O only carries meaning for client identities
    let organizations: &[String] = match profile.usage {
        CertificateUsage::ClientAuth => &profile.organizations,
        _ => &[],
    };
    let subject = build_name(&profile.common_name, organizations)?;

    let mut builder = X509Builder::new()?;
    builder.set_version(2)?;
    let serial = random_serial()?;
    builder.set_serial_number(&serial)?;
    builder.set_subject_name(&subject)?;
    builder.set_issuer_name(ca_cert.subject_name())?;
    builder.set_pubkey(leaf_key)?;
    builder.set_not_before(not_before)?;
    builder.set_not_after(not_after)?;

    builder.append_extension(BasicConstraints::new().critical().build()?)?;
    builder.append_extension(
        KeyUsage::new()
            .critical()
            .digital_signature()
            .key_encipherment()
            .build()?,
    )?;

    let mut eku = ExtendedKeyUsage::new();
    for purpose in profile.usage.extended_key_usage() {
        match *purpose {
            "serverAuth" => eku.server_auth(),
            _ => eku.client_auth(),
        };
    }
    builder.append_extension(eku.build()?)?;

    if !profile.alt_names.is_empty() {
        let san = {
            let mut san = SubjectAlternativeName::new();
            for name in &profile.alt_names {
                match name {
                    AltName::Dns(dns) => san.dns(dns),
                    AltName::Ip(ip) => san.ip(&ip.to_string()),
                };
            }
            let ctx = builder.x509v3_context(Some(ca_cert), None);
            san.build(&ctx)?
        };
        builder.append_extension(san)?;
    }

    let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(Some(ca_cert), None))?;
    builder.append_extension(ski)?;
    let aki = AuthorityKeyIdentifier::new()
        .keyid(false)
        .issuer(false)
        .build(&builder.x509v3_context(Some(ca_cert), None))?;
    builder.append_extension(aki)?;

    builder.sign(ca_key, MessageDigest::sha256())?;
    Ok(builder.build())
}

pub fn private_key_to_pem(key: &PKeyRef<Private>) -> Result<Vec<u8>, ErrorStack> {
    key.private_key_to_pem_pkcs8()
}

pub fn sha256_fingerprint(cert: &X509Ref) -> Result<String, ErrorStack> {
    let digest = cert.digest(MessageDigest::sha256())?;
    Ok(hex::encode(&*digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_is_signed_by_ca_key() -> Result<(), ErrorStack> {
        let ca_key = generate_private_key(2048)?;
        let ca = build_ca_certificate(&ca_key, "test-ca", "microshift", 30)?;

        let leaf_key = generate_private_key(2048)?;
        let profile = CertificateProfile::server("etcd-server")
            .with_alt_names([AltName::dns("localhost")]);
        let leaf = sign_leaf_certificate(&profile, &leaf_key, &ca, &ca_key)?;

        let ca_public = ca.public_key()?;
        assert!(leaf.verify(&ca_public)?);
        assert_eq!(leaf.issuer_name().to_der()?, ca.subject_name().to_der()?);
        Ok(())
    }

    #[test]
    fn ca_is_self_signed() -> Result<(), ErrorStack> {
        let key = generate_private_key(2048)?;
        let ca = build_ca_certificate(&key, "test-ca", "microshift", 30)?;
        assert!(ca.verify(&key)?);
        assert_eq!(sha256_fingerprint(&ca)?.len(), 64);
        Ok(())
    }
}
