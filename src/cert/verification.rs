// src/cert/verification.rs
use openssl::{
    pkey::{HasPublic, PKeyRef, Private},
    stack::Stack,
    x509::{
        store::X509StoreBuilder, verify::X509VerifyFlags, X509Ref, X509StoreContext,
        X509VerifyResult, X509,
    },
};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use x509_parser::prelude::{FromDer, GeneralName, ParsedExtension, X509Certificate};

/// Decoded view of a certificate, enough to check identity and SAN claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    pub common_name: Option<String>,
    pub organizations: Vec<String>,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub is_ca: bool,
}

pub fn summarize(cert: &X509Ref) -> Result<CertificateSummary, String> {
    let der = cert.to_der().map_err(|e| e.to_string())?;
    summarize_der(&der)
}

pub fn summarize_der(der: &[u8]) -> Result<CertificateSummary, String> {
    let (_remainder, cert) = X509Certificate::from_der(der).map_err(|e| e.to_string())?;

    let common_name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);
    let organizations = cert
        .subject()
        .iter_organization()
        .filter_map(|o| o.as_str().ok())
        .map(str::to_string)
        .collect();

    let mut dns_names = Vec::new();
    let mut ip_addresses = Vec::new();
    let mut is_ca = false;
    for ext in cert.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::BasicConstraints(bc) => is_ca = bc.ca,
            ParsedExtension::SubjectAlternativeName(san) => {
                for name in &san.general_names {
                    match name {
                        GeneralName::DNSName(dns) => dns_names.push(dns.to_string()),
                        GeneralName::IPAddress(bytes) => {
                            if let Some(ip) = ip_from_bytes(bytes) {
                                ip_addresses.push(ip);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    Ok(CertificateSummary {
        common_name,
        organizations,
        dns_names,
        ip_addresses,
        is_ca,
    })
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

/// Chain verification of `cert` against `ca` as sole trust anchor,
/// the in-process equivalent of `openssl verify -no_check_time -CAfile`.
/// Validity windows are ignored: trust is about the signature only.
pub fn verify_signed_by(cert: &X509Ref, ca: &X509Ref) -> Result<(), String> {
    let mut store = X509StoreBuilder::new().map_err(|e| e.to_string())?;
    store.add_cert(ca.to_owned()).map_err(|e| e.to_string())?;
    store
        .set_flags(X509VerifyFlags::NO_CHECK_TIME)
        .map_err(|e| e.to_string())?;
    let store = store.build();

    let chain = Stack::<X509>::new().map_err(|e| e.to_string())?;
    let mut ctx = X509StoreContext::new().map_err(|e| e.to_string())?;
    let (verified, result) = ctx
        .init(&store, cert, &chain, |c| {
            let verified = c.verify_cert()?;
            Ok((verified, c.error()))
        })
        .map_err(|e| e.to_string())?;

    if verified {
        Ok(())
    } else {
        Err(format!(
            "certificate chain verification failed: {}",
            result.error_string()
        ))
    }
}

pub fn key_matches<T: HasPublic>(cert: &X509Ref, key: &PKeyRef<T>) -> Result<(), String> {
    let public = cert.public_key().map_err(|e| e.to_string())?;
    if public.public_eq(key) {
        Ok(())
    } else {
        Err("private key does not match certificate".to_string())
    }
}

/// A usable root: self-issued, self-signed, marked CA, and paired with `key`.
pub fn check_root_ca(cert: &X509Ref, key: &PKeyRef<Private>) -> Result<(), String> {
    if cert.issued(cert) != X509VerifyResult::OK {
        return Err("certificate is not self-issued".to_string());
    }
    let public = cert.public_key().map_err(|e| e.to_string())?;
    match cert.verify(&public) {
        Ok(true) => {}
        _ => return Err("certificate is not self-signed".to_string()),
    }
    if !summarize(cert)?.is_ca {
        return Err("certificate is not marked as a CA".to_string());
    }
    key_matches(cert, key)
}
