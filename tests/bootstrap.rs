use cluster_pki_init::cert::verification::{summarize, verify_signed_by};
use cluster_pki_init::config::NodeIdentity;
use cluster_pki_init::layout::DataLayout;
use cluster_pki_init::network::derive_api_server_service_ip;
use cluster_pki_init::utils::fs::{StagedFile, PUBLIC_MODE};
use cluster_pki_init::utils::logging::MemoryLogger;
use cluster_pki_init::{bootstrap, BootstrapError};
use std::collections::BTreeMap;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

fn identity(root: &Path) -> NodeIdentity {
    NodeIdentity::new("edge-1", "192.168.1.10".parse().unwrap(), root)
}

fn snapshot(root: &Path) -> BTreeMap<PathBuf, (Vec<u8>, SystemTime)> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let modified = fs::metadata(&path).unwrap().modified().unwrap();
                files.insert(path.clone(), (fs::read(&path).unwrap(), modified));
            }
        }
    }
    files
}

#[test]
fn second_run_performs_no_writes() {
    let temp_dir = TempDir::new().unwrap();
    let identity = identity(temp_dir.path());

    let mut first_logger = MemoryLogger::new();
    bootstrap(&identity, &mut first_logger).unwrap();
    let before = snapshot(temp_dir.path());
    assert!(first_logger.contains("Generating certificate for kube-apiserver"));

    let mut second_logger = MemoryLogger::new();
    bootstrap(&identity, &mut second_logger).unwrap();
    let after = snapshot(temp_dir.path());

    assert_eq!(before, after);
    assert!(!second_logger.contains("Generating"));
    assert!(second_logger.contains("Using existing"));
}

#[test]
fn every_issued_credential_chains_to_the_ca() {
    let temp_dir = TempDir::new().unwrap();
    let mut logger = MemoryLogger::new();
    let artifacts = bootstrap(&identity(temp_dir.path()), &mut logger).unwrap();

    for (name, leaf) in &artifacts.leaves {
        verify_signed_by(&leaf.certificate, &artifacts.ca.certificate)
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        assert!(!summarize(&leaf.certificate).unwrap().is_ca, "{name} must not be a CA");
    }
    for (name, kubeconfig) in &artifacts.kubeconfigs {
        verify_signed_by(&kubeconfig.client_certificate, &artifacts.ca.certificate)
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(kubeconfig.ca_bundle, artifacts.ca.bundle_pem().unwrap());
    }
    assert_eq!(artifacts.leaves.len(), 9);
    assert_eq!(artifacts.key_pairs.len(), 2);
    assert_eq!(artifacts.kubeconfigs.len(), 5);
}

#[test]
fn api_server_certificate_covers_node_and_service_addresses() {
    let temp_dir = TempDir::new().unwrap();
    let mut logger = MemoryLogger::new();
    let identity = identity(temp_dir.path());
    let artifacts = bootstrap(&identity, &mut logger).unwrap();

    let on_disk = fs::read(DataLayout::new(temp_dir.path()).api_server_serving().cert).unwrap();
    let certificate = openssl::x509::X509::from_pem(&on_disk).unwrap();
    let summary = summarize(&certificate).unwrap();

    let service_ip = derive_api_server_service_ip(&identity.service_cidr).unwrap();
    assert_eq!(service_ip, artifacts.service_ip);
    for ip in ["192.168.1.10", "127.0.0.1"] {
        assert!(summary.ip_addresses.contains(&ip.parse::<IpAddr>().unwrap()), "missing {ip}");
    }
    assert!(summary.ip_addresses.contains(&service_ip));
    for dns in ["edge-1", "localhost", "kubernetes.default.svc"] {
        assert!(summary.dns_names.iter().any(|n| n == dns), "missing {dns}");
    }
}

#[test]
fn admin_kubeconfig_round_trips_identity() {
    let temp_dir = TempDir::new().unwrap();
    let mut logger = MemoryLogger::new();
    let identity = identity(temp_dir.path());
    bootstrap(&identity, &mut logger).unwrap();

    let artifacts = bootstrap(&identity, &mut logger).unwrap();
    let admin = artifacts.kubeconfig("kubeadmin").unwrap();
    let (username, groups) = admin.client_identity().unwrap();
    assert_eq!(username, "system:admin");
    assert_eq!(groups, vec!["system:masters".to_string()]);
    assert_eq!(admin.cluster_url, "https://127.0.0.1:6443");

    let kubelet = artifacts.kubeconfig("kubelet").unwrap();
    assert_eq!(
        kubelet.client_identity().unwrap(),
        ("system:node:edge-1".to_string(), vec!["system:nodes".to_string()])
    );
}

#[test]
fn replaced_ca_is_detected() {
    let original = TempDir::new().unwrap();
    let unrelated = TempDir::new().unwrap();
    let mut logger = MemoryLogger::new();
    bootstrap(&identity(original.path()), &mut logger).unwrap();
    bootstrap(&identity(unrelated.path()), &mut logger).unwrap();

    let original_ca = DataLayout::new(original.path()).ca();
    let unrelated_ca = DataLayout::new(unrelated.path()).ca();
    fs::copy(&unrelated_ca.cert, &original_ca.cert).unwrap();
    fs::copy(&unrelated_ca.key, &original_ca.key).unwrap();

    let err = bootstrap(&identity(original.path()), &mut logger).unwrap_err();
    assert!(
        matches!(err, BootstrapError::UntrustedExistingCert { .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn swapped_ca_certificate_without_its_key_is_malformed() {
    let original = TempDir::new().unwrap();
    let unrelated = TempDir::new().unwrap();
    let mut logger = MemoryLogger::new();
    bootstrap(&identity(original.path()), &mut logger).unwrap();
    bootstrap(&identity(unrelated.path()), &mut logger).unwrap();

    let original_ca = DataLayout::new(original.path()).ca();
    fs::copy(DataLayout::new(unrelated.path()).ca().cert, &original_ca.cert).unwrap();
    let before = snapshot(original.path());

    let err = bootstrap(&identity(original.path()), &mut logger).unwrap_err();
    match &err {
        BootstrapError::MalformedCa { path, .. } => assert_eq!(path, &original_ca.cert),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(snapshot(original.path()), before);
}

#[test]
fn crash_before_rename_leaves_no_final_file() {
    let temp_dir = TempDir::new().unwrap();
    let ca_cert = DataLayout::new(temp_dir.path()).ca().cert;

    let staged = StagedFile::write(&ca_cert, b"-----BEGIN CERT", PUBLIC_MODE).unwrap();
    let temp_path = staged.temp_path().to_path_buf();
    std::mem::forget(staged);

    assert!(temp_path.exists());
    assert!(!ca_cert.exists());

    let mut logger = MemoryLogger::new();
    let artifacts = bootstrap(&identity(temp_dir.path()), &mut logger).unwrap();
    assert!(ca_cert.exists());
    assert_eq!(fs::read(&ca_cert).unwrap(), artifacts.ca.bundle_pem().unwrap());
}

#[test]
fn orphaned_leaf_key_is_reissued_but_orphaned_cert_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let layout = DataLayout::new(temp_dir.path());
    let identity = identity(temp_dir.path());
    let mut logger = MemoryLogger::new();
    bootstrap(&identity, &mut logger).unwrap();

    let etcd = layout.etcd_serving();
    fs::remove_file(&etcd.cert).unwrap();
    let mut logger = MemoryLogger::new();
    bootstrap(&identity, &mut logger).unwrap();
    assert!(etcd.cert.exists());
    assert!(logger.contains("left without a certificate"));

    fs::remove_file(&etcd.key).unwrap();
    let err = bootstrap(&identity, &mut logger).unwrap_err();
    assert!(matches!(err, BootstrapError::UntrustedExistingCert { .. }));
}

#[test]
fn malformed_service_cidr_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let mut logger = MemoryLogger::new();
    let identity = identity(temp_dir.path()).with_service_cidr("not-a-cidr");

    let err = bootstrap(&identity, &mut logger).unwrap_err();
    assert!(matches!(err, BootstrapError::InvalidCidr { .. }));
}
