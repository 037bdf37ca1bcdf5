// src/lib.rs
//! Bootstraps the PKI of a single-node control plane: one root CA, the leaf
//! certificates and key pairs every component needs, and per-principal
//! kubeconfigs, all under one data directory.

pub mod bootstrap;
pub mod cert;
pub mod cli;
pub mod config;
pub mod error;
pub mod kubeconfig;
pub mod layout;
pub mod network;
pub mod utils;

pub use bootstrap::{bootstrap, BootstrapArtifacts, BootstrapOrchestrator, BootstrapStage};
pub use error::{BootstrapError, Result};
