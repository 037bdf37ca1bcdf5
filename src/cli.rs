// src/cli.rs
use crate::config::{ClusterConfig, ConfigOverrides};
use crate::error::{BootstrapError, Result};
use crate::layout::DataLayout;
use crate::utils::logging::{ConsoleLogger, FileLogger, Logger, MultiLogger};
use crate::BootstrapOrchestrator;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Create or reuse the control-plane PKI in the data directory")]
pub struct Args {
    /// Config file; defaults to ~/.microshift/config.yaml or /etc/microshift/config.yaml
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    #[arg(long)]
    pub node_name: Option<String>,
    #[arg(long)]
    pub node_ip: Option<String>,
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    /// Print the artifact report as JSON instead of plain lines
    #[arg(long)]
    pub json: bool,
    #[arg(short, long)]
    pub debug: bool,
}

impl Args {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            data_dir: self.data_dir.clone(),
            node_name: self.node_name.clone(),
            node_ip: self.node_ip.clone(),
        }
    }
}

pub fn build_logger(args: &Args) -> std::io::Result<MultiLogger> {
    let mut logger = MultiLogger::new().with(Box::new(ConsoleLogger::new(args.debug)));
    if let Some(path) = &args.log_file {
        logger = logger.with(Box::new(FileLogger::new(path, args.debug)?));
    }
    Ok(logger)
}

fn write_failed(e: std::io::Error) -> BootstrapError {
    BootstrapError::Config(format!("writing report: {}", e))
}

/// Loads configuration, bootstraps, and writes the report to `out`.
pub fn run(args: &Args, logger: &mut dyn Logger, out: &mut dyn Write) -> Result<()> {
    let config = ClusterConfig::load(args.config.as_deref(), &args.overrides())?;
    logger.debug_log(&format!("Loaded configuration: {:?}", config));
    let identity = config.node_identity()?;
    let layout = DataLayout::new(&identity.data_dir);

    let artifacts = BootstrapOrchestrator::new(identity, logger).run()?;
    let report = artifacts.report(&layout)?;

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| BootstrapError::Config(format!("encoding report: {}", e)))?;
        writeln!(out, "{}", json).map_err(write_failed)?;
        return Ok(());
    }

    let mut lines = vec![
        format!("CA fingerprint (SHA-256): {}", report.ca_fingerprint),
        format!("API server service IP: {}", report.service_ip),
    ];
    for artifact in &report.artifacts {
        for path in &artifact.paths {
            lines.push(format!("{:<40} {}", artifact.name, path.display()));
        }
    }
    for line in lines {
        writeln!(out, "{}", line).map_err(write_failed)?;
    }
    Ok(())
}
