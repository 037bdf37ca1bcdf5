// src/config/mod.rs
mod identity;
mod types;

pub use identity::NodeIdentity;
pub use types::{
    find_config_file, find_data_dir, ClusterConfig, ConfigOverrides, NetworkConfig,
    DEFAULT_API_SERVER_PORT, DEFAULT_GLOBAL_DATA_DIR,
};
