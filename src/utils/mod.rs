// src/utils/mod.rs
pub mod fs;
pub mod logging;
