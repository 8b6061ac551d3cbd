use std::fs;
use std::path::Path;

use tcpgate_common::COMM_LEN;
use tracing::warn;

use crate::config::{PortFilterConfig, ProcessFilterConfig};
use crate::error::{FilterError, Result};

/// Load a process filter configuration from a TOML file. Missing keys take their defaults.
pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<ProcessFilterConfig> {
    let txt = fs::read_to_string(p)
        .map_err(|e| FilterError::Config(format!("Failed to read config file: {e}")))?;
    let cfg: ProcessFilterConfig = toml::from_str(&txt)
        .map_err(|e| FilterError::Config(format!("Failed to parse config: {e}")))?;

    validate_process_filter(&cfg)?;

    Ok(cfg)
}

pub fn validate_port_filter(cfg: &PortFilterConfig) -> Result<()> {
    if cfg.interface.trim().is_empty() {
        return Err(FilterError::Config("interface cannot be empty".into()));
    }
    if cfg.port == 0 {
        return Err(FilterError::Config("port must be > 0".into()));
    }
    if cfg.report_interval_secs == 0 {
        return Err(FilterError::Config("report_interval_secs must be > 0".into()));
    }
    Ok(())
}

pub fn validate_process_filter(cfg: &ProcessFilterConfig) -> Result<()> {
    if let Some(interface) = &cfg.interface {
        if interface.trim().is_empty() {
            return Err(FilterError::Config("interface cannot be empty".into()));
        }
    }
    if cfg.target_name.is_empty() {
        return Err(FilterError::Config("target_name cannot be empty".into()));
    }
    if cfg.target_port == 0 {
        return Err(FilterError::Config("target_port must be > 0".into()));
    }
    if cfg.reconcile_interval_ms == 0 {
        return Err(FilterError::Config("reconcile_interval_ms must be > 0".into()));
    }
    if cfg.target_name.len() >= COMM_LEN {
        warn!(
            target_name = %cfg.target_name,
            "target_name is longer than 15 bytes; only the first 15 are matched"
        );
    }
    Ok(())
}
