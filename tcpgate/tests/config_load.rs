use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tcpgate::config::{validate_port_filter, validate_process_filter};
use tcpgate::{load_from_path, FilterError, PortFilterConfig, ProcessFilterConfig, XdpMode};
use tempfile::NamedTempFile;

type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

fn write_config(toml: &str) -> Result<NamedTempFile, std::io::Error> {
    let mut file = NamedTempFile::new()?;
    file.write_all(toml.as_bytes())?;
    Ok(file)
}

#[test]
fn empty_file_takes_defaults() -> TestResult {
    let file = write_config("")?;
    let cfg = load_from_path(file.path())?;

    assert_eq!(cfg.interface, None);
    assert_eq!(cfg.target_name, "myprocess");
    assert_eq!(cfg.target_port, 4040);
    assert_eq!(cfg.reconcile_interval(), Duration::from_secs(2));
    assert_eq!(cfg.proc_root, PathBuf::from("/proc"));
    Ok(())
}

#[test]
fn loads_full_process_config() -> TestResult {
    let file = write_config(
        r#"
interface = "eth1"
target_name = "nginx"
target_port = 8080
reconcile_interval_ms = 500
proc_root = "/host/proc"
"#,
    )?;
    let cfg = load_from_path(file.path())?;

    assert_eq!(cfg.interface.as_deref(), Some("eth1"));
    assert_eq!(cfg.target_name, "nginx");
    assert_eq!(cfg.target_port, 8080);
    assert_eq!(cfg.reconcile_interval(), Duration::from_millis(500));
    assert_eq!(cfg.proc_root, PathBuf::from("/host/proc"));
    Ok(())
}

#[test]
fn rejects_zero_target_port() -> TestResult {
    let file = write_config("target_port = 0\n")?;
    assert!(matches!(load_from_path(file.path()), Err(FilterError::Config(_))));
    Ok(())
}

#[test]
fn rejects_out_of_range_port() -> TestResult {
    let file = write_config("target_port = 70000\n")?;
    assert!(matches!(load_from_path(file.path()), Err(FilterError::Config(_))));
    Ok(())
}

#[test]
fn rejects_empty_target_name() -> TestResult {
    let file = write_config("target_name = \"\"\n")?;
    assert!(matches!(load_from_path(file.path()), Err(FilterError::Config(_))));
    Ok(())
}

#[test]
fn rejects_malformed_toml() -> TestResult {
    let file = write_config("target_port = \n")?;
    assert!(matches!(load_from_path(file.path()), Err(FilterError::Config(_))));
    Ok(())
}

#[test]
fn missing_file_is_a_config_error() {
    let result = load_from_path("/nonexistent/tcpgate.toml");
    assert!(matches!(result, Err(FilterError::Config(_))));
}

#[test]
fn long_target_name_is_accepted() {
    let cfg = ProcessFilterConfig {
        target_name: "a-name-longer-than-fifteen-bytes".to_string(),
        ..Default::default()
    };
    assert!(validate_process_filter(&cfg).is_ok());
}

#[test]
fn port_config_defaults() {
    let cfg = PortFilterConfig::new("eth0");
    assert_eq!(cfg.port, 4040);
    assert_eq!(cfg.mode, XdpMode::Skb);
    assert_eq!(cfg.report_interval(), Duration::from_secs(2));
    assert!(validate_port_filter(&cfg).is_ok());
}

#[test]
fn port_config_rejects_zero_interval() {
    let mut cfg = PortFilterConfig::new("eth0");
    cfg.report_interval_secs = 0;
    assert!(matches!(validate_port_filter(&cfg), Err(FilterError::Config(_))));
}
