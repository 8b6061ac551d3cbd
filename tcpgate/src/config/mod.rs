mod loader;
mod types;

pub use loader::{load_from_path, validate_port_filter, validate_process_filter};
pub use types::{PortFilterConfig, ProcessFilterConfig, XdpMode};
