//! Network interface lookup and default-route discovery.

use std::ffi::CString;
use std::fs;

use tracing::debug;

use crate::error::{FilterError, Result};

/// Interface used when no default IPv4 route exists.
pub const FALLBACK_INTERFACE: &str = "lo";

const ROUTE_TABLE: &str = "/proc/net/route";
const RTF_UP: u32 = 0x0001;
const RTF_GATEWAY: u32 = 0x0002;

/// Resolve an interface name to its index.
#[allow(unsafe_code)]
pub fn if_index(name: &str) -> Result<u32> {
    let c_name = CString::new(name).map_err(|_| FilterError::InterfaceNotFound(name.to_string()))?;
    // SAFETY: `c_name` is a valid NUL-terminated string for the duration of the call.
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(FilterError::InterfaceNotFound(name.to_string()));
    }
    Ok(index)
}

/// Interface carrying the default IPv4 route, or [`FALLBACK_INTERFACE`].
pub fn default_interface() -> String {
    match fs::read_to_string(ROUTE_TABLE) {
        Ok(table) => default_route_interface(&table).unwrap_or_else(|| {
            debug!("no default IPv4 route, falling back to {FALLBACK_INTERFACE}");
            FALLBACK_INTERFACE.to_string()
        }),
        Err(err) => {
            debug!(%err, "cannot read {ROUTE_TABLE}, falling back to {FALLBACK_INTERFACE}");
            FALLBACK_INTERFACE.to_string()
        }
    }
}

/// Parse the contents of `/proc/net/route` and return the interface of the
/// first route that is up, has a gateway and a 0.0.0.0/0 destination.
///
/// Each line after the header has the format:
///   Iface Destination Gateway Flags RefCnt Use Metric Mask MTU Window IRTT
/// with addresses and flags in hex.
pub fn default_route_interface(table: &str) -> Option<String> {
    table.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 8 {
            return None;
        }
        let destination = u32::from_str_radix(fields[1], 16).ok()?;
        let flags = u32::from_str_radix(fields[3], 16).ok()?;
        let mask = u32::from_str_radix(fields[7], 16).ok()?;

        let is_default = destination == 0 && mask == 0;
        let usable = flags & RTF_UP != 0 && flags & RTF_GATEWAY != 0;
        (is_default && usable).then(|| fields[0].to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT";

    #[test]
    fn test_default_route_found() {
        let table = format!(
            "{HEADER}\n\
             docker0\t000011AC\t00000000\t0001\t0\t0\t0\t0000FFFF\t0\t0\t0\n\
             eth0\t00000000\t0101A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0\n\
             eth0\t0001A8C0\t00000000\t0001\t0\t0\t100\t00FFFFFF\t0\t0\t0\n"
        );
        assert_eq!(default_route_interface(&table).as_deref(), Some("eth0"));
    }

    #[test]
    fn test_first_default_route_wins() {
        let table = format!(
            "{HEADER}\n\
             wlan0\t00000000\t0101A8C0\t0003\t0\t0\t600\t00000000\t0\t0\t0\n\
             eth1\t00000000\t0102A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0\n"
        );
        assert_eq!(default_route_interface(&table).as_deref(), Some("wlan0"));
    }

    #[test]
    fn test_down_route_ignored() {
        let table = format!(
            "{HEADER}\n\
             eth0\t00000000\t0101A8C0\t0002\t0\t0\t100\t00000000\t0\t0\t0\n"
        );
        assert_eq!(default_route_interface(&table), None);
    }

    #[test]
    fn test_no_default_route() {
        let table = format!(
            "{HEADER}\n\
             eth0\t0001A8C0\t00000000\t0001\t0\t0\t100\t00FFFFFF\t0\t0\t0\n"
        );
        assert_eq!(default_route_interface(&table), None);
    }

    #[test]
    fn test_garbage_lines_ignored() {
        let table = format!("{HEADER}\nnot a route\neth0\tzz\t00\t0003\n");
        assert_eq!(default_route_interface(&table), None);
        assert_eq!(default_route_interface(""), None);
    }

    #[test]
    fn test_unknown_interface_rejected() {
        let result = if_index("tcpgate-does-not-exist0");
        assert!(matches!(result, Err(FilterError::InterfaceNotFound(name)) if name == "tcpgate-does-not-exist0"));
    }

    #[test]
    fn test_interface_name_with_nul_rejected() {
        assert!(matches!(if_index("eth\0"), Err(FilterError::InterfaceNotFound(_))));
    }
}
