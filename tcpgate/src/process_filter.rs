use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use aya::maps::{HashMap, MapData};
use aya::programs::socket_filter::SocketFilterLinkId;
use aya::programs::SocketFilter;
use aya::{Ebpf, EbpfLoader};
use tcpgate_common::{names, ProcessEntry};
use tracing::{info, warn};

use crate::bpf;
use crate::error::{FilterError, Result};
use crate::interface::if_index;

/// Socket filter that restricts the traffic of tracked pids to one port.
///
/// The target port is baked into the program at load time. The pid table is
/// exposed through [`table_mut`](Self::table_mut) for the reconciliation loop,
/// its only writer. Dropping the filter detaches it and closes the socket.
pub struct ProcessFilter {
    ebpf: Ebpf,
    table: HashMap<MapData, u32, ProcessEntry>,
    socket: OwnedFd,
    link: Option<SocketFilterLinkId>,
    interface: String,
}

impl ProcessFilter {
    pub fn attach(interface: &str, target_port: u16) -> Result<Self> {
        bpf::check_privileges()?;
        let ifindex = if_index(interface)?;
        bpf::bump_memlock_rlimit();

        let mut ebpf = EbpfLoader::new()
            .set_global(names::TARGET_PORT, &target_port, true)
            .load(bpf::object())?;

        let table = HashMap::try_from(
            ebpf.take_map(names::TRACKED_PIDS)
                .ok_or(FilterError::MapNotFound(names::TRACKED_PIDS))?,
        )?;

        let socket = open_packet_socket(interface, ifindex)?;

        let program: &mut SocketFilter = ebpf
            .program_mut(names::PROC_PROGRAM)
            .ok_or(FilterError::ProgramNotFound(names::PROC_PROGRAM))?
            .try_into()
            .map_err(FilterError::ProgramType)?;
        program.load().map_err(FilterError::ProgramLoad)?;
        let link = program.attach(&socket).map_err(FilterError::Attach)?;

        info!(interface, target_port, "process socket filter attached");

        Ok(Self {
            ebpf,
            table,
            socket,
            link: Some(link),
            interface: interface.to_string(),
        })
    }

    /// The `TRACKED_PIDS` map read by the packet path.
    pub fn table_mut(&mut self) -> &mut HashMap<MapData, u32, ProcessEntry> {
        &mut self.table
    }

    /// Detach the program from the socket. Safe to call more than once.
    pub fn detach(&mut self) -> Result<()> {
        let Some(link) = self.link.take() else {
            return Ok(());
        };

        let program: &mut SocketFilter = self
            .ebpf
            .program_mut(names::PROC_PROGRAM)
            .ok_or(FilterError::ProgramNotFound(names::PROC_PROGRAM))?
            .try_into()
            .map_err(FilterError::ProgramType)?;
        program.detach(link).map_err(FilterError::Detach)?;

        info!(interface = %self.interface, fd = self.socket.as_raw_fd(), "process socket filter detached");
        Ok(())
    }
}

impl Drop for ProcessFilter {
    fn drop(&mut self) {
        if let Err(err) = self.detach() {
            warn!(%err, interface = %self.interface, "failed to detach socket filter on drop");
        }
    }
}

/// Open a cooked (`SOCK_DGRAM`) IPv4 packet socket bound to `ifindex`.
///
/// The link-layer header is stripped on this socket type, so the filter sees
/// the IPv4 header at offset 0.
#[allow(unsafe_code)]
fn open_packet_socket(interface: &str, ifindex: u32) -> Result<OwnedFd> {
    let socket_err = |source: io::Error| FilterError::Socket { interface: interface.to_string(), source };

    let protocol = (libc::ETH_P_IP as u16).to_be();
    // SAFETY: plain syscall; the returned descriptor is checked before use.
    let fd = unsafe {
        libc::socket(libc::AF_PACKET, libc::SOCK_DGRAM | libc::SOCK_CLOEXEC, i32::from(protocol))
    };
    if fd < 0 {
        return Err(socket_err(io::Error::last_os_error()));
    }
    // SAFETY: `fd` is a freshly created descriptor owned by nothing else.
    let socket = unsafe { OwnedFd::from_raw_fd(fd) };

    let ifindex = i32::try_from(ifindex).map_err(|e| socket_err(io::Error::other(e)))?;
    // SAFETY: sockaddr_ll is plain old data; all-zero is a valid value.
    let mut addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
    addr.sll_family = libc::AF_PACKET as u16;
    addr.sll_protocol = protocol;
    addr.sll_ifindex = ifindex;

    // SAFETY: `addr` is a valid sockaddr_ll and the length matches its size.
    let ret = unsafe {
        libc::bind(
            socket.as_raw_fd(),
            (&addr as *const libc::sockaddr_ll).cast::<libc::sockaddr>(),
            mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
        )
    };
    if ret != 0 {
        return Err(socket_err(io::Error::last_os_error()));
    }

    Ok(socket)
}
