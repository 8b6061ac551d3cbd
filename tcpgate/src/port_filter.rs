use aya::maps::{Array, MapError, PerCpuArray};
use aya::programs::xdp::XdpLinkId;
use aya::programs::{Xdp, XdpFlags};
use aya::Ebpf;
use tcpgate_common::{names, total_drops};
use tracing::{info, warn};

use crate::bpf;
use crate::config::XdpMode;
use crate::error::{FilterError, Result};
use crate::interface::if_index;

impl XdpMode {
    pub fn flags(self) -> XdpFlags {
        match self {
            XdpMode::Skb => XdpFlags::SKB_MODE,
            XdpMode::Driver => XdpFlags::DRV_MODE,
            XdpMode::Hardware => XdpFlags::HW_MODE,
        }
    }
}

/// XDP filter that drops TCP packets to one destination port.
///
/// Lifecycle: [`load`](Self::load) → [`configure`](Self::configure) →
/// [`attach`](Self::attach) → [`drop_count`](Self::drop_count)… →
/// [`detach`](Self::detach). Dropping the filter detaches it, so the hook is
/// released on every exit path.
pub struct PortFilter {
    /// Loaded eBPF object, keeps the maps alive while the filter exists
    ebpf: Ebpf,
    interface: String,
    port: Option<u16>,
    link: Option<XdpLinkId>,
}

impl PortFilter {
    /// Load the BPF object for `interface`. Nothing is attached yet.
    pub fn load(interface: &str) -> Result<Self> {
        bpf::check_privileges()?;
        if_index(interface)?;
        bpf::bump_memlock_rlimit();

        let ebpf = Ebpf::load(bpf::object())?;

        Ok(Self { ebpf, interface: interface.to_string(), port: None, link: None })
    }

    /// Store the blocked port. Only allowed before [`attach`](Self::attach),
    /// so the packet path never sees the value change.
    pub fn configure(&mut self, port: u16) -> Result<()> {
        if self.link.is_some() {
            return Err(FilterError::AlreadyAttached);
        }

        let mut ports: Array<_, u16> = Array::try_from(
            self.ebpf
                .map_mut(names::BLOCKED_PORT)
                .ok_or(FilterError::MapNotFound(names::BLOCKED_PORT))?,
        )?;
        ports.set(0, port, 0)?;

        self.port = Some(port);
        info!(port, "blocked port configured");
        Ok(())
    }

    /// Load the XDP program into the kernel and attach it to the interface.
    /// Calling it again while attached is a no-op.
    pub fn attach(&mut self, mode: XdpMode) -> Result<()> {
        if self.link.is_some() {
            return Ok(());
        }
        let Some(port) = self.port else {
            return Err(FilterError::Config("port must be configured before attach".into()));
        };

        let program: &mut Xdp = self
            .ebpf
            .program_mut(names::PORT_PROGRAM)
            .ok_or(FilterError::ProgramNotFound(names::PORT_PROGRAM))?
            .try_into()
            .map_err(FilterError::ProgramType)?;

        if program.fd().is_err() {
            program.load().map_err(FilterError::ProgramLoad)?;
        }
        let link = program
            .attach(&self.interface, mode.flags())
            .map_err(FilterError::Attach)?;
        self.link = Some(link);

        info!(interface = %self.interface, port, ?mode, "XDP port filter attached");
        Ok(())
    }

    /// Number of packets dropped since attach, summed over every CPU.
    /// Reads a snapshot, never blocks.
    pub fn drop_count(&self) -> Result<u64> {
        let drops: PerCpuArray<_, u64> = PerCpuArray::try_from(
            self.ebpf
                .map(names::DROPS)
                .ok_or(FilterError::MapNotFound(names::DROPS))?,
        )?;

        match drops.get(&0, 0) {
            Ok(per_cpu) => Ok(total_drops(per_cpu.iter().copied())),
            Err(MapError::KeyNotFound) => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    /// Detach from the interface. Safe to call more than once.
    pub fn detach(&mut self) -> Result<()> {
        let Some(link) = self.link.take() else {
            return Ok(());
        };

        let program: &mut Xdp = self
            .ebpf
            .program_mut(names::PORT_PROGRAM)
            .ok_or(FilterError::ProgramNotFound(names::PORT_PROGRAM))?
            .try_into()
            .map_err(FilterError::ProgramType)?;
        program.detach(link).map_err(FilterError::Detach)?;

        info!(interface = %self.interface, "XDP port filter detached");
        Ok(())
    }

}

impl Drop for PortFilter {
    fn drop(&mut self) {
        if let Err(err) = self.detach() {
            warn!(%err, interface = %self.interface, "failed to detach XDP program on drop");
        }
    }
}
