//! Bounds-checked Ethernet / IPv4 / TCP header parsing.
//!
//! Every read goes through [`Packet::read`], which refuses any access where
//! `offset + size` runs past the end of the packet. Callers turn every
//! [`ParseError`] into a pass verdict.

// ── Network protocol constants (host byte order) ────────────────────────────

pub const ETH_HDR_LEN: usize = 14;
pub const IPV4_MIN_HDR_LEN: usize = 20;
pub const TCP_MIN_HDR_LEN: usize = 20;

pub const ETH_P_IP: u16 = 0x0800;
pub const IPPROTO_TCP: u8 = 6;

const IP_MF: u16 = 0x2000; // more fragments
const IP_OFFSET: u16 = 0x1FFF; // fragment offset mask

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// The packet ends before the header does.
    Truncated,
    /// Not IPv4 carrying TCP, a fragment, or a header length out of range.
    Unsupported,
}

/// A window of packet bytes that can be read at an offset.
///
/// Implemented for host byte slices here, and for `XdpContext` / `SkBuffContext`
/// in the kernel programs.
pub trait Packet {
    /// Copies `N` bytes starting at `offset`, or `None` if `offset + N` is past the end.
    fn read<const N: usize>(&self, offset: usize) -> Option<[u8; N]>;
}

impl Packet for [u8] {
    #[inline(always)]
    fn read<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let end = offset.checked_add(N)?;
        self.get(offset..end)?.try_into().ok()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ipv4Header {
    /// `ihl * 4`, always at least [`IPV4_MIN_HDR_LEN`].
    pub header_len: usize,
    pub protocol: u8,
    /// Flags and fragment offset, host byte order.
    pub frag_off: u16,
    pub src_addr: [u8; 4],
    pub dst_addr: [u8; 4],
}

impl Ipv4Header {
    #[inline(always)]
    pub fn is_fragment(&self) -> bool {
        self.frag_off & (IP_MF | IP_OFFSET) != 0
    }
}

/// Ports of a TCP header, decoded from network order into host order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
}

/// Returns the EtherType of the frame starting at offset 0.
#[inline(always)]
pub fn parse_ethernet<P: Packet + ?Sized>(pkt: &P) -> Result<u16, ParseError> {
    let eth: [u8; ETH_HDR_LEN] = pkt.read(0).ok_or(ParseError::Truncated)?;
    Ok(u16::from_be_bytes([eth[12], eth[13]]))
}

#[inline(always)]
pub fn parse_ipv4<P: Packet + ?Sized>(pkt: &P, offset: usize) -> Result<Ipv4Header, ParseError> {
    let ip: [u8; IPV4_MIN_HDR_LEN] = pkt.read(offset).ok_or(ParseError::Truncated)?;

    if ip[0] >> 4 != 4 {
        return Err(ParseError::Unsupported);
    }
    let header_len = usize::from(ip[0] & 0x0F) * 4;
    if header_len < IPV4_MIN_HDR_LEN {
        return Err(ParseError::Unsupported);
    }

    Ok(Ipv4Header {
        header_len,
        protocol: ip[9],
        frag_off: u16::from_be_bytes([ip[6], ip[7]]),
        src_addr: [ip[12], ip[13], ip[14], ip[15]],
        dst_addr: [ip[16], ip[17], ip[18], ip[19]],
    })
}

#[inline(always)]
pub fn parse_tcp<P: Packet + ?Sized>(pkt: &P, offset: usize) -> Result<TcpHeader, ParseError> {
    let tcp: [u8; TCP_MIN_HDR_LEN] = pkt.read(offset).ok_or(ParseError::Truncated)?;

    let data_offset = usize::from(tcp[12] >> 4) * 4;
    if data_offset < TCP_MIN_HDR_LEN {
        return Err(ParseError::Unsupported);
    }

    Ok(TcpHeader {
        src_port: u16::from_be_bytes([tcp[0], tcp[1]]),
        dst_port: u16::from_be_bytes([tcp[2], tcp[3]]),
    })
}

/// Parses an IPv4 header at `offset` and the TCP header it encloses.
///
/// The TCP header is located with the variable `ihl * 4` length, which is
/// validated again by the bounds check of the TCP read.
#[inline(always)]
pub fn parse_ipv4_tcp<P: Packet + ?Sized>(pkt: &P, offset: usize) -> Result<TcpHeader, ParseError> {
    let ip = parse_ipv4(pkt, offset)?;
    if ip.protocol != IPPROTO_TCP || ip.is_fragment() {
        return Err(ParseError::Unsupported);
    }
    let tcp_offset = offset.checked_add(ip.header_len).ok_or(ParseError::Truncated)?;
    parse_tcp(pkt, tcp_offset)
}

/// Parses Ethernet, then IPv4 and TCP. Used at the XDP hook.
#[inline(always)]
pub fn parse_eth_tcp<P: Packet + ?Sized>(pkt: &P) -> Result<TcpHeader, ParseError> {
    if parse_ethernet(pkt)? != ETH_P_IP {
        return Err(ParseError::Unsupported);
    }
    parse_ipv4_tcp(pkt, ETH_HDR_LEN)
}
