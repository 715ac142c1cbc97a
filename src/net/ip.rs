//! IPv4 header parsing/building and the UDP demultiplexer (spec.md §4.D;
//! grounded on `original_source/main/common/if.c`'s dispatch order).

use crate::net::checksum::{ip_checksum, pseudo_header_checksum, verify_ones_complement};
use crate::net::frame::{Reader, Writer};

pub const HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;

pub const PROTO_ICMP: u8 = 1;
pub const PROTO_IGMP: u8 = 2;
pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;

pub const BROADCAST: [u8; 4] = [255, 255, 255, 255];
pub const MDNS_GROUP: [u8; 4] = [224, 0, 0, 251];

#[derive(Debug, Clone, Copy)]
pub struct IpHeaderView {
    pub ihl: u8,
    pub protocol: u8,
    pub id: u16,
    pub ttl: u8,
    pub src: [u8; 4],
    pub dst: [u8; 4],
    pub header_len: usize,
    pub total_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpError {
    WrongVersion,
    Truncated,
    BadChecksum,
}

pub fn parse(buf: &[u8]) -> Result<IpHeaderView, IpError> {
    let r = Reader::new(buf);
    let vihl = r.u8(0).ok_or(IpError::Truncated)?;
    if vihl >> 4 != 4 {
        return Err(IpError::WrongVersion);
    }
    let ihl = vihl & 0xf;
    let header_len = usize::from(ihl) * 4;
    if buf.len() < header_len || header_len < HEADER_LEN {
        return Err(IpError::Truncated);
    }
    let total_len = usize::from(r.u16(2).ok_or(IpError::Truncated)?);
    Ok(IpHeaderView {
        ihl,
        protocol: r.u8(9).ok_or(IpError::Truncated)?,
        id: r.u16(4).ok_or(IpError::Truncated)?,
        ttl: r.u8(8).ok_or(IpError::Truncated)?,
        src: r.ipv4(12).ok_or(IpError::Truncated)?,
        dst: r.ipv4(16).ok_or(IpError::Truncated)?,
        header_len,
        total_len,
    })
}

pub fn verify_checksum(header: &[u8]) -> bool {
    verify_ones_complement(header)
}

/// Build a fixed 20-byte IPv4 header (no options generated, per
/// spec.md §6) into `buf[0..20]`.
pub fn build(buf: &mut [u8], id: u16, ttl: u8, protocol: u8, src: [u8; 4], dst: [u8; 4], payload_len: usize) {
    let mut w = Writer::new(&mut buf[..HEADER_LEN]);
    w.put_u8(0, 0x45); // version 4, ihl 5
    w.put_u8(1, 0); // tos
    w.put_u16(2, (HEADER_LEN + payload_len) as u16);
    w.put_u16(4, id);
    w.put_u16(6, 0); // flags/fragment offset
    w.put_u8(8, ttl);
    w.put_u8(9, protocol);
    w.put_u16(10, 0); // checksum, filled below
    w.put_bytes(12, &src);
    w.put_bytes(16, &dst);
    let csum = ip_checksum(&buf[..HEADER_LEN]);
    buf[10] = (csum >> 8) as u8;
    buf[11] = (csum & 0xff) as u8;
}

/// A monotonically incrementing IP identification sequence, seeded
/// from `crc16(mac)` (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct IdSequence(u16);

impl IdSequence {
    pub fn new(seed: u16) -> Self {
        IdSequence(seed)
    }

    pub fn next(&mut self) -> u16 {
        let id = self.0;
        self.0 = self.0.wrapping_add(1);
        id
    }
}

pub fn build_udp(buf: &mut [u8], src_port: u16, dst_port: u16, payload_len: usize, src_ip: [u8; 4], dst_ip: [u8; 4]) {
    {
        let mut w = Writer::new(&mut buf[..UDP_HEADER_LEN]);
        w.put_u16(0, src_port);
        w.put_u16(2, dst_port);
        w.put_u16(4, (UDP_HEADER_LEN + payload_len) as u16);
        w.put_u16(6, 0);
    }
    let csum = pseudo_header_checksum(src_ip, dst_ip, PROTO_UDP, &buf[..UDP_HEADER_LEN + payload_len]);
    buf[6] = (csum >> 8) as u8;
    buf[7] = (csum & 0xff) as u8;
}

pub struct UdpHeaderView {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: usize,
    pub checksum: u16,
}

pub fn parse_udp(buf: &[u8]) -> Option<UdpHeaderView> {
    let r = Reader::new(buf);
    Some(UdpHeaderView {
        src_port: r.u16(0)?,
        dst_port: r.u16(2)?,
        length: usize::from(r.u16(4)?),
        checksum: r.u16(6)?,
    })
}

/// Destination-address acceptance filter (spec.md §4.D step 4).
#[derive(Debug, Clone, Copy)]
pub struct AcceptCtx {
    pub local_ip: [u8; 4],
    pub subnet_broadcast: [u8; 4],
    pub remote_cmd_port: u16,
    pub rarp_assignment_mode: bool,
}

pub fn accept_destination(ctx: &AcceptCtx, ip: &IpHeaderView, udp_dst_port: Option<u16>) -> bool {
    if ip.dst == ctx.local_ip {
        return true;
    }
    if ip.dst == BROADCAST {
        return true;
    }
    if ip.dst == ctx.subnet_broadcast && udp_dst_port == Some(ctx.remote_cmd_port) {
        return true;
    }
    if ip.dst == MDNS_GROUP {
        return true;
    }
    if ctx.rarp_assignment_mode && ctx.local_ip == [0, 0, 0, 0] && ip.protocol == PROTO_ICMP {
        return true;
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UdpPort {
    RemoteCmd,
    DhcpClient,
    Tftp(u16),
    Dns,
    MDns,
    Gdb,
    Unmatched,
}

pub fn classify_port(port: u16, remote_cmd_port: u16, dhcp_client_port: u16, dns_port: u16, mdns_port: u16, gdb_port: u16, tftp_window: core::ops::Range<u16>) -> UdpPort {
    if port == remote_cmd_port {
        UdpPort::RemoteCmd
    } else if port == dhcp_client_port {
        UdpPort::DhcpClient
    } else if port == dns_port {
        UdpPort::Dns
    } else if port == mdns_port {
        UdpPort::MDns
    } else if port == gdb_port {
        UdpPort::Gdb
    } else if tftp_window.contains(&port) {
        UdpPort::Tftp(port)
    } else {
        UdpPort::Unmatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_checksummed_header() {
        let mut buf = [0u8; HEADER_LEN];
        build(&mut buf, 42, 60, PROTO_UDP, [10, 0, 0, 1], [10, 0, 0, 2], 0);
        assert!(verify_checksum(&buf));
        let view = parse(&buf).unwrap();
        assert_eq!(view.id, 42);
        assert_eq!(view.ttl, 60);
        assert_eq!(view.protocol, PROTO_UDP);
    }

    #[test]
    fn rejects_non_ipv4() {
        let mut buf = [0u8; HEADER_LEN];
        buf[0] = 0x65; // version 6
        assert_eq!(parse(&buf), Err(IpError::WrongVersion));
    }

    #[test]
    fn accepts_our_ip_broadcast_and_mdns_not_unrelated_multicast() {
        let ctx = AcceptCtx {
            local_ip: [10, 0, 0, 5],
            subnet_broadcast: [10, 0, 0, 255],
            remote_cmd_port: 777,
            rarp_assignment_mode: false,
        };
        let mut hdr = parse(&{
            let mut b = [0u8; HEADER_LEN];
            build(&mut b, 1, 60, PROTO_UDP, [10, 0, 0, 1], [10, 0, 0, 5], 0);
            b
        }).unwrap();
        assert!(accept_destination(&ctx, &hdr, None));
        hdr.dst = [224, 0, 0, 251];
        assert!(accept_destination(&ctx, &hdr, None));
        hdr.dst = [239, 1, 1, 1];
        assert!(!accept_destination(&ctx, &hdr, None));
        hdr.dst = ctx.subnet_broadcast;
        assert!(!accept_destination(&ctx, &hdr, Some(999)));
        assert!(accept_destination(&ctx, &hdr, Some(777)));
    }
}
