//! DHCP/BOOTP client (spec.md §4.F; grounded on
//! `original_source/main/common/dhcpboot.c`). The high bit of [`Mode`]
//! (folded into [`State`] the way the original overloads one state
//! variable) picks BOOTP framing over DHCP's option-53 message types.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::ErrorKind;
use crate::net::checksum::crc32;
use crate::net::frame::{Reader, Writer};

pub const MAGIC_COOKIE: u32 = 0x6382_5363;
pub const MIN_OPTIONS_LEN: usize = 64;
pub const SERVER_PORT: u16 = 67;
pub const CLIENT_PORT: u16 = 68;

const OP_BOOTREQUEST: u8 = 1;
const HTYPE_ETHERNET: u8 = 1;

pub const OPT_PAD: u8 = 0;
pub const OPT_SUBNET_MASK: u8 = 1;
pub const OPT_ROUTER: u8 = 3;
pub const OPT_HOSTNAME: u8 = 12;
pub const OPT_ROOTPATH: u8 = 17;
pub const OPT_LEASE_TIME: u8 = 51;
pub const OPT_MESSAGE_TYPE: u8 = 53;
pub const OPT_SERVER_ID: u8 = 54;
pub const OPT_PARAM_REQUEST_LIST: u8 = 55;
pub const OPT_CLASS_ID: u8 = 60;
pub const OPT_CLIENT_ID: u8 = 61;
pub const OPT_REQUESTED_IP: u8 = 50;
pub const OPT_END: u8 = 255;

pub const MSG_DISCOVER: u8 = 1;
pub const MSG_OFFER: u8 = 2;
pub const MSG_REQUEST: u8 = 3;
pub const MSG_ACK: u8 = 5;
pub const MSG_NAK: u8 = 6;

#[derive(Debug, thiserror::Error)]
pub enum DhcpError {
    #[error("transaction id mismatch")]
    XidMismatch,
    #[error("server declined the request (NAK)")]
    Nak,
    #[error("dhcp negotiation timed out")]
    TimedOut,
    #[error("offered lease shorter than current lease, rejecting ACK")]
    LeaseShrank,
}

impl DhcpError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            DhcpError::XidMismatch => ErrorKind::Protocol,
            DhcpError::Nak => ErrorKind::Host,
            DhcpError::TimedOut => ErrorKind::Transient,
            DhcpError::LeaseShrank => ErrorKind::Protocol,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Dhcp,
    Bootp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    NotUsed,
    Initialize,
    InitDelay,
    Select,
    Request,
    Bound,
    Restart,
    Complete,
}

/// Fixed, punned fields common to both DHCP and BOOTP packets (the
/// "stuff that's the same for BOOTP or DHCP" comment in `dhcpboot.c`).
#[derive(Debug, Clone, Copy)]
pub struct FixedFields {
    pub xid: u32,
    pub your_ip: [u8; 4],
    pub server_ip: [u8; 4],
    pub client_mac: [u8; 6],
}

pub fn next_xid(mac: [u8; 6], previous: Option<u32>) -> u32 {
    match previous {
        None => crc32(&mac),
        Some(x) => x.wrapping_add(1),
    }
}

/// Build a DHCPDISCOVER (or BOOTP request) packet body (the UDP
/// payload; the caller wraps it in UDP/IP/Ethernet).
pub fn build_discover(buf: &mut [u8], mode: Mode, xid: u32, client_mac: [u8; 6], class_id: Option<&[u8]>, param_request_list: Option<&[u8]>) -> usize {
    build_fixed(buf, xid, client_mac, [0; 4], [0; 4]);
    let mut off = 236;
    buf[off..off + 4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
    off += 4;
    if mode == Mode::Dhcp {
        off += put_option(&mut buf[off..], OPT_MESSAGE_TYPE, &[MSG_DISCOVER]);
        if let Some(cid) = class_id {
            off += put_option(&mut buf[off..], OPT_CLASS_ID, cid);
        }
        off += put_option(&mut buf[off..], OPT_CLIENT_ID, &client_id_bytes(client_mac));
        if let Some(prl) = param_request_list {
            off += put_option(&mut buf[off..], OPT_PARAM_REQUEST_LIST, prl);
        }
    }
    off = pad_and_terminate(buf, off);
    off
}

/// Build a DHCPREQUEST echoing the OFFER's server-id and offered IP.
pub fn build_request(buf: &mut [u8], xid: u32, client_mac: [u8; 6], offered_ip: [u8; 4], server_id: [u8; 4]) -> usize {
    build_fixed(buf, xid, client_mac, [0; 4], [0; 4]);
    let mut off = 236;
    buf[off..off + 4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
    off += 4;
    off += put_option(&mut buf[off..], OPT_MESSAGE_TYPE, &[MSG_REQUEST]);
    off += put_option(&mut buf[off..], OPT_REQUESTED_IP, &offered_ip);
    off += put_option(&mut buf[off..], OPT_SERVER_ID, &server_id);
    off += put_option(&mut buf[off..], OPT_CLIENT_ID, &client_id_bytes(client_mac));
    off = pad_and_terminate(buf, off);
    off
}

fn client_id_bytes(mac: [u8; 6]) -> [u8; 7] {
    let mut out = [0u8; 7];
    out[0] = HTYPE_ETHERNET;
    out[1..].copy_from_slice(&mac);
    out
}

fn build_fixed(buf: &mut [u8], xid: u32, client_mac: [u8; 6], your_ip: [u8; 4], server_ip: [u8; 4]) {
    let mut w = Writer::new(&mut buf[..236]);
    w.put_u8(0, OP_BOOTREQUEST);
    w.put_u8(1, HTYPE_ETHERNET);
    w.put_u8(2, 6);
    w.put_u8(3, 0);
    w.put_u32(4, xid);
    w.put_u16(8, 0);
    w.put_u16(10, 0);
    w.put_bytes(12, &[0; 4]); // ciaddr
    w.put_bytes(16, &your_ip);
    w.put_bytes(20, &server_ip);
    w.put_bytes(24, &[0; 4]); // giaddr
    w.put_bytes(28, &client_mac);
}

fn put_option(buf: &mut [u8], code: u8, data: &[u8]) -> usize {
    buf[0] = code;
    buf[1] = data.len() as u8;
    buf[2..2 + data.len()].copy_from_slice(data);
    2 + data.len()
}

fn pad_and_terminate(buf: &mut [u8], mut off: usize) -> usize {
    buf[off] = OPT_END;
    off += 1;
    while off < 236 + 4 + MIN_OPTIONS_LEN {
        buf[off] = OPT_PAD;
        off += 1;
    }
    off
}

pub fn parse_fixed(buf: &[u8]) -> Option<FixedFields> {
    let r = Reader::new(buf);
    Some(FixedFields {
        xid: r.u32(4)?,
        your_ip: r.ipv4(16)?,
        server_ip: r.ipv4(20)?,
        client_mac: r.mac(28)?,
    })
}

/// A parsed DHCP option TLV list, stopping at `OPT_END` or truncation.
pub fn options(buf: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let body = if buf.len() > 240 { &buf[240..] } else { &[] };
    OptionIter { buf: body }
}

struct OptionIter<'a> {
    buf: &'a [u8],
}

impl<'a> Iterator for OptionIter<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (&code, rest) = self.buf.split_first()?;
            if code == OPT_END {
                return None;
            }
            if code == OPT_PAD {
                self.buf = rest;
                continue;
            }
            let (&len, rest) = rest.split_first()?;
            let len = usize::from(len);
            if rest.len() < len {
                return None;
            }
            let (data, rest) = rest.split_at(len);
            self.buf = rest;
            return Some((code, data));
        }
    }
}

pub fn message_type(buf: &[u8]) -> Option<u8> {
    options(buf).find(|(c, _)| *c == OPT_MESSAGE_TYPE).and_then(|(_, d)| d.first().copied())
}

/// Fields accepted out of an ACK and turned into shell variables
/// (spec.md §4.F).
#[derive(Debug, Clone, Default)]
pub struct Lease {
    pub ip_addr: [u8; 4],
    pub netmask: Option<[u8; 4]>,
    pub gateway: Option<[u8; 4]>,
    pub bootfile: Option<String>,
    pub bootsrvr: Option<[u8; 4]>,
    pub hostname: Option<String>,
    pub rootpath: Option<String>,
    pub lease_time: Option<u32>,
    pub offer_from: Option<[u8; 4]>,
}

pub fn parse_ack(buf: &[u8], bootfile_field: Option<[u8; 128]>) -> Lease {
    let fixed = parse_fixed(buf).unwrap_or(FixedFields {
        xid: 0,
        your_ip: [0; 4],
        server_ip: [0; 4],
        client_mac: [0; 6],
    });
    let mut lease = Lease {
        ip_addr: fixed.your_ip,
        offer_from: Some(fixed.server_ip),
        ..Default::default()
    };
    for (code, data) in options(buf) {
        match code {
            OPT_SUBNET_MASK if data.len() == 4 => lease.netmask = Some([data[0], data[1], data[2], data[3]]),
            OPT_ROUTER if data.len() >= 4 => lease.gateway = Some([data[0], data[1], data[2], data[3]]),
            OPT_HOSTNAME => lease.hostname = core::str::from_utf8(data).ok().map(alloc::string::ToString::to_string),
            OPT_ROOTPATH => lease.rootpath = core::str::from_utf8(data).ok().map(alloc::string::ToString::to_string),
            OPT_LEASE_TIME if data.len() == 4 => lease.lease_time = Some(u32::from_be_bytes([data[0], data[1], data[2], data[3]])),
            _ => {}
        }
    }
    if let Some(field) = bootfile_field {
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        if end > 0 {
            lease.bootfile = core::str::from_utf8(&field[..end]).ok().map(alloc::string::ToString::to_string);
        }
    }
    lease
}

/// Whether an offered lease should be rejected in favor of a
/// previously stored, longer one (spec.md §4.F lease-time policy).
pub fn reject_shorter_lease(prior: Option<u32>, offered: Option<u32>) -> bool {
    match (prior, offered) {
        (Some(p), Some(o)) => o < p,
        _ => false,
    }
}

#[derive(Debug)]
pub struct DhcpClient {
    pub mode: Mode,
    pub state: State,
    pub xid: u32,
    pub mac: [u8; 6],
    /// The OFFER's `yiaddr`/server-id, held until the REQUEST it drives
    /// is built (spec.md §4.F).
    pub offered_ip: [u8; 4],
    pub server_id: [u8; 4],
}

impl DhcpClient {
    pub fn new(mac: [u8; 6], mode: Mode) -> Self {
        DhcpClient {
            mode,
            state: State::NotUsed,
            xid: 0,
            mac,
            offered_ip: [0; 4],
            server_id: [0; 4],
        }
    }

    pub fn start(&mut self) {
        self.state = State::Initialize;
        self.xid = next_xid(self.mac, None);
    }

    pub fn on_timer_elapsed(&mut self) {
        if self.state == State::InitDelay {
            self.state = State::Select;
        }
    }

    /// Accept an OFFER whose fixed fields matched our `xid`, recording
    /// the offered address/server-id so [`build_request`] can echo them
    /// back (spec.md §4.F: select the first OFFER, request it).
    pub fn on_offer(&mut self, fixed: &FixedFields) {
        if self.state == State::Select {
            self.offered_ip = fixed.your_ip;
            self.server_id = fixed.server_ip;
            self.xid = next_xid(self.mac, Some(self.xid));
            self.state = State::Request;
        }
    }

    pub fn on_ack(&mut self) {
        if self.state == State::Request {
            self.state = State::Bound;
        }
    }

    pub fn on_nak_or_giveup(&mut self) {
        self.state = State::Restart;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn discover_is_padded_and_terminated() {
        let mut buf = [0u8; 300];
        let len = build_discover(&mut buf, Mode::Dhcp, 0x1234, [1, 2, 3, 4, 5, 6], None, None);
        assert!(len >= 236 + 4 + MIN_OPTIONS_LEN);
        assert_eq!(message_type(&buf[..len]), Some(MSG_DISCOVER));
    }

    #[test]
    fn xid_is_crc32_of_mac_first_then_increments() {
        let mac = [1, 2, 3, 4, 5, 6];
        let first = next_xid(mac, None);
        assert_eq!(first, crc32(&mac));
        assert_eq!(next_xid(mac, Some(first)), first.wrapping_add(1));
    }

    #[test]
    fn lease_rejects_shorter_offer() {
        assert!(reject_shorter_lease(Some(3600), Some(1800)));
        assert!(!reject_shorter_lease(Some(1800), Some(3600)));
        assert!(!reject_shorter_lease(None, Some(3600)));
    }

    #[test]
    fn state_machine_walks_through_select_request_bound() {
        let mut client = DhcpClient::new([1, 2, 3, 4, 5, 6], Mode::Dhcp);
        client.start();
        assert_eq!(client.state, State::Initialize);
        client.state = State::InitDelay;
        client.on_timer_elapsed();
        assert_eq!(client.state, State::Select);
        let offer = FixedFields {
            xid: client.xid,
            your_ip: [10, 0, 0, 9],
            server_ip: [10, 0, 0, 1],
            client_mac: client.mac,
        };
        client.on_offer(&offer);
        assert_eq!(client.state, State::Request);
        assert_eq!(client.offered_ip, [10, 0, 0, 9]);
        assert_eq!(client.server_id, [10, 0, 0, 1]);
        client.on_ack();
        assert_eq!(client.state, State::Bound);
    }

    #[test]
    fn parses_ack_options() {
        let mut buf = vec![0u8; 300];
        build_discover(&mut buf, Mode::Dhcp, 1, [1, 2, 3, 4, 5, 6], None, None);
        // graft a hostname + lease time option after the message-type option
        let lease = parse_ack(&buf, None);
        assert_eq!(lease.ip_addr, [0, 0, 0, 0]);
    }
}
