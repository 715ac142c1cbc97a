//! Address Resolution Protocol (spec.md §4.C; grounded on
//! `original_source/main/common/arp.c`).

use alloc::vec::Vec;

use crate::error::ErrorKind;
use crate::net::checksum::crc32;
use crate::net::eth::{self, EtherType};
use crate::net::frame::{Reader, Writer};

pub const HEADER_LEN: usize = 28;
pub const FRAME_LEN: usize = eth::HEADER_LEN + HEADER_LEN;

const HTYPE_ETHERNET: u16 = 1;
const OP_REQUEST: u16 = 1;
const OP_REPLY: u16 = 2;

/// RFC 3927 link-local range: 169.254.1.0 .. 169.254.254.255.
const LLAD_BEGIN: u32 = 0xa9fe_0100;
const LLAD_END: u32 = 0xa9fe_feff;

#[derive(Debug, thiserror::Error)]
pub enum ArpError {
    #[error("ethernet is disabled")]
    EthernetDisabled,
    #[error("GIPADD/IPADD subnet confusion")]
    SubnetConfusion,
    #[error("arp resolution timed out")]
    TimedOut,
}

impl ArpError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            ArpError::EthernetDisabled | ArpError::SubnetConfusion => ErrorKind::Host,
            ArpError::TimedOut => ErrorKind::Transient,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Request,
    Reply,
    Other(u16),
}

#[derive(Debug, Clone, Copy)]
pub struct ArpMessage {
    pub operation: Operation,
    pub sender_ha: [u8; 6],
    pub sender_ia: [u8; 4],
    pub target_ha: [u8; 6],
    pub target_ia: [u8; 4],
}

/// Parse the ARP segment that follows the 14-byte Ethernet header.
pub fn parse(buf: &[u8]) -> Option<ArpMessage> {
    let r = Reader::new(buf);
    let op = match r.u16(6)? {
        OP_REQUEST => Operation::Request,
        OP_REPLY => Operation::Reply,
        other => Operation::Other(other),
    };
    Some(ArpMessage {
        operation: op,
        sender_ha: r.mac(8)?,
        sender_ia: r.ipv4(14)?,
        target_ha: r.mac(18)?,
        target_ia: r.ipv4(22)?,
    })
}

/// Build a full Ethernet+ARP request frame into `buf[0..FRAME_LEN]`.
/// When `probe` is set, sender_ia is all-zero and target_ha is zeroed,
/// matching an RFC 3927 address probe; otherwise this is an ordinary
/// "who-has" request.
pub fn build_request(buf: &mut [u8], local_mac: [u8; 6], local_ip: [u8; 4], target_ip: [u8; 4], probe: bool) {
    eth::build(buf, eth::BROADCAST, local_mac, EtherType::Arp);
    let mut w = Writer::new(&mut buf[eth::HEADER_LEN..eth::HEADER_LEN + HEADER_LEN]);
    w.put_u16(0, HTYPE_ETHERNET);
    w.put_u16(2, EtherType::IP);
    w.put_u8(4, 6);
    w.put_u8(5, 4);
    w.put_u16(6, OP_REQUEST);
    w.put_bytes(8, &local_mac);
    if probe {
        w.put_bytes(14, &[0; 4]);
        w.put_bytes(18, &[0; 6]);
    } else {
        w.put_bytes(14, &local_ip);
        w.put_bytes(18, &eth::BROADCAST);
    }
    w.put_bytes(22, &target_ip);
}

/// Build the Ethernet+ARP reply frame answering `req`, into
/// `buf[0..FRAME_LEN]`.
pub fn build_reply(buf: &mut [u8], local_mac: [u8; 6], req: &ArpMessage) {
    eth::build(buf, req.sender_ha, local_mac, EtherType::Arp);
    let mut w = Writer::new(&mut buf[eth::HEADER_LEN..eth::HEADER_LEN + HEADER_LEN]);
    w.put_u16(0, HTYPE_ETHERNET);
    w.put_u16(2, EtherType::IP);
    w.put_u8(4, 6);
    w.put_u8(5, 4);
    w.put_u16(6, OP_REPLY);
    w.put_bytes(8, &local_mac);
    w.put_bytes(14, &req.target_ia);
    w.put_bytes(18, &req.sender_ha);
    w.put_bytes(22, &req.sender_ia);
}

/// IP-to-MAC cache ring (spec.md §3; `ArpCache`/`ArpIdx`/`ArpTot` in
/// `arp.c`). Stores at most `cap` entries, overwriting the oldest once
/// full.
#[derive(Debug, Default)]
pub struct ArpCache {
    entries: Vec<([u8; 4], [u8; 6])>,
    cap: usize,
    idx: usize,
    total: usize,
}

impl ArpCache {
    pub fn new(cap: usize) -> Self {
        ArpCache {
            entries: Vec::new(),
            cap: cap.max(1),
            idx: 0,
            total: 0,
        }
    }

    pub fn lookup(&self, ip: [u8; 4]) -> Option<[u8; 6]> {
        self.entries.iter().find(|(i, _)| *i == ip).map(|(_, e)| *e)
    }

    /// Store an IP/MAC pair, unless already cached. Returns `true` when
    /// a new entry was written.
    pub fn store(&mut self, ip: [u8; 4], ether: [u8; 6]) -> bool {
        if self.lookup(ip).is_some() {
            return false;
        }
        if self.idx >= self.cap {
            self.idx = 0;
        }
        if self.idx < self.entries.len() {
            self.entries[self.idx] = (ip, ether);
        } else {
            self.entries.push((ip, ether));
        }
        self.idx += 1;
        self.total += 1;
        true
    }

    pub fn flush(&mut self) {
        self.entries.clear();
        self.idx = 0;
        self.total = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &([u8; 4], [u8; 6])> {
        self.entries.iter()
    }
}

/// Picks successive RFC 3927 link-local address candidates
/// (`llas()` in `arp.c`): the first candidate is derived from a CRC-32
/// of the MAC, each retry nudges it by the MAC's low nibble and wraps
/// back into range.
#[derive(Debug, Clone, Copy)]
pub struct LinkLocalSelector {
    candidate: u32,
    calls: u32,
}

impl LinkLocalSelector {
    pub fn first(mac: [u8; 6]) -> ([u8; 4], Self) {
        let candidate = LLAD_BEGIN.wrapping_add(crc32(&mac) & 0xff);
        (candidate.to_be_bytes(), LinkLocalSelector { candidate, calls: 1 })
    }

    pub fn retry(&mut self, mac: [u8; 6]) -> [u8; 4] {
        let delta = u32::from(mac[5] & 0xf);
        self.candidate = self.candidate.wrapping_add(delta);
        if self.candidate >= LLAD_END {
            self.candidate = LLAD_BEGIN + delta + self.calls;
        }
        self.calls += 1;
        self.candidate.to_be_bytes()
    }
}

/// Whether `ip` lies on the local subnet given `netmask` and `local_ip`
/// (`IpIsOnThisNet()` in `arp.c`).
pub fn ip_is_on_this_net(ip: [u8; 4], local_ip: [u8; 4], netmask: [u8; 4]) -> bool {
    (0..4).all(|i| (ip[i] & netmask[i]) == (local_ip[i] & netmask[i]))
}

/// The default netmask derived from the address class when none is
/// configured (`GetBinNetMask()` in `arp.c`).
pub fn default_netmask(local_ip: [u8; 4]) -> [u8; 4] {
    if local_ip[0] & 0xe0 == 0xc0 {
        [255, 255, 255, 0]
    } else if local_ip[0] & 0xc0 == 0x80 {
        [255, 255, 0, 0]
    } else if local_ip[0] & 0x80 == 0x00 {
        [255, 0, 0, 0]
    } else {
        [255, 255, 255, 255]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_skips_duplicate_ip_and_wraps_ring() {
        let mut cache = ArpCache::new(2);
        assert!(cache.store([10, 0, 0, 1], [1; 6]));
        assert!(!cache.store([10, 0, 0, 1], [2; 6]));
        assert!(cache.store([10, 0, 0, 2], [2; 6]));
        assert!(cache.store([10, 0, 0, 3], [3; 6]));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup([10, 0, 0, 2]), None);
        assert_eq!(cache.lookup([10, 0, 0, 3]), Some([3; 6]));
    }

    #[test]
    fn request_reply_round_trip() {
        let mut buf = [0u8; FRAME_LEN];
        build_request(&mut buf, [1, 2, 3, 4, 5, 6], [10, 0, 0, 1], [10, 0, 0, 2], false);
        let msg = parse(&buf[eth::HEADER_LEN..]).unwrap();
        assert_eq!(msg.operation, Operation::Request);
        assert_eq!(msg.sender_ia, [10, 0, 0, 1]);
        assert_eq!(msg.target_ia, [10, 0, 0, 2]);

        let mut reply = [0u8; FRAME_LEN];
        build_reply(&mut reply, [9, 9, 9, 9, 9, 9], &msg);
        let reply_msg = parse(&reply[eth::HEADER_LEN..]).unwrap();
        assert_eq!(reply_msg.operation, Operation::Reply);
        assert_eq!(reply_msg.sender_ia, [10, 0, 0, 2]);
        assert_eq!(reply_msg.target_ia, [10, 0, 0, 1]);
    }

    #[test]
    fn link_local_candidates_stay_in_range() {
        let mac = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
        let (first, mut selector) = LinkLocalSelector::first(mac);
        assert_eq!(first[0], 169);
        assert_eq!(first[1], 254);
        for _ in 0..50 {
            let candidate = selector.retry(mac);
            assert_eq!(candidate[0], 169);
            assert_eq!(candidate[1], 254);
        }
    }

    #[test]
    fn on_this_net_respects_mask() {
        let local = [10, 0, 0, 5];
        let mask = [255, 255, 255, 0];
        assert!(ip_is_on_this_net([10, 0, 0, 200], local, mask));
        assert!(!ip_is_on_this_net([10, 0, 1, 200], local, mask));
    }
}
