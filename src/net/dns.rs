//! DNS and mDNS resolution (spec.md §4.H; grounded on
//! `original_source/main/common/dns.c`).

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::ErrorKind;
use crate::net::frame::{Reader, Writer};

pub const MDNS_GROUP: [u8; 4] = [224, 0, 0, 251];
pub const MDNS_PORT: u16 = 5353;
pub const MDNS_MAC: [u8; 6] = [0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb];
pub const DNS_PORT: u16 = 53;
pub const QUERY_TIMEOUT_MS: u32 = 3000;
pub const MDNS_ANSWER_TTL: u32 = 900;

const TYPE_A: u16 = 1;
const CLASS_IN: u16 = 1;

#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    #[error("malformed dns response")]
    Malformed,
    #[error("query timed out")]
    TimedOut,
}

impl DnsError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            DnsError::Malformed => ErrorKind::Protocol,
            DnsError::TimedOut => ErrorKind::Transient,
        }
    }
}

/// Parse a dotted quad without touching the network or cache
/// (`getHostAddr` step 1).
pub fn parse_dotted_quad(name: &str) -> Option<[u8; 4]> {
    let mut out = [0u8; 4];
    let mut count = 0;
    for (i, part) in name.split('.').enumerate() {
        if i >= 4 {
            return None;
        }
        out[i] = part.parse().ok()?;
        count += 1;
    }
    (count == 4).then_some(out)
}

pub fn is_mdns_name(name: &str) -> bool {
    name.ends_with(".local")
}

/// Fixed-capacity name→address cache with oldest-slot eviction
/// (spec.md §3).
#[derive(Debug, Default)]
pub struct DnsCache {
    entries: Vec<(String, [u8; 4])>,
    cap: usize,
    next: usize,
}

impl DnsCache {
    pub fn new(cap: usize) -> Self {
        DnsCache {
            entries: Vec::new(),
            cap: cap.max(1),
            next: 0,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<[u8; 4]> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, a)| *a)
    }

    pub fn insert(&mut self, name: &str, addr: [u8; 4]) {
        if self.lookup(name).is_some() {
            return;
        }
        if self.next >= self.cap {
            self.next = 0;
        }
        if self.next < self.entries.len() {
            self.entries[self.next] = (name.to_string(), addr);
        } else {
            self.entries.push((name.to_string(), addr));
        }
        self.next += 1;
    }
}

/// Build a single-question `A/IN` query into `buf`, returning the
/// length written.
pub fn build_query(buf: &mut [u8], id: u16, name: &str) -> usize {
    let mut w = Writer::new(buf);
    w.put_u16(0, id);
    w.put_u16(2, 0x0100); // standard query, recursion desired
    w.put_u16(4, 1); // qdcount
    w.put_u16(6, 0);
    w.put_u16(8, 0);
    w.put_u16(10, 0);
    let mut off = 12;
    for label in name.split('.') {
        buf[off] = label.len() as u8;
        off += 1;
        buf[off..off + label.len()].copy_from_slice(label.as_bytes());
        off += label.len();
    }
    buf[off] = 0;
    off += 1;
    let mut w = Writer::new(&mut buf[off..off + 4]);
    w.put_u16(0, TYPE_A);
    w.put_u16(2, CLASS_IN);
    off + 4
}

/// Build a response to an mDNS query carrying one `A/IN/TTL=900`
/// answer for our address.
pub fn build_mdns_response(buf: &mut [u8], id: u16, hostname: &str, addr: [u8; 4]) -> usize {
    let mut w = Writer::new(buf);
    w.put_u16(0, id);
    w.put_u16(2, 0x8400); // response, authoritative
    w.put_u16(4, 0);
    w.put_u16(6, 1); // ancount
    w.put_u16(8, 0);
    w.put_u16(10, 0);
    let mut off = 12;
    for label in hostname.split('.') {
        buf[off] = label.len() as u8;
        off += 1;
        buf[off..off + label.len()].copy_from_slice(label.as_bytes());
        off += label.len();
    }
    buf[off] = 0;
    off += 1;
    let mut w = Writer::new(&mut buf[off..off + 14]);
    w.put_u16(0, TYPE_A);
    w.put_u16(2, CLASS_IN);
    w.put_u32(4, MDNS_ANSWER_TTL);
    w.put_u16(8, 4);
    w.put_bytes(10, &addr);
    off + 14
}

pub fn id(buf: &[u8]) -> Option<u16> {
    Reader::new(buf).u16(0)
}

pub fn is_response(buf: &[u8]) -> bool {
    Reader::new(buf).u16(2).map(|flags| flags & 0x8000 != 0).unwrap_or(false)
}

pub fn question_count(buf: &[u8]) -> u16 {
    Reader::new(buf).u16(4).unwrap_or(0)
}

pub fn answer_count(buf: &[u8]) -> u16 {
    Reader::new(buf).u16(6).unwrap_or(0)
}

/// Walk a name starting at `off`, tolerating one RFC 1035 compression
/// pointer (top two bits of the length byte set) by skipping two bytes
/// instead of following it (spec.md §4.H).
pub fn skip_name(buf: &[u8], mut off: usize) -> Option<usize> {
    loop {
        let len = *buf.get(off)?;
        if len & 0xc0 == 0xc0 {
            return Some(off + 2);
        }
        if len == 0 {
            return Some(off + 1);
        }
        off += 1 + usize::from(len);
    }
}

/// Decode the dot-delimited name starting at `off` into an owned
/// `String`, for matching an mDNS query's question against our own
/// hostname (spec.md §4.H "mDNS responder").
pub fn read_name(buf: &[u8], mut off: usize) -> Option<String> {
    let mut name = String::new();
    loop {
        let len = *buf.get(off)?;
        if len & 0xc0 == 0xc0 || len == 0 {
            break;
        }
        let len = usize::from(len);
        let label = core::str::from_utf8(buf.get(off + 1..off + 1 + len)?).ok()?;
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(label);
        off += 1 + len;
    }
    Some(name)
}

/// Extract the first answer's address, given the offset of the answer
/// section (after skipping the question).
pub fn first_answer_address(buf: &[u8], answer_off: usize) -> Option<[u8; 4]> {
    let name_end = skip_name(buf, answer_off)?;
    let r = Reader::new(buf);
    let rtype = r.u16(name_end)?;
    if rtype != TYPE_A {
        return None;
    }
    let rdlength = usize::from(r.u16(name_end + 8)?);
    if rdlength != 4 {
        return None;
    }
    r.ipv4(name_end + 10)
}

/// Pseudo-random 20-83ms mDNS responder delay derived from the low 6
/// bits of the MAC (spec.md §4.H).
pub fn mdns_responder_delay_ms(mac: [u8; 6]) -> u32 {
    20 + u32::from(mac[5] & 0x3f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_quad_parses_and_rejects_names() {
        assert_eq!(parse_dotted_quad("10.0.0.1"), Some([10, 0, 0, 1]));
        assert_eq!(parse_dotted_quad("example.com"), None);
    }

    #[test]
    fn mdns_suffix_detection() {
        assert!(is_mdns_name("board.local"));
        assert!(!is_mdns_name("board.example.com"));
    }

    #[test]
    fn cache_evicts_oldest_when_full() {
        let mut cache = DnsCache::new(2);
        cache.insert("a", [1, 1, 1, 1]);
        cache.insert("b", [2, 2, 2, 2]);
        cache.insert("c", [3, 3, 3, 3]);
        assert_eq!(cache.lookup("a"), None);
        assert_eq!(cache.lookup("c"), Some([3, 3, 3, 3]));
    }

    #[test]
    fn query_then_answer_round_trip() {
        let mut buf = [0u8; 128];
        let qend = build_query(&mut buf, 99, "host.example.com");
        assert_eq!(id(&buf), Some(99));

        let mut resp = [0u8; 128];
        let rlen = build_mdns_response(&mut resp, 99, "board.local", [192, 168, 1, 50]);
        assert!(is_response(&resp[..rlen]));
        let question_end = skip_name(&resp, 12).unwrap();
        let answer_off = question_end; // ancount section begins right after questions (qdcount=0 here)
        assert_eq!(first_answer_address(&resp, answer_off), Some([192, 168, 1, 50]));
        let _ = qend;
    }

    #[test]
    fn compression_pointer_is_skipped_not_followed() {
        let buf = [0xc0, 0x0c, 0, 1, 0, 1];
        assert_eq!(skip_name(&buf, 0), Some(2));
    }

    #[test]
    fn reads_dot_delimited_question_name() {
        let mut buf = [0u8; 32];
        let qend = build_query(&mut buf, 1, "board.local");
        assert_eq!(read_name(&buf, 12), Some("board.local".to_string()));
        let _ = qend;
    }
}
