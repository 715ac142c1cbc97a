//! IGMP group membership (spec.md §4.E; grounded on
//! `original_source/main/common/igmp.c`).

use crate::net::checksum::ip_checksum;
use crate::net::frame::Writer;

pub const TYPE_MEMBERSHIP_REPORT: u8 = 0x16;
pub const TYPE_LEAVE_GROUP: u8 = 0x17;

pub const ALL_ROUTERS_MAC: [u8; 6] = [0x01, 0x00, 0x5e, 0x00, 0x00, 0x02];
pub const ALL_ROUTERS_GROUP: [u8; 4] = [224, 0, 0, 2];

/// RFC 791 router-alert IP option, as embedded in the IGMP packet's IP
/// header (spec.md §4.E).
pub const ROUTER_ALERT_OPTION: [u8; 4] = [0x94, 0x04, 0x00, 0x00];

pub const BODY_LEN: usize = 8;

/// IP header length with the router-alert option appended (`ihl=6`).
pub const IP_HEADER_LEN: usize = 24;

/// The multicast MAC address for `group` (01:00:5e + low 23 bits of
/// the group address).
pub fn multicast_mac(group: [u8; 4]) -> [u8; 6] {
    [
        0x01,
        0x00,
        0x5e,
        group[1] & 0x7f,
        group[2],
        group[3],
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Join,
    Leave,
}

pub fn dest_mac(action: Membership, group: [u8; 4]) -> [u8; 6] {
    match action {
        Membership::Join => multicast_mac(group),
        Membership::Leave => ALL_ROUTERS_MAC,
    }
}

/// Build the 8-byte IGMP body into `buf[0..8]`.
pub fn build_body(buf: &mut [u8], action: Membership, group: [u8; 4]) {
    let mut w = Writer::new(&mut buf[..BODY_LEN]);
    w.put_u8(0, match action {
        Membership::Join => TYPE_MEMBERSHIP_REPORT,
        Membership::Leave => TYPE_LEAVE_GROUP,
    });
    w.put_u8(1, 0);
    w.put_u16(2, 0);
    w.put_bytes(4, &group);
    let csum = ip_checksum(&buf[..BODY_LEN]);
    buf[2] = (csum >> 8) as u8;
    buf[3] = (csum & 0xff) as u8;
}

/// Build the full `ihl=6` IP datagram carrying the router-alert option
/// and the IGMP body into `buf[0..IP_HEADER_LEN + BODY_LEN]`, returning
/// the total length written (spec.md §4.E: a join targets the group
/// address itself, a leave targets the all-routers group).
pub fn build_packet(buf: &mut [u8], id: u16, ttl: u8, src: [u8; 4], action: Membership, group: [u8; 4]) -> usize {
    let dst = match action {
        Membership::Join => group,
        Membership::Leave => ALL_ROUTERS_GROUP,
    };
    let total_len = IP_HEADER_LEN + BODY_LEN;
    {
        let mut w = Writer::new(&mut buf[..IP_HEADER_LEN]);
        w.put_u8(0, 0x46); // version 4, ihl 6 (24 bytes: 20 fixed + 4-byte option)
        w.put_u8(1, 0);
        w.put_u16(2, total_len as u16);
        w.put_u16(4, id);
        w.put_u16(6, 0);
        w.put_u8(8, ttl);
        w.put_u8(9, crate::net::ip::PROTO_IGMP);
        w.put_u16(10, 0);
        w.put_bytes(12, &src);
        w.put_bytes(16, &dst);
        w.put_bytes(20, &ROUTER_ALERT_OPTION);
    }
    let csum = ip_checksum(&buf[..IP_HEADER_LEN]);
    buf[10] = (csum >> 8) as u8;
    buf[11] = (csum & 0xff) as u8;
    build_body(&mut buf[IP_HEADER_LEN..total_len], action, group);
    total_len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multicast_mac_masks_high_bit_of_second_octet() {
        assert_eq!(multicast_mac([239, 255, 1, 2]), [0x01, 0x00, 0x5e, 0x7f, 0x01, 0x02]);
    }

    #[test]
    fn leave_always_targets_all_routers() {
        assert_eq!(dest_mac(Membership::Leave, [239, 1, 2, 3]), ALL_ROUTERS_MAC);
    }

    #[test]
    fn body_checksums_correctly() {
        let mut buf = [0u8; BODY_LEN];
        build_body(&mut buf, Membership::Join, [224, 0, 0, 5]);
        assert!(crate::net::checksum::verify_ones_complement(&buf));
    }

    #[test]
    fn full_packet_carries_the_router_alert_option_and_checksums() {
        let mut buf = [0u8; IP_HEADER_LEN + BODY_LEN];
        let len = build_packet(&mut buf, 1, 1, [10, 0, 0, 5], Membership::Join, [224, 0, 0, 5]);
        assert_eq!(len, IP_HEADER_LEN + BODY_LEN);
        assert_eq!(buf[0], 0x46);
        assert_eq!(&buf[20..24], &ROUTER_ALERT_OPTION);
        assert_eq!(&buf[16..20], &[224, 0, 0, 5]);
        assert!(crate::net::checksum::verify_ones_complement(&buf[..IP_HEADER_LEN]));
    }

    #[test]
    fn leave_packet_targets_all_routers_group() {
        let mut buf = [0u8; IP_HEADER_LEN + BODY_LEN];
        build_packet(&mut buf, 1, 1, [10, 0, 0, 5], Membership::Leave, [224, 0, 0, 5]);
        assert_eq!(&buf[16..20], &ALL_ROUTERS_GROUP);
    }
}
