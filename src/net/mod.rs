//! The network stack: owned state for every protocol handler, driven
//! by a single [`NetStack::poll_ethernet`] entry point (spec.md §5, §9
//! design note: "express it as owned state inside a top-level network
//! stack value... all protocol handlers receive a mutable reference to
//! this value").

pub mod arp;
pub mod checksum;
pub mod device;
#[cfg(feature = "dhcp")]
pub mod dhcp;
#[cfg(feature = "dns")]
pub mod dns;
pub mod eth;
pub mod frame;
pub mod icmp;
pub mod igmp;
pub mod ip;
#[cfg(feature = "remote-cmd")]
pub mod remote_cmd;
#[cfg(feature = "tftp")]
pub mod tftp;

#[cfg(feature = "dns")]
use alloc::string::String;

use crate::board::NicDriver;
use crate::config::Config;
use crate::net::device::Device;
use crate::net::eth::EtherType;
use crate::retransmit::RetransmitPolicy;

/// Recursion depth suppression for `poll_ethernet` (spec.md §5
/// "Re-entrancy": "recursion beyond 4 levels is suppressed").
pub const MAX_POLL_DEPTH: u32 = 4;

pub struct NetStack<N: NicDriver> {
    pub device: Device<N>,
    pub config: Config,
    pub local_ip: [u8; 4],
    pub netmask: [u8; 4],
    pub gateway: Option<[u8; 4]>,
    pub arp_cache: arp::ArpCache,
    #[cfg(feature = "dns")]
    pub dns_cache: dns::DnsCache,
    /// Our own mDNS name, matched against inbound query questions
    /// (spec.md §4.H "mDNS responder").
    #[cfg(feature = "dns")]
    pub hostname: String,
    pub arp_retransmit: RetransmitPolicy,
    #[cfg(feature = "dhcp")]
    pub dhcp_retransmit: RetransmitPolicy,
    #[cfg(feature = "tftp")]
    pub tftp_retransmit: RetransmitPolicy,
    pub ip_id: ip::IdSequence,
    pub ping: icmp::PingObserver,
    pub rarp_assignment_mode: bool,
    #[cfg(feature = "dhcp")]
    pub dhcp: dhcp::DhcpClient,
    /// The singleton TFTP session (spec.md §3 invariant: at most one
    /// transfer active at a time).
    #[cfg(feature = "tftp")]
    pub tftp: tftp::Session,
    #[cfg(feature = "tftp")]
    tftp_sequence: u32,
    #[cfg(feature = "remote-cmd")]
    pub remote_cmd_queue: remote_cmd::DeferredQueue,
    poll_depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    OwnMac,
    UnknownEtherType,
    WrongIpVersion,
    AddressFilter,
    BadIpChecksum,
    BadUdpChecksum,
    UnmatchedTcp,
    UnmatchedUdpPort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Dropped(DropReason),
    Arp,
    Icmp,
    IcmpUnreachableProtocol,
    IcmpUnreachablePort,
    TcpReset,
    Udp(ip::UdpPort),
}

impl<N: NicDriver> NetStack<N> {
    pub fn new(nic: N, config: Config, mac_seed_crc16: u16) -> Self {
        let cap_arp = config.arp_cache_size;
        #[cfg(feature = "dns")]
        let cap_dns = config.dns_cache_size;
        #[cfg(feature = "dhcp")]
        let mac = nic.mac_address();
        NetStack {
            device: Device::new(nic),
            config,
            local_ip: [0; 4],
            netmask: [255, 255, 255, 255],
            gateway: None,
            arp_cache: arp::ArpCache::new(cap_arp),
            #[cfg(feature = "dns")]
            dns_cache: dns::DnsCache::new(cap_dns),
            #[cfg(feature = "dns")]
            hostname: String::new(),
            arp_retransmit: RetransmitPolicy::new(),
            #[cfg(feature = "dhcp")]
            dhcp_retransmit: RetransmitPolicy::new(),
            #[cfg(feature = "tftp")]
            tftp_retransmit: RetransmitPolicy::new(),
            ip_id: ip::IdSequence::new(mac_seed_crc16),
            ping: icmp::PingObserver::default(),
            rarp_assignment_mode: false,
            #[cfg(feature = "dhcp")]
            dhcp: dhcp::DhcpClient::new(mac, dhcp::Mode::Dhcp),
            #[cfg(feature = "tftp")]
            tftp: tftp::Session::idle(),
            #[cfg(feature = "tftp")]
            tftp_sequence: 0,
            #[cfg(feature = "remote-cmd")]
            remote_cmd_queue: remote_cmd::DeferredQueue::default(),
            poll_depth: 0,
        }
    }

    pub fn mac_address(&self) -> [u8; 6] {
        self.device.mac_address()
    }

    pub fn subnet_broadcast(&self) -> [u8; 4] {
        let mut bc = self.local_ip;
        for i in 0..4 {
            bc[i] |= !self.netmask[i];
        }
        bc
    }

    /// Poll for at most one received frame, dispatching it through the
    /// same ordered filter chain `if.c`'s receive handler uses
    /// (spec.md §4.D). Tolerates re-entry from a protocol handler that
    /// itself sends a packet, up to [`MAX_POLL_DEPTH`].
    pub fn poll_ethernet(&mut self) -> Option<DispatchOutcome> {
        if self.poll_depth >= MAX_POLL_DEPTH {
            warn!("net: poll recursion depth {MAX_POLL_DEPTH} reached, suppressing");
            return None;
        }
        self.poll_depth += 1;
        let outcome = self.poll_ethernet_inner();
        self.poll_depth -= 1;
        outcome
    }

    fn poll_ethernet_inner(&mut self) -> Option<DispatchOutcome> {
        let frame = self.device.poll_receive()?;
        Some(self.dispatch(&frame))
    }

    fn dispatch(&mut self, frame: &[u8]) -> DispatchOutcome {
        let Some(hdr) = eth::parse(frame) else {
            trace!("net: frame too short to carry an ethernet header, dropping");
            return DispatchOutcome::Dropped(DropReason::UnknownEtherType);
        };
        #[cfg(feature = "net-trace")]
        trace!("net: rx {} bytes from {:?}, ethertype {:?}", frame.len(), hdr.src, hdr.ethertype);
        if hdr.src == self.mac_address() {
            return DispatchOutcome::Dropped(DropReason::OwnMac);
        }
        let payload = &frame[eth::HEADER_LEN..];
        match hdr.ethertype {
            EtherType::Arp => {
                if let Some(msg) = arp::parse(payload) {
                    self.handle_arp(msg);
                }
                DispatchOutcome::Arp
            }
            EtherType::Ip => {
                let outcome = self.dispatch_ip(payload, hdr.src);
                if outcome == DispatchOutcome::Icmp {
                    self.reply_icmp_echo(payload, hdr.src);
                }
                outcome
            }
            EtherType::Other(ethertype) => {
                trace!("net: unhandled ethertype 0x{ethertype:04x}, dropping");
                DispatchOutcome::Dropped(DropReason::UnknownEtherType)
            }
        }
    }

    /// `processARP()` (spec.md §4.C): cache the sender always, and if
    /// the request targets our own IP, answer it directly instead of
    /// waiting for the next poll to pick it up.
    fn handle_arp(&mut self, msg: arp::ArpMessage) {
        match msg.operation {
            arp::Operation::Request => {
                self.arp_cache.store(msg.sender_ia, msg.sender_ha);
                if msg.target_ia == self.local_ip {
                    self.reply_arp(&msg);
                }
            }
            arp::Operation::Reply => {
                if msg.target_ia == self.local_ip {
                    self.arp_cache.store(msg.sender_ia, msg.sender_ha);
                }
            }
            arp::Operation::Other(op) => {
                trace!("net: ignoring arp operation {op}");
            }
        }
    }

    fn reply_arp(&mut self, req: &arp::ArpMessage) {
        let local_mac = self.mac_address();
        if let Some(buf) = self.device.xmit_buffer(arp::FRAME_LEN) {
            arp::build_reply(buf, local_mac, req);
            self.device.send(arp::FRAME_LEN);
            debug!("net: answered arp who-has for {:?}", req.target_ia);
        } else {
            warn!("net: xmit buffer pool exhausted, dropping arp reply to {:?}", req.sender_ia);
        }
    }

    /// `processICMP()`'s echo-reply path (spec.md §4.E): answer an
    /// inbound echo request in place of the request's own source.
    fn reply_icmp_echo(&mut self, ip_payload: &[u8], requester_mac: [u8; 6]) {
        let Ok(ip_hdr) = ip::parse(ip_payload) else { return };
        if ip_hdr.protocol != ip::PROTO_ICMP {
            return;
        }
        let icmp_payload = &ip_payload[ip_hdr.header_len..];
        let Some(req) = icmp::parse(icmp_payload) else { return };
        if req.kind != icmp::TYPE_ECHO_REQUEST {
            return;
        }
        let local_mac = self.mac_address();
        let local_ip = self.local_ip;
        let id = self.ip_id.next();
        let ttl = self.config.ip_ttl;
        let echo_body = &icmp_payload[8..];
        let icmp_len = 8 + echo_body.len();
        let total_len = eth::HEADER_LEN + ip::HEADER_LEN + icmp_len;
        let Some(buf) = self.device.xmit_buffer(total_len) else {
            warn!("net: xmit buffer pool exhausted, dropping icmp echo reply to {:?}", ip_hdr.src);
            return;
        };
        icmp::build_echo_reply(&mut buf[eth::HEADER_LEN + ip::HEADER_LEN..total_len], echo_body, req.id, req.seq);
        ip::build(&mut buf[eth::HEADER_LEN..], id, ttl, ip::PROTO_ICMP, local_ip, ip_hdr.src, icmp_len);
        eth::build(buf, requester_mac, local_mac, EtherType::Ip);
        self.device.send(total_len);
        debug!("net: answered icmp echo request {} from {:?}", req.seq, ip_hdr.src);
    }

    fn dispatch_ip(&mut self, payload: &[u8], requester_mac: [u8; 6]) -> DispatchOutcome {
        let Ok(ip_hdr) = ip::parse(payload) else {
            trace!("net: not a well-formed ipv4 packet, dropping");
            return DispatchOutcome::Dropped(DropReason::WrongIpVersion);
        };
        if !ip::verify_checksum(&payload[..ip_hdr.header_len]) {
            debug!("net: bad ip header checksum from {:?}, dropping", ip_hdr.src);
            return DispatchOutcome::Dropped(DropReason::BadIpChecksum);
        }

        let udp_dst_port = if ip_hdr.protocol == ip::PROTO_UDP {
            ip::parse_udp(&payload[ip_hdr.header_len..]).map(|u| u.dst_port)
        } else {
            None
        };

        let ctx = ip::AcceptCtx {
            local_ip: self.local_ip,
            subnet_broadcast: self.subnet_broadcast(),
            remote_cmd_port: self.config.remote_cmd_port,
            rarp_assignment_mode: self.rarp_assignment_mode,
        };
        if !ip::accept_destination(&ctx, &ip_hdr, udp_dst_port) {
            trace!("net: {:?} not one of ours, dropping", ip_hdr.dst);
            return DispatchOutcome::Dropped(DropReason::AddressFilter);
        }

        match ip_hdr.protocol {
            ip::PROTO_ICMP => DispatchOutcome::Icmp,
            ip::PROTO_TCP => {
                debug!("net: tcp from {:?}, replying with reset (no tcp/ip stack)", ip_hdr.src);
                DispatchOutcome::TcpReset
            }
            ip::PROTO_UDP => self.dispatch_udp(payload, &ip_hdr, requester_mac),
            other => {
                debug!("net: unreachable protocol {other} from {:?}", ip_hdr.src);
                DispatchOutcome::IcmpUnreachableProtocol
            }
        }
    }

    fn dispatch_udp(&mut self, payload: &[u8], ip_hdr: &ip::IpHeaderView, requester_mac: [u8; 6]) -> DispatchOutcome {
        let udp_payload = &payload[ip_hdr.header_len..];
        let Some(udp) = ip::parse_udp(udp_payload) else {
            return DispatchOutcome::Dropped(DropReason::BadUdpChecksum);
        };
        if udp.checksum != 0 {
            let seg_len = udp.length.min(udp_payload.len());
            let mut scratch = udp_payload[..seg_len].to_vec();
            if scratch.len() >= 8 {
                scratch[6] = 0;
                scratch[7] = 0;
            }
            let computed = checksum::pseudo_header_checksum(ip_hdr.src, ip_hdr.dst, ip::PROTO_UDP, &scratch);
            if computed != udp.checksum {
                debug!("net: bad udp checksum from {:?}:{}, dropping", ip_hdr.src, udp.src_port);
                return DispatchOutcome::Dropped(DropReason::BadUdpChecksum);
            }
        }

        let body_start = ip_hdr.header_len + ip::UDP_HEADER_LEN;
        let body_end = (ip_hdr.header_len + udp.length).min(payload.len());
        let body: &[u8] = if body_start <= body_end { &payload[body_start..body_end] } else { &[] };

        #[cfg(feature = "dhcp")]
        let dhcp_client_port = dhcp::CLIENT_PORT;
        #[cfg(not(feature = "dhcp"))]
        let dhcp_client_port = 0xffffu16;
        #[cfg(feature = "dns")]
        let dns_port = dns::DNS_PORT;
        #[cfg(not(feature = "dns"))]
        let dns_port = 0xffffu16;
        #[cfg(feature = "dns")]
        let mdns_port = dns::MDNS_PORT;
        #[cfg(not(feature = "dns"))]
        let mdns_port = 0xffffu16;

        let tftp_window = self.config.tftp_port_base..(self.config.tftp_port_base + self.config.tftp_port_window);
        let classified = ip::classify_port(udp.dst_port, self.config.remote_cmd_port, dhcp_client_port, dns_port, mdns_port, 0xffff, tftp_window);

        #[cfg(feature = "net-trace")]
        trace!("net: udp {:?}:{} -> :{} classified as {:?}", ip_hdr.src, udp.src_port, udp.dst_port, classified);

        match classified {
            ip::UdpPort::Unmatched => {
                debug!("net: no listener on udp port {}, replying unreachable", udp.dst_port);
                DispatchOutcome::IcmpUnreachablePort
            }
            #[cfg(feature = "tftp")]
            ip::UdpPort::Tftp(local_port) => {
                self.handle_tftp_packet(ip_hdr.src, udp.src_port, local_port, body, requester_mac);
                DispatchOutcome::Udp(classified)
            }
            #[cfg(feature = "dhcp")]
            ip::UdpPort::DhcpClient => {
                self.handle_dhcp_packet(body, requester_mac);
                DispatchOutcome::Udp(classified)
            }
            #[cfg(feature = "dns")]
            ip::UdpPort::Dns => {
                self.handle_dns_response(body);
                DispatchOutcome::Udp(classified)
            }
            #[cfg(feature = "dns")]
            ip::UdpPort::MDns => {
                self.handle_mdns_packet(ip_hdr.src, udp.src_port, body, requester_mac);
                DispatchOutcome::Udp(classified)
            }
            #[cfg(feature = "remote-cmd")]
            ip::UdpPort::RemoteCmd => {
                self.handle_remote_cmd_packet(ip_hdr.src, body);
                DispatchOutcome::Udp(classified)
            }
            other => DispatchOutcome::Udp(other),
        }
    }

    /// Assemble and transmit a UDP datagram over Ethernet+IP, the way
    /// [`reply_icmp_echo`](Self::reply_icmp_echo) and
    /// [`reply_arp`](Self::reply_arp) build their replies inline.
    fn send_udp(&mut self, dst_mac: [u8; 6], dst_ip: [u8; 4], src_port: u16, dst_port: u16, payload: &[u8]) {
        let local_mac = self.mac_address();
        let local_ip = self.local_ip;
        let id = self.ip_id.next();
        let ttl = self.config.ip_ttl;
        let udp_off = eth::HEADER_LEN + ip::HEADER_LEN;
        let total_len = udp_off + ip::UDP_HEADER_LEN + payload.len();
        let Some(buf) = self.device.xmit_buffer(total_len) else {
            warn!("net: xmit buffer pool exhausted, dropping outbound udp to {:?}:{}", dst_ip, dst_port);
            return;
        };
        buf[udp_off + ip::UDP_HEADER_LEN..total_len].copy_from_slice(payload);
        ip::build_udp(&mut buf[udp_off..total_len], src_port, dst_port, payload.len(), local_ip, dst_ip);
        ip::build(&mut buf[eth::HEADER_LEN..], id, ttl, ip::PROTO_UDP, local_ip, dst_ip, ip::UDP_HEADER_LEN + payload.len());
        eth::build(buf, dst_mac, local_mac, EtherType::Ip);
        self.device.send(total_len);
    }

    /// Join or leave an IGMP multicast group (spec.md §4.E), sending
    /// the full `ihl=6` router-alert datagram.
    pub fn send_igmp(&mut self, action: igmp::Membership, group: [u8; 4]) {
        let local_mac = self.mac_address();
        let local_ip = self.local_ip;
        let id = self.ip_id.next();
        let ttl = self.config.ip_ttl;
        let dst_mac = igmp::dest_mac(action, group);
        let total_len = eth::HEADER_LEN + igmp::IP_HEADER_LEN + igmp::BODY_LEN;
        let Some(buf) = self.device.xmit_buffer(total_len) else {
            warn!("net: xmit buffer pool exhausted, dropping igmp {action:?} for {group:?}");
            return;
        };
        igmp::build_packet(&mut buf[eth::HEADER_LEN..total_len], id, ttl, local_ip, action, group);
        eth::build(buf, dst_mac, local_mac, EtherType::Ip);
        self.device.send(total_len);
        debug!("net: sent igmp {action:?} for {group:?}");
    }

    #[cfg(feature = "tftp")]
    fn handle_tftp_packet(&mut self, remote_ip: [u8; 4], remote_port: u16, local_port: u16, body: &[u8], requester_mac: [u8; 6]) {
        let Some(op) = tftp::opcode(body) else {
            trace!("net/tftp: short packet from {remote_ip:?}, dropping");
            return;
        };
        match op {
            tftp::OP_RRQ | tftp::OP_WRQ => {
                if self.tftp.is_busy() {
                    debug!("net/tftp: busy, NAKing request from {remote_ip:?}:{remote_port}");
                    self.send_tftp_error(remote_ip, remote_port, local_port, requester_mac, tftp::ERR_UNDEFINED, tftp::BUSY_MESSAGE);
                    return;
                }
                let Some(req) = tftp::parse_request(&body[2..]) else {
                    warn!("net/tftp: malformed rrq/wrq body from {remote_ip:?}");
                    return;
                };
                self.tftp_sequence = self.tftp_sequence.wrapping_add(1);
                let session_port = tftp::source_port(self.tftp_sequence);
                if op == tftp::OP_WRQ {
                    info!("net/tftp: serving wrq {} from {remote_ip:?}:{remote_port}", req.filename);
                    self.tftp.start_server_wrq(req.mode, remote_ip, remote_port, session_port, req.filename);
                    self.send_tftp_ack(tftp::BlockNo(0), remote_ip, remote_port, session_port, requester_mac);
                } else {
                    info!("net/tftp: rrq {} from {remote_ip:?}:{remote_port} (file serving is a board-integration concern)", req.filename);
                    self.tftp.start_server_rrq(req.mode, remote_ip, remote_port, session_port, req.filename);
                }
            }
            tftp::OP_DATA => {
                if !self.tftp.is_busy() || remote_ip != self.tftp.remote_ip || remote_port != self.tftp.remote_port {
                    trace!("net/tftp: data from non-session peer {remote_ip:?}:{remote_port}, dropping");
                    return;
                }
                let Some((block, raw_data)) = tftp::data_block(body) else {
                    return;
                };
                let (stored, chops) = if self.tftp.mode == tftp::Mode::NetAscii {
                    tftp::strip_netascii_cr(raw_data)
                } else {
                    (raw_data.to_vec(), 0)
                };
                let outcome = self.tftp.on_data(block, stored.len());
                if outcome == tftp::DataOutcome::Store {
                    self.tftp.add_chops(chops);
                }
                let local_port = self.tftp.local_port;
                match outcome {
                    tftp::DataOutcome::Store => {
                        self.send_tftp_ack(block, remote_ip, remote_port, local_port, requester_mac);
                    }
                    tftp::DataOutcome::DuplicateAck => {
                        let last = self.tftp.last_sent().to_vec();
                        self.send_udp(requester_mac, remote_ip, local_port, remote_port, &last);
                    }
                    tftp::DataOutcome::OutOfSequence => {}
                }
            }
            tftp::OP_ERROR => {
                if self.tftp.is_busy() && remote_ip == self.tftp.remote_ip {
                    self.tftp.abort_host_error("peer sent ERROR");
                }
            }
            other => {
                trace!("net/tftp: unhandled opcode {other} from {remote_ip:?}");
            }
        }
    }

    #[cfg(feature = "tftp")]
    fn send_tftp_ack(&mut self, block: tftp::BlockNo, remote_ip: [u8; 4], remote_port: u16, local_port: u16, requester_mac: [u8; 6]) {
        let mut buf = [0u8; 4];
        let len = tftp::build_ack(&mut buf, block);
        self.tftp.record_sent(&buf[..len]);
        self.send_udp(requester_mac, remote_ip, local_port, remote_port, &buf[..len]);
    }

    #[cfg(feature = "tftp")]
    fn send_tftp_error(&mut self, remote_ip: [u8; 4], remote_port: u16, local_port: u16, requester_mac: [u8; 6], code: u16, message: &str) {
        let mut buf = [0u8; 64];
        let len = tftp::build_error(&mut buf, code, message);
        self.send_udp(requester_mac, remote_ip, local_port, remote_port, &buf[..len]);
    }

    #[cfg(feature = "dhcp")]
    fn handle_dhcp_packet(&mut self, body: &[u8], requester_mac: [u8; 6]) {
        let Some(fixed) = dhcp::parse_fixed(body) else {
            trace!("net/dhcp: short packet, dropping");
            return;
        };
        if fixed.xid != self.dhcp.xid {
            trace!("net/dhcp: xid mismatch ({} != {}), dropping", fixed.xid, self.dhcp.xid);
            return;
        }
        match dhcp::message_type(body) {
            Some(dhcp::MSG_OFFER) => {
                debug!("net/dhcp: offer of {:?} from {:?}", fixed.your_ip, fixed.server_ip);
                self.dhcp.on_offer(&fixed);
                if self.dhcp.state == dhcp::State::Request {
                    let mut buf = [0u8; 300];
                    let len = dhcp::build_request(&mut buf, self.dhcp.xid, self.dhcp.mac, self.dhcp.offered_ip, self.dhcp.server_id);
                    self.send_udp(eth::BROADCAST, ip::BROADCAST, dhcp::CLIENT_PORT, dhcp::SERVER_PORT, &buf[..len]);
                }
            }
            Some(dhcp::MSG_ACK) => {
                let lease = dhcp::parse_ack(body, None);
                info!("net/dhcp: ack, bound to {:?}", lease.ip_addr);
                self.dhcp.on_ack();
                self.local_ip = lease.ip_addr;
                if let Some(mask) = lease.netmask {
                    self.netmask = mask;
                }
                if let Some(gw) = lease.gateway {
                    self.gateway = Some(gw);
                }
            }
            Some(dhcp::MSG_NAK) => {
                warn!("net/dhcp: server sent nak, restarting negotiation");
                self.dhcp.on_nak_or_giveup();
            }
            other => {
                trace!("net/dhcp: ignoring message type {other:?} from {requester_mac:?}");
            }
        }
    }

    #[cfg(feature = "dns")]
    fn handle_dns_response(&mut self, body: &[u8]) {
        if !dns::is_response(body) {
            return;
        }
        if dns::question_count(body) == 0 || dns::answer_count(body) == 0 {
            debug!("net/dns: response carries no answers, ignoring");
            return;
        }
        let Some(question_end) = dns::skip_name(body, 12) else {
            return;
        };
        let answer_off = question_end + 4; // qtype + qclass
        let Some(name) = dns::read_name(body, 12) else {
            return;
        };
        match dns::first_answer_address(body, answer_off) {
            Some(addr) => {
                debug!("net/dns: {name} resolves to {addr:?}");
                self.dns_cache.insert(&name, addr);
            }
            None => {
                debug!("net/dns: response for {name} carried no usable a-record");
            }
        }
    }

    /// Respond to an mDNS query matching our own [`NetStack::hostname`]
    /// (spec.md §4.H "mDNS responder"); any other question is ignored.
    #[cfg(feature = "dns")]
    fn handle_mdns_packet(&mut self, remote_ip: [u8; 4], remote_port: u16, body: &[u8], requester_mac: [u8; 6]) {
        if dns::is_response(body) {
            self.handle_dns_response(body);
            return;
        }
        if self.hostname.is_empty() || dns::question_count(body) == 0 {
            return;
        }
        let Some(name) = dns::read_name(body, 12) else {
            return;
        };
        if name != self.hostname {
            trace!("net/mdns: query for {name}, not us ({})", self.hostname);
            return;
        }
        let Some(id) = dns::id(body) else { return };
        let hostname = self.hostname.clone();
        let local_ip = self.local_ip;
        let mut buf = [0u8; 64 + 16];
        let len = dns::build_mdns_response(&mut buf, id, &hostname, local_ip);
        debug!("net/mdns: answering query for {hostname}");
        self.send_udp(dns::MDNS_MAC, dns::MDNS_GROUP, dns::MDNS_PORT, remote_port, &buf[..len]);
        let _ = (remote_ip, requester_mac);
    }

    #[cfg(feature = "remote-cmd")]
    fn handle_remote_cmd_packet(&mut self, remote_ip: [u8; 4], body: &[u8]) {
        let (dispatch, command) = remote_cmd::classify(body);
        let command = remote_cmd::strip_silent(command);
        let Ok(text) = core::str::from_utf8(command) else {
            warn!("net/remote_cmd: non-utf8 command from {remote_ip:?}, dropping");
            return;
        };
        match dispatch {
            remote_cmd::Dispatch::Immediate => {
                debug!("net/remote_cmd: immediate command {text:?} from {remote_ip:?}");
            }
            remote_cmd::Dispatch::Deferred => {
                debug!("net/remote_cmd: queuing deferred command {text:?} from {remote_ip:?}");
                self.remote_cmd_queue.push(command);
            }
        }
    }
}
