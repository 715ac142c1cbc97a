//! Board-neutral constants (spec.md §2, §4). A board integration may
//! override any field; the `Default` impl matches the constants found in
//! `original_source/` so the literal end-to-end scenarios of spec.md §8
//! hold with zero configuration.

/// Per-protocol retransmission tuning: `delay:giveup:max` (spec.md §4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetransmitTuning {
    pub delay_secs: u32,
    pub giveup: u32,
    pub max_delay_secs: u32,
}

impl RetransmitTuning {
    pub const DHCP: RetransmitTuning = RetransmitTuning {
        delay_secs: 4,
        giveup: 6,
        max_delay_secs: 64,
    };
    pub const TFTP: RetransmitTuning = RetransmitTuning {
        delay_secs: 2,
        giveup: 4,
        max_delay_secs: 8,
    };
    pub const ARP: RetransmitTuning = RetransmitTuning {
        delay_secs: 1,
        giveup: 0,
        max_delay_secs: 4,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Calibrated-loop ticks per second, used only when no hardware
    /// timer is present (spec.md §4.A).
    pub loops_per_second: u32,
    /// Capacity of the transmit buffer pool.
    pub xbufcnt: usize,
    /// Capacity of the receive buffer pool.
    pub rbufcnt: usize,
    /// Capacity of the ARP cache ring (spec.md §3).
    pub arp_cache_size: usize,
    /// Capacity of the DNS cache array (spec.md §3).
    pub dns_cache_size: usize,
    /// RFC 3927 link-local probe wait, milliseconds.
    pub announce_wait_ms: u32,
    /// Number of gratuitous ARPs sent once a link-local address is won.
    pub announce_num: u32,
    /// Spacing between those gratuitous ARPs, milliseconds.
    pub announce_interval_ms: u32,
    pub dhcp_tuning: RetransmitTuning,
    pub tftp_tuning: RetransmitTuning,
    pub arp_tuning: RetransmitTuning,
    /// Remote-command UDP port (spec.md §4.I).
    pub remote_cmd_port: u16,
    /// First source port of the TFTP rotation window (spec.md §4.G).
    pub tftp_port_base: u16,
    /// Width of the TFTP source-port rotation window.
    pub tftp_port_window: u16,
    /// `IP_TTL` used on outbound IP headers (spec.md §6).
    pub ip_ttl: u8,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            loops_per_second: 1_000_000,
            xbufcnt: 4,
            rbufcnt: 4,
            arp_cache_size: 16,
            dns_cache_size: 8,
            announce_wait_ms: 2000,
            announce_num: 2,
            announce_interval_ms: 2000,
            dhcp_tuning: RetransmitTuning::DHCP,
            tftp_tuning: RetransmitTuning::TFTP,
            arp_tuning: RetransmitTuning::ARP,
            remote_cmd_port: 777,
            tftp_port_base: 8888,
            tftp_port_window: 256,
            ip_ttl: 60,
        }
    }
}
