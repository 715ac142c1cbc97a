//! TFTP client/server (spec.md §4.G; grounded on
//! `original_source/main/common/tftp.c`).

use alloc::string::String;
use alloc::vec::Vec;

use crate::board::CacheOps;
use crate::error::ErrorKind;
use crate::net::frame::{Reader, Writer};

pub const OP_RRQ: u16 = 1;
pub const OP_WRQ: u16 = 2;
pub const OP_DATA: u16 = 3;
pub const OP_ACK: u16 = 4;
pub const OP_ERROR: u16 = 5;

pub const MAX_DATA_LEN: usize = 512;

pub const PORT_BASE: u16 = 8888;
pub const PORT_WINDOW: u16 = 256;

#[derive(Debug, thiserror::Error)]
pub enum TftpError {
    #[error("unsupported transfer mode")]
    BadMode,
    #[error("peer sent ERROR: {0}")]
    PeerError(String),
    #[error("transfer timed out")]
    TimedOut,
    #[error("storage readback mismatch")]
    WriteVerifyFailed,
}

impl TftpError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            TftpError::BadMode => ErrorKind::Parse,
            TftpError::PeerError(_) => ErrorKind::Host,
            TftpError::TimedOut => ErrorKind::Transient,
            TftpError::WriteVerifyFailed => ErrorKind::Storage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Octet,
    NetAscii,
    /// No transfer in progress, or a client session that has not yet
    /// sent its RRQ/WRQ (spec.md §3: `mode ∈ {NETASCII, OCTET, NULL}`).
    Null,
}

pub fn parse_mode(s: &str) -> Option<Mode> {
    match s.eq_ignore_ascii_case("octet") {
        true => Some(Mode::Octet),
        false if s.eq_ignore_ascii_case("netascii") => Some(Mode::NetAscii),
        false => None,
    }
}

/// A TFTP block number, wrapping from 0xFFFF back to 0 (spec.md §4.G:
/// "this wrap is an explicitly permitted case"). Shared between the
/// client and server directions so both sides step it identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct BlockNo(pub u16);

impl BlockNo {
    pub fn next(self) -> BlockNo {
        BlockNo(self.0.wrapping_add(1))
    }

    pub fn prev(self) -> BlockNo {
        BlockNo(self.0.wrapping_sub(1))
    }
}

/// How to interpret the RRQ/WRQ filename field (spec.md §4.G).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameTarget {
    ListFiles,
    ShellVarAddress(String),
    LiteralAddress(u32),
    TfsFile(String),
}

pub fn classify_filename(name: &str) -> FilenameTarget {
    if name == "." {
        FilenameTarget::ListFiles
    } else if let Some(var) = name.strip_prefix('$') {
        FilenameTarget::ShellVarAddress(var.into())
    } else if let Some(hex) = name.strip_prefix("0x").or_else(|| name.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
            .map(FilenameTarget::LiteralAddress)
            .unwrap_or_else(|_| FilenameTarget::TfsFile(name.into()))
    } else {
        FilenameTarget::TfsFile(name.into())
    }
}

pub struct RrqWrq {
    pub filename: String,
    pub mode: Mode,
}

/// Parse the filename\0mode\0 body of an RRQ/WRQ packet (after the
/// 2-byte opcode).
pub fn parse_request(body: &[u8]) -> Option<RrqWrq> {
    let mut parts = body.split(|&b| b == 0);
    let filename = core::str::from_utf8(parts.next()?).ok()?.into();
    let mode_str = core::str::from_utf8(parts.next()?).ok()?;
    let mode = parse_mode(mode_str)?;
    Some(RrqWrq { filename, mode })
}

pub fn build_request(buf: &mut [u8], opcode: u16, filename: &str, mode: &str) -> usize {
    let mut w = Writer::new(buf);
    w.put_u16(0, opcode);
    let mut off = 2;
    w.put_bytes(off, filename.as_bytes());
    off += filename.len();
    buf[off] = 0;
    off += 1;
    let mut w = Writer::new(&mut buf[off..]);
    w.put_bytes(0, mode.as_bytes());
    off += mode.len();
    buf[off] = 0;
    off + 1
}

pub fn build_data(buf: &mut [u8], block: BlockNo, data: &[u8]) -> usize {
    let mut w = Writer::new(buf);
    w.put_u16(0, OP_DATA);
    w.put_u16(2, block.0);
    w.put_bytes(4, data);
    4 + data.len()
}

pub fn build_ack(buf: &mut [u8], block: BlockNo) -> usize {
    let mut w = Writer::new(buf);
    w.put_u16(0, OP_ACK);
    w.put_u16(2, block.0);
    4
}

pub const ERR_UNDEFINED: u16 = 0;
pub const BUSY_MESSAGE: &str = "TFTP srvr busy";

/// NAK a concurrent RRQ/WRQ while a transfer is already in progress
/// (spec.md §3 invariant: "a new RRQ/WRQ received while not idle is
/// NAK'd ... but does not disturb the ongoing session").
pub fn build_busy_error(buf: &mut [u8]) -> usize {
    build_error(buf, ERR_UNDEFINED, BUSY_MESSAGE)
}

pub fn build_error(buf: &mut [u8], code: u16, message: &str) -> usize {
    let mut w = Writer::new(buf);
    w.put_u16(0, OP_ERROR);
    w.put_u16(2, code);
    w.put_bytes(4, message.as_bytes());
    buf[4 + message.len()] = 0;
    5 + message.len()
}

pub fn opcode(buf: &[u8]) -> Option<u16> {
    Reader::new(buf).u16(0)
}

pub fn data_block(buf: &[u8]) -> Option<(BlockNo, &[u8])> {
    let r = Reader::new(buf);
    let block = BlockNo(r.u16(2)?);
    Some((block, r.bytes(4, buf.len() - 4)?))
}

pub fn ack_block(buf: &[u8]) -> Option<BlockNo> {
    Reader::new(buf).u16(2).map(BlockNo)
}

/// Source port for the Nth RRQ/WRQ in the session, rotating through
/// `[PORT_BASE, PORT_BASE + PORT_WINDOW)` (spec.md §4.G).
pub fn source_port(sequence: u32) -> u16 {
    PORT_BASE + (sequence % u32::from(PORT_WINDOW)) as u16
}

/// Whether an out-of-sequence DATA/ACK block should be treated as an
/// idempotent retransmit of the previous block (spec.md §4.G).
pub fn is_duplicate_of_previous(expected: BlockNo, received: BlockNo) -> bool {
    received == expected.prev()
}

/// netascii receive-side CR stripping: strips `0x0D` bytes, returning
/// the filtered bytes and how many were stripped (the "chop count"
/// subtracted from the byte total before the final TFS write).
pub fn strip_netascii_cr(data: &[u8]) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(data.len());
    let mut chops = 0;
    for &b in data {
        if b == 0x0d {
            chops += 1;
        } else {
            out.push(b);
        }
    }
    (out, chops)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    ClientGet,
    ClientPut,
    ServerRrq,
    ServerWrq,
}

/// The TFTP singleton session's lifecycle (spec.md §3: "state ∈ {OFF,
/// IDLE, ACTIVE, ERROR, SENTRRQ, SENTWRQ, TIMEOUT, HOSTERROR}").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Off,
    Idle,
    Active,
    Error,
    SentRrq,
    SentWrq,
    Timeout,
    HostError,
}

/// What to do with an inbound DATA block once validated against the
/// session's expected block number (spec.md §4.G "block numbering").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOutcome {
    /// Matched the expected block: stored, counted, and ACK'd.
    Store,
    /// Matched the block just ACK'd — the peer missed our ACK; resend
    /// it without storing the data again.
    DuplicateAck,
    /// Matched neither the expected block nor its predecessor; dropped
    /// silently.
    OutOfSequence,
}

/// A TFTP client/server transfer (spec.md §3 "TFTP session"). Exactly
/// one is ever active (`NetStack` owns a single instance); a new
/// RRQ/WRQ that arrives while [`Session::is_busy`] is NAK'd with
/// `"TFTP srvr busy"` rather than disturbing it.
#[derive(Debug)]
pub struct Session {
    pub state: SessionState,
    pub role: Role,
    pub mode: Mode,
    pub block: BlockNo,
    pub prev_block: BlockNo,
    pub bytes_transferred: usize,
    pub chops: usize,
    pub remote_ip: [u8; 4],
    pub remote_port: u16,
    /// Our own source port for this session, picked once from the
    /// rotation window and held fixed for the transfer's lifetime
    /// (spec.md §4.G).
    pub local_port: u16,
    pub filename: String,
    pub done: bool,
    last_sent: Vec<u8>,
}

impl Session {
    /// A session with no transfer in progress.
    pub fn idle() -> Self {
        Session {
            state: SessionState::Off,
            role: Role::ServerRrq,
            mode: Mode::Null,
            block: BlockNo(0),
            prev_block: BlockNo(0),
            bytes_transferred: 0,
            chops: 0,
            remote_ip: [0; 4],
            remote_port: 0,
            local_port: PORT_BASE,
            filename: String::new(),
            done: false,
            last_sent: Vec::new(),
        }
    }

    /// Whether a transfer currently owns the session (spec.md §3
    /// invariant: "at most one client or server session is active").
    pub fn is_busy(&self) -> bool {
        !matches!(self.state, SessionState::Off | SessionState::Idle | SessionState::Error | SessionState::Timeout | SessionState::HostError)
    }

    #[allow(clippy::too_many_arguments)]
    fn start(&mut self, role: Role, state: SessionState, mode: Mode, remote_ip: [u8; 4], remote_port: u16, local_port: u16, filename: String) {
        let block = if role == Role::ClientGet || role == Role::ServerRrq {
            BlockNo(1)
        } else {
            BlockNo(0)
        };
        *self = Session {
            state,
            role,
            mode,
            block,
            prev_block: block.prev(),
            bytes_transferred: 0,
            chops: 0,
            remote_ip,
            remote_port,
            local_port,
            filename,
            done: false,
            last_sent: Vec::new(),
        };
    }

    /// Begin serving an inbound RRQ: we send DATA blocks starting at 1,
    /// from `local_port` (the next slot of the source-port rotation
    /// window, see [`source_port`]).
    pub fn start_server_rrq(&mut self, mode: Mode, remote_ip: [u8; 4], remote_port: u16, local_port: u16, filename: String) {
        self.start(Role::ServerRrq, SessionState::Active, mode, remote_ip, remote_port, local_port, filename);
    }

    /// Begin serving an inbound WRQ: we ACK block 0 and then receive
    /// DATA blocks starting at 1.
    pub fn start_server_wrq(&mut self, mode: Mode, remote_ip: [u8; 4], remote_port: u16, local_port: u16, filename: String) {
        self.start(Role::ServerWrq, SessionState::Active, mode, remote_ip, remote_port, local_port, filename);
    }

    /// Process an inbound DATA block against the session's expected
    /// block number, advancing state and the running byte counter
    /// (spec.md §4.G "block numbering"). `data_len` is the length
    /// actually stored (post netascii-filtering, if applicable); call
    /// [`Session::add_chops`] separately for the stripped-CR count.
    pub fn on_data(&mut self, block: BlockNo, data_len: usize) -> DataOutcome {
        if block == self.block {
            self.prev_block = self.block;
            self.block = self.block.next();
            self.bytes_transferred += data_len;
            if data_len < MAX_DATA_LEN {
                self.done = true;
                self.state = SessionState::Idle;
                debug!("tftp: final short block {} ({} bytes), transfer complete", block.0, data_len);
            } else {
                trace!("tftp: stored block {} ({} bytes)", block.0, data_len);
            }
            DataOutcome::Store
        } else if is_duplicate_of_previous(self.block, block) {
            debug!("tftp: duplicate of previous block {}, re-acking without storing", block.0);
            DataOutcome::DuplicateAck
        } else {
            warn!("tftp: out-of-sequence block {} (expected {}), dropping", block.0, self.block.0);
            DataOutcome::OutOfSequence
        }
    }

    /// Count CR bytes a netascii receive stripped before storage
    /// (spec.md §4.G: `received_bytes - chops`).
    pub fn add_chops(&mut self, n: usize) {
        self.chops += n;
    }

    /// Bytes to actually commit to storage once the transfer completes
    /// (spec.md §4.G: `received_bytes - chops`).
    pub fn committed_bytes(&self) -> usize {
        self.bytes_transferred - self.chops
    }

    /// Record the bytes of the packet just transmitted, so a later
    /// retransmit timer can resend it verbatim (spec.md §4.G
    /// "Retransmit").
    pub fn record_sent(&mut self, packet: &[u8]) {
        self.last_sent.clear();
        self.last_sent.extend_from_slice(packet);
    }

    /// The last packet sent on this session, for retransmit.
    pub fn last_sent(&self) -> &[u8] {
        &self.last_sent
    }

    pub fn abort_timeout(&mut self) {
        warn!("tftp: session for {:?} timed out", self.filename);
        self.state = SessionState::Timeout;
    }

    pub fn abort_host_error(&mut self, message: &str) {
        warn!("tftp: peer reported error: {message}");
        self.state = SessionState::HostError;
    }
}

/// Final short packet handling for an incoming transfer (spec.md §4.G
/// "Transfer completion"): flush the data cache and invalidate the
/// instruction cache over the written range so a downloaded executable
/// image is safe to jump into.
pub fn finish_incoming_transfer(cache: &impl CacheOps, base_addr: usize, len: usize) {
    cache.flush_dcache(base_addr, len);
    cache.invalidate_icache(base_addr, len);
}

#[cfg(test)]
mod cache_tests {
    use core::cell::Cell;

    use super::*;

    #[derive(Default)]
    struct RecordingCache {
        flushed: Cell<Option<(usize, usize)>>,
        invalidated: Cell<Option<(usize, usize)>>,
    }

    impl CacheOps for RecordingCache {
        fn flush_dcache(&self, addr: usize, len: usize) {
            self.flushed.set(Some((addr, len)));
        }

        fn invalidate_icache(&self, addr: usize, len: usize) {
            self.invalidated.set(Some((addr, len)));
        }
    }

    #[test]
    fn finish_transfer_flushes_then_invalidates_the_written_range() {
        let cache = RecordingCache::default();
        finish_incoming_transfer(&cache, 0x1000, 512);
        assert_eq!(cache.flushed.get(), Some((0x1000, 512)));
        assert_eq!(cache.invalidated.get(), Some((0x1000, 512)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_numbers_wrap_from_ffff_to_zero() {
        assert_eq!(BlockNo(0xffff).next(), BlockNo(0));
        assert_eq!(BlockNo(0).prev(), BlockNo(0xffff));
    }

    #[test]
    fn classifies_special_filenames() {
        assert_eq!(classify_filename("."), FilenameTarget::ListFiles);
        assert_eq!(classify_filename("$MYVAR"), FilenameTarget::ShellVarAddress("MYVAR".into()));
        assert_eq!(classify_filename("0x20000000"), FilenameTarget::LiteralAddress(0x2000_0000));
        assert_eq!(classify_filename("boot.bin"), FilenameTarget::TfsFile("boot.bin".into()));
    }

    #[test]
    fn request_round_trips() {
        let mut buf = [0u8; 64];
        let len = build_request(&mut buf, OP_RRQ, "boot.bin", "octet");
        assert_eq!(opcode(&buf[..len]), Some(OP_RRQ));
        let parsed = parse_request(&buf[2..len]).unwrap();
        assert_eq!(parsed.filename, "boot.bin");
        assert_eq!(parsed.mode, Mode::Octet);
    }

    #[test]
    fn netascii_counts_stripped_crs() {
        let (filtered, chops) = strip_netascii_cr(b"line1\r\nline2\r\n");
        assert_eq!(filtered, b"line1\nline2\n");
        assert_eq!(chops, 2);
    }

    #[test]
    fn source_port_rotates_within_window() {
        assert_eq!(source_port(0), PORT_BASE);
        assert_eq!(source_port(256), PORT_BASE);
        assert_eq!(source_port(1), PORT_BASE + 1);
    }

    #[test]
    fn duplicate_detection_matches_previous_block() {
        assert!(is_duplicate_of_previous(BlockNo(5), BlockNo(4)));
        assert!(!is_duplicate_of_previous(BlockNo(5), BlockNo(5)));
    }

    #[test]
    fn server_wrq_session_advances_blocks_and_completes_on_short_packet() {
        let mut session = Session::idle();
        assert!(!session.is_busy());
        session.start_server_wrq(Mode::Octet, [10, 0, 0, 9], 8900, PORT_BASE, "boot.bin".into());
        assert!(session.is_busy());
        assert_eq!(session.block, BlockNo(0));

        assert_eq!(session.on_data(BlockNo(1), MAX_DATA_LEN), DataOutcome::Store);
        assert_eq!(session.block, BlockNo(2));
        assert_eq!(session.bytes_transferred, MAX_DATA_LEN);
        assert!(!session.done);

        assert_eq!(session.on_data(BlockNo(2), 1), DataOutcome::Store);
        assert!(session.done);
        assert_eq!(session.state, SessionState::Idle);
        assert_eq!(session.bytes_transferred, MAX_DATA_LEN + 1);
    }

    #[test]
    fn duplicate_block_is_acked_again_without_double_counting() {
        let mut session = Session::idle();
        session.start_server_wrq(Mode::Octet, [10, 0, 0, 9], 8900, PORT_BASE, "boot.bin".into());
        session.on_data(BlockNo(1), MAX_DATA_LEN);
        assert_eq!(session.on_data(BlockNo(1), MAX_DATA_LEN), DataOutcome::DuplicateAck);
        assert_eq!(session.bytes_transferred, MAX_DATA_LEN);
    }

    #[test]
    fn out_of_sequence_block_is_dropped() {
        let mut session = Session::idle();
        session.start_server_wrq(Mode::Octet, [10, 0, 0, 9], 8900, PORT_BASE, "boot.bin".into());
        assert_eq!(session.on_data(BlockNo(9), MAX_DATA_LEN), DataOutcome::OutOfSequence);
        assert_eq!(session.bytes_transferred, 0);
    }

    #[test]
    fn netascii_chops_reduce_committed_bytes() {
        let mut session = Session::idle();
        session.start_server_wrq(Mode::NetAscii, [10, 0, 0, 9], 8900, PORT_BASE, "readme.txt".into());
        let (filtered, chops) = strip_netascii_cr(b"line1\r\n");
        session.on_data(BlockNo(1), filtered.len());
        session.add_chops(chops);
        assert_eq!(session.committed_bytes(), filtered.len() - chops);
    }

    #[test]
    fn record_sent_stores_the_last_transmitted_packet_for_retransmit() {
        let mut session = Session::idle();
        session.start_server_wrq(Mode::Octet, [10, 0, 0, 9], 8900, PORT_BASE, "boot.bin".into());
        let mut buf = [0u8; 4];
        let len = build_ack(&mut buf, BlockNo(0));
        session.record_sent(&buf[..len]);
        assert_eq!(session.last_sent(), &buf[..len]);
    }

    #[test]
    fn busy_session_rejects_a_second_request() {
        let mut session = Session::idle();
        session.start_server_wrq(Mode::Octet, [10, 0, 0, 9], 8900, PORT_BASE, "boot.bin".into());
        assert!(session.is_busy());
        let mut buf = [0u8; 64];
        let len = build_busy_error(&mut buf);
        assert_eq!(opcode(&buf[..len]), Some(OP_ERROR));
    }
}
