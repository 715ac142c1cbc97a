//! Capability traits a board integration supplies to the core.
//!
//! spec.md §1 calls these out as external collaborators: the per-CPU
//! reset/vector code, the flash driver, TFS, the UART register layer and
//! the line editor are never implemented here. Instead the core is
//! generic over small traits that a target provides one implementation
//! of, per the "function pointer tables" design note in spec.md §9.

use alloc::string::String;
use alloc::vec::Vec;

/// Monotonic tick source backing the elapsed timer (spec.md §4.A).
///
/// A target with a hardware timer implements this directly over its
/// register; a target without one implements it over a calibrated spin
/// loop. Either way the elapsed-timer math in [`crate::time`] is
/// identical.
pub trait TickSource {
    /// Ticks of this source per millisecond. Constant for the lifetime
    /// of the board (recalibrated loop counters still report a fixed
    /// value once calibration has run).
    fn ticks_per_ms(&self) -> u32;

    /// Read the free-running tick counter. May wrap at `u32::MAX`.
    fn read_ticks(&self) -> u32;
}

/// Instruction/data cache maintenance, used after a TFTP/XMODEM transfer
/// writes an executable image into RAM (spec.md §4.G, §4.M, §9).
pub trait CacheOps {
    fn flush_dcache(&self, addr: usize, len: usize);
    fn invalidate_icache(&self, addr: usize, len: usize);
}

/// Flash programming surface (spec.md §1's `AppFlashWrite`/`AppFlashErase`/
/// `sectorProtect`), used only by [`crate::board_info`].
pub trait FlashOps {
    fn erase_sector(&mut self, sector_base: usize) -> Result<(), FlashError>;
    fn write(&mut self, addr: usize, data: &[u8]) -> Result<(), FlashError>;
    fn protect_sector(&mut self, sector_base: usize, protect: bool) -> Result<(), FlashError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FlashError {
    #[error("flash write readback mismatch")]
    ReadbackMismatch,
    #[error("flash erase failed")]
    EraseFailed,
    #[error("address out of range for this device")]
    OutOfRange,
}

/// The file-abstraction interface TFS exposes to the core (spec.md §1,
/// GLOSSARY). The storage engine itself is out of scope; only this
/// narrow surface is specified.
pub trait TfsVolume {
    /// Returns the size of `name` if present.
    fn stat(&self, name: &str) -> Option<usize>;
    /// Reads the whole contents of `name`.
    fn read(&self, name: &str) -> Result<Vec<u8>, TfsError>;
    /// Adds (or replaces) `name` with `data`. `info` is the optional
    /// comma-separated flags/info string TFTP server-side RRQ/WRQ
    /// completion passes through (spec.md §4.G).
    fn add(&mut self, name: &str, data: &[u8], info: Option<&str>) -> Result<(), TfsError>;
    /// Lists file names, used by TFTP's `.` filename ("list files").
    fn list(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TfsError {
    #[error("file not found")]
    NotFound,
    #[error("storage is full")]
    Full,
    #[error("underlying storage write failed")]
    WriteFailed,
}

/// Ethernet frame buffer ownership (spec.md §3 "Ethernet frame buffers",
/// §5 "Shared resources"). A buffer returned by `get_xmit_buffer` must be
/// filled in place and handed back via `send_buffer`; it must not be
/// retained across other protocol calls.
pub trait NicDriver {
    /// Our own MAC address.
    fn mac_address(&self) -> [u8; 6];
    /// Acquire a transmit buffer of at least `len` bytes from the free
    /// pool. Returns `None` if the pool (`XBUFCNT`) is exhausted.
    fn get_xmit_buffer(&mut self, len: usize) -> Option<&mut [u8]>;
    /// Hand a filled transmit buffer (previously returned by
    /// `get_xmit_buffer`) to the driver for transmission of its first
    /// `len` bytes.
    fn send_buffer(&mut self, len: usize);
    /// Poll for at most one received frame. The returned slice is only
    /// valid until the next call to `poll_receive` or
    /// `get_xmit_buffer`; callers that need to retain data must copy it
    /// (spec.md §5).
    fn poll_receive(&mut self) -> Option<&[u8]>;
}

/// A serial byte stream, used by the XMODEM/YMODEM engine and the
/// interactive console. The UART register layout itself is out of
/// scope (spec.md §1); this is the narrow polled interface the core
/// needs.
pub trait SerialPort {
    /// Non-blocking single-byte read.
    fn try_read(&mut self) -> Option<u8>;
    fn write(&mut self, byte: u8);
    fn write_bytes(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.write(*b);
        }
    }
}

/// The frame-buffer console's visible-window capability (spec.md §4.N,
/// §9 "Open questions": whether the base-pointer DMA register tolerates
/// mid-frame writes is target-specific). `NullFrameSink` always falls
/// back to the plain memcpy-scroll path.
pub trait FrameSink {
    /// Slide the visible base pointer forward by `rows` character rows
    /// worth of pixels, wrapping to 0 once a full frame has been
    /// advanced. Returns `false` if this target has no such register
    /// and the caller should use the memcpy fallback instead.
    fn advance_base(&mut self, rows: u32) -> bool;
}

/// Fallback [`FrameSink`] for targets without a slidable base pointer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFrameSink;

impl FrameSink for NullFrameSink {
    fn advance_base(&mut self, _rows: u32) -> bool {
        false
    }
}
