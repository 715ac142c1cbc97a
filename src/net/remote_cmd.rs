//! Remote command channel (spec.md §4.I): a UDP port that carries
//! ASCII monitor commands, with deferred and immediate dispatch modes
//! and a line-buffered reply policy.

use alloc::string::String;
use alloc::vec::Vec;

pub const DEFERRED_SENTINEL: u8 = b'+';
pub const IMMEDIATE_SENTINEL: u8 = b'.';
pub const SILENT_SENTINEL: u8 = b'@';

pub const REPLY_LINE_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Deferred,
    Immediate,
}

/// Classify an incoming datagram body by its leading sentinel byte and
/// strip it, returning the command text that follows.
pub fn classify(body: &[u8]) -> (Dispatch, &[u8]) {
    match body.first() {
        Some(&IMMEDIATE_SENTINEL) => (Dispatch::Immediate, &body[1..]),
        _ => (Dispatch::Deferred, body),
    }
}

pub fn is_silent(command: &[u8]) -> bool {
    command.first() == Some(&SILENT_SENTINEL)
}

pub fn strip_silent(command: &[u8]) -> &[u8] {
    if is_silent(command) {
        &command[1..]
    } else {
        command
    }
}

/// A scratch slot for a command queued by [`Dispatch::Deferred`],
/// prefixed with the sentinel byte the poll loop checks for.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    pending: Option<Vec<u8>>,
}

impl DeferredQueue {
    pub fn push(&mut self, command: &[u8]) {
        let mut buf = Vec::with_capacity(command.len() + 1);
        buf.push(DEFERRED_SENTINEL);
        buf.extend_from_slice(command);
        self.pending = Some(buf);
    }

    pub fn take(&mut self) -> Option<Vec<u8>> {
        self.pending.take()
    }
}

/// Accumulates dispatcher output into a fixed-size line buffer,
/// flushing as a single datagram when full, on a newline, or when the
/// caller explicitly finishes (spec.md §4.I).
#[derive(Debug)]
pub struct ReplyLine {
    buf: Vec<u8>,
    flushed: Vec<Vec<u8>>,
    silent: bool,
}

impl ReplyLine {
    pub fn new(silent: bool) -> Self {
        ReplyLine {
            buf: Vec::with_capacity(REPLY_LINE_CAPACITY),
            flushed: Vec::new(),
            silent,
        }
    }

    pub fn write(&mut self, bytes: &[u8]) {
        if self.silent {
            return;
        }
        for &b in bytes {
            self.buf.push(b);
            if b == b'\n' || self.buf.len() >= REPLY_LINE_CAPACITY {
                self.flush();
            }
        }
    }

    fn flush(&mut self) {
        if !self.buf.is_empty() {
            self.flushed.push(core::mem::take(&mut self.buf));
        }
    }

    /// Call once the command has finished executing; flushes any
    /// partial line and returns every datagram to send.
    pub fn finish(mut self) -> Vec<Vec<u8>> {
        self.flush();
        self.flushed
    }
}

/// The client source IP/port, surfaced via `MONCMD_SRCIP`/`MONCMD_SRCPORT`.
#[derive(Debug, Clone, Copy)]
pub struct ClientAddr {
    pub ip: [u8; 4],
    pub port: u16,
}

pub fn client_env_vars(addr: ClientAddr) -> [(&'static str, String); 2] {
    [
        ("MONCMD_SRCIP", alloc::format!("{}.{}.{}.{}", addr.ip[0], addr.ip[1], addr.ip[2], addr.ip[3])),
        ("MONCMD_SRCPORT", alloc::format!("{}", addr.port)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_immediate_vs_deferred() {
        assert_eq!(classify(b".reset").0, Dispatch::Immediate);
        assert_eq!(classify(b"reset").0, Dispatch::Deferred);
    }

    #[test]
    fn silent_prefix_is_stripped() {
        assert!(is_silent(b"@set FOO=1"));
        assert_eq!(strip_silent(b"@set FOO=1"), b"set FOO=1");
    }

    #[test]
    fn reply_line_flushes_on_newline_and_on_finish() {
        let mut line = ReplyLine::new(false);
        line.write(b"hello\nworld");
        let flushed = line.finish();
        assert_eq!(flushed, alloc::vec![b"hello\n".to_vec(), b"world".to_vec()]);
    }

    #[test]
    fn silent_reply_line_suppresses_all_output() {
        let mut line = ReplyLine::new(true);
        line.write(b"hello\n");
        assert!(line.finish().is_empty());
    }
}
