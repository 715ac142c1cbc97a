//! ARM Linux boot-tag list builder (spec.md supplemented feature;
//! grounded on `original_source/main/cpu/arm/ldatags.c`). Produces the
//! byte list a board integration installs at the address Linux expects
//! it (`r2` on entry); this crate never pokes memory directly, it only
//! assembles the tag bytes.

use alloc::vec::Vec;

use crate::error::ErrorKind;

const ATAG_NONE: u32 = 0x0000_0000;
const ATAG_CORE: u32 = 0x5441_0001;
const ATAG_MEM: u32 = 0x5441_0002;
const ATAG_RAMDISK: u32 = 0x5441_0004;
const ATAG_INITRD2: u32 = 0x5442_0005;
const ATAG_SERIAL: u32 = 0x5441_0006;
const ATAG_REVISION: u32 = 0x5441_0007;
const ATAG_CMDLINE: u32 = 0x5441_0009;

const PAGE_SIZE: u32 = 4096;
const PHYS_OFFSET: u32 = 0x2000_0000;
const MEM_SIZE: u32 = 0x01e0_0000;
const CMDLINE_MAX: usize = 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AtagsError {
    #[error("kernel command line too big ({0} > {1})")]
    CmdlineTooBig(usize, usize),
}

impl AtagsError {
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Parse
    }
}

/// The serial-number/MAC union tag: both interpretations share the same
/// 8 bytes, so only one is ever live at a time (setting one overwrites
/// the other, last write wins, matching `ldatags`' `-m` vs.
/// `serial_hi=`/`serial_lo=` precedence).
#[derive(Debug, Clone, Copy)]
struct SnoMac([u8; 8]);

impl Default for SnoMac {
    fn default() -> Self {
        SnoMac([0xff; 8])
    }
}

/// Builds the tag list in the original's fixed order: core, mem,
/// serial/mac, ramdisk, initrd, cmdline, revision, terminator.
#[derive(Debug, Clone)]
pub struct TagListBuilder {
    core_flags: u32,
    core_pgsize: u32,
    core_rootdev: u32,
    mem_size: u32,
    mem_start: u32,
    snomac: SnoMac,
    ramdisk_flags: u32,
    ramdisk_size: u32,
    ramdisk_start: u32,
    initrd_start: u32,
    initrd_size: u32,
    cmdline: alloc::string::String,
    revision: u32,
}

impl Default for TagListBuilder {
    fn default() -> Self {
        TagListBuilder {
            core_flags: 1,
            core_pgsize: PAGE_SIZE,
            core_rootdev: 0xff,
            mem_size: MEM_SIZE,
            mem_start: PHYS_OFFSET,
            snomac: SnoMac::default(),
            ramdisk_flags: 0,
            ramdisk_size: 0,
            ramdisk_start: 0,
            initrd_start: 0,
            initrd_size: 0,
            cmdline: alloc::string::String::new(),
            revision: 0,
        }
    }
}

impl TagListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn core(&mut self, flags: u32, pgsize: u32, rootdev: u32) -> &mut Self {
        self.core_flags = flags;
        self.core_pgsize = pgsize;
        self.core_rootdev = rootdev;
        self
    }

    pub fn mem(&mut self, size: u32, start: u32) -> &mut Self {
        self.mem_size = size;
        self.mem_start = start;
        self
    }

    /// Load the board's MAC address into the serial/mac union
    /// (`-m`/`ETHERADD`).
    pub fn mac(&mut self, mac: [u8; 6]) -> &mut Self {
        let mut bytes = [0u8; 8];
        bytes[..6].copy_from_slice(&mac);
        self.snomac = SnoMac(bytes);
        self
    }

    /// Set the serial number directly; overrides a previous `mac()`
    /// call (`serial_hi=`/`serial_lo=`).
    pub fn serial(&mut self, hi: u32, lo: u32) -> &mut Self {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&hi.to_le_bytes());
        bytes[4..].copy_from_slice(&lo.to_le_bytes());
        self.snomac = SnoMac(bytes);
        self
    }

    pub fn ramdisk(&mut self, flags: u32, size: u32, start: u32) -> &mut Self {
        self.ramdisk_flags = flags;
        self.ramdisk_size = size;
        self.ramdisk_start = start;
        self
    }

    pub fn initrd(&mut self, start: u32, size: u32) -> &mut Self {
        self.initrd_start = start;
        self.initrd_size = size;
        self
    }

    pub fn revision(&mut self, rev: u32) -> &mut Self {
        self.revision = rev;
        self
    }

    pub fn set_cmdline(&mut self, text: &str) -> Result<&mut Self, AtagsError> {
        if text.len() + 1 > CMDLINE_MAX {
            return Err(AtagsError::CmdlineTooBig(text.len(), CMDLINE_MAX - 1));
        }
        self.cmdline.clear();
        self.cmdline.push_str(text);
        Ok(self)
    }

    pub fn append_cmdline(&mut self, text: &str) -> Result<&mut Self, AtagsError> {
        if self.cmdline.len() + text.len() + 1 > CMDLINE_MAX {
            return Err(AtagsError::CmdlineTooBig(self.cmdline.len() + text.len(), CMDLINE_MAX - 1));
        }
        self.cmdline.push_str(text);
        Ok(self)
    }

    /// Assemble the full tag list as little-endian bytes (ARM's native
    /// order).
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push_word_tag(&mut out, ATAG_CORE, &[self.core_flags, self.core_pgsize, self.core_rootdev]);
        push_word_tag(&mut out, ATAG_MEM, &[self.mem_size, self.mem_start]);
        push_word_tag(
            &mut out,
            ATAG_SERIAL,
            &[u32::from_le_bytes(self.snomac.0[0..4].try_into().unwrap()), u32::from_le_bytes(self.snomac.0[4..8].try_into().unwrap())],
        );
        push_word_tag(&mut out, ATAG_RAMDISK, &[self.ramdisk_flags, self.ramdisk_size, self.ramdisk_start]);
        push_word_tag(&mut out, ATAG_INITRD2, &[self.initrd_start, self.initrd_size]);
        push_cmdline_tag(&mut out, &self.cmdline);
        push_word_tag(&mut out, ATAG_REVISION, &[self.revision]);
        push_word_tag(&mut out, ATAG_NONE, &[]);
        out
    }
}

fn push_word_tag(out: &mut Vec<u8>, id: u32, words: &[u32]) {
    let size_words = 2 + words.len() as u32;
    out.extend_from_slice(&size_words.to_le_bytes());
    out.extend_from_slice(&id.to_le_bytes());
    for word in words {
        out.extend_from_slice(&word.to_le_bytes());
    }
}

fn push_cmdline_tag(out: &mut Vec<u8>, cmdline: &str) {
    let mut payload = Vec::with_capacity(cmdline.len() + 4);
    payload.extend_from_slice(cmdline.as_bytes());
    payload.push(0);
    while payload.len() % 4 != 0 {
        payload.push(0);
    }
    let size_words = 2 + (payload.len() / 4) as u32;
    out.extend_from_slice(&size_words.to_le_bytes());
    out.extend_from_slice(&ATAG_CMDLINE.to_le_bytes());
    out.extend_from_slice(&payload);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn default_list_carries_defaults_and_ends_with_none_tag() {
        let tags = TagListBuilder::new().build();
        assert_eq!(read_u32(&tags, 4), ATAG_CORE);
        assert_eq!(read_u32(&tags, 8), 1);
        assert_eq!(read_u32(&tags, 12), PAGE_SIZE);
        assert_eq!(read_u32(&tags, 16), 0xff);
        assert_eq!(&tags[tags.len() - 8..tags.len() - 4], &2u32.to_le_bytes());
        assert_eq!(&tags[tags.len() - 4..], &ATAG_NONE.to_le_bytes());
    }

    #[test]
    fn mac_and_serial_share_the_same_slot_last_write_wins() {
        let mut builder = TagListBuilder::new();
        builder.mac([0, 1, 2, 3, 4, 5]);
        builder.serial(0x1111_1111, 0x2222_2222);
        let tags = builder.build();
        // core tag is 20 bytes (5 words), mem tag is 16 bytes (4 words);
        // serial tag header follows immediately after both.
        let serial_tag_start = 20 + 16;
        assert_eq!(read_u32(&tags, serial_tag_start), ATAG_SERIAL);
        assert_eq!(read_u32(&tags, serial_tag_start + 4), 0x1111_1111);
        assert_eq!(read_u32(&tags, serial_tag_start + 8), 0x2222_2222);
    }

    #[test]
    fn cmdline_is_nul_terminated_and_word_aligned() {
        let mut builder = TagListBuilder::new();
        builder.set_cmdline("console=ttyS0").unwrap();
        let tags = builder.build();
        let text = core::str::from_utf8(b"console=ttyS0").unwrap();
        let needle = tags.windows(text.len()).position(|w| w == text.as_bytes()).unwrap();
        assert_eq!(tags[needle + text.len()], 0);
    }

    #[test]
    fn oversized_cmdline_is_rejected() {
        let mut builder = TagListBuilder::new();
        let huge = "x".repeat(CMDLINE_MAX);
        assert!(builder.set_cmdline(&huge).is_err());
    }
}
