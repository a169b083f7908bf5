// ID3v2.3 tag header

use std::io::Read;

use crate::error::{Id3Error, Result};
use crate::utils::io::{decode_synchsafe28, encode_synchsafe28, read_up_to};

/// ID3v2 tag header structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub version: (u8, u8),
    pub flags: u8,
    /// Tag size excluding the 10-byte header
    pub size: u32,
}

impl TagHeader {
    pub const SIZE: usize = 10;
    pub const ID: [u8; 3] = *b"ID3";
    pub const VERSION: (u8, u8) = (3, 0);

    pub const FLAG_UNSYNC: u8 = 0x80;
    pub const FLAG_EXTENDED: u8 = 0x40;

    pub fn new(flags: u8, size: u32) -> Self {
        TagHeader {
            version: Self::VERSION,
            flags,
            size,
        }
    }

    /// Check for the `ID3` magic followed by version 3, revision 0
    pub fn matches(bytes: &[u8]) -> bool {
        bytes.len() >= 5
            && bytes[0..3] == Self::ID
            && (bytes[3], bytes[4]) == Self::VERSION
    }

    /// Parse a header, returning `None` when `bytes` do not start an ID3v2.3 tag
    pub fn probe(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE || !Self::matches(bytes) {
            return None;
        }

        Some(TagHeader {
            version: (bytes[3], bytes[4]),
            flags: bytes[5],
            size: decode_synchsafe28([bytes[6], bytes[7], bytes[8], bytes[9]]),
        })
    }

    /// Parse a header, failing on anything other than an ID3v2.3 tag
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::probe(bytes).ok_or_else(|| Id3Error::invalid("bad ID3 tag header"))
    }

    /// Read and parse the 10-byte header from `reader`
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buffer = [0u8; Self::SIZE];
        if read_up_to(reader, &mut buffer)? != Self::SIZE {
            return Err(Id3Error::invalid("bad ID3 tag header"));
        }
        Self::parse(&buffer)
    }

    pub fn unsynchronised(&self) -> bool {
        self.flags & Self::FLAG_UNSYNC != 0
    }

    pub fn has_extended_header(&self) -> bool {
        self.flags & Self::FLAG_EXTENDED != 0
    }

    /// Header plus body length in bytes
    pub fn total_size(&self) -> u64 {
        Self::SIZE as u64 + self.size as u64
    }

    pub fn to_bytes(&self) -> Result<[u8; 10]> {
        let size = encode_synchsafe28(self.size).ok_or_else(|| {
            Id3Error::invalid(format!("tag size {} exceeds 28 bits", self.size))
        })?;

        let mut out = [0u8; Self::SIZE];
        out[0..3].copy_from_slice(&Self::ID);
        out[3] = self.version.0;
        out[4] = self.version.1;
        out[5] = self.flags;
        out[6..10].copy_from_slice(&size);
        Ok(out)
    }
}
