// Integer codecs and stream helpers for ID3v2 data

use std::io::{self, Read};

/// Largest value a 28-bit synchsafe integer can hold
pub const SYNCHSAFE_MAX: u32 = (1 << 28) - 1;

/// Decode a synchsafe integer (7 bits per byte, most significant first)
pub fn decode_synchsafe28(bytes: [u8; 4]) -> u32 {
    ((bytes[0] as u32 & 0x7F) << 21)
        | ((bytes[1] as u32 & 0x7F) << 14)
        | ((bytes[2] as u32 & 0x7F) << 7)
        | (bytes[3] as u32 & 0x7F)
}

/// Encode a value as a synchsafe integer. Returns `None` above 28 bits.
pub fn encode_synchsafe28(value: u32) -> Option<[u8; 4]> {
    if value > SYNCHSAFE_MAX {
        return None;
    }

    Some([
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ])
}

/// Read big-endian 16-bit integer at `offset`
pub fn decode_be16(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Read big-endian 32-bit integer at `offset`
pub fn decode_be32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
///
/// Returns the number of bytes actually read. Unlike `read_exact`, a short
/// stream is reported through the count instead of an error so callers can
/// treat it as "not present".
pub fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
