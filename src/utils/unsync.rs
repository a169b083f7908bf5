// ID3v2 unsynchronisation

/// Remove the 0x00 stuffing bytes that follow each 0xFF.
///
/// `prev` tracks the previous input byte, including removed ones, so
/// `FF 00 00` decodes to `FF 00`.
pub fn remove_unsync(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut prev = 0u8;
    for &b in data {
        if b != 0 || prev != 0xFF {
            out.push(b);
        }
        prev = b;
    }
    out
}

/// Insert a 0x00 after every 0xFF so no false MPEG sync appears in the tag
pub fn apply_unsync(data: &[u8]) -> Vec<u8> {
    let extra = data.iter().filter(|&&b| b == 0xFF).count();
    let mut out = Vec::with_capacity(data.len() + extra);
    for &b in data {
        out.push(b);
        if b == 0xFF {
            out.push(0);
        }
    }
    out
}
