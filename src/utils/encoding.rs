// String codecs for ID3v2.3 text payloads

use encoding_rs::{mem, UTF_16BE, UTF_16LE};

use crate::error::{Id3Error, Result};

/// Text encoding marker preceding each ID3v2.3 string payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEncoding {
    /// ISO-8859-1, NUL terminated
    Latin1 = 0,
    /// UTF-16 with optional byte-order mark, NUL16 terminated
    Utf16 = 1,
}

impl StringEncoding {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(StringEncoding::Latin1),
            1 => Ok(StringEncoding::Utf16),
            other => Err(Id3Error::invalid(format!(
                "unknown string encoding: {other}"
            ))),
        }
    }

    pub fn marker(self) -> u8 {
        self as u8
    }

    /// Narrowest encoding able to carry every one of `texts` losslessly
    pub fn for_texts(texts: &[&str]) -> Self {
        if texts.iter().all(|t| mem::is_str_latin1(t)) {
            StringEncoding::Latin1
        } else {
            StringEncoding::Utf16
        }
    }
}

/// Read a single-byte string starting at `offset`.
///
/// Returns the string and the offset just past its terminator, or the end of
/// `buf` when no terminator exists and none is required.
pub fn read_latin1(buf: &[u8], offset: usize, require_terminator: bool) -> Result<(String, usize)> {
    let start = offset.min(buf.len());
    let rest = &buf[start..];

    match rest.iter().position(|&b| b == 0) {
        Some(len) => Ok((mem::decode_latin1(&rest[..len]).into_owned(), start + len + 1)),
        None if require_terminator => Err(Id3Error::invalid("missing string terminator")),
        None => Ok((mem::decode_latin1(rest).into_owned(), buf.len())),
    }
}

/// Read a UTF-16 string starting at `offset`, scanning in 2-byte steps.
///
/// A leading `FF FE` or `FE FF` selects little or big endian and is stripped;
/// without a BOM the text is read as little endian.
pub fn read_utf16(buf: &[u8], offset: usize, require_terminator: bool) -> Result<(String, usize)> {
    let start = offset.min(buf.len());
    let rest = &buf[start..];

    match rest.chunks_exact(2).position(|unit| unit == [0, 0]) {
        Some(units) => {
            let end = units * 2;
            Ok((decode_utf16(&rest[..end]), start + end + 2))
        }
        None if require_terminator => Err(Id3Error::invalid("missing string terminator")),
        None => Ok((decode_utf16(rest), buf.len())),
    }
}

fn decode_utf16(bytes: &[u8]) -> String {
    let (encoding, body) = match bytes {
        [0xFF, 0xFE, body @ ..] => (UTF_16LE, body),
        [0xFE, 0xFF, body @ ..] => (UTF_16BE, body),
        _ => (UTF_16LE, bytes),
    };
    // a dangling odd byte is not part of any code unit
    let body = &body[..body.len() & !1];
    encoding.decode_without_bom_handling(body).0.into_owned()
}

/// Read a string with the codec selected by `encoding`
pub fn read_string(
    encoding: StringEncoding,
    buf: &[u8],
    offset: usize,
    require_terminator: bool,
) -> Result<(String, usize)> {
    match encoding {
        StringEncoding::Latin1 => read_latin1(buf, offset, require_terminator),
        StringEncoding::Utf16 => read_utf16(buf, offset, require_terminator),
    }
}

/// Encode text as ISO-8859-1. Characters above U+00FF are replaced.
pub fn encode_latin1(text: &str, add_terminator: bool) -> Vec<u8> {
    let mut out = mem::encode_latin1_lossy(text).into_owned();
    if add_terminator {
        out.push(0);
    }
    out
}

/// Encode text as little-endian UTF-16
pub fn encode_utf16(text: &str, add_bom: bool, add_terminator: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2 + 4);
    if add_bom {
        out.extend_from_slice(&[0xFF, 0xFE]);
    }
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    if add_terminator {
        out.extend_from_slice(&[0, 0]);
    }
    out
}

/// Encode a string with the codec selected by `encoding`
pub fn encode_string(encoding: StringEncoding, text: &str, add_terminator: bool) -> Vec<u8> {
    match encoding {
        StringEncoding::Latin1 => encode_latin1(text, add_terminator),
        StringEncoding::Utf16 => encode_utf16(text, true, add_terminator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_marker_is_rejected() {
        let err = StringEncoding::from_byte(3).unwrap_err();
        assert!(matches!(err, Id3Error::InvalidFormat(_)));
    }

    #[test]
    fn latin1_stops_at_terminator() {
        let buf = b"abc\0def";
        let (s, next) = read_latin1(buf, 0, true).unwrap();
        assert_eq!(s, "abc");
        assert_eq!(next, 4);

        let (s, next) = read_latin1(buf, next, false).unwrap();
        assert_eq!(s, "def");
        assert_eq!(next, buf.len());
    }

    #[test]
    fn latin1_high_bytes_map_directly() {
        let (s, _) = read_latin1(&[0x63, 0x61, 0x66, 0xE9], 0, false).unwrap();
        assert_eq!(s, "café");
    }

    #[test]
    fn latin1_missing_required_terminator() {
        assert!(read_latin1(b"abc", 0, true).is_err());
    }

    #[test]
    fn latin1_empty_at_end_of_buffer() {
        let (s, next) = read_latin1(b"abc", 3, false).unwrap();
        assert_eq!(s, "");
        assert_eq!(next, 3);
    }

    #[test]
    fn utf16_little_endian_with_bom() {
        let buf = [0xFF, 0xFE, b'h', 0, b'i', 0, 0, 0, b'x', 0];
        let (s, next) = read_utf16(&buf, 0, true).unwrap();
        assert_eq!(s, "hi");
        assert_eq!(next, 8);
    }

    #[test]
    fn utf16_big_endian_with_bom() {
        let buf = [0xFE, 0xFF, 0, b'h', 0, b'i'];
        let (s, next) = read_utf16(&buf, 0, false).unwrap();
        assert_eq!(s, "hi");
        assert_eq!(next, buf.len());
    }

    #[test]
    fn utf16_terminator_must_be_unit_aligned() {
        // 0x00 0x00 straddling two code units is not a terminator
        let buf = [0xFF, 0xFE, 0x01, 0x00, 0x00, 0x41, 0, 0];
        let (s, next) = read_utf16(&buf, 0, true).unwrap();
        assert_eq!(s, "\u{0001}\u{4100}");
        assert_eq!(next, 8);
    }

    #[test]
    fn utf16_missing_required_terminator() {
        assert!(read_utf16(&[0xFF, 0xFE, b'a', 0], 0, true).is_err());
    }

    #[test]
    fn utf16_encoder_writes_bom_and_terminator() {
        assert_eq!(encode_utf16("A", true, true), vec![0xFF, 0xFE, 0x41, 0, 0, 0]);
        assert_eq!(encode_utf16("A", false, false), vec![0x41, 0]);
    }

    #[test]
    fn utf16_non_latin_text_survives() {
        let text = "Ω≈ç√∫˜µ≤≥÷ 🎤💧";
        let bytes = encode_utf16(text, true, false);
        let (s, _) = read_utf16(&bytes, 0, false).unwrap();
        assert_eq!(s, text);
    }

    #[test]
    fn picks_narrowest_encoding() {
        assert_eq!(StringEncoding::for_texts(&["plain", "café"]), StringEncoding::Latin1);
        assert_eq!(StringEncoding::for_texts(&["plain", "Ω"]), StringEncoding::Utf16);
    }
}
