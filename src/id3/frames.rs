// ID3v2.3 frame definitions and the frame reader

use std::borrow::Cow;
use std::io::Read;

use flate2::read::DeflateDecoder;
use tracing::{debug, trace};

use crate::error::{Id3Error, Result};
use crate::utils::io::{decode_be16, decode_be32};

/// ID3v2.3 frame identifiers understood by the codec
pub mod frame_ids {
    pub const TITLE: &str = "TIT2"; // Title/songname/content description
    pub const ARTIST: &str = "TPE1"; // Lead performer(s)/Soloist(s)
    pub const ALBUM: &str = "TALB"; // Album/Movie/Show title
    pub const YEAR: &str = "TYER"; // Year
    pub const COMMENT: &str = "COMM"; // Comments
    pub const GENRE: &str = "TCON"; // Content type
    pub const TRACK: &str = "TRCK"; // Track number/Position in set
    pub const SUBTITLE: &str = "TIT3"; // Subtitle/Description refinement
    pub const ALBUM_ARTIST: &str = "TPE2"; // Band/orchestra/accompaniment
    pub const USER_TEXT: &str = "TXXX"; // User defined text information
    pub const PICTURE: &str = "APIC"; // Attached picture
}

/// A single frame sliced out of a tag body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: [u8; 4],
    /// Content size as stored in the frame header
    pub declared_size: u32,
    pub flags: u16,
    /// Frame content, already inflated when the frame was compressed
    pub content: Vec<u8>,
}

impl Frame {
    pub const HEADER_SIZE: usize = 10;
    pub const FLAG_COMPRESSED: u16 = 0x0080;

    pub fn id_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.id)
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & Self::FLAG_COMPRESSED != 0
    }
}

/// Read one frame at `offset`.
///
/// Returns `Ok(None)` at the end of the frame sequence: no more than a bare
/// 10-byte header left, zero padding, or a declared size running past the
/// end of `buf`.
/// The second tuple element is the number of bytes the frame occupies.
pub fn read_frame(buf: &[u8], offset: usize) -> Result<Option<(Frame, usize)>> {
    let remaining = buf.len().saturating_sub(offset);
    if remaining <= Frame::HEADER_SIZE {
        return Ok(None);
    }

    let header = &buf[offset..offset + Frame::HEADER_SIZE];
    let id = [header[0], header[1], header[2], header[3]];
    if id == [0; 4] {
        trace!(offset, "reached tag padding");
        return Ok(None);
    }

    let (Some(declared_size), Some(flags)) = (decode_be32(header, 4), decode_be16(header, 8)) else {
        return Ok(None);
    };

    let start = offset + Frame::HEADER_SIZE;
    let end = match start.checked_add(declared_size as usize) {
        Some(end) if end <= buf.len() => end,
        _ => {
            debug!(
                frame = %String::from_utf8_lossy(&id),
                declared_size,
                available = buf.len() - start,
                "frame overruns tag body, stopping"
            );
            return Ok(None);
        }
    };

    let raw = &buf[start..end];
    let content = if flags & Frame::FLAG_COMPRESSED != 0 {
        inflate(raw)?
    } else {
        raw.to_vec()
    };

    debug!(
        frame = %String::from_utf8_lossy(&id),
        declared_size,
        compressed = flags & Frame::FLAG_COMPRESSED != 0,
        "read frame"
    );

    let frame = Frame {
        id,
        declared_size,
        flags,
        content,
    };
    Ok(Some((frame, Frame::HEADER_SIZE + declared_size as usize)))
}

fn inflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len() * 2);
    DeflateDecoder::new(raw)
        .read_to_end(&mut out)
        .map_err(Id3Error::Decompression)?;
    Ok(out)
}

/// Iterator over the frames of a tag body.
///
/// Ends quietly on truncation; yields a single `Err` and stops on a
/// decompression failure.
pub struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> FrameReader<'a> {
    pub fn new(buf: &'a [u8], pos: usize) -> Self {
        FrameReader {
            buf,
            pos,
            done: false,
        }
    }
}

impl Iterator for FrameReader<'_> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match read_frame(self.buf, self.pos) {
            Ok(Some((frame, consumed))) => {
                self.pos += consumed;
                Some(Ok(frame))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn raw_frame(id: &[u8; 4], flags: u16, content: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&(content.len() as u32).to_be_bytes());
        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(content);
        out
    }

    #[test]
    fn reads_plain_frame() {
        let buf = raw_frame(b"TIT2", 0, b"\0Title");
        let (frame, consumed) = read_frame(&buf, 0).unwrap().unwrap();
        assert_eq!(frame.id_str(), "TIT2");
        assert_eq!(frame.declared_size, 6);
        assert_eq!(frame.content, b"\0Title");
        assert_eq!(consumed, 16);
    }

    #[test]
    fn short_remainder_ends_sequence() {
        let buf = raw_frame(b"TIT2", 0, b"\0Title");
        assert!(read_frame(&buf, 7).unwrap().is_none());
        assert!(read_frame(&buf, 100).unwrap().is_none());
    }

    #[test]
    fn bare_trailing_header_ends_sequence() {
        let mut buf = raw_frame(b"TIT2", 0, b"\0Title");
        buf.extend(raw_frame(b"TPE1", 0, b""));
        assert!(read_frame(&buf, 16).unwrap().is_none());

        let ids: Vec<String> = FrameReader::new(&buf, 0)
            .map(|f| f.unwrap().id_str().into_owned())
            .collect();
        assert_eq!(ids, vec!["TIT2"]);
    }

    #[test]
    fn padding_ends_sequence() {
        let buf = vec![0u8; 32];
        assert!(read_frame(&buf, 0).unwrap().is_none());
    }

    #[test]
    fn oversized_declaration_ends_sequence() {
        let mut buf = raw_frame(b"TALB", 0, b"\0Album");
        buf.truncate(buf.len() - 2);
        assert!(read_frame(&buf, 0).unwrap().is_none());
    }

    #[test]
    fn inflates_compressed_frame() {
        let text = b"\0A rather long and repetitive title, title, title, title";
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(text).unwrap();
        let packed = enc.finish().unwrap();

        let buf = raw_frame(b"TIT2", Frame::FLAG_COMPRESSED, &packed);
        let (frame, consumed) = read_frame(&buf, 0).unwrap().unwrap();
        assert!(frame.is_compressed());
        assert_eq!(frame.content, text);
        assert_eq!(consumed, 10 + packed.len());
    }

    #[test]
    fn bad_deflate_stream_is_hard_error() {
        let buf = raw_frame(b"TIT2", Frame::FLAG_COMPRESSED, &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(
            read_frame(&buf, 0),
            Err(Id3Error::Decompression(_))
        ));
    }

    #[test]
    fn reader_walks_sequence() {
        let mut buf = raw_frame(b"TIT2", 0, b"\0One");
        buf.extend(raw_frame(b"TPE1", 0, b"\0Two"));
        buf.extend([0u8; 5]);

        let ids: Vec<String> = FrameReader::new(&buf, 0)
            .map(|f| f.unwrap().id_str().into_owned())
            .collect();
        assert_eq!(ids, vec!["TIT2", "TPE1"]);
    }
}
