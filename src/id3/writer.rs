// ID3v2.3 tag serialisation

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::{Id3Error, Result};
use crate::id3::frames::{frame_ids, Frame};
use crate::id3::header::TagHeader;
use crate::id3::tag::{AttachedPicture, TagData};
use crate::utils::encoding::{encode_latin1, encode_string, StringEncoding};
use crate::utils::unsync::apply_unsync;

/// Tags at least this large are written to the output directly instead of
/// being handed to the encoder.
pub const OVERSIZED_TAG_THRESHOLD: usize = 32768;

/// Serialises `TagData` into an ID3v2.3 tag
#[derive(Debug, Clone, Default)]
pub struct TagWriter {
    compress_threshold: Option<usize>,
    unsynchronise: bool,
    padding: usize,
}

impl TagWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deflate frames whose content is at least `threshold` bytes
    pub fn compress_frames_over(mut self, threshold: usize) -> Self {
        self.compress_threshold = Some(threshold);
        self
    }

    pub fn unsynchronise(mut self, enabled: bool) -> Self {
        self.unsynchronise = enabled;
        self
    }

    /// Zero bytes appended after the last frame
    pub fn padding(mut self, bytes: usize) -> Self {
        self.padding = bytes;
        self
    }

    pub fn is_oversized(tag_len: usize) -> bool {
        tag_len >= OVERSIZED_TAG_THRESHOLD
    }

    /// Build the complete tag, header included
    pub fn to_bytes(&self, tag: &TagData) -> Result<Vec<u8>> {
        let mut body = Vec::new();

        for (id, value) in tag.text_fields() {
            let Some(value) = value.filter(|v| !v.is_empty()) else {
                continue;
            };
            let content = if id == frame_ids::COMMENT {
                comment_content(value)
            } else {
                text_content(value)
            };
            self.append_frame(&mut body, id, content)?;
        }

        for (description, value) in &tag.user_text {
            self.append_frame(&mut body, frame_ids::USER_TEXT, user_text_content(description, value))?;
        }

        if let Some(image) = tag.album_art.as_deref().filter(|a| !a.is_empty()) {
            self.append_frame(&mut body, frame_ids::PICTURE, picture_content(image))?;
        }

        let mut flags = 0;
        if self.unsynchronise {
            body = apply_unsync(&body);
            flags |= TagHeader::FLAG_UNSYNC;
        }
        body.resize(body.len() + self.padding, 0);

        let size = u32::try_from(body.len())
            .map_err(|_| Id3Error::invalid("tag body too large"))?;
        let header = TagHeader::new(flags, size).to_bytes()?;

        let mut out = Vec::with_capacity(TagHeader::SIZE + body.len());
        out.extend_from_slice(&header);
        out.extend_from_slice(&body);

        debug!(
            size = out.len(),
            oversized = Self::is_oversized(out.len()),
            "built ID3v2.3 tag"
        );
        Ok(out)
    }

    /// Write the tag at the writer's current position, returning its length
    pub fn write_to<W: Write>(&self, tag: &TagData, writer: &mut W) -> Result<usize> {
        let bytes = self.to_bytes(tag)?;
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }

    fn append_frame(&self, body: &mut Vec<u8>, id: &str, content: Vec<u8>) -> Result<()> {
        let mut flags = 0u16;
        let content = match self.compress_threshold {
            Some(threshold) if content.len() >= threshold => {
                flags |= Frame::FLAG_COMPRESSED;
                deflate(&content)?
            }
            _ => content,
        };

        let size = u32::try_from(content.len())
            .map_err(|_| Id3Error::invalid(format!("{} frame too large", id)))?;

        body.extend_from_slice(id.as_bytes());
        body.extend_from_slice(&size.to_be_bytes());
        body.extend_from_slice(&flags.to_be_bytes());
        body.extend_from_slice(&content);
        Ok(())
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn text_content(text: &str) -> Vec<u8> {
    let encoding = StringEncoding::for_texts(&[text]);
    let mut out = vec![encoding.marker()];
    out.extend(encode_string(encoding, text, false));
    out
}

fn comment_content(text: &str) -> Vec<u8> {
    let encoding = StringEncoding::for_texts(&[text]);
    let mut out = vec![encoding.marker()];
    out.extend_from_slice(b"eng");
    out.extend(encode_string(encoding, "", true));
    out.extend(encode_string(encoding, text, false));
    out
}

fn user_text_content(description: &str, value: &str) -> Vec<u8> {
    let encoding = StringEncoding::for_texts(&[description, value]);
    let mut out = vec![encoding.marker()];
    out.extend(encode_string(encoding, description, true));
    out.extend(encode_string(encoding, value, false));
    out
}

fn picture_content(image: &[u8]) -> Vec<u8> {
    let mut out = vec![StringEncoding::Latin1.marker()];
    out.extend(encode_latin1(AttachedPicture::detect_mime(image), true));
    out.push(AttachedPicture::FRONT_COVER);
    out.extend(encode_latin1("", true));
    out.extend_from_slice(image);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3::v2::decode_bytes;

    fn sample() -> TagData {
        let mut tag = TagData::new();
        tag.title = Some("Title".into());
        tag.year = Some("1999".into());
        tag.comment = Some("Comment, standard ASCII".into());
        tag
    }

    #[test]
    fn layout_of_single_text_frame() {
        let mut tag = TagData::new();
        tag.title = Some("Hi".into());
        let bytes = TagWriter::new().padding(4).to_bytes(&tag).unwrap();

        assert_eq!(&bytes[0..6], b"ID3\x03\x00\x00");
        assert_eq!(&bytes[6..10], &[0, 0, 0, 17]);
        assert_eq!(&bytes[10..20], b"TIT2\x00\x00\x00\x03\x00\x00");
        assert_eq!(&bytes[20..23], b"\0Hi");
        assert_eq!(&bytes[23..], &[0, 0, 0, 0]);
    }

    #[test]
    fn skips_empty_fields_but_keeps_empty_user_values() {
        let mut tag = sample();
        tag.album = Some(String::new());
        tag.user_text.insert("Empty".into(), String::new());
        let bytes = TagWriter::new().to_bytes(&tag).unwrap();

        let decoded = decode_bytes(&bytes).unwrap();
        assert!(decoded.album.is_none());
        assert_eq!(decoded.user_text["Empty"], "");
    }

    #[test]
    fn non_latin_text_uses_utf16() {
        let content = text_content("Ω");
        assert_eq!(content, vec![1, 0xFF, 0xFE, 0xA9, 0x03]);
        assert_eq!(text_content("é"), vec![0, 0xE9]);
    }

    #[test]
    fn compressed_frames_decode() {
        let mut tag = sample();
        tag.comment = Some("long comment ".repeat(50));
        let bytes = TagWriter::new().compress_frames_over(64).to_bytes(&tag).unwrap();

        // COMM follows TIT2 (16 bytes) and TYER (15 bytes)
        let comm = 10 + 16 + 15;
        assert_eq!(&bytes[comm..comm + 4], b"COMM");
        let comm_flags = &bytes[comm + 8..comm + 10];
        assert_eq!(comm_flags, &[0x00, 0x80]);
        assert_eq!(decode_bytes(&bytes).unwrap(), tag);
    }

    #[test]
    fn unsynchronised_tag_decodes() {
        let mut tag = sample();
        tag.album_art = Some(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0xFF, 0x00, 0xFF]);
        let bytes = TagWriter::new().unsynchronise(true).to_bytes(&tag).unwrap();

        assert_eq!(bytes[5], TagHeader::FLAG_UNSYNC);
        assert!(!bytes[10..].windows(2).any(|w| w[0] == 0xFF && w[1] >= 0xE0));
        assert_eq!(decode_bytes(&bytes).unwrap(), tag);
    }

    #[test]
    fn oversize_threshold() {
        assert!(!TagWriter::is_oversized(OVERSIZED_TAG_THRESHOLD - 1));
        assert!(TagWriter::is_oversized(OVERSIZED_TAG_THRESHOLD));
    }

    #[test]
    fn write_to_appends_at_position() {
        let mut out = b"prefix".to_vec();
        let written = TagWriter::new().write_to(&sample(), &mut out).unwrap();
        assert_eq!(out.len(), 6 + written);
        assert_eq!(&out[6..9], b"ID3");
    }
}
