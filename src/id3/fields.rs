// Per-frame field decoders

use crate::error::{Id3Error, Result};
use crate::id3::frames::frame_ids;
use crate::id3::tag::{AttachedPicture, CommentFrame};
use crate::utils::encoding::{read_latin1, read_string, StringEncoding};

/// The frame set the codec understands.
///
/// Everything else, including ID3v2.2 three-character IDs and URL frames
/// such as `WXXX`, maps to `Unsupported` and is skipped by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Title,
    Artist,
    Album,
    Year,
    Comment,
    Genre,
    Track,
    Subtitle,
    AlbumArtist,
    UserText,
    Picture,
    Unsupported,
}

impl FrameKind {
    pub fn from_id(id: &[u8; 4]) -> Self {
        match std::str::from_utf8(id).unwrap_or("") {
            frame_ids::TITLE => FrameKind::Title,
            frame_ids::ARTIST => FrameKind::Artist,
            frame_ids::ALBUM => FrameKind::Album,
            frame_ids::YEAR => FrameKind::Year,
            frame_ids::COMMENT => FrameKind::Comment,
            frame_ids::GENRE => FrameKind::Genre,
            frame_ids::TRACK => FrameKind::Track,
            frame_ids::SUBTITLE => FrameKind::Subtitle,
            frame_ids::ALBUM_ARTIST => FrameKind::AlbumArtist,
            frame_ids::USER_TEXT => FrameKind::UserText,
            frame_ids::PICTURE => FrameKind::Picture,
            _ => FrameKind::Unsupported,
        }
    }
}

fn encoding_marker(content: &[u8]) -> Result<StringEncoding> {
    match content.first() {
        Some(&b) => StringEncoding::from_byte(b),
        None => Err(Id3Error::invalid("frame content is empty")),
    }
}

/// Decode a plain text frame (`TIT2`, `TPE1`, ...)
pub fn decode_text(content: &[u8]) -> Result<String> {
    let encoding = encoding_marker(content)?;
    let (text, _) = read_string(encoding, content, 1, false)?;
    Ok(text)
}

/// Decode a `COMM` frame: language, short description, then the comment text
pub fn decode_comment(content: &[u8]) -> Result<CommentFrame> {
    let encoding = encoding_marker(content)?;
    let language = content
        .get(1..4)
        .ok_or_else(|| Id3Error::invalid("comment frame too short for language code"))?;
    let language = String::from_utf8_lossy(language).into_owned();

    let (description, pos) = read_string(encoding, content, 4, true)?;
    let (text, _) = read_string(encoding, content, pos, false)?;

    Ok(CommentFrame {
        language,
        description,
        text,
    })
}

/// Decode a `TXXX` frame into `(description, value)`
pub fn decode_user_text(content: &[u8]) -> Result<(String, String)> {
    let encoding = encoding_marker(content)?;
    let (description, pos) = read_string(encoding, content, 1, true)?;
    let (value, _) = read_string(encoding, content, pos, false)?;
    Ok((description, value))
}

/// Decode an `APIC` frame.
///
/// The MIME type is always single-byte text; the description follows the
/// frame's encoding marker. The image runs to the end of the frame.
pub fn decode_picture(content: &[u8]) -> Result<AttachedPicture> {
    let encoding = encoding_marker(content)?;
    let (mime_type, pos) = read_latin1(content, 1, true)?;

    let picture_type = *content
        .get(pos)
        .ok_or_else(|| Id3Error::invalid("picture frame missing picture type"))?;

    let (description, pos) = read_string(encoding, content, pos + 1, true)?;

    Ok(AttachedPicture {
        mime_type,
        picture_type,
        description,
        image_bytes: content[pos..].to_vec(),
    })
}
