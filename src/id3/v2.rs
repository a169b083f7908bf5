// ID3v2.3 tag decoding

use std::borrow::Cow;
use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, trace};

use crate::error::{Id3Error, Result};
use crate::id3::fields::{self, FrameKind};
use crate::id3::frames::{Frame, FrameReader};
use crate::id3::header::TagHeader;
use crate::id3::tag::{AttachedPicture, TagData};
use crate::utils::io::{decode_be32, read_up_to};
use crate::utils::unsync::remove_unsync;

/// Smallest body size accepted for a usable tag
pub const MIN_TAG_SIZE: u32 = 10;

/// Decode a tag from a stream positioned at its header.
///
/// Reads exactly the header plus the declared body; the stream is left just
/// past the tag.
pub fn decode_stream<R: Read>(reader: &mut R) -> Result<TagData> {
    let header = TagHeader::read(reader)?;
    check_minimum(&header)?;

    let mut body = Vec::new();
    reader.take(header.size as u64).read_to_end(&mut body)?;
    if body.len() < header.size as usize {
        return Err(Id3Error::invalid(format!(
            "ID3 header size {} out of range, only {} bytes available",
            header.size,
            body.len()
        )));
    }

    decode_body(&header, &body)
}

/// Decode a tag from a buffer holding the complete tag, header included
pub fn decode_bytes(buf: &[u8]) -> Result<TagData> {
    let header = TagHeader::parse(buf)?;
    check_minimum(&header)?;

    let end = TagHeader::SIZE + header.size as usize;
    let body = buf.get(TagHeader::SIZE..end).ok_or_else(|| {
        Id3Error::invalid(format!(
            "ID3 header size {} out of range, only {} bytes available",
            header.size,
            buf.len() - TagHeader::SIZE
        ))
    })?;

    decode_body(&header, body)
}

/// Copy the raw tag (header and body) from the current stream position.
///
/// Returns `None` and rewinds when no complete ID3v2.3 tag starts there.
pub fn read_tag_bytes<R: Read + Seek>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let start = reader.stream_position()?;

    let mut header = [0u8; TagHeader::SIZE];
    let parsed = match read_up_to(reader, &mut header)? {
        TagHeader::SIZE => TagHeader::probe(&header),
        _ => None,
    };
    let Some(parsed) = parsed else {
        reader.seek(SeekFrom::Start(start))?;
        return Ok(None);
    };

    let mut tag = header.to_vec();
    reader.take(parsed.size as u64).read_to_end(&mut tag)?;
    if tag.len() as u64 != parsed.total_size() {
        reader.seek(SeekFrom::Start(start))?;
        return Ok(None);
    }

    Ok(Some(tag))
}

fn check_minimum(header: &TagHeader) -> Result<()> {
    if header.size < MIN_TAG_SIZE {
        return Err(Id3Error::invalid(format!(
            "ID3 header size {} out of range",
            header.size
        )));
    }
    Ok(())
}

/// Undo unsynchronisation and locate the first frame, past any extended header
fn frame_body<'a>(header: &TagHeader, body: &'a [u8]) -> (Cow<'a, [u8]>, usize) {
    let body = if header.unsynchronised() {
        Cow::Owned(remove_unsync(body))
    } else {
        Cow::Borrowed(body)
    };

    let mut pos = 0;
    if header.has_extended_header() {
        // the size field excludes its own 4 bytes
        pos = match decode_be32(&body, 0) {
            Some(size) => (size as usize).saturating_add(4),
            None => body.len(),
        };
        trace!(skip = pos, "skipping extended header");
    }

    (body, pos)
}

fn decode_body(header: &TagHeader, body: &[u8]) -> Result<TagData> {
    let (body, pos) = frame_body(header, body);

    let mut tag = TagData::default();
    let mut frames = 0usize;
    for frame in FrameReader::new(&body, pos) {
        apply_frame(&mut tag, &frame?)?;
        frames += 1;
    }

    debug!(size = header.size, frames, "decoded ID3v2.3 tag");
    Ok(tag)
}

/// Decode the full record of the last `APIC` frame in a complete tag
pub fn decode_picture_bytes(buf: &[u8]) -> Result<Option<AttachedPicture>> {
    let header = TagHeader::parse(buf)?;
    check_minimum(&header)?;
    let body = buf
        .get(TagHeader::SIZE..TagHeader::SIZE + header.size as usize)
        .ok_or_else(|| Id3Error::invalid(format!("ID3 header size {} out of range", header.size)))?;

    let (body, pos) = frame_body(&header, body);
    let mut picture = None;
    for frame in FrameReader::new(&body, pos) {
        let frame = frame?;
        if FrameKind::from_id(&frame.id) == FrameKind::Picture {
            picture = Some(fields::decode_picture(&frame.content)?);
        }
    }
    Ok(picture)
}

/// Store a frame's value in the matching field; later frames overwrite earlier ones
fn apply_frame(tag: &mut TagData, frame: &Frame) -> Result<()> {
    let content = frame.content.as_slice();

    match FrameKind::from_id(&frame.id) {
        FrameKind::Title => tag.title = Some(fields::decode_text(content)?),
        FrameKind::Artist => tag.artist = Some(fields::decode_text(content)?),
        FrameKind::Album => tag.album = Some(fields::decode_text(content)?),
        FrameKind::Year => tag.year = Some(fields::decode_text(content)?),
        FrameKind::Comment => tag.comment = Some(fields::decode_comment(content)?.text),
        FrameKind::Genre => tag.genre = Some(fields::decode_text(content)?),
        FrameKind::Track => tag.track = Some(fields::decode_text(content)?),
        FrameKind::Subtitle => tag.subtitle = Some(fields::decode_text(content)?),
        FrameKind::AlbumArtist => tag.album_artist = Some(fields::decode_text(content)?),
        FrameKind::UserText => {
            let (description, value) = fields::decode_user_text(content)?;
            tag.user_text.insert(description, value);
        }
        FrameKind::Picture => {
            tag.album_art = Some(fields::decode_picture(content)?.image_bytes);
        }
        FrameKind::Unsupported => {
            trace!(frame = %frame.id_str(), size = frame.declared_size, "skipping unsupported frame");
        }
    }

    Ok(())
}
