//! lametag - ID3v2.3 tag codec and LAME tag frame patcher for MP3 output.
//!
//! Decoding works on fully buffered tags ([`decode_bytes`]) or on a stream
//! positioned at a tag header ([`decode_stream`]). [`TagWriter`] produces
//! tags the decoder reads back, and [`StreamTagPatcher`] overwrites the
//! placeholder VBR tag frame once an encoder has finished.

use std::fs::{self, File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub mod error;
pub mod id3;
pub mod lame;
pub mod utils;

pub use error::{Id3Error, Result};
pub use id3::genres;
pub use id3::{
    decode_bytes, decode_picture_bytes, decode_stream, read_tag_bytes, AttachedPicture, TagData,
    TagHeader, TagWriter, OVERSIZED_TAG_THRESHOLD,
};
pub use lame::{PatchAbort, PatchOutcome, StreamTagPatcher, TagFrameSource};

use utils::io::{decode_synchsafe28, read_up_to};

/// An MP3 file on disk
#[derive(Debug, Clone)]
pub struct AudioFile {
    path: PathBuf,
}

impl AudioFile {
    /// Open an existing file
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        File::open(&path)?;
        Ok(AudioFile { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file starts with an ID3v2.3 tag
    pub fn has_tag(&self) -> Result<bool> {
        let mut file = File::open(&self.path)?;
        let mut header = [0u8; TagHeader::SIZE];
        let read = read_up_to(&mut file, &mut header)?;
        Ok(read == TagHeader::SIZE && TagHeader::matches(&header))
    }

    /// Decode the leading ID3v2.3 tag, if there is one
    pub fn read_tag(&self) -> Result<Option<TagData>> {
        if !self.has_tag()? {
            return Ok(None);
        }
        let mut reader = BufReader::new(File::open(&self.path)?);
        decode_stream(&mut reader).map(Some)
    }

    /// Decode the full attached picture record from the leading tag
    pub fn read_picture(&self) -> Result<Option<AttachedPicture>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        match read_tag_bytes(&mut reader)? {
            Some(tag) => decode_picture_bytes(&tag),
            None => Ok(None),
        }
    }

    /// Replace any leading ID3v2 tag with one built from `tag`
    pub fn write_tag(&self, tag: &TagData, writer: &TagWriter) -> Result<usize> {
        let data = fs::read(&self.path)?;
        let audio = &data[existing_tag_len(&data)..];

        let mut out = writer.to_bytes(tag)?;
        let tag_len = out.len();
        out.extend_from_slice(audio);
        fs::write(&self.path, out)?;

        tracing::info!(path = %self.path.display(), tag_len, "wrote ID3v2.3 tag");
        Ok(tag_len)
    }

    /// Overwrite the placeholder LAME tag frame with `frame`
    pub fn patch_tag_frame(&self, frame: &[u8]) -> Result<PatchOutcome> {
        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        let outcome = StreamTagPatcher::new(&mut file).patch(Some(frame))?;
        Ok(outcome)
    }

    /// Raw bytes of the leading ID3v2.3 tag
    pub fn tag_bytes(&self) -> Result<Option<Vec<u8>>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        read_tag_bytes(&mut reader)
    }
}

/// Length of any ID3v2 tag (of any minor version) at the head of `data`
fn existing_tag_len(data: &[u8]) -> usize {
    if data.len() < TagHeader::SIZE || &data[0..3] != b"ID3" {
        return 0;
    }

    let mut len = TagHeader::SIZE + decode_synchsafe28([data[6], data[7], data[8], data[9]]) as usize;
    // ID3v2.4 footer
    if data[3] == 4 && data[5] & 0x10 != 0 {
        len += TagHeader::SIZE;
    }
    len.min(data.len())
}
