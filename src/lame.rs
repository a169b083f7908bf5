// In-place patching of the LAME/VBR tag frame after encoding completes
//
// The encoder writes an empty placeholder MPEG frame directly after the ID3v2
// tag. Once encoding finishes it can produce the populated frame, which must
// replace the placeholder byte for byte without moving anything else.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::{Deref, DerefMut};

use tracing::{debug, info};

use crate::id3::TagHeader;
use crate::utils::io::read_up_to;

/// Source of the finalized tag frame, normally the MP3 encoder
pub trait TagFrameSource {
    /// The populated tag frame, or `None` if the encoder has none to offer
    fn finalized_frame(&self) -> Option<Vec<u8>>;
}

impl TagFrameSource for Vec<u8> {
    fn finalized_frame(&self) -> Option<Vec<u8>> {
        Some(self.clone())
    }
}

impl TagFrameSource for Option<Vec<u8>> {
    fn finalized_frame(&self) -> Option<Vec<u8>> {
        self.clone()
    }
}

/// Why a patch was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchAbort {
    /// No finalized frame, or one shorter than a frame header
    MissingFrame,
    /// The stream is shorter than a tag header
    ShortStream,
    /// No MPEG sync word where the placeholder should start
    NoSyncAtPlaceholder { offset: u64 },
    /// No MPEG sync word directly after a placeholder of the frame's length
    NoSyncAfterPlaceholder { offset: u64 },
}

impl fmt::Display for PatchAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchAbort::MissingFrame => write!(f, "no usable finalized tag frame"),
            PatchAbort::ShortStream => write!(f, "stream too short to hold a tag frame"),
            PatchAbort::NoSyncAtPlaceholder { offset } => {
                write!(f, "no MPEG sync word at placeholder offset {}", offset)
            }
            PatchAbort::NoSyncAfterPlaceholder { offset } => {
                write!(f, "no MPEG sync word after placeholder at offset {}", offset)
            }
        }
    }
}

/// Result of a patch attempt. An abort leaves the stream unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched { offset: u64, length: usize },
    Aborted(PatchAbort),
}

impl PatchOutcome {
    pub fn is_patched(&self) -> bool {
        matches!(self, PatchOutcome::Patched { .. })
    }
}

/// Check for an MPEG frame sync: 11 set bits
pub fn is_mpeg_sync(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0
}

/// Overwrites the placeholder tag frame of an encoded MP3 stream.
///
/// The caller must hold exclusive access to the stream for the duration of
/// the call. The stream position is restored on every exit path.
pub struct StreamTagPatcher<'a, S: Read + Write + Seek> {
    stream: &'a mut S,
}

impl<'a, S: Read + Write + Seek> StreamTagPatcher<'a, S> {
    const MIN_FRAME_LEN: usize = 4;

    pub fn new(stream: &'a mut S) -> Self {
        StreamTagPatcher { stream }
    }

    /// Patch with the frame offered by `source`
    pub fn patch_from<T: TagFrameSource + ?Sized>(&mut self, source: &T) -> io::Result<PatchOutcome> {
        let frame = source.finalized_frame();
        self.patch(frame.as_deref())
    }

    /// Overwrite the placeholder with `frame`.
    ///
    /// I/O failures are returned as errors; failed verification is reported
    /// as `PatchOutcome::Aborted`.
    pub fn patch(&mut self, frame: Option<&[u8]>) -> io::Result<PatchOutcome> {
        let frame = match frame {
            Some(f) if f.len() >= Self::MIN_FRAME_LEN => f,
            _ => return Ok(self.aborted(PatchAbort::MissingFrame)),
        };

        let mut guard = PositionGuard::new(&mut *self.stream)?;
        let outcome = Self::patch_at_placeholder(&mut *guard, frame)?;
        guard.restore()?;

        match outcome {
            PatchOutcome::Patched { offset, length } => {
                info!(offset, length, "patched LAME tag frame");
            }
            PatchOutcome::Aborted(reason) => {
                debug!(%reason, "LAME tag frame patch aborted");
            }
        }
        Ok(outcome)
    }

    /// Offset just past the ID3v2.3 tag, or 0 when the stream has none
    pub fn tag_region_end(stream: &mut S) -> io::Result<Option<u64>> {
        stream.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; TagHeader::SIZE];
        if read_up_to(stream, &mut header)? != TagHeader::SIZE {
            return Ok(None);
        }
        Ok(Some(TagHeader::probe(&header).map_or(0, |h| h.total_size())))
    }

    fn patch_at_placeholder(stream: &mut S, frame: &[u8]) -> io::Result<PatchOutcome> {
        let Some(start) = Self::tag_region_end(stream)? else {
            return Ok(PatchOutcome::Aborted(PatchAbort::ShortStream));
        };

        if !Self::sync_at(stream, start)? {
            return Ok(PatchOutcome::Aborted(PatchAbort::NoSyncAtPlaceholder { offset: start }));
        }

        let next = start + frame.len() as u64;
        if !Self::sync_at(stream, next)? {
            return Ok(PatchOutcome::Aborted(PatchAbort::NoSyncAfterPlaceholder { offset: next }));
        }

        stream.seek(SeekFrom::Start(start))?;
        stream.write_all(frame)?;
        stream.flush()?;

        Ok(PatchOutcome::Patched {
            offset: start,
            length: frame.len(),
        })
    }

    fn sync_at(stream: &mut S, offset: u64) -> io::Result<bool> {
        stream.seek(SeekFrom::Start(offset))?;
        let mut word = [0u8; 4];
        Ok(read_up_to(stream, &mut word)? == word.len() && is_mpeg_sync(&word))
    }

    fn aborted(&self, reason: PatchAbort) -> PatchOutcome {
        debug!(%reason, "LAME tag frame patch aborted");
        PatchOutcome::Aborted(reason)
    }
}

/// Seeks the wrapped stream back to where it started when dropped
struct PositionGuard<'a, S: Seek> {
    stream: &'a mut S,
    origin: u64,
    restored: bool,
}

impl<'a, S: Seek> PositionGuard<'a, S> {
    fn new(stream: &'a mut S) -> io::Result<Self> {
        let origin = stream.stream_position()?;
        Ok(PositionGuard {
            stream,
            origin,
            restored: false,
        })
    }

    /// Restore now, reporting any seek failure
    fn restore(mut self) -> io::Result<()> {
        self.restored = true;
        self.stream.seek(SeekFrom::Start(self.origin)).map(|_| ())
    }
}

impl<S: Seek> Deref for PositionGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.stream
    }
}

impl<S: Seek> DerefMut for PositionGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.stream
    }
}

impl<S: Seek> Drop for PositionGuard<'_, S> {
    fn drop(&mut self) {
        if !self.restored {
            let _ = self.stream.seek(SeekFrom::Start(self.origin));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SYNC: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];

    /// Placeholder frame of `len` bytes followed by one more audio frame
    fn stream_with_tag(tag_body: usize, placeholder_len: usize) -> Vec<u8> {
        let mut out = TagHeader::new(0, tag_body as u32).to_bytes().unwrap().to_vec();
        out.resize(out.len() + tag_body, 0);
        out.extend_from_slice(&SYNC);
        out.resize(out.len() + placeholder_len - 4, 0);
        out.extend_from_slice(&SYNC);
        out.extend_from_slice(&[0x11; 32]);
        out
    }

    fn finalized(len: usize) -> Vec<u8> {
        let mut frame = vec![0xFF, 0xFB, 0x90, 0x64];
        frame.extend(std::iter::repeat(0xAB).take(len - 4));
        frame
    }

    #[test]
    fn patches_placeholder_after_tag() {
        let original = stream_with_tag(20, 48);
        let mut cursor = Cursor::new(original.clone());
        cursor.set_position(7);

        let frame = finalized(48);
        let outcome = StreamTagPatcher::new(&mut cursor).patch(Some(&frame)).unwrap();

        assert_eq!(outcome, PatchOutcome::Patched { offset: 30, length: 48 });
        assert_eq!(cursor.position(), 7);
        let patched = cursor.into_inner();
        assert_eq!(patched.len(), original.len());
        assert_eq!(&patched[30..78], frame.as_slice());
        assert_eq!(&patched[..30], &original[..30]);
        assert_eq!(&patched[78..], &original[78..]);
    }

    #[test]
    fn patches_at_start_without_tag() {
        let mut data = SYNC.to_vec();
        data.resize(40, 0);
        data.extend_from_slice(&SYNC);
        let mut cursor = Cursor::new(data);

        let frame = finalized(40);
        let outcome = StreamTagPatcher::new(&mut cursor).patch(Some(&frame)).unwrap();
        assert_eq!(outcome, PatchOutcome::Patched { offset: 0, length: 40 });
        assert_eq!(&cursor.get_ref()[..40], frame.as_slice());
    }

    #[test]
    fn aborts_when_length_mismatches() {
        let original = stream_with_tag(20, 48);
        let mut cursor = Cursor::new(original.clone());
        cursor.set_position(3);

        let outcome = StreamTagPatcher::new(&mut cursor)
            .patch(Some(&finalized(44)))
            .unwrap();

        assert_eq!(
            outcome,
            PatchOutcome::Aborted(PatchAbort::NoSyncAfterPlaceholder { offset: 74 })
        );
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.into_inner(), original);
    }

    #[test]
    fn aborts_without_sync_at_placeholder() {
        let mut original = stream_with_tag(20, 48);
        original[30] = 0x00;
        let mut cursor = Cursor::new(original.clone());

        let outcome = StreamTagPatcher::new(&mut cursor)
            .patch(Some(&finalized(48)))
            .unwrap();
        assert_eq!(
            outcome,
            PatchOutcome::Aborted(PatchAbort::NoSyncAtPlaceholder { offset: 30 })
        );
        assert_eq!(cursor.into_inner(), original);
    }

    #[test]
    fn aborts_on_missing_or_tiny_frame() {
        let original = stream_with_tag(20, 48);
        let mut cursor = Cursor::new(original.clone());
        let mut patcher = StreamTagPatcher::new(&mut cursor);

        assert_eq!(
            patcher.patch(None).unwrap(),
            PatchOutcome::Aborted(PatchAbort::MissingFrame)
        );
        assert_eq!(
            patcher.patch(Some(&[0xFF, 0xFB, 0x90])).unwrap(),
            PatchOutcome::Aborted(PatchAbort::MissingFrame)
        );
        assert_eq!(cursor.into_inner(), original);
    }

    #[test]
    fn aborts_on_short_stream() {
        let mut cursor = Cursor::new(vec![0xFF, 0xFB, 0x90]);
        let outcome = StreamTagPatcher::new(&mut cursor)
            .patch(Some(&finalized(8)))
            .unwrap();
        assert_eq!(outcome, PatchOutcome::Aborted(PatchAbort::ShortStream));
    }

    #[test]
    fn aborts_when_placeholder_runs_past_end() {
        let mut data = stream_with_tag(20, 48);
        data.truncate(30 + 48 + 2);
        let mut cursor = Cursor::new(data.clone());

        let outcome = StreamTagPatcher::new(&mut cursor)
            .patch(Some(&finalized(48)))
            .unwrap();
        assert!(!outcome.is_patched());
        assert_eq!(cursor.into_inner(), data);
    }

    #[test]
    fn patches_from_source() {
        let mut cursor = Cursor::new(stream_with_tag(12, 36));
        let source: Option<Vec<u8>> = Some(finalized(36));
        let outcome = StreamTagPatcher::new(&mut cursor).patch_from(&source).unwrap();
        assert!(outcome.is_patched());

        let empty: Option<Vec<u8>> = None;
        let outcome = StreamTagPatcher::new(&mut cursor).patch_from(&empty).unwrap();
        assert_eq!(outcome, PatchOutcome::Aborted(PatchAbort::MissingFrame));
    }

    #[test]
    fn sync_word_check() {
        assert!(is_mpeg_sync(&[0xFF, 0xFB]));
        assert!(is_mpeg_sync(&[0xFF, 0xE0, 0, 0]));
        assert!(!is_mpeg_sync(&[0xFF, 0xD0]));
        assert!(!is_mpeg_sync(&[0xFE, 0xFB]));
        assert!(!is_mpeg_sync(&[0xFF]));
    }

    #[test]
    fn position_restored_when_stream_fails() {
        // a writer that refuses writes still gets its position back
        struct ReadOnly(Cursor<Vec<u8>>);
        impl Read for ReadOnly {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.0.read(buf)
            }
        }
        impl Write for ReadOnly {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "read only"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        impl Seek for ReadOnly {
            fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
                self.0.seek(pos)
            }
        }

        let mut stream = ReadOnly(Cursor::new(stream_with_tag(20, 48)));
        stream.0.set_position(11);
        let err = StreamTagPatcher::new(&mut stream)
            .patch(Some(&finalized(48)))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(stream.0.position(), 11);
    }
}
