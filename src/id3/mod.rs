// ID3v2.3 tag codec
pub mod fields;
pub mod frames;
pub mod genres;
pub mod header;
pub mod tag;
pub mod v2;
pub mod writer;

pub use frames::{Frame, FrameReader};
pub use header::TagHeader;
pub use tag::{AttachedPicture, CommentFrame, TagData};
pub use v2::{decode_bytes, decode_picture_bytes, decode_stream, read_tag_bytes};
pub use writer::{TagWriter, OVERSIZED_TAG_THRESHOLD};
