// Decoded tag content

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id3::genres;

/// ID3 tag content.
///
/// Built fresh by each decode call; the writer consumes the same structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagData {
    /// TIT2
    pub title: Option<String>,
    /// TPE1
    pub artist: Option<String>,
    /// TALB
    pub album: Option<String>,
    /// TYER
    pub year: Option<String>,
    /// COMM, text only
    pub comment: Option<String>,
    /// TCON
    pub genre: Option<String>,
    /// TRCK
    pub track: Option<String>,
    /// TIT3
    pub subtitle: Option<String>,
    /// TPE2
    pub album_artist: Option<String>,
    /// TXXX frames keyed by description
    pub user_text: BTreeMap<String, String>,
    /// APIC image content (PNG, JPEG or GIF file bytes)
    #[serde(with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub album_art: Option<Vec<u8>>,
}

impl TagData {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no field would produce a frame
    pub fn is_empty(&self) -> bool {
        self.text_fields().into_iter().all(|(_, v)| v.map_or(true, str::is_empty))
            && self.user_text.is_empty()
            && self.album_art.as_ref().map_or(true, Vec::is_empty)
    }

    /// Singular text fields paired with their frame IDs, in tag order
    pub fn text_fields(&self) -> [(&'static str, Option<&str>); 9] {
        use crate::id3::frames::frame_ids::*;
        [
            (TITLE, self.title.as_deref()),
            (ARTIST, self.artist.as_deref()),
            (ALBUM, self.album.as_deref()),
            (YEAR, self.year.as_deref()),
            (COMMENT, self.comment.as_deref()),
            (GENRE, self.genre.as_deref()),
            (TRACK, self.track.as_deref()),
            (SUBTITLE, self.subtitle.as_deref()),
            (ALBUM_ARTIST, self.album_artist.as_deref()),
        ]
    }

    /// Genre as a name, resolving numeric `17` or `(17)` references
    pub fn genre_name(&self) -> Option<&str> {
        let genre = self.genre.as_deref()?;
        let index = genre
            .strip_prefix('(')
            .and_then(|g| g.strip_suffix(')'))
            .unwrap_or(genre);

        match index.parse::<u8>() {
            Ok(i) => genres::genre_name(i).or(Some(genre)),
            Err(_) => Some(genre),
        }
    }

    /// Replace user text from `description=value` items; later duplicates win
    pub fn set_user_defined_tags<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.user_text.clear();
        for item in items {
            let item = item.as_ref();
            let (key, value) = item.split_once('=').unwrap_or((item, ""));
            self.user_text.insert(key.to_string(), value.to_string());
        }
    }

    /// User text as `description=value` items
    pub fn user_defined_tags(&self) -> Vec<String> {
        self.user_text
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }
}

/// Decoded APIC payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedPicture {
    pub mime_type: String,
    pub picture_type: u8,
    pub description: String,
    #[serde(with = "base64_bytes::required")]
    pub image_bytes: Vec<u8>,
}

impl AttachedPicture {
    /// Picture type for the front cover
    pub const FRONT_COVER: u8 = 3;

    /// Guess the MIME type from the image's magic bytes
    pub fn detect_mime(data: &[u8]) -> &'static str {
        if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            "image/png"
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            "image/jpeg"
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            "image/gif"
        } else {
            "application/octet-stream"
        }
    }

    /// File extension for the picture's MIME type
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/bmp" => "bmp",
            _ => "bin",
        }
    }
}

/// Decoded COMM payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentFrame {
    pub language: String,
    pub description: String,
    pub text: String,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }

    pub mod required {
        use super::*;

        pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&STANDARD.encode(bytes))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
            let s = String::deserialize(deserializer)?;
            STANDARD.decode(s).map_err(serde::de::Error::custom)
        }
    }
}
