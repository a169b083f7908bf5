/// Errors raised while decoding or writing ID3v2.3 tags.
#[derive(Debug, thiserror::Error)]
pub enum Id3Error {
    /// Bad magic or version, size out of range, unknown string encoding,
    /// or a required string terminator missing.
    #[error("invalid ID3 data: {0}")]
    InvalidFormat(String),

    /// A compressed frame could not be inflated.
    #[error("frame decompression failed: {0}")]
    Decompression(#[source] std::io::Error),

    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Id3Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Id3Error::InvalidFormat(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Id3Error>;
