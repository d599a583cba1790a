use thiserror::Error;

/// The ways a decode can fail.
///
/// Decoding functions return `anyhow::Result`; every fatal condition they raise wraps one of
/// these variants, so callers can recover the category with `downcast_ref::<DecodeError>()` or
/// [`DecodeError::kind_of`].
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Missing SOI, a corrupt segment length, or header fields outside their legal ranges.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// Valid JPEG that uses a process this decoder does not implement (arithmetic coding,
    /// lossless, hierarchical, 12-bit, 4-component...).
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Entropy-coded data that cannot be decoded against the tables in effect.
    #[error("corrupt entropy-coded data: {0}")]
    CorruptEntropyData(String),

    /// The data ended while more bits or markers were expected.
    #[error("truncated stream: {0}")]
    TruncatedStream(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedHeader,
    UnsupportedFeature,
    CorruptEntropyData,
    TruncatedStream,
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::MalformedHeader(_) => ErrorKind::MalformedHeader,
            DecodeError::UnsupportedFeature(_) => ErrorKind::UnsupportedFeature,
            DecodeError::CorruptEntropyData(_) => ErrorKind::CorruptEntropyData,
            DecodeError::TruncatedStream(_) => ErrorKind::TruncatedStream,
        }
    }

    /// Returns the category of a decode failure, or `None` for errors that did not originate
    /// in the decoder (I/O errors while mapping a file, for instance).
    pub fn kind_of(error: &anyhow::Error) -> Option<ErrorKind> {
        error.downcast_ref::<DecodeError>().map(DecodeError::kind)
    }
}

pub(crate) fn malformed(message: impl Into<String>) -> anyhow::Error {
    DecodeError::MalformedHeader(message.into()).into()
}

pub(crate) fn unsupported(message: impl Into<String>) -> anyhow::Error {
    DecodeError::UnsupportedFeature(message.into()).into()
}

pub(crate) fn corrupt(message: impl Into<String>) -> anyhow::Error {
    DecodeError::CorruptEntropyData(message.into()).into()
}

pub(crate) fn truncated(message: impl Into<String>) -> anyhow::Error {
    DecodeError::TruncatedStream(message.into()).into()
}
