use std::fmt::{self, Debug, Display, Formatter};
use std::path::PathBuf;

use derive_more::Display;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while appending fields and while producing
/// the encoded `multipart/form-data` stream.
#[derive(Display)]
#[non_exhaustive]
pub enum Error {
    /// The size of a file-backed field couldn't be looked up when it was
    /// appended.
    #[display(fmt = "failed to read metadata of file {:?}: {}", path, cause)]
    FileMetadata { path: PathBuf, cause: std::io::Error },

    /// A file-backed field couldn't be opened while producing the stream.
    #[display(fmt = "failed to open file {:?}: {}", path, cause)]
    OpenFileFailed { path: PathBuf, cause: std::io::Error },

    /// A stream value yielded an error while its bytes were being forwarded.
    #[display(fmt = "stream read failed: {}", _0)]
    StreamReadFailed(BoxError),

    /// A one-shot stream value was reached a second time, after an earlier
    /// [`FormDataStream`](crate::FormDataStream) had already taken it.
    #[display(fmt = "stream of field '{}' has already been consumed", field_name)]
    StreamConsumed { field_name: String },

    /// The request headers couldn't be represented as
    /// [`HeaderValue`](http::header::HeaderValue)s, e.g. because of a custom
    /// boundary containing invalid characters.
    #[display(fmt = "failed to build header value: {}", _0)]
    InvalidHeaderValue(BoxError),

    /// Failed to encode a value as `JSON` in
    /// [`append_json()`](crate::FormData::append_json).
    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    #[display(fmt = "failed to encode field data as JSON: {}", _0)]
    EncodeJson(serde_json::Error),
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FileMetadata { cause, .. } | Error::OpenFileFailed { cause, .. } => Some(cause),
            Error::StreamReadFailed(cause) | Error::InvalidHeaderValue(cause) => Some(&**cause),
            #[cfg(feature = "json")]
            Error::EncodeJson(cause) => Some(cause),
            Error::StreamConsumed { .. } => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::FileMetadata { cause, .. } | Error::OpenFileFailed { cause, .. } => cause,
            err => std::io::Error::new(std::io::ErrorKind::Other, err),
        }
    }
}
