use crate::{constants, helpers};
use bytes::{BufMut, Bytes, BytesMut};
use futures_util::stream::{BoxStream, Stream, StreamExt, TryStreamExt};
use std::fmt::{self, Debug, Formatter};
#[cfg(feature = "tokio-io")]
use std::path::PathBuf;
use std::sync::Arc;
#[cfg(feature = "tokio-io")]
use tokio::io::AsyncRead;
#[cfg(feature = "tokio-io")]
use tokio_util::io::ReaderStream;

pub(crate) type ByteStream = BoxStream<'static, crate::Result<Bytes>>;

/// The value of a form field.
///
/// Text and bytes are held in memory and can be encoded any number of times.
/// [`Stream`](FieldValue::Stream) values are one-shot: the first
/// [`FormDataStream`](crate::FormDataStream) to reach them takes the
/// underlying stream. [`File`](FieldValue::File) values are opened lazily each
/// time a body is produced.
#[derive(Clone)]
pub enum FieldValue {
    /// A literal text value.
    Text(String),
    /// A literal binary value.
    Bytes(Bytes),
    /// A lazily read stream of bytes.
    Stream(StreamValue),
    /// A file on disk, streamed in chunks when the body is produced.
    #[cfg(feature = "tokio-io")]
    #[cfg_attr(nightly, doc(cfg(feature = "tokio-io")))]
    File(PathBuf),
}

impl FieldValue {
    /// Wraps any fallible stream of byte chunks.
    ///
    /// # Examples
    ///
    /// ```
    /// use formdata_encoder::{FieldOptions, FieldValue, FormData};
    /// use bytes::Bytes;
    /// use std::convert::Infallible;
    /// use futures_util::stream::once;
    ///
    /// let stream = once(async move { Result::<Bytes, Infallible>::Ok(Bytes::from("abcd")) });
    ///
    /// let mut form = FormData::new();
    /// form.append_with("my_stream", FieldValue::stream(stream), FieldOptions::new().size(4))
    ///     .unwrap();
    /// ```
    pub fn stream<S, O, E>(stream: S) -> FieldValue
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let stream = stream
            .map_ok(|b| b.into())
            .map_err(|err| crate::Error::StreamReadFailed(err.into()))
            .boxed();

        FieldValue::Stream(StreamValue::new(stream))
    }

    /// A file-backed value. The file name and size default to the path's
    /// basename and its on-disk size.
    #[cfg(feature = "tokio-io")]
    #[cfg_attr(nightly, doc(cfg(feature = "tokio-io")))]
    pub fn file<P: Into<PathBuf>>(path: P) -> FieldValue {
        FieldValue::File(path.into())
    }

    /// Wraps an [`AsyncRead`](tokio::io::AsyncRead) reader as a one-shot
    /// stream value.
    #[cfg(feature = "tokio-io")]
    #[cfg_attr(nightly, doc(cfg(feature = "tokio-io")))]
    pub fn reader<R>(reader: R) -> FieldValue
    where
        R: AsyncRead + Send + 'static,
    {
        FieldValue::stream(ReaderStream::new(reader))
    }

    /// The exact byte length of in-memory values.
    pub fn known_len(&self) -> Option<u64> {
        match self {
            FieldValue::Text(text) => Some(text.len() as u64),
            FieldValue::Bytes(bytes) => Some(bytes.len() as u64),
            _ => None,
        }
    }

    /// Returns the text if this is a [`Text`](FieldValue::Text) value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Returns the bytes if this is a [`Bytes`](FieldValue::Bytes) value.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            FieldValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl Debug for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
            FieldValue::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            FieldValue::Stream(_) => f.write_str("Stream(..)"),
            #[cfg(feature = "tokio-io")]
            FieldValue::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_owned())
    }
}

impl From<Bytes> for FieldValue {
    fn from(bytes: Bytes) -> Self {
        FieldValue::Bytes(bytes)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(bytes: Vec<u8>) -> Self {
        FieldValue::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for FieldValue {
    fn from(bytes: &'static [u8]) -> Self {
        FieldValue::Bytes(Bytes::from_static(bytes))
    }
}

/// A one-shot stream slot shared between the form and the bodies it produces.
#[derive(Clone)]
pub struct StreamValue {
    slot: Arc<spin::Mutex<Option<ByteStream>>>,
}

impl StreamValue {
    fn new(stream: ByteStream) -> Self {
        StreamValue {
            slot: Arc::new(spin::Mutex::new(Some(stream))),
        }
    }

    /// Whether the stream is still available, i.e. no body has taken it yet.
    pub fn is_available(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub(crate) fn take(&self) -> Option<ByteStream> {
        self.slot.lock().take()
    }
}

impl Debug for StreamValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamValue")
            .field("available", &self.is_available())
            .finish()
    }
}

/// Optional metadata for an appended field.
///
/// # Examples
///
/// ```
/// use formdata_encoder::FieldOptions;
///
/// let options = FieldOptions::new()
///     .file_name("report.csv")
///     .content_type(mime::TEXT_CSV)
///     .size(1024);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    pub(crate) file_name: Option<String>,
    pub(crate) content_type: Option<mime::Mime>,
    pub(crate) size: Option<u64>,
}

impl FieldOptions {
    /// Creates empty options.
    pub fn new() -> FieldOptions {
        FieldOptions::default()
    }

    /// Sets the `filename` parameter of the `Content-Disposition` header.
    pub fn file_name<N: Into<String>>(mut self, file_name: N) -> FieldOptions {
        self.file_name = Some(file_name.into());
        self
    }

    /// Sets the `Content-Type` of the field.
    pub fn content_type(mut self, content_type: mime::Mime) -> FieldOptions {
        self.content_type = Some(content_type);
        self
    }

    /// Sets the size of the value in bytes.
    ///
    /// Only stream and file values use it. Text and bytes are always measured.
    pub fn size(mut self, size: u64) -> FieldOptions {
        self.size = Some(size);
        self
    }
}

/// A single field recorded in a [`FormData`](crate::FormData).
///
/// Its header text is built when the field is appended and never changes.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    value: FieldValue,
    file_name: Option<String>,
    content_type: Option<mime::Mime>,
    size: Option<u64>,
    header: Bytes,
    body: Option<Bytes>,
}

impl Field {
    pub(crate) fn new(boundary: &str, name: String, value: FieldValue, options: FieldOptions) -> crate::Result<Self> {
        let FieldOptions {
            file_name,
            content_type,
            size,
        } = options;

        #[cfg(feature = "tokio-io")]
        let file_name = match &value {
            FieldValue::File(path) if file_name.is_none() => helpers::file_name_of(path),
            _ => file_name,
        };

        let size = Self::resolve_size(&value, size)?;

        let content_type = match file_name.as_deref() {
            Some(file_name) => Some(content_type.unwrap_or_else(|| helpers::guess_content_type(file_name))),
            None => content_type,
        };

        let header = Self::build_header(boundary, &name, file_name.as_deref(), content_type.as_ref());

        let body = match &value {
            FieldValue::Text(text) => Some(Bytes::copy_from_slice(text.as_bytes())),
            FieldValue::Bytes(bytes) => Some(bytes.clone()),
            _ => None,
        };

        Ok(Field {
            name,
            value,
            file_name,
            content_type,
            size,
            header,
            body,
        })
    }

    // Looking up a file's size blocks, so that the body length is known
    // before the request headers are sent.
    fn resolve_size(value: &FieldValue, size: Option<u64>) -> crate::Result<Option<u64>> {
        match value {
            FieldValue::Text(_) | FieldValue::Bytes(_) => Ok(value.known_len()),
            FieldValue::Stream(_) => Ok(size),
            #[cfg(feature = "tokio-io")]
            FieldValue::File(path) => match size {
                Some(size) => Ok(Some(size)),
                None => std::fs::metadata(path)
                    .map(|meta| Some(meta.len()))
                    .map_err(|cause| crate::Error::FileMetadata {
                        path: path.clone(),
                        cause,
                    }),
            },
        }
    }

    fn build_header(boundary: &str, name: &str, file_name: Option<&str>, content_type: Option<&mime::Mime>) -> Bytes {
        let mut buf = BytesMut::new();

        buf.put_slice(constants::BOUNDARY_EXT.as_bytes());
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(constants::CRLF.as_bytes());

        buf.put_slice(constants::CONTENT_DISPOSITION_PREFIX.as_bytes());
        buf.put_slice(helpers::escape_quotes(name).as_bytes());
        buf.put_u8(b'"');

        if let Some(file_name) = file_name {
            buf.put_slice(constants::FILE_NAME_PARAM.as_bytes());
            buf.put_slice(helpers::escape_quotes(file_name).as_bytes());
            buf.put_u8(b'"');
        }

        if let Some(content_type) = content_type {
            buf.put_slice(constants::CONTENT_TYPE_LINE.as_bytes());
            buf.put_slice(content_type.as_ref().as_bytes());
        }

        buf.put_slice(constants::CRLF_CRLF.as_bytes());

        buf.freeze()
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field value.
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    /// The file name sent in the `Content-Disposition` header, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// The `Content-Type` sent for this field, if any.
    pub fn content_type(&self) -> Option<&mime::Mime> {
        self.content_type.as_ref()
    }

    /// The size of the value in bytes, if known.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// The literal header text written before the value.
    pub fn header(&self) -> &Bytes {
        &self.header
    }

    /// The encoded bytes of a text or binary value, shared by every body that
    /// writes this field.
    pub(crate) fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// The number of bytes this field adds to the body, header and trailing
    /// line break included, if the value's size is known.
    pub(crate) fn encoded_len(&self) -> Option<u64> {
        let framing = self.header.len() as u64 + constants::CRLF.len() as u64;
        self.size.and_then(|size| framing.checked_add(size))
    }
}
