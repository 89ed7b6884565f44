/// Configures how a [`FormData`](crate::FormData) is encoded.
///
/// # Examples
///
/// ```
/// use formdata_encoder::{FormData, Options};
///
/// let options = Options::new().include_content_length(true);
/// let mut form = FormData::with_options(options);
///
/// form.append("my_text_field", "abcd").unwrap();
///
/// let headers = form.headers().unwrap();
/// assert!(headers.contains_key(http::header::CONTENT_LENGTH));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub(crate) include_content_length: bool,
    pub(crate) boundary: Option<String>,
}

impl Options {
    /// Creates the default options: no `Content-Length` header and a random
    /// boundary.
    pub fn new() -> Options {
        Options::default()
    }

    /// Whether [`headers()`](crate::FormData::headers) should carry a
    /// `Content-Length` whenever the body length is known.
    pub fn include_content_length(mut self, include: bool) -> Options {
        self.include_content_length = include;
        self
    }

    /// Uses a fixed boundary instead of a random one.
    ///
    /// The caller is responsible for picking a boundary that doesn't occur in
    /// any field value.
    pub fn boundary<B: Into<String>>(mut self, boundary: B) -> Options {
        self.boundary = Some(boundary.into());
        self
    }
}
