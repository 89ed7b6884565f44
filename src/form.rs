use crate::field::{Field, FieldOptions, FieldValue};
use crate::helpers;
use crate::options::Options;
use crate::store::FieldStore;
use crate::stream::{self, FormDataStream};
use http::header::{self, HeaderMap, HeaderValue};
#[cfg(feature = "json")]
use serde::Serialize;
use std::convert::TryFrom;
use std::sync::Arc;

/// A `multipart/form-data` form that is encoded lazily.
///
/// Fields are kept in the order they were appended, grouped by name: the first
/// append of a name fixes where that name is written, and appending the same
/// name again adds another value after the earlier ones.
///
/// The body length is tracked as fields are appended, so the
/// `Content-Length` can be sent before any field value is read. Appending a
/// stream whose size isn't given makes the length unknown for good.
///
/// # Examples
///
/// ```
/// use formdata_encoder::{FieldOptions, FormData, Options};
/// use bytes::Bytes;
///
/// # async fn run() {
/// let mut form = FormData::with_options(Options::new().include_content_length(true));
///
/// form.append("my_text_field", "abcd").unwrap();
/// form.append_with(
///     "my_file_field",
///     Bytes::from("Hello world"),
///     FieldOptions::new().file_name("a-text-file.txt"),
/// )
/// .unwrap();
///
/// let headers = form.headers().unwrap();
/// let body = form.stream().bytes().await.unwrap();
///
/// assert_eq!(headers[http::header::CONTENT_LENGTH], body.len().to_string());
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(run());
/// ```
#[derive(Debug)]
pub struct FormData {
    boundary: String,
    store: Arc<FieldStore>,
    length: Option<u64>,
    include_content_length: bool,
}

impl FormData {
    /// Creates an empty form with a random boundary, whose
    /// [`headers()`](FormData::headers) never carry a `Content-Length`.
    pub fn new() -> FormData {
        FormData::with_options(Options::default())
    }

    /// Creates an empty form configured by the given [`Options`].
    pub fn with_options(options: Options) -> FormData {
        let boundary = options.boundary.unwrap_or_else(helpers::generate_boundary);

        FormData {
            boundary,
            store: Arc::new(FieldStore::new()),
            length: Some(0),
            include_content_length: options.include_content_length,
        }
    }

    /// The boundary separating the fields of the body.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The value of the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("{}; boundary={}", mime::MULTIPART_FORM_DATA, self.boundary)
    }

    /// The exact length of the encoded body in bytes, or `None` if a field of
    /// unknown size was ever appended or the total doesn't fit in a `u64`.
    ///
    /// Deleting fields doesn't change this value.
    pub fn length(&self) -> Option<u64> {
        let footer_len = stream::footer(&self.boundary).len() as u64;
        self.length.and_then(|length| length.checked_add(footer_len))
    }

    /// The headers to send along with the body.
    ///
    /// `Content-Type` is always present. `Content-Length` is present only if
    /// the form was created with
    /// [`include_content_length`](Options::include_content_length) and the
    /// [`length()`](FormData::length) is known.
    pub fn headers(&self) -> crate::Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(2);

        let content_type = HeaderValue::try_from(self.content_type())
            .map_err(|err| crate::Error::InvalidHeaderValue(err.into()))?;
        headers.insert(header::CONTENT_TYPE, content_type);

        if self.include_content_length {
            if let Some(length) = self.length() {
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
            }
        }

        Ok(headers)
    }

    /// Appends a field with default [`FieldOptions`].
    ///
    /// This fails only for file values whose size can't be looked up.
    pub fn append<N, V>(&mut self, name: N, value: V) -> crate::Result<()>
    where
        N: Into<String>,
        V: Into<FieldValue>,
    {
        self.append_with(name, value, FieldOptions::default())
    }

    /// Appends a field described by the given [`FieldOptions`].
    ///
    /// The field's header text is built here, and the size of a file value is
    /// read from the file system synchronously when no size was given.
    pub fn append_with<N, V>(&mut self, name: N, value: V, options: FieldOptions) -> crate::Result<()>
    where
        N: Into<String>,
        V: Into<FieldValue>,
    {
        let field = Field::new(&self.boundary, name.into(), value.into(), options)?;

        #[cfg(feature = "log")]
        log::trace!("appending field '{}' of size {:?}", field.name(), field.size());

        let field_len = field.encoded_len();

        #[cfg(feature = "log")]
        {
            if self.length.is_some() && field_len.is_none() {
                log::debug!(
                    "field '{}' has an unknown size, the body length is no longer known",
                    field.name()
                );
            }
        }

        // An overflowing total can't be sent as a `Content-Length` either.
        self.length = self
            .length
            .and_then(|length| field_len.and_then(|field_len| length.checked_add(field_len)));

        Arc::make_mut(&mut self.store).append(field);

        Ok(())
    }

    /// Serializes `value` as `JSON` and appends it with an
    /// `application/json` content type.
    ///
    /// # Optional
    ///
    /// This requires the optional `json` feature to be enabled.
    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    pub fn append_json<N, T>(&mut self, name: N, value: &T) -> crate::Result<()>
    where
        N: Into<String>,
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_vec(value).map_err(crate::Error::EncodeJson)?;
        let options = FieldOptions::new().content_type(mime::APPLICATION_JSON);

        self.append_with(name, json, options)
    }

    /// The first field appended under `name`.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.store.get_all(name).and_then(|fields| fields.first())
    }

    /// Every field appended under `name`, in append order.
    pub fn get_all(&self, name: &str) -> Option<&[Field]> {
        self.store.get_all(name)
    }

    /// Whether a field was appended under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.store.has(name)
    }

    /// Removes every field appended under `name`.
    ///
    /// The [`length()`](FormData::length) is not reduced: once a field has
    /// been appended its size stays counted.
    pub fn delete(&mut self, name: &str) {
        if !self.store.has(name) {
            return;
        }

        #[cfg(feature = "log")]
        log::debug!("deleting field '{}', the body length is left as is", name);

        Arc::make_mut(&mut self.store).delete(name);
    }

    /// The distinct field names, in the order they were first appended.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.store.names()
    }

    /// Every field, grouped by name.
    pub fn fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.store.fields()
    }

    /// Every field value, grouped by name.
    pub fn values(&self) -> impl Iterator<Item = &FieldValue> + '_ {
        self.store.values()
    }

    /// Every `(name, value)` pair, grouped by name.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &FieldValue)> + '_ {
        self.store.entries()
    }

    /// The number of fields.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no field is left in the form.
    pub fn is_empty(&self) -> bool {
        self.store.entry_count() == 0
    }

    /// Produces the encoded body.
    ///
    /// Every call walks the fields from the start. Stream values are read by
    /// the first body that reaches them; a later body reaching the same value
    /// fails with [`Error::StreamConsumed`](crate::Error::StreamConsumed).
    pub fn stream(&self) -> FormDataStream {
        FormDataStream::new(Arc::clone(&self.store), &self.boundary)
    }
}

impl Default for FormData {
    fn default() -> Self {
        FormData::new()
    }
}
