//! An async, lazily produced `multipart/form-data` encoder for Rust.
//!
//! It accepts text, bytes, streams of bytes and files as field values, and
//! produces the body as a [`Stream`](futures_util::stream::Stream) of
//! [`Bytes`](bytes::Bytes) along with the headers needed to send it. Large
//! values are never buffered: stream and file values are forwarded chunk by
//! chunk as the body is read.
//!
//! The body length is known upfront as long as every field's size is known,
//! so the request can carry an exact `Content-Length`.
//!
//! # Examples
//!
//! ```
//! use formdata_encoder::{FieldOptions, FieldValue, FormData, Options};
//! use bytes::Bytes;
//! use std::convert::Infallible;
//! use futures_util::stream::once;
//!
//! # async fn run() {
//! let mut form = FormData::with_options(Options::new().include_content_length(true));
//!
//! form.append("my_text_field", "abcd").unwrap();
//!
//! let stream = once(async move { Result::<Bytes, Infallible>::Ok(Bytes::from("Hello world")) });
//! form.append_with(
//!     "my_file_field",
//!     FieldValue::stream(stream),
//!     FieldOptions::new().file_name("a-text-file.txt").size(11),
//! )
//! .unwrap();
//!
//! let headers = form.headers().unwrap();
//! println!("Headers: {:?}", headers);
//!
//! let mut body = form.stream();
//! while let Some(chunk) = body.chunk().await.unwrap() {
//!     println!("Chunk: {:?}", chunk);
//! }
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(run());
//! ```
//!
//! ## Optional features
//!
//! - `tokio-io` (default): file values, [`AsyncRead`](tokio::io::AsyncRead)
//!   values and [`FormDataStream::into_async_read`].
//! - `json`: [`FormData::append_json`].
//! - `log`: diagnostics through the [`log`](https://docs.rs/log) facade.

#![cfg_attr(nightly, feature(doc_cfg))]

pub use bytes;

pub use error::Error;
pub use field::{Field, FieldOptions, FieldValue, StreamValue};
pub use form::FormData;
pub use options::Options;
pub use stream::FormDataStream;

mod constants;
mod error;
mod field;
mod form;
mod helpers;
mod options;
mod state;
mod store;
mod stream;

/// A Result type often returned from methods that can have `formdata-encoder`
/// errors.
pub type Result<T> = std::result::Result<T, Error>;
