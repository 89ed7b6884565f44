use crate::constants;
#[cfg(feature = "tokio-io")]
use crate::field::ByteStream;
use crate::field::{Field, FieldValue};
use crate::state::{StreamState, StreamingStage};
use crate::store::FieldStore;
use bytes::{Bytes, BytesMut};
use futures_util::stream::{Stream, TryStreamExt};
#[cfg(feature = "tokio-io")]
use futures_util::stream::{self, StreamExt};
#[cfg(feature = "tokio-io")]
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
#[cfg(feature = "tokio-io")]
use tokio_util::io::{ReaderStream, StreamReader};

/// The encoded `multipart/form-data` body of a [`FormData`](crate::FormData).
///
/// Bytes are produced only when the stream is polled: each field's header
/// text, then its value, then a line break, and finally the closing boundary.
/// Stream and file values are forwarded chunk by chunk and are only polled
/// when this stream is, so a slow consumer never causes them to be read
/// ahead. Dropping this stream drops the value being forwarded, which closes
/// any open file.
///
/// The body is a snapshot of the form taken by
/// [`FormData::stream()`](crate::FormData::stream); fields appended
/// afterwards are not part of it.
///
/// # Examples
///
/// ```
/// use formdata_encoder::{FormData, Options};
///
/// # async fn run() {
/// let mut form = FormData::with_options(Options::new().boundary("X-BOUNDARY"));
/// form.append("my_text_field", "abcd").unwrap();
///
/// let body = form.stream().bytes().await.unwrap();
/// assert_eq!(
///     body,
///     "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n\r\n"
/// );
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(run());
/// ```
pub struct FormDataStream {
    state: StreamState,
}

impl FormDataStream {
    pub(crate) fn new(store: Arc<FieldStore>, boundary: &str) -> Self {
        FormDataStream {
            state: StreamState::new(store, footer(boundary)),
        }
    }

    /// Yields the next chunk of the body, or `None` once the closing boundary
    /// has been written.
    pub async fn chunk(&mut self) -> crate::Result<Option<Bytes>> {
        self.try_next().await
    }

    /// Collects the whole body in memory.
    pub async fn bytes(mut self) -> crate::Result<Bytes> {
        let mut buf = BytesMut::new();

        while let Some(bytes) = self.chunk().await? {
            buf.extend_from_slice(&bytes);
        }

        Ok(buf.freeze())
    }

    /// Converts the body into an [`AsyncRead`](tokio::io::AsyncRead).
    ///
    /// # Optional
    ///
    /// This requires the optional `tokio-io` feature to be enabled.
    #[cfg(feature = "tokio-io")]
    #[cfg_attr(nightly, doc(cfg(feature = "tokio-io")))]
    pub fn into_async_read(self) -> StreamReader<FormDataStream, Bytes> {
        StreamReader::new(self)
    }
}

pub(crate) fn footer(boundary: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(boundary.len() + 8);

    buf.extend_from_slice(constants::BOUNDARY_EXT.as_bytes());
    buf.extend_from_slice(boundary.as_bytes());
    buf.extend_from_slice(constants::BOUNDARY_EXT.as_bytes());
    buf.extend_from_slice(constants::CRLF_CRLF.as_bytes());

    buf.freeze()
}

#[cfg(feature = "tokio-io")]
fn open_file(path: PathBuf) -> ByteStream {
    let opened = stream::once(async move {
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(ReaderStream::new(file).map_err(|err| crate::Error::StreamReadFailed(err.into()))),
            Err(cause) => Err(crate::Error::OpenFileFailed { path, cause }),
        }
    });

    opened.try_flatten().boxed()
}

impl Stream for FormDataStream {
    type Item = crate::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let state = &mut self.get_mut().state;

        loop {
            match state.stage {
                StreamingStage::WritingHeader => {
                    if state.is_exhausted() {
                        state.stage = StreamingStage::WritingFooter;
                        continue;
                    }

                    let field = match state.store.field_at(state.curr_entry, state.curr_value) {
                        Some(field) => field,
                        None => {
                            state.stage = StreamingStage::WritingFooter;
                            continue;
                        }
                    };

                    let next_stage = match field.value() {
                        FieldValue::Text(_) | FieldValue::Bytes(_) => StreamingStage::WritingBody,
                        FieldValue::Stream(value) => match value.take() {
                            Some(body) => {
                                state.curr_body = Some(body);
                                StreamingStage::ForwardingBody
                            }
                            None => {
                                state.stage = StreamingStage::Eof;
                                return Poll::Ready(Some(Err(crate::Error::StreamConsumed {
                                    field_name: field.name().to_owned(),
                                })));
                            }
                        },
                        #[cfg(feature = "tokio-io")]
                        FieldValue::File(path) => {
                            state.curr_body = Some(open_file(path.clone()));
                            StreamingStage::ForwardingBody
                        }
                    };

                    state.stage = next_stage;
                    return Poll::Ready(Some(Ok(field.header().clone())));
                }
                StreamingStage::WritingBody => {
                    state.stage = StreamingStage::WritingTrailer;

                    let bytes = match state.curr_field().and_then(Field::body) {
                        Some(bytes) => bytes.clone(),
                        None => continue,
                    };

                    if !bytes.is_empty() {
                        return Poll::Ready(Some(Ok(bytes)));
                    }
                }
                StreamingStage::ForwardingBody => {
                    let body = match state.curr_body.as_mut() {
                        Some(body) => body,
                        None => {
                            state.stage = StreamingStage::WritingTrailer;
                            continue;
                        }
                    };

                    match body.as_mut().poll_next(cx) {
                        Poll::Ready(Some(Ok(bytes))) => {
                            if !bytes.is_empty() {
                                return Poll::Ready(Some(Ok(bytes)));
                            }
                        }
                        Poll::Ready(Some(Err(err))) => {
                            #[cfg(feature = "log")]
                            log::error!(
                                "field '{}' failed while being forwarded: {}",
                                state.curr_field().map(|field| field.name()).unwrap_or("<unknown>"),
                                err
                            );

                            state.curr_body = None;
                            state.stage = StreamingStage::Eof;
                            return Poll::Ready(Some(Err(err)));
                        }
                        Poll::Ready(None) => {
                            state.curr_body = None;
                            state.stage = StreamingStage::WritingTrailer;
                        }
                        Poll::Pending => return Poll::Pending,
                    }
                }
                StreamingStage::WritingTrailer => {
                    state.advance();
                    state.stage = StreamingStage::WritingHeader;
                    return Poll::Ready(Some(Ok(Bytes::from_static(constants::CRLF.as_bytes()))));
                }
                StreamingStage::WritingFooter => {
                    state.stage = StreamingStage::Eof;
                    return Poll::Ready(Some(Ok(state.footer.clone())));
                }
                StreamingStage::Eof => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldOptions;
    use futures_util::stream::{self, StreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BOUNDARY: &str = "X-BOUNDARY";

    fn store_with(fields: Vec<(&str, FieldValue, FieldOptions)>) -> Arc<FieldStore> {
        let mut store = FieldStore::new();
        for (name, value, options) in fields {
            store.append(Field::new(BOUNDARY, name.to_owned(), value, options).unwrap());
        }
        Arc::new(store)
    }

    #[test]
    fn test_footer() {
        assert_eq!(footer(BOUNDARY), "--X-BOUNDARY--\r\n\r\n");
    }

    #[tokio::test]
    async fn test_empty_form_is_only_footer() {
        let mut body = FormDataStream::new(Arc::new(FieldStore::new()), BOUNDARY);

        assert_eq!(body.chunk().await, Ok(Some(Bytes::from("--X-BOUNDARY--\r\n\r\n"))));
        assert_eq!(body.chunk().await, Ok(None));
        assert_eq!(body.chunk().await, Ok(None));
    }

    #[tokio::test]
    async fn test_chunk_sequence() {
        let upstream = stream::iter(vec![
            crate::Result::Ok(Bytes::from("ab")),
            Ok(Bytes::new()),
            Ok(Bytes::from("cde")),
        ]);
        let store = store_with(vec![
            ("text", "abcd".into(), FieldOptions::new()),
            ("empty", "".into(), FieldOptions::new()),
            ("stream", FieldValue::stream(upstream), FieldOptions::new().size(5)),
        ]);

        let chunks: Vec<Bytes> = FormDataStream::new(store, BOUNDARY)
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        let expected: Vec<&[u8]> = vec![
            b"--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n",
            b"abcd",
            b"\r\n",
            b"--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"empty\"\r\n\r\n",
            b"\r\n",
            b"--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"stream\"\r\n\r\n",
            b"ab",
            b"cde",
            b"\r\n",
            b"--X-BOUNDARY--\r\n\r\n",
        ];
        assert_eq!(chunks, expected);
    }

    #[tokio::test]
    async fn test_text_body_is_shared_between_bodies() {
        let store = store_with(vec![("text", "abcd".into(), FieldOptions::new())]);

        let mut first = FormDataStream::new(Arc::clone(&store), BOUNDARY);
        let mut second = FormDataStream::new(store, BOUNDARY);
        first.chunk().await.unwrap();
        second.chunk().await.unwrap();

        let a = first.chunk().await.unwrap().unwrap();
        let b = second.chunk().await.unwrap().unwrap();
        assert_eq!(a, "abcd");
        assert_eq!(a.as_ptr(), b.as_ptr());
    }

    #[tokio::test]
    async fn test_upstream_is_not_read_ahead() {
        let polled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polled);
        let upstream = stream::unfold(0u8, move |n| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if n < 3 {
                    Some((crate::Result::Ok(Bytes::from(vec![b'a' + n])), n + 1))
                } else {
                    None
                }
            }
        });
        let store = store_with(vec![("stream", FieldValue::stream(upstream), FieldOptions::new())]);

        let mut body = FormDataStream::new(store, BOUNDARY);

        assert!(body.chunk().await.unwrap().is_some());
        assert_eq!(polled.load(Ordering::SeqCst), 0);

        assert_eq!(body.chunk().await, Ok(Some(Bytes::from("a"))));
        assert_eq!(polled.load(Ordering::SeqCst), 1);

        assert_eq!(body.chunk().await, Ok(Some(Bytes::from("b"))));
        assert_eq!(polled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_drop_releases_upstream() {
        let guard = Arc::new(());
        let held = Arc::clone(&guard);
        let upstream = stream::unfold(held, |held| async move { Some((crate::Result::Ok(Bytes::from("chunk")), held)) });
        let store = store_with(vec![("stream", FieldValue::stream(upstream), FieldOptions::new())]);

        let mut body = FormDataStream::new(store, BOUNDARY);

        assert!(body.chunk().await.unwrap().is_some());
        assert_eq!(body.chunk().await, Ok(Some(Bytes::from("chunk"))));
        assert_eq!(Arc::strong_count(&guard), 2);

        drop(body);
        assert_eq!(Arc::strong_count(&guard), 1);
    }

    #[tokio::test]
    async fn test_upstream_error_ends_stream() {
        let upstream = stream::iter(vec![
            Ok(Bytes::from("partial")),
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "upstream closed")),
        ]);
        let store = store_with(vec![
            ("stream", FieldValue::stream(upstream), FieldOptions::new()),
            ("after", "never sent".into(), FieldOptions::new()),
        ]);

        let mut body = FormDataStream::new(store, BOUNDARY);

        assert!(body.chunk().await.unwrap().is_some());
        assert_eq!(body.chunk().await, Ok(Some(Bytes::from("partial"))));
        assert_eq!(
            body.chunk().await,
            Err(crate::Error::StreamReadFailed("upstream closed".into()))
        );
        assert_eq!(body.chunk().await, Ok(None));
    }

    #[tokio::test]
    async fn test_consumed_stream_is_reported() {
        let upstream = stream::iter(vec![crate::Result::Ok(Bytes::from("once"))]);
        let store = store_with(vec![("stream", FieldValue::stream(upstream), FieldOptions::new())]);

        let first = FormDataStream::new(Arc::clone(&store), BOUNDARY).bytes().await.unwrap();
        assert!(first.ends_with(b"once\r\n--X-BOUNDARY--\r\n\r\n"));

        let second = FormDataStream::new(store, BOUNDARY).bytes().await;
        assert_eq!(
            second,
            Err(crate::Error::StreamConsumed {
                field_name: "stream".to_owned()
            })
        );
    }

    #[cfg(feature = "tokio-io")]
    #[tokio::test]
    async fn test_missing_file_fails_on_open() {
        let options = FieldOptions::new().size(0);
        let store = store_with(vec![("file", FieldValue::file("/definitely/not/here.bin"), options)]);

        let mut body = FormDataStream::new(store, BOUNDARY);

        assert!(body.chunk().await.unwrap().is_some());
        match body.chunk().await {
            Err(crate::Error::OpenFileFailed { cause, .. }) => {
                assert_eq!(cause.kind(), std::io::ErrorKind::NotFound)
            }
            other => panic!("unexpected chunk: {:?}", other),
        }
        assert_eq!(body.chunk().await, Ok(None));
    }

    #[cfg(feature = "tokio-io")]
    #[tokio::test]
    async fn test_into_async_read() {
        use tokio::io::AsyncReadExt;

        let store = store_with(vec![("a", "1".into(), FieldOptions::new())]);
        let mut reader = FormDataStream::new(store, BOUNDARY).into_async_read();

        let mut body = String::new();
        reader.read_to_string(&mut body).await.unwrap();

        assert_eq!(
            body,
            "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--X-BOUNDARY--\r\n\r\n"
        );
    }
}
