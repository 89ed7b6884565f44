use formdata_encoder::{FieldOptions, FieldValue, FormData, Options};
use futures_util::TryStreamExt;
use http::Request;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Create a form that reports its exact length.
    let mut form = FormData::with_options(Options::new().include_content_length(true));

    // Append a text field, and a file field whose name and size come from disk.
    form.append("my_text_field", "abcd")?;
    form.append_with(
        "my_file_field",
        FieldValue::file("Cargo.toml"),
        FieldOptions::new().content_type(mime::TEXT_PLAIN_UTF_8),
    )?;

    // Wrap the lazily produced body into an `http_body::Body`.
    let body = StreamBody::new(form.stream().map_ok(Frame::data));

    let mut builder = Request::post("http://localhost:3000/upload");
    for (name, value) in form.headers()?.iter() {
        builder = builder.header(name, value);
    }
    let request = builder.body(body)?;

    println!("Headers: {:?}", request.headers());

    // Here the request would be handed to an HTTP client, which pulls the
    // body chunk by chunk. Collect it to show what would be sent.
    let bytes = request.into_body().collect().await?.to_bytes();
    println!("Body ({} bytes):\n{}", bytes.len(), String::from_utf8_lossy(&bytes));

    Ok(())
}
