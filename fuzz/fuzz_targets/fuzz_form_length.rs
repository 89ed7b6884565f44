#![no_main]

use std::convert::Infallible;

use formdata_encoder::bytes::Bytes;
use formdata_encoder::{FieldOptions, FieldValue, FormData};
use futures_util::stream;
use libfuzzer_sys::fuzz_target;
use tokio::runtime;

fuzz_target!(|data: &[u8]| {
    let mut form = FormData::new();

    // Every chunk of input becomes a field of a different kind, so names,
    // file names and values with quotes, CR and LF all pass through.
    for (idx, part) in data.chunks(7).enumerate() {
        let name = String::from_utf8_lossy(&part[..part.len() / 2]).into_owned();
        let value = Bytes::copy_from_slice(&part[part.len() / 2..]);

        let result = match idx % 3 {
            0 => form.append(name, value),
            1 => form.append_with(
                name.clone(),
                String::from_utf8_lossy(&value).into_owned(),
                FieldOptions::new().file_name(name),
            ),
            _ => {
                let size = value.len() as u64;
                let chunks = value
                    .chunks(2)
                    .map(|chunk| Result::<Bytes, Infallible>::Ok(Bytes::copy_from_slice(chunk)))
                    .collect::<Vec<_>>();
                let value = FieldValue::stream(stream::iter(chunks));

                form.append_with(name, value, FieldOptions::new().size(size))
            }
        };
        result.expect("in-memory fields never fail");
    }

    let rt = runtime::Builder::new_current_thread().build().expect("runtime");
    let body = rt.block_on(form.stream().bytes()).expect("body");

    assert_eq!(form.length(), Some(body.len() as u64));
});
