use crate::constants;
use rand::rngs::OsRng;
use rand::RngCore;
use std::borrow::Cow;
#[cfg(feature = "tokio-io")]
use std::path::Path;

pub(crate) fn generate_boundary() -> String {
    let mut random = [0u8; constants::BOUNDARY_RANDOM_BYTES];
    OsRng.fill_bytes(&mut random);

    let mut boundary = String::with_capacity(constants::BOUNDARY_PREFIX.len() + random.len() * 2);
    boundary.push_str(constants::BOUNDARY_PREFIX);
    boundary.push_str(&hex::encode(random));

    boundary
}

/// Replaces every `"` with `\"` so the value can sit inside a quoted
/// `Content-Disposition` parameter.
pub(crate) fn escape_quotes(value: &str) -> Cow<'_, str> {
    match memchr::memchr(b'"', value.as_bytes()) {
        Some(_) => Cow::Owned(value.replace('"', "\\\"")),
        None => Cow::Borrowed(value),
    }
}

#[cfg(feature = "tokio-io")]
pub(crate) fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

pub(crate) fn guess_content_type(file_name: &str) -> mime::Mime {
    mime_guess::from_path(file_name)
        .first()
        .unwrap_or(constants::DEFAULT_FILE_CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_boundary() {
        let boundary = generate_boundary();
        let suffix = boundary.strip_prefix(constants::BOUNDARY_PREFIX).unwrap();

        assert!(boundary.starts_with("----"));
        assert_eq!(suffix.len(), 28);
        assert!(suffix.chars().all(|ch| matches!(ch, '0'..='9' | 'a'..='f')));
        assert_ne!(boundary, generate_boundary());
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape_quotes("my field"), "my field");
        assert!(matches!(escape_quotes("my field"), Cow::Borrowed(_)));
        assert_eq!(escape_quotes("\"a\""), "\\\"a\\\"");
        assert_eq!(escape_quotes("file \"x\".txt"), "file \\\"x\\\".txt");
        assert_eq!(escape_quotes(""), "");
    }

    #[cfg(feature = "tokio-io")]
    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of(Path::new("/tmp/uploads/report.pdf")), Some("report.pdf".to_owned()));
        assert_eq!(file_name_of(Path::new("notes.txt")), Some("notes.txt".to_owned()));
        assert_eq!(file_name_of(Path::new("/")), None);
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("a-text-file.txt"), mime::TEXT_PLAIN);
        assert_eq!(guess_content_type("image.png"), mime::IMAGE_PNG);
        assert_eq!(guess_content_type("abc"), mime::APPLICATION_OCTET_STREAM);
        assert_eq!(guess_content_type("archive.not-a-real-extension"), mime::APPLICATION_OCTET_STREAM);
    }
}
