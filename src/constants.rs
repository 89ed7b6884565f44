pub(crate) const BOUNDARY_EXT: &str = "--";
pub(crate) const BOUNDARY_PREFIX: &str = "----formdata-encoder-";
pub(crate) const BOUNDARY_RANDOM_BYTES: usize = 14;

pub(crate) const CRLF: &str = "\r\n";
pub(crate) const CRLF_CRLF: &str = "\r\n\r\n";

pub(crate) const CONTENT_DISPOSITION_PREFIX: &str = "Content-Disposition: form-data; name=\"";
pub(crate) const FILE_NAME_PARAM: &str = "; filename=\"";
pub(crate) const CONTENT_TYPE_LINE: &str = "\r\nContent-Type: ";

pub(crate) const DEFAULT_FILE_CONTENT_TYPE: mime::Mime = mime::APPLICATION_OCTET_STREAM;
