/// Default Fedora/LDP REST endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/fcrepo/rest";

/// Field carrying the ordinal page position within an item.
pub const ORDER_FIELD: &str = "Order";

/// Namespace prefix accepted for tabular metadata fields.
pub const METADATA_NAMESPACE: &str = "dcterms";

/// Field holding resource identifiers; drives slugs and binary discovery.
pub const IDENTIFIER_FIELD: &str = "dcterms:identifier";

/// Filename patterns probed for binary attachment.
/// `*` is replaced with each of the resource's identifiers.
pub const FILE_PATTERNS: &[&str] = &["*.tif", "*.jpg", "thumb_*.jpg", "*.xml", "*.pdf", "*.tfw"];

/// Per-request HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Connection probe retries before giving up on the repository.
pub const CONNECT_MAX_RETRIES: u32 = 5;

/// Delay between connection probe attempts in seconds.
pub const CONNECT_RETRY_DELAY_SECS: u64 = 2;

/// File extension to content type for binary attachment.
/// Unknown extensions fall back to `application/octet-stream`.
pub const CONTENT_TYPES: &[(&str, &str)] = &[
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("xml", "application/xml"),
    ("pdf", "application/pdf"),
    ("tfw", "text/plain"),
    ("txt", "text/plain"),
];
