use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Invalid link: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Only web links are opened; `file://`, `javascript:` and friends are refused.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("Link has no host")]
    MissingHost,
}

/// Check a post's source link before passing it to the system opener.
///
/// Post links come from channel content, so anything that is not a plain
/// http(s) URL with a host is rejected.
///
/// ```
/// use telepulse::util::validate_link_for_open;
///
/// assert!(validate_link_for_open("https://t.me/durov/42").is_ok());
/// assert!(validate_link_for_open("file:///etc/passwd").is_err());
/// ```
pub fn validate_link_for_open(link: &str) -> Result<Url, LinkError> {
    let url = Url::parse(link.trim())?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(LinkError::UnsupportedScheme(scheme.to_owned())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(LinkError::MissingHost);
    }
    Ok(url)
}
