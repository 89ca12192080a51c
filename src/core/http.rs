use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

const APP_USER_AGENT: &str = concat!("Nebula/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by every download of one generation run.
///
/// `identity` encoding keeps the bytes on disk equal to the bytes hashed by
/// the remote repository.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .build()
}

/// Append path segments to a base URL, percent-encoding each segment.
///
/// Every element of `parts` may itself contain `/`-separated segments; empty
/// segments are dropped.
pub fn join_url(base: &str, parts: &[&str]) -> Result<String, String> {
    let mut url = reqwest::Url::parse(base).map_err(|e| format!("invalid base url {base}: {e}"))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| format!("base url {base} cannot carry a path"))?;
        segments.pop_if_empty();
        for part in parts {
            segments.extend(part.split('/').filter(|s| !s.is_empty()));
        }
    }
    Ok(url.to_string())
}
