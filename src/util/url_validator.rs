use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
    /// Base URLs may not carry a query string, fragment or credentials.
    #[error("Unexpected URL component: {0}")]
    UnexpectedComponent(&'static str),
}

fn check_scheme(url: &Url) -> Result<(), UrlValidationError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

/// Validates the base URL of the knowledge-tree service.
///
/// Accepts `http` and `https` URLs with a host and an optional path prefix.
/// Rejects credentials, query strings and fragments, since every endpoint
/// path is appended to this URL. Plain `http` to a host outside the local
/// network is allowed but logged as a warning.
///
/// # Examples
///
/// ```
/// use knowtree::util::validate_base_url;
///
/// let url = validate_base_url("http://localhost:8080").unwrap();
/// assert_eq!(url.port(), Some(8080));
///
/// assert!(validate_base_url("file:///srv/tree").is_err());
/// assert!(validate_base_url("https://tree.example.com/?debug=1").is_err());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;
    check_scheme(&url)?;

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
    if !url.username().is_empty() || url.password().is_some() {
        return Err(UrlValidationError::UnexpectedComponent("credentials"));
    }
    if url.query().is_some() {
        return Err(UrlValidationError::UnexpectedComponent("query"));
    }
    if url.fragment().is_some() {
        return Err(UrlValidationError::UnexpectedComponent("fragment"));
    }

    if url.scheme() == "http" && !is_local_host(host) {
        tracing::warn!(base_url = %url, "Using plain HTTP to a non-local API server");
    }

    Ok(url)
}

/// Validates a reference link before handing it to the system opener.
///
/// Only `http` and `https` URLs with a host are opened, so a reference such
/// as `file:///etc/passwd` or `javascript:` never reaches the browser.
pub fn validate_url_for_open(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;
    check_scheme(&url)?;
    if !url.host_str().is_some_and(|h| !h.is_empty()) {
        return Err(UrlValidationError::MissingHost);
    }
    Ok(url)
}

/// Every openable link found in free text, in order of appearance, deduplicated.
///
/// Node references are free text ("See https://a.example and the book at
/// <https://b.example/>."), so candidates are split on whitespace and trimmed
/// of surrounding punctuation.
pub fn extract_links(text: &str) -> Vec<Url> {
    let mut links: Vec<Url> = Vec::new();
    for word in text.split_whitespace() {
        let start = match word.find("http://").or_else(|| word.find("https://")) {
            Some(idx) => idx,
            None => continue,
        };
        let candidate = word[start..].trim_end_matches(|c: char| {
            matches!(c, '.' | ',' | ';' | ':' | ')' | ']' | '>' | '"' | '\'')
        });
        if let Ok(url) = validate_url_for_open(candidate) {
            if !links.contains(&url) {
                links.push(url);
            }
        }
    }
    links
}

/// Loopback, private and link-local addresses plus `localhost`.
fn is_local_host(host: &str) -> bool {
    if host == "localhost" {
        return true;
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    match host_for_parse.parse::<IpAddr>() {
        Ok(ip) => is_private_ip(&ip),
        Err(_) => false,
    }
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private() || ipv4.is_loopback() || ipv4.is_link_local() || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_loopback() || ipv6.is_unspecified() {
                return true;
            }
            let segments = ipv6.segments();
            // Unique Local (fc00::/7)
            let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
            // Link-Local (fe80::/10)
            let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
            is_unique_local || is_link_local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_accepts_local_and_remote() {
        assert!(validate_base_url("http://localhost:8080").is_ok());
        assert!(validate_base_url("http://127.0.0.1:8080/").is_ok());
        assert!(validate_base_url("https://tree.example.com/learn/").is_ok());
        assert!(validate_base_url("http://192.168.1.20:8080").is_ok());
    }

    #[test]
    fn test_base_url_rejects_bad_schemes() {
        assert!(matches!(
            validate_base_url("ftp://example.com"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn test_base_url_rejects_extra_components() {
        assert!(validate_base_url("https://user:pw@example.com").is_err());
        assert!(validate_base_url("https://example.com/#top").is_err());
        assert!(validate_base_url("https://example.com/?a=b").is_err());
    }

    #[test]
    fn test_open_rejects_non_web_schemes() {
        assert!(validate_url_for_open("https://doc.rust-lang.org/book/").is_ok());
        assert!(validate_url_for_open("file:///etc/passwd").is_err());
        assert!(validate_url_for_open("javascript:alert(1)").is_err());
        assert!(validate_url_for_open("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_extract_links_from_free_text() {
        let text = "Read https://doc.rust-lang.org/book/, then (https://example.com/a). \
                    Also <https://example.com/a> and file:///tmp/x";
        let links: Vec<String> = extract_links(text).iter().map(|u| u.to_string()).collect();
        assert_eq!(
            links,
            vec![
                "https://doc.rust-lang.org/book/".to_string(),
                "https://example.com/a".to_string(),
            ]
        );
    }

    #[test]
    fn test_local_host_detection() {
        assert!(is_local_host("localhost"));
        assert!(is_local_host("10.0.0.1"));
        assert!(is_local_host("[::1]"));
        assert!(is_local_host("[fe80::1]"));
        assert!(!is_local_host("example.com"));
        assert!(!is_local_host("8.8.8.8"));
    }
}
