use url::Url;

/// What to do with one raw link found on a page
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// `#anchor` links: recorded under the raw string, never fetched
    Fragment,
    /// `/` or the page's own URL: skipped without touching the registry
    SelfLink,
    /// Malformed link, skipped silently
    Unresolvable(url::ParseError),
    /// Resolved, but not something a HEAD request can reach (mailto:, data:, ...)
    Unsupported(Url),
    Resolved { url: Url, external: bool },
}

/// Resolves raw `src`/`href` values against the page they were found on and
/// scopes them against the crawl origin.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    origin: String,
}

impl LinkResolver {
    pub fn new(seed: &Url) -> Self {
        Self {
            origin: authority(seed),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn classify(&self, raw: &str, page: &Url) -> Candidate {
        if raw.starts_with('#') {
            return Candidate::Fragment;
        }
        if raw.trim() == "/" || raw == page.as_str() {
            return Candidate::SelfLink;
        }

        match resolve(raw, page) {
            Ok(url) if is_http(&url) => {
                let external = is_external(&url, &self.origin);
                Candidate::Resolved { url, external }
            }
            Ok(url) => Candidate::Unsupported(url),
            Err(e) => Candidate::Unresolvable(e),
        }
    }
}

/// Resolve `raw` against `base` per RFC 3986 reference resolution.
/// Absolute links come back as-is.
pub fn resolve(raw: &str, base: &Url) -> Result<Url, url::ParseError> {
    base.join(raw)
}

/// Registry key for a resolved URL: the URL without its fragment
pub fn canonical_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.into()
}

/// Host plus explicit port, e.g. `127.0.0.1:8080` or `example.com`
pub fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

pub fn is_external(url: &Url, origin: &str) -> bool {
    !authority(url).contains(origin)
}

pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.has_host()
}
