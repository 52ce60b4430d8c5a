use url::{Position, Url};

/// Schemes and pseudo-targets that are never fetched or rewritten.
const SKIPPED_PREFIXES: &[&str] = &["mailto:", "tel:", "javascript:"];

/// Returns true for hrefs that point at nothing fetchable: empty strings,
/// fragment-only targets, and mailto/tel/javascript pseudo-URLs.
pub fn is_skippable(raw: &str) -> bool {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return true;
    }
    let lowered = raw.to_ascii_lowercase();
    SKIPPED_PREFIXES.iter().any(|p| lowered.starts_with(p))
}

/// Resolves a raw href against the page it appeared on. Absolute URLs pass
/// through, protocol-relative and relative forms join against the base.
pub fn resolve(base: &Url, raw: &str) -> Result<Url, url::ParseError> {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        Url::parse(raw)
    } else {
        base.join(raw)
    }
}

/// Same-site test: scheme + host (+ port). Query strings and fragments never
/// participate.
pub fn is_same_origin(url: &Url, origin: &Url) -> bool {
    url.origin() == origin.origin()
}

/// Canonical form of a page's path, used for both the visited-key and the
/// output file name: a trailing `.html` and a trailing `/` are stripped, and
/// `/index` folds into the root. `/about`, `/about/`, and `/about.html` all
/// canonicalize to `/about`; `/`, `/index`, and `/index.html` all
/// canonicalize to the empty string.
pub fn canonical_page_path(url: &Url) -> String {
    let mut path = url.path().to_string();
    if let Some(stripped) = path.strip_suffix(".html") {
        path = stripped.to_string();
    }
    while path.ends_with('/') {
        path.pop();
    }
    if path == "/index" {
        path.clear();
    }
    path
}

/// Key under which a page enters the visited-set. Strips query and fragment
/// so URLs differing only in those map to one fetch, and applies the
/// canonical path so `.html`/trailing-slash variants collapse too.
pub fn visited_key(url: &Url) -> String {
    format!("{}{}", &url[..Position::BeforePath], canonical_page_path(url))
}
