//! Service key derivation.
//!
//! A declaration is identified by its canonical URL. When a record carries no
//! URL the key falls back to `title::<domain>::<title>`, both lowercased.
//! Keys are recomputed from record content on every read, so the on-disk
//! snapshot format does not need to store them.

use url::Url;

const URL_PREFIX: &str = "url::";
const TITLE_PREFIX: &str = "title::";

/// Normalize a URL for stable matching.
///
/// Lowercases the host, drops default ports, strips a trailing `/` from
/// non-root paths and discards query and fragment. Unparsable input is
/// returned trimmed.
pub fn canonical_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(parsed) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return trimmed.to_string();
    };

    let mut out = format!("{}://{}", parsed.scheme(), host.to_lowercase());
    // Url::port() is None for the scheme's default port
    if let Some(port) = parsed.port() {
        out.push_str(&format!(":{}", port));
    }

    let path = parsed.path();
    if path != "/" && path.ends_with('/') {
        out.push_str(&path[..path.len() - 1]);
    } else {
        out.push_str(path);
    }
    out
}

/// Host part of a URL, or empty when it has none.
pub fn domain_of(raw: &str) -> String {
    Url::parse(raw.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Compute the service key for a record's identifying fields.
///
/// Returns `None` when neither a URL nor a title is present.
pub fn service_key(url: &str, title: &str, domain: &str) -> Option<String> {
    let url = url.trim();
    if !url.is_empty() {
        return Some(format!("{}{}", URL_PREFIX, canonical_url(url)));
    }
    let title = title.trim().to_lowercase();
    if title.is_empty() {
        return None;
    }
    Some(format!(
        "{}{}::{}",
        TITLE_PREFIX,
        domain.trim().to_lowercase(),
        title
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_url_lowercases_host_and_strips_slash() {
        assert_eq!(
            canonical_url("https://Example.NO/tjeneste/"),
            "https://example.no/tjeneste"
        );
    }

    #[test]
    fn test_canonical_url_drops_default_port_query_fragment() {
        assert_eq!(
            canonical_url("https://example.no:443/a?x=1#top"),
            "https://example.no/a"
        );
        assert_eq!(
            canonical_url("http://example.no:8080/a"),
            "http://example.no:8080/a"
        );
    }

    #[test]
    fn test_canonical_url_root_path_kept() {
        assert_eq!(canonical_url("https://example.no"), "https://example.no/");
        assert_eq!(canonical_url("https://example.no/"), "https://example.no/");
    }

    #[test]
    fn test_canonical_url_unparsable_is_trimmed() {
        assert_eq!(canonical_url("  not a url "), "not a url");
    }

    #[test]
    fn test_service_key_prefers_url() {
        let key = service_key("https://a.example/x/", "Title", "a.example").unwrap();
        assert_eq!(key, "url::https://a.example/x");
    }

    #[test]
    fn test_service_key_title_fallback() {
        let key = service_key("", "  Min Side ", "NAV.no").unwrap();
        assert_eq!(key, "title::nav.no::min side");
    }

    #[test]
    fn test_service_key_none_without_identity() {
        assert!(service_key("", "   ", "nav.no").is_none());
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://uustatus.no/nb/erklaringer"), "uustatus.no");
        assert_eq!(domain_of("garbage"), "");
    }
}
