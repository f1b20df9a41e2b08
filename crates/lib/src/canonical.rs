//! # URL Canonicalization
//!
//! Articles are identified by a canonical form of their URL so the same story,
//! reached through tracking links or cosmetic variations, maps to one alert.

use url::Url;

/// Query parameters that only carry tracking information.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "igshid", "ref", "ref_src", "_ga",
];

fn is_tracking_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("utm_") || TRACKING_PARAMS.contains(&lower.as_str())
}

/// Returns the canonical identity key for an article URL.
///
/// - `http` becomes `https`; scheme and host are lowercased and `www.` is dropped.
/// - Default ports, the fragment and tracking parameters are removed; other ports are kept.
/// - Remaining query pairs are sorted; an empty query is dropped.
/// - Trailing slashes are stripped from the path.
///
/// Input that does not parse as an absolute URL is trimmed and lowercased.
pub fn canonicalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut parsed = match Url::parse(trimmed) {
        Ok(u) if u.has_host() => u,
        _ => return trimmed.to_lowercase(),
    };

    if parsed.scheme() == "http" {
        // Only fails for special/non-special scheme changes, which http->https is not.
        let _ = parsed.set_scheme("https");
    }
    parsed.set_fragment(None);

    let host = parsed
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_string())
        .unwrap_or_default();

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();

    let path = parsed.path().trim_end_matches('/').to_string();

    let authority = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    };
    let mut canonical = format!("{}://{}{}", parsed.scheme(), authority, path);
    if !pairs.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish();
        canonical.push('?');
        canonical.push_str(&query);
    }
    canonical
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_params_and_fragment_are_removed() {
        assert_eq!(
            canonicalize_url(
                "https://News.Example.com/rulings/498a/?utm_source=x&utm_medium=y&fbclid=z#top"
            ),
            "https://news.example.com/rulings/498a"
        );
    }

    #[test]
    fn test_scheme_www_port_and_slash_variants_collapse() {
        let a = canonicalize_url("http://www.example.com:80/a/b/");
        let b = canonicalize_url("https://example.com/a/b");
        let c = canonicalize_url("HTTPS://EXAMPLE.COM:443/a/b//");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_ne!(
            canonicalize_url("https://court-mirror.example.com:8443/ruling/12"),
            canonicalize_url("https://court-mirror.example.com/ruling/12")
        );
    }

    #[test]
    fn test_query_pairs_are_sorted_and_kept() {
        assert_eq!(
            canonicalize_url("https://example.com/search?b=2&a=1&gclid=abc"),
            "https://example.com/search?a=1&b=2"
        );
    }

    #[test]
    fn test_root_path_loses_slash() {
        assert_eq!(
            canonicalize_url("https://example.com/"),
            "https://example.com"
        );
    }

    #[test]
    fn test_unparseable_input_is_lowercased() {
        assert_eq!(canonicalize_url("  Not A Url  "), "not a url");
    }
}
