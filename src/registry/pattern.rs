//! Match pattern derivation for user script registrations.

use url::Url;

/// Derive a broad match pattern covering every page of the target's site.
///
/// `https://www.example.com/page?x=1` becomes `*://*.example.com/*`: any
/// scheme, any subdomain (including the bare domain), any path. Only a
/// single leading `www.` label is stripped.
///
/// Inputs that do not parse as a URL with a host are returned unchanged, so
/// the registration degrades to an exact-match pattern instead of failing.
pub fn derive_pattern(target_url: &str) -> String {
    let host = match Url::parse(target_url) {
        Ok(url) => match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => {
                tracing::debug!("URL has no host, using it as the pattern: {}", target_url);
                return target_url.to_string();
            }
        },
        Err(e) => {
            tracing::debug!("Could not parse {} ({}), using it as the pattern", target_url, e);
            return target_url.to_string();
        }
    };

    let host = host.strip_prefix("www.").unwrap_or(&host);
    format!("*://*.{}/*", host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_www_and_query() {
        assert_eq!(
            derive_pattern("https://www.example.com/page?x=1"),
            "*://*.example.com/*"
        );
    }

    #[test]
    fn test_keeps_other_subdomains() {
        assert_eq!(derive_pattern("https://m.example.com/"), "*://*.m.example.com/*");
        assert_eq!(
            derive_pattern("http://docs.rs/tokio/latest"),
            "*://*.docs.rs/*"
        );
    }

    #[test]
    fn test_strips_only_one_www() {
        assert_eq!(
            derive_pattern("https://www.www.example.com/"),
            "*://*.www.example.com/*"
        );
    }

    #[test]
    fn test_ignores_port_and_fragment() {
        assert_eq!(
            derive_pattern("http://www.localhost.test:8080/a/b#frag"),
            "*://*.localhost.test/*"
        );
    }

    #[test]
    fn test_unparseable_input_is_returned_unchanged() {
        assert_eq!(derive_pattern("not a url"), "not a url");
        assert_eq!(derive_pattern(""), "");
        assert_eq!(derive_pattern("/relative/path"), "/relative/path");
    }

    #[test]
    fn test_hostless_url_is_returned_unchanged() {
        assert_eq!(derive_pattern("data:text/plain,hi"), "data:text/plain,hi");
    }
}
