//! Domain derivation from a URL, per the registrable-host rule in the data model.

/// Derive the registrable domain for a URL: lowercased host with a leading
/// `www.` stripped. Returns `None` if the URL has no host (e.g. malformed).
pub fn derive_domain(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(strip_www(&host).to_string())
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_www_and_lowercases() {
        assert_eq!(
            derive_domain("https://WWW.Example.com/path").as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn leaves_bare_host_alone() {
        assert_eq!(
            derive_domain("https://example.com/a/b").as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn keeps_subdomains_that_are_not_www() {
        assert_eq!(
            derive_domain("https://cdn.example.com/x").as_deref(),
            Some("cdn.example.com")
        );
    }

    #[test]
    fn malformed_url_has_no_domain() {
        assert_eq!(derive_domain("not a url"), None);
    }
}
