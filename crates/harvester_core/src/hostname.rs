use url::Url;

/// Host without a leading `www.` label, e.g. `netspective.com` for
/// `https://www.netspective.com`. Empty when the URL has no host.
pub fn simplified_hostname(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// [`simplified_hostname`] without its final dot-suffix label, e.g.
/// `news.healthcareguys` for `https://news.healthcareguys.com`.
pub fn simplified_hostname_without_tld(url: &Url) -> String {
    let simplified = simplified_hostname(url);
    match simplified.rfind('.') {
        Some(idx) if idx + 1 < simplified.len() => simplified[..idx].to_string(),
        _ => simplified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(text: &str) -> Url {
        Url::parse(text).unwrap()
    }

    #[test]
    fn www_prefix_is_stripped() {
        assert_eq!(simplified_hostname(&url("https://www.netspective.com")), "netspective.com");
        assert_eq!(
            simplified_hostname_without_tld(&url("https://www.netspective.com")),
            "netspective"
        );
    }

    #[test]
    fn other_subdomains_are_kept() {
        let news = url("https://news.healthcareguys.com/post");
        assert_eq!(simplified_hostname(&news), "news.healthcareguys.com");
        assert_eq!(simplified_hostname_without_tld(&news), "news.healthcareguys");
    }

    #[test]
    fn single_label_host_has_no_suffix_to_strip() {
        assert_eq!(simplified_hostname_without_tld(&url("http://localhost:8080/")), "localhost");
    }
}
