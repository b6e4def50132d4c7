use url::{ParseError, Url};

/// normalize a relay URL: http(s) becomes ws(s), a bare host gets `wss://` (or `ws://` for
/// local addresses), the host is lowercased and trailing slashes are dropped
pub fn normalize_url(url_str: &str) -> Result<Url, ParseError> {
    let url_str = url_str.trim();
    let url_str = match url_str.split_once("://") {
        Some((scheme, _))
            if scheme.eq_ignore_ascii_case("ws") || scheme.eq_ignore_ascii_case("wss") =>
        {
            url_str.to_string()
        }
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("http") => format!("ws://{}", rest),
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("https") => format!("wss://{}", rest),
        _ if is_local(url_str) => format!("ws://{}", url_str),
        _ => format!("wss://{}", url_str),
    };
    let mut url = Url::parse(&url_str)?;

    if let Some(host) = url.host_str().map(str::to_lowercase) {
        url.set_host(Some(&host))?;
    }
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);

    Ok(url)
}

fn is_local(host: &str) -> bool {
    host.starts_with("localhost") || host.contains(".localhost") || host.starts_with("127.0.0.1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        let cases = [
            ("wss://nos.lol", "wss://nos.lol/"),
            ("ws://relay.test", "ws://relay.test/"),
            ("https://nos.lol", "wss://nos.lol/"),
            ("http://relay.test", "ws://relay.test/"),
            ("nostr.wine", "wss://nostr.wine/"),
            ("localhost:7777", "ws://localhost:7777/"),
            ("127.0.0.1:4869", "ws://127.0.0.1:4869/"),
            ("dev.localhost:7000", "ws://dev.localhost:7000/"),
            ("WSS://Nos.LOL", "wss://nos.lol/"),
            ("Http://LocalHost:7777", "ws://localhost:7777/"),
            ("wss://relay.test/inbox", "wss://relay.test/inbox"),
            ("https://relay.test/inbox/", "wss://relay.test/inbox"),
            ("wss://relay.test/a/b", "wss://relay.test/a/b"),
            ("wss://nos.lol/", "wss://nos.lol/"),
            ("\twss://nos.lol//  ", "wss://nos.lol/"),
        ];

        for (input, expected) in cases {
            let url = normalize_url(input).unwrap();
            assert_eq!(url.as_str(), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_normalize_url_errors() {
        for input in ["", "wss://", "https://exa mple.com"] {
            assert!(normalize_url(input).is_err(), "should fail for '{}'", input);
        }
    }
}
